//! Glyph recognition
//!
//! This module provides:
//! - Frame providers (`FrameSource`) and in-tree sources for replay and tests
//! - Region preprocessing into normalized 5×7 glyphs
//! - The reference template library
//! - Exact-match glyph classification

pub mod classify;
pub mod glyph;
pub mod preprocess;
pub mod source;
pub mod template;

pub use classify::{classify, Reading};
pub use glyph::{Glyph, GLYPH_HEIGHT, GLYPH_WIDTH};
pub use preprocess::{preprocess_region, HueBand, PreparedFrame, PreprocessParams};
pub use source::{
    FnOpener, FrameSource, FrameSourceError, FrameSourceOpener, ImageSequenceOpener,
    ImageSequenceSource, StillFrameSource,
};
pub use template::{GlyphValue, Template, TemplateLibrary};
