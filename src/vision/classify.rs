//! Glyph classification
//!
//! Exact pixel-for-pixel match against the template library. Templates come
//! out of the same normalization chain as live readings, so a genuine match is
//! bit-identical; anything else is reported as unrecognized instead of being
//! rounded to the nearest digit.

use std::fmt;

use super::glyph::Glyph;
use super::template::{GlyphValue, TemplateLibrary};

/// Result of classifying one region on one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reading {
    /// A recognized digit 0–9
    Digit(u8),
    /// Matched the blank template (unlit position)
    Blank,
    /// No template matched
    Unrecognized,
}

impl Reading {
    /// The digit value, if any
    pub fn digit(&self) -> Option<u8> {
        match self {
            Reading::Digit(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether this reading is a recognized digit
    pub fn is_digit(&self) -> bool {
        matches!(self, Reading::Digit(_))
    }
}

impl From<GlyphValue> for Reading {
    fn from(value: GlyphValue) -> Self {
        match value {
            GlyphValue::Digit(d) => Reading::Digit(d),
            GlyphValue::Blank => Reading::Blank,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Digit(d) => write!(f, "{}", d),
            Reading::Blank => write!(f, "blank"),
            Reading::Unrecognized => write!(f, "?"),
        }
    }
}

/// Classify a normalized glyph; the first exact match wins
pub fn classify(glyph: &Glyph, library: &TemplateLibrary) -> Reading {
    library
        .templates()
        .iter()
        .find(|t| t.glyph == *glyph)
        .map(|t| Reading::from(t.value))
        .unwrap_or(Reading::Unrecognized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seven_variant_b_round_trip() {
        let library = TemplateLibrary::builtin();
        let seven_b = library.get(GlyphValue::Digit(7), 'B').unwrap();

        assert_eq!(classify(&seven_b.glyph, &library), Reading::Digit(7));
    }

    #[test]
    fn test_every_builtin_template_classifies_as_itself() {
        let library = TemplateLibrary::builtin();

        for template in library.templates() {
            assert_eq!(
                classify(&template.glyph, &library),
                Reading::from(template.value),
                "template {}",
                template.name()
            );
        }
    }

    #[test]
    fn test_blank_glyph() {
        let library = TemplateLibrary::builtin();
        assert_eq!(classify(&Glyph::BLANK, &library), Reading::Blank);
    }

    #[test]
    fn test_single_pixel_difference_is_unrecognized() {
        let library = TemplateLibrary::builtin();
        let mut glyph = library.get(GlyphValue::Digit(3), 'A').unwrap().glyph;
        glyph.set(0, 1, true);

        assert_eq!(classify(&glyph, &library), Reading::Unrecognized);
    }

    #[test]
    fn test_empty_library() {
        let library = TemplateLibrary::new();
        assert_eq!(classify(&Glyph::BLANK, &library), Reading::Unrecognized);
    }

    #[test]
    fn test_reading_helpers() {
        assert_eq!(Reading::Digit(4).digit(), Some(4));
        assert_eq!(Reading::Blank.digit(), None);
        assert!(!Reading::Unrecognized.is_digit());
        assert_eq!(Reading::Unrecognized.to_string(), "?");
    }
}
