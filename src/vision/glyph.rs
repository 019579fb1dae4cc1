//! Normalized glyph bitmaps
//!
//! Every region is reduced to a fixed 5×7 binary bitmap before classification.
//! The bitmap is packed row-major into a `u64`, so equality between a region
//! reading and a template is a single integer compare.

use std::fmt;

use image::{GrayImage, Luma};

use crate::error::{Error, Result};

/// Width of a normalized glyph in pixels
pub const GLYPH_WIDTH: u32 = 5;

/// Height of a normalized glyph in pixels
pub const GLYPH_HEIGHT: u32 = 7;

/// A 5×7 binary bitmap, bit set = lit segment
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Glyph {
    bits: u64,
}

impl Glyph {
    /// The all-background glyph
    pub const BLANK: Glyph = Glyph { bits: 0 };

    /// Build a glyph by evaluating `f(x, y)` for every pixel
    pub fn from_fn(mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut glyph = Glyph::BLANK;
        for y in 0..GLYPH_HEIGHT {
            for x in 0..GLYPH_WIDTH {
                if f(x, y) {
                    glyph.set(x, y, true);
                }
            }
        }
        glyph
    }

    /// Build a glyph from a 5×7 grayscale image, pixels above `threshold` are lit
    ///
    /// Returns `None` if the image does not have the canonical size.
    pub fn from_gray(img: &GrayImage, threshold: u8) -> Option<Self> {
        if img.dimensions() != (GLYPH_WIDTH, GLYPH_HEIGHT) {
            return None;
        }
        Some(Self::from_fn(|x, y| img.get_pixel(x, y)[0] > threshold))
    }

    /// Parse `#`/`.` art, one row per whitespace-separated token
    ///
    /// ```
    /// use scorecast::vision::Glyph;
    ///
    /// let full = Glyph::parse("##### ##### ##### ##### ##### ##### #####").unwrap();
    /// assert_eq!(full.lit_count(), 35);
    /// ```
    pub fn parse(art: &str) -> Result<Self> {
        let rows: Vec<&str> = art.split_whitespace().collect();
        if rows.len() != GLYPH_HEIGHT as usize {
            return Err(Error::Template(format!(
                "expected {} rows, found {}",
                GLYPH_HEIGHT,
                rows.len()
            )));
        }

        let mut glyph = Glyph::BLANK;
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != GLYPH_WIDTH as usize {
                return Err(Error::Template(format!(
                    "row {} must be {} pixels wide: {:?}",
                    y, GLYPH_WIDTH, row
                )));
            }
            for (x, c) in row.chars().enumerate() {
                match c {
                    '#' => glyph.set(x as u32, y as u32, true),
                    '.' => {}
                    other => {
                        return Err(Error::Template(format!(
                            "unexpected character {:?} in row {}",
                            other, y
                        )))
                    }
                }
            }
        }
        Ok(glyph)
    }

    fn index(x: u32, y: u32) -> u32 {
        y * GLYPH_WIDTH + x
    }

    /// Whether the pixel at (x, y) is lit
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < GLYPH_WIDTH && y < GLYPH_HEIGHT && self.bits & (1u64 << Self::index(x, y)) != 0
    }

    /// Set or clear the pixel at (x, y); out-of-range coordinates are ignored
    pub fn set(&mut self, x: u32, y: u32, lit: bool) {
        if x >= GLYPH_WIDTH || y >= GLYPH_HEIGHT {
            return;
        }
        let mask = 1u64 << Self::index(x, y);
        if lit {
            self.bits |= mask;
        } else {
            self.bits &= !mask;
        }
    }

    /// Number of lit pixels
    pub fn lit_count(&self) -> u32 {
        self.bits.count_ones()
    }

    /// Whether no pixel is lit
    pub fn is_blank(&self) -> bool {
        self.bits == 0
    }

    /// Render as a grayscale image (lit = 255)
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(GLYPH_WIDTH, GLYPH_HEIGHT, |x, y| {
            Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }
}

impl fmt::Debug for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Glyph(")?;
        for y in 0..GLYPH_HEIGHT {
            if y > 0 {
                write!(f, " ")?;
            }
            for x in 0..GLYPH_WIDTH {
                write!(f, "{}", if self.get(x, y) { '#' } else { '.' })?;
            }
        }
        write!(f, ")")
    }
}
