//! Clock format patterns
//!
//! A pattern such as `"01:23"` renders a layout's digit readings: each ASCII
//! digit in the pattern is an index into the layout's digit list, any other
//! character is copied literally.

use std::fmt;

use crate::vision::Reading;

/// A clock rendering pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockFormat(String);

impl ClockFormat {
    /// Create a pattern
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// The raw pattern
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Highest digit index referenced by the pattern
    pub fn max_index(&self) -> Option<usize> {
        self.0
            .chars()
            .filter_map(|c| c.to_digit(10))
            .map(|d| d as usize)
            .max()
    }

    /// Render readings through the pattern
    ///
    /// An index with no reading renders as `unknown`, the same as an
    /// unrecognized glyph.
    pub fn render(&self, digits: &[Reading], blank: char, unknown: char) -> String {
        self.0
            .chars()
            .map(|c| match c.to_digit(10) {
                Some(index) => match digits.get(index as usize) {
                    Some(reading) => render_reading(*reading, blank, unknown),
                    None => unknown,
                },
                None => c,
            })
            .collect()
    }
}

impl fmt::Display for ClockFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClockFormat {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

/// Render one reading as a character
pub fn render_reading(reading: Reading, blank: char, unknown: char) -> char {
    match reading {
        Reading::Digit(d) => char::from_digit(u32::from(d), 10).unwrap_or(unknown),
        Reading::Blank => blank,
        Reading::Unrecognized => unknown,
    }
}
