//! Region definitions
//!
//! A region is a named rectangle of the camera frame holding one display digit
//! or one separator (colon, decimal point). Coordinates arrive from the control
//! surface as loosely typed values; anything that is not a non-negative number
//! degrades to zero instead of failing the whole snapshot.

use std::fmt;

use serde_json::Value;

/// Name of a monitored region, e.g. `clock_1` or `shot_clock_decimal`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionKey(String);

impl RegionKey {
    /// Create a region key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key names a separator by convention (`*_colon`, `*_decimal`)
    pub fn looks_like_separator(&self) -> bool {
        self.0.ends_with("_colon") || self.0.ends_with("_decimal")
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for RegionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Axis-aligned rectangle in frame pixels, right/bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge
    pub left: u32,
    /// Top edge
    pub top: u32,
    /// Right edge (exclusive)
    pub right: u32,
    /// Bottom edge (exclusive)
    pub bottom: u32,
}

impl Rect {
    /// Create a rectangle from its corners
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from its top-left corner and size
    pub fn from_size(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self::new(
            left,
            top,
            left.saturating_add(width),
            top.saturating_add(height),
        )
    }

    /// Width in pixels (0 if the corners are inverted)
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    /// Height in pixels (0 if the corners are inverted)
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Whether the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// How a region is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionMode {
    /// Classified against the digit templates
    Digit,
    /// Measured as a mean intensity (colon, decimal point)
    Separator,
}

impl RegionMode {
    /// Parse a mode name; unknown names yield `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "digit" | "d" => Some(RegionMode::Digit),
            "separator" | "sep" | "s" | "colon" | "decimal" => Some(RegionMode::Separator),
            _ => None,
        }
    }
}

/// A configured region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Region name
    pub key: RegionKey,
    /// Rectangle in (cropped) frame coordinates
    pub rect: Rect,
    /// Recognition mode
    pub mode: RegionMode,
}

impl Region {
    /// Create a digit region
    pub fn digit(key: impl Into<RegionKey>, rect: Rect) -> Self {
        Self {
            key: key.into(),
            rect,
            mode: RegionMode::Digit,
        }
    }

    /// Create a separator region
    pub fn separator(key: impl Into<RegionKey>, rect: Rect) -> Self {
        Self {
            key: key.into(),
            rect,
            mode: RegionMode::Separator,
        }
    }

    /// Parse a `[left, top, right, bottom, width, height, mode]` entry
    ///
    /// Returns the region and whether any coordinate was malformed. A malformed
    /// coordinate reads as 0, which collapses the region to zero size.
    pub fn from_entry(key: RegionKey, entry: &Value) -> (Self, bool) {
        let fields: &[Value] = match entry {
            Value::Array(items) => items,
            _ => &[],
        };

        let mut malformed = fields.len() < 4;
        let mut coord = |index: usize| -> u32 {
            match fields.get(index).and_then(parse_coordinate) {
                Some(v) => v,
                None => {
                    malformed = true;
                    0
                }
            }
        };

        let (left, top, right, bottom) = (coord(0), coord(1), coord(2), coord(3));
        let rect = if malformed {
            Rect::default()
        } else {
            Rect::new(left, top, right, bottom)
        };

        let default_mode = if key.looks_like_separator() {
            RegionMode::Separator
        } else {
            RegionMode::Digit
        };
        let mode = fields
            .get(6)
            .and_then(Value::as_str)
            .and_then(RegionMode::parse)
            .unwrap_or(default_mode);

        (Self { key, rect, mode }, malformed)
    }
}

/// Read a non-negative coordinate from a JSON number or numeric string
pub(crate) fn parse_coordinate(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() || number < 0.0 || number > u32::MAX as f64 {
        return None;
    }
    Some(number as u32)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_rect_dimensions() {
        let rect = Rect::new(10, 20, 60, 90);
        assert_eq!(rect.width(), 50);
        assert_eq!(rect.height(), 70);
        assert!(!rect.is_empty());

        let inverted = Rect::new(60, 90, 10, 20);
        assert_eq!(inverted.width(), 0);
        assert!(inverted.is_empty());
    }

    #[test]
    fn test_rect_from_size() {
        assert_eq!(Rect::from_size(5, 6, 10, 20), Rect::new(5, 6, 15, 26));
    }

    #[test]
    fn test_from_entry_numbers_and_strings() {
        let entry = json!(["10", 20, "60", 90.0, "50", "70", "digit"]);
        let (region, malformed) = Region::from_entry("clock_1".into(), &entry);

        assert!(!malformed);
        assert_eq!(region.rect, Rect::new(10, 20, 60, 90));
        assert_eq!(region.mode, RegionMode::Digit);
    }

    #[test]
    fn test_from_entry_malformed_degrades_to_zero() {
        let entry = json!(["10", "abc", "60", "90"]);
        let (region, malformed) = Region::from_entry("clock_2".into(), &entry);

        assert!(malformed);
        assert!(region.rect.is_empty());
        assert_eq!(region.mode, RegionMode::Digit);
    }

    #[test]
    fn test_from_entry_missing_fields() {
        let (region, malformed) = Region::from_entry("clock_3".into(), &json!([1, 2]));
        assert!(malformed);
        assert_eq!(region.rect, Rect::default());

        let (_, malformed) = Region::from_entry("clock_4".into(), &json!("not an array"));
        assert!(malformed);
    }

    #[test]
    fn test_from_entry_negative_is_malformed() {
        let (region, malformed) = Region::from_entry("clock_1".into(), &json!([-5, 0, 10, 10]));
        assert!(malformed);
        assert!(region.rect.is_empty());
    }

    #[test]
    fn test_separator_mode_default_from_key() {
        let (region, _) = Region::from_entry("clock_colon".into(), &json!([1, 2, 3, 4]));
        assert_eq!(region.mode, RegionMode::Separator);

        let (region, _) =
            Region::from_entry("clock_colon".into(), &json!([1, 2, 3, 4, 2, 2, "digit"]));
        assert_eq!(region.mode, RegionMode::Digit);
    }

    #[test]
    fn test_region_mode_parse() {
        assert_eq!(RegionMode::parse(" Separator "), Some(RegionMode::Separator));
        assert_eq!(RegionMode::parse("digit"), Some(RegionMode::Digit));
        assert_eq!(RegionMode::parse("wat"), None);
    }
}
