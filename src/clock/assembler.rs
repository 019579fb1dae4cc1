//! Clock assembly
//!
//! Combines stabilized digit readings and separator intensities of one frame
//! into display strings. A lit separator selects a layout's `present` format,
//! an unlit one its `absent` format, which is how the same four clock digits
//! show `mm:ss` above one minute and `ss.t` below it.

use std::collections::BTreeMap;

use super::format::{render_reading, ClockFormat};
use crate::config::RegionKey;
use crate::vision::Reading;

/// Rendered for an unlit display position
pub const DEFAULT_BLANK_MARKER: char = ' ';

/// Rendered for a glyph that matched no template
pub const DEFAULT_UNKNOWN_MARKER: char = '-';

/// Whether a separator with this mean intensity is lit
///
/// Lit separator pixels are ink (0) in the mask, so lower means more lit.
/// Exactly at the threshold counts as absent.
pub fn separator_present(intensity: f32, threshold: f32) -> bool {
    intensity < threshold
}

/// All region results of one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReadings {
    /// Stabilized reading per digit region
    pub digits: BTreeMap<RegionKey, Reading>,
    /// Mean intensity per separator region
    pub separators: BTreeMap<RegionKey, f32>,
}

impl FrameReadings {
    /// Create an empty set of readings
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a digit reading
    pub fn set_digit(&mut self, key: impl Into<RegionKey>, reading: Reading) {
        self.digits.insert(key.into(), reading);
    }

    /// Record a separator intensity
    pub fn set_separator(&mut self, key: impl Into<RegionKey>, intensity: f32) {
        self.separators.insert(key.into(), intensity);
    }

    /// Reading of a digit region; unconfigured regions are unrecognized
    pub fn digit(&self, key: &RegionKey) -> Reading {
        self.digits
            .get(key)
            .copied()
            .unwrap_or(Reading::Unrecognized)
    }

    /// Intensity of a separator region, if it was measured
    pub fn separator(&self, key: &RegionKey) -> Option<f32> {
        self.separators.get(key).copied()
    }
}

/// How one logical clock is built from regions
#[derive(Debug, Clone, PartialEq)]
pub struct ClockLayout {
    /// Logical clock name
    pub name: String,
    /// Digit regions, indexed by the format patterns
    pub digits: Vec<RegionKey>,
    /// Separator region selecting the format
    pub separator: Option<RegionKey>,
    /// Format when the separator is lit
    pub present: ClockFormat,
    /// Format when the separator is unlit or missing
    pub absent: ClockFormat,
    /// Drop leading zeros and blanks in front of a digit (`05:09` reads `5:09`)
    pub trim_leading_zeros: bool,
}

impl ClockLayout {
    /// Game clock: `mm:ss` with the colon lit, `ss.t` without
    pub fn game_clock() -> Self {
        Self {
            name: "clock".to_string(),
            digits: ["clock_1", "clock_2", "clock_3", "clock_4"]
                .into_iter()
                .map(RegionKey::from)
                .collect(),
            separator: Some("clock_colon".into()),
            present: "01:23".into(),
            absent: "01.2".into(),
            trim_leading_zeros: true,
        }
    }

    /// Shot clock: `s.t` with the decimal point lit, `ss` without
    pub fn shot_clock() -> Self {
        Self {
            name: "shot_clock".to_string(),
            digits: vec!["shot_clock_1".into(), "shot_clock_2".into()],
            separator: Some("shot_clock_decimal".into()),
            present: "0.1".into(),
            absent: "01".into(),
            trim_leading_zeros: false,
        }
    }

    /// Whether this frame's separator is lit
    pub fn separator_lit(&self, readings: &FrameReadings, threshold: f32) -> bool {
        self.separator
            .as_ref()
            .and_then(|key| readings.separator(key))
            .is_some_and(|intensity| separator_present(intensity, threshold))
    }

    /// Render this clock for one frame
    pub fn render(
        &self,
        readings: &FrameReadings,
        threshold: f32,
        blank: char,
        unknown: char,
    ) -> String {
        let digits: Vec<Reading> = self.digits.iter().map(|k| readings.digit(k)).collect();
        let format = if self.separator_lit(readings, threshold) {
            &self.present
        } else {
            &self.absent
        };
        let rendered = format.render(&digits, blank, unknown);
        if self.trim_leading_zeros {
            trim_leading_zeros(&rendered, blank)
        } else {
            rendered
        }
    }
}

/// Strip leading `'0'` and `blank` characters while a digit follows
fn trim_leading_zeros(rendered: &str, blank: char) -> String {
    let chars: Vec<char> = rendered.chars().collect();
    let mut start = 0;
    while start + 1 < chars.len()
        && (chars[start] == '0' || chars[start] == blank)
        && chars[start + 1].is_ascii_digit()
    {
        start += 1;
    }
    chars[start..].iter().collect()
}

/// How a score is built from digit regions, most significant first
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreLayout {
    /// Score name
    pub name: String,
    /// Digit regions, most significant first
    pub digits: Vec<RegionKey>,
}

impl ScoreLayout {
    /// Three-digit score for a team prefix (`home` → `home_score_1..3`)
    pub fn team(prefix: &str) -> Self {
        Self {
            name: format!("{}_score", prefix),
            digits: (1..=3)
                .map(|i| RegionKey::new(format!("{}_score_{}", prefix, i)))
                .collect(),
        }
    }

    /// Render the score as a plain number
    ///
    /// Unlit positions are dropped and leading zeros stripped; an entirely
    /// unlit score renders empty. Unrecognized positions keep the unknown
    /// marker so a bad read is visible.
    pub fn render(&self, readings: &FrameReadings, unknown: char) -> String {
        let mut chars: Vec<char> = self
            .digits
            .iter()
            .map(|key| readings.digit(key))
            .filter(|reading| *reading != Reading::Blank)
            .map(|reading| render_reading(reading, DEFAULT_BLANK_MARKER, unknown))
            .collect();

        let leading_zeros = chars.iter().take_while(|c| **c == '0').count();
        let strip = leading_zeros.min(chars.len().saturating_sub(1));
        chars.drain(..strip);

        chars.into_iter().collect()
    }
}

/// Every logical display of the scoreboard
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreboardLayout {
    /// Game clock
    pub clock: ClockLayout,
    /// Shot clock
    pub shot_clock: ClockLayout,
    /// Home score
    pub home_score: ScoreLayout,
    /// Guest score
    pub guest_score: ScoreLayout,
    /// Character for unlit positions
    pub blank_marker: char,
    /// Character for unrecognized positions
    pub unknown_marker: char,
}

impl Default for ScoreboardLayout {
    fn default() -> Self {
        Self {
            clock: ClockLayout::game_clock(),
            shot_clock: ClockLayout::shot_clock(),
            home_score: ScoreLayout::team("home"),
            guest_score: ScoreLayout::team("guest"),
            blank_marker: DEFAULT_BLANK_MARKER,
            unknown_marker: DEFAULT_UNKNOWN_MARKER,
        }
    }
}

impl ScoreboardLayout {
    /// Set the blank and unknown markers
    pub fn with_markers(mut self, blank: char, unknown: char) -> Self {
        self.blank_marker = blank;
        self.unknown_marker = unknown;
        self
    }

    /// Assemble every display for one frame
    pub fn assemble(&self, readings: &FrameReadings, separator_threshold: f32) -> ClockState {
        ClockState {
            clock: self.clock.render(
                readings,
                separator_threshold,
                self.blank_marker,
                self.unknown_marker,
            ),
            shot_clock: self.shot_clock.render(
                readings,
                separator_threshold,
                self.blank_marker,
                self.unknown_marker,
            ),
            home_score: self.home_score.render(readings, self.unknown_marker),
            guest_score: self.guest_score.render(readings, self.unknown_marker),
        }
    }
}

/// Assembled display strings of one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockState {
    /// Game clock, e.g. `12:34` or `45.6`
    pub clock: String,
    /// Shot clock, e.g. `24` or `4.2`
    pub shot_clock: String,
    /// Home score without leading zeros
    pub home_score: String,
    /// Guest score without leading zeros
    pub guest_score: String,
}
