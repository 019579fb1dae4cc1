//! Scoreboard configuration snapshot
//!
//! The control surface owns the configuration; the pipeline only ever sees an
//! immutable [`ScoreboardConfig`] value handed over with `update_config`. A
//! snapshot can be built in code with the builder methods or parsed from the
//! control surface's JSON document.
//!
//! Parsing is lenient the same way the control surface is: numeric fields may
//! arrive as numbers or numeric strings, missing fields take their defaults and
//! unusable values take their defaults with a warning instead of failing the
//! whole snapshot.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::region::{parse_coordinate, Rect, Region, RegionKey, RegionMode};
use crate::clock::ScoreboardLayout;
use crate::error::{Error, Result};
use crate::filter::TransitionTable;
use crate::hub::TeamInfo;
use crate::vision::{HueBand, PreprocessParams};

/// Default separator threshold: mean intensity below this means "lit"
pub const DEFAULT_SEPARATOR_THRESHOLD: f32 = 100.0;

/// Default delay between pipeline iterations
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_millis(100);

/// Largest accepted crop/pad offset in pixels, either direction
pub const MAX_CROP_OFFSET: i32 = 4096;

/// Key of the blackout entry, top level or inside `regions`
const BLACKOUT_KEY: &str = "blackout";

/// Read-only configuration snapshot consumed by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreboardConfig {
    /// Monitored regions by key
    pub regions: BTreeMap<RegionKey, Region>,
    /// Camera-wide preprocessing parameters
    pub preprocess: PreprocessParams,
    /// Separator is present when its mean intensity is below this
    pub separator_threshold: f32,
    /// Delay between pipeline iterations
    pub pacing_interval: Duration,
    /// Capture device opened by `Pipeline::start`
    pub capture_device_index: u32,
    /// Legal countdown transitions per digit region
    pub transitions: BTreeMap<RegionKey, TransitionTable>,
    /// How regions are assembled into clock and score strings
    pub layout: ScoreboardLayout,
    /// Guest team overlay data
    pub guest: TeamInfo,
    /// Home team overlay data
    pub home: TeamInfo,
    /// Free-form ticker text
    pub ticker: String,
}

impl Default for ScoreboardConfig {
    fn default() -> Self {
        Self {
            regions: BTreeMap::new(),
            preprocess: PreprocessParams::default(),
            separator_threshold: DEFAULT_SEPARATOR_THRESHOLD,
            pacing_interval: DEFAULT_PACING_INTERVAL,
            capture_device_index: 0,
            transitions: default_transitions(),
            layout: ScoreboardLayout::default(),
            guest: TeamInfo::default(),
            home: TeamInfo::default(),
            ticker: String::new(),
        }
    }
}

/// Countdown tables for the game clock digits
///
/// The ones digits count 9→0, the seconds-tens digit counts 5→0. Shot clock
/// and score digits get no table and are filtered by vote only.
pub fn default_transitions() -> BTreeMap<RegionKey, TransitionTable> {
    let mut transitions = BTreeMap::new();
    transitions.insert("clock_1".into(), TransitionTable::countdown_decimal());
    transitions.insert("clock_2".into(), TransitionTable::countdown_decimal());
    transitions.insert("clock_3".into(), TransitionTable::countdown_sexagesimal());
    transitions.insert("clock_4".into(), TransitionTable::countdown_decimal());
    transitions
}

impl ScoreboardConfig {
    /// Create a default configuration with no regions
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a region
    pub fn with_region(mut self, region: Region) -> Self {
        self.regions.insert(region.key.clone(), region);
        self
    }

    /// Set the transition table for a region
    pub fn with_transition(mut self, key: impl Into<RegionKey>, table: TransitionTable) -> Self {
        self.transitions.insert(key.into(), table);
        self
    }

    /// Remove the transition table of a region (vote only)
    pub fn without_transition(mut self, key: impl Into<RegionKey>) -> Self {
        self.transitions.remove(&key.into());
        self
    }

    /// Set the preprocessing parameters
    pub fn with_preprocess(mut self, params: PreprocessParams) -> Self {
        self.preprocess = params;
        self
    }

    /// Set the rotation correction in degrees
    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.preprocess.rotation_degrees = degrees;
        self
    }

    /// Set the number of erosion passes
    pub fn with_erosion(mut self, iterations: u32) -> Self {
        self.preprocess.erosion_iterations = iterations;
        self
    }

    /// Set the global crop offsets
    pub fn with_crop(mut self, left: i32, top: i32) -> Self {
        self.preprocess.crop_left = left;
        self.preprocess.crop_top = top;
        self
    }

    /// Add a raw-frame rectangle painted black before segmentation
    pub fn with_blackout(mut self, rect: Rect) -> Self {
        self.preprocess.blackouts.push(rect);
        self
    }

    /// Set the lit-segment color bands
    pub fn with_hue_bands(mut self, bands: Vec<HueBand>) -> Self {
        self.preprocess.hue_bands = bands;
        self
    }

    /// Set the separator threshold
    pub fn with_separator_threshold(mut self, threshold: f32) -> Self {
        self.separator_threshold = threshold;
        self
    }

    /// Set the delay between iterations
    pub fn with_pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval = interval;
        self
    }

    /// Set the capture device index
    pub fn with_capture_device_index(mut self, index: u32) -> Self {
        self.capture_device_index = index;
        self
    }

    /// Set the region layout
    pub fn with_layout(mut self, layout: ScoreboardLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the team overlay data
    pub fn with_teams(mut self, guest: TeamInfo, home: TeamInfo) -> Self {
        self.guest = guest;
        self.home = home;
        self
    }

    /// Set the ticker text
    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = ticker.into();
        self
    }

    /// Regions read as digits
    pub fn digit_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions
            .values()
            .filter(|r| r.mode == RegionMode::Digit)
    }

    /// Regions read as separators
    pub fn separator_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions
            .values()
            .filter(|r| r.mode == RegionMode::Separator)
    }

    /// Load a snapshot from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.display(),
            regions = config.regions.len(),
            "Loaded scoreboard config"
        );
        Ok(config)
    }

    /// Parse a snapshot from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Build a snapshot from a parsed JSON document
    pub fn from_value(value: &Value) -> Result<Self> {
        let doc = value
            .as_object()
            .ok_or_else(|| Error::Config("config document must be a JSON object".into()))?;

        let mut config = Self::default();

        if let Some(regions) = doc.get("regions") {
            config.regions = parse_regions(regions);
        }

        if let Some(v) = scalar(doc, "rotation") {
            config.preprocess.rotation_degrees = v as f32;
        }
        if let Some(v) = unsigned(doc, "erosion") {
            config.preprocess.erosion_iterations = v;
        }
        if let Some(v) = crop_offset(doc, "cropLeft") {
            config.preprocess.crop_left = v;
        }
        if let Some(v) = crop_offset(doc, "cropTop") {
            config.preprocess.crop_top = v;
        }
        if let Some(v) = scalar(doc, "noiseThreshold") {
            config.preprocess.noise_threshold = v.clamp(0.0, 255.0) as u8;
        }
        if let Some(v) = scalar(doc, "binarizeThreshold") {
            config.preprocess.binarize_threshold = v.clamp(0.0, 255.0) as u8;
        }
        if let Some(v) = scalar(doc, "separatorThreshold") {
            config.separator_threshold = v as f32;
        }
        if let Some(v) = unsigned(doc, "pacingIntervalMs") {
            config.pacing_interval = Duration::from_millis(v as u64);
        }
        if let Some(v) = unsigned(doc, "captureDeviceIndex") {
            config.capture_device_index = v;
        }

        let blackout = doc.get(BLACKOUT_KEY).or_else(|| {
            doc.get("regions")
                .and_then(|regions| regions.get(BLACKOUT_KEY))
        });
        if let Some(blackout) = blackout {
            match parse_blackouts(blackout) {
                Some(rects) => config.preprocess.blackouts = rects,
                None => tracing::warn!(value = %blackout, "Ignoring malformed blackout"),
            }
        }

        if let Some(bands) = doc.get("hueBands") {
            match parse_hue_bands(bands) {
                Some(bands) => config.preprocess.hue_bands = bands,
                None => tracing::warn!("Ignoring malformed hueBands, using defaults"),
            }
        }

        if let Some(transitions) = doc.get("transitions") {
            apply_transitions(&mut config.transitions, transitions);
        }

        config.guest = team(doc, "guest");
        config.home = team(doc, "home");
        if let Some(ticker) = doc.get("ticker") {
            match ticker {
                Value::String(s) => config.ticker = s.clone(),
                Value::Null => {}
                other => config.ticker = other.to_string(),
            }
        }

        Ok(config)
    }
}

fn parse_regions(value: &Value) -> BTreeMap<RegionKey, Region> {
    let mut regions = BTreeMap::new();

    let Some(entries) = value.as_object() else {
        tracing::warn!("Ignoring regions: expected an object of region entries");
        return regions;
    };

    let mut malformed = Vec::new();
    for (key, entry) in entries {
        if key == BLACKOUT_KEY {
            continue;
        }
        let (region, bad) = Region::from_entry(RegionKey::new(key.as_str()), entry);
        if bad {
            malformed.push(key.as_str());
        }
        regions.insert(region.key.clone(), region);
    }

    if !malformed.is_empty() {
        tracing::warn!(
            regions = %malformed.join(","),
            "Malformed region coordinates, regions collapsed to zero size"
        );
    }

    regions
}

/// A numeric scalar; missing is silent, unusable values warn
fn scalar(doc: &Map<String, Value>, name: &str) -> Option<f64> {
    let value = doc.get(name)?;
    if value.is_null() {
        return None;
    }

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite());

    if number.is_none() {
        tracing::warn!(field = name, value = %value, "Non-numeric config value, using default");
    }
    number
}

fn unsigned(doc: &Map<String, Value>, name: &str) -> Option<u32> {
    let value = doc.get(name)?;
    if value.is_null() {
        return None;
    }

    let parsed = parse_coordinate(value);
    if parsed.is_none() {
        tracing::warn!(field = name, value = %value, "Invalid config value, using default");
    }
    parsed
}

fn signed(doc: &Map<String, Value>, name: &str) -> Option<i32> {
    scalar(doc, name).map(|v| v.clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}

fn crop_offset(doc: &Map<String, Value>, name: &str) -> Option<i32> {
    let value = signed(doc, name)?;
    let bounded = value.clamp(-MAX_CROP_OFFSET, MAX_CROP_OFFSET);
    if bounded != value {
        tracing::warn!(
            field = name,
            value = value,
            limit = MAX_CROP_OFFSET,
            "Crop offset out of range, clamped"
        );
    }
    Some(bounded)
}

/// One `[left, top, right, bottom, ...]` entry or a list of them
///
/// An entry whose corners are all empty strings or null is unset and skipped.
fn parse_blackouts(value: &Value) -> Option<Vec<Rect>> {
    let Value::Array(items) = value else {
        return None;
    };

    let entries: Vec<&Value> = if items.iter().all(Value::is_array) {
        items.iter().collect()
    } else {
        vec![value]
    };

    let mut rects = Vec::new();
    for entry in entries {
        if is_unset_rect(entry) {
            continue;
        }
        let (region, malformed) = Region::from_entry(RegionKey::new(BLACKOUT_KEY), entry);
        if malformed {
            return None;
        }
        if !region.rect.is_empty() {
            rects.push(region.rect);
        }
    }
    Some(rects)
}

fn is_unset_rect(entry: &Value) -> bool {
    match entry {
        Value::Array(fields) => fields.iter().take(4).all(|field| match field {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }),
        _ => false,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HueBandEntry {
    min_hue: f32,
    max_hue: f32,
    #[serde(default = "default_band_floor")]
    min_saturation: f32,
    #[serde(default = "default_band_floor")]
    min_value: f32,
}

fn default_band_floor() -> f32 {
    0.35
}

fn parse_hue_bands(value: &Value) -> Option<Vec<HueBand>> {
    let entries: Vec<HueBandEntry> = serde_json::from_value(value.clone()).ok()?;
    if entries.is_empty() {
        return None;
    }
    Some(
        entries
            .into_iter()
            .map(|e| HueBand::new(e.min_hue, e.max_hue, e.min_saturation, e.min_value))
            .collect(),
    )
}

/// Overrides per region: a table name, an array of ten successors, or
/// `null`/`"none"` to disable the fast path for that region
fn apply_transitions(transitions: &mut BTreeMap<RegionKey, TransitionTable>, value: &Value) {
    let Some(entries) = value.as_object() else {
        tracing::warn!("Ignoring transitions: expected an object");
        return;
    };

    for (key, entry) in entries {
        let key = RegionKey::new(key.as_str());
        match entry {
            Value::Null => {
                transitions.remove(&key);
            }
            Value::String(name) if name.trim().eq_ignore_ascii_case("none") => {
                transitions.remove(&key);
            }
            Value::String(name) => match TransitionTable::named(name) {
                Some(table) => {
                    transitions.insert(key, table);
                }
                None => tracing::warn!(region = %key, name = %name, "Unknown transition table"),
            },
            Value::Array(items) => match successors(items) {
                Some(table) => {
                    transitions.insert(key, table);
                }
                None => tracing::warn!(region = %key, "Malformed transition table"),
            },
            _ => tracing::warn!(region = %key, "Malformed transition table"),
        }
    }
}

fn successors(items: &[Value]) -> Option<TransitionTable> {
    if items.len() != 10 {
        return None;
    }
    let mut table = [0u8; 10];
    for (slot, item) in table.iter_mut().zip(items) {
        let digit = parse_coordinate(item)?;
        *slot = u8::try_from(digit).ok()?;
    }
    TransitionTable::new(table)
}

fn team(doc: &Map<String, Value>, name: &str) -> TeamInfo {
    match doc.get(name) {
        None | Some(Value::Null) => TeamInfo::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            tracing::warn!(team = name, error = %e, "Malformed team info, using defaults");
            TeamInfo::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::Rect;

    #[test]
    fn test_default_config() {
        let config = ScoreboardConfig::default();

        assert!(config.regions.is_empty());
        assert_eq!(config.separator_threshold, 100.0);
        assert_eq!(config.pacing_interval, Duration::from_millis(100));
        assert_eq!(config.capture_device_index, 0);
        assert_eq!(
            config.transitions.get(&RegionKey::from("clock_3")),
            Some(&TransitionTable::countdown_sexagesimal())
        );
        assert!(config
            .transitions
            .get(&RegionKey::from("shot_clock_1"))
            .is_none());
    }

    #[test]
    fn test_builder() {
        let config = ScoreboardConfig::new()
            .with_region(Region::digit("clock_1", Rect::new(0, 0, 10, 14)))
            .with_region(Region::separator("clock_colon", Rect::new(10, 0, 12, 14)))
            .with_rotation(-2.5)
            .with_erosion(2)
            .with_crop(4, -3)
            .with_separator_threshold(80.0)
            .with_pacing_interval(Duration::from_millis(40))
            .with_capture_device_index(2)
            .without_transition("clock_1")
            .with_ticker("Final four");

        assert_eq!(config.regions.len(), 2);
        assert_eq!(config.digit_regions().count(), 1);
        assert_eq!(config.separator_regions().count(), 1);
        assert_eq!(config.preprocess.rotation_degrees, -2.5);
        assert_eq!(config.preprocess.erosion_iterations, 2);
        assert_eq!(config.preprocess.crop_left, 4);
        assert_eq!(config.preprocess.crop_top, -3);
        assert_eq!(config.separator_threshold, 80.0);
        assert_eq!(config.pacing_interval, Duration::from_millis(40));
        assert_eq!(config.capture_device_index, 2);
        assert!(config
            .transitions
            .get(&RegionKey::from("clock_1"))
            .is_none());
        assert_eq!(config.ticker, "Final four");
    }

    #[test]
    fn test_from_json_full_document() {
        let config = ScoreboardConfig::from_json_str(
            r##"{
                "regions": {
                    "clock_1": ["10", "20", "60", "90", "50", "70", "digit"],
                    "clock_colon": [70, 30, 80, 80, 10, 50, "separator"]
                },
                "rotation": "1.5", "erosion": 2, "cropLeft": -4, "cropTop": "6",
                "pacingIntervalMs": 250, "captureDeviceIndex": "1",
                "separatorThreshold": 90, "noiseThreshold": 20,
                "guest": {"name": "Visitors", "imagePath": "img/v.png", "color": "#00f"},
                "home": {"name": "Hosts", "imagePath": "img/h.png", "color": "#f00"},
                "ticker": "Halftime show"
            }"##,
        )
        .unwrap();

        assert_eq!(config.regions.len(), 2);
        assert_eq!(
            config.regions[&RegionKey::from("clock_1")].rect,
            Rect::new(10, 20, 60, 90)
        );
        assert_eq!(
            config.regions[&RegionKey::from("clock_colon")].mode,
            RegionMode::Separator
        );
        assert_eq!(config.preprocess.rotation_degrees, 1.5);
        assert_eq!(config.preprocess.erosion_iterations, 2);
        assert_eq!(config.preprocess.crop_left, -4);
        assert_eq!(config.preprocess.crop_top, 6);
        assert_eq!(config.preprocess.noise_threshold, 20);
        assert_eq!(config.pacing_interval, Duration::from_millis(250));
        assert_eq!(config.capture_device_index, 1);
        assert_eq!(config.separator_threshold, 90.0);
        assert_eq!(config.guest.name, "Visitors");
        assert_eq!(config.home.image_path, "img/h.png");
        assert_eq!(config.ticker, "Halftime show");
    }

    #[test]
    fn test_from_json_lenient_scalars() {
        let config = ScoreboardConfig::from_json_str(
            r#"{"rotation": "sideways", "erosion": -1, "pacingIntervalMs": null}"#,
        )
        .unwrap();
        let defaults = ScoreboardConfig::default();

        assert_eq!(config.preprocess.rotation_degrees, 0.0);
        assert_eq!(
            config.preprocess.erosion_iterations,
            defaults.preprocess.erosion_iterations
        );
        assert_eq!(config.pacing_interval, defaults.pacing_interval);
    }

    #[test]
    fn test_from_json_crop_offsets_are_bounded() {
        let config = ScoreboardConfig::from_json_str(
            r#"{"regions": {"clock_1": [0, 0, 10, 10]},
                "cropLeft": -2147483648, "cropTop": "99999999999"}"#,
        )
        .unwrap();

        assert_eq!(config.preprocess.crop_left, -MAX_CROP_OFFSET);
        assert_eq!(config.preprocess.crop_top, MAX_CROP_OFFSET);

        let config =
            ScoreboardConfig::from_json_str(r#"{"cropLeft": -12, "cropTop": "7"}"#).unwrap();
        assert_eq!(config.preprocess.crop_left, -12);
        assert_eq!(config.preprocess.crop_top, 7);
    }

    #[test]
    fn test_from_json_blackout() {
        let config = ScoreboardConfig::from_json_str(
            r#"{"blackout": ["10", "20", "60", "90", "50", "70"]}"#,
        )
        .unwrap();
        assert_eq!(config.preprocess.blackouts, vec![Rect::new(10, 20, 60, 90)]);

        // Also accepted inside regions, where it is not a digit region
        let config = ScoreboardConfig::from_json_str(
            r#"{"regions": {"blackout": [0, 0, 5, 5], "clock_1": [0, 0, 10, 10]}}"#,
        )
        .unwrap();
        assert_eq!(config.preprocess.blackouts, vec![Rect::new(0, 0, 5, 5)]);
        assert_eq!(config.regions.len(), 1);

        let config = ScoreboardConfig::from_json_str(
            r#"{"blackout": [[0, 0, 5, 5], ["", "", "", ""], [1, 1, 1, 1], [40, 0, 50, 8]]}"#,
        )
        .unwrap();
        assert_eq!(
            config.preprocess.blackouts,
            vec![Rect::new(0, 0, 5, 5), Rect::new(40, 0, 50, 8)]
        );

        let config =
            ScoreboardConfig::from_json_str(r#"{"blackout": ["x", 0, 5, 5]}"#).unwrap();
        assert!(config.preprocess.blackouts.is_empty());

        let config = ScoreboardConfig::default().with_blackout(Rect::new(1, 2, 3, 4));
        assert_eq!(config.preprocess.blackouts, vec![Rect::new(1, 2, 3, 4)]);
    }

    #[test]
    fn test_from_json_malformed_region_is_zero_size() {
        let config =
            ScoreboardConfig::from_json_str(r#"{"regions": {"clock_2": ["x", 0, 10, 10]}}"#)
                .unwrap();

        assert!(config.regions[&RegionKey::from("clock_2")].rect.is_empty());
    }

    #[test]
    fn test_from_json_transitions_and_bands() {
        let config = ScoreboardConfig::from_json_str(
            r#"{
                "transitions": {
                    "clock_1": null,
                    "shot_clock_2": "decimal",
                    "shot_clock_1": [9, 0, 1, 2, 3, 4, 5, 6, 7, 8],
                    "clock_4": "bogus"
                },
                "hueBands": [{"minHue": 90, "maxHue": 150}]
            }"#,
        )
        .unwrap();

        assert!(config
            .transitions
            .get(&RegionKey::from("clock_1"))
            .is_none());
        assert_eq!(
            config.transitions.get(&RegionKey::from("shot_clock_2")),
            Some(&TransitionTable::countdown_decimal())
        );
        assert_eq!(
            config.transitions.get(&RegionKey::from("shot_clock_1")),
            Some(&TransitionTable::countdown_decimal())
        );
        // Unknown names leave the default in place
        assert_eq!(
            config.transitions.get(&RegionKey::from("clock_4")),
            Some(&TransitionTable::countdown_decimal())
        );
        assert_eq!(
            config.preprocess.hue_bands,
            vec![HueBand::new(90.0, 150.0, 0.35, 0.35)]
        );
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(matches!(
            ScoreboardConfig::from_json_str("[1, 2, 3]"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ScoreboardConfig::from_json_str("{not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_from_value_bad_team_uses_default() {
        let config = ScoreboardConfig::from_value(&json!({"home": 42, "ticker": 7})).unwrap();
        assert_eq!(config.home, TeamInfo::default());
        assert_eq!(config.ticker, "7");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scoreboard.json");
        std::fs::write(
            &path,
            r#"{"regions": {"shot_clock_1": [0, 0, 5, 7]}, "captureDeviceIndex": 3}"#,
        )
        .unwrap();

        let config = ScoreboardConfig::load(&path).unwrap();
        assert_eq!(config.capture_device_index, 3);
        assert_eq!(config.regions.len(), 1);

        assert!(matches!(
            ScoreboardConfig::load(dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));
    }
}
