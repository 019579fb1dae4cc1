//! Published scoreboard message
//!
//! The wire format consumed by the display page:
//!
//! ```text
//! {"game":  {"clock": "12:34", "shot_clock": "24"},
//!  "guest": {"name": "...", "imagePath": "...", "color": "...", "score": "12"},
//!  "home":  {"name": "...", "imagePath": "...", "color": "...", "score": "9"},
//!  "ticker": "..."}
//! ```
//!
//! Only `game` and the scores come from recognition; team details and the
//! ticker come from the configuration snapshot and are merged before publish.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::clock::ClockState;
use crate::config::ScoreboardConfig;

/// Team overlay data supplied by the control surface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamInfo {
    /// Display name
    pub name: String,
    /// Logo path or URL, relative to the asset root
    pub image_path: String,
    /// CSS color
    pub color: String,
}

impl TeamInfo {
    /// Create team info
    pub fn new(
        name: impl Into<String>,
        image_path: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            image_path: image_path.into(),
            color: color.into(),
        }
    }
}

/// Recognized clock strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMessage {
    /// Game clock, `"5:09"` or `"12.3"` under a minute
    pub clock: String,
    /// Shot clock, `"14"` or `"4.2"` with the decimal lit
    pub shot_clock: String,
}

/// Team data plus the recognized score
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMessage {
    /// Name, logo and color, serialized inline
    #[serde(flatten)]
    pub info: TeamInfo,
    /// Score without leading zeros; `""` when every score digit is blank
    pub score: String,
}

/// One complete update for the display page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreboardMessage {
    /// Clock readings
    pub game: GameMessage,
    /// Visiting team
    pub guest: TeamMessage,
    /// Home team
    pub home: TeamMessage,
    /// Free text shown under the board
    #[serde(default)]
    pub ticker: String,
}

impl ScoreboardMessage {
    /// Merge an assembled frame with the overlay data of a snapshot
    pub fn from_state(state: &ClockState, config: &ScoreboardConfig) -> Self {
        Self {
            game: GameMessage {
                clock: state.clock.clone(),
                shot_clock: state.shot_clock.clone(),
            },
            guest: TeamMessage {
                info: config.guest.clone(),
                score: state.guest_score.clone(),
            },
            home: TeamMessage {
                info: config.home.clone(),
                score: state.home_score.clone(),
            },
            ticker: config.ticker.clone(),
        }
    }

    /// Serialize to the JSON payload sent to subscribers
    pub fn to_payload(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}
