//! Temporal filtering of raw digit readings
//!
//! Raw per-frame readings flicker. This module keeps a short rolling history
//! per region and combines majority voting with legal countdown transitions to
//! produce a stable value without lagging genuine clock ticks.

pub mod history;
pub mod stabilizer;
pub mod transition;

pub use history::{RollingHistory, HISTORY_LEN};
pub use stabilizer::{FilterBank, Stabilizer};
pub use transition::TransitionTable;
