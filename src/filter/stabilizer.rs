//! Per-region temporal consistency filter
//!
//! Each digit region gets a [`Stabilizer`]: a rolling history of raw readings
//! plus the last stabilized value. The stabilized output is either
//!
//! - the raw reading itself, when it is the legal countdown successor of the
//!   previous stabilized value (or simply repeats it), for regions with a
//!   transition table, or
//! - the majority of the rolling history, ties going to the newest value.
//!
//! The first path follows genuine clock ticks without lag, the second outvotes
//! single-frame misreads.

use std::collections::HashMap;

use super::history::RollingHistory;
use super::transition::TransitionTable;
use crate::config::{RegionKey, RegionMode, ScoreboardConfig};
use crate::vision::Reading;

/// Temporal filter state for one digit region
#[derive(Debug, Clone, Default)]
pub struct Stabilizer {
    history: RollingHistory,
    previous: Option<Reading>,
    transitions: Option<TransitionTable>,
}

impl Stabilizer {
    /// Majority-vote only (score digits and other non-countdown regions)
    pub fn new() -> Self {
        Self::default()
    }

    /// Vote plus legal-transition fast path
    pub fn with_transitions(table: TransitionTable) -> Self {
        Self {
            transitions: Some(table),
            ..Self::default()
        }
    }

    /// Replace the transition table, keeping the history
    pub fn set_transitions(&mut self, table: Option<TransitionTable>) {
        self.transitions = table;
    }

    /// The configured transition table
    pub fn transitions(&self) -> Option<&TransitionTable> {
        self.transitions.as_ref()
    }

    /// The last stabilized value
    pub fn previous(&self) -> Option<Reading> {
        self.previous
    }

    /// The rolling history of raw readings
    pub fn history(&self) -> &RollingHistory {
        &self.history
    }

    /// Feed one raw reading and return the stabilized value for this frame
    pub fn observe(&mut self, raw: Reading) -> Reading {
        self.history.push(raw);

        let fast_path = match (&self.transitions, self.previous) {
            (Some(table), Some(previous)) => {
                previous.is_digit() && (raw == previous || table.is_legal(previous, raw))
            }
            _ => false,
        };

        let stabilized = if fast_path {
            raw
        } else {
            self.history.mode().unwrap_or(raw)
        };

        self.previous = Some(stabilized);
        stabilized
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.history.clear();
        self.previous = None;
    }
}

/// Stabilizers for every digit region of a configuration
///
/// Owned by the pipeline runner; kept across iterations and re-synced when the
/// configuration snapshot changes.
#[derive(Debug, Default)]
pub struct FilterBank {
    stabilizers: HashMap<RegionKey, Stabilizer>,
}

impl FilterBank {
    /// Create an empty bank
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bank matching a configuration
    pub fn from_config(config: &ScoreboardConfig) -> Self {
        let mut bank = Self::new();
        bank.sync(config);
        bank
    }

    /// Align the bank with a configuration snapshot
    ///
    /// New digit regions get a fresh stabilizer, removed regions are dropped and
    /// surviving regions keep their history with the current transition table.
    pub fn sync(&mut self, config: &ScoreboardConfig) {
        self.stabilizers.retain(|key, _| {
            config
                .regions
                .get(key)
                .is_some_and(|r| r.mode == RegionMode::Digit)
        });

        for region in config.regions.values() {
            if region.mode != RegionMode::Digit {
                continue;
            }
            let table = config.transitions.get(&region.key).copied();
            self.stabilizers
                .entry(region.key.clone())
                .or_default()
                .set_transitions(table);
        }
    }

    /// Feed a raw reading for a region
    pub fn observe(&mut self, key: &RegionKey, raw: Reading) -> Reading {
        match self.stabilizers.get_mut(key) {
            Some(stabilizer) => stabilizer.observe(raw),
            None => self
                .stabilizers
                .entry(key.clone())
                .or_default()
                .observe(raw),
        }
    }

    /// Stabilizer for a region
    pub fn get(&self, key: &RegionKey) -> Option<&Stabilizer> {
        self.stabilizers.get(key)
    }

    /// Number of tracked regions
    pub fn len(&self) -> usize {
        self.stabilizers.len()
    }

    /// Whether no region is tracked
    pub fn is_empty(&self) -> bool {
        self.stabilizers.is_empty()
    }

    /// Reset every stabilizer
    pub fn reset(&mut self) {
        for stabilizer in self.stabilizers.values_mut() {
            stabilizer.reset();
        }
    }
}
