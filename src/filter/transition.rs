//! Legal-transition tables for countdown digits
//!
//! A countdown digit can only move to one next value: the seconds-ones digit
//! goes 9→8→…→0→9, the seconds-tens digit 5→4→…→0→5. When the newest reading is
//! exactly that successor the filter accepts it without waiting for a vote.

use crate::vision::Reading;

/// Successor of each digit 0–9
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTable {
    successors: [u8; 10],
}

impl TransitionTable {
    /// Build a table from explicit successors; every entry must be a digit
    pub fn new(successors: [u8; 10]) -> Option<Self> {
        if successors.iter().all(|d| *d <= 9) {
            Some(Self { successors })
        } else {
            None
        }
    }

    /// 9→8→…→0→9
    pub fn countdown_decimal() -> Self {
        Self {
            successors: [9, 0, 1, 2, 3, 4, 5, 6, 7, 8],
        }
    }

    /// 5→4→…→0→5 (tens of seconds)
    pub fn countdown_sexagesimal() -> Self {
        Self {
            successors: [5, 0, 1, 2, 3, 4, 5, 6, 7, 8],
        }
    }

    /// Look up a table by name (`decimal`, `sexagesimal`)
    pub fn named(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "decimal" | "countdown" | "countdown_decimal" => Some(Self::countdown_decimal()),
            "sexagesimal" | "tens" | "countdown_sexagesimal" => {
                Some(Self::countdown_sexagesimal())
            }
            _ => None,
        }
    }

    /// Legal next value after `reading`; only digits have a successor
    pub fn successor(&self, reading: Reading) -> Option<Reading> {
        let digit = reading.digit()?;
        self.successors
            .get(digit as usize)
            .map(|next| Reading::Digit(*next))
    }

    /// Whether `next` is the legal successor of `previous`
    pub fn is_legal(&self, previous: Reading, next: Reading) -> bool {
        self.successor(previous) == Some(next)
    }
}
