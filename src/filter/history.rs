//! Rolling history of raw readings

use std::collections::VecDeque;

use crate::vision::Reading;

/// Number of readings kept per region
pub const HISTORY_LEN: usize = 3;

/// Fixed-length FIFO of the most recent raw readings, newest last
///
/// Until the history is warmed up the missing slots simply do not vote, so a
/// fresh history behaves like "use the latest reading".
#[derive(Debug, Clone, Default)]
pub struct RollingHistory {
    readings: VecDeque<Reading>,
}

impl RollingHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self {
            readings: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// Record a reading, evicting the oldest once full
    pub fn push(&mut self, reading: Reading) {
        if self.readings.len() == HISTORY_LEN {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    /// The most recent reading
    pub fn newest(&self) -> Option<Reading> {
        self.readings.back().copied()
    }

    /// Readings oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    /// Number of populated slots
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether no reading has been recorded
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Whether every slot is populated
    pub fn is_warm(&self) -> bool {
        self.readings.len() == HISTORY_LEN
    }

    /// Drop all readings
    pub fn clear(&mut self) {
        self.readings.clear();
    }

    /// Most frequent reading; ties go to the value seen most recently
    pub fn mode(&self) -> Option<Reading> {
        let mut best: Option<(Reading, usize, usize)> = None;

        for (index, reading) in self.readings.iter().enumerate() {
            let count = self.readings.iter().filter(|r| *r == reading).count();
            let last_seen = self
                .readings
                .iter()
                .rposition(|r| r == reading)
                .unwrap_or(index);

            let better = match best {
                None => true,
                Some((_, best_count, best_seen)) => {
                    count > best_count || (count == best_count && last_seen > best_seen)
                }
            };
            if better {
                best = Some((*reading, count, last_seen));
            }
        }

        best.map(|(reading, _, _)| reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(readings: &[Reading]) -> RollingHistory {
        let mut h = RollingHistory::new();
        for r in readings {
            h.push(*r);
        }
        h
    }

    #[test]
    fn test_evicts_oldest() {
        let h = history(&[
            Reading::Digit(1),
            Reading::Digit(2),
            Reading::Digit(3),
            Reading::Digit(4),
        ]);

        assert_eq!(h.len(), HISTORY_LEN);
        assert!(h.is_warm());
        assert_eq!(h.newest(), Some(Reading::Digit(4)));
        assert_eq!(
            h.iter().copied().collect::<Vec<_>>(),
            vec![Reading::Digit(2), Reading::Digit(3), Reading::Digit(4)]
        );
    }

    #[test]
    fn test_mode_majority() {
        let h = history(&[Reading::Digit(5), Reading::Unrecognized, Reading::Digit(5)]);
        assert_eq!(h.mode(), Some(Reading::Digit(5)));

        let h = history(&[Reading::Digit(5), Reading::Digit(5), Reading::Digit(1)]);
        assert_eq!(h.mode(), Some(Reading::Digit(5)));
    }

    #[test]
    fn test_mode_tie_prefers_most_recent() {
        let h = history(&[Reading::Digit(1), Reading::Digit(2), Reading::Digit(3)]);
        assert_eq!(h.mode(), Some(Reading::Digit(3)));

        let h = history(&[Reading::Digit(7), Reading::Digit(6)]);
        assert_eq!(h.mode(), Some(Reading::Digit(6)));
    }

    #[test]
    fn test_warm_up_uses_latest() {
        let h = history(&[Reading::Digit(9)]);
        assert!(!h.is_warm());
        assert_eq!(h.mode(), Some(Reading::Digit(9)));

        assert_eq!(RollingHistory::new().mode(), None);
    }

    #[test]
    fn test_clear() {
        let mut h = history(&[Reading::Blank]);
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.newest(), None);
    }
}
