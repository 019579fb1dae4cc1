//! Hub configuration

use std::time::Duration;

/// Broadcast hub configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Payloads buffered per subscriber before it is considered stuck
    pub queue_capacity: usize,

    /// How often closed subscribers are pruned and counts logged
    pub housekeeping_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 32,
            housekeeping_interval: Duration::from_secs(30),
        }
    }
}

impl HubConfig {
    /// Set the per-subscriber queue capacity (at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the housekeeping interval
    pub fn housekeeping_interval(mut self, interval: Duration) -> Self {
        self.housekeeping_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.queue_capacity, 32);
        assert_eq!(config.housekeeping_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_queue_capacity_floor() {
        assert_eq!(HubConfig::default().queue_capacity(0).queue_capacity, 1);
    }
}
