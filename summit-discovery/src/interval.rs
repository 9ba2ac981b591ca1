//! Reconciling the registry fetch interval with the discovery refresh period

use std::time::Duration;

/// Library default for the registry client's fetch interval, in seconds
pub const DEFAULT_REGISTRY_FETCH_INTERVAL_SECONDS: u64 = 30;

/// Library default for the discovery-wide refresh period
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Decide the effective registry fetch interval, in seconds
///
/// An explicit client interval survives only while the refresh period is
/// still at its default. In every other combination the refresh period wins
/// and is truncated to whole seconds.
pub fn reconcile(
    client_interval: u64,
    client_interval_default: u64,
    refresh_period: Duration,
    refresh_period_default: Duration,
) -> u64 {
    let client_overridden = client_interval != client_interval_default;
    let refresh_untouched = refresh_period == refresh_period_default;

    if client_overridden && refresh_untouched {
        client_interval
    } else {
        refresh_period.as_secs()
    }
}

/// The two competing interval settings together with their defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalConfig {
    pub client_interval: u64,
    pub client_interval_default: u64,
    pub refresh_period: Duration,
    pub refresh_period_default: Duration,
}

impl IntervalConfig {
    pub fn new(client_interval: u64, refresh_period: Duration) -> Self {
        Self {
            client_interval,
            client_interval_default: DEFAULT_REGISTRY_FETCH_INTERVAL_SECONDS,
            refresh_period,
            refresh_period_default: DEFAULT_REFRESH_PERIOD,
        }
    }

    pub fn with_defaults(mut self, client_interval: u64, refresh_period: Duration) -> Self {
        self.client_interval_default = client_interval;
        self.refresh_period_default = refresh_period;
        self
    }

    pub fn effective(&self) -> u64 {
        reconcile(
            self.client_interval,
            self.client_interval_default,
            self.refresh_period,
            self.refresh_period_default,
        )
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_FETCH_INTERVAL_SECONDS, DEFAULT_REFRESH_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THIRTY: Duration = Duration::from_secs(30);

    #[test]
    fn test_client_override_wins_when_refresh_untouched() {
        assert_eq!(reconcile(5, 30, THIRTY, THIRTY), 5);
    }

    #[test]
    fn test_refresh_override_wins_over_default_client() {
        assert_eq!(reconcile(30, 30, Duration::from_secs(10), THIRTY), 10);
    }

    #[test]
    fn test_both_overridden_refresh_wins() {
        assert_eq!(reconcile(5, 30, Duration::from_secs(10), THIRTY), 10);
    }

    #[test]
    fn test_both_default_refresh_is_written_back() {
        assert_eq!(reconcile(30, 30, Duration::from_secs(60), Duration::from_secs(60)), 60);
    }

    #[test]
    fn test_sub_second_refresh_truncates() {
        assert_eq!(reconcile(30, 30, Duration::from_millis(2500), THIRTY), 2);
        assert_eq!(reconcile(30, 30, Duration::from_millis(500), THIRTY), 0);
    }

    #[test]
    fn test_interval_config_defaults() {
        assert_eq!(IntervalConfig::default().effective(), 60);
        assert_eq!(IntervalConfig::new(3, DEFAULT_REFRESH_PERIOD).effective(), 3);
        assert_eq!(IntervalConfig::new(3, Duration::from_secs(15)).effective(), 15);

        let custom = IntervalConfig::new(5, THIRTY).with_defaults(30, THIRTY);
        assert_eq!(custom.effective(), 5);
    }
}
