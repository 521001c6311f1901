use serde::{Deserialize, Serialize};

use crate::device::constants::{DEFAULT_COLD_THRESHOLD, DEFAULT_SCAN_DURATION, SUPPORTED_NAME};
use crate::device::reconnect::ReconnectPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub supported_name: String,
    pub cold_threshold: f64,
    pub scan_duration_secs: u64,
    pub allow_duplicates: bool,
    pub autoconnect: bool,
    pub notifications_enabled: bool,
    pub reconnect: ReconnectPolicy,
}

impl Config {
    /// Replaces values that would leave the session unusable with their defaults.
    pub fn sanitize(&mut self) {
        let defaults = Config::default();

        if self.supported_name.is_empty() {
            self.supported_name = defaults.supported_name;
        }

        if !self.cold_threshold.is_finite() {
            self.cold_threshold = defaults.cold_threshold;
        }

        // a zero length scan would never see an advertisement
        self.scan_duration_secs = self.scan_duration_secs.max(1);
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            supported_name: SUPPORTED_NAME.to_string(),
            cold_threshold: DEFAULT_COLD_THRESHOLD,
            scan_duration_secs: DEFAULT_SCAN_DURATION,
            allow_duplicates: false,
            autoconnect: true,
            notifications_enabled: true,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"coldThreshold": 35.5}"#).unwrap();

        assert_eq!(config.cold_threshold, 35.5);
        assert_eq!(config.supported_name, "beverage_notifier");
        assert_eq!(config.scan_duration_secs, 1);
        assert!(config.autoconnect);
        assert_eq!(config.reconnect, ReconnectPolicy::default());
    }

    #[test]
    fn reconnect_policy_from_json() {
        let config: Config = serde_json::from_str(
            r#"{"reconnect": {"maxAttempts": 5, "backoffInitialMs": 250}}"#
        ).unwrap();

        assert_eq!(config.reconnect.max_attempts, Some(5));
        assert_eq!(config.reconnect.backoff_initial_ms, 250);
        assert_eq!(config.reconnect.backoff_max_ms, 30_000);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_string(&Config::default()).unwrap();

        assert!(json.contains("\"supportedName\":\"beverage_notifier\""));
        assert!(json.contains("\"scanDurationSecs\":1"));
        assert!(json.contains("\"maxAttempts\":null"));
    }

    #[test]
    fn sanitize_restores_unusable_values() {
        let mut config = Config {
            supported_name: String::new(),
            scan_duration_secs: 0,
            ..Config::default()
        };
        config.sanitize();

        assert_eq!(config.supported_name, "beverage_notifier");
        assert_eq!(config.scan_duration_secs, 1);
    }
}
