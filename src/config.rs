//! Configuration types for sensor-relay

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Download polling behavior
///
/// Asynchronous exports are materialized server-side; until a job finishes,
/// its one-time download URL answers 202. This controls how often the client
/// re-checks and how long it is willing to wait in total before giving up
/// with a timeout error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Time to wait between repeated checks of the download URL (default: 30s)
    #[serde(default = "default_poll_interval")]
    pub interval: Duration,

    /// Maximum total time to wait for an export to become ready (default: 1h)
    #[serde(default = "default_poll_max_wait")]
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            max_wait: default_poll_max_wait(),
        }
    }
}

/// Identity of the source sensor, stamped onto raw uploads
///
/// Derived records copy these fields from their source records instead,
/// so this only matters when ingesting raw captures.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Numeric device identifier assigned by the service
    #[serde(default)]
    pub device_id: u32,

    /// Serial number of the source sensor
    #[serde(default)]
    pub serial_number: String,

    /// Geographic latitude of the sensor
    #[serde(default)]
    pub latitude: f64,

    /// Geographic longitude of the sensor
    #[serde(default)]
    pub longitude: f64,

    /// UTC offset of the sensor's local time in minutes
    ///
    /// Capture timestamps embedded in raw file names carry no zone
    /// information; this offset fixes their interpretation.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Main configuration for sensor-relay
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the metadata service API
    pub base_url: Url,

    /// HTTP user agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Path to the persisted credential file
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    /// Download polling behavior
    #[serde(default)]
    pub poll: PollConfig,

    /// Identity of the source sensor (raw uploads only)
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Prefix applied to uploaded file names to avoid collisions with
    /// records from other deployments (empty = no prefix)
    #[serde(default)]
    pub filename_prefix: String,
}

impl Config {
    /// Create a configuration with the given API base URL and defaults for
    /// everything else
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            user_agent: default_user_agent(),
            credentials_path: default_credentials_path(),
            poll: PollConfig::default(),
            sensor: SensorConfig::default(),
            filename_prefix: String::new(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("sensor-relay/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("api_config.json")
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_max_wait() -> Duration {
    Duration::from_secs(3600)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new(Url::parse("https://metadata.example.org/api/v1").unwrap());
        assert_eq!(config.poll.interval, Duration::from_secs(30));
        assert_eq!(config.poll.max_wait, Duration::from_secs(3600));
        assert_eq!(config.credentials_path, PathBuf::from("api_config.json"));
        assert!(config.user_agent.starts_with("sensor-relay/"));
        assert!(config.filename_prefix.is_empty());
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: Config = serde_json::from_str(
            r#"{"base_url": "https://metadata.example.org/api/v1"}"#,
        )
        .unwrap();
        assert_eq!(
            config.base_url.as_str(),
            "https://metadata.example.org/api/v1"
        );
        assert_eq!(config.sensor.device_id, 0);
        assert_eq!(config.sensor.utc_offset_minutes, 0);
    }

    #[test]
    fn test_deserialize_sensor_identity() {
        let config: Config = serde_json::from_str(
            r#"{
                "base_url": "https://metadata.example.org/api/v1",
                "sensor": {
                    "device_id": 8220,
                    "serial_number": "d49a6930-7ab7-450f-afad-c38cff2f8109",
                    "latitude": 50.9295304,
                    "longitude": 6.8947454,
                    "utc_offset_minutes": 120
                },
                "filename_prefix": "Station-7-"
            }"#,
        )
        .unwrap();
        assert_eq!(config.sensor.device_id, 8220);
        assert_eq!(config.sensor.utc_offset_minutes, 120);
        assert_eq!(config.filename_prefix, "Station-7-");
    }
}
