//! Engine configuration file support.
//!
//! Reads engine tuning from a TOML file (`skytransit.toml`) with sensible
//! defaults for every field, so an empty file — or no file at all — yields
//! a working configuration. The flight-feed API key is resolved from the
//! environment, never from the config file.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::BoundingBox;
use crate::error::{EngineError, EngineResult};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub thresholds: ThresholdSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub flight_feed: FlightFeedSettings,
    /// Default search area used when a request carries no bounding box.
    #[serde(default)]
    pub area: Option<AreaSettings>,
}

/// Look-ahead window settings for the closest-approach search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Look-ahead horizon in minutes
    #[serde(default = "default_horizon_minutes")]
    pub horizon_minutes: u32,
    /// Sample step inside the window, in seconds
    #[serde(default = "default_step_seconds")]
    pub step_seconds: u32,
    /// Minutes of consecutive non-improving samples before the scan bails
    #[serde(default = "default_no_improve_minutes")]
    pub no_improve_minutes: u32,
}

fn default_horizon_minutes() -> u32 {
    15
}

fn default_step_seconds() -> u32 {
    1
}

fn default_no_improve_minutes() -> u32 {
    3
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            horizon_minutes: default_horizon_minutes(),
            step_seconds: default_step_seconds(),
            no_improve_minutes: default_no_improve_minutes(),
        }
    }
}

/// Reporting-gate and tracking thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSettings {
    /// Altitude-difference gate for reporting a candidate, degrees
    #[serde(default = "default_alt_gate")]
    pub alt_gate_deg: f64,
    /// Azimuth-difference gate for reporting a candidate, degrees
    #[serde(default = "default_az_gate")]
    pub az_gate_deg: f64,
    /// Minimum target altitude before the flight search runs, degrees
    #[serde(default = "default_min_trackable")]
    pub min_trackable_altitude_deg: f64,
}

fn default_alt_gate() -> f64 {
    5.0
}

fn default_az_gate() -> f64 {
    10.0
}

fn default_min_trackable() -> f64 {
    15.0
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            alt_gate_deg: default_alt_gate(),
            az_gate_deg: default_az_gate(),
            min_trackable_altitude_deg: default_min_trackable(),
        }
    }
}

/// Flight-data cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
    /// Entry-count ceiling that triggers an expired-entry sweep
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

fn default_cache_ttl() -> u64 {
    600
}

fn default_cache_max_entries() -> usize {
    100
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
        }
    }
}

/// Poll-interval settings for the adaptive scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    /// Interval recommended when no high/medium candidate is close, seconds
    #[serde(default = "default_poll_seconds")]
    pub default_seconds: u64,
}

fn default_poll_seconds() -> u64 {
    600
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            default_seconds: default_poll_seconds(),
        }
    }
}

/// Flight-feed HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightFeedSettings {
    /// Search endpoint base URL
    #[serde(default = "default_feed_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_feed_timeout")]
    pub timeout_seconds: u64,
}

fn default_feed_url() -> String {
    "https://aeroapi.flightaware.com/aeroapi/flights/search".to_string()
}

fn default_feed_timeout() -> u64 {
    30
}

impl Default for FlightFeedSettings {
    fn default() -> Self {
        Self {
            base_url: default_feed_url(),
            timeout_seconds: default_feed_timeout(),
        }
    }
}

/// Default search-area corners from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaSettings {
    pub lat_lower_left: f64,
    pub lon_lower_left: f64,
    pub lat_upper_right: f64,
    pub lon_upper_right: f64,
}

impl AreaSettings {
    /// Convert to a validated bounding box.
    pub fn to_bounding_box(&self) -> EngineResult<BoundingBox> {
        BoundingBox::new(
            self.lat_lower_left,
            self.lon_lower_left,
            self.lat_upper_right,
            self.lon_upper_right,
        )
    }
}

impl EngineConfig {
    /// Load engine configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `EngineError::Configuration` if the file cannot be read or
    /// parsed, or if the configured search window is degenerate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::Configuration(format!("failed to read config file: {}", e))
        })?;

        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            EngineError::Configuration(format!("failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `skytransit.toml` in the current or parent directory,
    /// falling back to defaults when no file exists.
    pub fn from_default_location() -> EngineResult<Self> {
        let search_paths = [
            PathBuf::from("skytransit.toml"),
            PathBuf::from("../skytransit.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Reject configurations that would produce an empty search window.
    pub fn validate(&self) -> EngineResult<()> {
        if self.search.step_seconds == 0 {
            return Err(EngineError::Configuration(
                "search.step_seconds must be at least 1".to_string(),
            ));
        }
        if self.search.step_seconds > 60 {
            return Err(EngineError::Configuration(
                "search.step_seconds must not exceed 60 (one sample per minute minimum)"
                    .to_string(),
            ));
        }
        if self.search.horizon_minutes == 0 {
            return Err(EngineError::Configuration(
                "search.horizon_minutes must be at least 1".to_string(),
            ));
        }
        if let Some(area) = &self.area {
            area.to_bounding_box()?;
        }
        Ok(())
    }

    /// The default bounding box, if one is configured.
    pub fn default_bounding_box(&self) -> EngineResult<Option<BoundingBox>> {
        self.area
            .as_ref()
            .map(|a| a.to_bounding_box())
            .transpose()
    }
}

/// Resolve the flight-feed API key from the environment.
///
/// Checks `AEROAPI_API_KEY` first, then the legacy `FLIGHTAWARE_API_KEY`.
pub fn flight_feed_api_key() -> Option<String> {
    env::var("AEROAPI_API_KEY")
        .or_else(|_| env::var("FLIGHTAWARE_API_KEY"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.search.horizon_minutes, 15);
        assert_eq!(config.search.step_seconds, 1);
        assert_eq!(config.search.no_improve_minutes, 3);
        assert_eq!(config.thresholds.alt_gate_deg, 5.0);
        assert_eq!(config.thresholds.az_gate_deg, 10.0);
        assert_eq!(config.thresholds.min_trackable_altitude_deg, 15.0);
        assert_eq!(config.cache.ttl_seconds, 600);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.poll.default_seconds, 600);
        assert!(config.area.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let toml = r#"
            [search]
            horizon_minutes = 10

            [area]
            lat_lower_left = 21.3
            lon_lower_left = -104.4
            lat_upper_right = 23.9
            lon_upper_right = -101.3
        "#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.search.horizon_minutes, 10);
        // Untouched sections keep their defaults
        assert_eq!(config.search.step_seconds, 1);
        assert_eq!(config.cache.ttl_seconds, 600);
        let bbox = config.default_bounding_box().unwrap().unwrap();
        assert!(bbox.contains(22.0, -103.0));
    }

    #[test]
    fn test_rejects_degenerate_window() {
        let toml = r#"
            [search]
            step_seconds = 0
        "#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_inverted_area() {
        let toml = r#"
            [area]
            lat_lower_left = 24.0
            lon_lower_left = -104.4
            lat_upper_right = 21.0
            lon_upper_right = -101.3
        "#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nttl_seconds = 30").unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cache.ttl_seconds, 30);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(matches!(
            EngineConfig::from_file("/nonexistent/skytransit.toml"),
            Err(EngineError::Configuration(_))
        ));
    }
}
