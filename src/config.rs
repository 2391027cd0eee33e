//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the tide-curve.toml file.
//! It provides a centralized way to configure the NOAA station, the rendered time
//! window, curve synthesis constants, cache and scrub behavior, and the surface.
//!
//! Every section is optional in the file; missing keys take the defaults below.

use chrono::{Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "tide-curve.toml";

/// Longest span any duration setting resolves to.
pub const MAX_SETTING_DAYS: i64 = 3650;

/// A duration setting: negative values read as zero and large ones are capped,
/// so later timestamp arithmetic cannot overflow.
fn setting(value: i64, unit: fn(i64) -> Option<Duration>) -> Duration {
    let cap = Duration::days(MAX_SETTING_DAYS);
    unit(value.max(0)).map_or(cap, |d| d.min(cap))
}

/// Errors raised while writing a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config IO: {0}")]
    Io(#[from] io::Error),

    #[error("config serialization: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration loaded from tide-curve.toml
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// NOAA station configuration
    pub station: StationConfig,
    /// Sliding time window around "now"
    pub window: WindowConfig,
    /// Curve synthesis and vertical layout
    pub curve: CurveConfig,
    /// Static layer cache tuning
    pub cache: CacheConfig,
    /// Time-scrub interaction tuning
    pub scrub: ScrubConfig,
    /// Surface and frame loop
    pub display: DisplayConfig,
    /// Prediction source and its on-disk cache
    pub source: SourceConfig,
}

/// NOAA tide station configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    /// NOAA station ID (e.g., "8418150" for Portland, ME)
    pub id: String,
    /// Human-readable station name for reference
    pub name: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            id: "8418150".to_string(),
            name: "Portland, ME".to_string(),
        }
    }
}

/// Past/future horizon of the rendered window
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub past_hours: i64,
    pub future_hours: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            past_hours: 12,
            future_hours: 12,
        }
    }
}

impl WindowConfig {
    pub fn past(&self) -> Duration {
        setting(self.past_hours, Duration::try_hours)
    }

    pub fn future(&self) -> Duration {
        setting(self.future_hours, Duration::try_hours)
    }

    pub fn span(&self) -> Duration {
        self.past() + self.future()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Interpolation step between extrema
    pub sample_step_minutes: i64,
    /// Mean interval between consecutive extrema, used when padding
    pub half_cycle_minutes: i64,
    /// Fraction of the level range added above and below the curve
    pub headroom: f64,
    /// Half-spread in meters used when all levels are equal
    pub flat_range_spread: f64,
    /// Top of the curve band as a fraction of surface height
    pub band_top: f32,
    /// Bottom of the curve band as a fraction of surface height
    pub band_bottom: f32,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            sample_step_minutes: crate::interpolate::SAMPLE_STEP_MINUTES,
            half_cycle_minutes: crate::padding::HALF_CYCLE_MINUTES,
            headroom: crate::scale::HEADROOM_FRACTION,
            flat_range_spread: crate::scale::FLAT_RANGE_SPREAD,
            band_top: 0.30,
            band_bottom: 0.86,
        }
    }
}

impl CurveConfig {
    pub fn sample_step(&self) -> Duration {
        setting(self.sample_step_minutes, Duration::try_minutes)
    }

    pub fn half_cycle(&self) -> Duration {
        setting(self.half_cycle_minutes, Duration::try_minutes)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Unconditional rebuild interval
    pub ttl_seconds: i64,
    /// Number of theme-blend buckets across [0, 1]
    pub theme_buckets: u16,
    /// Extra time drawn beyond the reachable scrub range
    pub slack_minutes: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 30,
            theme_buckets: 10,
            slack_minutes: 5,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        setting(self.ttl_seconds, Duration::try_seconds)
    }

    pub fn slack(&self) -> Duration {
        setting(self.slack_minutes, Duration::try_minutes)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrubConfig {
    /// Offset is clamped to ±this value
    pub max_offset_hours: i64,
    /// Idle time after release before the snapback starts
    pub snapback_delay_ms: i64,
    /// Length of the eased return to zero
    pub snapback_duration_ms: i64,
    /// Wheel delta multiplier on top of the pixel → time ratio
    pub wheel_factor: f64,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            max_offset_hours: 6,
            snapback_delay_ms: 2000,
            snapback_duration_ms: 1200,
            wheel_factor: 0.5,
        }
    }
}

impl ScrubConfig {
    pub fn max_offset(&self) -> Duration {
        setting(self.max_offset_hours, Duration::try_hours)
    }

    pub fn snapback_delay(&self) -> Duration {
        setting(self.snapback_delay_ms, Duration::try_milliseconds)
    }

    pub fn snapback_duration(&self) -> Duration {
        setting(self.snapback_duration_ms, Duration::try_milliseconds)
    }
}

/// Display surface and frame loop configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Logical surface width
    pub width: u32,
    /// Logical surface height
    pub height: u32,
    pub device_pixel_ratio: f32,
    /// Frame rate cap for the animation loop
    pub max_fps: u32,
    /// Fixed UTC offset used for time labels
    pub label_utc_offset_minutes: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 480,
            height: 240,
            device_pixel_ratio: 1.0,
            max_fps: 30,
            label_utc_offset_minutes: 0,
        }
    }
}

impl DisplayConfig {
    /// Offset for label formatting; out-of-range values fall back to UTC.
    pub fn label_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.label_utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Prediction source configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// JSON cache of the last fetched predictions
    pub cache_path: String,
    /// Cache TTL in minutes
    pub cache_ttl_minutes: u64,
    /// Hours of predictions requested per fetch
    pub range_hours: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            cache_path: "/tmp/tide_curve_predictions.json".to_string(),
            cache_ttl_minutes: 30,
            range_hours: 72,
        }
    }
}

impl SourceConfig {
    pub fn cache_ttl(&self) -> Duration {
        let minutes = i64::try_from(self.cache_ttl_minutes).unwrap_or(i64::MAX);
        setting(minutes, Duration::try_minutes)
    }
}

impl Config {
    /// Load configuration from tide-curve.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(station = %config.station.name, "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "invalid config file format, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.as_ref().display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save current configuration as pretty TOML
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.station.id, "8418150");
        assert_eq!(config.station.name, "Portland, ME");
        assert_eq!(config.window.past_hours, 12);
        assert_eq!(config.window.future_hours, 12);
        assert_eq!(config.curve.sample_step_minutes, 3);
        assert_eq!(config.curve.half_cycle_minutes, 372);
        assert_eq!(config.cache.ttl_seconds, 30);
        assert_eq!(config.scrub.max_offset_hours, 6);
        assert_eq!(config.display.max_fps, 30);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.station.id, parsed.station.id);
        assert_eq!(config.scrub.snapback_duration_ms, parsed.scrub.snapback_duration_ms);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let parsed: Config = toml::from_str(
            r#"
[station]
id = "8443970"
name = "Boston, MA"

[window]
past_hours = 6
"#,
        )
        .unwrap();
        assert_eq!(parsed.station.id, "8443970");
        assert_eq!(parsed.window.past_hours, 6);
        assert_eq!(parsed.window.future_hours, 12);
        assert_eq!(parsed.cache.theme_buckets, 10);
    }

    #[test]
    fn test_save_and_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.display.width = 640;
        config.save_to_path(file.path()).unwrap();

        let loaded = Config::load_from_path(file.path());
        assert_eq!(loaded.display.width, 640);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config.station.id, "8418150");
    }

    #[test]
    fn test_durations_are_non_negative_and_capped() {
        let parsed: Config = toml::from_str(
            r#"
[window]
past_hours = -3
future_hours = 9223372036854775807

[scrub]
max_offset_hours = -1
snapback_delay_ms = -500

[cache]
ttl_seconds = 9223372036854775807
"#,
        )
        .unwrap();
        let cap = Duration::days(MAX_SETTING_DAYS);
        assert_eq!(parsed.window.past(), Duration::zero());
        assert_eq!(parsed.window.future(), cap);
        assert_eq!(parsed.window.span(), cap);
        assert_eq!(parsed.scrub.max_offset(), Duration::zero());
        assert_eq!(parsed.scrub.snapback_delay(), Duration::zero());
        assert_eq!(parsed.cache.ttl(), cap);
        assert_eq!(parsed.scrub.snapback_duration(), Duration::milliseconds(1200));

        let mut source = SourceConfig::default();
        assert_eq!(source.cache_ttl(), Duration::minutes(30));
        source.cache_ttl_minutes = u64::MAX;
        assert_eq!(source.cache_ttl(), cap);
    }

    #[test]
    fn test_label_offset_out_of_range_is_utc() {
        let mut display = DisplayConfig::default();
        display.label_utc_offset_minutes = 100_000;
        assert_eq!(display.label_offset().local_minus_utc(), 0);

        display.label_utc_offset_minutes = -240;
        assert_eq!(display.label_offset().local_minus_utc(), -4 * 3600);
    }
}
