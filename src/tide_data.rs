//! # NOAA Prediction Fetching and Caching
//!
//! Supplies the high/low extrema the curve is synthesized from. The renderer
//! itself never touches the network; the binary calls [`fetch`] once at start-up
//! and whenever it wants fresher data, then hands the events to
//! [`CurveRenderer::set_predictions`](crate::renderer::CurveRenderer::set_predictions).
//!
//! ## Data Source
//! NOAA CO-OPS data API, `product=predictions&interval=hilo`, metric units in GMT
//! relative to MLLW:
//!
//! ```text
//! {"predictions":[{"t":"2025-07-24 03:12","v":"3.204","type":"H"}, ...]}
//! ```
//!
//! The request starts 24 hours before now and spans `source.range_hours`, which
//! leaves the padder plenty of real events on both sides of the window.
//!
//! ## Caching Strategy
//! Cache first: a JSON file at `source.cache_path` holds the last successful
//! fetch together with its station id and fetch time. It is used while it is
//! younger than `source.cache_ttl_minutes` and belongs to the configured station.
//! Failing to write the cache is logged and otherwise ignored.
//!
//! ## Error Handling
//! Everything surfaces as [`TideError`]; callers fall back to
//! [`fallback::approximate`](crate::fallback::approximate) on any error.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::{EventKind, TidalEvent};

/// NOAA CO-OPS data getter endpoint.
pub const API_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";

/// How far before now a fetch starts.
const LOOKBACK_HOURS: i64 = 24;

/// Request timeout for the prediction fetch.
const TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while obtaining predictions.
#[derive(Error, Debug)]
pub enum TideError {
    /// HTTP request failed (network, server, or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error message
    #[error("NOAA API error: {0}")]
    Api(String),

    /// The response did not have the expected shape
    #[error("parse failed: {0}")]
    Parse(String),

    /// Cache file missing, stale or unreadable
    #[error("cache IO: {0}")]
    Cache(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    predictions: Option<Vec<ApiPrediction>>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiPrediction {
    t: String,
    v: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// On-disk form of the last successful fetch.
#[derive(Debug, Serialize, Deserialize)]
struct CachedPredictions {
    station: String,
    fetched_at: DateTime<Utc>,
    events: Vec<TidalEvent>,
}

/// Fetch predictions for the configured station, cache first.
///
/// # Example
/// ```no_run
/// use chrono::Utc;
/// use tide_curve::{config::Config, fallback, tide_data};
///
/// # async fn run() {
/// let config = Config::default();
/// let now = Utc::now();
/// let events = tide_data::fetch(&config, now)
///     .await
///     .unwrap_or_else(|_| fallback::approximate(Some(now)));
/// # }
/// ```
pub async fn fetch(config: &Config, now: DateTime<Utc>) -> Result<Vec<TidalEvent>, TideError> {
    let source = &config.source;
    let station = &config.station.id;
    let ttl = source.cache_ttl();

    match load_cache(&source.cache_path, station, ttl, now) {
        Ok(events) => {
            info!(station = %station, count = events.len(), "using cached predictions");
            return Ok(events);
        }
        Err(e) => debug!(error = %e, "prediction cache unusable"),
    }

    let url = prediction_url(station, now - Duration::hours(LOOKBACK_HOURS), source.range_hours);
    info!(url = %url, "fetching predictions");

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
        .build()?;
    let body = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let events = parse_predictions(&body)?;
    info!(station = %station, count = events.len(), "predictions fetched");

    if let Err(e) = save_cache(&source.cache_path, station, &events, now) {
        warn!(error = %e, path = %source.cache_path, "could not write prediction cache");
    }
    Ok(events)
}

/// Query URL for `range_hours` of high/low predictions starting at `begin`.
pub fn prediction_url(station: &str, begin: DateTime<Utc>, range_hours: u32) -> String {
    format!(
        "{API_URL}?product=predictions&interval=hilo&units=metric&time_zone=gmt\
         &datum=MLLW&format=json&application=tide-curve&station={station}\
         &begin_date={}&range={range_hours}",
        begin.format("%Y%m%d")
    )
}

/// Parse an API response body into time-ordered events.
pub fn parse_predictions(body: &str) -> Result<Vec<TidalEvent>, TideError> {
    let response: ApiResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(TideError::Api(error.message));
    }
    let predictions = response
        .predictions
        .ok_or_else(|| TideError::Parse("response has no predictions".to_string()))?;

    let mut events = predictions
        .iter()
        .map(parse_prediction)
        .collect::<Result<Vec<_>, _>>()?;
    events.sort_by_key(|e| e.time);
    Ok(events)
}

fn parse_prediction(p: &ApiPrediction) -> Result<TidalEvent, TideError> {
    let time = NaiveDateTime::parse_from_str(p.t.trim(), "%Y-%m-%d %H:%M")
        .map_err(|e| TideError::Parse(format!("time {:?}: {e}", p.t)))?
        .and_utc();
    let level = p
        .v
        .trim()
        .parse::<f64>()
        .map_err(|e| TideError::Parse(format!("level {:?}: {e}", p.v)))?;
    let kind = match p.kind.trim() {
        "H" | "HH" => EventKind::High,
        "L" | "LL" => EventKind::Low,
        other => return Err(TideError::Parse(format!("event type {other:?}"))),
    };
    Ok(TidalEvent { kind, time, level })
}

/// Load cached events if they are for `station` and younger than `ttl`.
pub fn load_cache<P: AsRef<Path>>(
    path: P,
    station: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<TidalEvent>, TideError> {
    let data = fs::read(path)?;
    let cached: CachedPredictions = serde_json::from_slice(&data)?;

    if cached.station != station {
        return Err(io::Error::other("cached station differs").into());
    }
    if now - cached.fetched_at > ttl {
        return Err(io::Error::other("stale").into());
    }
    Ok(cached.events)
}

/// Write `events` as the cache for `station`.
pub fn save_cache<P: AsRef<Path>>(
    path: P,
    station: &str,
    events: &[TidalEvent],
    now: DateTime<Utc>,
) -> Result<(), TideError> {
    let cached = CachedPredictions {
        station: station.to_string(),
        fetched_at: now,
        events: events.to_vec(),
    };
    fs::write(path, serde_json::to_vec(&cached)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    const BODY: &str = r#"{"predictions":[
        {"t":"2025-07-24 09:25","v":"0.112","type":"L"},
        {"t":"2025-07-24 03:12","v":"3.204","type":"H"},
        {"t":"2025-07-24 15:40","v":"3.051","type":"H"}
    ]}"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 24, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_and_orders_predictions() {
        let events = parse_predictions(BODY).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::High);
        assert_eq!(events[0].time, Utc.with_ymd_and_hms(2025, 7, 24, 3, 12, 0).unwrap());
        assert!((events[0].level - 3.204).abs() < 1e-12);
        assert_eq!(events[1].kind, EventKind::Low);
        assert!(events.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn api_error_body_is_reported() {
        let body = r#"{"error":{"message":"No Predictions data was found."}}"#;
        match parse_predictions(body) {
            Err(TideError::Api(message)) => assert!(message.contains("No Predictions")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_rows_are_parse_errors() {
        let bad_type = r#"{"predictions":[{"t":"2025-07-24 03:12","v":"3.2","type":"X"}]}"#;
        assert!(matches!(parse_predictions(bad_type), Err(TideError::Parse(_))));

        let bad_level = r#"{"predictions":[{"t":"2025-07-24 03:12","v":"high","type":"H"}]}"#;
        assert!(matches!(parse_predictions(bad_level), Err(TideError::Parse(_))));

        assert!(matches!(parse_predictions("{}"), Err(TideError::Parse(_))));
        assert!(matches!(parse_predictions("<html>"), Err(TideError::Json(_))));
    }

    #[test]
    fn url_covers_requested_range() {
        let url = prediction_url("8418150", now() - Duration::hours(24), 72);
        assert!(url.starts_with(API_URL));
        assert!(url.contains("interval=hilo"));
        assert!(url.contains("station=8418150"));
        assert!(url.contains("begin_date=20250723"));
        assert!(url.contains("range=72"));
    }

    #[test]
    fn cache_roundtrip_respects_ttl_and_station() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();
        let events = parse_predictions(BODY).unwrap();
        let ttl = Duration::minutes(30);

        save_cache(path, "8418150", &events, now()).unwrap();

        let loaded = load_cache(path, "8418150", ttl, now() + Duration::minutes(10)).unwrap();
        assert_eq!(loaded, events);

        assert!(load_cache(path, "8418150", ttl, now() + Duration::minutes(31)).is_err());
        assert!(load_cache(path, "9414290", ttl, now()).is_err());
    }

    #[test]
    fn missing_cache_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(
            load_cache(&path, "8418150", Duration::minutes(30), now()),
            Err(TideError::Cache(_))
        ));
    }
}
