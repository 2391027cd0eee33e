//! # Fallback Tide Model
//!
//! Offline stand-in for the NOAA predictions. When the network or the API is
//! unavailable the curve still needs alternating highs and lows, so this module
//! synthesizes them from a single semidiurnal constituent:
//!
//! ```text
//! level(t) = MEAN + AMPLITUDE · cos(2π · (t + HW_OFFSET) / M2_PERIOD)
//! ```
//!
//! Only the extrema of that cosine are emitted; the curve interpolator then
//! rebuilds the smooth shape between them exactly as it does for real data.
//!
//! ## Model Characteristics
//! - **Period**: 12.42 hours (principal lunar M2)
//! - **Mean level**: 1.52 m above MLLW (Portland, ME)
//! - **Amplitude**: 1.37 m (Portland, ME M2)
//! - **Phase**: tied to the Unix epoch, so extrema land at the same instants
//!   whenever the model is evaluated
//!
//! There is no diurnal inequality, no spring/neap envelope and no weather.

use chrono::{DateTime, Duration, Utc};

use crate::{EventKind, TidalEvent};

/// M2 period in seconds (12.42 h).
pub const M2_PERIOD_SECS: i64 = 44_712;

/// Mean level in meters above MLLW.
pub const MEAN_LEVEL_M: f64 = 1.52;

/// M2 amplitude in meters.
pub const AMPLITUDE_M: f64 = 1.37;

/// Shift of the high-water epoch (≈3 h 35 m).
const HW_OFFSET_SECS: i64 = 12_924;

/// Hours covered on each side of now.
pub const HORIZON_HOURS: i64 = 36;

/// Alternating synthetic extrema covering `now ± HORIZON_HOURS`.
/// If `now` is `None`, fall back to `Utc::now()`.
pub fn approximate(now: Option<DateTime<Utc>>) -> Vec<TidalEvent> {
    let now = now.unwrap_or_else(Utc::now);
    let half = M2_PERIOD_SECS / 2;
    let start = (now - Duration::hours(HORIZON_HOURS)).timestamp() + HW_OFFSET_SECS;
    let end = (now + Duration::hours(HORIZON_HOURS)).timestamp() + HW_OFFSET_SECS;

    // One extremum before and after the horizon so the padder has nothing to invent
    let first = start.div_euclid(half);
    let last = end.div_euclid(half) + 1;

    (first..=last)
        .filter_map(|k| {
            let time = DateTime::from_timestamp(k * half - HW_OFFSET_SECS, 0)?;
            let (kind, level) = if k.rem_euclid(2) == 0 {
                (EventKind::High, MEAN_LEVEL_M + AMPLITUDE_M)
            } else {
                (EventKind::Low, MEAN_LEVEL_M - AMPLITUDE_M)
            };
            Some(TidalEvent { kind, time, level })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolate::level_at;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 24, 0, 0, 0).unwrap()
    }

    #[test]
    fn extrema_alternate_at_half_period() {
        let events = approximate(Some(t0()));
        for pair in events.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind);
            assert_eq!((pair[1].time - pair[0].time).num_seconds(), M2_PERIOD_SECS / 2);
        }
        let high = events.iter().find(|e| e.kind == EventKind::High).unwrap();
        assert!((high.level - 2.89).abs() < 1e-9);
        let low = events.iter().find(|e| e.kind == EventKind::Low).unwrap();
        assert!((low.level - 0.15).abs() < 1e-9);
    }

    #[test]
    fn covers_the_horizon_on_both_sides() {
        let events = approximate(Some(t0()));
        assert!(events.first().unwrap().time <= t0() - Duration::hours(HORIZON_HOURS));
        assert!(events.last().unwrap().time >= t0() + Duration::hours(HORIZON_HOURS));
        assert!((12..=15).contains(&events.len()), "{} events", events.len());
    }

    #[test]
    fn phase_is_tied_to_the_clock() {
        let a = approximate(Some(t0()));
        let b = approximate(Some(t0() + Duration::hours(1)));
        let shared = a.iter().filter(|e| b.contains(e)).count();
        assert!(shared >= a.len() - 2);

        // A quarter period after high water the curve is back at mean level
        let high = a
            .iter()
            .find(|e| e.kind == EventKind::High && e.time > t0())
            .unwrap();
        let at_high = level_at(&b, high.time).unwrap();
        let quarter = Duration::seconds(M2_PERIOD_SECS / 4);
        let at_mean = level_at(&b, high.time + quarter).unwrap();
        assert!((at_high - 2.89).abs() < 1e-9);
        assert!((at_mean - MEAN_LEVEL_M).abs() < 1e-9);
    }
}
