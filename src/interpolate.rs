//! # Curve Interpolation
//!
//! Turns padded extrema into a dense sequence of curve samples. Between two
//! consecutive extrema the level follows a half cosine, which has zero slope at
//! both ends (slack water) and is steepest half-way between them. That is the
//! familiar S-shaped rise and fall of a semidiurnal tide without any harmonic model.
//!
//! ```text
//! level = lA + (lB - lA) * (1 - cos(π * frac)) / 2
//! ```

use crate::{InterpolatedPoint, RenderWindow, TidalEvent};
use chrono::{DateTime, Duration, Utc};
use std::f64::consts::PI;

/// Sampling step between curve points, in minutes.
pub const SAMPLE_STEP_MINUTES: i64 = 3;

/// Symmetric ease-in-out: `(1 - cos(πx)) / 2`.
///
/// Exactly 0 at `x = 0`, 0.5 at `x = 0.5` and 1 at `x = 1`.
pub fn cosine_ease(x: f64) -> f64 {
    (1.0 - (x * PI).cos()) / 2.0
}

/// Sample `series` every `step` inside `window`.
///
/// Each consecutive pair contributes samples at `tA, tA + step, ...` strictly
/// before `tB`; the final event is appended when it lies inside the window so
/// the curve ends on the last known level. Returns an empty vector when fewer
/// than two events are supplied. Pairs that are not strictly increasing in time
/// are skipped.
pub fn interpolate(
    series: &[TidalEvent],
    window: &RenderWindow,
    step: Duration,
) -> Vec<InterpolatedPoint> {
    if series.len() < 2 || step <= Duration::zero() {
        return Vec::new();
    }

    let expected = (window.span().num_milliseconds() / step.num_milliseconds()).max(0) as usize;
    let mut points = Vec::with_capacity(expected + 2);

    for pair in series.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if b.time <= a.time || b.time < window.start || a.time > window.end {
            continue;
        }
        let span_ms = (b.time - a.time).num_milliseconds() as f64;

        let mut t = a.time;
        while t < b.time {
            if window.contains(t) {
                let frac = (t - a.time).num_milliseconds() as f64 / span_ms;
                points.push(InterpolatedPoint {
                    time: t,
                    level: a.level + (b.level - a.level) * cosine_ease(frac),
                });
            }
            t += step;
        }
    }

    if let Some(last) = series.last() {
        let after_previous = points.last().map_or(true, |p| p.time < last.time);
        if window.contains(last.time) && after_previous {
            points.push(InterpolatedPoint {
                time: last.time,
                level: last.level,
            });
        }
    }

    points
}

/// Cosine-eased level at an arbitrary instant, if `time` lies between two events.
pub fn level_at(series: &[TidalEvent], time: DateTime<Utc>) -> Option<f64> {
    series
        .windows(2)
        .find(|pair| pair[0].time <= time && time <= pair[1].time && pair[0].time < pair[1].time)
        .map(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            let frac = (time - a.time).num_milliseconds() as f64
                / (b.time - a.time).num_milliseconds() as f64;
            a.level + (b.level - a.level) * cosine_ease(frac)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventKind;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 24, 0, 0, 0).unwrap()
    }

    fn step() -> Duration {
        Duration::minutes(SAMPLE_STEP_MINUTES)
    }

    fn high_low() -> Vec<TidalEvent> {
        vec![
            TidalEvent {
                kind: EventKind::High,
                time: t0(),
                level: 3.2,
            },
            TidalEvent {
                kind: EventKind::Low,
                time: t0() + Duration::minutes(372),
                level: 0.1,
            },
        ]
    }

    #[test]
    fn ease_endpoints_and_midpoint() {
        assert_eq!(cosine_ease(0.0), 0.0);
        assert!((cosine_ease(0.5) - 0.5).abs() < 1e-12);
        assert!((cosine_ease(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn midpoint_level_is_the_average() {
        let series = high_low();
        let midpoint = t0() + Duration::minutes(186);
        let window = RenderWindow::new(t0(), t0() + Duration::minutes(372));

        let points = interpolate(&series, &window, step());
        let mid = points.iter().find(|p| p.time == midpoint).unwrap();
        assert!((mid.level - 1.65).abs() < 1e-9, "got {}", mid.level);

        let direct = level_at(&series, midpoint).unwrap();
        assert!((direct - 1.65).abs() < 1e-9);
    }

    #[test]
    fn boundaries_are_exact() {
        let series = high_low();
        let window = RenderWindow::new(t0(), t0() + Duration::minutes(372));
        let points = interpolate(&series, &window, step());

        assert_eq!(points.first().unwrap().time, t0());
        assert_eq!(points.first().unwrap().level, 3.2);
        assert_eq!(points.last().unwrap().time, series[1].time);
        assert_eq!(points.last().unwrap().level, 0.1);
    }

    #[test]
    fn samples_are_strictly_increasing_and_inside_window() {
        let series = high_low();
        let window = RenderWindow::new(
            t0() + Duration::minutes(31),
            t0() + Duration::minutes(300),
        );
        let points = interpolate(&series, &window, step());

        assert!(!points.is_empty());
        for pair in points.windows(2) {
            assert!(pair[0].time < pair[1].time);
            assert!(pair[1].time - pair[0].time <= step());
        }
        assert!(window.contains(points.first().unwrap().time));
        assert!(window.contains(points.last().unwrap().time));
        // Window clips at an unaligned start: first sample is the next step boundary
        assert_eq!(points.first().unwrap().time, t0() + Duration::minutes(33));
    }

    #[test]
    fn sample_count_tracks_window_over_step() {
        let t0 = t0();
        let mut series = Vec::new();
        for i in 0..8 {
            series.push(TidalEvent {
                kind: if i % 2 == 0 { EventKind::High } else { EventKind::Low },
                time: t0 + Duration::minutes(372 * i),
                level: if i % 2 == 0 { 3.0 } else { 0.4 },
            });
        }
        let window = RenderWindow::new(t0 + Duration::hours(6), t0 + Duration::hours(30));
        let points = interpolate(&series, &window, step());

        let expected = 24 * 60 / SAMPLE_STEP_MINUTES as usize;
        assert!(
            points.len().abs_diff(expected) <= series.len(),
            "{} samples, expected about {}",
            points.len(),
            expected
        );
    }

    #[test]
    fn fewer_than_two_events_yield_nothing() {
        let window = RenderWindow::new(t0(), t0() + Duration::hours(1));
        assert!(interpolate(&high_low()[..1], &window, step()).is_empty());
        assert!(level_at(&high_low()[..1], t0()).is_none());
    }

    #[test]
    fn level_at_outside_series_is_none() {
        assert!(level_at(&high_low(), t0() - Duration::minutes(1)).is_none());
        assert!(level_at(&high_low(), t0() + Duration::hours(7)).is_none());
    }
}
