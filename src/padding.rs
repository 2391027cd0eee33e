//! # Extremum Padding
//!
//! Predictions rarely line up with the rendered window: the first known high or
//! low may fall after the window opens, and the last one before it closes. The
//! interpolator needs an extremum on both sides of every rendered instant, so this
//! module synthesizes boundary events one half-cycle beyond the known data.
//!
//! Synthesized levels are borrowed from the nearest real event of the same kind.
//! That is an approximation (successive highs differ by tens of centimeters), but
//! it only ever affects the curve at the very edge of the window.

use crate::{EventKind, RenderWindow, TidalEvent};
use chrono::Duration;
use std::collections::VecDeque;

/// Mean interval between consecutive extrema, in minutes (≈6.2 hours).
///
/// This is half the M2 period rounded to the nearest minute. Real half-cycles
/// vary by 30-60 minutes over the lunar month.
pub const HALF_CYCLE_MINUTES: i64 = 372;

/// Extend `events` so their time range covers `window`.
///
/// Returns the input unchanged when it holds fewer than two events; callers
/// treat that as "nothing to draw". Synthetic events alternate kind relative to
/// the neighbor they extend and sit exactly `half_cycle` beyond it.
pub fn pad_extrema(
    events: &[TidalEvent],
    window: &RenderWindow,
    half_cycle: Duration,
) -> Vec<TidalEvent> {
    if events.len() < 2 || half_cycle <= Duration::zero() {
        return events.to_vec();
    }

    let mut series: VecDeque<TidalEvent> = events.iter().copied().collect();

    while let Some(first) = series.front().copied() {
        if first.time <= window.start {
            break;
        }
        let kind = first.kind.opposite();
        let level = nearest_level(series.iter(), kind).unwrap_or(first.level);
        series.push_front(TidalEvent {
            kind,
            time: first.time - half_cycle,
            level,
        });
    }

    while let Some(last) = series.back().copied() {
        if last.time >= window.end {
            break;
        }
        let kind = last.kind.opposite();
        let level = nearest_level(series.iter().rev(), kind).unwrap_or(last.level);
        series.push_back(TidalEvent {
            kind,
            time: last.time + half_cycle,
            level,
        });
    }

    series.into_iter().collect()
}

fn nearest_level<'a>(
    mut events: impl Iterator<Item = &'a TidalEvent>,
    kind: EventKind,
) -> Option<f64> {
    events.find(|e| e.kind == kind).map(|e| e.level)
}
