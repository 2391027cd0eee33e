//! # Tide Curve Core Library
//!
//! This library renders a live, continuously scrolling tide-level curve from a
//! handful of predicted high/low extrema. A sparse prediction list (one event
//! every ~6 hours) is turned into a dense, smooth curve over a sliding window
//! anchored on "now", drawn once into an offscreen layer, and re-composited every
//! frame with a glowing "now" marker that can be scrubbed through time.
//!
//! ## Data Flow
//! 1. **Pad**: [`padding`] extends the extrema so they cover the requested window
//! 2. **Interpolate**: [`interpolate`] eases between extrema at a 3-minute step
//! 3. **Scale**: [`scale`] maps time → x and level → y with visual headroom
//! 4. **Cache**: [`cache`] draws fills, strokes, markers and labels offscreen and
//!    only rebuilds when its key changes or its TTL lapses
//! 5. **Frame**: [`renderer`] blits the cached layer, shifted for the current
//!    scrub offset, and draws the [`marker`] on top
//!
//! Input (drag, wheel, snapback) is handled by the [`scrub`] state machine.
//!
//! ## Core Types
//! - [`TidalEvent`]: a predicted high or low water with its level in meters
//! - [`InterpolatedPoint`]: one dense curve sample
//! - [`RenderWindow`]: the `[start, end]` interval being rendered

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// Module declarations
pub mod ascii;
pub mod cache;
pub mod config;
pub mod fallback;
pub mod frame;
pub mod framebuffer;
pub mod interpolate;
pub mod layer;
pub mod marker;
pub mod padding;
pub mod renderer;
pub mod scale;
pub mod scrub;
pub mod theme;
pub mod tide_data;

#[cfg(test)]
mod tests;

/// Whether an extremum is a high or a low water.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    High,
    Low,
}

impl EventKind {
    /// The other kind of extremum.
    pub fn opposite(self) -> Self {
        match self {
            EventKind::High => EventKind::Low,
            EventKind::Low => EventKind::High,
        }
    }
}

/// A predicted instant of local high or low water.
///
/// Levels are meters above a fixed vertical datum (MLLW for NOAA stations).
/// Lists of events are expected in ascending time order; alternating kinds are
/// typical but not guaranteed.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use tide_curve::{EventKind, TidalEvent};
///
/// let high = TidalEvent {
///     kind: EventKind::High,
///     time: Utc.with_ymd_and_hms(2025, 7, 24, 3, 12, 0).unwrap(),
///     level: 3.2,
/// };
/// assert_eq!(high.kind.opposite(), EventKind::Low);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TidalEvent {
    pub kind: EventKind,
    pub time: DateTime<Utc>,
    /// Meters above datum
    pub level: f64,
}

/// A single dense sample of the synthesized curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterpolatedPoint {
    pub time: DateTime<Utc>,
    pub level: f64,
}

/// A closed time interval `[start, end]` to be rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RenderWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window spanning `past` before and `future` after `anchor`.
    pub fn around(anchor: DateTime<Utc>, past: Duration, future: Duration) -> Self {
        Self {
            start: anchor - past,
            end: anchor + future,
        }
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn span_ms(&self) -> f64 {
        self.span().num_milliseconds() as f64
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }
}
