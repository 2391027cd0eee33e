//! # Scale Mapping
//!
//! Pure affine mappings from (time, level) to surface pixels. The cache build and
//! the per-frame marker both go through these functions so the marker always sits
//! exactly on the cached curve.

use crate::{InterpolatedPoint, RenderWindow};
use chrono::{DateTime, Utc};

/// Fraction of the level range added above and below the curve.
pub const HEADROOM_FRACTION: f64 = 0.15;

/// Half-spread in meters used when every sample has the same level.
pub const FLAT_RANGE_SPREAD: f64 = 0.5;

/// Vertical extent of the curve in level units (meters).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelRange {
    pub min: f64,
    pub max: f64,
}

impl LevelRange {
    /// Raw min/max over `points`, or `None` for an empty slice.
    pub fn from_points(points: &[InterpolatedPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let (min, max) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), p| {
                (min.min(p.level), max.max(p.level))
            });
        Some(Self { min, max })
    }

    /// Range widened by `headroom` of its span on each side, or by
    /// `flat_spread` when the span is zero.
    pub fn padded(self, headroom: f64, flat_spread: f64) -> Self {
        let span = self.max - self.min;
        let pad = if span > f64::EPSILON {
            span * headroom
        } else {
            flat_spread
        };
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Position of `level` inside the range, clamped to [0, 1].
    pub fn fraction(&self, level: f64) -> f64 {
        let span = self.span();
        if span <= f64::EPSILON {
            return 0.5;
        }
        ((level - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Pixel rectangle the curve is drawn into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveBounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl CurveBounds {
    /// Full-width band between `band_top` and `band_bottom` (fractions of height).
    pub fn for_surface(width: f32, height: f32, band_top: f32, band_bottom: f32) -> Self {
        Self {
            left: 0.0,
            right: width,
            top: height * band_top.clamp(0.0, 1.0),
            bottom: height * band_bottom.clamp(0.0, 1.0),
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Whether a y coordinate falls inside the vertical band.
    pub fn contains_y(&self, y: f32) -> bool {
        self.top <= y && y <= self.bottom
    }
}

/// Map `time` into `[left, right]`, clamping outside the window.
pub fn time_to_x(time: DateTime<Utc>, window: &RenderWindow, left: f32, right: f32) -> f32 {
    let span = window.span_ms();
    if span <= 0.0 {
        return left;
    }
    let frac = ((time - window.start).num_milliseconds() as f64 / span).clamp(0.0, 1.0);
    left + (frac as f32) * (right - left)
}

/// Map `level` into `[top, bottom]` (higher water is smaller y), clamped.
pub fn level_to_y(level: f64, range: &LevelRange, top: f32, bottom: f32) -> f32 {
    bottom - (range.fraction(level) as f32) * (bottom - top)
}

/// A window, a level range and the pixel rectangle they map onto.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale {
    pub window: RenderWindow,
    pub range: LevelRange,
    pub bounds: CurveBounds,
}

impl Scale {
    pub fn x(&self, time: DateTime<Utc>) -> f32 {
        time_to_x(time, &self.window, self.bounds.left, self.bounds.right)
    }

    pub fn y(&self, level: f64) -> f32 {
        level_to_y(level, &self.range, self.bounds.top, self.bounds.bottom)
    }

    /// Horizontal pixels per hour of window.
    pub fn px_per_hour(&self) -> f32 {
        let hours = self.window.span_ms() / 3_600_000.0;
        if hours <= 0.0 {
            return 0.0;
        }
        (self.bounds.width() as f64 / hours) as f32
    }
}
