//! Day/night palettes for the curve.
//!
//! The surrounding application supplies a theme blend in `[0, 1]` (0 = dark,
//! 1 = light). Every color here is a plain function of its inputs so the cache
//! build and the live marker agree without sharing state.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

/// Colors used by the static layer and the live marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb888,
    /// Curve stroke near the bottom of the range
    pub curve_low: Rgb888,
    /// Curve stroke near the top of the range
    pub curve_high: Rgb888,
    pub glow: Rgb888,
    pub fill: Rgb888,
    pub future: Rgb888,
    pub extremum: Rgb888,
    pub label: Rgb888,
    pub axis: Rgb888,
    pub marker: Rgb888,
    pub marker_core: Rgb888,
}

impl Palette {
    pub const fn dark() -> Self {
        Self {
            background: Rgb888::new(6, 14, 28),
            curve_low: Rgb888::new(40, 110, 190),
            curve_high: Rgb888::new(110, 220, 240),
            glow: Rgb888::new(70, 170, 230),
            fill: Rgb888::new(30, 100, 170),
            future: Rgb888::new(120, 170, 210),
            extremum: Rgb888::new(200, 230, 250),
            label: Rgb888::new(160, 185, 210),
            axis: Rgb888::new(60, 80, 105),
            marker: Rgb888::new(255, 210, 90),
            marker_core: Rgb888::new(255, 250, 235),
        }
    }

    pub const fn light() -> Self {
        Self {
            background: Rgb888::new(236, 244, 250),
            curve_low: Rgb888::new(20, 80, 150),
            curve_high: Rgb888::new(20, 140, 190),
            glow: Rgb888::new(60, 150, 210),
            fill: Rgb888::new(110, 180, 225),
            future: Rgb888::new(70, 120, 170),
            extremum: Rgb888::new(15, 60, 110),
            label: Rgb888::new(40, 70, 100),
            axis: Rgb888::new(170, 190, 210),
            marker: Rgb888::new(230, 120, 30),
            marker_core: Rgb888::new(255, 255, 255),
        }
    }
}

/// Linear mix of two colors, `t = 0` → `a`, `t = 1` → `b`.
pub fn mix(a: Rgb888, b: Rgb888, t: f32) -> Rgb888 {
    let t = t.clamp(0.0, 1.0);
    let channel = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Rgb888::new(
        channel(a.r(), b.r()),
        channel(a.g(), b.g()),
        channel(a.b(), b.b()),
    )
}

/// Palette for a theme blend between dark (0) and light (1).
pub fn palette(blend: f32) -> Palette {
    let (d, l) = (Palette::dark(), Palette::light());
    Palette {
        background: mix(d.background, l.background, blend),
        curve_low: mix(d.curve_low, l.curve_low, blend),
        curve_high: mix(d.curve_high, l.curve_high, blend),
        glow: mix(d.glow, l.glow, blend),
        fill: mix(d.fill, l.fill, blend),
        future: mix(d.future, l.future, blend),
        extremum: mix(d.extremum, l.extremum, blend),
        label: mix(d.label, l.label, blend),
        axis: mix(d.axis, l.axis, blend),
        marker: mix(d.marker, l.marker, blend),
        marker_core: mix(d.marker_core, l.marker_core, blend),
    }
}

/// Stroke color for a level at `level_fraction` of the visible range.
pub fn level_color(level_fraction: f64, blend: f32) -> Rgb888 {
    let p = palette(blend);
    mix(p.curve_low, p.curve_high, level_fraction as f32)
}

/// Coarse bucket index for a theme blend; small blend changes share a bucket.
pub fn blend_bucket(blend: f32, buckets: u16) -> u16 {
    let buckets = buckets.max(1);
    (blend.clamp(0.0, 1.0) * buckets as f32).round() as u16
}

/// Representative blend value of a bucket.
pub fn bucket_blend(bucket: u16, buckets: u16) -> f32 {
    let buckets = buckets.max(1);
    (bucket.min(buckets) as f32) / buckets as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_endpoints() {
        let a = Rgb888::new(0, 100, 200);
        let b = Rgb888::new(200, 100, 0);
        assert_eq!(mix(a, b, 0.0), a);
        assert_eq!(mix(a, b, 1.0), b);
        assert_eq!(mix(a, b, 0.5), Rgb888::new(100, 100, 100));
        assert_eq!(mix(a, b, 7.0), b);
    }

    #[test]
    fn palette_blend_endpoints() {
        assert_eq!(palette(0.0), Palette::dark());
        assert_eq!(palette(1.0), Palette::light());
    }

    #[test]
    fn nearby_blends_share_a_bucket() {
        assert_eq!(blend_bucket(0.31, 10), blend_bucket(0.34, 10));
        assert_ne!(blend_bucket(0.31, 10), blend_bucket(0.41, 10));
        assert_eq!(blend_bucket(-1.0, 10), 0);
        assert_eq!(blend_bucket(2.0, 10), 10);
        assert_eq!(bucket_blend(blend_bucket(0.5, 10), 10), 0.5);
    }

    #[test]
    fn level_color_spans_low_to_high() {
        let p = palette(0.0);
        assert_eq!(level_color(0.0, 0.0), p.curve_low);
        assert_eq!(level_color(1.0, 0.0), p.curve_high);
    }
}
