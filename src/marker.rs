//! # Live Marker
//!
//! The one piece of the curve that is drawn fresh every frame. It finds the two
//! cached samples around the (possibly scrubbed) virtual now, interpolates the
//! level between them linearly and draws a glowing dot there. Linear is enough:
//! samples are three minutes apart, so this is a short fill-in, not a tide model.
//!
//! When the virtual now falls outside the cached samples, the externally observed
//! level is used instead.

use chrono::{DateTime, Utc};
use embedded_graphics::{
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle},
};

use crate::cache::CacheEntry;
use crate::framebuffer::Framebuffer;
use crate::theme::Palette;
use crate::InterpolatedPoint;

/// Glow rings around the dot: (radius px, opacity), outermost first.
pub const GLOW_RINGS: [(f32, f32); 3] = [(14.0, 0.08), (10.0, 0.16), (7.0, 0.30)];

/// Radius of the solid dot.
pub const DOT_RADIUS_PX: f32 = 4.0;

/// Period of the glow pulse in milliseconds.
pub const PULSE_PERIOD_MS: i64 = 2400;

/// Where the marker lands in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerPosition {
    pub x: f32,
    pub y: f32,
    pub level: f64,
    /// False when the observed level was used
    pub bracketed: bool,
}

/// Level at `time` by linear interpolation between the bracketing samples.
pub fn bracket_level(points: &[InterpolatedPoint], time: DateTime<Utc>) -> Option<f64> {
    let i = points.partition_point(|p| p.time <= time);
    if i == 0 {
        return None;
    }
    let a = &points[i - 1];
    if a.time == time {
        return Some(a.level);
    }
    let b = points.get(i)?;
    let span = (b.time - a.time).num_milliseconds() as f64;
    if span <= 0.0 {
        return Some(a.level);
    }
    let frac = (time - a.time).num_milliseconds() as f64 / span;
    Some(a.level + (b.level - a.level) * frac)
}

/// Place the marker for `virtual_now` on a frame cut from `entry` at column `src_x`.
pub fn locate(
    entry: &CacheEntry,
    virtual_now: DateTime<Utc>,
    src_x: i32,
    observed_level: f64,
) -> MarkerPosition {
    let (level, bracketed) = match bracket_level(&entry.points, virtual_now) {
        Some(level) => (level, true),
        None => (observed_level, false),
    };
    MarkerPosition {
        x: (entry.source_x(virtual_now) - src_x) as f32,
        y: entry.scale().y(level),
        level,
        bracketed,
    }
}

/// Glow intensity in `[0, 1]` for the animation clock.
pub fn pulse(now: DateTime<Utc>) -> f32 {
    let phase = now.timestamp_millis().rem_euclid(PULSE_PERIOD_MS) as f32 / PULSE_PERIOD_MS as f32;
    0.5 + 0.5 * (phase * core::f32::consts::TAU).sin()
}

/// Draw the now line, radial glow and dot.
pub fn draw_live_marker(
    fb: &mut Framebuffer,
    position: &MarkerPosition,
    palette: &Palette,
    dpr: f32,
    band: (f32, f32),
    pulse: f32,
) {
    let center = Point::new(position.x.round() as i32, position.y.round() as i32);

    Line::new(
        Point::new(center.x, band.0.round() as i32),
        Point::new(center.x, band.1.round() as i32),
    )
    .into_styled(PrimitiveStyle::with_stroke(palette.marker, 1))
    .draw(&mut fb.layer(0.35))
    .ok();

    let strength = 0.8 + 0.4 * pulse.clamp(0.0, 1.0);
    for (radius, alpha) in GLOW_RINGS {
        Circle::with_center(center, diameter(radius * dpr))
            .into_styled(PrimitiveStyle::with_fill(palette.marker))
            .draw(&mut fb.layer(alpha * strength))
            .ok();
    }

    Circle::with_center(center, diameter(DOT_RADIUS_PX * dpr))
        .into_styled(PrimitiveStyle::with_fill(palette.marker))
        .draw(fb)
        .ok();
    Circle::with_center(center, diameter(DOT_RADIUS_PX * dpr / 2.0))
        .into_styled(PrimitiveStyle::with_fill(palette.marker_core))
        .draw(fb)
        .ok();
}

fn diameter(radius: f32) -> u32 {
    (radius * 2.0).round().max(1.0) as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::palette;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 24, 0, 0, 0).unwrap()
    }

    fn points() -> Vec<InterpolatedPoint> {
        vec![
            InterpolatedPoint {
                time: t0(),
                level: 1.0,
            },
            InterpolatedPoint {
                time: t0() + Duration::minutes(3),
                level: 2.0,
            },
            InterpolatedPoint {
                time: t0() + Duration::minutes(6),
                level: 1.4,
            },
        ]
    }

    #[test]
    fn level_is_linear_between_samples() {
        let level = bracket_level(&points(), t0() + Duration::seconds(45)).unwrap();
        assert!((level - 1.25).abs() < 1e-12);
        let level = bracket_level(&points(), t0() + Duration::seconds(270)).unwrap();
        assert!((level - 1.7).abs() < 1e-12);
    }

    #[test]
    fn exact_sample_times_return_sample_levels() {
        assert_eq!(bracket_level(&points(), t0()), Some(1.0));
        assert_eq!(bracket_level(&points(), t0() + Duration::minutes(6)), Some(1.4));
    }

    #[test]
    fn outside_samples_is_none() {
        assert_eq!(bracket_level(&points(), t0() - Duration::seconds(1)), None);
        assert_eq!(bracket_level(&points(), t0() + Duration::minutes(7)), None);
        assert_eq!(bracket_level(&[], t0()), None);
    }

    #[test]
    fn pulse_stays_in_unit_range() {
        for ms in (0..PULSE_PERIOD_MS).step_by(100) {
            let p = pulse(t0() + Duration::milliseconds(ms));
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn marker_draws_dot_at_position() {
        let palette = palette(0.0);
        let mut fb = Framebuffer::new(60, 60, palette.background);
        let position = MarkerPosition {
            x: 30.0,
            y: 20.0,
            level: 2.0,
            bracketed: true,
        };
        draw_live_marker(&mut fb, &position, &palette, 1.0, (5.0, 50.0), 0.5);

        assert_eq!(fb.pixel(30, 20), Some(palette.marker_core));
        assert_eq!(fb.pixel(33, 20), Some(palette.marker));
        // Glow reaches past the dot but fades out before the corner
        assert_ne!(fb.pixel(38, 20), Some(palette.background));
        assert_eq!(fb.pixel(0, 0), Some(palette.background));
        // Now line runs through the band
        assert_ne!(fb.pixel(30, 45), Some(palette.background));
    }
}
