//! Static layer drawing
//!
//! Everything here except [`draw_annotations`] runs only when the cache is
//! rebuilt: the time axis, the gradient fill and glowing stroke of the past, and
//! the dashed fading stroke of the future. All positions come from the [`Scale`]
//! the cache built, in device pixels.
//!
//! Extremum diamonds, their labels and the axis labels are not baked into the
//! layer. The build records them as [`Annotation`]s and every frame draws the
//! ones that keep clear of the visible surface edges.

use chrono::{DateTime, FixedOffset, Utc};
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10},
        MonoFont, MonoTextStyle,
    },
    prelude::*,
    primitives::{Line, Polyline, PrimitiveStyle, Triangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

use crate::framebuffer::Framebuffer;
use crate::scale::{CurveBounds, Scale};
use crate::theme::{level_color, Palette};
use crate::{EventKind, InterpolatedPoint, TidalEvent};

/// Glow passes for the past stroke: (width px, opacity), widest and faintest first.
pub const GLOW_PASSES: [(f32, f32); 4] = [(9.0, 0.06), (6.0, 0.12), (4.0, 0.22), (2.0, 1.0)];

/// Opacity of the fill right under the curve; it fades to zero at the band bottom.
pub const FILL_TOP_ALPHA: f32 = 0.45;

/// Dash and gap length of the future stroke.
pub const DASH_PX: f32 = 6.0;

/// Markers and labels closer than this to a surface edge are skipped.
pub const LABEL_MARGIN_PX: f32 = 18.0;

/// Minimum spacing between time-axis labels.
pub const MIN_LABEL_SPACING_PX: f32 = 56.0;

const LABEL_INTERVALS_HOURS: [i64; 6] = [1, 2, 3, 4, 6, 12];

/// Everything the static layer depends on.
pub struct LayerInputs<'a> {
    pub scale: &'a Scale,
    pub points: &'a [InterpolatedPoint],
    /// Real and synthesized extrema
    pub extrema: &'a [TidalEvent],
    /// Past/future boundary
    pub split: DateTime<Utc>,
    pub palette: &'a Palette,
    pub blend: f32,
    pub dpr: f32,
    pub label_offset: FixedOffset,
}

/// A marker or label placed in buffer columns, drawn per frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// Buffer column of the anchor
    pub x: f32,
    /// Half of the drawn width around `x`
    pub half_width: f32,
    pub label: String,
    pub kind: AnnotationKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnnotationKind {
    /// Axis tick with its time label under the band
    Tick,
    /// Diamond at `y`, labelled above a high and below a low
    Extremum { y: f32, kind: EventKind },
}

impl Annotation {
    /// Whether the annotation, moved left by `shift`, stays `margin` clear of
    /// both edges of a `width`-wide surface.
    pub fn fits(&self, shift: f32, width: f32, margin: f32) -> bool {
        let x = self.x - shift;
        x - self.half_width >= margin && x + self.half_width <= width - margin
    }
}

/// Draw the static layer into `fb` and return the annotations to overlay on
/// every frame cut from it.
pub fn draw_static_layer(fb: &mut Framebuffer, inputs: &LayerInputs) -> Vec<Annotation> {
    let split = inputs.points.partition_point(|p| p.time <= inputs.split);
    let past = &inputs.points[..split];
    let future = &inputs.points[split.saturating_sub(1)..];

    let ticks = axis_ticks(inputs);
    draw_time_axis(fb, inputs, &ticks);
    draw_past_fill(fb, inputs, past);
    draw_future_dashed(fb, inputs, future);
    draw_past_glow(fb, inputs, past);

    let mut annotations = ticks;
    annotations.extend(extremum_annotations(inputs));
    annotations
}

/// Draw the annotations that fit on a frame cut from the layer at column `shift`.
pub fn draw_annotations(
    fb: &mut Framebuffer,
    annotations: &[Annotation],
    shift: i32,
    bounds: &CurveBounds,
    palette: &Palette,
    dpr: f32,
) {
    let margin = LABEL_MARGIN_PX * dpr;
    let width = fb.width() as f32;
    let baseline_y = axis_baseline(bounds, dpr);
    let label_y = fb.height() as i32 - px(2.0, dpr) as i32;
    let half = px(4.0, dpr) as i32;
    let gap = px(3.0, dpr) as i32;
    let fill = PrimitiveStyle::with_fill(palette.extremum);
    let character_style = MonoTextStyle::new(font_for(dpr), palette.label);

    for annotation in annotations
        .iter()
        .filter(|a| a.fits(shift as f32, width, margin))
    {
        let x = annotation.x.round() as i32 - shift;
        match annotation.kind {
            AnnotationKind::Tick => {
                Line::new(
                    Point::new(x, baseline_y),
                    Point::new(x, baseline_y + px(3.0, dpr) as i32),
                )
                .into_styled(PrimitiveStyle::with_stroke(palette.axis, 1))
                .draw(fb)
                .ok();

                let text_style = TextStyleBuilder::new()
                    .alignment(Alignment::Center)
                    .baseline(Baseline::Bottom)
                    .build();
                Text::with_text_style(
                    &annotation.label,
                    Point::new(x, label_y),
                    character_style,
                    text_style,
                )
                .draw(fb)
                .ok();
            }
            AnnotationKind::Extremum { y, kind } => {
                let center = Point::new(x, y.round() as i32);
                let (left, right) = (center - Point::new(half, 0), center + Point::new(half, 0));
                Triangle::new(center - Point::new(0, half), left, right)
                    .into_styled(fill)
                    .draw(fb)
                    .ok();
                Triangle::new(center + Point::new(0, half), left, right)
                    .into_styled(fill)
                    .draw(fb)
                    .ok();

                let (anchor, baseline) = match kind {
                    EventKind::High => (center - Point::new(0, half + gap), Baseline::Bottom),
                    EventKind::Low => (center + Point::new(0, half + gap), Baseline::Top),
                };
                let text_style = TextStyleBuilder::new()
                    .alignment(Alignment::Center)
                    .baseline(baseline)
                    .build();
                Text::with_text_style(&annotation.label, anchor, character_style, text_style)
                    .draw(fb)
                    .ok();
            }
        }
    }
}

/// Label spacing in hours: the finest interval that keeps labels `min_spacing_px` apart.
pub fn label_interval_hours(px_per_hour: f32, min_spacing_px: f32) -> i64 {
    LABEL_INTERVALS_HOURS
        .iter()
        .copied()
        .find(|&h| h as f32 * px_per_hour >= min_spacing_px)
        .unwrap_or(24)
}

fn font_for(dpr: f32) -> &'static MonoFont<'static> {
    if dpr >= 1.75 {
        &FONT_10X20
    } else {
        &FONT_6X10
    }
}

fn px(value: f32, dpr: f32) -> u32 {
    (value * dpr).round().max(1.0) as u32
}

fn to_point(scale: &Scale, p: &InterpolatedPoint) -> Point {
    Point::new(scale.x(p.time).round() as i32, scale.y(p.level).round() as i32)
}

fn format_label(time: DateTime<Utc>, offset: FixedOffset) -> String {
    time.with_timezone(&offset).format("%H:%M").to_string()
}

fn label_half_width(label: &str, dpr: f32) -> f32 {
    let font = font_for(dpr);
    let advance = font.character_size.width + font.character_spacing;
    (label.chars().count() as u32 * advance) as f32 / 2.0
}

fn axis_baseline(bounds: &CurveBounds, dpr: f32) -> i32 {
    (bounds.bottom + 3.0 * dpr).round() as i32
}

/// One tick per label interval across the layer window.
fn axis_ticks(inputs: &LayerInputs) -> Vec<Annotation> {
    let scale = inputs.scale;
    let dpr = inputs.dpr;
    let interval = label_interval_hours(scale.px_per_hour(), MIN_LABEL_SPACING_PX * dpr);
    let interval_s = interval * 3600;
    let offset_s = inputs.label_offset.local_minus_utc() as i64;

    // First label boundary at or after the window start, in label-local time
    let local_start = scale.window.start.timestamp() + offset_s;
    let mut tick = (local_start.div_euclid(interval_s) + 1) * interval_s - offset_s;

    let mut ticks = Vec::new();
    while let Some(time) = DateTime::from_timestamp(tick, 0) {
        if time > scale.window.end {
            break;
        }
        tick += interval_s;
        let label = format_label(time, inputs.label_offset);
        ticks.push(Annotation {
            x: scale.x(time),
            half_width: label_half_width(&label, dpr),
            label,
            kind: AnnotationKind::Tick,
        });
    }
    ticks
}

fn extremum_annotations(inputs: &LayerInputs) -> Vec<Annotation> {
    let scale = inputs.scale;
    let diamond = px(4.0, inputs.dpr) as f32;
    inputs
        .extrema
        .iter()
        .filter(|event| scale.window.contains(event.time))
        .map(|event| {
            let label = format_label(event.time, inputs.label_offset);
            Annotation {
                x: scale.x(event.time),
                half_width: label_half_width(&label, inputs.dpr).max(diamond),
                label,
                kind: AnnotationKind::Extremum {
                    y: scale.y(event.level),
                    kind: event.kind,
                },
            }
        })
        .collect()
}

/// Baseline across the whole layer and a faint grid line per tick.
fn draw_time_axis(fb: &mut Framebuffer, inputs: &LayerInputs, ticks: &[Annotation]) {
    let bounds = &inputs.scale.bounds;
    let baseline_y = axis_baseline(bounds, inputs.dpr);
    let style = PrimitiveStyle::with_stroke(inputs.palette.axis, 1);

    Line::new(
        Point::new(bounds.left as i32, baseline_y),
        Point::new(bounds.right as i32, baseline_y),
    )
    .into_styled(style)
    .draw(&mut fb.layer(0.6))
    .ok();

    for tick in ticks {
        let x = tick.x.round() as i32;
        Line::new(Point::new(x, bounds.top as i32), Point::new(x, baseline_y))
            .into_styled(style)
            .draw(&mut fb.layer(0.25))
            .ok();
    }
}

/// Vertical gradient from the curve down to the band bottom, one column at a time.
fn draw_past_fill(fb: &mut Framebuffer, inputs: &LayerInputs, past: &[InterpolatedPoint]) {
    if past.len() < 2 {
        return;
    }
    let scale = inputs.scale;
    let bottom = scale.bounds.bottom;
    let mut columns: Vec<Option<f32>> = vec![None; fb.width() as usize];

    for pair in past.windows(2) {
        let (x0, y0) = (scale.x(pair[0].time), scale.y(pair[0].level));
        let (x1, y1) = (scale.x(pair[1].time), scale.y(pair[1].level));
        let first = x0.ceil().max(0.0) as usize;
        let last = (x1.floor().max(0.0) as usize).min(columns.len().saturating_sub(1));
        for (cx, column) in columns.iter_mut().enumerate().take(last + 1).skip(first) {
            let t = if x1 > x0 { (cx as f32 - x0) / (x1 - x0) } else { 0.0 };
            *column = Some(y0 + (y1 - y0) * t);
        }
    }

    for (cx, y) in columns.iter().enumerate() {
        let Some(y) = *y else { continue };
        let depth = (bottom - y).max(1.0);
        let start = y.ceil().max(0.0) as u32;
        for py in start..bottom.max(0.0) as u32 {
            let alpha = FILL_TOP_ALPHA * (1.0 - (py as f32 - y) / depth);
            fb.blend_pixel(cx as u32, py, inputs.palette.fill, alpha);
        }
    }
}

/// Dashed stroke whose opacity fades toward the right edge.
fn draw_future_dashed(fb: &mut Framebuffer, inputs: &LayerInputs, future: &[InterpolatedPoint]) {
    if future.len() < 2 {
        return;
    }
    let scale = inputs.scale;
    let dash = DASH_PX * inputs.dpr;
    let width = px(2.0, inputs.dpr);
    let start_x = scale.x(future[0].time);
    let fade_span = (scale.bounds.right - start_x).max(1.0);
    let style = PrimitiveStyle::with_stroke(inputs.palette.future, width);

    let mut travelled = 0.0f32;
    for pair in future.windows(2) {
        let (a, b) = (to_point(scale, &pair[0]), to_point(scale, &pair[1]));
        let seg = (((b.x - a.x).pow(2) + (b.y - a.y).pow(2)) as f32).sqrt();
        let on = (travelled / dash).floor() as i64 % 2 == 0;
        travelled += seg;
        if !on || a == b {
            continue;
        }
        let progress = ((a.x as f32 - start_x) / fade_span).clamp(0.0, 1.0);
        let alpha = 0.85 - 0.65 * progress;
        Line::new(a, b).into_styled(style).draw(&mut fb.layer(alpha)).ok();
    }
}

/// Multi-pass glow under a level-colored core stroke.
fn draw_past_glow(fb: &mut Framebuffer, inputs: &LayerInputs, past: &[InterpolatedPoint]) {
    if past.len() < 2 {
        return;
    }
    let scale = inputs.scale;
    let points: Vec<Point> = past.iter().map(|p| to_point(scale, p)).collect();
    let (core, halos) = GLOW_PASSES.split_last().unwrap_or((&(2.0, 1.0), &[]));

    for &(width, alpha) in halos {
        Polyline::new(&points)
            .into_styled(PrimitiveStyle::with_stroke(inputs.palette.glow, px(width, inputs.dpr)))
            .draw(&mut fb.layer(alpha))
            .ok();
    }

    let core_width = px(core.0, inputs.dpr);
    for (pair, segment) in past.windows(2).zip(points.windows(2)) {
        let level = (pair[0].level + pair[1].level) / 2.0;
        let color = level_color(scale.range.fraction(level), inputs.blend);
        Line::new(segment[0], segment[1])
            .into_styled(PrimitiveStyle::with_stroke(color, core_width))
            .draw(&mut fb.layer(core.1))
            .ok();
    }
}
