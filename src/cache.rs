//! # Static Layer Cache
//!
//! Padding, interpolation and every stroke, fill, marker and label of the curve
//! are O(window / step) and far too slow to redo every frame. They are drawn once
//! into an offscreen [`Framebuffer`] and reused until something that affects them
//! changes.
//!
//! ## Key
//! A [`CacheKey`] fingerprints everything the build reads: device width and
//! height, device pixel ratio, a coarse theme-blend bucket, the number of
//! predictions and the current wall-clock minute. The build derives its time
//! anchor from the minute bucket and its palette from the theme bucket, so two
//! builds with the same key produce the same pixels.
//!
//! ## Rebuild rules
//! A rebuild runs when the cache was invalidated, when the key differs from the
//! last attempt, or when the last attempt is older than the TTL. A failed build
//! (fewer than two usable points) leaves the cache empty and is not retried until
//! one of those conditions holds again.
//!
//! ## Extended window
//! The layer covers the visible span plus the maximum scrub offset and a few
//! minutes of slack on each side. The renderer cuts the visible window out of it
//! with a horizontal source offset, so scrubbing never needs a rebuild.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::Config;
use crate::framebuffer::Framebuffer;
use crate::interpolate::interpolate;
use crate::layer::{draw_static_layer, Annotation, LayerInputs};
use crate::padding::pad_extrema;
use crate::scale::{CurveBounds, LevelRange, Scale};
use crate::theme::{bucket_blend, palette};
use crate::{InterpolatedPoint, RenderWindow, TidalEvent};

/// Fingerprint of every input the static layer depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub width_px: u32,
    pub height_px: u32,
    /// Device pixel ratio in thousandths
    pub dpr_milli: u32,
    pub theme_bucket: u16,
    pub prediction_count: usize,
    /// Whole minutes since the Unix epoch
    pub minute_bucket: i64,
}

impl CacheKey {
    pub fn new(
        width_px: u32,
        height_px: u32,
        dpr: f32,
        theme_bucket: u16,
        prediction_count: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            width_px,
            height_px,
            dpr_milli: (dpr.max(0.0) * 1000.0).round() as u32,
            theme_bucket,
            prediction_count,
            minute_bucket: minute_bucket(now),
        }
    }

    pub fn dpr(&self) -> f32 {
        self.dpr_milli as f32 / 1000.0
    }

    /// Start of the minute this key was computed in.
    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.minute_bucket.saturating_mul(60), 0)
    }
}

/// Whole minutes since the Unix epoch, rounded toward negative infinity.
pub fn minute_bucket(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(60)
}

/// One built static layer and the geometry it was drawn with.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub buffer: Framebuffer,
    pub points: Vec<InterpolatedPoint>,
    /// Padded extrema, real and synthesized
    pub extrema: Vec<TidalEvent>,
    pub level_range: LevelRange,
    /// Extended window covered by `buffer`
    pub window: RenderWindow,
    pub curve_bounds: CurveBounds,
    /// Past/future split of the layer
    pub anchor: DateTime<Utc>,
    /// Markers and labels in buffer columns, drawn onto each frame
    pub annotations: Vec<Annotation>,
}

impl CacheEntry {
    /// Mapping used to draw the buffer, in buffer pixels.
    pub fn scale(&self) -> Scale {
        Scale {
            window: self.window,
            range: self.level_range,
            bounds: self.curve_bounds,
        }
    }

    /// Buffer column at which `time` sits, unclamped.
    pub fn source_x(&self, time: DateTime<Utc>) -> i32 {
        let span = self.window.span_ms();
        if span <= 0.0 {
            return 0;
        }
        let ms = (time - self.window.start).num_milliseconds() as f64;
        (ms / span * self.curve_bounds.width() as f64).round() as i32
    }
}

/// Everything a build reads besides the key. Time enters only through the key.
pub struct BuildRequest<'a> {
    pub key: &'a CacheKey,
    pub events: &'a [TidalEvent],
    pub config: &'a Config,
}

/// Why a rebuild is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebuildCause {
    Invalidated,
    Empty,
    KeyChanged,
    Expired,
}

/// Owner of the single cached static layer.
#[derive(Debug)]
pub struct StaticLayerCache {
    entry: Option<CacheEntry>,
    last_attempt: Option<(CacheKey, DateTime<Utc>)>,
    forced: bool,
    ttl: Duration,
    rebuilds: u64,
}

impl StaticLayerCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: None,
            last_attempt: None,
            forced: false,
            ttl,
            rebuilds: 0,
        }
    }

    /// The most recent successful build, if the last attempt succeeded.
    pub fn entry(&self) -> Option<&CacheEntry> {
        self.entry.as_ref()
    }

    /// Number of builds attempted so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Force a rebuild on the next [`ensure`](Self::ensure), whatever the key.
    pub fn invalidate(&mut self) {
        debug!("static layer invalidated");
        self.forced = true;
    }

    /// Whether `key` at `now` requires a build, and why.
    pub fn needs_rebuild(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<RebuildCause> {
        if self.forced {
            return Some(RebuildCause::Invalidated);
        }
        match &self.last_attempt {
            None => Some(RebuildCause::Empty),
            Some((last, _)) if last != key => Some(RebuildCause::KeyChanged),
            Some((_, at)) if now - *at > self.ttl => Some(RebuildCause::Expired),
            Some(_) => None,
        }
    }

    /// Return the entry for `key`, running `build` first if a rebuild is due.
    ///
    /// A build returning `None` clears the cache; the same key is then left
    /// alone until the TTL lapses or the cache is invalidated.
    pub fn ensure<F>(&mut self, key: CacheKey, now: DateTime<Utc>, build: F) -> Option<&CacheEntry>
    where
        F: FnOnce(&CacheKey) -> Option<CacheEntry>,
    {
        if let Some(cause) = self.needs_rebuild(&key, now) {
            self.rebuilds += 1;
            self.forced = false;
            self.last_attempt = Some((key, now));
            self.entry = build(&key);
            match &self.entry {
                Some(entry) => debug!(
                    ?cause,
                    width = entry.buffer.width(),
                    height = entry.buffer.height(),
                    points = entry.points.len(),
                    rebuilds = self.rebuilds,
                    "static layer rebuilt"
                ),
                None => debug!(?cause, ?key, "static layer build produced no curve"),
            }
        }
        self.entry.as_ref()
    }
}

/// Pad, interpolate, scale and draw the static layer for `request.key`.
///
/// Returns `None` when the window cannot be mapped or fewer than two curve
/// points fall inside it.
pub fn build_entry(request: &BuildRequest) -> Option<CacheEntry> {
    let key = request.key;
    let config = request.config;
    let anchor = key.anchor()?;

    let view_span_ms = config.window.span().num_milliseconds() as f64;
    if view_span_ms <= 0.0 || key.width_px == 0 || key.height_px == 0 {
        return None;
    }

    let reach = config.scrub.max_offset() + config.cache.slack();
    let window = RenderWindow::around(
        anchor,
        config.window.past() + reach,
        config.window.future() + reach,
    );

    let extrema = pad_extrema(request.events, &window, config.curve.half_cycle());
    let points = interpolate(&extrema, &window, config.curve.sample_step());
    if points.len() < 2 {
        return None;
    }
    let level_range = LevelRange::from_points(&points)?
        .padded(config.curve.headroom, config.curve.flat_range_spread);

    let buffer_width = (window.span_ms() * key.width_px as f64 / view_span_ms).round() as u32;
    let curve_bounds = CurveBounds::for_surface(
        buffer_width as f32,
        key.height_px as f32,
        config.curve.band_top,
        config.curve.band_bottom,
    );
    let scale = Scale {
        window,
        range: level_range,
        bounds: curve_bounds,
    };

    let blend = bucket_blend(key.theme_bucket, config.cache.theme_buckets);
    let colors = palette(blend);
    let mut buffer = Framebuffer::new(buffer_width, key.height_px, colors.background);
    let annotations = draw_static_layer(
        &mut buffer,
        &LayerInputs {
            scale: &scale,
            points: &points,
            extrema: &extrema,
            split: anchor,
            palette: &colors,
            blend,
            dpr: key.dpr(),
            label_offset: config.display.label_offset(),
        },
    );

    Some(CacheEntry {
        key: *key,
        buffer,
        points,
        extrema,
        level_range,
        window,
        curve_bounds,
        anchor,
        annotations,
    })
}
