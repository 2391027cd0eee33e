//! # Curve Renderer
//!
//! [`CurveRenderer`] is the per-view owner of everything stateful: the current
//! predictions, the static layer cache, the scrub controller and a reusable
//! frame buffer. Several renderers can live side by side (one per station) and
//! tests construct them directly.
//!
//! ## Frame Composition
//! Each call to [`CurveRenderer::draw`]:
//! 1. advances the snapback animation to the frame clock
//! 2. makes sure the cached static layer matches the current key
//! 3. copies the visible window out of the cached layer, shifted by the scrub offset
//! 4. overlays the extremum markers and axis labels that clear the edge margin
//! 5. draws the live marker at the virtual now
//! 6. copies the composed frame onto the caller's draw target
//!
//! Fewer than two predictions, a zero-sized surface or a failed build all make
//! `draw` a no-op that reports `Ok(false)`.

use chrono::{DateTime, Duration, Utc};
use embedded_graphics::{draw_target::DrawTarget, pixelcolor::Rgb888};
use tracing::{debug, info};

use crate::cache::{build_entry, BuildRequest, CacheKey, StaticLayerCache};
use crate::config::{Config, DisplayConfig};
use crate::framebuffer::Framebuffer;
use crate::layer::draw_annotations;
use crate::marker::{draw_live_marker, locate, pulse};
use crate::scale::CurveBounds;
use crate::scrub::{px_to_ms, PointerEvent, ScrubController, WheelEvent};
use crate::theme::{blend_bucket, bucket_blend, palette};
use crate::{RenderWindow, TidalEvent};

/// Per-frame snapshot supplied by the surrounding application.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualState {
    /// Logical surface width
    pub width: f32,
    /// Logical surface height
    pub height: f32,
    pub device_pixel_ratio: f32,
    /// Observed level, used when the virtual now is outside the curve
    pub current_level: f64,
    /// 0 = dark, 1 = light
    pub theme_blend: f32,
    /// Animation clock
    pub now: DateTime<Utc>,
}

impl VisualState {
    /// Snapshot for a surface described by the display config.
    pub fn for_display(
        display: &DisplayConfig,
        current_level: f64,
        theme_blend: f32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            width: display.width as f32,
            height: display.height as f32,
            device_pixel_ratio: display.device_pixel_ratio,
            current_level,
            theme_blend,
            now,
        }
    }

    /// Surface size in device pixels.
    pub fn device_size(&self) -> (u32, u32) {
        let dpr = self.device_pixel_ratio.max(0.0);
        (
            (self.width.max(0.0) * dpr).round() as u32,
            (self.height.max(0.0) * dpr).round() as u32,
        )
    }
}

#[derive(Debug)]
pub struct CurveRenderer {
    config: Config,
    events: Vec<TidalEvent>,
    cache: StaticLayerCache,
    scrub: ScrubController,
    frame: Framebuffer,
}

impl CurveRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            events: Vec::new(),
            cache: StaticLayerCache::new(config.cache.ttl()),
            scrub: ScrubController::new(config.scrub.clone()),
            frame: Framebuffer::new(0, 0, palette(0.0).background),
        }
    }

    /// Replace the predictions wholesale.
    pub fn set_predictions(&mut self, events: Vec<TidalEvent>) {
        info!(count = events.len(), "predictions updated");
        self.events = events;
    }

    pub fn predictions(&self) -> &[TidalEvent] {
        &self.events
    }

    /// Force the static layer to be rebuilt on the next draw.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    pub fn cache(&self) -> &StaticLayerCache {
        &self.cache
    }

    pub fn scrub(&self) -> &ScrubController {
        &self.scrub
    }

    /// Drop the scrub offset, e.g. after a station change.
    pub fn reset_scrub(&mut self) {
        self.scrub.reset();
    }

    /// Stop pending animations before the view goes away.
    pub fn teardown(&mut self) {
        debug!("renderer teardown");
        self.scrub.cancel();
    }

    /// Wall clock shifted by the scrub offset.
    pub fn virtual_now(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.scrub.offset()
    }

    /// Window visible at `now`, centered according to the configured horizon.
    pub fn view_window(&self, now: DateTime<Utc>) -> RenderWindow {
        RenderWindow::around(
            self.virtual_now(now),
            self.config.window.past(),
            self.config.window.future(),
        )
    }

    pub fn pointer_down(&mut self, event: &PointerEvent, state: &VisualState) -> bool {
        let band = self.band(state);
        self.scrub.pointer_down(event, &band)
    }

    pub fn pointer_move(&mut self, event: &PointerEvent, state: &VisualState) {
        let ratio = self.px_to_ms(state);
        self.scrub.pointer_move(event, ratio);
    }

    pub fn pointer_up(&mut self, event: &PointerEvent, state: &VisualState) {
        self.scrub.pointer_up(event, state.now);
    }

    pub fn pointer_leave(&mut self, event: &PointerEvent, state: &VisualState) {
        self.scrub.pointer_leave(event, state.now);
    }

    pub fn wheel(&mut self, event: &WheelEvent, state: &VisualState) {
        let ratio = self.px_to_ms(state);
        self.scrub.wheel(event, ratio, state.now);
    }

    /// Compose one frame onto `target`.
    ///
    /// Returns `Ok(true)` when a frame was drawn and `Ok(false)` for the defined
    /// no-op cases. Only errors from `target` itself are propagated.
    pub fn draw<D>(&mut self, target: &mut D, state: &VisualState) -> Result<bool, D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        self.scrub.tick(state.now);

        if self.events.len() < 2 {
            return Ok(false);
        }
        let (width, height) = state.device_size();
        if width == 0 || height == 0 {
            return Ok(false);
        }

        let buckets = self.config.cache.theme_buckets;
        let bucket = blend_bucket(state.theme_blend, buckets);
        let key = CacheKey::new(
            width,
            height,
            state.device_pixel_ratio,
            bucket,
            self.events.len(),
            state.now,
        );

        let virtual_now = self.virtual_now(state.now);
        let view = self.view_window(state.now);

        let events = &self.events;
        let config = &self.config;
        let Some(entry) = self.cache.ensure(key, state.now, |key| {
            build_entry(&BuildRequest {
                key,
                events,
                config,
            })
        }) else {
            return Ok(false);
        };

        let src_x = entry.source_x(view.start);
        let layer_palette = palette(bucket_blend(bucket, buckets));
        let background = layer_palette.background;

        self.frame.resize(width, height, background);
        entry.buffer.blit_into(&mut self.frame, src_x, background).ok();
        draw_annotations(
            &mut self.frame,
            &entry.annotations,
            src_x,
            &entry.curve_bounds,
            &layer_palette,
            key.dpr(),
        );

        let position = locate(entry, virtual_now, src_x, state.current_level);
        draw_live_marker(
            &mut self.frame,
            &position,
            &palette(state.theme_blend),
            key.dpr(),
            (entry.curve_bounds.top, entry.curve_bounds.bottom),
            pulse(state.now),
        );

        self.frame.blit_into(target, 0, background)?;
        Ok(true)
    }

    /// Curve band in logical pixels, the same split the cache draws with.
    fn band(&self, state: &VisualState) -> CurveBounds {
        CurveBounds::for_surface(
            state.width,
            state.height,
            self.config.curve.band_top,
            self.config.curve.band_bottom,
        )
    }

    fn px_to_ms(&self, state: &VisualState) -> f64 {
        let span: Duration = self.config.window.span();
        px_to_ms(span, state.width)
    }
}
