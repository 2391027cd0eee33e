//! # Time Scrubbing
//!
//! Drag and wheel input move a "virtual now" away from the wall clock by a bounded
//! offset; letting go eases it back. The controller is a three-state machine:
//!
//! ```text
//!            pointer down in band              pointer up / leave
//!   Idle ───────────────────────────▶ Dragging ───────────────────▶ Snapback
//!    ▲                                   ▲                            │
//!    │        eased to exactly zero      │  pointer down / wheel      │
//!    └───────────────────────────────────┴────────────────────────────┘
//! ```
//!
//! Snapback first holds the offset for an idle delay, then eases it to zero. Any
//! new drag or wheel input cancels it outright. Time only advances through
//! [`ScrubController::tick`], which takes the frame clock explicitly.
//!
//! Dragging left moves the virtual now into the future: the offset grows by the
//! time the dragged distance represents on screen.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::ScrubConfig;
use crate::interpolate::cosine_ease;
use crate::scale::CurveBounds;

/// Pointer position in logical (client) pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub pointer_id: u32,
    pub x: f32,
    pub y: f32,
}

/// Wheel deltas in logical pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelEvent {
    pub delta_x: f32,
    pub delta_y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrubPhase {
    Idle,
    Dragging {
        pointer_id: u32,
        anchor_x: f32,
        anchor_offset: Duration,
    },
    /// Holds `from` until `starts_at`, then eases it to zero.
    Snapback {
        from: Duration,
        starts_at: DateTime<Utc>,
    },
}

/// Milliseconds of window represented by one logical pixel.
pub fn px_to_ms(view_span: Duration, width: f32) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    view_span.num_milliseconds() as f64 / width as f64
}

#[derive(Clone, Debug)]
pub struct ScrubController {
    config: ScrubConfig,
    offset: Duration,
    phase: ScrubPhase,
}

impl ScrubController {
    pub fn new(config: ScrubConfig) -> Self {
        Self {
            config,
            offset: Duration::zero(),
            phase: ScrubPhase::Idle,
        }
    }

    /// Current distance of the virtual now from the wall clock.
    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn phase(&self) -> ScrubPhase {
        self.phase
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, ScrubPhase::Dragging { .. })
    }

    /// Start a drag if the pointer lands inside the vertical extent of `band`.
    ///
    /// Returns whether the pointer was captured. A second pointer is ignored while
    /// one is already dragging.
    pub fn pointer_down(&mut self, event: &PointerEvent, band: &CurveBounds) -> bool {
        if self.is_dragging() || !band.contains_y(event.y) {
            return false;
        }
        self.phase = ScrubPhase::Dragging {
            pointer_id: event.pointer_id,
            anchor_x: event.x,
            anchor_offset: self.offset,
        };
        debug!(
            pointer = event.pointer_id,
            offset_ms = self.offset.num_milliseconds(),
            "scrub drag started"
        );
        true
    }

    /// Move the captured pointer; `px_to_ms` converts logical pixels to window time.
    pub fn pointer_move(&mut self, event: &PointerEvent, px_to_ms: f64) {
        if let ScrubPhase::Dragging {
            pointer_id,
            anchor_x,
            anchor_offset,
        } = self.phase
        {
            if pointer_id != event.pointer_id {
                return;
            }
            let dx = (event.x - anchor_x) as f64;
            let ms = anchor_offset.num_milliseconds() as f64 - dx * px_to_ms;
            self.offset = self.clamp(ms);
        }
    }

    pub fn pointer_up(&mut self, event: &PointerEvent, now: DateTime<Utc>) {
        self.release(event.pointer_id, now);
    }

    pub fn pointer_leave(&mut self, event: &PointerEvent, now: DateTime<Utc>) {
        self.release(event.pointer_id, now);
    }

    /// Nudge the offset by wheel input unless a drag is in progress.
    ///
    /// The vertical delta stands in for the horizontal one when it dominates.
    pub fn wheel(&mut self, event: &WheelEvent, px_to_ms: f64, now: DateTime<Utc>) {
        if self.is_dragging() {
            return;
        }
        let delta = if event.delta_y.abs() > event.delta_x.abs() {
            event.delta_y
        } else {
            event.delta_x
        };
        let ms = self.offset.num_milliseconds() as f64
            + delta as f64 * px_to_ms * self.config.wheel_factor;
        self.offset = self.clamp(ms);
        self.schedule_snapback(now);
    }

    /// Advance the snapback animation to `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        let ScrubPhase::Snapback { from, starts_at } = self.phase else {
            return;
        };
        let elapsed = now - starts_at;
        let duration = self.config.snapback_duration();
        if elapsed <= Duration::zero() {
            self.offset = from;
        } else if elapsed >= duration {
            self.offset = Duration::zero();
            self.phase = ScrubPhase::Idle;
            debug!("scrub snapback finished");
        } else {
            let progress = elapsed.num_milliseconds() as f64 / duration.num_milliseconds() as f64;
            let ms = from.num_milliseconds() as f64 * (1.0 - cosine_ease(progress));
            self.offset = Duration::milliseconds(ms.round() as i64);
        }
    }

    /// Stop any drag or snapback, keeping the current offset.
    pub fn cancel(&mut self) {
        self.phase = ScrubPhase::Idle;
    }

    /// Back to the wall clock immediately.
    pub fn reset(&mut self) {
        self.offset = Duration::zero();
        self.phase = ScrubPhase::Idle;
    }

    fn release(&mut self, pointer: u32, now: DateTime<Utc>) {
        match self.phase {
            ScrubPhase::Dragging { pointer_id, .. } if pointer_id == pointer => {
                debug!(offset_ms = self.offset.num_milliseconds(), "scrub drag released");
                self.schedule_snapback(now);
            }
            _ => {}
        }
    }

    fn schedule_snapback(&mut self, now: DateTime<Utc>) {
        self.phase = if self.offset == Duration::zero() {
            ScrubPhase::Idle
        } else {
            ScrubPhase::Snapback {
                from: self.offset,
                starts_at: now + self.config.snapback_delay(),
            }
        };
    }

    fn clamp(&self, ms: f64) -> Duration {
        let max = self.config.max_offset().num_milliseconds() as f64;
        Duration::milliseconds(ms.clamp(-max, max).round() as i64)
    }
}
