//! Frame pacing for the animation loop.

use chrono::{DateTime, Duration, Utc};

/// Lets at most one frame through per `1 / max_fps` seconds.
#[derive(Clone, Debug)]
pub struct FrameLimiter {
    min_interval: Duration,
    last: Option<DateTime<Utc>>,
}

impl FrameLimiter {
    /// `max_fps = 0` disables the cap.
    pub fn new(max_fps: u32) -> Self {
        let min_interval = if max_fps == 0 {
            Duration::zero()
        } else {
            Duration::microseconds(1_000_000 / max_fps as i64)
        };
        Self {
            min_interval,
            last: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Whether a frame should be drawn at `now`; records it if so.
    pub fn ready(&mut self, now: DateTime<Utc>) -> bool {
        match self.last {
            Some(last) if now - last < self.min_interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 24, 0, 0, 0).unwrap()
    }

    #[test]
    fn skips_callbacks_inside_the_interval() {
        let mut limiter = FrameLimiter::new(30);
        assert!(limiter.ready(t0()));
        assert!(!limiter.ready(t0() + Duration::milliseconds(16)));
        assert!(!limiter.ready(t0() + Duration::milliseconds(33)));
        assert!(limiter.ready(t0() + Duration::milliseconds(34)));
        assert!(!limiter.ready(t0() + Duration::milliseconds(50)));
    }

    #[test]
    fn sixty_hz_callbacks_yield_thirty_frames() {
        let mut limiter = FrameLimiter::new(30);
        let frames = (0..60)
            .filter(|i| limiter.ready(t0() + Duration::microseconds(i * 16_667)))
            .count();
        assert_eq!(frames, 30);
    }

    #[test]
    fn zero_fps_is_uncapped() {
        let mut limiter = FrameLimiter::new(0);
        assert!(limiter.ready(t0()));
        assert!(limiter.ready(t0()));
    }
}
