//! # Tide Curve Application Entry Point
//!
//! Loads configuration, obtains predictions (NOAA, cached, or the offline model),
//! then runs the rate-limited frame loop against an offscreen surface for a few
//! seconds. It is the reference host for [`CurveRenderer`]: it owns the clock,
//! feeds the visual snapshot and forwards input.
//!
//! ```text
//! tide-curve [--stdout] [--seconds N] [--scrub] [--write-config]
//! ```
//!
//! - `--stdout`: print the last frame as ASCII
//! - `--seconds N`: run the frame loop for N seconds (default 2)
//! - `--scrub`: drag the curve left during the run, then let it snap back
//! - `--write-config`: write the default `tide-curve.toml` and exit

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::{env, thread, time::Duration as StdDuration};
use tide_curve::{
    ascii::draw_ascii,
    config::{Config, CONFIG_FILE},
    fallback,
    frame::FrameLimiter,
    framebuffer::Framebuffer,
    interpolate::level_at,
    renderer::{CurveRenderer, VisualState},
    scrub::PointerEvent,
    theme::palette,
    tide_data, TidalEvent,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_SECONDS: u64 = 2;
const PREVIEW_COLUMNS: u32 = 96;
const PREVIEW_ROWS: u32 = 24;
/// Host refresh callbacks are polled faster than the frame cap
const POLL_INTERVAL: StdDuration = StdDuration::from_millis(8);
/// Logical pixels the scripted drag moves per drawn frame
const SCRUB_STEP_PX: f32 = 4.0;
const SCRUB_POINTER: u32 = 1;

struct Args {
    stdout: bool,
    seconds: u64,
    scrub: bool,
    write_config: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = env::args().skip(1).collect();
    let seconds = match args.iter().position(|a| a == "--seconds") {
        Some(i) => args
            .get(i + 1)
            .context("--seconds needs a value")?
            .parse()
            .context("--seconds must be a whole number")?,
        None => DEFAULT_SECONDS,
    };
    Ok(Args {
        stdout: args.iter().any(|a| a == "--stdout"),
        seconds,
        scrub: args.iter().any(|a| a == "--scrub"),
        write_config: args.iter().any(|a| a == "--write-config"),
    })
}

fn load_predictions(config: &Config, now: DateTime<Utc>) -> anyhow::Result<Vec<TidalEvent>> {
    let rt = tokio::runtime::Runtime::new()?;
    let events = rt.block_on(async {
        tide_data::fetch(config, now).await.unwrap_or_else(|error| {
            warn!(error = %error, "prediction fetch failed, using offline model");
            fallback::approximate(Some(now))
        })
    });
    Ok(events)
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tide_curve=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args = parse_args()?;
    let config = Config::load();

    if args.write_config {
        config
            .save_to_path(CONFIG_FILE)
            .with_context(|| format!("writing {CONFIG_FILE}"))?;
        return Ok(());
    }

    let events = load_predictions(&config, Utc::now())?;
    info!(
        station = %config.station.name,
        count = events.len(),
        "predictions ready"
    );

    let mut renderer = CurveRenderer::new(&config);
    renderer.set_predictions(events);

    let display = &config.display;
    let (width, height) = VisualState::for_display(display, 0.0, 0.0, Utc::now()).device_size();
    let mut surface = Framebuffer::new(width, height, palette(0.0).background);
    let mut limiter = FrameLimiter::new(display.max_fps);
    debug!(
        interval_ms = limiter.min_interval().num_milliseconds(),
        width,
        height,
        "frame loop starting"
    );

    let run_for = i64::try_from(args.seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .context("--seconds is too large")?;
    let started = Utc::now();
    let deadline = started
        .checked_add_signed(run_for)
        .context("--seconds is too large")?;
    let drag_until = started + run_for / 2;
    let mut pointer = PointerEvent {
        pointer_id: SCRUB_POINTER,
        x: display.width as f32 * 0.75,
        y: display.height as f32 * (config.curve.band_top + config.curve.band_bottom) / 2.0,
    };
    let mut dragging = false;
    let mut frames = 0u64;

    loop {
        let now = Utc::now();
        if now >= deadline {
            break;
        }
        if !limiter.ready(now) {
            thread::sleep(POLL_INTERVAL);
            continue;
        }

        let current_level = level_at(renderer.predictions(), now).unwrap_or(fallback::MEAN_LEVEL_M);
        let state = VisualState::for_display(display, current_level, 0.0, now);

        if args.scrub {
            if frames == 0 {
                dragging = renderer.pointer_down(&pointer, &state);
            } else if dragging && now < drag_until {
                pointer.x -= SCRUB_STEP_PX;
                renderer.pointer_move(&pointer, &state);
            } else if dragging {
                renderer.pointer_up(&pointer, &state);
                dragging = false;
                info!(
                    offset_min = renderer.scrub().offset().num_minutes(),
                    "scripted drag released"
                );
            }
        }

        if renderer.draw(&mut surface, &state)? {
            frames += 1;
        }
    }

    renderer.teardown();
    info!(
        frames,
        rebuilds = renderer.cache().rebuild_count(),
        offset_min = renderer.scrub().offset().num_minutes(),
        "frame loop finished"
    );

    if args.stdout {
        draw_ascii(&surface, PREVIEW_COLUMNS, PREVIEW_ROWS, palette(0.0).background);
    }
    Ok(())
}
