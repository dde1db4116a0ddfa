//! Headless Voyage Demo
//!
//! Drives the vehicle effect at 60 fps against a manual clock and logs the
//! interesting frames: travel, docking, the container drop, the melt and the
//! dissolve cooldown. An optional TOML file overrides the motion defaults.
//!
//! Run with: cargo run -p glide_app --example headless_voyage [-- motion.toml]

use anyhow::Context;
use glide_app::prelude::*;
use std::rc::Rc;

const FRAME_MS: f64 = 1000.0 / 60.0;

fn main() -> anyhow::Result<()> {
    glide_app::logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            MotionConfig::load(&path).with_context(|| format!("loading motion config {path}"))?
        }
        None => MotionConfig::default(),
    };
    let cooldown_ms = config.coordinator.dissolve_cooldown_ms;

    let clock = ManualClock::new();
    let mut stage = Stage::new(config, Viewport::new(1440.0, 900.0), Rc::new(clock.clone()));

    let log_clock = clock.clone();
    stage.subscribe(move |event| {
        tracing::info!(t_ms = log_clock.now_ms().round(), ?event, "coordinator");
    });

    stage
        .activate(
            EntityKind::Vehicle,
            ActivateConfig::new()
                .on_secondary_effect_start(|| tracing::info!("text starts melting"))
                .on_complete(|| tracing::info!("voyage complete")),
        )
        .context("vehicle trigger was rejected")?;

    let mut frame_index: u64 = 0;
    let mut last_state = None;
    loop {
        clock.advance(FRAME_MS);
        let moving = stage.tick();
        let frame = stage.frame();

        if let Some(ship) = frame.entity(EntityKind::Vehicle) {
            if last_state != Some(ship.state) || frame_index % 30 == 0 {
                tracing::info!(
                    t_ms = frame.now_ms.round(),
                    state = ?ship.state,
                    x = ship.position.x.round(),
                    y = ship.position.y.round(),
                    rotation = ship.rotation_deg,
                    wake = ship.particles.len(),
                    containers = ship.containers.len(),
                    "vehicle"
                );
                last_state = Some(ship.state);
            }
        }
        if frame_index % 60 == 0 && frame.trigger.dissolve_armed {
            let pose = frame.dissolve.first().map(|d| d.pose).unwrap_or_default();
            tracing::info!(opacity = pose.opacity, blur = pose.blur_px, "dissolve");
        }

        frame_index += 1;
        if !moving && !stage.dissolve_reset_pending() {
            break;
        }
        if frame.now_ms > 30_000.0 + cooldown_ms {
            anyhow::bail!("voyage did not settle");
        }
    }

    tracing::info!(frames = frame_index, t_ms = clock.now_ms().round(), "stage idle");
    Ok(())
}
