//! Glide Animation Engine
//!
//! Frame-driven motion for decorative effects: entities travel along eased
//! curves, shed bounded particle trails, and hand off to each other through a
//! small state machine.
//!
//! # Features
//!
//! - **Easing**: CSS-compatible cubic beziers plus polynomial ease-outs
//! - **Motion Curves**: eased trajectories with layered oscillation
//! - **Particle Pools**: cadence-gated spawning, trimmed to a fixed cap
//! - **Frame Scheduler**: cancellable per-frame loops driven by an injected clock
//! - **Timers**: cancellable one-shot follow-ups
//! - **Effects**: vehicle (travel, dock, melt, complete) and skier state machines
//! - **Parallax**: spring-smoothed pointer/orientation tilt
//! - **Coordination**: mutual exclusion and dissolve arming with a cooldown reset
//!
//! # Example
//!
//! ```rust
//! use glide_animation::{FrameScheduler, Flow};
//! use glide_core::ManualClock;
//! use std::rc::Rc;
//!
//! let clock = ManualClock::new();
//! let scheduler = FrameScheduler::new(Rc::new(clock.clone()));
//! scheduler.start("fade", |ctx| {
//!     if ctx.elapsed_ms >= 300.0 { Flow::Stop } else { Flow::Continue }
//! });
//!
//! clock.advance(16.0);
//! assert!(scheduler.tick());
//! clock.advance(300.0);
//! assert!(!scheduler.tick());
//! ```

pub mod config;
pub mod coordinator;
pub mod curve;
pub mod dissolve;
pub mod easing;
pub mod effect;
pub mod keyframe;
pub mod parallax;
pub mod particles;
pub mod scheduler;
pub mod spring;
pub mod timer;

pub use config::{
    ContainerConfig, CoordinatorConfig, DissolveConfig, DriftRange, MotionConfig,
    OscillationConfig, ParallaxConfig, ParticleConfig, SkierConfig, VehicleConfig,
};
pub use coordinator::{
    CoordinatorEvent, CoordinatorHandler, TriggerCoordinator, TriggerMode, TriggerState,
};
pub use curve::{progress, CurveSample, EntityKind, MotionCurve};
pub use dissolve::{Dissolve, DissolvePose, DissolveVisual, DripVisual};
pub use easing::{ease_out_cubic, Easing};
pub use effect::{
    launch, Arrival, ContainerDrop, ContainerVisual, Effect, EffectEvent, EffectListener,
    EffectRun, EffectState, EntityParams, SkierEffect, VehicleEffect,
};
pub use keyframe::{Keyframe, KeyframeTrack};
pub use parallax::{map_range, ParallaxTracker, ParallaxTransform, PointerState};
pub use particles::{Particle, ParticlePool, ParticleStyle, ParticleVisual, SpawnPattern};
pub use scheduler::{Flow, FrameScheduler, LoopId, SchedulerHandle, TickContext};
pub use spring::{Spring, SpringConfig};
pub use timer::{TimerHandle, TimerId, TimerQueue};
