//! Glide Stage
//!
//! Host-facing entry point. A [`Stage`] owns the frame scheduler, timers,
//! trigger coordinator and parallax tracker for one page view; the host
//! forwards input, calls [`Stage::tick`] once per display refresh and draws
//! the [`RenderFrame`] it gets back.
//!
//! ```
//! use glide_app::prelude::*;
//! use std::rc::Rc;
//!
//! let clock = ManualClock::new();
//! let mut stage = Stage::new(
//!     MotionConfig::default(),
//!     Viewport::new(1280.0, 800.0),
//!     Rc::new(clock.clone()),
//! );
//!
//! let ship = stage.activate(EntityKind::Vehicle, ActivateConfig::new());
//! assert!(ship.is_some());
//! // Only one effect at a time
//! assert!(stage.activate(EntityKind::Skier, ActivateConfig::new()).is_none());
//!
//! clock.advance(16.0);
//! stage.tick();
//! let frame = stage.frame();
//! assert_eq!(frame.entities.len(), 1);
//! ```

pub mod logging;
pub mod stage;

pub use stage::{ActivateConfig, Callback, EffectHandle, EntityFrame, RenderFrame, Stage};

/// Prelude module - import everything commonly needed
pub mod prelude {
    pub use crate::stage::{ActivateConfig, EffectHandle, EntityFrame, RenderFrame, Stage};

    pub use glide_animation::{
        CoordinatorEvent, EffectEvent, EffectState, EntityKind, MotionConfig, ParallaxTransform,
        TriggerMode, TriggerState,
    };
    pub use glide_core::{
        Clock, InputEvent, ManualClock, OrientationEvent, Point, PointerEvent, SystemClock,
        TouchEvent, Vec2, Viewport,
    };
}
