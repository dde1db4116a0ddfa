//! Glide Core
//!
//! Foundational types shared by the glide motion engine:
//!
//! - **Geometry**: viewport-space points, offsets and viewport metrics
//! - **Clocks**: injectable millisecond clocks (system and manual)
//! - **Input**: pointer, touch and device-orientation events
//! - **Errors**: configuration error taxonomy
//!
//! # Example
//!
//! ```rust
//! use glide_core::{Point, Viewport};
//!
//! let viewport = Viewport::new(0.0, 0.0).sanitized();
//! assert!(!viewport.is_degenerate());
//!
//! let mid = Point::lerp(Point::ZERO, Point::new(100.0, 40.0), 0.5);
//! assert_eq!(mid, Point::new(50.0, 20.0));
//! ```

pub mod clock;
pub mod error;
pub mod geometry;
pub mod input;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{GlideError, Result};
pub use geometry::{Point, Vec2, Viewport, MIN_VIEWPORT_EDGE};
pub use input::{InputEvent, InputSource, OrientationEvent, PointerEvent, TouchEvent};
