//! Geometry primitives and viewport metrics
//!
//! All coordinates are viewport pixels with the origin at the top-left corner,
//! x growing to the right and y growing downwards.

use serde::{Deserialize, Serialize};

/// Smallest viewport edge the engine will do math with
pub const MIN_VIEWPORT_EDGE: f32 = 1.0;

/// A position in viewport coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Translate by a fixed offset
    pub fn offset(self, delta: Vec2) -> Self {
        Self {
            x: self.x + delta.x,
            y: self.y + delta.y,
        }
    }

    /// Linear interpolation between two points (`t` is not clamped)
    pub fn lerp(a: Point, b: Point, t: f32) -> Self {
        Self {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A displacement in viewport pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scale(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

/// Viewport metrics injected at activation time
///
/// Curves never query the host for its size; everything they need is captured
/// here when an effect is armed. `coarse_pointer` mirrors a
/// `(pointer: coarse)` media query on the host.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub coarse_pointer: bool,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            coarse_pointer: false,
        }
    }

    /// Builder: mark the viewport as driven by a coarse (touch) pointer
    pub fn with_coarse_pointer(mut self, coarse: bool) -> Self {
        self.coarse_pointer = coarse;
        self
    }

    /// True when either edge is zero, negative or not a number
    pub fn is_degenerate(&self) -> bool {
        !(self.width >= MIN_VIEWPORT_EDGE && self.height >= MIN_VIEWPORT_EDGE)
    }

    /// Copy of this viewport with both edges clamped to [`MIN_VIEWPORT_EDGE`]
    ///
    /// NaN edges collapse to the minimum as well.
    pub fn sanitized(&self) -> Self {
        if !self.is_degenerate() {
            return *self;
        }
        tracing::warn!(
            width = self.width,
            height = self.height,
            "degenerate viewport metrics, clamping to minimum"
        );
        Self {
            width: clamp_edge(self.width),
            height: clamp_edge(self.height),
            coarse_pointer: self.coarse_pointer,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

fn clamp_edge(edge: f32) -> f32 {
    if edge.is_nan() {
        MIN_VIEWPORT_EDGE
    } else {
        edge.max(MIN_VIEWPORT_EDGE)
    }
}
