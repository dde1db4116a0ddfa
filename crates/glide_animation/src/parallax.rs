//! Pointer and device-orientation parallax
//!
//! Raw input is normalized to an offset in `[-0.5, 0.5]` per axis, smoothed
//! by one spring per axis, and mapped linearly to a small rotation and
//! translation. Desktop viewports follow the pointer; coarse-pointer or narrow
//! viewports follow device tilt. The choice is re-made on every resize.

use crate::config::ParallaxConfig;
use crate::spring::{Spring, SpringConfig};
use glide_core::{InputEvent, InputSource, OrientationEvent, PointerEvent, TouchEvent, Vec2, Viewport};

/// Largest normalized offset on either axis
pub const MAX_OFFSET: f32 = 0.5;

/// Raw and smoothed input offsets
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerState {
    /// Latest normalized input, each axis in `[-0.5, 0.5]`
    pub raw: Vec2,
    /// Spring-smoothed offset that trails `raw`
    pub smoothed: Vec2,
}

/// Transform applied to the tracked element
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ParallaxTransform {
    /// Tilt around the horizontal axis, in degrees
    pub rotate_x: f32,
    /// Tilt around the vertical axis, in degrees
    pub rotate_y: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

/// Map `value` from `[in_min, in_max]` to `[out_min, out_max]`, clamped
pub fn map_range(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let span = in_max - in_min;
    if span.abs() <= f32::EPSILON || value.is_nan() {
        return out_min + (out_max - out_min) * 0.5;
    }
    let t = ((value - in_min) / span).clamp(0.0, 1.0);
    out_min + (out_max - out_min) * t
}

/// Smooths continuous input into a [`ParallaxTransform`]
#[derive(Clone, Debug)]
pub struct ParallaxTracker {
    config: ParallaxConfig,
    viewport: Viewport,
    source: InputSource,
    raw: Vec2,
    x: Spring,
    y: Spring,
}

impl ParallaxTracker {
    pub fn new(config: &ParallaxConfig, viewport: Viewport) -> Self {
        let viewport = viewport.sanitized();
        let spring = SpringConfig {
            stiffness: config.stiffness,
            mass: config.mass,
            damping: config
                .damping
                .unwrap_or_else(|| SpringConfig::critical(config.stiffness, config.mass).damping),
        };
        let axis =
            Spring::new(spring, 0.0).with_rest_tolerance(config.rest_delta, config.rest_delta * 10.0);
        Self {
            config: config.clone(),
            viewport,
            source: InputSource::for_viewport(&viewport, config.mobile_breakpoint),
            raw: Vec2::ZERO,
            x: axis,
            y: axis,
        }
    }

    pub fn source(&self) -> InputSource {
        self.source
    }

    pub fn state(&self) -> PointerState {
        PointerState {
            raw: self.raw,
            smoothed: Vec2::new(self.x.value(), self.y.value()),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.x.is_settled() && self.y.is_settled()
    }

    /// Feed one input event; returns true if it changed the raw offset or source
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        match *event {
            InputEvent::Pointer(PointerEvent::Moved { x, y }) => self.point_at(x, y),
            InputEvent::Pointer(PointerEvent::Left) => self.set_raw(Vec2::ZERO),
            InputEvent::Pointer(PointerEvent::Entered | PointerEvent::Pressed) => false,
            InputEvent::Touch(touch) => match touch.position() {
                Some((x, y)) => self.point_at(x, y),
                None => self.set_raw(Vec2::ZERO),
            },
            InputEvent::Orientation(reading) => self.tilt(reading),
            InputEvent::Resized(viewport) => self.set_viewport(viewport),
        }
    }

    /// Replace the viewport and re-pick the input source
    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        self.viewport = viewport.sanitized();
        let source = InputSource::for_viewport(&self.viewport, self.config.mobile_breakpoint);
        if source == self.source {
            return false;
        }
        tracing::debug!(from = ?self.source, to = ?source, "parallax input source changed");
        self.source = source;
        self.set_raw(Vec2::ZERO);
        true
    }

    /// Advance the smoothing springs by `dt` seconds; returns true while moving
    pub fn update(&mut self, dt: f32) -> bool {
        self.x.step(dt);
        self.y.step(dt);
        !self.is_settled()
    }

    /// Current transform from the smoothed offset
    pub fn transform(&self) -> ParallaxTransform {
        let rot = self.config.max_rotate_deg;
        let shift = self.config.max_translate_px;
        let (sx, sy) = (self.x.value(), self.y.value());
        ParallaxTransform {
            // Pointer below centre tilts the top edge away
            rotate_x: map_range(sy, -MAX_OFFSET, MAX_OFFSET, rot, -rot),
            rotate_y: map_range(sx, -MAX_OFFSET, MAX_OFFSET, -rot, rot),
            translate_x: map_range(sx, -MAX_OFFSET, MAX_OFFSET, -shift, shift),
            translate_y: map_range(sy, -MAX_OFFSET, MAX_OFFSET, -shift, shift),
        }
    }

    fn point_at(&mut self, x: f32, y: f32) -> bool {
        let raw = Vec2::new(
            x / self.viewport.width - MAX_OFFSET,
            y / self.viewport.height - MAX_OFFSET,
        );
        self.set_raw(raw)
    }

    fn tilt(&mut self, reading: OrientationEvent) -> bool {
        if self.source != InputSource::Orientation {
            return false;
        }
        let scale = self.config.orientation_scale_deg;
        self.set_raw(Vec2::new(reading.gamma / scale, reading.beta / scale))
    }

    fn set_raw(&mut self, raw: Vec2) -> bool {
        let raw = Vec2::new(clamp_offset(raw.x), clamp_offset(raw.y));
        if raw == self.raw {
            return false;
        }
        self.raw = raw;
        self.x.set_target(raw.x);
        self.y.set_target(raw.y);
        true
    }
}

fn clamp_offset(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-MAX_OFFSET, MAX_OFFSET)
    }
}
