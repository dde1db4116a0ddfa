//! Input event types for pointer, touch and device orientation

use crate::geometry::Viewport;

/// Raw input events forwarded by the host environment
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// Mouse/pen event
    Pointer(PointerEvent),
    /// Touch event (mobile/touchscreen)
    Touch(TouchEvent),
    /// Device orientation sample
    Orientation(OrientationEvent),
    /// Viewport was resized (or its pointer capabilities changed)
    Resized(Viewport),
}

// ============================================================================
// Pointer Events
// ============================================================================

/// Pointer events
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// Pointer moved to position
    Moved {
        /// X position in viewport coordinates
        x: f32,
        /// Y position in viewport coordinates
        y: f32,
    },
    /// Pointer entered a trigger region (hover)
    Entered,
    /// Pointer left the viewport
    Left,
    /// Primary button click/tap on a trigger region
    Pressed,
}

// ============================================================================
// Touch Events
// ============================================================================

/// Touch events
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TouchEvent {
    /// Finger touched the screen
    Started {
        x: f32,
        y: f32,
    },
    /// Finger moved
    Moved {
        x: f32,
        y: f32,
    },
    /// Finger lifted
    Ended,
    /// Touch sequence was interrupted by the system
    Cancelled,
}

impl TouchEvent {
    /// Position carried by this event, if any
    pub fn position(&self) -> Option<(f32, f32)> {
        match *self {
            TouchEvent::Started { x, y } | TouchEvent::Moved { x, y } => Some((x, y)),
            TouchEvent::Ended | TouchEvent::Cancelled => None,
        }
    }
}

// ============================================================================
// Orientation Events
// ============================================================================

/// Device orientation sample in degrees
///
/// `beta` is front-to-back tilt (-180..180), `gamma` is left-to-right tilt
/// (-90..90), matching the DeviceOrientationEvent convention.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrientationEvent {
    pub beta: f32,
    pub gamma: f32,
}

impl OrientationEvent {
    pub fn new(beta: f32, gamma: f32) -> Self {
        Self { beta, gamma }
    }
}

/// Which continuous input drives pointer-following effects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// Mouse / pen position (desktop)
    Pointer,
    /// Device orientation (phones, tablets)
    Orientation,
}

impl InputSource {
    /// Pick the source for a viewport
    ///
    /// Coarse pointers and viewports narrower than `mobile_breakpoint` use
    /// device orientation; everything else follows the pointer.
    pub fn for_viewport(viewport: &Viewport, mobile_breakpoint: f32) -> Self {
        if viewport.coarse_pointer || viewport.width < mobile_breakpoint {
            InputSource::Orientation
        } else {
            InputSource::Pointer
        }
    }
}
