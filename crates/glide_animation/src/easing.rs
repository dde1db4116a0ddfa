//! Easing functions for animations
//!
//! Every easing maps normalized progress in `[0, 1]` to eased progress with
//! `f(0) = 0` and `f(1) = 1`. Inputs outside the range are clamped first.

/// Easing function type
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Easing {
    #[default]
    Linear,
    /// CSS `ease-in`, `cubic-bezier(0.42, 0, 1, 1)`
    EaseIn,
    /// CSS `ease-out`, `cubic-bezier(0, 0, 0.58, 1)`
    EaseOut,
    /// CSS `ease-in-out`, `cubic-bezier(0.42, 0, 0.58, 1)`
    EaseInOut,
    /// `1 - (1 - t)^2`
    EaseOutQuad,
    /// `1 - (1 - t)^3`, used for docking deceleration
    EaseOutCubic,
    /// Arbitrary CSS cubic-bezier curve with control points (x1, y1, x2, y2)
    CubicBezier(f32, f32, f32, f32),
}

impl Easing {
    /// Soft ease-out used by falling cargo and melting text
    pub const SETTLE: Easing = Easing::CubicBezier(0.25, 0.46, 0.45, 0.94);

    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match *self {
            Easing::Linear => t,
            Easing::EaseIn => cubic_bezier(t, 0.42, 0.0, 1.0, 1.0),
            Easing::EaseOut => cubic_bezier(t, 0.0, 0.0, 0.58, 1.0),
            Easing::EaseInOut => cubic_bezier(t, 0.42, 0.0, 0.58, 1.0),
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseOutCubic => ease_out_cubic(t),
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier(t, x1, y1, x2, y2),
        }
    }
}

/// Cubic ease-out: fast start, decelerating into the destination
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

/// Evaluate a CSS cubic-bezier timing curve at `x`
///
/// Solves `bezier_x(s) = x` for the curve parameter `s` with a few Newton
/// steps, falling back to bisection when the slope flattens, then returns
/// `bezier_y(s)`. Works in f64 so repeated per-frame evaluation stays smooth.
fn cubic_bezier(x: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let target = x as f64;
    let (x1, y1, x2, y2) = (x1 as f64, y1 as f64, x2 as f64, y2 as f64);

    let mut s = target;
    let mut solved = false;
    for _ in 0..8 {
        let err = axis(s, x1, x2) - target;
        if err.abs() < 1e-7 {
            solved = true;
            break;
        }
        let slope = axis_slope(s, x1, x2);
        if slope.abs() < 1e-6 {
            break;
        }
        s = (s - err / slope).clamp(0.0, 1.0);
    }

    if !solved {
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        s = target;
        for _ in 0..32 {
            let value = axis(s, x1, x2);
            if (value - target).abs() < 1e-7 {
                break;
            }
            if value < target {
                lo = s;
            } else {
                hi = s;
            }
            s = 0.5 * (lo + hi);
        }
    }

    axis(s, y1, y2) as f32
}

/// One axis of a cubic bezier anchored at 0 and 1: `3(1-s)²s·p1 + 3(1-s)s²·p2 + s³`
#[inline]
fn axis(s: f64, p1: f64, p2: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

#[inline]
fn axis_slope(s: f64, p1: f64, p2: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}
