//! Motion curves
//!
//! A curve turns elapsed time into a position for one entity: a base
//! trajectory, an easing over it, and an oscillation layered on top. Curves are
//! built once at activation from the viewport captured then and never consult
//! the host again, so sampling is a pure function of its arguments.

use crate::config::{OscillationConfig, SkierConfig, VehicleConfig};
use crate::easing::{ease_out_cubic, Easing};
use crate::keyframe::KeyframeTrack;
use glide_core::{Point, Viewport};
use std::f32::consts::PI;

/// Shortest travel duration any curve accepts
pub const MIN_DURATION_MS: f64 = 1.0;

/// Which effect an entity belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Sailing vehicle that docks and unloads
    Vehicle,
    /// Skier crossing the screen with a powder trail
    Skier,
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Vehicle => "vehicle",
            EntityKind::Skier => "skier",
        }
    }
}

/// Normalized travel progress: `min(elapsed / duration, 1)`
///
/// Never NaN and never negative, so downstream math can trust it.
///
/// ```
/// use glide_animation::curve::progress;
///
/// assert_eq!(progress(1500.0, 3000.0), 0.5);
/// assert_eq!(progress(9000.0, 3000.0), 1.0);
/// assert_eq!(progress(10.0, 0.0), 1.0);
/// ```
pub fn progress(elapsed_ms: f64, duration_ms: f64) -> f32 {
    if !(elapsed_ms > 0.0) {
        return 0.0;
    }
    if !(duration_ms > 0.0) {
        return 1.0;
    }
    (elapsed_ms / duration_ms).min(1.0) as f32
}

/// One evaluation of a curve
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveSample {
    /// Final position including oscillation
    pub position: Point,
    /// Oscillation component already included in `position`
    pub bob: f32,
    /// Rotation in degrees
    pub rotation_deg: f32,
    /// Linear progress in `[0, 1]`
    pub progress: f32,
    /// Progress after easing
    pub eased: f32,
}

#[derive(Clone, Debug, PartialEq)]
enum Shape {
    /// Cubic ease-out glide with a bob that calms near the end
    Glide {
        travel: OscillationConfig,
        settled: OscillationConfig,
        settle_progress: f32,
        rock: KeyframeTrack,
        rock_period_ms: f64,
    },
    /// Linear descent with a sinusoidal lateral weave
    Weave { amplitude: f32, half_turns: f32 },
}

/// A time-parameterized path between two points
#[derive(Clone, Debug, PartialEq)]
pub struct MotionCurve {
    kind: EntityKind,
    origin: Point,
    dest: Point,
    duration_ms: f64,
    shape: Shape,
}

impl MotionCurve {
    /// Vehicle path from beyond the right edge to `dock`
    pub fn vehicle(config: &VehicleConfig, viewport: Viewport, dock: Point) -> Self {
        let viewport = viewport.sanitized();
        Self {
            kind: EntityKind::Vehicle,
            origin: Point::new(viewport.width + config.offscreen_margin, dock.y),
            dest: dock,
            duration_ms: config.travel_ms.max(MIN_DURATION_MS),
            shape: Shape::Glide {
                travel: config.bob_travel,
                settled: config.bob_docked,
                settle_progress: config.settle_progress,
                rock: KeyframeTrack::evenly(
                    &[0.0, -config.rock_degrees, 0.0, config.rock_degrees, 0.0],
                    Easing::EaseInOut,
                ),
                rock_period_ms: config.rock_period_ms,
            },
        }
    }

    /// Skier path from above the top edge, diagonally off the bottom left
    pub fn skier(config: &SkierConfig, viewport: Viewport) -> Self {
        let viewport = viewport.sanitized();
        let distance = viewport.width + config.margin;
        let origin = Point::new(viewport.width * config.start_x_fraction, config.start_y);
        let dest = Point::new(
            origin.x - distance,
            origin.y + viewport.height + config.margin,
        );
        Self {
            kind: EntityKind::Skier,
            origin,
            dest,
            duration_ms: skier_duration(config, viewport),
            shape: Shape::Weave {
                amplitude: config.weave_amplitude,
                half_turns: config.weave_half_turns,
            },
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn dest(&self) -> Point {
        self.dest
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Progress of this curve after `elapsed_ms`
    pub fn progress_at(&self, elapsed_ms: f64) -> f32 {
        progress(elapsed_ms, self.duration_ms)
    }

    /// Sample at `elapsed_ms` since activation
    ///
    /// The oscillation phase is the elapsed time itself.
    pub fn sample_at(&self, elapsed_ms: f64) -> CurveSample {
        self.sample(self.progress_at(elapsed_ms), elapsed_ms)
    }

    /// Position for a progress value and oscillation phase
    pub fn sample(&self, progress: f32, phase_ms: f64) -> CurveSample {
        let p = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        let phase_ms = if phase_ms.is_finite() { phase_ms } else { 0.0 };

        match &self.shape {
            Shape::Glide {
                travel,
                settled,
                settle_progress,
                rock,
                rock_period_ms,
            } => {
                let eased = ease_out_cubic(p);
                let base = Point::lerp(self.origin, self.dest, eased);
                let bob = if p < *settle_progress {
                    travel.offset(phase_ms)
                } else {
                    settled.offset(phase_ms)
                };
                let rotation_deg = if p < 1.0 {
                    rock.sample_looped(phase_ms, *rock_period_ms)
                } else {
                    0.0
                };
                CurveSample {
                    position: Point::new(base.x, base.y + bob),
                    bob,
                    rotation_deg,
                    progress: p,
                    eased,
                }
            }
            Shape::Weave {
                amplitude,
                half_turns,
            } => {
                let base = Point::lerp(self.origin, self.dest, p);
                let weave = (p * half_turns * PI).sin() * amplitude;
                CurveSample {
                    position: Point::new(base.x + weave, base.y),
                    bob: weave,
                    rotation_deg: 0.0,
                    progress: p,
                    eased: p,
                }
            }
        }
    }
}

/// `max((viewport.width + margin) / speed, min_duration)`
pub fn skier_duration(config: &SkierConfig, viewport: Viewport) -> f64 {
    let distance = (viewport.sanitized().width + config.margin) as f64;
    let speed = config.speed_px_per_ms as f64;
    let travel = if speed > 0.0 { distance / speed } else { 0.0 };
    travel.max(config.min_duration_ms).max(MIN_DURATION_MS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vehicle_curve() -> MotionCurve {
        MotionCurve::vehicle(
            &VehicleConfig::default(),
            Viewport::new(1280.0, 800.0),
            Point::new(0.0, 60.0),
        )
    }

    #[test]
    fn test_progress_guards() {
        assert_eq!(progress(-5.0, 3000.0), 0.0);
        assert_eq!(progress(f64::NAN, 3000.0), 0.0);
        assert_eq!(progress(100.0, f64::NAN), 1.0);
        assert_eq!(progress(3000.0, 3000.0), 1.0);
    }

    #[test]
    fn test_vehicle_endpoints() {
        let curve = vehicle_curve();
        assert_eq!(curve.origin(), Point::new(1380.0, 60.0));
        assert_eq!(curve.duration_ms(), 3000.0);

        let start = curve.sample(0.0, 0.0);
        assert_eq!(start.position, Point::new(1380.0, 60.0));

        let end = curve.sample_at(3000.0);
        assert_eq!(end.progress, 1.0);
        assert_eq!(end.position.x, 0.0);
        assert_eq!(end.rotation_deg, 0.0);
    }

    #[test]
    fn test_vehicle_eased_halfway() {
        let curve = vehicle_curve();
        let half = curve.sample(0.5, 0.0);
        assert!((half.eased - 0.875).abs() < 1e-6);
        assert!((half.position.x - 1380.0 * 0.125).abs() < 1e-3);
    }

    #[test]
    fn test_vehicle_bob_calms_after_settle() {
        let curve = vehicle_curve();
        let quarter_travel = std::f64::consts::FRAC_PI_2 / 0.005;
        let traveling = curve.sample(0.5, quarter_travel);
        assert!((traveling.bob - 8.0).abs() < 1e-3);

        let quarter_settled = std::f64::consts::FRAC_PI_2 / 0.002;
        let settled = curve.sample(0.95, quarter_settled);
        assert!((settled.bob - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_vehicle_rocks_while_traveling() {
        let curve = vehicle_curve();
        // A quarter of the 2s cycle lands on the -2 degree stop
        let sample = curve.sample(0.3, 500.0);
        assert!((sample.rotation_deg + 2.0).abs() < 1e-4);
        assert_eq!(curve.sample(1.0, 500.0).rotation_deg, 0.0);
    }

    #[test]
    fn test_skier_path() {
        let config = SkierConfig::default();
        let curve = MotionCurve::skier(&config, Viewport::new(1000.0, 800.0));
        assert_eq!(curve.duration_ms(), 2500.0);
        assert_eq!(curve.origin(), Point::new(800.0, -50.0));
        assert_eq!(curve.dest(), Point::new(-300.0, 850.0));

        let start = curve.sample(0.0, 0.0);
        assert_eq!(start.position, Point::new(800.0, -50.0));

        // sin(3π/6) = 1 at one sixth of the way
        let sixth = curve.sample(1.0 / 6.0, 0.0);
        let base_x = 800.0 - 1100.0 / 6.0;
        assert!((sixth.position.x - (base_x + 120.0)).abs() < 1e-2);
    }

    #[test]
    fn test_skier_duration_scales_with_width() {
        let config = SkierConfig::default();
        assert_eq!(skier_duration(&config, Viewport::new(400.0, 800.0)), 2500.0);
        assert_eq!(skier_duration(&config, Viewport::new(1900.0, 800.0)), 4000.0);
    }

    #[test]
    fn test_degenerate_viewport_is_finite() {
        let curve = MotionCurve::skier(&SkierConfig::default(), Viewport::new(0.0, f32::NAN));
        for step in 0..=10 {
            let sample = curve.sample(step as f32 / 10.0, step as f64 * 100.0);
            assert!(sample.position.is_finite());
        }
        let sample = curve.sample(f32::NAN, f64::INFINITY);
        assert!(sample.position.is_finite());
    }

    proptest! {
        #[test]
        fn prop_sampling_is_deterministic(p in 0.0f32..=1.0, phase in 0.0f64..20_000.0) {
            let curve = vehicle_curve();
            prop_assert_eq!(curve.sample(p, phase), curve.sample(p, phase));

            let skier = MotionCurve::skier(&SkierConfig::default(), Viewport::new(1280.0, 800.0));
            prop_assert_eq!(skier.sample(p, phase), skier.sample(p, phase));
        }

        #[test]
        fn prop_progress_never_regresses(a in 0.0f64..10_000.0, b in 0.0f64..10_000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let p_lo = progress(lo, 3000.0);
            let p_hi = progress(hi, 3000.0);
            prop_assert!(p_lo <= p_hi);
            prop_assert!((0.0..=1.0).contains(&p_hi));
        }
    }
}
