//! Spring physics smoothing
//!
//! RK4-integrated damped springs. The parallax tracker runs one spring per
//! axis and retargets it whenever a new input sample arrives; the spring keeps
//! its velocity across retargets so motion never jumps.

/// Configuration for a spring
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl SpringConfig {
    /// A critically damped spring: fastest settling without overshoot
    pub fn critical(stiffness: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping: 2.0 * (stiffness * mass).sqrt(),
            mass,
        }
    }
}

/// Largest integration step; longer frames are split into substeps
const MAX_STEP_SECS: f32 = 1.0 / 120.0;

/// Frames longer than this are treated as a stall and truncated
const MAX_FRAME_SECS: f32 = 0.25;

/// A spring-based smoother for one scalar
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
    rest_delta: f32,
    rest_speed: f32,
}

impl Spring {
    pub fn new(config: SpringConfig, initial: f32) -> Self {
        Self {
            config,
            value: initial,
            velocity: 0.0,
            target: initial,
            rest_delta: 0.5,
            rest_speed: 5.0,
        }
    }

    /// Builder: settle tolerances in value units and units per second
    ///
    /// The defaults suit pixel-valued springs; normalized inputs need much
    /// tighter bounds.
    pub fn with_rest_tolerance(mut self, delta: f32, speed: f32) -> Self {
        self.rest_delta = delta;
        self.rest_speed = speed;
        self
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set_target(&mut self, target: f32) {
        if target.is_finite() {
            self.target = target;
        }
    }

    /// Check if the spring has settled (within tolerance of target with minimal velocity)
    pub fn is_settled(&self) -> bool {
        (self.value - self.target).abs() < self.rest_delta && self.velocity.abs() < self.rest_speed
    }

    /// Advance by `dt` seconds, substepping long frames
    pub fn step(&mut self, dt: f32) {
        if !(dt > 0.0) {
            return;
        }
        let mut remaining = dt.min(MAX_FRAME_SECS);
        while remaining > 0.0 {
            if self.is_settled() {
                self.value = self.target;
                self.velocity = 0.0;
                return;
            }
            let h = remaining.min(MAX_STEP_SECS);
            self.integrate(h);
            remaining -= h;
        }
    }

    /// One RK4 step
    fn integrate(&mut self, dt: f32) {
        let k1_v = self.acceleration(self.value, self.velocity);
        let k1_x = self.velocity;

        let k2_v = self.acceleration(
            self.value + k1_x * dt * 0.5,
            self.velocity + k1_v * dt * 0.5,
        );
        let k2_x = self.velocity + k1_v * dt * 0.5;

        let k3_v = self.acceleration(
            self.value + k2_x * dt * 0.5,
            self.velocity + k2_v * dt * 0.5,
        );
        let k3_x = self.velocity + k2_v * dt * 0.5;

        let k4_v = self.acceleration(self.value + k3_x * dt, self.velocity + k3_v * dt);
        let k4_x = self.velocity + k3_v * dt;

        self.velocity += (k1_v + 2.0 * k2_v + 2.0 * k3_v + k4_v) * dt / 6.0;
        self.value += (k1_x + 2.0 * k2_x + 2.0 * k3_x + k4_x) * dt / 6.0;
    }

    fn acceleration(&self, x: f32, v: f32) -> f32 {
        let spring_force = -self.config.stiffness * (x - self.target);
        let damping_force = -self.config.damping * v;
        (spring_force + damping_force) / self.config.mass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parallax() -> SpringConfig {
        SpringConfig::critical(150.0, 1.0)
    }

    fn underdamped() -> SpringConfig {
        SpringConfig {
            stiffness: 180.0,
            damping: 12.0,
            mass: 1.0,
        }
    }

    #[test]
    fn test_spring_settles_to_target() {
        let mut spring = Spring::new(parallax(), 0.0);
        spring.set_target(100.0);

        // Two seconds at 60fps
        for _ in 0..120 {
            spring.step(1.0 / 60.0);
        }

        assert!(spring.is_settled());
        assert!((spring.value() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_spring_inherits_velocity() {
        let mut spring = Spring::new(underdamped(), 0.0);
        spring.set_target(100.0);

        for _ in 0..10 {
            spring.step(1.0 / 60.0);
        }

        let velocity = spring.velocity;
        assert!(velocity > 0.0);

        // Retargeting mid-flight keeps momentum
        spring.set_target(50.0);
        assert_eq!(spring.velocity, velocity);
    }

    #[test]
    fn test_critical_damping() {
        let config = parallax();
        assert!((config.damping - 2.0 * 150.0f32.sqrt()).abs() < 1e-4);
        assert_eq!(config.mass, 1.0);
    }

    #[test]
    fn test_critically_damped_does_not_overshoot() {
        let mut spring = Spring::new(parallax(), 0.0).with_rest_tolerance(1e-5, 1e-4);
        spring.set_target(-0.5);

        for _ in 0..600 {
            spring.step(1.0 / 60.0);
            assert!(spring.value() >= -0.5 - 1e-4, "overshot: {}", spring.value());
            assert!(spring.value() <= 1e-6);
        }
        assert!((spring.value() + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_large_frame_is_stable() {
        let mut spring = Spring::new(underdamped(), 0.0);
        spring.set_target(1000.0);

        for _ in 0..100 {
            spring.step(0.5);
            assert!(spring.value().is_finite());
            assert!(spring.value() < 2000.0);
            assert!(spring.value() > -500.0);
        }
    }

    #[test]
    fn test_ignores_bad_input() {
        let mut spring = Spring::new(parallax(), 3.0);
        spring.set_target(f32::NAN);
        assert_eq!(spring.target, 3.0);

        spring.step(-1.0);
        spring.step(f32::NAN);
        assert_eq!(spring.value(), 3.0);
    }
}
