//! Engine configuration
//!
//! All tunable constants live in one TOML document. Every section and
//! top-level field is optional; anything left out falls back to the values
//! the effects were designed around. Particle tables (`[vehicle.wake]`,
//! `[skier.trail]`) are replaced as a whole when present.
//!
//! ```toml
//! [vehicle]
//! travel_ms = 3000.0
//! melt_delay_ms = 800.0
//!
//! [skier]
//! min_duration_ms = 2500.0
//!
//! [parallax]
//! max_rotate_deg = 12.0
//!
//! [coordinator]
//! dissolve_cooldown_ms = 10000.0
//! ```

use glide_core::{GlideError, Point, Result, Vec2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// =============================================================================
// Top level
// =============================================================================

/// Complete engine configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct MotionConfig {
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub skier: SkierConfig,
    #[serde(default)]
    pub parallax: ParallaxConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

impl MotionConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: MotionConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading motion config");
        Self::from_toml_str(&source)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every value is in a range the engine can work with
    pub fn validate(&self) -> Result<()> {
        self.vehicle.validate()?;
        self.skier.validate()?;
        self.parallax.validate()?;
        self.coordinator.validate()?;
        Ok(())
    }
}

// =============================================================================
// Shared pieces
// =============================================================================

/// Sinusoidal bob: `sin(phase_ms * frequency) * amplitude`
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct OscillationConfig {
    /// Peak displacement in pixels
    pub amplitude: f32,
    /// Angular frequency in radians per millisecond
    pub frequency: f32,
}

impl OscillationConfig {
    pub const fn new(amplitude: f32, frequency: f32) -> Self {
        Self {
            amplitude,
            frequency,
        }
    }

    /// Displacement at an oscillation phase
    pub fn offset(&self, phase_ms: f64) -> f32 {
        ((phase_ms * self.frequency as f64).sin() as f32) * self.amplitude
    }
}

/// Inclusive range a per-particle drift component is drawn from
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct DriftRange {
    pub min: f32,
    pub max: f32,
}

impl DriftRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn fixed(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Map a unit sample in `[0, 1)` into the range
    pub fn pick(&self, unit: f32) -> f32 {
        self.min + (self.max - self.min) * unit
    }
}

/// Particle spawning and per-particle animation
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ParticleConfig {
    /// Spawn a batch when `elapsed % cadence_ms < gate_ms`; `0` spawns every tick
    #[serde(default)]
    pub cadence_ms: f64,
    /// Width of the spawn window inside each cadence period (one frame)
    #[serde(default = "default_gate_ms")]
    pub gate_ms: f64,
    /// Spawning stops once travel progress reaches this value
    #[serde(default = "default_cutoff")]
    pub cutoff_progress: f32,
    /// Most recent particles kept after every batch
    pub cap: usize,
    /// One particle per offset, relative to the entity position
    pub offsets: Vec<Vec2>,
    /// Duration of each particle's fade/drift
    pub lifetime_ms: f64,
    pub start_opacity: f32,
    pub start_scale: f32,
    pub end_scale: f32,
    /// Final displacement relative to the spawn point
    pub drift_x: DriftRange,
    pub drift_y: DriftRange,
}

fn default_gate_ms() -> f64 {
    16.0
}

fn default_cutoff() -> f32 {
    1.0
}

impl ParticleConfig {
    /// Wake behind the vehicle
    pub fn wake() -> Self {
        Self {
            cadence_ms: 80.0,
            gate_ms: 16.0,
            cutoff_progress: 0.95,
            cap: 20,
            offsets: vec![Vec2::new(60.0, 25.0), Vec2::new(70.0, 30.0)],
            lifetime_ms: 1200.0,
            start_opacity: 0.6,
            start_scale: 0.5,
            end_scale: 2.0,
            drift_x: DriftRange::fixed(40.0),
            drift_y: DriftRange::new(-5.0, 5.0),
        }
    }

    /// Powder trail behind the skier
    pub fn trail() -> Self {
        Self {
            cadence_ms: 80.0,
            gate_ms: 16.0,
            cutoff_progress: 0.95,
            cap: 40,
            offsets: vec![
                Vec2::new(20.0, 20.0),
                Vec2::new(30.0, 15.0),
                Vec2::new(10.0, 25.0),
            ],
            lifetime_ms: 800.0,
            start_opacity: 0.7,
            start_scale: 1.0,
            end_scale: 2.5,
            drift_x: DriftRange::new(-30.0, 30.0),
            drift_y: DriftRange::new(-40.0, 0.0),
        }
    }

    fn validate(&self, section: &str) -> Result<()> {
        if self.cap == 0 {
            return Err(GlideError::invalid(format!("{section}.cap must be at least 1")));
        }
        if self.offsets.is_empty() {
            return Err(GlideError::invalid(format!(
                "{section}.offsets must contain at least one offset"
            )));
        }
        if !(self.cadence_ms >= 0.0) || !(self.gate_ms > 0.0) {
            return Err(GlideError::invalid(format!(
                "{section}: cadence_ms must be >= 0 and gate_ms > 0"
            )));
        }
        if !(self.cutoff_progress > 0.0 && self.cutoff_progress <= 1.0) {
            return Err(GlideError::invalid(format!(
                "{section}.cutoff_progress must be in (0, 1]"
            )));
        }
        if !(self.lifetime_ms > 0.0) {
            return Err(GlideError::invalid(format!(
                "{section}.lifetime_ms must be positive"
            )));
        }
        Ok(())
    }
}

/// One falling container dropped when the vehicle docks
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ContainerConfig {
    /// Offset from the docked vehicle position
    pub offset: Vec2,
    /// Delay after docking before the fall starts
    pub delay_ms: f64,
}

// =============================================================================
// Sections
// =============================================================================

/// Sailing/docking vehicle
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Travel time from off-screen to the dock
    pub travel_ms: f64,
    /// How far past the right edge the vehicle starts
    pub offscreen_margin: f32,
    /// Dock point used when the caller supplies none
    pub dock: Point,
    /// Progress at which the bob switches to its settled form
    pub settle_progress: f32,
    pub bob_travel: OscillationConfig,
    pub bob_docked: OscillationConfig,
    /// Peak rocking angle while traveling, in degrees
    pub rock_degrees: f32,
    pub rock_period_ms: f64,
    /// Delay from docking to the melt signal
    pub melt_delay_ms: f64,
    /// Delay from docking to completion
    pub complete_delay_ms: f64,
    pub wake: ParticleConfig,
    pub containers: Vec<ContainerConfig>,
    /// Fall duration of each container
    pub container_fall_ms: f64,
    /// Containers fall to `viewport.height + container_overshoot`
    pub container_overshoot: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            travel_ms: 3000.0,
            offscreen_margin: 100.0,
            dock: Point::new(0.0, 60.0),
            settle_progress: 0.9,
            bob_travel: OscillationConfig::new(8.0, 0.005),
            bob_docked: OscillationConfig::new(2.0, 0.002),
            rock_degrees: 2.0,
            rock_period_ms: 2000.0,
            melt_delay_ms: 800.0,
            complete_delay_ms: 3500.0,
            wake: ParticleConfig::wake(),
            containers: vec![
                ContainerConfig {
                    offset: Vec2::new(10.0, 10.0),
                    delay_ms: 200.0,
                },
                ContainerConfig {
                    offset: Vec2::new(25.0, 5.0),
                    delay_ms: 400.0,
                },
                ContainerConfig {
                    offset: Vec2::new(40.0, 8.0),
                    delay_ms: 600.0,
                },
            ],
            container_fall_ms: 2000.0,
            container_overshoot: 50.0,
        }
    }
}

impl VehicleConfig {
    fn validate(&self) -> Result<()> {
        if !(self.travel_ms > 0.0) {
            return Err(GlideError::invalid("vehicle.travel_ms must be positive"));
        }
        if !(self.settle_progress > 0.0 && self.settle_progress <= 1.0) {
            return Err(GlideError::invalid(
                "vehicle.settle_progress must be in (0, 1]",
            ));
        }
        if !(self.melt_delay_ms >= 0.0) || !(self.complete_delay_ms >= 0.0) {
            return Err(GlideError::invalid(
                "vehicle delays must not be negative",
            ));
        }
        if !(self.rock_period_ms > 0.0) || !(self.container_fall_ms > 0.0) {
            return Err(GlideError::invalid(
                "vehicle.rock_period_ms and vehicle.container_fall_ms must be positive",
            ));
        }
        self.wake.validate("vehicle.wake")
    }
}

/// Traveling skier
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SkierConfig {
    /// Horizontal travel speed in pixels per millisecond
    pub speed_px_per_ms: f32,
    /// Lower bound on travel duration
    pub min_duration_ms: f64,
    /// Extra distance beyond the viewport edges
    pub margin: f32,
    /// Start x as a fraction of viewport width
    pub start_x_fraction: f32,
    /// Start y (above the top edge)
    pub start_y: f32,
    pub weave_amplitude: f32,
    /// Weave term is `sin(progress * weave_half_turns * PI)`
    pub weave_half_turns: f32,
    pub complete_delay_ms: f64,
    pub trail: ParticleConfig,
}

impl Default for SkierConfig {
    fn default() -> Self {
        Self {
            speed_px_per_ms: 0.5,
            min_duration_ms: 2500.0,
            margin: 100.0,
            start_x_fraction: 0.8,
            start_y: -50.0,
            weave_amplitude: 120.0,
            weave_half_turns: 3.0,
            complete_delay_ms: 500.0,
            trail: ParticleConfig::trail(),
        }
    }
}

impl SkierConfig {
    fn validate(&self) -> Result<()> {
        if !(self.speed_px_per_ms > 0.0) {
            return Err(GlideError::invalid("skier.speed_px_per_ms must be positive"));
        }
        if !(self.min_duration_ms > 0.0) {
            return Err(GlideError::invalid("skier.min_duration_ms must be positive"));
        }
        if !(self.complete_delay_ms >= 0.0) {
            return Err(GlideError::invalid(
                "skier.complete_delay_ms must not be negative",
            ));
        }
        self.trail.validate("skier.trail")
    }
}

/// Pointer/orientation parallax
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParallaxConfig {
    pub stiffness: f32,
    pub mass: f32,
    /// Explicit damping; critical damping when absent
    pub damping: Option<f32>,
    /// Rotation at full offset, in degrees
    pub max_rotate_deg: f32,
    /// Translation at full offset, in pixels
    pub max_translate_px: f32,
    /// Tilt readings are divided by this before clamping to `[-0.5, 0.5]`
    pub orientation_scale_deg: f32,
    /// Viewports narrower than this use device orientation
    pub mobile_breakpoint: f32,
    /// Settle tolerance of the smoothed offset
    pub rest_delta: f32,
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            stiffness: 150.0,
            mass: 1.0,
            damping: None,
            max_rotate_deg: 12.0,
            max_translate_px: 15.0,
            orientation_scale_deg: 60.0,
            mobile_breakpoint: 768.0,
            rest_delta: 0.0005,
        }
    }
}

impl ParallaxConfig {
    fn validate(&self) -> Result<()> {
        if !(self.stiffness > 0.0) || !(self.mass > 0.0) {
            return Err(GlideError::invalid(
                "parallax.stiffness and parallax.mass must be positive",
            ));
        }
        if let Some(damping) = self.damping {
            if !(damping >= 0.0) {
                return Err(GlideError::invalid("parallax.damping must not be negative"));
            }
        }
        if !(self.orientation_scale_deg > 0.0) {
            return Err(GlideError::invalid(
                "parallax.orientation_scale_deg must be positive",
            ));
        }
        if !(self.rest_delta > 0.0) {
            return Err(GlideError::invalid("parallax.rest_delta must be positive"));
        }
        Ok(())
    }
}

/// Trigger coordination and the dependent dissolve effect
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Delay after the vehicle completes before the dissolve reverts
    pub dissolve_cooldown_ms: f64,
    pub dissolve: DissolveConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            dissolve_cooldown_ms: 10_000.0,
            dissolve: DissolveConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    fn validate(&self) -> Result<()> {
        if !(self.dissolve_cooldown_ms >= 0.0) {
            return Err(GlideError::invalid(
                "coordinator.dissolve_cooldown_ms must not be negative",
            ));
        }
        self.dissolve.validate()
    }
}

/// Melting text timing
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DissolveConfig {
    /// Duration of the melt once armed
    pub duration_ms: f64,
    /// Duration of the return to rest once disarmed
    pub revert_ms: f64,
    /// Extra delay per dissolving item, by index
    pub stagger_ms: f64,
    /// Number of dissolving items rendered per frame
    pub items: usize,
}

impl Default for DissolveConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2100.0,
            revert_ms: 600.0,
            stagger_ms: 100.0,
            items: 3,
        }
    }
}

impl DissolveConfig {
    fn validate(&self) -> Result<()> {
        if !(self.duration_ms > 0.0) || !(self.revert_ms > 0.0) || !(self.stagger_ms >= 0.0) {
            return Err(GlideError::invalid(
                "coordinator.dissolve durations must be positive",
            ));
        }
        Ok(())
    }
}
