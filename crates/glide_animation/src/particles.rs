//! Bounded particle pools
//!
//! Moving entities shed short-lived particles (a wake, a powder trail). A pool
//! spawns a small batch at fixed offsets on a throttled cadence, then trims
//! itself to the most recent `cap` particles. Once spawned, a particle's fade
//! and drift are a pure function of its own spawn timestamp: how often the
//! host ticks has no effect on it, and eviction only stops it being drawn.

use crate::config::{DriftRange, ParticleConfig};
use crate::easing::Easing;
use glide_core::{Point, Vec2};
use rustc_hash::FxHasher;
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};

/// One short-lived visual token
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// Unique for the lifetime of the pool, strictly increasing
    pub id: u64,
    /// Spawn position in viewport coordinates
    pub position: Point,
    /// Clock timestamp at spawn
    pub spawned_at_ms: f64,
    /// Total displacement over the particle's lifetime
    pub drift: Vec2,
}

/// Evaluated visuals for one particle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleVisual {
    pub id: u64,
    pub position: Point,
    pub opacity: f32,
    pub scale: f32,
    /// True once the fade has run its full duration
    pub finished: bool,
}

/// How a particle fades, grows and drifts
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleStyle {
    pub lifetime_ms: f64,
    pub start_opacity: f32,
    pub start_scale: f32,
    pub end_scale: f32,
    pub drift_x: DriftRange,
    pub drift_y: DriftRange,
    pub easing: Easing,
}

impl ParticleStyle {
    pub fn from_config(config: &ParticleConfig) -> Self {
        Self {
            lifetime_ms: config.lifetime_ms,
            start_opacity: config.start_opacity,
            start_scale: config.start_scale,
            end_scale: config.end_scale,
            drift_x: config.drift_x,
            drift_y: config.drift_y,
            easing: Easing::EaseOut,
        }
    }

    /// Evaluate a particle's fade/drift at `now_ms`
    pub fn sample(&self, particle: &Particle, now_ms: f64) -> ParticleVisual {
        let age = now_ms - particle.spawned_at_ms;
        let t = if self.lifetime_ms > 0.0 {
            (age / self.lifetime_ms).clamp(0.0, 1.0) as f32
        } else {
            1.0
        };
        let eased = self.easing.apply(t);
        ParticleVisual {
            id: particle.id,
            position: particle.position.offset(particle.drift.scale(eased)),
            opacity: self.start_opacity * (1.0 - eased),
            scale: self.start_scale + (self.end_scale - self.start_scale) * eased,
            finished: t >= 1.0,
        }
    }

    /// Deterministic drift for a particle id
    fn drift_for(&self, id: u64) -> Vec2 {
        Vec2::new(
            self.drift_x.pick(unit_noise(id, 0)),
            self.drift_y.pick(unit_noise(id, 1)),
        )
    }
}

/// When and where batches appear
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnPattern {
    pub cadence_ms: f64,
    pub gate_ms: f64,
    pub cutoff_progress: f32,
    pub offsets: SmallVec<[Vec2; 4]>,
}

impl SpawnPattern {
    pub fn from_config(config: &ParticleConfig) -> Self {
        Self {
            cadence_ms: config.cadence_ms,
            gate_ms: config.gate_ms,
            cutoff_progress: config.cutoff_progress,
            offsets: config.offsets.iter().copied().collect(),
        }
    }

    /// `elapsed % cadence < gate` and still short of the cutoff
    pub fn should_spawn(&self, elapsed_ms: f64, progress: f32) -> bool {
        if !(progress < self.cutoff_progress) {
            return false;
        }
        if self.cadence_ms <= 0.0 {
            return true;
        }
        elapsed_ms.max(0.0) % self.cadence_ms < self.gate_ms
    }
}

/// Bounded, append-then-trim particle collection
#[derive(Clone, Debug)]
pub struct ParticlePool {
    pattern: SpawnPattern,
    style: ParticleStyle,
    cap: usize,
    particles: Vec<Particle>,
    next_id: u64,
}

impl ParticlePool {
    pub fn new(config: &ParticleConfig) -> Self {
        let cap = config.cap.max(1);
        Self {
            pattern: SpawnPattern::from_config(config),
            style: ParticleStyle::from_config(config),
            cap,
            particles: Vec::with_capacity(cap + config.offsets.len()),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// All retained particles, oldest first
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Spawn a batch around `position` if the cadence gate is open
    ///
    /// Returns the particles added by this call that survived trimming (empty
    /// when nothing spawned).
    pub fn maybe_spawn(
        &mut self,
        position: Point,
        elapsed_ms: f64,
        progress: f32,
        now_ms: f64,
    ) -> &[Particle] {
        if !self.pattern.should_spawn(elapsed_ms, progress) || !position.is_finite() {
            return &[];
        }

        let batch = self.pattern.offsets.len();
        for offset in &self.pattern.offsets {
            let id = self.next_id;
            self.next_id += 1;
            self.particles.push(Particle {
                id,
                position: position.offset(*offset),
                spawned_at_ms: now_ms,
                drift: self.style.drift_for(id),
            });
        }

        let excess = self.particles.len().saturating_sub(self.cap);
        if excess > 0 {
            self.particles.drain(..excess);
        }

        tracing::trace!(batch, retained = self.particles.len(), "particle batch");

        let start = self.particles.len().saturating_sub(batch);
        &self.particles[start..]
    }

    /// Visuals for every retained particle that is still fading
    pub fn visuals(&self, now_ms: f64) -> Vec<ParticleVisual> {
        self.particles
            .iter()
            .map(|particle| self.style.sample(particle, now_ms))
            .filter(|visual| !visual.finished)
            .collect()
    }
}

/// Hash an id into `[0, 1)`
pub(crate) fn unit_noise(id: u64, salt: u64) -> f32 {
    let mut hasher = FxHasher::default();
    id.hash(&mut hasher);
    salt.hash(&mut hasher);
    // Top 24 bits fit an f32 mantissa exactly
    (hasher.finish() >> 40) as f32 / (1u64 << 24) as f32
}
