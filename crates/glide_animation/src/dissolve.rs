//! Melting text
//!
//! When armed, each dissolving item holds briefly, swells, then sinks, blurs
//! and fades out, with two drips running off its bottom edge. Disarming
//! brings every item back to rest from wherever its melt had reached.

use crate::config::DissolveConfig;
use crate::easing::Easing;
use crate::keyframe::KeyframeTrack;

/// Stop times shared by every melt track
const MELT_TIMES: [f32; 3] = [0.0, 0.3, 1.0];

/// Look of one dissolving item
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DissolvePose {
    pub opacity: f32,
    /// Downward offset in pixels
    pub offset_y: f32,
    /// Gaussian blur radius in pixels
    pub blur_px: f32,
    pub scale: f32,
}

impl DissolvePose {
    pub const REST: DissolvePose = DissolvePose {
        opacity: 1.0,
        offset_y: 0.0,
        blur_px: 0.0,
        scale: 1.0,
    };

    fn lerp(a: DissolvePose, b: DissolvePose, t: f32) -> Self {
        Self {
            opacity: a.opacity + (b.opacity - a.opacity) * t,
            offset_y: a.offset_y + (b.offset_y - a.offset_y) * t,
            blur_px: a.blur_px + (b.blur_px - a.blur_px) * t,
            scale: a.scale + (b.scale - a.scale) * t,
        }
    }
}

impl Default for DissolvePose {
    fn default() -> Self {
        Self::REST
    }
}

/// One drip running off the bottom of an item
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DripVisual {
    pub height: f32,
    pub opacity: f32,
    pub offset_y: f32,
}

/// Everything needed to draw one item
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DissolveVisual {
    pub pose: DissolvePose,
    pub drips: [DripVisual; 2],
}

#[derive(Clone, Copy, Debug)]
struct Drip {
    delay_ms: f64,
    duration_ms: f64,
    height: f32,
    offset_y: f32,
}

const DRIPS: [Drip; 2] = [
    Drip {
        delay_ms: 300.0,
        duration_ms: 800.0,
        height: 15.0,
        offset_y: 10.0,
    },
    Drip {
        delay_ms: 500.0,
        duration_ms: 1000.0,
        height: 20.0,
        offset_y: 15.0,
    },
];

const DRIP_OPACITY: f32 = 0.6;

impl Drip {
    fn sample(&self, since_ms: f64) -> DripVisual {
        let t = ((since_ms - self.delay_ms) / self.duration_ms).clamp(0.0, 1.0) as f32;
        let eased = Easing::EaseOut.apply(t);
        DripVisual {
            height: self.height * eased,
            opacity: DRIP_OPACITY * (1.0 - eased),
            offset_y: self.offset_y * eased,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Rest,
    Melting { since_ms: f64 },
    Reverting { melted_at_ms: f64, disarmed_at_ms: f64 },
}

/// Melt state shared by every dissolving item
#[derive(Clone, Debug)]
pub struct Dissolve {
    config: DissolveConfig,
    opacity: KeyframeTrack,
    offset_y: KeyframeTrack,
    blur_px: KeyframeTrack,
    scale: KeyframeTrack,
    phase: Phase,
}

impl Dissolve {
    pub fn new(config: &DissolveConfig) -> Self {
        let track = |values: &[f32]| KeyframeTrack::timed(&MELT_TIMES, values, Easing::SETTLE);
        Self {
            config: config.clone(),
            opacity: track(&[1.0, 1.0, 0.0]),
            offset_y: track(&[0.0, 0.0, 20.0]),
            blur_px: track(&[0.0, 0.0, 6.0]),
            scale: track(&[1.0, 1.5, 0.3]),
            phase: Phase::Rest,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.phase, Phase::Melting { .. })
    }

    /// Start melting; false if already melting
    pub fn arm(&mut self, now_ms: f64) -> bool {
        if self.is_armed() {
            return false;
        }
        self.phase = Phase::Melting { since_ms: now_ms };
        true
    }

    /// Return to rest; false if not melting
    pub fn disarm(&mut self, now_ms: f64) -> bool {
        let Phase::Melting { since_ms } = self.phase else {
            return false;
        };
        self.phase = Phase::Reverting {
            melted_at_ms: since_ms,
            disarmed_at_ms: now_ms,
        };
        true
    }

    /// Jump straight to rest
    pub fn reset(&mut self) {
        self.phase = Phase::Rest;
    }

    /// True while any item is away from rest
    pub fn is_animating(&self, now_ms: f64, items: usize) -> bool {
        match self.phase {
            Phase::Rest => false,
            Phase::Melting { .. } => true,
            Phase::Reverting { disarmed_at_ms, .. } => {
                items > 0 && now_ms < disarmed_at_ms + self.config.revert_ms
            }
        }
    }

    /// Visuals for the item at `index` (its stagger slot) at `now_ms`
    pub fn sample(&self, now_ms: f64, index: usize) -> DissolveVisual {
        match self.phase {
            Phase::Rest => DissolveVisual::default(),
            Phase::Melting { since_ms } => {
                let since = now_ms - since_ms - self.stagger(index);
                DissolveVisual {
                    pose: self.melt_pose(since),
                    drips: [DRIPS[0].sample(since), DRIPS[1].sample(since)],
                }
            }
            Phase::Reverting {
                melted_at_ms,
                disarmed_at_ms,
            } => {
                let from = self.melt_pose(disarmed_at_ms - melted_at_ms - self.stagger(index));
                let t = ((now_ms - disarmed_at_ms) / self.config.revert_ms).clamp(0.0, 1.0) as f32;
                DissolveVisual {
                    pose: DissolvePose::lerp(from, DissolvePose::REST, Easing::SETTLE.apply(t)),
                    drips: [DripVisual::default(); 2],
                }
            }
        }
    }

    fn stagger(&self, index: usize) -> f64 {
        self.config.stagger_ms * index as f64
    }

    fn melt_pose(&self, since_ms: f64) -> DissolvePose {
        let t = (since_ms / self.config.duration_ms).clamp(0.0, 1.0) as f32;
        DissolvePose {
            opacity: self.opacity.sample(t),
            offset_y: self.offset_y.sample(t),
            blur_px: self.blur_px.sample(t),
            scale: self.scale.sample(t),
        }
    }
}
