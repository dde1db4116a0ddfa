//! Keyframe tracks
//!
//! A track is a list of `(time, value)` stops over normalized time with one
//! easing applied to every segment. Tracks are stateless: callers sample them
//! with a progress value they derive from their own clock.

use crate::easing::Easing;
use smallvec::SmallVec;

/// A single stop in a track
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    /// Time position (0.0 to 1.0)
    pub time: f32,
    /// Value at this stop
    pub value: f32,
}

/// A piecewise-eased value over normalized time
#[derive(Clone, Debug, PartialEq)]
pub struct KeyframeTrack {
    keyframes: SmallVec<[Keyframe; 5]>,
    easing: Easing,
}

impl KeyframeTrack {
    /// Build a track from values spread evenly over `[0, 1]`
    ///
    /// ```
    /// use glide_animation::{Easing, KeyframeTrack};
    ///
    /// let rock = KeyframeTrack::evenly(&[0.0, -2.0, 0.0, 2.0, 0.0], Easing::Linear);
    /// assert_eq!(rock.sample(0.25), -2.0);
    /// ```
    pub fn evenly(values: &[f32], easing: Easing) -> Self {
        let last = values.len().saturating_sub(1).max(1) as f32;
        let keyframes = values
            .iter()
            .enumerate()
            .map(|(i, &value)| Keyframe {
                time: i as f32 / last,
                value,
            })
            .collect();
        Self { keyframes, easing }
    }

    /// Build a track from explicit stop times
    ///
    /// `times` and `values` are paired up to the shorter of the two; stops are
    /// sorted by time.
    pub fn timed(times: &[f32], values: &[f32], easing: Easing) -> Self {
        let mut keyframes: SmallVec<[Keyframe; 5]> = times
            .iter()
            .zip(values)
            .map(|(&time, &value)| Keyframe {
                time: time.clamp(0.0, 1.0),
                value,
            })
            .collect();
        keyframes.sort_by(|a, b| {
            a.time
                .partial_cmp(&b.time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { keyframes, easing }
    }

    fn first_value(&self) -> f32 {
        self.keyframes.first().map(|k| k.value).unwrap_or(0.0)
    }

    pub fn last_value(&self) -> f32 {
        self.keyframes.last().map(|k| k.value).unwrap_or(0.0)
    }

    /// Value at normalized time `t` (clamped to `[0, 1]`)
    pub fn sample(&self, t: f32) -> f32 {
        let Some(first) = self.keyframes.first() else {
            return 0.0;
        };
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        if t <= first.time {
            return first.value;
        }

        for pair in self.keyframes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.time {
                let span = b.time - a.time;
                if span <= f32::EPSILON {
                    return b.value;
                }
                let local = self.easing.apply((t - a.time) / span);
                return a.value + (b.value - a.value) * local;
            }
        }

        self.last_value()
    }

    /// Sample a track that repeats every `period_ms`
    pub fn sample_looped(&self, elapsed_ms: f64, period_ms: f64) -> f32 {
        if !(period_ms > 0.0) {
            return self.first_value();
        }
        let phase = elapsed_ms.max(0.0).rem_euclid(period_ms) / period_ms;
        self.sample(phase as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evenly_spaced_stops() {
        let track = KeyframeTrack::evenly(&[0.0, -2.0, 0.0, 2.0, 0.0], Easing::Linear);
        assert_eq!(track.keyframes.len(), 5);
        assert_eq!(track.sample(0.0), 0.0);
        assert_eq!(track.sample(0.25), -2.0);
        assert!((track.sample(0.125) + 1.0).abs() < 1e-6);
        assert_eq!(track.sample(0.75), 2.0);
        assert_eq!(track.sample(1.0), 0.0);
    }

    #[test]
    fn test_timed_hold_then_fade() {
        // Hold at 1 until 30%, then fall to 0
        let opacity = KeyframeTrack::timed(&[0.0, 0.3, 1.0], &[1.0, 1.0, 0.0], Easing::Linear);
        assert_eq!(opacity.sample(0.1), 1.0);
        assert_eq!(opacity.sample(0.3), 1.0);
        assert!((opacity.sample(0.65) - 0.5).abs() < 1e-5);
        assert_eq!(opacity.sample(1.0), 0.0);
    }

    #[test]
    fn test_easing_applies_per_segment() {
        let track = KeyframeTrack::evenly(&[0.0, 100.0], Easing::EaseOutCubic);
        assert!((track.sample(0.5) - 87.5).abs() < 1e-3);
    }

    #[test]
    fn test_looped_sampling() {
        let track = KeyframeTrack::evenly(&[0.0, -2.0, 0.0, 2.0, 0.0], Easing::Linear);
        assert_eq!(track.sample_looped(500.0, 2000.0), -2.0);
        assert_eq!(track.sample_looped(2500.0, 2000.0), -2.0);
        assert_eq!(track.sample_looped(100.0, 0.0), 0.0);
    }

    #[test]
    fn test_empty_and_single() {
        let empty = KeyframeTrack::timed(&[], &[], Easing::Linear);
        assert_eq!(empty.sample(0.5), 0.0);

        let single = KeyframeTrack::evenly(&[7.0], Easing::Linear);
        assert_eq!(single.sample(0.0), 7.0);
        assert_eq!(single.sample(1.0), 7.0);
    }
}
