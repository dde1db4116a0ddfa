//! Effect state machines
//!
//! Each triggered effect is one entity moving along a [`MotionCurve`] and
//! shedding particles, plus a short tail of delayed follow-ups once it
//! arrives:
//!
//! ```text
//! Vehicle:  Traveling --arrive--> Docked --+melt--> Dissolving --+complete--> Complete
//! Skier:    Traveling --arrive--------------------------------+complete--> Complete
//! ```
//!
//! Travel is driven by a frame loop; the follow-ups are deferred timers
//! measured from the arrival frame. [`launch`] wires the two together and
//! forwards every [`EffectEvent`] to a listener.

use crate::config::{ContainerConfig, SkierConfig, VehicleConfig};
use crate::curve::{CurveSample, EntityKind, MotionCurve};
use crate::easing::Easing;
use crate::keyframe::KeyframeTrack;
use crate::particles::{unit_noise, ParticlePool};
use crate::scheduler::{Flow, LoopId, SchedulerHandle};
use crate::timer::{TimerHandle, TimerId};
use glide_core::{Point, Viewport};
use smallvec::SmallVec;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// Lifecycle of one effect instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectState {
    /// Moving along its curve
    Traveling,
    /// Vehicle reached the dock and is unloading
    Docked,
    /// Vehicle signalled the dependent dissolve effect
    Dissolving,
    /// Terminal
    Complete,
}

impl EffectState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EffectState::Complete)
    }
}

/// Lifecycle notifications sent to the coordinator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectEvent {
    /// Vehicle reached its dock
    Docked,
    /// Vehicle asks for the dependent dissolve to start
    SecondaryTrigger,
    /// Effect finished; its trigger may fire again
    Complete,
}

/// Immutable parameters fixed at activation
#[derive(Clone, Debug, PartialEq)]
pub struct EntityParams {
    pub kind: EntityKind,
    /// Clock timestamp at activation
    pub start_ms: f64,
    pub curve: MotionCurve,
}

impl EntityParams {
    pub fn duration_ms(&self) -> f64 {
        self.curve.duration_ms()
    }

    pub fn origin(&self) -> Point {
        self.curve.origin()
    }

    pub fn dest(&self) -> Point {
        self.curve.dest()
    }
}

/// What happens once an entity reaches its destination
#[derive(Clone, Debug, PartialEq)]
pub struct Arrival {
    /// Event emitted on the arrival frame itself
    pub event: Option<EffectEvent>,
    /// Events to emit after a delay measured from arrival, in milliseconds
    pub follow_ups: SmallVec<[(f64, EffectEvent); 2]>,
}

// =============================================================================
// Container drop
// =============================================================================

/// Visual state of one falling container
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerVisual {
    pub id: usize,
    pub position: Point,
    pub rotation_deg: f32,
    pub opacity: f32,
    pub scale: f32,
}

/// A container tipped off the docked vehicle
///
/// Fire-and-forget: once created its whole fall is a function of time.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerDrop {
    pub id: usize,
    pub start: Point,
    /// Clock timestamp when the fall begins
    pub start_ms: f64,
    pub duration_ms: f64,
    /// Final y, below the bottom edge
    pub fall_to_y: f32,
    /// Final rotation in `[-180, 180)`
    pub spin_deg: f32,
    opacity: KeyframeTrack,
}

const CONTAINER_SCALE: f32 = 0.8;

impl ContainerDrop {
    fn new(
        id: usize,
        slot: &ContainerConfig,
        docked_at: Point,
        docked_at_ms: f64,
        duration_ms: f64,
        fall_to_y: f32,
    ) -> Self {
        Self {
            id,
            start: docked_at.offset(slot.offset),
            start_ms: docked_at_ms + slot.delay_ms,
            duration_ms,
            fall_to_y,
            spin_deg: unit_noise(id as u64, docked_at_ms.to_bits()) * 360.0 - 180.0,
            opacity: KeyframeTrack::evenly(&[1.0, 1.0, 0.0], Easing::SETTLE),
        }
    }

    /// Position, spin and fade at `now_ms`
    pub fn sample(&self, now_ms: f64) -> ContainerVisual {
        let t = if self.duration_ms > 0.0 {
            ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0) as f32
        } else {
            1.0
        };
        let eased = Easing::SETTLE.apply(t);
        ContainerVisual {
            id: self.id,
            position: Point::new(
                self.start.x,
                self.start.y + (self.fall_to_y - self.start.y) * eased,
            ),
            rotation_deg: self.spin_deg * eased,
            opacity: self.opacity.sample(t),
            scale: CONTAINER_SCALE,
        }
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        now_ms >= self.start_ms + self.duration_ms
    }
}

// =============================================================================
// Vehicle
// =============================================================================

/// The docking vehicle
#[derive(Clone, Debug)]
pub struct VehicleEffect {
    params: EntityParams,
    state: EffectState,
    wake: ParticlePool,
    last: CurveSample,
    docked_at_ms: Option<f64>,
    containers: SmallVec<[ContainerDrop; 3]>,
    container_slots: SmallVec<[ContainerConfig; 3]>,
    container_fall_ms: f64,
    fall_to_y: f32,
    melt_delay_ms: f64,
    complete_delay_ms: f64,
}

impl VehicleEffect {
    pub fn new(config: &VehicleConfig, viewport: Viewport, dock: Point, now_ms: f64) -> Self {
        let viewport = viewport.sanitized();
        let curve = MotionCurve::vehicle(config, viewport, dock);
        let last = curve.sample(0.0, 0.0);
        Self {
            params: EntityParams {
                kind: EntityKind::Vehicle,
                start_ms: now_ms,
                curve,
            },
            state: EffectState::Traveling,
            wake: ParticlePool::new(&config.wake),
            last,
            docked_at_ms: None,
            containers: SmallVec::new(),
            container_slots: config.containers.iter().copied().collect(),
            container_fall_ms: config.container_fall_ms,
            fall_to_y: viewport.height + config.container_overshoot,
            melt_delay_ms: config.melt_delay_ms,
            complete_delay_ms: config.complete_delay_ms,
        }
    }

    pub fn params(&self) -> &EntityParams {
        &self.params
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn sample(&self) -> CurveSample {
        self.last
    }

    pub fn wake(&self) -> &ParticlePool {
        &self.wake
    }

    pub fn docked_at_ms(&self) -> Option<f64> {
        self.docked_at_ms
    }

    pub fn containers(&self) -> &[ContainerDrop] {
        &self.containers
    }

    /// Move to `elapsed_ms`; returns the arrival on the frame the dock is reached
    pub fn advance(&mut self, elapsed_ms: f64, now_ms: f64) -> Option<Arrival> {
        if self.state != EffectState::Traveling {
            return None;
        }
        let sample = self.params.curve.sample_at(elapsed_ms);
        self.wake
            .maybe_spawn(sample.position, elapsed_ms, sample.progress, now_ms);
        self.last = sample;

        if sample.progress < 1.0 {
            return None;
        }

        self.state = EffectState::Docked;
        self.docked_at_ms = Some(now_ms);
        self.containers = self
            .container_slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                ContainerDrop::new(
                    i,
                    slot,
                    sample.position,
                    now_ms,
                    self.container_fall_ms,
                    self.fall_to_y,
                )
            })
            .collect();
        tracing::debug!(at = ?sample.position, "vehicle docked");

        Some(Arrival {
            event: Some(EffectEvent::Docked),
            follow_ups: smallvec::smallvec![
                (self.melt_delay_ms, EffectEvent::SecondaryTrigger),
                (self.complete_delay_ms, EffectEvent::Complete),
            ],
        })
    }

    /// Apply a follow-up event; false if it does not fit the current state
    pub fn apply(&mut self, event: EffectEvent) -> bool {
        let next = match (self.state, event) {
            (EffectState::Docked, EffectEvent::SecondaryTrigger) => EffectState::Dissolving,
            (EffectState::Docked | EffectState::Dissolving, EffectEvent::Complete) => {
                EffectState::Complete
            }
            _ => return false,
        };
        tracing::debug!(from = ?self.state, to = ?next, "vehicle transition");
        self.state = next;
        true
    }
}

// =============================================================================
// Skier
// =============================================================================

/// The skier and its powder trail
#[derive(Clone, Debug)]
pub struct SkierEffect {
    params: EntityParams,
    state: EffectState,
    trail: ParticlePool,
    last: CurveSample,
    arrived_at_ms: Option<f64>,
    complete_delay_ms: f64,
}

impl SkierEffect {
    pub fn new(config: &SkierConfig, viewport: Viewport, now_ms: f64) -> Self {
        let curve = MotionCurve::skier(config, viewport);
        let last = curve.sample(0.0, 0.0);
        Self {
            params: EntityParams {
                kind: EntityKind::Skier,
                start_ms: now_ms,
                curve,
            },
            state: EffectState::Traveling,
            trail: ParticlePool::new(&config.trail),
            last,
            arrived_at_ms: None,
            complete_delay_ms: config.complete_delay_ms,
        }
    }

    pub fn params(&self) -> &EntityParams {
        &self.params
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn sample(&self) -> CurveSample {
        self.last
    }

    pub fn trail(&self) -> &ParticlePool {
        &self.trail
    }

    pub fn arrived_at_ms(&self) -> Option<f64> {
        self.arrived_at_ms
    }

    pub fn advance(&mut self, elapsed_ms: f64, now_ms: f64) -> Option<Arrival> {
        if self.state != EffectState::Traveling || self.arrived_at_ms.is_some() {
            return None;
        }
        let sample = self.params.curve.sample_at(elapsed_ms);
        self.trail
            .maybe_spawn(sample.position, elapsed_ms, sample.progress, now_ms);
        self.last = sample;

        if sample.progress < 1.0 {
            return None;
        }
        self.arrived_at_ms = Some(now_ms);
        Some(Arrival {
            event: None,
            follow_ups: smallvec::smallvec![(self.complete_delay_ms, EffectEvent::Complete)],
        })
    }

    pub fn apply(&mut self, event: EffectEvent) -> bool {
        if self.state == EffectState::Traveling && event == EffectEvent::Complete {
            self.state = EffectState::Complete;
            tracing::debug!("skier complete");
            true
        } else {
            false
        }
    }
}

// =============================================================================
// Either effect
// =============================================================================

/// A vehicle or skier instance
#[derive(Clone, Debug)]
pub enum Effect {
    Vehicle(VehicleEffect),
    Skier(SkierEffect),
}

impl Effect {
    pub fn kind(&self) -> EntityKind {
        self.params().kind
    }

    pub fn params(&self) -> &EntityParams {
        match self {
            Effect::Vehicle(v) => v.params(),
            Effect::Skier(s) => s.params(),
        }
    }

    pub fn state(&self) -> EffectState {
        match self {
            Effect::Vehicle(v) => v.state(),
            Effect::Skier(s) => s.state(),
        }
    }

    /// Latest curve sample
    pub fn sample(&self) -> CurveSample {
        match self {
            Effect::Vehicle(v) => v.sample(),
            Effect::Skier(s) => s.sample(),
        }
    }

    pub fn particles(&self) -> &ParticlePool {
        match self {
            Effect::Vehicle(v) => v.wake(),
            Effect::Skier(s) => s.trail(),
        }
    }

    pub fn containers(&self) -> &[ContainerDrop] {
        match self {
            Effect::Vehicle(v) => v.containers(),
            Effect::Skier(_) => &[],
        }
    }

    pub fn advance(&mut self, elapsed_ms: f64, now_ms: f64) -> Option<Arrival> {
        match self {
            Effect::Vehicle(v) => v.advance(elapsed_ms, now_ms),
            Effect::Skier(s) => s.advance(elapsed_ms, now_ms),
        }
    }

    pub fn apply(&mut self, event: EffectEvent) -> bool {
        match self {
            Effect::Vehicle(v) => v.apply(event),
            Effect::Skier(s) => s.apply(event),
        }
    }
}

// =============================================================================
// Running an effect
// =============================================================================

/// Receives every event an effect emits
pub type EffectListener = Rc<dyn Fn(EntityKind, EffectEvent)>;

/// A launched effect: its frame loop plus any pending follow-up timers
pub struct EffectRun {
    effect: Rc<RefCell<Effect>>,
    loop_id: LoopId,
    timers: Rc<RefCell<SmallVec<[TimerId; 2]>>>,
}

impl EffectRun {
    pub fn kind(&self) -> EntityKind {
        self.effect.borrow().kind()
    }

    /// Borrow the effect for rendering
    pub fn effect(&self) -> Ref<'_, Effect> {
        self.effect.borrow()
    }

    pub fn is_complete(&self) -> bool {
        self.effect.borrow().state().is_terminal()
    }

    /// Stop the loop and drop every pending follow-up; nothing fires afterwards
    pub fn cancel(&self, scheduler: &SchedulerHandle, timers: &TimerHandle) {
        scheduler.cancel(self.loop_id);
        let pending = std::mem::take(&mut *self.timers.borrow_mut());
        for id in pending {
            timers.cancel(id);
        }
    }
}

/// Start driving `effect`
///
/// Each frame advances the effect from the scheduler's elapsed time. On
/// arrival the loop stops, the follow-ups are scheduled on `timers`, and the
/// arrival event (if any) goes to `listener`. Follow-ups reach `listener` only
/// if the effect accepted them. Returns `None` if the scheduler is gone.
pub fn launch(
    effect: Effect,
    scheduler: &SchedulerHandle,
    timers: &TimerHandle,
    listener: EffectListener,
) -> Option<EffectRun> {
    let kind = effect.kind();
    let effect = Rc::new(RefCell::new(effect));
    let pending: Rc<RefCell<SmallVec<[TimerId; 2]>>> = Rc::new(RefCell::new(SmallVec::new()));

    let tick_effect = effect.clone();
    let tick_pending = pending.clone();
    let tick_timers = timers.clone();
    let loop_id = scheduler.start(kind.name(), move |ctx| {
        let arrival = tick_effect.borrow_mut().advance(ctx.elapsed_ms, ctx.now_ms);
        let Some(arrival) = arrival else {
            return Flow::Continue;
        };

        for (delay_ms, event) in arrival.follow_ups {
            let target = Rc::downgrade(&tick_effect);
            let listener = listener.clone();
            let scheduled = tick_timers.schedule(delay_ms, timer_label(kind, event), move || {
                let Some(target) = target.upgrade() else {
                    return;
                };
                let accepted = target.borrow_mut().apply(event);
                if accepted {
                    listener(kind, event);
                }
            });
            if let Some(id) = scheduled {
                tick_pending.borrow_mut().push(id);
            }
        }

        if let Some(event) = arrival.event {
            listener(kind, event);
        }
        Flow::Stop
    })?;

    Some(EffectRun {
        effect,
        loop_id,
        timers: pending,
    })
}

fn timer_label(kind: EntityKind, event: EffectEvent) -> &'static str {
    match (kind, event) {
        (EntityKind::Vehicle, EffectEvent::SecondaryTrigger) => "vehicle.melt",
        (EntityKind::Vehicle, _) => "vehicle.complete",
        (EntityKind::Skier, _) => "skier.complete",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::FrameScheduler;
    use crate::timer::TimerQueue;
    use glide_core::{Clock, ManualClock};

    fn viewport() -> Viewport {
        Viewport::new(1280.0, 800.0)
    }

    #[test]
    fn test_vehicle_docks_once() {
        let mut vehicle =
            VehicleEffect::new(&VehicleConfig::default(), viewport(), Point::new(0.0, 60.0), 0.0);
        assert!(vehicle.advance(1500.0, 1500.0).is_none());
        assert_eq!(vehicle.state(), EffectState::Traveling);

        let arrival = vehicle.advance(3000.0, 3000.0).unwrap();
        assert_eq!(arrival.event, Some(EffectEvent::Docked));
        assert_eq!(
            arrival.follow_ups.as_slice(),
            &[
                (800.0, EffectEvent::SecondaryTrigger),
                (3500.0, EffectEvent::Complete)
            ]
        );
        assert_eq!(vehicle.state(), EffectState::Docked);
        assert_eq!(vehicle.docked_at_ms(), Some(3000.0));
        assert_eq!(vehicle.containers().len(), 3);

        // Later frames do nothing
        assert!(vehicle.advance(3100.0, 3100.0).is_none());
    }

    #[test]
    fn test_vehicle_transitions_are_ordered() {
        let mut vehicle =
            VehicleEffect::new(&VehicleConfig::default(), viewport(), Point::new(0.0, 60.0), 0.0);
        assert!(!vehicle.apply(EffectEvent::SecondaryTrigger));

        vehicle.advance(3000.0, 3000.0);
        assert!(vehicle.apply(EffectEvent::SecondaryTrigger));
        assert_eq!(vehicle.state(), EffectState::Dissolving);
        assert!(!vehicle.apply(EffectEvent::SecondaryTrigger));
        assert!(vehicle.apply(EffectEvent::Complete));
        assert!(vehicle.state().is_terminal());
        assert!(!vehicle.apply(EffectEvent::Complete));
    }

    #[test]
    fn test_container_fall() {
        let mut vehicle =
            VehicleEffect::new(&VehicleConfig::default(), viewport(), Point::new(0.0, 60.0), 0.0);
        vehicle.advance(3000.0, 3000.0);
        let dock = vehicle.sample().position;
        let first = &vehicle.containers()[0];
        assert_eq!(first.start, Point::new(dock.x + 10.0, dock.y + 10.0));
        assert_eq!(first.start_ms, 3200.0);
        assert!((-180.0..180.0).contains(&first.spin_deg));

        let before = first.sample(3100.0);
        assert_eq!(before.position, first.start);
        assert_eq!(before.opacity, 1.0);

        let end = first.sample(3200.0 + 2000.0);
        assert!((end.position.y - 850.0).abs() < 1e-3);
        assert!(end.opacity.abs() < 1e-6);
        assert!((end.rotation_deg - first.spin_deg).abs() < 1e-4);
        assert!(first.is_finished(5200.0));
    }

    #[test]
    fn test_skier_arrival() {
        let mut skier = SkierEffect::new(&SkierConfig::default(), Viewport::new(1000.0, 800.0), 0.0);
        assert_eq!(skier.params().duration_ms(), 2500.0);
        assert!(skier.advance(960.0, 960.0).is_none());
        assert!(!skier.trail().is_empty());

        let arrival = skier.advance(2500.0, 2500.0).unwrap();
        assert_eq!(arrival.event, None);
        assert_eq!(arrival.follow_ups.as_slice(), &[(500.0, EffectEvent::Complete)]);
        assert_eq!(skier.state(), EffectState::Traveling);
        assert!(skier.advance(2600.0, 2600.0).is_none());

        assert!(!skier.apply(EffectEvent::SecondaryTrigger));
        assert!(skier.apply(EffectEvent::Complete));
        assert_eq!(skier.state(), EffectState::Complete);
    }

    #[test]
    fn test_launch_emits_events_in_order() {
        let clock = ManualClock::new();
        let scheduler = FrameScheduler::new(Rc::new(clock.clone()));
        let timers = TimerQueue::new(Rc::new(clock.clone()));
        let log: Rc<RefCell<Vec<(EffectEvent, f64)>>> = Rc::default();

        let sink = log.clone();
        let event_clock = clock.clone();
        let run = launch(
            Effect::Vehicle(VehicleEffect::new(
                &VehicleConfig::default(),
                viewport(),
                Point::new(0.0, 60.0),
                0.0,
            )),
            &scheduler.handle(),
            &timers.handle(),
            Rc::new(move |_kind: EntityKind, event: EffectEvent| {
                sink.borrow_mut().push((event, event_clock.now_ms()));
            }),
        )
        .unwrap();

        for _ in 0..450 {
            clock.advance(16.0);
            scheduler.tick();
            timers.fire_due();
        }

        let log = log.borrow();
        let events: Vec<EffectEvent> = log.iter().map(|(e, _)| *e).collect();
        assert_eq!(
            events,
            vec![
                EffectEvent::Docked,
                EffectEvent::SecondaryTrigger,
                EffectEvent::Complete
            ]
        );
        let docked = log[0].1;
        assert!(docked >= 3000.0 && docked < 3016.0);
        assert!(log[1].1 - docked >= 800.0 && log[1].1 - docked < 816.0);
        assert!(log[2].1 - docked >= 3500.0 && log[2].1 - docked < 3516.0);
        assert!(run.is_complete());
        assert_eq!(scheduler.active_count(), 0);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_cancelled_run_is_silent() {
        let clock = ManualClock::new();
        let scheduler = FrameScheduler::new(Rc::new(clock.clone()));
        let timers = TimerQueue::new(Rc::new(clock.clone()));
        let count = Rc::new(std::cell::Cell::new(0));

        let c = count.clone();
        let run = launch(
            Effect::Skier(SkierEffect::new(&SkierConfig::default(), viewport(), 0.0)),
            &scheduler.handle(),
            &timers.handle(),
            Rc::new(move |_kind: EntityKind, _event: EffectEvent| c.set(c.get() + 1)),
        )
        .unwrap();

        // Let it arrive so the completion timer is pending, then cancel
        let duration = run.effect().params().duration_ms();
        clock.advance(duration);
        scheduler.tick();
        assert_eq!(timers.len(), 1);

        run.cancel(&scheduler.handle(), &timers.handle());
        clock.advance(1000.0);
        scheduler.tick();
        timers.fire_due();
        assert_eq!(count.get(), 0);
        assert!(timers.is_empty());
    }
}
