//! Trigger coordination
//!
//! Two effects can be triggered by the user: the skier (primary) and the
//! vehicle (secondary). At most one runs at a time. The vehicle also drives a
//! dependent dissolve: its secondary-trigger event arms the dissolve, and
//! once it completes a reset timer reverts the dissolve after a cooldown. A
//! new completion replaces any reset still pending.

use crate::config::CoordinatorConfig;
use crate::curve::EntityKind;
use crate::dissolve::{Dissolve, DissolveVisual};
use crate::effect::EffectEvent;
use crate::timer::{TimerHandle, TimerId};
use glide_core::{InputSource, Viewport};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// How a trigger region reacts to the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerMode {
    /// Pointer entering the region triggers (fine pointers)
    Hover,
    /// A tap/click triggers (coarse pointers)
    Tap,
}

impl TriggerMode {
    /// Coarse pointers tap, everything else hovers
    pub fn for_viewport(viewport: &Viewport) -> Self {
        if viewport.coarse_pointer {
            TriggerMode::Tap
        } else {
            TriggerMode::Hover
        }
    }

    /// Check whether `gesture` triggers in this mode
    pub fn accepts(&self, gesture: TriggerMode) -> bool {
        *self == gesture
    }
}

impl From<InputSource> for TriggerMode {
    fn from(source: InputSource) -> Self {
        match source {
            InputSource::Pointer => TriggerMode::Hover,
            InputSource::Orientation => TriggerMode::Tap,
        }
    }
}

/// Snapshot of which effects are live
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriggerState {
    /// Skier running
    pub primary_active: bool,
    /// Vehicle running
    pub secondary_active: bool,
    /// Dependent dissolve is melting
    pub dissolve_armed: bool,
}

impl TriggerState {
    pub fn any_active(&self) -> bool {
        self.primary_active || self.secondary_active
    }

    fn active_mut(&mut self, kind: EntityKind) -> &mut bool {
        match kind {
            EntityKind::Skier => &mut self.primary_active,
            EntityKind::Vehicle => &mut self.secondary_active,
        }
    }
}

/// Notifications sent to registered handlers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinatorEvent {
    Activated(EntityKind),
    /// Trigger ignored because an effect was already running
    Rejected(EntityKind),
    /// Vehicle reached its dock
    Docked,
    DissolveArmed,
    Completed(EntityKind),
    /// Effect stopped before completing
    Cancelled(EntityKind),
    DissolveReset,
}

pub type CoordinatorHandler = Rc<dyn Fn(&CoordinatorEvent)>;

struct CoordinatorInner {
    state: TriggerState,
    dissolve: Dissolve,
    reset_timer: Option<TimerId>,
    cooldown_ms: f64,
    handlers: Vec<CoordinatorHandler>,
}

/// Mutual exclusion and dissolve arming for one view
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TriggerCoordinator {
    inner: Rc<RefCell<CoordinatorInner>>,
    timers: TimerHandle,
}

impl TriggerCoordinator {
    pub fn new(config: &CoordinatorConfig, timers: TimerHandle) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CoordinatorInner {
                state: TriggerState::default(),
                dissolve: Dissolve::new(&config.dissolve),
                reset_timer: None,
                cooldown_ms: config.dissolve_cooldown_ms,
                handlers: Vec::new(),
            })),
            timers,
        }
    }

    /// Register a handler for every coordinator event
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&CoordinatorEvent) + 'static,
    {
        self.inner.borrow_mut().handlers.push(Rc::new(handler));
    }

    pub fn state(&self) -> TriggerState {
        self.inner.borrow().state
    }

    pub fn is_reset_pending(&self) -> bool {
        self.inner.borrow().reset_timer.is_some()
    }

    /// Claim the skier trigger
    pub fn try_activate_primary(&self) -> bool {
        self.try_activate(EntityKind::Skier)
    }

    /// Claim the vehicle trigger
    pub fn try_activate_secondary(&self) -> bool {
        self.try_activate(EntityKind::Vehicle)
    }

    /// Claim the trigger for `kind`; false while either effect is running
    pub fn try_activate(&self, kind: EntityKind) -> bool {
        let accepted = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.any_active() {
                false
            } else {
                *inner.state.active_mut(kind) = true;
                true
            }
        };
        if accepted {
            tracing::debug!(effect = kind.name(), "trigger accepted");
            emit(&self.inner, CoordinatorEvent::Activated(kind));
        } else {
            tracing::debug!(effect = kind.name(), "trigger ignored, effect already running");
            emit(&self.inner, CoordinatorEvent::Rejected(kind));
        }
        accepted
    }

    /// React to a lifecycle event from a running effect
    pub fn handle_effect_event(&self, kind: EntityKind, event: EffectEvent) {
        match (kind, event) {
            (EntityKind::Vehicle, EffectEvent::Docked) => {
                emit(&self.inner, CoordinatorEvent::Docked);
            }
            (EntityKind::Vehicle, EffectEvent::SecondaryTrigger) => {
                let now = self.timers.now_ms();
                let stale = {
                    let mut inner = self.inner.borrow_mut();
                    inner.dissolve.arm(now);
                    inner.state.dissolve_armed = true;
                    inner.reset_timer.take()
                };
                if let Some(id) = stale {
                    self.timers.cancel(id);
                }
                emit(&self.inner, CoordinatorEvent::DissolveArmed);
            }
            (_, EffectEvent::Complete) => {
                *self.inner.borrow_mut().state.active_mut(kind) = false;
                if kind == EntityKind::Vehicle {
                    self.schedule_reset();
                }
                emit(&self.inner, CoordinatorEvent::Completed(kind));
            }
            (EntityKind::Skier, _) => {}
        }
    }

    /// Release the trigger of an effect stopped before completion
    ///
    /// `armed_dissolve` tells whether the stopped effect had already armed
    /// the dissolve. Only then is the dissolve reverted and its pending reset
    /// dropped; a dissolve left armed by an earlier run keeps its cooldown.
    pub fn release(&self, kind: EntityKind, armed_dissolve: bool) {
        let was_active = {
            let mut inner = self.inner.borrow_mut();
            std::mem::replace(inner.state.active_mut(kind), false)
        };
        if !was_active {
            return;
        }
        if kind == EntityKind::Vehicle && armed_dissolve {
            let now = self.timers.now_ms();
            let stale = {
                let mut inner = self.inner.borrow_mut();
                inner.dissolve.disarm(now);
                inner.state.dissolve_armed = false;
                inner.reset_timer.take()
            };
            if let Some(id) = stale {
                self.timers.cancel(id);
            }
        }
        emit(&self.inner, CoordinatorEvent::Cancelled(kind));
    }

    /// Dissolve visuals for the item in stagger slot `index`
    pub fn dissolve_visual(&self, index: usize) -> DissolveVisual {
        let now = self.timers.now_ms();
        self.inner.borrow().dissolve.sample(now, index)
    }

    /// True while the dissolve is melting or reverting
    pub fn dissolve_animating(&self, items: usize) -> bool {
        let now = self.timers.now_ms();
        self.inner.borrow().dissolve.is_animating(now, items)
    }

    /// Forget all state without emitting events (view teardown)
    pub fn reset(&self) {
        let stale = {
            let mut inner = self.inner.borrow_mut();
            inner.state = TriggerState::default();
            inner.dissolve.reset();
            inner.reset_timer.take()
        };
        if let Some(id) = stale {
            self.timers.cancel(id);
        }
    }

    /// (Re)start the cooldown that reverts the dissolve
    fn schedule_reset(&self) {
        let (stale, cooldown) = {
            let mut inner = self.inner.borrow_mut();
            (inner.reset_timer.take(), inner.cooldown_ms)
        };
        if let Some(id) = stale {
            self.timers.cancel(id);
            tracing::debug!("pending dissolve reset replaced");
        }

        let weak: Weak<RefCell<CoordinatorInner>> = Rc::downgrade(&self.inner);
        let clock = self.timers.clone();
        let id = self.timers.schedule(cooldown, "dissolve.reset", move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let now = clock.now_ms();
            {
                let mut inner = inner.borrow_mut();
                inner.reset_timer = None;
                inner.dissolve.disarm(now);
                inner.state.dissolve_armed = false;
            }
            emit(&inner, CoordinatorEvent::DissolveReset);
        });
        self.inner.borrow_mut().reset_timer = id;
    }
}

/// Call every handler with no borrow held
fn emit(inner: &RefCell<CoordinatorInner>, event: CoordinatorEvent) {
    let handlers = inner.borrow().handlers.clone();
    for handler in handlers {
        handler(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerQueue;
    use glide_core::ManualClock;

    struct Fixture {
        clock: ManualClock,
        timers: TimerQueue,
        coordinator: TriggerCoordinator,
        events: Rc<RefCell<Vec<CoordinatorEvent>>>,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new();
        let timers = TimerQueue::new(Rc::new(clock.clone()));
        let coordinator = TriggerCoordinator::new(&CoordinatorConfig::default(), timers.handle());
        let events: Rc<RefCell<Vec<CoordinatorEvent>>> = Rc::default();
        let sink = events.clone();
        coordinator.subscribe(move |event| sink.borrow_mut().push(*event));
        Fixture {
            clock,
            timers,
            coordinator,
            events,
        }
    }

    #[test]
    fn test_mutual_exclusion() {
        let f = fixture();
        assert!(f.coordinator.try_activate_primary());
        assert!(!f.coordinator.try_activate_secondary());
        assert!(!f.coordinator.try_activate_primary());
        assert!(f.coordinator.state().primary_active);
        assert!(!f.coordinator.state().secondary_active);

        f.coordinator
            .handle_effect_event(EntityKind::Skier, EffectEvent::Complete);
        assert!(!f.coordinator.state().any_active());
        assert!(f.coordinator.try_activate_secondary());

        assert_eq!(
            *f.events.borrow(),
            vec![
                CoordinatorEvent::Activated(EntityKind::Skier),
                CoordinatorEvent::Rejected(EntityKind::Vehicle),
                CoordinatorEvent::Rejected(EntityKind::Skier),
                CoordinatorEvent::Completed(EntityKind::Skier),
                CoordinatorEvent::Activated(EntityKind::Vehicle),
            ]
        );
    }

    #[test]
    fn test_dissolve_arms_and_resets_after_cooldown() {
        let f = fixture();
        assert!(f.coordinator.try_activate_secondary());
        f.coordinator
            .handle_effect_event(EntityKind::Vehicle, EffectEvent::SecondaryTrigger);
        assert!(f.coordinator.state().dissolve_armed);

        f.clock.advance(2700.0);
        f.coordinator
            .handle_effect_event(EntityKind::Vehicle, EffectEvent::Complete);
        assert!(!f.coordinator.state().secondary_active);
        assert!(f.coordinator.state().dissolve_armed);
        assert!(f.coordinator.is_reset_pending());

        f.clock.advance(9999.0);
        f.timers.fire_due();
        assert!(f.coordinator.state().dissolve_armed);

        f.clock.advance(1.0);
        f.timers.fire_due();
        assert!(!f.coordinator.state().dissolve_armed);
        assert!(!f.coordinator.is_reset_pending());
        assert_eq!(f.events.borrow().last(), Some(&CoordinatorEvent::DissolveReset));
    }

    #[test]
    fn test_second_completion_replaces_pending_reset() {
        let f = fixture();
        f.coordinator.try_activate_secondary();
        f.coordinator
            .handle_effect_event(EntityKind::Vehicle, EffectEvent::SecondaryTrigger);
        f.coordinator
            .handle_effect_event(EntityKind::Vehicle, EffectEvent::Complete);

        f.clock.advance(4000.0);
        f.coordinator
            .handle_effect_event(EntityKind::Vehicle, EffectEvent::Complete);
        assert_eq!(f.timers.len(), 1);

        // The first reset would have fired at 10s
        f.clock.advance(6500.0);
        f.timers.fire_due();
        assert!(f.coordinator.state().dissolve_armed);

        f.clock.advance(3500.0);
        assert_eq!(f.timers.fire_due(), 1);
        assert!(!f.coordinator.state().dissolve_armed);
    }

    #[test]
    fn test_release_vehicle_reverts_dissolve() {
        let f = fixture();
        f.coordinator.try_activate_secondary();
        f.coordinator
            .handle_effect_event(EntityKind::Vehicle, EffectEvent::SecondaryTrigger);
        f.coordinator.release(EntityKind::Vehicle, true);

        let state = f.coordinator.state();
        assert!(!state.secondary_active);
        assert!(!state.dissolve_armed);
        assert_eq!(
            f.events.borrow().last(),
            Some(&CoordinatorEvent::Cancelled(EntityKind::Vehicle))
        );

        // Releasing something idle is silent
        let count = f.events.borrow().len();
        f.coordinator.release(EntityKind::Skier, false);
        assert_eq!(f.events.borrow().len(), count);
    }

    #[test]
    fn test_release_before_melt_keeps_earlier_cooldown() {
        let f = fixture();
        f.coordinator.try_activate_secondary();
        f.coordinator
            .handle_effect_event(EntityKind::Vehicle, EffectEvent::SecondaryTrigger);
        f.coordinator
            .handle_effect_event(EntityKind::Vehicle, EffectEvent::Complete);
        assert!(f.coordinator.is_reset_pending());

        // A second vehicle stopped before it melted anything
        assert!(f.coordinator.try_activate_secondary());
        f.coordinator.release(EntityKind::Vehicle, false);

        let state = f.coordinator.state();
        assert!(!state.secondary_active);
        assert!(state.dissolve_armed);
        assert!(f.coordinator.is_reset_pending());

        f.clock.advance(10_000.0);
        assert_eq!(f.timers.fire_due(), 1);
        assert!(!f.coordinator.state().dissolve_armed);
    }

    #[test]
    fn test_handler_may_reenter() {
        let f = fixture();
        let coordinator = f.coordinator.clone();
        let retried = Rc::new(RefCell::new(None));
        let slot = retried.clone();
        f.coordinator.subscribe(move |event| {
            if *event == CoordinatorEvent::Completed(EntityKind::Skier) {
                *slot.borrow_mut() = Some(coordinator.try_activate_secondary());
            }
        });

        f.coordinator.try_activate_primary();
        f.coordinator
            .handle_effect_event(EntityKind::Skier, EffectEvent::Complete);
        assert_eq!(*retried.borrow(), Some(true));
        assert!(f.coordinator.state().secondary_active);
    }

    #[test]
    fn test_reset_clears_everything() {
        let f = fixture();
        f.coordinator.try_activate_secondary();
        f.coordinator
            .handle_effect_event(EntityKind::Vehicle, EffectEvent::SecondaryTrigger);
        f.coordinator
            .handle_effect_event(EntityKind::Vehicle, EffectEvent::Complete);
        f.coordinator.reset();

        assert_eq!(f.coordinator.state(), TriggerState::default());
        assert!(f.timers.is_empty());
    }

    #[test]
    fn test_trigger_mode() {
        let desktop = Viewport::new(1440.0, 900.0);
        let touch = desktop.with_coarse_pointer(true);
        assert_eq!(TriggerMode::for_viewport(&desktop), TriggerMode::Hover);
        assert_eq!(TriggerMode::for_viewport(&touch), TriggerMode::Tap);
        assert!(TriggerMode::Tap.accepts(TriggerMode::Tap));
        assert!(!TriggerMode::Hover.accepts(TriggerMode::Tap));
        assert_eq!(TriggerMode::from(InputSource::Orientation), TriggerMode::Tap);
    }
}
