//! The host-facing stage
//!
//! One [`Stage`] per page view. It owns the frame scheduler, the timer queue,
//! the trigger coordinator and the parallax tracker, and exposes the four
//! things a host needs: trigger effects, feed input, tick once per display
//! refresh, and read back a [`RenderFrame`] to draw.
//!
//! Dropping the stage (or calling [`Stage::teardown`]) cancels every loop and
//! timer; no completion callback fires afterwards.

use glide_animation::{
    launch, ContainerVisual, CoordinatorEvent, DissolveVisual, Effect, EffectEvent,
    EffectListener, EffectRun, EffectState, EntityKind, FrameScheduler, MotionConfig,
    ParallaxTracker, ParallaxTransform, ParticleVisual, PointerState, SkierEffect, TimerQueue,
    TriggerCoordinator, TriggerMode, TriggerState, VehicleEffect,
};
use glide_core::{InputEvent, Point, SharedClock, SystemClock, Viewport};
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::Rc;

new_key_type! {
    /// Handle to an activated effect
    pub struct EffectHandle;
}

/// One-shot callback run on an effect milestone
pub type Callback = Box<dyn FnOnce()>;

/// Options for [`Stage::activate`]
#[derive(Default)]
pub struct ActivateConfig {
    /// Vehicle dock point; the configured default when `None`
    pub dock: Option<Point>,
    /// Runs once when the effect completes
    pub on_complete: Option<Callback>,
    /// Runs once when the vehicle signals the dependent dissolve
    pub on_secondary_effect_start: Option<Callback>,
}

impl ActivateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dock(mut self, dock: Point) -> Self {
        self.dock = Some(dock);
        self
    }

    pub fn on_complete<F: FnOnce() + 'static>(mut self, f: F) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn on_secondary_effect_start<F: FnOnce() + 'static>(mut self, f: F) -> Self {
        self.on_secondary_effect_start = Some(Box::new(f));
        self
    }
}

/// Drawable state of one effect entity
#[derive(Clone, Debug, PartialEq)]
pub struct EntityFrame {
    pub handle: EffectHandle,
    pub kind: EntityKind,
    pub state: EffectState,
    pub position: Point,
    pub rotation_deg: f32,
    /// Oscillation already included in `position`
    pub bob: f32,
    pub progress: f32,
    /// Particles still fading, oldest first
    pub particles: Vec<ParticleVisual>,
    pub containers: Vec<ContainerVisual>,
}

/// Everything the host draws for one frame
#[derive(Clone, Debug, PartialEq)]
pub struct RenderFrame {
    pub now_ms: f64,
    pub entities: Vec<EntityFrame>,
    /// One entry per dissolving item, in stagger order
    pub dissolve: Vec<DissolveVisual>,
    pub parallax: ParallaxTransform,
    pub trigger: TriggerState,
}

impl RenderFrame {
    pub fn entity(&self, kind: EntityKind) -> Option<&EntityFrame> {
        self.entities.iter().find(|e| e.kind == kind)
    }
}

/// Motion engine for one page view
pub struct Stage {
    config: MotionConfig,
    viewport: Viewport,
    clock: SharedClock,
    scheduler: FrameScheduler,
    timers: TimerQueue,
    coordinator: TriggerCoordinator,
    tracker: ParallaxTracker,
    trigger_mode: TriggerMode,
    runs: RefCell<SlotMap<EffectHandle, EffectRun>>,
    last_tick_ms: Option<f64>,
}

impl Stage {
    pub fn new(config: MotionConfig, viewport: Viewport, clock: SharedClock) -> Self {
        let viewport = viewport.sanitized();
        let scheduler = FrameScheduler::new(clock.clone());
        let timers = TimerQueue::new(clock.clone());
        let coordinator = TriggerCoordinator::new(&config.coordinator, timers.handle());
        let tracker = ParallaxTracker::new(&config.parallax, viewport);
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            source = ?tracker.source(),
            "stage created"
        );
        Self {
            trigger_mode: TriggerMode::for_viewport(&viewport),
            config,
            viewport,
            clock,
            scheduler,
            timers,
            coordinator,
            tracker,
            runs: RefCell::new(SlotMap::with_key()),
            last_tick_ms: None,
        }
    }

    /// Stage driven by the wall clock
    pub fn with_system_clock(config: MotionConfig, viewport: Viewport) -> Self {
        Self::new(config, viewport, Rc::new(SystemClock::new()))
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn trigger_mode(&self) -> TriggerMode {
        self.trigger_mode
    }

    pub fn trigger_state(&self) -> TriggerState {
        self.coordinator.state()
    }

    /// True while the dissolve cooldown timer is waiting to fire
    pub fn dissolve_reset_pending(&self) -> bool {
        self.coordinator.is_reset_pending()
    }

    /// Register a handler for coordinator events
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&CoordinatorEvent) + 'static,
    {
        self.coordinator.subscribe(handler);
    }

    /// Number of effects that have not completed
    pub fn active_effects(&self) -> usize {
        self.runs.borrow().len()
    }

    /// Number of frame loops still requesting ticks
    pub fn active_loops(&self) -> usize {
        self.scheduler.active_count()
    }

    /// Start an effect
    ///
    /// Returns `None` when another effect is already running.
    pub fn activate(&self, kind: EntityKind, options: ActivateConfig) -> Option<EffectHandle> {
        if !self.coordinator.try_activate(kind) {
            return None;
        }

        let now = self.clock.now_ms();
        let effect = match kind {
            EntityKind::Vehicle => {
                let dock = options.dock.unwrap_or(self.config.vehicle.dock);
                Effect::Vehicle(VehicleEffect::new(
                    &self.config.vehicle,
                    self.viewport,
                    dock,
                    now,
                ))
            }
            EntityKind::Skier => {
                Effect::Skier(SkierEffect::new(&self.config.skier, self.viewport, now))
            }
        };

        let listener = self.listener(options);
        let Some(run) = launch(
            effect,
            &self.scheduler.handle(),
            &self.timers.handle(),
            listener,
        ) else {
            self.coordinator.release(kind, false);
            return None;
        };

        let handle = self.runs.borrow_mut().insert(run);
        tracing::debug!(effect = kind.name(), "effect activated");
        Some(handle)
    }

    /// Activate in response to a user gesture
    ///
    /// Hover gestures only trigger on fine pointers and taps only on coarse
    /// ones; the other kind is ignored.
    pub fn trigger(
        &self,
        kind: EntityKind,
        gesture: TriggerMode,
        options: ActivateConfig,
    ) -> Option<EffectHandle> {
        if !self.trigger_mode.accepts(gesture) {
            tracing::debug!(?gesture, mode = ?self.trigger_mode, "gesture ignored");
            return None;
        }
        self.activate(kind, options)
    }

    /// Stop an effect early; no further callbacks fire for it
    ///
    /// Returns false for unknown or already completed handles.
    pub fn cancel(&self, handle: EffectHandle) -> bool {
        let removed = self.runs.borrow_mut().remove(handle);
        let Some(run) = removed else {
            return false;
        };
        let kind = run.kind();
        let complete = run.is_complete();
        let armed_dissolve = run.effect().state() == EffectState::Dissolving;
        run.cancel(&self.scheduler.handle(), &self.timers.handle());
        drop(run);
        if complete {
            return false;
        }
        self.coordinator.release(kind, armed_dissolve);
        tracing::debug!(effect = kind.name(), "effect cancelled");
        true
    }

    /// Feed one input event
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        if let InputEvent::Resized(viewport) = event {
            self.viewport = viewport.sanitized();
            self.trigger_mode = TriggerMode::for_viewport(&self.viewport);
        }
        self.tracker.handle_input(&event)
    }

    pub fn parallax(&self) -> ParallaxTransform {
        self.tracker.transform()
    }

    pub fn pointer_state(&self) -> PointerState {
        self.tracker.state()
    }

    /// Advance everything by one display frame
    ///
    /// Returns true while anything is still moving, i.e. the host should
    /// request another frame.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now_ms();
        let dt_secs = self
            .last_tick_ms
            .map(|last| ((now - last) / 1000.0) as f32)
            .unwrap_or(0.0);
        self.last_tick_ms = Some(now);

        let parallax_moving = self.tracker.update(dt_secs);
        self.scheduler.tick();
        self.timers.fire_due();
        self.prune_completed();

        parallax_moving
            || self.scheduler.active_count() > 0
            || !self.timers.is_empty()
            || self
                .coordinator
                .dissolve_animating(self.config.coordinator.dissolve.items)
    }

    /// Snapshot of everything to draw at the current clock time
    pub fn frame(&self) -> RenderFrame {
        let now = self.clock.now_ms();
        let entities = self
            .runs
            .borrow()
            .iter()
            .map(|(handle, run)| {
                let effect = run.effect();
                let sample = effect.sample();
                EntityFrame {
                    handle,
                    kind: effect.kind(),
                    state: effect.state(),
                    position: sample.position,
                    rotation_deg: sample.rotation_deg,
                    bob: sample.bob,
                    progress: sample.progress,
                    particles: effect.particles().visuals(now),
                    containers: effect
                        .containers()
                        .iter()
                        .filter(|container| !container.is_finished(now))
                        .map(|container| container.sample(now))
                        .collect(),
                }
            })
            .collect();

        let dissolve = (0..self.config.coordinator.dissolve.items)
            .map(|index| self.coordinator.dissolve_visual(index))
            .collect();

        RenderFrame {
            now_ms: now,
            entities,
            dissolve,
            parallax: self.tracker.transform(),
            trigger: self.coordinator.state(),
        }
    }

    /// Cancel every loop and timer and forget all state
    pub fn teardown(&mut self) {
        self.scheduler.clear();
        self.timers.clear();
        let runs = std::mem::take(&mut *self.runs.borrow_mut());
        let count = runs.len();
        drop(runs);
        self.coordinator.reset();
        self.last_tick_ms = None;
        if count > 0 {
            tracing::debug!(count, "stage torn down with effects in flight");
        }
    }

    fn listener(&self, options: ActivateConfig) -> EffectListener {
        let coordinator = self.coordinator.clone();
        let on_complete = RefCell::new(options.on_complete);
        let on_secondary = RefCell::new(options.on_secondary_effect_start);
        Rc::new(move |kind: EntityKind, event: EffectEvent| {
            coordinator.handle_effect_event(kind, event);
            let callback = match event {
                EffectEvent::SecondaryTrigger => on_secondary.borrow_mut().take(),
                EffectEvent::Complete => on_complete.borrow_mut().take(),
                EffectEvent::Docked => None,
            };
            if let Some(callback) = callback {
                callback();
            }
        })
    }

    fn prune_completed(&self) {
        let finished: Vec<EffectRun> = {
            let mut runs = self.runs.borrow_mut();
            let done: Vec<EffectHandle> = runs
                .iter()
                .filter(|(_, run)| run.is_complete())
                .map(|(handle, _)| handle)
                .collect();
            done.into_iter().filter_map(|h| runs.remove(h)).collect()
        };
        for run in &finished {
            tracing::debug!(effect = run.kind().name(), "effect finished");
        }
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        self.teardown();
    }
}
