//! Frame scheduler
//!
//! Drives repeating tick callbacks, one per display refresh. The host calls
//! [`FrameScheduler::tick`] from its frame callback; every live loop receives
//! its elapsed time since it started, read fresh from the clock, and answers
//! [`Flow::Continue`] or [`Flow::Stop`].
//!
//! State sits behind `Rc<RefCell<_>>` and callbacks reach it through a weak
//! [`SchedulerHandle`]. No borrow is held while a callback runs, so callbacks
//! may start or cancel loops, including their own.

use glide_core::SharedClock;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Handle to a running frame loop
    pub struct LoopId;
}

/// What a loop wants after a tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Run again next frame
    Continue,
    /// Release the loop
    Stop,
}

/// Timing handed to a tick callback
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickContext {
    pub id: LoopId,
    /// Milliseconds since the loop started; never decreases
    pub elapsed_ms: f64,
    /// Clock reading for this frame
    pub now_ms: f64,
}

type TickFn = Box<dyn FnMut(&TickContext) -> Flow>;

struct FrameLoop {
    started_at_ms: f64,
    last_elapsed_ms: f64,
    label: &'static str,
    /// Taken out while the callback runs
    on_tick: Option<TickFn>,
}

#[derive(Default)]
struct SchedulerInner {
    loops: SlotMap<LoopId, FrameLoop>,
}

/// Owner of all frame loops for one view
pub struct FrameScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
    clock: SharedClock,
}

impl FrameScheduler {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner::default())),
            clock,
        }
    }

    /// Get a handle for starting and cancelling loops from callbacks
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
            clock: self.clock.clone(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Start a loop; its first tick happens on the next [`tick`](Self::tick)
    pub fn start<F>(&self, label: &'static str, on_tick: F) -> LoopId
    where
        F: FnMut(&TickContext) -> Flow + 'static,
    {
        start_in(&self.inner, self.clock.now_ms(), label, Box::new(on_tick))
    }

    /// Stop a loop; returns false if it was not running
    pub fn cancel(&self, id: LoopId) -> bool {
        cancel_in(&self.inner, id)
    }

    pub fn is_active(&self, id: LoopId) -> bool {
        self.inner.borrow().loops.contains_key(id)
    }

    pub fn active_count(&self) -> usize {
        self.inner.borrow().loops.len()
    }

    /// Tick every loop once
    ///
    /// Loops started during this call wait for the next frame. Returns true if
    /// any loop is still active (the host should request another frame).
    pub fn tick(&self) -> bool {
        let now = self.clock.now_ms();
        let ids: Vec<LoopId> = self.inner.borrow().loops.keys().collect();

        for id in ids {
            let prepared = {
                let mut inner = self.inner.borrow_mut();
                // Cancelled earlier in this frame
                let Some(entry) = inner.loops.get_mut(id) else {
                    continue;
                };
                let elapsed = (now - entry.started_at_ms).max(entry.last_elapsed_ms);
                entry.last_elapsed_ms = elapsed;
                entry.on_tick.take().map(|f| (f, elapsed))
            };
            let Some((mut on_tick, elapsed_ms)) = prepared else {
                continue;
            };

            let ctx = TickContext {
                id,
                elapsed_ms,
                now_ms: now,
            };
            let flow = on_tick(&ctx);

            // A loop cancelled from inside its own callback is already gone;
            // its closure is then dropped at the end of this iteration.
            let finished = {
                let mut inner = self.inner.borrow_mut();
                match flow {
                    Flow::Continue => {
                        if let Some(entry) = inner.loops.get_mut(id) {
                            entry.on_tick = Some(on_tick);
                        }
                        None
                    }
                    Flow::Stop => inner.loops.remove(id),
                }
            };
            if let Some(entry) = finished {
                tracing::debug!(label = entry.label, elapsed_ms, "frame loop finished");
            }
        }

        !self.inner.borrow().loops.is_empty()
    }

    /// Cancel every loop
    pub fn clear(&self) {
        let dropped = {
            let mut inner = self.inner.borrow_mut();
            std::mem::take(&mut inner.loops)
        };
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "frame loops cancelled");
        }
        drop(dropped);
    }
}

/// Weak reference to a [`FrameScheduler`]
///
/// Operations become no-ops once the scheduler has been dropped.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
    clock: SharedClock,
}

impl SchedulerHandle {
    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Start a loop; `None` when the scheduler is gone
    pub fn start<F>(&self, label: &'static str, on_tick: F) -> Option<LoopId>
    where
        F: FnMut(&TickContext) -> Flow + 'static,
    {
        let inner = self.inner.upgrade()?;
        Some(start_in(&inner, self.clock.now_ms(), label, Box::new(on_tick)))
    }

    pub fn cancel(&self, id: LoopId) -> bool {
        match self.inner.upgrade() {
            Some(inner) => cancel_in(&inner, id),
            None => false,
        }
    }

    pub fn is_active(&self, id: LoopId) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.borrow().loops.contains_key(id))
            .unwrap_or(false)
    }

    /// Check whether the owning scheduler still exists
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

fn start_in(
    inner: &RefCell<SchedulerInner>,
    now_ms: f64,
    label: &'static str,
    on_tick: TickFn,
) -> LoopId {
    let id = inner.borrow_mut().loops.insert(FrameLoop {
        started_at_ms: now_ms,
        last_elapsed_ms: 0.0,
        label,
        on_tick: Some(on_tick),
    });
    tracing::debug!(label, "frame loop started");
    id
}

fn cancel_in(inner: &RefCell<SchedulerInner>, id: LoopId) -> bool {
    let removed = inner.borrow_mut().loops.remove(id);
    match removed {
        Some(entry) => {
            tracing::debug!(label = entry.label, "frame loop cancelled");
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glide_core::ManualClock;
    use std::cell::Cell;

    fn scheduler() -> (ManualClock, FrameScheduler) {
        let clock = ManualClock::starting_at(1000.0);
        let scheduler = FrameScheduler::new(Rc::new(clock.clone()));
        (clock, scheduler)
    }

    #[test]
    fn test_elapsed_is_read_from_clock() {
        let (clock, scheduler) = scheduler();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        scheduler.start("probe", move |ctx| {
            s.borrow_mut().push(ctx.elapsed_ms);
            Flow::Continue
        });

        clock.advance(16.0);
        scheduler.tick();
        clock.advance(250.0);
        scheduler.tick();
        scheduler.tick();

        assert_eq!(*seen.borrow(), vec![16.0, 266.0, 266.0]);
    }

    #[test]
    fn test_stop_releases_loop() {
        let (clock, scheduler) = scheduler();
        let ticks = Rc::new(Cell::new(0));
        let t = ticks.clone();
        let id = scheduler.start("short", move |ctx| {
            t.set(t.get() + 1);
            if ctx.elapsed_ms >= 32.0 {
                Flow::Stop
            } else {
                Flow::Continue
            }
        });

        for _ in 0..5 {
            clock.advance(16.0);
            scheduler.tick();
        }

        assert_eq!(ticks.get(), 2);
        assert!(!scheduler.is_active(id));
        assert!(!scheduler.tick());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (_clock, scheduler) = scheduler();
        let id = scheduler.start("noop", |_| Flow::Continue);
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_cancel_self_from_callback() {
        let (clock, scheduler) = scheduler();
        let handle = scheduler.handle();
        let ticks = Rc::new(Cell::new(0));
        let t = ticks.clone();
        scheduler.start("self-cancel", move |ctx| {
            t.set(t.get() + 1);
            handle.cancel(ctx.id);
            Flow::Continue
        });

        clock.advance(16.0);
        scheduler.tick();
        scheduler.tick();
        assert_eq!(ticks.get(), 1);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_cancel_later_loop_in_same_frame() {
        let (clock, scheduler) = scheduler();
        let handle = scheduler.handle();
        let victim_ticks = Rc::new(Cell::new(0));

        let victim_slot: Rc<Cell<Option<LoopId>>> = Rc::new(Cell::new(None));
        let slot = victim_slot.clone();
        scheduler.start("killer", move |_| {
            if let Some(victim) = slot.get() {
                handle.cancel(victim);
            }
            Flow::Stop
        });
        let v = victim_ticks.clone();
        let victim = scheduler.start("victim", move |_| {
            v.set(v.get() + 1);
            Flow::Continue
        });
        victim_slot.set(Some(victim));

        clock.advance(16.0);
        scheduler.tick();
        assert_eq!(victim_ticks.get(), 0);
        assert!(!scheduler.is_active(victim));
    }

    #[test]
    fn test_loop_started_in_tick_waits() {
        let (clock, scheduler) = scheduler();
        let handle = scheduler.handle();
        let child_ticks = Rc::new(Cell::new(0));
        let c = child_ticks.clone();
        scheduler.start("parent", move |_| {
            let c = c.clone();
            handle.start("child", move |_| {
                c.set(c.get() + 1);
                Flow::Stop
            });
            Flow::Stop
        });

        clock.advance(16.0);
        assert!(scheduler.tick());
        assert_eq!(child_ticks.get(), 0);
        clock.advance(16.0);
        assert!(!scheduler.tick());
        assert_eq!(child_ticks.get(), 1);
    }

    #[test]
    fn test_dropped_scheduler_disables_handle() {
        let (_clock, scheduler) = scheduler();
        let handle = scheduler.handle();
        let id = scheduler.start("noop", |_| Flow::Continue);
        drop(scheduler);
        assert!(!handle.is_alive());
        assert!(!handle.is_active(id));
        assert!(!handle.cancel(id));
        assert!(handle.start("late", |_| Flow::Stop).is_none());
    }
}
