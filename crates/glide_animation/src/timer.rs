//! Deferred one-shot callbacks
//!
//! The frame-loop counterpart of `setTimeout`: callbacks run once, on the
//! first [`TimerQueue::fire_due`] at or after their due time. Every timer has
//! a generational [`TimerId`], so cancelling is idempotent and a stale id
//! never reaches a newer timer that happens to reuse its slot.

use glide_core::SharedClock;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Handle to a pending timer
    pub struct TimerId;
}

type TimerCallback = Box<dyn FnOnce()>;

struct Timer {
    due_ms: f64,
    /// Scheduling order, breaks ties between equal due times
    seq: u64,
    label: &'static str,
    callback: TimerCallback,
}

#[derive(Default)]
struct TimerInner {
    timers: SlotMap<TimerId, Timer>,
    next_seq: u64,
}

impl TimerInner {
    fn insert(&mut self, due_ms: f64, label: &'static str, callback: TimerCallback) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.insert(Timer {
            due_ms,
            seq,
            label,
            callback,
        })
    }

    /// Earliest timer due at `now_ms` that was scheduled before `seq_limit`
    fn next_due(&self, now_ms: f64, seq_limit: u64) -> Option<TimerId> {
        self.timers
            .iter()
            .filter(|(_, t)| t.due_ms <= now_ms && t.seq < seq_limit)
            .min_by(|(_, a), (_, b)| {
                a.due_ms
                    .partial_cmp(&b.due_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.seq.cmp(&b.seq))
            })
            .map(|(id, _)| id)
    }
}

/// Owner of all pending timers for one view
pub struct TimerQueue {
    inner: Rc<RefCell<TimerInner>>,
    clock: SharedClock,
}

impl TimerQueue {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TimerInner::default())),
            clock,
        }
    }

    /// Weak handle for scheduling from inside callbacks
    pub fn handle(&self) -> TimerHandle {
        TimerHandle {
            inner: Rc::downgrade(&self.inner),
            clock: self.clock.clone(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Run `callback` once `delay_ms` from now
    pub fn schedule<F>(&self, delay_ms: f64, label: &'static str, callback: F) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        let due = self.clock.now_ms() + sanitize_delay(delay_ms);
        self.inner.borrow_mut().insert(due, label, Box::new(callback))
    }

    /// Cancel a pending timer; returns false if it already fired or was cancelled
    pub fn cancel(&self, id: TimerId) -> bool {
        cancel_in(&self.inner, id)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.inner.borrow().timers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().timers.is_empty()
    }

    /// Run every timer due at the current clock time, earliest first
    ///
    /// Timers scheduled by a callback during this call wait for the next one,
    /// even with a zero delay. Returns the number of callbacks run.
    pub fn fire_due(&self) -> usize {
        let now = self.clock.now_ms();
        let seq_limit = self.inner.borrow().next_seq;
        let mut fired = 0;

        loop {
            // Take one timer out and release the borrow before running it, so
            // the callback can schedule or cancel freely.
            let timer = {
                let mut inner = self.inner.borrow_mut();
                match inner.next_due(now, seq_limit) {
                    Some(id) => inner.timers.remove(id),
                    None => None,
                }
            };
            let Some(timer) = timer else {
                break;
            };
            tracing::debug!(label = timer.label, due_ms = timer.due_ms, "timer fired");
            (timer.callback)();
            fired += 1;
        }

        fired
    }

    /// Drop every pending timer without running it
    pub fn clear(&self) {
        let dropped = {
            let mut inner = self.inner.borrow_mut();
            std::mem::take(&mut inner.timers)
        };
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "pending timers cancelled");
        }
        // Callbacks are dropped here, outside the borrow
        drop(dropped);
    }
}

/// Weak reference to a [`TimerQueue`]
///
/// Operations become no-ops once the queue has been dropped.
#[derive(Clone)]
pub struct TimerHandle {
    inner: Weak<RefCell<TimerInner>>,
    clock: SharedClock,
}

impl TimerHandle {
    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Schedule a timer; `None` when the queue is gone
    pub fn schedule<F>(&self, delay_ms: f64, label: &'static str, callback: F) -> Option<TimerId>
    where
        F: FnOnce() + 'static,
    {
        let inner = self.inner.upgrade()?;
        let due = self.clock.now_ms() + sanitize_delay(delay_ms);
        let id = inner.borrow_mut().insert(due, label, Box::new(callback));
        Some(id)
    }

    pub fn cancel(&self, id: TimerId) -> bool {
        match self.inner.upgrade() {
            Some(inner) => cancel_in(&inner, id),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.borrow().timers.contains_key(id))
            .unwrap_or(false)
    }

    /// Check whether the owning queue still exists
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

fn cancel_in(inner: &RefCell<TimerInner>, id: TimerId) -> bool {
    let removed = inner.borrow_mut().timers.remove(id);
    match removed {
        Some(timer) => {
            tracing::debug!(label = timer.label, "timer cancelled");
            true
        }
        None => false,
    }
}

fn sanitize_delay(delay_ms: f64) -> f64 {
    if delay_ms.is_finite() && delay_ms > 0.0 {
        delay_ms
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glide_core::ManualClock;
    use std::cell::Cell;

    fn queue() -> (ManualClock, TimerQueue) {
        let clock = ManualClock::new();
        let queue = TimerQueue::new(Rc::new(clock.clone()));
        (clock, queue)
    }

    #[test]
    fn test_fires_once_when_due() {
        let (clock, queue) = queue();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = queue.schedule(800.0, "melt", move || h.set(h.get() + 1));

        clock.advance(799.0);
        assert_eq!(queue.fire_due(), 0);
        assert!(queue.is_pending(id));

        clock.advance(1.0);
        assert_eq!(queue.fire_due(), 1);
        assert_eq!(queue.fire_due(), 0);
        assert_eq!(hits.get(), 1);
        assert!(!queue.is_pending(id));
    }

    #[test]
    fn test_fires_in_due_order() {
        let (clock, queue) = queue();
        let order = Rc::new(RefCell::new(Vec::new()));
        for (delay, name) in [(300.0, "c"), (100.0, "a"), (200.0, "b")] {
            let order = order.clone();
            queue.schedule(delay, "order", move || order.borrow_mut().push(name));
        }
        clock.advance(1000.0);
        assert_eq!(queue.fire_due(), 3);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (clock, queue) = queue();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = queue.schedule(10.0, "x", move || h.set(h.get() + 1));

        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        clock.advance(20.0);
        queue.fire_due();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_callback_can_cancel_sibling() {
        let (clock, queue) = queue();
        let handle = queue.handle();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        let sibling = queue.schedule(20.0, "sibling", move || h.set(h.get() + 10));
        queue.schedule(10.0, "first", move || {
            assert!(handle.cancel(sibling));
        });

        clock.advance(50.0);
        assert_eq!(queue.fire_due(), 1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_rescheduled_timer_waits_for_next_pass() {
        let (clock, queue) = queue();
        let handle = queue.handle();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        queue.schedule(0.0, "outer", move || {
            let h = h.clone();
            handle.schedule(0.0, "inner", move || h.set(h.get() + 1));
        });

        clock.advance(1.0);
        assert_eq!(queue.fire_due(), 1);
        assert_eq!(hits.get(), 0);
        assert_eq!(queue.fire_due(), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_clear_and_dead_handle() {
        let (clock, queue) = queue();
        let handle = queue.handle();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = queue.schedule(5.0, "x", move || h.set(1));

        queue.clear();
        clock.advance(10.0);
        assert_eq!(queue.fire_due(), 0);
        assert!(!handle.cancel(id));

        drop(queue);
        assert!(!handle.is_alive());
        assert!(handle.schedule(1.0, "late", || {}).is_none());
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_bad_delays_fire_immediately() {
        let (_clock, queue) = queue();
        queue.schedule(f64::NAN, "nan", || {});
        queue.schedule(-50.0, "negative", || {});
        assert_eq!(queue.fire_due(), 2);
    }
}
