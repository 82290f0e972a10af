//! Cooperative, cancellable timers for staggered member reveals
//!
//! Nothing here runs on its own: the owner calls [`RevealScheduler::run_due`]
//! whenever it gets control (an animation frame, a test step, a sleep loop)
//! and every timer whose deadline has passed on the injected [`Clock`] fires.
//! All state lives on one thread.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

use tracing::trace;

use super::layout::SpiralPosition;

/// Millisecond time source
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Clock that only moves when told to
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Wall clock, counted from construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Each(usize),
    Complete,
}

struct RevealGroup {
    positions: Vec<SpiralPosition>,
    on_each: Box<dyn FnMut(&SpiralPosition)>,
    on_complete: Option<Box<dyn FnOnce()>>,
    cancelled: Rc<Cell<bool>>,
}

#[derive(Default)]
struct TimerQueue {
    /// (deadline, sequence) -> (group, action)
    timers: BTreeMap<(u64, u64), (u64, Action)>,
    groups: HashMap<u64, RevealGroup>,
    next_seq: u64,
    next_group: u64,
}

impl TimerQueue {
    fn push(&mut self, due: u64, group: u64, action: Action) {
        self.timers.insert((due, self.next_seq), (group, action));
        self.next_seq += 1;
    }

    fn pop_due(&mut self, now: u64) -> Option<(u64, Action)> {
        let (&key, _) = self.timers.first_key_value()?;
        if key.0 > now {
            return None;
        }
        self.timers.remove(&key)
    }

    /// Returns the group so its callbacks are dropped after the borrow ends
    fn remove_group(&mut self, group: u64) -> Option<RevealGroup> {
        self.timers.retain(|_, (g, _)| *g != group);
        self.groups.remove(&group)
    }
}

/// Schedules staggered reveals against a clock
///
/// Clones share one timer queue.
#[derive(Clone)]
pub struct RevealScheduler<C: Clock> {
    queue: Rc<RefCell<TimerQueue>>,
    clock: C,
}

impl<C: Clock> RevealScheduler<C> {
    pub fn new(clock: C) -> Self {
        RevealScheduler {
            queue: Rc::new(RefCell::new(TimerQueue::default())),
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Schedules `on_each(position)` at `now + position.reveal_delay_ms`
    ///
    /// Callbacks fire in ascending delay order (input order on ties), and
    /// `on_complete` fires right after the last one. Dropping the returned
    /// handle cancels whatever has not fired yet.
    #[must_use = "dropping the handle cancels the reveal"]
    pub fn reveal<E, F>(
        &self,
        positions: Vec<SpiralPosition>,
        on_each: E,
        on_complete: F,
    ) -> RevealHandle
    where
        E: FnMut(&SpiralPosition) + 'static,
        F: FnOnce() + 'static,
    {
        let now = self.clock.now_ms();
        let cancelled = Rc::new(Cell::new(false));

        let mut queue = self.queue.borrow_mut();
        let group = queue.next_group;
        queue.next_group += 1;

        let mut order: Vec<usize> = (0..positions.len()).collect();
        order.sort_by_key(|&i| positions[i].reveal_delay_ms);

        let mut last_due = now;
        for i in order {
            let due = now.saturating_add(positions[i].reveal_delay_ms);
            queue.push(due, group, Action::Each(i));
            last_due = last_due.max(due);
        }
        queue.push(last_due, group, Action::Complete);

        trace!(group, positions = positions.len(), "reveal scheduled");
        queue.groups.insert(
            group,
            RevealGroup {
                positions,
                on_each: Box::new(on_each),
                on_complete: Some(Box::new(on_complete)),
                cancelled: cancelled.clone(),
            },
        );

        RevealHandle {
            group,
            cancelled,
            queue: Rc::downgrade(&self.queue),
        }
    }

    /// Fires every timer that is due, returns how many callbacks ran
    ///
    /// The queue is not borrowed while a callback runs, so callbacks may
    /// cancel handles or schedule new reveals.
    pub fn run_due(&self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;

        loop {
            let (group_id, mut group, action) = {
                let mut queue = self.queue.borrow_mut();
                let Some((group_id, action)) = queue.pop_due(now) else {
                    break;
                };
                let Some(group) = queue.groups.remove(&group_id) else {
                    continue;
                };
                (group_id, group, action)
            };

            if group.cancelled.get() {
                continue;
            }

            match action {
                Action::Each(i) => {
                    (group.on_each)(&group.positions[i]);
                    fired += 1;
                    // Put the group back unless the callback cancelled it
                    if !group.cancelled.get() {
                        self.queue.borrow_mut().groups.insert(group_id, group);
                    }
                }
                Action::Complete => {
                    if let Some(on_complete) = group.on_complete.take() {
                        on_complete();
                        fired += 1;
                    }
                    trace!(group = group_id, "reveal complete");
                }
            }
        }

        fired
    }

    /// Number of timers not yet fired or cancelled
    pub fn pending(&self) -> usize {
        self.queue.borrow().timers.len()
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue
            .borrow()
            .timers
            .first_key_value()
            .map(|(&(due, _), _)| due)
    }
}

/// Cancellation handle of one reveal
///
/// Cancelling, explicitly or by drop, guarantees that no further callback of
/// the reveal runs and that its pending timers are released.
pub struct RevealHandle {
    group: u64,
    cancelled: Rc<Cell<bool>>,
    queue: Weak<RefCell<TimerQueue>>,
}

impl RevealHandle {
    pub fn cancel(&self) {
        if self.cancelled.replace(true) {
            return;
        }
        if let Some(queue) = self.queue.upgrade() {
            let removed = queue.borrow_mut().remove_group(self.group);
            drop(removed);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

impl fmt::Debug for RevealHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevealHandle")
            .field("group", &self.group)
            .field("cancelled", &self.cancelled.get())
            .finish()
    }
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
