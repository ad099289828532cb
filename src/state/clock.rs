//! Frame Clock - The periodic tick source exit strategies count against.
//!
//! One clock is shared by every strategy that needs frames or elapsed time.
//! The host drives it once per frame; strategies subscribe only while they
//! are waiting on an inactive entry.
//!
//! # Pattern
//!
//! - The host calls [`FrameClock::tick`] from its frame loop
//! - Strategies subscribe when their entry goes inactive
//! - Dropping a [`Subscription`] unsubscribes (no leaked callbacks)
//!
//! # Example
//!
//! ```ignore
//! use spark_linger::state::FrameClock;
//!
//! let clock = FrameClock::new();
//! let subscription = clock.subscribe(|now| println!("frame at {now:?}"));
//!
//! clock.tick();          // wall-clock frame
//! drop(subscription);    // stop receiving frames
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use indexmap::IndexMap;

type TickCallback = Rc<dyn Fn(Instant)>;

// =============================================================================
// Clock State
// =============================================================================

struct ClockInner {
    now: Cell<Instant>,
    /// Time moves only through `tick_at`/`advance`
    manual: bool,
    next_id: Cell<u64>,
    subscribers: RefCell<IndexMap<u64, TickCallback>>,
}

/// Shared, single-threaded tick source.
#[derive(Clone)]
pub struct FrameClock {
    inner: Rc<ClockInner>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Wall-clock driven clock starting now.
    pub fn new() -> Self {
        Self::with_mode(Instant::now(), false)
    }

    /// Clock starting at a fixed instant, for hosts that drive time themselves.
    ///
    /// Time on a manual clock only moves when the host ticks it.
    pub fn starting_at(start: Instant) -> Self {
        Self::with_mode(start, true)
    }

    fn with_mode(start: Instant, manual: bool) -> Self {
        Self {
            inner: Rc::new(ClockInner {
                now: Cell::new(start),
                manual,
                next_id: Cell::new(0),
                subscribers: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Time of the most recent tick.
    pub fn now(&self) -> Instant {
        self.inner.now.get()
    }

    /// The time right now, as later ticks will measure it.
    ///
    /// A wall-clock clock may sit idle between frames, so its last tick can
    /// be arbitrarily old: this reads the wall clock (never earlier than the
    /// last tick). A manual clock returns its last tick.
    pub fn current_time(&self) -> Instant {
        let last = self.now();
        if self.inner.manual {
            last
        } else {
            last.max(Instant::now())
        }
    }

    /// True when built with [`starting_at`](Self::starting_at).
    pub fn is_manual(&self) -> bool {
        self.inner.manual
    }

    /// Register a callback run on every tick, in subscription order.
    pub fn subscribe(&self, callback: impl Fn(Instant) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .insert(id, Rc::new(callback));

        Subscription {
            clock: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Tick at the current wall-clock time.
    pub fn tick(&self) {
        self.tick_at(Instant::now());
    }

    /// Tick `step` after the previous tick.
    pub fn advance(&self, step: Duration) {
        self.tick_at(self.now() + step);
    }

    /// Tick at `now`.
    ///
    /// Callbacks may subscribe, unsubscribe or unlist entries. A callback
    /// unsubscribed earlier in the same tick is skipped; one subscribed
    /// during the tick first runs on the next tick.
    pub fn tick_at(&self, now: Instant) {
        self.inner.now.set(now);

        let snapshot: Vec<(u64, TickCallback)> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(id, callback)| (*id, callback.clone()))
            .collect();

        for (id, callback) in snapshot {
            let live = self.inner.subscribers.borrow().contains_key(&id);
            if live {
                callback(now);
            }
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Live tick subscription. Unsubscribes on drop.
pub struct Subscription {
    clock: Weak<ClockInner>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(clock) = self.clock.upgrade() {
            clock.subscribers.borrow_mut().shift_remove(&self.id);
        }
    }
}
