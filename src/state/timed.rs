//! Timed Unmount - Unlist a detached child after a fixed time.
//!
//! # Lifecycle
//!
//! - Entry goes inactive: [`FrameClock::current_time`] is captured and the
//!   strategy subscribes to the [`FrameClock`]. The capture is fresh even
//!   when the clock has not ticked for a while.
//! - Each tick while inactive: once more than `lifetime` has elapsed since
//!   the capture, the entry is unlisted
//! - Entry becomes active again (recovery): the captured time is cleared
//!   and the subscription dropped; the countdown re-arms on the next
//!   inactivation
//! - Handle dropped: effect stopped, subscription dropped
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use spark_linger::state::{FrameClock, TimedUnmount};
//!
//! // Inside the child component, once per mount
//! let fade = TimedUnmount::new(&props, &clock, Some(Duration::from_millis(300)))?;
//!
//! // Later, e.g. from a theme change
//! fade.set_lifetime(Some(Duration::from_millis(150)));
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use spark_signals::effect;
use tracing::debug;

use super::activity::require_token;
use super::clock::{FrameClock, Subscription};
use crate::engine::LifetimeToken;
use crate::error::Result;
use crate::types::Props;

struct TimedState {
    token: LifetimeToken,
    clock: FrameClock,
    lifetime: Cell<Option<Duration>>,
    started_at: Cell<Option<Instant>>,
    subscription: RefCell<Option<Subscription>>,
    finished: Cell<bool>,
}

impl TimedState {
    fn sync(self: &Rc<Self>) {
        if self.finished.get() {
            return;
        }
        if self.token.is_active() {
            self.reset();
            return;
        }

        if self.started_at.get().is_none() {
            self.started_at.set(Some(self.clock.current_time()));
        }
        if self.subscription.borrow().is_none() {
            let weak: Weak<Self> = Rc::downgrade(self);
            let subscription = self.clock.subscribe(move |now| {
                if let Some(state) = weak.upgrade() {
                    state.on_tick(now);
                }
            });
            *self.subscription.borrow_mut() = Some(subscription);
        }
    }

    fn on_tick(&self, now: Instant) {
        if self.token.is_active() {
            self.reset();
            return;
        }
        let (Some(started), Some(lifetime)) = (self.started_at.get(), self.lifetime.get()) else {
            return;
        };

        if now.saturating_duration_since(started) > lifetime {
            debug!(id = %self.token.id(), ?lifetime, "timed unmount elapsed");
            self.finished.set(true);
            self.subscription.borrow_mut().take();
            self.token.unlist();
        }
    }

    fn reset(&self) {
        self.started_at.set(None);
        self.subscription.borrow_mut().take();
    }
}

/// Unlists its entry once it has been inactive for longer than `lifetime`.
///
/// With no lifetime set the countdown never completes; set one later with
/// [`set_lifetime`](Self::set_lifetime).
pub struct TimedUnmount {
    state: Rc<TimedState>,
    stop_effect: Option<Box<dyn FnOnce()>>,
}

impl TimedUnmount {
    /// Attach to the entry behind `props`.
    ///
    /// Fails with [`LingerError::MissingToken`](crate::LingerError::MissingToken)
    /// when `props` were not rendered by a lifetime-managed parent.
    pub fn new(props: &Props, clock: &FrameClock, lifetime: Option<Duration>) -> Result<Self> {
        let token = require_token(props, "TimedUnmount")?;
        let epoch = token.registry().map(|registry| registry.activity_epoch());

        let state = Rc::new(TimedState {
            token,
            clock: clock.clone(),
            lifetime: Cell::new(lifetime),
            started_at: Cell::new(None),
            subscription: RefCell::new(None),
            finished: Cell::new(false),
        });

        let weak = Rc::downgrade(&state);
        let stop_effect: Option<Box<dyn FnOnce()>> = match epoch {
            Some(epoch) => Some(Box::new(effect(move || {
                let _ = epoch.get();
                if let Some(state) = weak.upgrade() {
                    state.sync();
                }
            }))),
            None => {
                state.sync();
                None
            }
        };

        Ok(Self { state, stop_effect })
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.state.lifetime.get()
    }

    /// Replace the lifetime. A running countdown keeps its start time.
    pub fn set_lifetime(&self, lifetime: Option<Duration>) {
        self.state.lifetime.set(lifetime);
    }

    /// Clock time captured when the entry went inactive.
    pub fn started_at(&self) -> Option<Instant> {
        self.state.started_at.get()
    }

    /// True while subscribed to the clock.
    pub fn is_counting(&self) -> bool {
        self.state.subscription.borrow().is_some()
    }
}

impl Drop for TimedUnmount {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_effect.take() {
            stop();
        }
        self.state.subscription.borrow_mut().take();
    }
}
