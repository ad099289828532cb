//! Deferred Unmount - Unlist a detached child after a number of frames.
//!
//! Counts [`FrameClock`] ticks while the entry is inactive and unlists it
//! once the count reaches the threshold (default 1: the frame after
//! detaching). The count resets whenever the entry becomes active again.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use spark_signals::effect;
use tracing::debug;

use super::activity::require_token;
use super::clock::{FrameClock, Subscription};
use crate::engine::LifetimeToken;
use crate::error::Result;
use crate::types::Props;

struct DeferredState {
    token: LifetimeToken,
    clock: FrameClock,
    threshold: Cell<u32>,
    frames: Cell<u32>,
    subscription: RefCell<Option<Subscription>>,
    finished: Cell<bool>,
}

impl DeferredState {
    fn sync(self: &Rc<Self>) {
        if self.finished.get() {
            return;
        }
        if self.token.is_active() {
            self.reset();
            return;
        }
        if self.subscription.borrow().is_none() {
            let weak: Weak<Self> = Rc::downgrade(self);
            let subscription = self.clock.subscribe(move |_| {
                if let Some(state) = weak.upgrade() {
                    state.on_tick();
                }
            });
            *self.subscription.borrow_mut() = Some(subscription);
        }
    }

    fn on_tick(&self) {
        if self.token.is_active() {
            self.reset();
            return;
        }

        let frames = self.frames.get() + 1;
        self.frames.set(frames);
        if frames >= self.threshold.get() {
            debug!(id = %self.token.id(), frames, "deferred unmount reached threshold");
            self.finished.set(true);
            self.subscription.borrow_mut().take();
            self.token.unlist();
        }
    }

    fn reset(&self) {
        self.frames.set(0);
        self.subscription.borrow_mut().take();
    }
}

/// Unlists its entry after it has stayed inactive for `threshold` frames.
pub struct DeferredUnmount {
    state: Rc<DeferredState>,
    stop_effect: Option<Box<dyn FnOnce()>>,
}

impl DeferredUnmount {
    /// Attach with the default threshold of one frame.
    pub fn new(props: &Props, clock: &FrameClock) -> Result<Self> {
        Self::with_threshold(props, clock, 1)
    }

    /// Attach to the entry behind `props`, unlisting after `threshold` frames.
    pub fn with_threshold(props: &Props, clock: &FrameClock, threshold: u32) -> Result<Self> {
        let token = require_token(props, "DeferredUnmount")?;
        let epoch = token.registry().map(|registry| registry.activity_epoch());

        let state = Rc::new(DeferredState {
            token,
            clock: clock.clone(),
            threshold: Cell::new(threshold),
            frames: Cell::new(0),
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

    pub fn threshold(&self) -> u32 {
        self.state.threshold.get()
    }

    /// Change the threshold. Takes effect on the next frame.
    pub fn set_threshold(&self, threshold: u32) {
        self.state.threshold.set(threshold);
    }

    /// Frames counted since the entry went inactive.
    pub fn frames(&self) -> u32 {
        self.state.frames.get()
    }
}

impl Drop for DeferredUnmount {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_effect.take() {
            stop();
        }
        self.state.subscription.borrow_mut().take();
    }
}
