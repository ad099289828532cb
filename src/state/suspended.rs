//! Suspended Unmount - Unlist a detached child when an async exit settles.
//!
//! When the entry goes inactive and a task factory is set, the factory is
//! called once and its future is handed to a driver task that runs it on
//! the tokio `LocalSet` the strategy was attached in. When that future
//! settles (completes, errors, or panics) the entry is unlisted, but only
//! if it is still inactive and no newer exit has started since. A
//! recovered entry survives the settlement of an exit started before it
//! recovered, and a stale exit never cuts a fresh one short.
//!
//! Render passes only queue exits for the driver; they never spawn.
//!
//! # Example
//!
//! ```ignore
//! use spark_linger::state::SuspendedUnmount;
//!
//! let exit = SuspendedUnmount::new(&props)?;
//! exit.set_task(move || {
//!     let conn = conn.clone();
//!     async move { conn.flush().await }
//! });
//! ```
//!
//! # Panics
//!
//! [`SuspendedUnmount::new`] spawns the driver with
//! [`tokio::task::spawn_local`], which panics inside a runtime but outside a
//! `LocalSet`. With no runtime at all it returns
//! [`LingerError::NoRuntime`](crate::LingerError::NoRuntime) instead.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};

use spark_signals::effect;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use super::activity::require_token;
use crate::engine::LifetimeToken;
use crate::error::{LingerError, Result};
use crate::types::Props;

type ExitFuture = Pin<Box<dyn Future<Output = ()>>>;
type TaskFactory = Rc<dyn Fn() -> ExitFuture>;

/// One started exit, tagged with the generation it belongs to.
struct Exit {
    generation: u64,
    future: ExitFuture,
}

// =============================================================================
// Shared State
// =============================================================================

struct SuspendedState {
    token: LifetimeToken,
    task: RefCell<Option<TaskFactory>>,
    started: Cell<bool>,
    generation: Cell<u64>,
    unsettled: Cell<usize>,
    exits: mpsc::UnboundedSender<Exit>,
}

impl SuspendedState {
    fn sync(&self) {
        if self.token.is_active() {
            self.started.set(false);
            return;
        }
        if self.started.get() {
            return;
        }
        let Some(factory) = self.task.borrow().clone() else {
            return;
        };

        self.started.set(true);
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.unsettled.set(self.unsettled.get() + 1);
        debug!(id = %self.token.id(), generation, "suspended unmount started");

        let exit = Exit {
            generation,
            future: factory(),
        };
        if self.exits.send(exit).is_err() {
            // Driver gone with its LocalSet
            self.unsettled.set(self.unsettled.get() - 1);
            warn!(id = %self.token.id(), "suspended unmount driver stopped; exit dropped");
        }
    }

    fn settle(&self, generation: u64) {
        self.unsettled.set(self.unsettled.get().saturating_sub(1));

        if generation != self.generation.get() {
            debug!(id = %self.token.id(), generation, "stale suspended unmount settled");
            return;
        }
        if self.token.is_active() {
            debug!(id = %self.token.id(), "suspended unmount settled after recovery");
            return;
        }
        self.token.unlist();
    }
}

// =============================================================================
// Driver
// =============================================================================

async fn drive(state: Weak<SuspendedState>, mut exits: mpsc::UnboundedReceiver<Exit>) {
    let mut running = JoinSet::new();
    while let Some(exit) = exits.recv().await {
        while running.try_join_next().is_some() {}
        running.spawn_local(settle(state.clone(), exit));
    }
    while running.join_next().await.is_some() {}
}

async fn settle(state: Weak<SuspendedState>, exit: Exit) {
    // Own task, so a panic settles it as well
    let _ = tokio::task::spawn_local(exit.future).await;
    if let Some(state) = state.upgrade() {
        state.settle(exit.generation);
    }
}

// =============================================================================
// Accessor
// =============================================================================

/// Unlists its entry once an async exit computation settles.
pub struct SuspendedUnmount {
    state: Rc<SuspendedState>,
    driver: JoinHandle<()>,
    stop_effect: Option<Box<dyn FnOnce()>>,
}

impl SuspendedUnmount {
    /// Attach to the entry behind `props` with no task set.
    ///
    /// Must be called from inside a `LocalSet`; exits run there no matter
    /// where later render passes happen.
    pub fn new(props: &Props) -> Result<Self> {
        let token = require_token(props, "SuspendedUnmount")?;
        if Handle::try_current().is_err() {
            return Err(LingerError::NoRuntime {
                accessor: "SuspendedUnmount",
            });
        }
        let epoch = token.registry().map(|registry| registry.activity_epoch());

        let (tx, rx) = mpsc::unbounded_channel();
        let state = Rc::new(SuspendedState {
            token,
            task: RefCell::new(None),
            started: Cell::new(false),
            generation: Cell::new(0),
            unsettled: Cell::new(0),
            exits: tx,
        });
        let driver = tokio::task::spawn_local(drive(Rc::downgrade(&state), rx));

        let weak: Weak<SuspendedState> = Rc::downgrade(&state);
        let stop_effect: Option<Box<dyn FnOnce()>> = epoch.map(|epoch| {
            Box::new(effect(move || {
                let _ = epoch.get();
                if let Some(state) = weak.upgrade() {
                    state.sync();
                }
            })) as Box<dyn FnOnce()>
        });

        Ok(Self {
            state,
            driver,
            stop_effect,
        })
    }

    /// Set the exit computation. Its output is ignored.
    ///
    /// Starts it right away if the entry is already inactive and no exit
    /// has been started since it went inactive.
    pub fn set_task<F, Fut>(&self, task: F)
    where
        F: Fn() -> Fut + 'static,
        Fut: Future + 'static,
    {
        let factory: TaskFactory = Rc::new(move || {
            let exit = task();
            Box::pin(async move {
                let _ = exit.await;
            }) as ExitFuture
        });
        *self.state.task.borrow_mut() = Some(factory);
        self.state.sync();
    }

    /// Forget the exit computation. One already running still settles.
    pub fn clear_task(&self) {
        self.state.task.borrow_mut().take();
    }

    pub fn has_task(&self) -> bool {
        self.state.task.borrow().is_some()
    }

    /// True while a started exit has not settled.
    pub fn is_pending(&self) -> bool {
        self.state.unsettled.get() > 0
    }
}

impl Drop for SuspendedUnmount {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_effect.take() {
            stop();
        }
        // Dropping the driver's JoinSet aborts every running settlement
        self.driver.abort();
    }
}
