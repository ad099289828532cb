//! # spark-linger
//!
//! Keep removed children rendering until their exit logic lets them go.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! reactivity between the registry and the exit strategies.
//!
//! ## Architecture
//!
//! A lifetime-managed parent renders its children under process-unique
//! identities instead of their logical keys. When the application stops
//! listing a child, the child's entry *detaches*: it keeps its identity and
//! keeps rendering, so the host tree preserves its subtree. Code inside the
//! child sees that it is no longer active and runs its exit (a timer, a few
//! frames, an async task), then *unlists* the entry, which finally removes it.
//!
//! ```text
//! children → flatten → Registry::reconcile → Registry::render → host tree
//!                              ▲                                  │
//!                              └──── unlist ◀── exit strategy ◀───┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Keys, props, content nodes, rendered items
//! - [`engine`] - The registry and the props token side-channel
//! - [`primitives`] - The [`Lifetime`] host adapter and child flattening
//! - [`state`] - Activity queries, frame clock, exit strategies
//! - [`error`] - [`LingerError`]

pub mod engine;
pub mod error;
pub mod primitives;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use engine::Registry;

pub use error::{LingerError, Result};

pub use primitives::{flatten_children, Lifetime, LifetimeProps};

pub use state::{
    is_active, request_unlist, DeferredUnmount, FrameClock, Subscription, SuspendedUnmount,
    TimedUnmount,
};
