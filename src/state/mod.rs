//! State for code running inside a managed child.
//!
//! - [`activity`] - fail-open activity query and manual unlist request
//! - [`clock`] - the shared frame clock strategies count against
//! - [`timed`] - unlist after a time span
//! - [`deferred`] - unlist after a number of frames
//! - [`suspended`] - unlist when an async exit settles
//!
//! Attach one strategy per child. Strategies do not coordinate: with more
//! than one attached, whichever finishes first unlists the entry and the
//! others are left mid-count.

pub mod activity;
pub mod clock;
pub mod deferred;
pub mod suspended;
pub mod timed;

pub use activity::{is_active, request_unlist};
pub use clock::{FrameClock, Subscription};
pub use deferred::DeferredUnmount;
pub use suspended::SuspendedUnmount;
pub use timed::TimedUnmount;
