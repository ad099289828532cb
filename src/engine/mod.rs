//! Lifetime Engine - Entry registry and the token side-channel.
//!
//! The engine owns the data structures behind a lifetime-managed parent:
//! - Registry: entries, logical-key bindings, reconciliation, unlisting
//! - Token: identity + registry reference injected into rendered props
//! - Ids: process-unique entry identities
//!
//! # Architecture
//!
//! The application lists children by *logical* key. The registry renders
//! them under *physical* keys (entry identities):
//!
//! ```text
//! logical "a" ──binding──▶ entry 9f2c… (active)    ─▶ rendered as 9f2c…
//! (dropped)               entry 41be… (detached)  ─▶ rendered as 41be…
//! ```
//!
//! Because the physical key of a detached entry never changes, the host
//! engine keeps its subtree (and whatever exit animation it runs) alive
//! until the entry is unlisted.

mod ids;
mod registry;
mod token;

pub use registry::Registry;
pub(crate) use token::LifetimeToken;
