//! Lifetime Primitives - The managed parent and its child handling.
//!
//! - [`Lifetime`] - Host adapter: flatten, reconcile, render by identity
//! - [`flatten_children`] - Nested content to an ordered logical mapping
//!
//! # Children
//!
//! Children are [`Node`](crate::Node)s. Elements receive a lifetime token in
//! their props when rendered; text leaves are passed through untouched.
//! Lists are flattened. Fragments and host primitives are rejected, since
//! they have no props to carry a token:
//!
//! ```ignore
//! // CORRECT - a component the exit strategy can run inside
//! Element::new("FadingRow").key("a").into()
//!
//! // WRONG - a bare host box has nowhere to receive the token
//! Node::Primitive("box".into())
//! ```

mod children;
mod lifetime;

pub use children::flatten_children;
pub use lifetime::{Lifetime, LifetimeProps};
