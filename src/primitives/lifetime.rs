//! Lifetime Primitive - A parent that keeps removed children rendering.
//!
//! `Lifetime` is the glue between a host render cycle and a [`Registry`]:
//! 1. Flatten the parent's children into a logical `key -> content` mapping
//! 2. Reconcile the registry against it (with the configured recovery flag)
//! 3. Flush reactive effects so exit strategies observe the new activity
//! 4. Hand the physical, identity-keyed child set back to the host
//!
//! Children dropped by the application stay in the output, detached, until
//! their exit strategy unlists them. Unlisting bumps
//! [`render_requests`](Lifetime::render_requests) so the host schedules the
//! next pass.
//!
//! # Example
//!
//! ```ignore
//! use spark_linger::{Lifetime, LifetimeProps, Element};
//! use spark_signals::effect;
//!
//! let lifetime = Lifetime::new();
//! let requests = lifetime.render_requests();
//!
//! let rendered = lifetime.render(&LifetimeProps {
//!     can_recover: true,
//!     children: vec![Element::new("Toast").key("saved").into()],
//! })?;
//!
//! // Re-render whenever an entry finishes its exit
//! let _stop = effect(move || {
//!     let _ = requests.get();
//!     // schedule host render...
//! });
//! ```

use std::cell::Cell;
use std::rc::Rc;

use spark_signals::{flush_sync, signal, Signal};
use tracing::trace;

use super::children::flatten_children;
use crate::engine::Registry;
use crate::error::Result;
use crate::types::{Node, Rendered};

// =============================================================================
// Lifetime Props
// =============================================================================

/// Configuration and children of a lifetime-managed parent.
///
/// Read once per render pass.
///
/// ```ignore
/// LifetimeProps {
///     can_recover: true,
///     children: items.iter().map(|i| Element::new("Row").key(i.id.as_str()).into()).collect(),
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct LifetimeProps {
    /// Reclaim a detached entry when its logical key reappears, instead of
    /// creating a fresh entry.
    pub can_recover: bool,
    /// The logical children for this pass.
    pub children: Vec<Node>,
}

// =============================================================================
// Lifetime
// =============================================================================

/// Host adapter for one lifetime-managed parent.
pub struct Lifetime {
    registry: Registry,
    render_requests: Signal<u64>,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifetime {
    /// Create a parent whose unlists bump [`render_requests`](Self::render_requests).
    pub fn new() -> Self {
        let registry = Registry::new();
        let render_requests = signal(0u64);

        let requests = render_requests.clone();
        let count = Rc::new(Cell::new(0u64));
        registry.set_change_notifier(move || {
            count.set(count.get() + 1);
            requests.set(count.get());
        });

        Self {
            registry,
            render_requests,
        }
    }

    /// Create a parent that reports unlists to a host-supplied scheduler.
    ///
    /// The scheduler must not run a render pass synchronously.
    pub fn with_notifier(notifier: impl Fn() + 'static) -> Self {
        let registry = Registry::new();
        registry.set_change_notifier(notifier);
        Self {
            registry,
            render_requests: signal(0u64),
        }
    }

    /// Run one render pass.
    ///
    /// Returns the physical child set keyed by entry identity. Fails only if
    /// the children contain content that cannot be tracked.
    pub fn render(&self, props: &LifetimeProps) -> Result<Vec<Rendered>> {
        let desired = flatten_children(props.children.clone())?;
        trace!(children = desired.len(), can_recover = props.can_recover, "lifetime render pass");

        self.registry.set_can_recover(props.can_recover);
        self.registry.reconcile(desired);

        // Strategies react to the activity epoch; settle them before output
        flush_sync();

        Ok(self.registry.render())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Counter bumped every time an entry is unlisted.
    ///
    /// Only moves for parents built with [`Lifetime::new`].
    pub fn render_requests(&self) -> Signal<u64> {
        self.render_requests.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LingerError;
    use crate::types::{Element, LogicalKey};
    use spark_signals::effect;

    fn rows(keys: &[&str]) -> Vec<Node> {
        keys.iter()
            .map(|k| Element::new("Row").key(*k).prop("label", *k).into())
            .collect()
    }

    #[test]
    fn test_render_keys_by_identity() {
        let lifetime = Lifetime::new();
        let rendered = lifetime
            .render(&LifetimeProps {
                children: rows(&["a", "b"]),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(rendered.len(), 2);
        let a = lifetime.registry().active_id(&LogicalKey::from("a")).unwrap();
        assert_eq!(rendered[0].key, a);
        assert!(rendered.iter().all(|r| r.node.props().unwrap().is_managed()));
    }

    #[test]
    fn test_removed_child_keeps_rendering() {
        let lifetime = Lifetime::new();
        let first = lifetime
            .render(&LifetimeProps {
                children: rows(&["a", "b"]),
                ..Default::default()
            })
            .unwrap();
        let second = lifetime
            .render(&LifetimeProps {
                children: rows(&["b"]),
                ..Default::default()
            })
            .unwrap();

        let first_keys: Vec<_> = first.iter().map(|r| r.key.clone()).collect();
        let second_keys: Vec<_> = second.iter().map(|r| r.key.clone()).collect();
        assert_eq!(first_keys, second_keys);
        assert!(!lifetime.registry().is_active(&first_keys[0]));
    }

    #[test]
    fn test_can_recover_is_read_each_pass() {
        let lifetime = Lifetime::new();
        let props = |keys: &[&str], can_recover| LifetimeProps {
            can_recover,
            children: rows(keys),
        };

        lifetime.render(&props(&["a"], true)).unwrap();
        let a = lifetime.registry().active_id(&"a".into()).unwrap();
        lifetime.render(&props(&[], true)).unwrap();
        lifetime.render(&props(&["a"], true)).unwrap();
        assert!(lifetime.registry().is_active(&a));

        lifetime.render(&props(&[], false)).unwrap();
        lifetime.render(&props(&["a"], false)).unwrap();
        assert!(!lifetime.registry().is_active(&a));
        assert_eq!(lifetime.registry().len(), 2);
    }

    #[test]
    fn test_unlist_requests_render() {
        let lifetime = Lifetime::new();
        let requests = lifetime.render_requests();

        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let effect_requests = requests.clone();
        let _stop = effect(move || {
            let _ = effect_requests.get();
            runs_clone.set(runs_clone.get() + 1);
        });
        flush_sync();
        assert_eq!(runs.get(), 1);

        lifetime
            .render(&LifetimeProps {
                children: rows(&["a"]),
                ..Default::default()
            })
            .unwrap();
        let a = lifetime.registry().active_id(&"a".into()).unwrap();
        lifetime.render(&LifetimeProps::default()).unwrap();
        assert_eq!(requests.get(), 0, "detaching alone does not request a render");

        lifetime.registry().unlist(&a);
        flush_sync();
        assert_eq!(requests.get(), 1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_custom_notifier() {
        let scheduled = Rc::new(Cell::new(false));
        let flag = scheduled.clone();
        let lifetime = Lifetime::with_notifier(move || flag.set(true));

        lifetime
            .render(&LifetimeProps {
                children: rows(&["a"]),
                ..Default::default()
            })
            .unwrap();
        let a = lifetime.registry().active_id(&"a".into()).unwrap();
        lifetime.render(&LifetimeProps::default()).unwrap();
        lifetime.registry().unlist(&a);

        assert!(scheduled.get());
    }

    #[test]
    fn test_unsupported_child_fails_the_pass() {
        let lifetime = Lifetime::new();
        let err = lifetime
            .render(&LifetimeProps {
                children: vec![Node::Primitive("box".into())],
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, LingerError::UnsupportedChild { .. }));
        assert!(lifetime.registry().is_empty());
    }
}
