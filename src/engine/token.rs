//! Lifetime token - the side-channel a managed child uses to reach its entry.
//!
//! The registry adds one token to the props of every element it renders.
//! A token pairs the entry identity with a weak reference to the registry
//! that owns it, so a child outliving its parent cannot keep the registry
//! alive. Application code never sees the token: [`Props`](crate::Props)
//! keeps it out of its public accessors and `Props::stripped` drops it.

use std::fmt;
use std::rc::Weak;

use super::registry::{Registry, RegistryInner};
use crate::types::EntryId;

#[derive(Clone)]
pub(crate) struct LifetimeToken {
    id: EntryId,
    registry: Weak<RegistryInner>,
}

impl LifetimeToken {
    pub(crate) fn new(id: EntryId, registry: Weak<RegistryInner>) -> Self {
        Self { id, registry }
    }

    pub(crate) fn id(&self) -> &EntryId {
        &self.id
    }

    /// The owning registry, if it is still alive.
    pub(crate) fn registry(&self) -> Option<Registry> {
        self.registry.upgrade().map(Registry::from_inner)
    }

    /// Entry still owns its logical key. False once the registry is gone.
    pub(crate) fn is_active(&self) -> bool {
        self.registry()
            .is_some_and(|registry| registry.is_active(&self.id))
    }

    /// Ask the registry to remove this entry. No-op while active.
    pub(crate) fn unlist(&self) -> bool {
        self.registry()
            .is_some_and(|registry| registry.unlist(&self.id))
    }
}

impl PartialEq for LifetimeToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.registry, &other.registry)
    }
}

impl fmt::Debug for LifetimeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeToken")
            .field("id", &self.id)
            .field("registry_alive", &(self.registry.strong_count() > 0))
            .finish()
    }
}
