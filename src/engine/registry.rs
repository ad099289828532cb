//! Lifetime Registry - Logical children vs. physically rendered entries.
//!
//! Tracks every child a lifetime-managed parent still renders:
//! - Entries keyed by a process-unique identity, in creation order
//! - Bindings from logical key to the entry that currently owns it
//! - Reconciliation of the desired logical set on every render pass
//! - Recovery of detached entries when their logical key reappears
//!
//! An entry is *active* while its logical key binds to it, and *detached*
//! once the application stops listing that key. Detached entries keep
//! rendering under the same physical key until they are unlisted.
//!
//! # Example
//!
//! ```ignore
//! use indexmap::IndexMap;
//! use spark_linger::{Registry, LogicalKey, Node};
//!
//! let registry = Registry::new();
//!
//! let mut desired = IndexMap::new();
//! desired.insert(LogicalKey::from("a"), Node::text("first"));
//! registry.reconcile(desired);
//!
//! let id = registry.active_id(&"a".into()).unwrap();
//! assert!(registry.is_active(&id));
//!
//! // "a" disappears: the entry detaches but keeps rendering
//! registry.reconcile(IndexMap::new());
//! assert!(!registry.is_active(&id));
//! assert_eq!(registry.render().len(), 1);
//!
//! // Exit logic finished: remove it for real
//! registry.unlist(&id);
//! assert!(registry.render().is_empty());
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use spark_signals::{signal, Signal};
use tracing::{debug, trace};

use super::ids::next_entry_id;
use super::token::LifetimeToken;
use crate::types::{Element, EntryId, LogicalKey, Node, Rendered};

// =============================================================================
// Registry State
// =============================================================================

/// One tracked child.
struct Entry {
    id: EntryId,
    key: LogicalKey,
    content: Node,
    /// Detach sequence number, set when the binding was dropped.
    detached_at: Option<u64>,
}

#[derive(Default)]
struct RegistryState {
    entries: IndexMap<EntryId, Entry>,
    bindings: HashMap<LogicalKey, EntryId>,
    can_recover: bool,
    next_detach: u64,
}

pub(crate) struct RegistryInner {
    state: RefCell<RegistryState>,
    epoch: Cell<u64>,
    activity_epoch: Signal<u64>,
    notifier: RefCell<Option<Rc<dyn Fn()>>>,
}

/// Shared handle to one managed parent's registry.
///
/// Cloning the handle shares the same registry. Every managed parent owns its
/// own registry; there is no global instance.
#[derive(Clone)]
pub struct Registry {
    inner: Rc<RegistryInner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Registry")
            .field("entries", &state.entries.len())
            .field("bindings", &state.bindings.len())
            .field("can_recover", &state.can_recover)
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                state: RefCell::new(RegistryState::default()),
                epoch: Cell::new(0),
                activity_epoch: signal(0),
                notifier: RefCell::new(None),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<RegistryInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Rc<RegistryInner>) -> Self {
        Self { inner }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Whether a reappearing logical key reclaims its detached entry.
    pub fn can_recover(&self) -> bool {
        self.inner.state.borrow().can_recover
    }

    /// Set the recovery flag. Only affects future reconciliations.
    pub fn set_can_recover(&self, can_recover: bool) {
        self.inner.state.borrow_mut().can_recover = can_recover;
    }

    /// Register the callback run after [`unlist`](Self::unlist) removes an entry.
    ///
    /// The callback should schedule a new render pass, not run one inline.
    /// Replaces any previous notifier.
    pub fn set_change_notifier(&self, notifier: impl Fn() + 'static) {
        *self.inner.notifier.borrow_mut() = Some(Rc::new(notifier));
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Reconcile the registry against the full, current logical child set.
    ///
    /// 1. Keys still bound get their content replaced; identity is kept.
    /// 2. Bound keys missing from `desired` lose their binding. The entry
    ///    detaches but stays in the registry.
    /// 3. Unbound keys in `desired` either recover the most recently detached
    ///    entry with that key (when recovery is on) or create a new entry.
    ///
    /// New entries are processed in the iteration order of `desired`.
    pub fn reconcile(&self, desired: IndexMap<LogicalKey, Node>) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            let RegistryState {
                entries,
                bindings,
                can_recover,
                next_detach,
            } = &mut *state;

            let mut changed = false;
            let mut present: HashSet<LogicalKey> = HashSet::with_capacity(desired.len());
            let mut unbound: Vec<(LogicalKey, Node)> = Vec::new();

            // Rebind content on keys that keep their binding
            for (key, content) in desired {
                match bindings.get(&key).and_then(|id| entries.get_mut(id)) {
                    Some(entry) => {
                        entry.content = content;
                        present.insert(key);
                    }
                    None => unbound.push((key, content)),
                }
            }

            // Drop bindings for keys the application no longer lists
            bindings.retain(|key, id| {
                if present.contains(key) {
                    return true;
                }
                if let Some(entry) = entries.get_mut(id) {
                    entry.detached_at = Some(*next_detach);
                    *next_detach += 1;
                }
                trace!(key = %key, id = %id, "entry detached");
                changed = true;
                false
            });

            // Recover or create entries for the remaining keys
            for (key, content) in unbound {
                let recovered = if *can_recover {
                    entries
                        .values_mut()
                        .filter(|entry| entry.key == key && entry.detached_at.is_some())
                        .max_by_key(|entry| entry.detached_at)
                } else {
                    None
                };

                let id = match recovered {
                    Some(entry) => {
                        entry.content = content;
                        entry.detached_at = None;
                        trace!(key = %key, id = %entry.id, "entry recovered");
                        entry.id.clone()
                    }
                    None => {
                        let id = next_entry_id();
                        trace!(key = %key, id = %id, "entry created");
                        entries.insert(
                            id.clone(),
                            Entry {
                                id: id.clone(),
                                key: key.clone(),
                                content,
                                detached_at: None,
                            },
                        );
                        id
                    }
                };
                bindings.insert(key, id);
                changed = true;
            }

            changed
        };

        if changed {
            let epoch = self.inner.epoch.get() + 1;
            self.inner.epoch.set(epoch);
            self.inner.activity_epoch.set(epoch);
        }
    }

    // =========================================================================
    // Activity & Removal
    // =========================================================================

    /// True iff `id` names an existing entry that still owns its logical key.
    pub fn is_active(&self, id: &EntryId) -> bool {
        let state = self.inner.state.borrow();
        state
            .entries
            .get(id)
            .is_some_and(|entry| state.bindings.get(&entry.key) == Some(id))
    }

    /// Permanently remove a detached entry.
    ///
    /// No-op for unknown identities and for active entries, so the entry the
    /// application currently lists is never removed out from under the tree.
    /// Returns true if an entry was removed, in which case the change
    /// notifier has been called.
    pub fn unlist(&self, id: &EntryId) -> bool {
        {
            let mut state = self.inner.state.borrow_mut();
            let Some(entry) = state.entries.get(id) else {
                trace!(id = %id, "unlist ignored: unknown entry");
                return false;
            };
            if state.bindings.get(&entry.key) == Some(id) {
                debug!(id = %id, key = %entry.key, "unlist refused: entry is active");
                return false;
            }

            if let Some(entry) = state.entries.shift_remove(id) {
                debug!(id = %id, key = %entry.key, "entry unlisted");
            }
            state.bindings.retain(|_, bound| bound != id);
        }

        let notifier = self.inner.notifier.borrow().clone();
        if let Some(notify) = notifier {
            notify();
        }
        true
    }

    // =========================================================================
    // Render
    // =========================================================================

    /// Produce the physical child set, one item per entry in creation order.
    ///
    /// Each item is keyed by the entry identity. Element content is cloned
    /// with a lifetime token for that entry added to its props; stored
    /// content is left untouched.
    pub fn render(&self) -> Vec<Rendered> {
        let state = self.inner.state.borrow();
        state
            .entries
            .values()
            .map(|entry| Rendered {
                key: entry.id.clone(),
                node: self.decorate(entry),
            })
            .collect()
    }

    fn decorate(&self, entry: &Entry) -> Node {
        match &entry.content {
            Node::Element(element) => {
                let token = LifetimeToken::new(entry.id.clone(), self.downgrade());
                Node::Element(Element {
                    name: element.name.clone(),
                    key: element.key.clone(),
                    props: element.props.with_lifetime_token(token),
                    children: element.children.clone(),
                })
            }
            other => other.clone(),
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Number of tracked entries, active and detached.
    pub fn len(&self) -> usize {
        self.inner.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().entries.is_empty()
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.inner.state.borrow().entries.contains_key(id)
    }

    /// Logical key the entry was most recently requested under.
    pub fn logical_key(&self, id: &EntryId) -> Option<LogicalKey> {
        self.inner
            .state
            .borrow()
            .entries
            .get(id)
            .map(|entry| entry.key.clone())
    }

    /// Identity of the entry currently bound to `key`.
    pub fn active_id(&self, key: &LogicalKey) -> Option<EntryId> {
        self.inner.state.borrow().bindings.get(key).cloned()
    }

    /// All entry identities in creation order.
    pub fn entry_ids(&self) -> Vec<EntryId> {
        self.inner.state.borrow().entries.keys().cloned().collect()
    }

    /// Reactive counter bumped whenever a reconcile changes any binding.
    ///
    /// Read it inside an `effect` to re-run whenever some entry may have
    /// gained or lost its active state.
    pub fn activity_epoch(&self) -> Signal<u64> {
        self.inner.activity_epoch.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Props;
    use proptest::prelude::*;

    fn desired(keys: &[&str]) -> IndexMap<LogicalKey, Node> {
        keys.iter()
            .map(|k| (LogicalKey::from(*k), Node::text(format!("content {k}"))))
            .collect()
    }

    fn active(registry: &Registry, key: &str) -> EntryId {
        registry
            .active_id(&LogicalKey::from(key))
            .expect("key should be bound")
    }

    #[test]
    fn test_identity_continuity() {
        let registry = Registry::new();
        registry.reconcile(desired(&["a", "b"]));
        let a = active(&registry, "a");
        let b = active(&registry, "b");

        registry.reconcile(desired(&["b", "a"]));
        assert_eq!(active(&registry, "a"), a);
        assert_eq!(active(&registry, "b"), b);

        let keys: Vec<EntryId> = registry.render().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![a, b], "render keeps creation order");
    }

    #[test]
    fn test_content_is_replaced_on_rebind() {
        let registry = Registry::new();
        registry.reconcile(desired(&["a"]));

        let mut next = IndexMap::new();
        next.insert(LogicalKey::from("a"), Node::text("updated"));
        registry.reconcile(next);

        let rendered = registry.render();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].node, Node::text("updated"));
    }

    #[test]
    fn test_detach_not_delete() {
        let registry = Registry::new();
        registry.reconcile(desired(&["a", "b"]));
        let a = active(&registry, "a");

        registry.reconcile(desired(&["b"]));
        assert!(!registry.is_active(&a));
        assert!(registry.contains(&a));
        assert_eq!(registry.render().len(), 2);
        assert_eq!(registry.active_id(&"a".into()), None);
    }

    #[test]
    fn test_recovery_reuses_identity() {
        let registry = Registry::new();
        registry.set_can_recover(true);

        registry.reconcile(desired(&["a"]));
        let u1 = active(&registry, "a");
        registry.reconcile(desired(&[]));
        assert!(!registry.is_active(&u1));

        registry.reconcile(desired(&["a"]));
        assert!(registry.is_active(&u1));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.render()[0].key, u1);
    }

    #[test]
    fn test_no_recovery_creates_new_identity() {
        let registry = Registry::new();

        registry.reconcile(desired(&["a"]));
        let u1 = active(&registry, "a");
        registry.reconcile(desired(&[]));
        registry.reconcile(desired(&["a"]));

        let u2 = active(&registry, "a");
        assert_ne!(u1, u2);
        assert!(!registry.is_active(&u1));
        assert!(registry.is_active(&u2));
        assert_eq!(registry.entry_ids(), vec![u1.clone(), u2]);

        assert!(registry.unlist(&u1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_recovery_prefers_most_recently_detached() {
        let registry = Registry::new();

        registry.reconcile(desired(&["a"]));
        let older = active(&registry, "a");
        registry.reconcile(desired(&[]));
        registry.reconcile(desired(&["a"]));
        let newer = active(&registry, "a");
        registry.reconcile(desired(&[]));

        registry.set_can_recover(true);
        registry.reconcile(desired(&["a"]));
        assert_eq!(active(&registry, "a"), newer);
        assert!(!registry.is_active(&older));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unlist_active_is_refused() {
        let registry = Registry::new();
        registry.reconcile(desired(&["a"]));
        let a = active(&registry, "a");

        assert!(!registry.unlist(&a));
        assert!(registry.is_active(&a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unlist_is_idempotent() {
        let registry = Registry::new();
        let notified = Rc::new(Cell::new(0));
        let counter = notified.clone();
        registry.set_change_notifier(move || counter.set(counter.get() + 1));

        registry.reconcile(desired(&["a", "b"]));
        let a = active(&registry, "a");
        registry.reconcile(desired(&["b"]));

        assert!(registry.unlist(&a));
        assert!(!registry.unlist(&a));
        assert_eq!(registry.len(), 1);
        assert_eq!(notified.get(), 1, "notifier runs once per removal");
    }

    #[test]
    fn test_unlist_preserves_order_of_others() {
        let registry = Registry::new();
        registry.reconcile(desired(&["a", "b", "c"]));
        let (a, b, c) = (active(&registry, "a"), active(&registry, "b"), active(&registry, "c"));

        registry.reconcile(desired(&["a", "c"]));
        registry.unlist(&b);
        assert_eq!(registry.entry_ids(), vec![a, c]);
    }

    #[test]
    fn test_notifier_may_read_registry() {
        let registry = Registry::new();
        let seen = Rc::new(Cell::new(usize::MAX));
        let seen_clone = seen.clone();
        let handle = registry.clone();
        registry.set_change_notifier(move || seen_clone.set(handle.render().len()));

        registry.reconcile(desired(&["a"]));
        let a = active(&registry, "a");
        registry.reconcile(desired(&[]));
        registry.unlist(&a);

        assert_eq!(seen.get(), 0);
    }

    #[test]
    fn test_render_injects_token_without_mutating_content() {
        let registry = Registry::new();
        let element = crate::types::Element::new("Row").prop("label", "x");
        let mut next = IndexMap::new();
        next.insert(LogicalKey::from("a"), Node::Element(element));
        registry.reconcile(next);

        let first = registry.render();
        let props: &Props = first[0].node.props().unwrap();
        assert!(props.is_managed());
        assert_eq!(props.len(), 1);
        assert_eq!(props.stripped().get("label"), props.get("label"));

        // Stored content never carries the token
        let state = registry.inner.state.borrow();
        let stored = state.entries.values().next().unwrap();
        assert!(!stored.content.props().unwrap().is_managed());
    }

    #[test]
    fn test_text_content_rendered_as_is() {
        let registry = Registry::new();
        registry.reconcile(desired(&["a"]));
        assert_eq!(registry.render()[0].node, Node::text("content a"));
    }

    #[test]
    fn test_activity_epoch_bumps_only_on_binding_change() {
        let registry = Registry::new();
        let epoch = registry.activity_epoch();

        registry.reconcile(desired(&["a"]));
        assert_eq!(epoch.get(), 1);

        registry.reconcile(desired(&["a"]));
        assert_eq!(epoch.get(), 1, "content-only pass keeps the epoch");

        registry.reconcile(desired(&[]));
        assert_eq!(epoch.get(), 2);
    }

    proptest! {
        #[test]
        fn prop_reconcile_invariants(
            passes in proptest::collection::vec(proptest::collection::vec(0usize..6, 0..6), 1..12),
            can_recover in any::<bool>(),
        ) {
            let registry = Registry::new();
            registry.set_can_recover(can_recover);
            let mut previous: HashMap<LogicalKey, EntryId> = HashMap::new();

            for pass in passes {
                let next: IndexMap<LogicalKey, Node> = pass
                    .iter()
                    .map(|k| (LogicalKey::Index(*k), Node::text(k.to_string())))
                    .collect();
                registry.reconcile(next.clone());

                let mut current = HashMap::new();
                for key in next.keys() {
                    let id = registry.active_id(key).expect("listed key is bound");
                    prop_assert!(registry.is_active(&id));
                    prop_assert_eq!(registry.logical_key(&id), Some(key.clone()));
                    if let Some(before) = previous.get(key) {
                        prop_assert_eq!(before, &id);
                    }
                    current.insert(key.clone(), id);
                }

                let active_count = registry
                    .entry_ids()
                    .iter()
                    .filter(|id| registry.is_active(id))
                    .count();
                prop_assert_eq!(active_count, next.len());
                prop_assert_eq!(registry.render().len(), registry.len());
                previous = current;
            }
        }
    }
}
