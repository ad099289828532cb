//! Activity queries for code running inside a managed child.
//!
//! A child rendered by a [`Lifetime`](crate::Lifetime) parent finds its
//! entry through the token in its props. Queries fail open: props without a
//! token report active, so a component behaves normally when it is used
//! outside a managed parent. Removal requests fail loudly instead, because
//! there is no entry to remove.

use crate::engine::LifetimeToken;
use crate::error::{LingerError, Result};
use crate::types::Props;

/// Whether the application still lists this child.
///
/// Recomputed on every call; cheap enough to call every render pass.
/// Returns true for props that carry no lifetime token.
pub fn is_active(props: &Props) -> bool {
    props
        .lifetime_token()
        .is_none_or(|token| token.is_active())
}

/// Ask the parent to drop this child now.
///
/// Has no effect while the child is still active. Returns whether the entry
/// was removed.
pub fn request_unlist(props: &Props) -> Result<bool> {
    let token = require_token(props, "request_unlist")?;
    Ok(token.unlist())
}

/// Token for strategy accessors, which cannot work without one.
pub(crate) fn require_token(props: &Props, accessor: &'static str) -> Result<LifetimeToken> {
    props
        .lifetime_token()
        .cloned()
        .ok_or(LingerError::MissingToken { accessor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Lifetime, LifetimeProps};
    use crate::types::{Element, Node};

    fn managed_props(lifetime: &Lifetime, keys: &[&str]) -> Vec<Props> {
        let rendered = lifetime
            .render(&LifetimeProps {
                children: keys
                    .iter()
                    .map(|k| Node::from(Element::new("Row").key(*k)))
                    .collect(),
                ..Default::default()
            })
            .unwrap();
        rendered
            .into_iter()
            .filter_map(|r| r.node.props().cloned())
            .collect()
    }

    #[test]
    fn test_unmanaged_props_fail_open() {
        assert!(is_active(&Props::new()));
    }

    #[test]
    fn test_managed_props_follow_registry() {
        let lifetime = Lifetime::new();
        let props = managed_props(&lifetime, &["a"]).remove(0);
        assert!(is_active(&props));

        managed_props(&lifetime, &[]);
        assert!(!is_active(&props));
    }

    #[test]
    fn test_stripped_props_are_unmanaged() {
        let lifetime = Lifetime::new();
        let props = managed_props(&lifetime, &["a"]).remove(0);
        managed_props(&lifetime, &[]);

        let stripped = props.stripped();
        assert!(!stripped.is_managed());
        assert!(is_active(&stripped));
        assert_eq!(stripped.len(), props.len());
    }

    #[test]
    fn test_request_unlist() {
        let lifetime = Lifetime::new();
        let props = managed_props(&lifetime, &["a"]).remove(0);

        assert_eq!(request_unlist(&props), Ok(false), "active entries stay");
        managed_props(&lifetime, &[]);
        assert_eq!(request_unlist(&props), Ok(true));
        assert!(lifetime.registry().is_empty());
    }

    #[test]
    fn test_request_unlist_without_token() {
        assert_eq!(
            request_unlist(&Props::new()),
            Err(LingerError::MissingToken {
                accessor: "request_unlist"
            })
        );
    }
}
