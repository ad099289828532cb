//! Children flattening - from nested content to an ordered logical mapping.

use indexmap::IndexMap;
use tracing::warn;

use crate::error::{LingerError, Result};
use crate::types::{LogicalKey, Node};

/// Flatten children into the ordered `logical key -> content` mapping the
/// registry reconciles against.
///
/// - [`Node::List`] is traversed recursively; only its leaves are kept.
/// - An element with an explicit key is tracked under that key. Every other
///   leaf is tracked under its ordinal position among the flattened leaves.
/// - Duplicate keys are warned about; only the first occurrence is tracked.
/// - [`Node::Fragment`] and [`Node::Primitive`] cannot receive a lifetime
///   token and are rejected.
pub fn flatten_children(children: Vec<Node>) -> Result<IndexMap<LogicalKey, Node>> {
    let mut leaves = Vec::with_capacity(children.len());
    collect_leaves(children, &mut leaves)?;

    let mut mapping = IndexMap::with_capacity(leaves.len());
    for (position, leaf) in leaves.into_iter().enumerate() {
        let key = match &leaf {
            Node::Element(element) => element
                .key
                .clone()
                .unwrap_or(LogicalKey::Index(position)),
            _ => LogicalKey::Index(position),
        };

        if mapping.contains_key(&key) {
            warn!(key = %key, position, "duplicate child key; keys must be unique, keeping the first");
            continue;
        }
        mapping.insert(key, leaf);
    }

    Ok(mapping)
}

fn collect_leaves(nodes: Vec<Node>, leaves: &mut Vec<Node>) -> Result<()> {
    for node in nodes {
        match node {
            Node::List(nested) => collect_leaves(nested, leaves)?,
            Node::Fragment(_) | Node::Primitive(_) => {
                return Err(LingerError::UnsupportedChild {
                    kind: node.kind(),
                    position: leaves.len(),
                });
            }
            leaf @ (Node::Element(_) | Node::Text(_)) => leaves.push(leaf),
        }
    }
    Ok(())
}
