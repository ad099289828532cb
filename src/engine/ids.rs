//! Entry identity generation.

use uuid::Uuid;

use crate::types::EntryId;

/// Allocate a fresh, process-unique entry identity.
pub(crate) fn next_entry_id() -> EntryId {
    EntryId::new(Uuid::new_v4().to_string())
}
