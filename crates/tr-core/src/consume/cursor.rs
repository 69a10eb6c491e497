//! Cursor gating over the newest-first sink index.

use tr_common::EventId;

/// Entries newer than the cursor, ready for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Oldest first, i.e. the reverse of index order.
    pub pending: Vec<EventId>,
    /// Head of the untruncated index; the cursor's next value.
    pub head: Option<EventId>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Select what is new in `index` (newest first) relative to `cursor`.
///
/// A cursor missing from the index (first run, or trimmed/expired) makes
/// the whole index new.
pub fn select_new(index: &[EventId], cursor: Option<&EventId>) -> Batch {
    let newer = match cursor.and_then(|c| index.iter().position(|id| id == c)) {
        Some(at) => &index[..at],
        None => index,
    };
    Batch {
        pending: newer.iter().rev().cloned().collect(),
        head: index.first().cloned(),
    }
}
