//! Error kinds surfaced by both table engines.

/// Every failure a table operation can report to its caller.
///
/// Nothing is retried or swallowed internally; each variant is returned to
/// the immediate caller of the failing operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// `get`/`delete`/`pop` on a key that is not live.
    #[error("no such key")]
    KeyNotFound,

    /// `pop_arbitrary` on a table without live entries.
    #[error("table is empty")]
    EmptyTable,

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: &'static str },

    /// A cursor was advanced after its table's live count changed.
    #[error("table size changed during iteration")]
    ConcurrentModification,

    /// Row `index` of a pair sequence did not have exactly two elements.
    #[error("element #{index} has length {len}; 2 is required")]
    MalformedPair { index: usize, len: usize },

    /// Open addressing without resizing has no empty slot and no tombstone left.
    #[error("table is full (capacity: {capacity})")]
    TableFull { capacity: usize },
}

impl TableError {
    /// Only a modification detected during iteration poisons the cursor that
    /// reported it; every other error leaves the caller free to continue.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}
