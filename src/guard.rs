//! Modification guard for cursors.
//!
//! Single-threaded structure that detects a table being mutated underneath
//! a cursor. The guard is bound to a [`Stamp`] of the table at construction;
//! once it sees a different stamp it is poisoned for good.

use crate::error::TableError;
use core::marker::PhantomData;

/// Snapshot of the table state a cursor depends on.
///
/// `used` is the live-entry count. `epoch` advances on operations that move
/// entries without changing that count (`resize`, `clear`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub used: usize,
    pub epoch: u64,
}

/// Per-cursor tracker. Call [`ModificationGuard::check`] before every step.
#[derive(Debug)]
pub struct ModificationGuard {
    bound: Option<Stamp>,
    // Keep !Send + !Sync in line with the single-threaded tables.
    _nosend: PhantomData<*mut ()>,
}

impl ModificationGuard {
    pub const fn bind(stamp: Stamp) -> Self {
        Self {
            bound: Some(stamp),
            _nosend: PhantomData,
        }
    }

    /// Fails with `ConcurrentModification` if `current` differs from the
    /// bound stamp, and on every call after the first such failure.
    #[inline]
    pub fn check(&mut self, current: Stamp) -> Result<(), TableError> {
        match self.bound {
            Some(bound) if bound == current => Ok(()),
            Some(bound) => {
                log::trace!(
                    "cursor poisoned: bound to {} live (epoch {}), table now has {} (epoch {})",
                    bound.used,
                    bound.epoch,
                    current.used,
                    current.epoch
                );
                self.bound = None;
                Err(TableError::ConcurrentModification)
            }
            None => Err(TableError::ConcurrentModification),
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.bound.is_none()
    }
}
