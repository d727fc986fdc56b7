//! probe-tables: two hash table engines built from first principles, with
//! instrumentation for measuring how collision strategy affects probe cost.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: compare separate chaining and open addressing on equal footing.
//!   Both engines hash with the same rolling polynomial hash, count the same
//!   events, and expose the same [`Mapping`] contract.
//! - Layers:
//!   - `hash`: [`PolyHash`] and the [`KeyHash`] trait keys implement; the
//!     [`ProbeStrategy`] stride rules for open addressing.
//!   - `entry`: the three slot states (empty, live, tombstone) both engines
//!     store.
//!   - [`ChainedTable`]: a fixed bucket array of singly linked chains whose
//!     nodes live in a `slotmap` arena.
//!   - [`OpenTable`]: one flat slot array probed by stride, with an optional
//!     automatic growth policy and an explicit `resize`.
//!   - `mapping`: the shared contract. Engines supply lookup, insert, bury and
//!     scan; accessors, defaults, pops, equality and row loading are derived.
//!   - `iter` + `guard`: traversal. A borrowing [`Iter`] for ordinary use and
//!     a detached [`Cursor`] that notices when the table changed under it.
//!
//! Constraints
//! - Single-threaded: counters use `Cell`, factories use `Rc`.
//! - Deletion never shortens a probe path. Removed entries become tombstones
//!   so keys inserted after a collision stay reachable.
//! - A cached hash is the home index for the current size only; every resize
//!   recomputes it.
//! - Every probe walk is bounded by the table size and every double-hash
//!   stride is coprime with it, so no operation loops forever, including on
//!   a full table.
//!
//! Modification detection
//! - A cursor records a [`Stamp`] (live count plus a layout epoch) when it is
//!   created and checks it on every step. Insert and delete move the live
//!   count; resize and clear move the epoch. Overwriting a value moves
//!   neither and is allowed.
//! - Once a cursor reports `ConcurrentModification` it keeps reporting it.
//! - A delete followed by an insert restores the live count and is not
//!   detected if no step ran in between.
//!
//! Notes and non-goals
//! - No thread safety, persistence, or ordering guarantees.
//! - Only the open-addressing engine ever changes capacity.
//! - Key types are limited to those implementing [`KeyHash`]: text and the
//!   primitive integers.

mod chained_table;
mod entry;
mod error;
mod guard;
mod hash;
mod iter;
mod mapping;
mod open_table;
mod open_table_proptest;
mod stats;

// Public surface
pub use chained_table::{ChainPos, ChainedTable};
pub use entry::SlotState;
pub use error::TableError;
pub use guard::{ModificationGuard, Stamp};
pub use hash::{KeyHash, PolyHash, ProbeStrategy};
pub use iter::{
    Cursor, Items, ItemsIter, Iter, Keys, KeysIter, Traverse, Values, ValuesIter, View, Walk,
};
pub use mapping::{Mapping, MissingFn};
pub use open_table::{
    OpenConfig, OpenTable, ResizePolicy, DEFAULT_CAPACITY, DEFAULT_LARGE_TABLE_THRESHOLD,
};
pub use stats::ProbeStats;
