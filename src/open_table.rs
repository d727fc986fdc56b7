//! OpenTable: open addressing over one flat slot array.
//!
//! A key starts at its home slot (the primary hash) and steps by a stride
//! from the configured [`ProbeStrategy`] until it meets itself or an empty
//! slot. Deleted slots become tombstones so that keys which probed past them
//! stay reachable; the first tombstone on a probe path is where a new key is
//! placed.
//!
//! Growth is a separate capability. [`OpenTable::resize`] rebuilds the array
//! at any time; the automatic trigger after inserts only runs under
//! [`ResizePolicy::Automatic`]. With resizing disabled a table whose slots
//! are all live rejects new keys with `TableFull`.

use crate::entry::{Entry, Slot, SlotState};
use crate::error::TableError;
use crate::guard::Stamp;
use crate::hash::{KeyHash, PolyHash, ProbeStrategy};
use crate::iter::Traverse;
use crate::mapping::{Mapping, MissingFn};
use crate::stats::ProbeStats;
use core::borrow::Borrow;
use core::fmt;
use std::rc::Rc;

pub const DEFAULT_CAPACITY: usize = 111;
pub const DEFAULT_LARGE_TABLE_THRESHOLD: usize = 5000;

/// Whether inserts may grow the table on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizePolicy {
    /// Never grow automatically; `resize` must be called explicitly.
    #[default]
    Disabled,
    /// Grow once live entries plus tombstones reach two thirds of capacity.
    Automatic,
}

#[derive(Debug, Clone)]
pub struct OpenConfig {
    pub capacity: usize,
    pub probe: ProbeStrategy,
    pub resize: ResizePolicy,
    /// Above this many live entries growth doubles; at or below it, quadruples.
    pub large_table_threshold: usize,
    /// Shared counters; a private instance is created when `None`.
    pub stats: Option<Rc<ProbeStats>>,
}

impl Default for OpenConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            probe: ProbeStrategy::default(),
            resize: ResizePolicy::default(),
            large_table_threshold: DEFAULT_LARGE_TABLE_THRESHOLD,
            stats: None,
        }
    }
}

impl OpenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_probe(mut self, probe: ProbeStrategy) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_resize(mut self, resize: ResizePolicy) -> Self {
        self.resize = resize;
        self
    }

    pub fn with_large_table_threshold(mut self, threshold: usize) -> Self {
        self.large_table_threshold = threshold;
        self
    }

    pub fn with_stats(mut self, stats: Rc<ProbeStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    fn validate(&self) -> Result<(), TableError> {
        if self.capacity < 2 {
            return Err(TableError::InvalidArgument {
                reason: "capacity must be at least 2",
            });
        }
        Ok(())
    }
}

/// Outcome of walking a probe sequence.
enum Probe {
    Found(usize),
    /// Where the key would go: the first tombstone passed, else the empty
    /// slot that ended the walk.
    Vacant(usize),
    /// Every slot is live and none matched.
    Full,
}

pub struct OpenTable<K, V> {
    slots: Vec<Slot<K, V>>,
    used: usize,
    filled: usize,
    probe: ProbeStrategy,
    resize: ResizePolicy,
    large_table_threshold: usize,
    epoch: u64,
    pop_hint: usize,
    stats: Rc<ProbeStats>,
    missing: Option<MissingFn<K, V>>,
}

fn empty_slots<K, V>(n: usize) -> Vec<Slot<K, V>> {
    (0..n).map(|_| Slot::Empty).collect()
}

impl<K, V> OpenTable<K, V>
where
    K: KeyHash + Eq,
{
    /// A table with `capacity` slots and otherwise default configuration.
    pub fn new(capacity: usize) -> Result<Self, TableError> {
        Self::with_config(OpenConfig::default().with_capacity(capacity))
    }

    pub fn with_config(config: OpenConfig) -> Result<Self, TableError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: OpenConfig) -> Self {
        Self {
            slots: empty_slots(config.capacity),
            used: 0,
            filled: 0,
            probe: config.probe,
            resize: config.resize,
            large_table_threshold: config.large_table_threshold,
            epoch: 0,
            pop_hint: 0,
            stats: config.stats.unwrap_or_default(),
            missing: None,
        }
    }

    /// Install the factory used by `get_or_insert_missing`.
    pub fn with_missing<F>(mut self, make: F) -> Self
    where
        F: Fn(&K) -> V + 'static,
    {
        self.missing = Some(Rc::new(make));
        self
    }

    pub fn from_keys<I>(capacity: usize, keys: I, value: V) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = K>,
        V: Clone,
    {
        let mut table = Self::new(capacity)?;
        for key in keys {
            table.set(key, value.clone())?;
        }
        Ok(table)
    }

    /// Build from `[key, value]` rows; see [`Mapping::extend_rows`].
    pub fn from_rows<I, R>(capacity: usize, rows: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[K]>,
        K: Clone,
        V: From<K>,
    {
        let mut table = Self::new(capacity)?;
        table.extend_rows(rows)?;
        Ok(table)
    }

    pub fn probe_strategy(&self) -> ProbeStrategy {
        self.probe
    }

    pub fn resize_policy(&self) -> ResizePolicy {
        self.resize
    }

    pub fn set_resize_policy(&mut self, resize: ResizePolicy) {
        self.resize = resize;
    }

    /// State of every slot in array order, for occupancy rendering.
    pub fn slot_states(&self) -> impl Iterator<Item = SlotState> + '_ {
        self.slots.iter().map(Slot::state)
    }

    /// Rebuild the slot array.
    ///
    /// The new capacity is the current one, repeatedly mapped through
    /// `c -> 2c + 1` until it exceeds `min_used`. Live entries are rehashed
    /// into the fresh array in slot order; tombstones are dropped.
    pub fn resize(&mut self, min_used: usize) {
        self.rebuild(min_used, None);
    }

    fn home<Q>(&self, key: &Q) -> usize
    where
        Q: ?Sized + KeyHash,
    {
        key.key_hash(&PolyHash::PRIMARY, self.slots.len())
    }

    /// Walk at most one full cycle of the probe sequence.
    fn locate<Q>(&self, key: &Q) -> Probe
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        self.stats.record_lookup();
        let size = self.slots.len();
        let hash = self.home(key);
        let stride = self.probe.stride(key, size);
        let mut index = hash;
        let mut free = None;
        for _ in 0..size {
            self.stats.record_probe();
            match &self.slots[index] {
                Slot::Empty => return Probe::Vacant(free.unwrap_or(index)),
                Slot::Live(e) => {
                    if self.stats.compare(&e.hash, &hash)
                        && <K as Borrow<Q>>::borrow(&e.key) == key
                    {
                        return Probe::Found(index);
                    }
                }
                Slot::Tombstone if free.is_none() => free = Some(index),
                Slot::Tombstone => {}
            }
            index = (index + stride) % size;
        }
        free.map_or(Probe::Full, Probe::Vacant)
    }

    /// Like `locate`, but a full table grows first when `policy` allows.
    fn locate_for_insert(&mut self, key: &K, policy: ResizePolicy) -> Result<Probe, TableError> {
        let probe = self.locate(key);
        if !matches!(probe, Probe::Full) {
            return Ok(probe);
        }
        match policy {
            ResizePolicy::Automatic => {
                self.rebuild(self.growth_target(), None);
                Ok(self.locate(key))
            }
            ResizePolicy::Disabled => {
                log::warn!(
                    "open table full at {} slots with resizing disabled",
                    self.slots.len()
                );
                Err(TableError::TableFull {
                    capacity: self.slots.len(),
                })
            }
        }
    }

    /// `set` with an explicit answer to "may a full table grow?".
    fn set_under(
        &mut self,
        key: K,
        value: V,
        policy: ResizePolicy,
    ) -> Result<Option<V>, TableError> {
        match self.locate_for_insert(&key, policy)? {
            Probe::Found(i) => Ok(Some(core::mem::replace(
                self.slots[i].occupied_value_mut(),
                value,
            ))),
            Probe::Vacant(i) => {
                self.occupy(i, key, value);
                Ok(None)
            }
            Probe::Full => Err(TableError::TableFull {
                capacity: self.slots.len(),
            }),
        }
    }

    /// Insert that may always grow, for the infallible bulk constructors.
    fn set_growing(&mut self, key: K, value: V) {
        if let Err(e) = self.set_under(key, value, ResizePolicy::Automatic) {
            unreachable!("a table that may grow never rejects an insert: {e}");
        }
    }

    /// Fill vacant slot `index`; returns where the entry lives afterwards,
    /// which differs from `index` if the insert triggered growth.
    fn occupy(&mut self, index: usize, key: K, value: V) -> usize {
        let hash = self.home(&key);
        if !matches!(self.slots[index], Slot::Tombstone) {
            self.filled += 1;
        }
        self.slots[index] = Slot::Live(Entry { key, value, hash });
        self.used += 1;
        self.grow_if_loaded(index)
    }

    fn grow_if_loaded(&mut self, track: usize) -> usize {
        if self.filled * 3 < self.slots.len() * 2 {
            return track;
        }
        match self.resize {
            ResizePolicy::Disabled => {
                log::trace!(
                    "load threshold reached ({} filled of {} slots); growth disabled",
                    self.filled,
                    self.slots.len()
                );
                track
            }
            ResizePolicy::Automatic => {
                let target = self.growth_target();
                log::debug!(
                    "growing open table: {} live, {} filled, {} slots, target above {}",
                    self.used,
                    self.filled,
                    self.slots.len(),
                    target
                );
                self.rebuild(target, Some(track)).unwrap_or(track)
            }
        }
    }

    fn growth_target(&self) -> usize {
        let factor = if self.used > self.large_table_threshold {
            2
        } else {
            4
        };
        factor * self.used.max(1)
    }

    fn rebuild(&mut self, min_used: usize, track: Option<usize>) -> Option<usize> {
        let old_size = self.slots.len();
        let mut new_size = old_size;
        while new_size <= min_used && new_size < usize::MAX / 2 {
            new_size = (new_size << 1) + 1;
        }
        let old = core::mem::replace(&mut self.slots, empty_slots(new_size));
        self.used = 0;
        self.filled = 0;
        let mut tracked = None;
        for (i, slot) in old.into_iter().enumerate() {
            if let Slot::Live(e) = slot {
                let at = self.insert_clean(e.key, e.value);
                if track == Some(i) {
                    tracked = Some(at);
                }
            }
        }
        self.epoch += 1;
        self.pop_hint = 0;
        log::debug!(
            "resized open table from {} to {} slots, {} live entries moved",
            old_size,
            new_size,
            self.used
        );
        tracked
    }

    /// Insert into a table known to hold no tombstones and not this key.
    fn insert_clean(&mut self, key: K, value: V) -> usize {
        let size = self.slots.len();
        let hash = self.home(&key);
        let stride = self.probe.stride(&key, size);
        let mut index = hash;
        while !matches!(self.slots[index], Slot::Empty) {
            index = (index + stride) % size;
        }
        self.slots[index] = Slot::Live(Entry { key, value, hash });
        self.used += 1;
        self.filled += 1;
        index
    }
}

impl<K, V> Traverse for OpenTable<K, V>
where
    K: KeyHash + Eq,
{
    type Key = K;
    type Value = V;
    type Pos = usize;

    fn stamp(&self) -> Stamp {
        Stamp {
            used: self.used,
            epoch: self.epoch,
        }
    }

    fn next_live(&self, pos: &mut usize) -> Option<(&K, &V)> {
        while *pos < self.slots.len() {
            let i = *pos;
            *pos += 1;
            if let Some(e) = self.slots[i].live() {
                return Some((&e.key, &e.value));
            }
        }
        None
    }
}

impl<K, V> Mapping for OpenTable<K, V>
where
    K: KeyHash + Eq,
{
    fn len(&self) -> usize {
        self.used
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn filled(&self) -> usize {
        self.filled
    }

    fn stats(&self) -> &ProbeStats {
        &self.stats
    }

    fn missing_factory(&self) -> Option<MissingFn<K, V>> {
        self.missing.clone()
    }

    fn find<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        match self.locate(key) {
            Probe::Found(i) => self.slots[i].live().map(|e| (&e.key, &e.value)),
            _ => None,
        }
    }

    fn find_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        match self.locate(key) {
            Probe::Found(i) => self.slots[i].live_mut().map(|e| &mut e.value),
            _ => None,
        }
    }

    fn set(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        self.set_under(key, value, self.resize)
    }

    fn get_or_insert_with<F>(&mut self, key: K, make: F) -> Result<&mut V, TableError>
    where
        F: FnOnce(&K) -> V,
    {
        let index = match self.locate_for_insert(&key, self.resize)? {
            Probe::Found(i) => i,
            Probe::Vacant(i) => {
                let value = make(&key);
                self.occupy(i, key, value)
            }
            Probe::Full => {
                return Err(TableError::TableFull {
                    capacity: self.slots.len(),
                })
            }
        };
        Ok(self.slots[index].occupied_value_mut())
    }

    fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        let Probe::Found(i) = self.locate(key) else {
            return None;
        };
        let pair = self.slots[i].bury()?;
        self.used -= 1;
        Some(pair)
    }

    fn pop_arbitrary(&mut self) -> Result<(K, V), TableError> {
        if self.used == 0 {
            return Err(TableError::EmptyTable);
        }
        let size = self.slots.len();
        for offset in 0..size {
            let i = (self.pop_hint + offset) % size;
            if let Some(pair) = self.slots[i].bury() {
                self.used -= 1;
                self.pop_hint = (i + 1) % size;
                return Ok(pair);
            }
        }
        Err(TableError::EmptyTable)
    }

    fn clear(&mut self) {
        log::debug!(
            "clearing open table: {} live, {} filled, {} slots",
            self.used,
            self.filled,
            self.slots.len()
        );
        self.slots = empty_slots(self.slots.len());
        self.used = 0;
        self.filled = 0;
        self.pop_hint = 0;
        self.epoch += 1;
    }
}

impl<K, V> Default for OpenTable<K, V>
where
    K: KeyHash + Eq,
{
    /// [`DEFAULT_CAPACITY`] slots, linear probing, no automatic growth.
    fn default() -> Self {
        Self::build(OpenConfig::default())
    }
}

impl<K, V> FromIterator<(K, V)> for OpenTable<K, V>
where
    K: KeyHash + Eq,
{
    /// Starts at the default capacity with automatic growth enabled.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::build(OpenConfig::default().with_resize(ResizePolicy::Automatic));
        for (k, v) in iter {
            table.set_growing(k, v);
        }
        table
    }
}

impl<K, V> Extend<(K, V)> for OpenTable<K, V>
where
    K: KeyHash + Eq,
{
    /// Grows a full table whatever the resize policy, so every pair lands.
    /// Use `set` to have a fixed-size table report `TableFull` instead.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set_growing(k, v);
        }
    }
}

impl<K, V> PartialEq for OpenTable<K, V>
where
    K: KeyHash + Eq,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl<K, V> fmt::Debug for OpenTable<K, V>
where
    K: KeyHash + Eq + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
