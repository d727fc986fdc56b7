//! ChainedTable: separate chaining with singly linked buckets.
//!
//! Chain nodes live in one `SlotMap` arena; a bucket is just the head and
//! tail keys of its chain. Removing an entry tombstones its node in place,
//! and the next insert into that bucket reuses the first tombstone it
//! walked past. Nodes are only freed by `clear`.
//!
//! The bucket count is fixed at construction. Chains grow without bound,
//! so lookups degrade linearly once the load factor climbs past one.

use crate::entry::{Entry, Slot};
use crate::error::TableError;
use crate::guard::Stamp;
use crate::hash::{KeyHash, PolyHash};
use crate::iter::Traverse;
use crate::mapping::{Mapping, MissingFn};
use crate::stats::ProbeStats;
use core::borrow::Borrow;
use core::fmt;
use slotmap::{DefaultKey, SlotMap};
use std::rc::Rc;

#[derive(Debug)]
struct Node<K, V> {
    slot: Slot<K, V>,
    next: Option<DefaultKey>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

/// Result of walking one chain for a key.
struct ChainProbe {
    bucket: usize,
    found: Option<DefaultKey>,
    reusable: Option<DefaultKey>,
}

pub struct ChainedTable<K, V> {
    buckets: Vec<Bucket>,
    nodes: SlotMap<DefaultKey, Node<K, V>>,
    used: usize,
    epoch: u64,
    pop_hint: usize,
    stats: Rc<ProbeStats>,
    missing: Option<MissingFn<K, V>>,
}

/// Cursor position: bucket index plus the next node to inspect in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainPos {
    bucket: usize,
    node: Option<DefaultKey>,
    entered: bool,
}

impl<K, V> ChainedTable<K, V>
where
    K: KeyHash + Eq,
{
    /// A table with `capacity` buckets. At least two are required.
    pub fn new(capacity: usize) -> Result<Self, TableError> {
        Self::with_stats(capacity, Rc::new(ProbeStats::new()))
    }

    /// Like [`ChainedTable::new`], recording into a shared counter.
    pub fn with_stats(capacity: usize, stats: Rc<ProbeStats>) -> Result<Self, TableError> {
        if capacity < 2 {
            return Err(TableError::InvalidArgument {
                reason: "capacity must be at least 2",
            });
        }
        Ok(Self {
            buckets: vec![Bucket::default(); capacity],
            nodes: SlotMap::with_key(),
            used: 0,
            epoch: 0,
            pop_hint: 0,
            stats,
            missing: None,
        })
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

    /// Nodes per bucket, live and tombstoned, for occupancy rendering.
    pub fn chain_lengths(&self) -> Vec<usize> {
        (0..self.buckets.len()).map(|b| self.chain(b).count()).collect()
    }

    fn bucket_of<Q>(&self, key: &Q) -> usize
    where
        Q: ?Sized + KeyHash,
    {
        key.key_hash(&PolyHash::PRIMARY, self.buckets.len())
    }

    fn chain(&self, bucket: usize) -> Chain<'_, K, V> {
        Chain {
            nodes: &self.nodes,
            next: self.buckets.get(bucket).and_then(|b| b.head),
        }
    }

    /// Single walk of the key's chain: the live match if any, and the first
    /// tombstone seen. Every live key compared is counted.
    fn probe<Q>(&self, key: &Q) -> ChainProbe
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        self.stats.record_lookup();
        let bucket = self.bucket_of(key);
        let mut reusable = None;
        for (k, node) in self.chain(bucket) {
            self.stats.record_probe();
            match &node.slot {
                Slot::Live(e) => {
                    if self.stats.compare(<K as Borrow<Q>>::borrow(&e.key), key) {
                        return ChainProbe {
                            bucket,
                            found: Some(k),
                            reusable,
                        };
                    }
                }
                Slot::Tombstone if reusable.is_none() => reusable = Some(k),
                _ => {}
            }
        }
        ChainProbe {
            bucket,
            found: None,
            reusable,
        }
    }

    /// Place a new live entry for a key already known to be absent.
    fn place(&mut self, probe: ChainProbe, key: K, value: V) -> DefaultKey {
        let entry = Slot::Live(Entry {
            key,
            value,
            hash: probe.bucket,
        });
        self.used += 1;
        if let Some(k) = probe.reusable {
            if let Some(node) = self.nodes.get_mut(k) {
                node.slot = entry;
                return k;
            }
        }
        let k = self.nodes.insert(Node {
            slot: entry,
            next: None,
        });
        let bucket = &mut self.buckets[probe.bucket];
        match bucket.tail {
            Some(tail) => {
                if let Some(node) = self.nodes.get_mut(tail) {
                    node.next = Some(k);
                }
            }
            None => bucket.head = Some(k),
        }
        bucket.tail = Some(k);
        k
    }

    fn value_mut_at(&mut self, k: DefaultKey) -> Option<&mut V> {
        self.nodes
            .get_mut(k)
            .and_then(|n| n.slot.live_mut())
            .map(|e| &mut e.value)
    }
}

struct Chain<'a, K, V> {
    nodes: &'a SlotMap<DefaultKey, Node<K, V>>,
    next: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (DefaultKey, &'a Node<K, V>);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.next?;
        let node = self.nodes.get(k)?;
        self.next = node.next;
        Some((k, node))
    }
}

impl<K, V> Traverse for ChainedTable<K, V>
where
    K: KeyHash + Eq,
{
    type Key = K;
    type Value = V;
    type Pos = ChainPos;

    fn stamp(&self) -> Stamp {
        Stamp {
            used: self.used,
            epoch: self.epoch,
        }
    }

    fn next_live(&self, pos: &mut ChainPos) -> Option<(&K, &V)> {
        while pos.bucket < self.buckets.len() {
            let at = if pos.entered {
                pos.node
            } else {
                pos.entered = true;
                self.buckets[pos.bucket].head
            };
            match at.and_then(|k| self.nodes.get(k)) {
                Some(node) => {
                    pos.node = node.next;
                    if let Some(e) = node.slot.live() {
                        return Some((&e.key, &e.value));
                    }
                }
                None => {
                    pos.bucket += 1;
                    pos.node = None;
                    pos.entered = false;
                }
            }
        }
        None
    }
}

impl<K, V> Mapping for ChainedTable<K, V>
where
    K: KeyHash + Eq,
{
    fn len(&self) -> usize {
        self.used
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn filled(&self) -> usize {
        self.nodes.len()
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
        let k = self.probe(key).found?;
        let e = self.nodes.get(k)?.slot.live()?;
        Some((&e.key, &e.value))
    }

    fn find_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        let k = self.probe(key).found?;
        self.value_mut_at(k)
    }

    fn set(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        let probe = self.probe(&key);
        if let Some(k) = probe.found {
            if let Some(slot) = self.value_mut_at(k) {
                return Ok(Some(core::mem::replace(slot, value)));
            }
        }
        self.place(probe, key, value);
        Ok(None)
    }

    fn get_or_insert_with<F>(&mut self, key: K, make: F) -> Result<&mut V, TableError>
    where
        F: FnOnce(&K) -> V,
    {
        let probe = self.probe(&key);
        let k = match probe.found {
            Some(k) => k,
            None => {
                let value = make(&key);
                self.place(probe, key, value)
            }
        };
        Ok(self.nodes[k].slot.occupied_value_mut())
    }

    fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        let k = self.probe(key).found?;
        let pair = self.nodes.get_mut(k)?.slot.bury()?;
        self.used -= 1;
        Some(pair)
    }

    fn pop_arbitrary(&mut self) -> Result<(K, V), TableError> {
        if self.used == 0 {
            return Err(TableError::EmptyTable);
        }
        let size = self.buckets.len();
        for offset in 0..size {
            let bucket = (self.pop_hint + offset) % size;
            let hit = self
                .chain(bucket)
                .find(|(_, node)| node.slot.live().is_some())
                .map(|(k, _)| k);
            if let Some(pair) = hit.and_then(|k| self.nodes.get_mut(k)?.slot.bury()) {
                self.used -= 1;
                // The bucket may hold more live nodes; resume here next time.
                self.pop_hint = bucket;
                return Ok(pair);
            }
        }
        Err(TableError::EmptyTable)
    }

    fn clear(&mut self) {
        log::debug!(
            "clearing chained table: {} live, {} nodes, {} buckets",
            self.used,
            self.nodes.len(),
            self.buckets.len()
        );
        self.nodes.clear();
        self.buckets.fill(Bucket::default());
        self.used = 0;
        self.pop_hint = 0;
        self.epoch += 1;
    }
}

impl<K, V> Extend<(K, V)> for ChainedTable<K, V>
where
    K: KeyHash + Eq,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            if let Err(e) = self.set(k, v) {
                unreachable!("a chained table never runs out of room: {e}");
            }
        }
    }
}

impl<K, V> PartialEq for ChainedTable<K, V>
where
    K: KeyHash + Eq,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl<K, V> fmt::Debug for ChainedTable<K, V>
where
    K: KeyHash + Eq + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
