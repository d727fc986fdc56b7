//! The mapping contract shared by both engines.
//!
//! Each engine supplies the structural primitives (lookup, insert, bury,
//! scan); everything else is provided here in terms of them, so a caller
//! written against `M: Mapping` runs unchanged on either collision strategy.

use crate::error::TableError;
use crate::hash::KeyHash;
use crate::iter::{Cursor, Items, Iter, Keys, Traverse, Values};
use crate::stats::ProbeStats;
use core::borrow::Borrow;
use std::rc::Rc;

/// Factory consulted by [`Mapping::get_or_insert_missing`].
pub type MissingFn<K, V> = Rc<dyn Fn(&K) -> V>;

pub trait Mapping: Traverse + Sized {
    /// Live entries.
    fn len(&self) -> usize;

    /// Buckets (chaining) or slots (open addressing).
    fn capacity(&self) -> usize;

    /// Live entries plus tombstones.
    fn filled(&self) -> usize;

    fn stats(&self) -> &ProbeStats;

    fn missing_factory(&self) -> Option<MissingFn<Self::Key, Self::Value>>;

    fn find<Q>(&self, key: &Q) -> Option<(&Self::Key, &Self::Value)>
    where
        Self::Key: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq;

    fn find_mut<Q>(&mut self, key: &Q) -> Option<&mut Self::Value>
    where
        Self::Key: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq;

    /// Insert or overwrite; returns the previous value on overwrite.
    fn set(
        &mut self,
        key: Self::Key,
        value: Self::Value,
    ) -> Result<Option<Self::Value>, TableError>;

    /// Return the live value for `key`, inserting `make(&key)` first if absent.
    fn get_or_insert_with<F>(
        &mut self,
        key: Self::Key,
        make: F,
    ) -> Result<&mut Self::Value, TableError>
    where
        F: FnOnce(&Self::Key) -> Self::Value;

    /// Tombstone the entry for `key` and hand back the pair.
    fn remove_entry<Q>(&mut self, key: &Q) -> Option<(Self::Key, Self::Value)>
    where
        Self::Key: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq;

    /// Remove some live entry. Successive calls resume scanning where the
    /// previous one stopped, so the order is deterministic for a given
    /// sequence of operations.
    fn pop_arbitrary(&mut self) -> Result<(Self::Key, Self::Value), TableError>;

    /// Drop every entry, keeping the current capacity.
    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    fn get<Q>(&self, key: &Q) -> Result<&Self::Value, TableError>
    where
        Self::Key: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        self.find(key).map(|(_, v)| v).ok_or(TableError::KeyNotFound)
    }

    fn get_or<'a, Q>(&'a self, key: &Q, default: &'a Self::Value) -> &'a Self::Value
    where
        Self::Key: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        self.get(key).unwrap_or(default)
    }

    fn get_mut<Q>(&mut self, key: &Q) -> Result<&mut Self::Value, TableError>
    where
        Self::Key: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        self.find_mut(key).ok_or(TableError::KeyNotFound)
    }

    /// Look up `key`, falling back to the factory given at construction.
    ///
    /// A factory-made value is stored before it is returned. Without a
    /// factory a missing key is `KeyNotFound`.
    fn get_or_insert_missing(&mut self, key: Self::Key) -> Result<&mut Self::Value, TableError> {
        match self.missing_factory() {
            Some(make) => self.get_or_insert_with(key, move |k| make(k)),
            None => self.find_mut(&key).ok_or(TableError::KeyNotFound),
        }
    }

    fn contains<Q>(&self, key: &Q) -> bool
    where
        Self::Key: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        self.find(key).is_some()
    }

    fn delete<Q>(&mut self, key: &Q) -> Result<(), TableError>
    where
        Self::Key: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        self.remove_entry(key).map(drop).ok_or(TableError::KeyNotFound)
    }

    fn pop<Q>(&mut self, key: &Q) -> Result<Self::Value, TableError>
    where
        Self::Key: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        self.remove_entry(key).map(|(_, v)| v).ok_or(TableError::KeyNotFound)
    }

    fn pop_or<Q>(&mut self, key: &Q, default: Self::Value) -> Self::Value
    where
        Self::Key: Borrow<Q>,
        Q: ?Sized + KeyHash + Eq,
    {
        self.pop(key).unwrap_or(default)
    }

    /// Insert `default` if `key` is absent; return the resulting value.
    fn set_default(
        &mut self,
        key: Self::Key,
        default: Self::Value,
    ) -> Result<&mut Self::Value, TableError> {
        self.get_or_insert_with(key, move |_| default)
    }

    fn iter(&self) -> Iter<'_, Self> {
        Iter::new(self)
    }

    fn keys(&self) -> Vec<&Self::Key> {
        self.iter().map(|(k, _)| k).collect()
    }

    fn values(&self) -> Vec<&Self::Value> {
        self.iter().map(|(_, v)| v).collect()
    }

    fn items(&self) -> Vec<(&Self::Key, &Self::Value)> {
        self.iter().collect()
    }

    fn iter_keys(&self) -> Cursor<Self, Keys> {
        Cursor::new(self)
    }

    fn iter_values(&self) -> Cursor<Self, Values> {
        Cursor::new(self)
    }

    fn iter_items(&self) -> Cursor<Self, Items> {
        Cursor::new(self)
    }

    /// Same live count, and every pair here is found with an equal value in
    /// `other`. Works across engines.
    fn equals<M>(&self, other: &M) -> bool
    where
        M: Mapping<Key = Self::Key>,
        Self::Value: PartialEq<M::Value>,
    {
        if self.len() != other.len() {
            return false;
        }
        self.iter()
            .all(|(k, v)| other.find(k).is_some_and(|(_, ov)| v == ov))
    }

    /// Set every `[key, value]` row in order.
    ///
    /// Stops at the first row that is not exactly two elements long with
    /// `MalformedPair`; rows before it stay applied.
    fn extend_rows<I, R>(&mut self, rows: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[Self::Key]>,
        Self::Key: Clone,
        Self::Value: From<Self::Key>,
    {
        for (index, row) in rows.into_iter().enumerate() {
            match row.as_ref() {
                [k, v] => {
                    self.set(k.clone(), <Self::Value as From<Self::Key>>::from(v.clone()))?;
                }
                other => {
                    return Err(TableError::MalformedPair {
                        index,
                        len: other.len(),
                    })
                }
            }
        }
        Ok(())
    }
}
