//! Traversal over live entries.
//!
//! Two shapes are offered:
//! - [`Iter`] borrows the table; the borrow checker already rules out
//!   mutation, so it is a plain `Iterator`.
//! - [`Cursor`] is detached: it remembers a position and a [`Stamp`] and
//!   takes the table on every step, so the caller may mutate the table
//!   between steps. The next step then fails with `ConcurrentModification`
//!   instead of yielding stale or duplicated entries.

use crate::error::TableError;
use crate::guard::{ModificationGuard, Stamp};
use crate::hash::KeyHash;
use core::iter::FusedIterator;
use core::marker::PhantomData;

/// Ordered walk over the live slots of a table.
pub trait Traverse {
    type Key: KeyHash + Eq;
    type Value;
    /// Cursor position; `Default` is the start of the table.
    type Pos: Default + Clone + core::fmt::Debug;

    fn stamp(&self) -> Stamp;

    /// Advance `pos` past empty slots and tombstones to the next live entry.
    fn next_live(&self, pos: &mut Self::Pos) -> Option<(&Self::Key, &Self::Value)>;
}

/// Projection of a live entry into what a cursor yields.
pub trait View<'a, K, V> {
    type Out;
    fn project(key: &'a K, value: &'a V) -> Self::Out;
}

#[derive(Debug, Clone, Copy)]
pub struct Keys;
#[derive(Debug, Clone, Copy)]
pub struct Values;
#[derive(Debug, Clone, Copy)]
pub struct Items;

impl<'a, K: 'a, V: 'a> View<'a, K, V> for Keys {
    type Out = &'a K;
    #[inline]
    fn project(key: &'a K, _value: &'a V) -> Self::Out {
        key
    }
}

impl<'a, K: 'a, V: 'a> View<'a, K, V> for Values {
    type Out = &'a V;
    #[inline]
    fn project(_key: &'a K, value: &'a V) -> Self::Out {
        value
    }
}

impl<'a, K: 'a, V: 'a> View<'a, K, V> for Items {
    type Out = (&'a K, &'a V);
    #[inline]
    fn project(key: &'a K, value: &'a V) -> Self::Out {
        (key, value)
    }
}

/// Detached single-pass cursor bound to the table it was created from.
///
/// Always pass that same table to [`Cursor::next`].
pub struct Cursor<T: Traverse, W> {
    guard: ModificationGuard,
    pos: T::Pos,
    remaining: usize,
    _view: PhantomData<fn() -> W>,
}

pub type KeysIter<T> = Cursor<T, Keys>;
pub type ValuesIter<T> = Cursor<T, Values>;
pub type ItemsIter<T> = Cursor<T, Items>;

impl<T: Traverse, W> Cursor<T, W> {
    pub fn new(table: &T) -> Self {
        let stamp = table.stamp();
        Self {
            guard: ModificationGuard::bind(stamp),
            pos: T::Pos::default(),
            remaining: stamp.used,
            _view: PhantomData,
        }
    }

    /// Step to the next live entry.
    ///
    /// `Some(Err(ConcurrentModification))` once the table's live count or
    /// layout changed since the cursor was created, on this and every later
    /// call. `None` once the table is exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next<'m>(
        &mut self,
        table: &'m T,
    ) -> Option<Result<<W as View<'m, T::Key, T::Value>>::Out, TableError>>
    where
        W: View<'m, T::Key, T::Value>,
    {
        if let Err(e) = self.guard.check(table.stamp()) {
            return Some(Err(e));
        }
        let (key, value) = table.next_live(&mut self.pos)?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(Ok(W::project(key, value)))
    }

    /// Entries not yet yielded, as of the binding.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_poisoned(&self) -> bool {
        self.guard.is_poisoned()
    }

    /// Pair the cursor with a borrowed table to get a std `Iterator`.
    pub fn walk(self, table: &T) -> Walk<'_, T, W> {
        Walk {
            cursor: self,
            table,
            done: false,
        }
    }
}

/// A [`Cursor`] paired with its table. Yields at most one error, then ends.
pub struct Walk<'m, T: Traverse, W> {
    cursor: Cursor<T, W>,
    table: &'m T,
    done: bool,
}

impl<'m, T, W> Iterator for Walk<'m, T, W>
where
    T: Traverse,
    W: View<'m, T::Key, T::Value>,
{
    type Item = Result<W::Out, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.cursor.next(self.table);
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// Borrowing iterator over `(key, value)` pairs in table order.
pub struct Iter<'a, T: Traverse> {
    table: &'a T,
    pos: T::Pos,
    remaining: usize,
}

impl<'a, T: Traverse> Iter<'a, T> {
    pub fn new(table: &'a T) -> Self {
        Self {
            table,
            pos: T::Pos::default(),
            remaining: table.stamp().used,
        }
    }
}

impl<'a, T: Traverse> Iterator for Iter<'a, T> {
    type Item = (&'a T::Key, &'a T::Value);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let table: &'a T = self.table;
        let item = table.next_live(&mut self.pos)?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T: Traverse> ExactSizeIterator for Iter<'a, T> {}
impl<'a, T: Traverse> FusedIterator for Iter<'a, T> {}
