//! Slot states shared by both engines.

/// A live key/value pair and the home index it hashed to.
#[derive(Debug, Clone)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: usize,
}

/// One storage cell. Chain nodes are only ever `Live` or `Tombstone`; the
/// flat open-addressing array starts out all `Empty`.
#[derive(Debug, Clone)]
pub(crate) enum Slot<K, V> {
    Empty,
    Live(Entry<K, V>),
    Tombstone,
}

impl<K, V> Default for Slot<K, V> {
    fn default() -> Self {
        Slot::Empty
    }
}

impl<K, V> Slot<K, V> {
    #[inline]
    pub(crate) fn live(&self) -> Option<&Entry<K, V>> {
        match self {
            Slot::Live(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn live_mut(&mut self) -> Option<&mut Entry<K, V>> {
        match self {
            Slot::Live(e) => Some(e),
            _ => None,
        }
    }

    /// Value of a slot the caller has just located live or just filled.
    ///
    /// # Panics
    ///
    /// If the slot is empty or a tombstone.
    #[inline]
    pub(crate) fn occupied_value_mut(&mut self) -> &mut V {
        match self {
            Slot::Live(e) => &mut e.value,
            _ => unreachable!("slot was located live or filled just before"),
        }
    }

    /// Turn a live slot into a tombstone and hand back its pair.
    pub(crate) fn bury(&mut self) -> Option<(K, V)> {
        if !matches!(self, Slot::Live(_)) {
            return None;
        }
        match core::mem::replace(self, Slot::Tombstone) {
            Slot::Live(e) => Some((e.key, e.value)),
            _ => None,
        }
    }

    pub(crate) fn state(&self) -> SlotState {
        match self {
            Slot::Empty => SlotState::Empty,
            Slot::Live(e) => SlotState::Live { hash: e.hash },
            Slot::Tombstone => SlotState::Tombstone,
        }
    }
}

/// Read-only view of a slot, for rendering occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Live { hash: usize },
    Tombstone,
}

impl SlotState {
    pub fn is_live(&self) -> bool {
        matches!(self, SlotState::Live { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bury_moves_pair_out_and_leaves_tombstone() {
        let mut s = Slot::Live(Entry {
            key: "k",
            value: 1,
            hash: 4,
        });
        assert_eq!(s.state(), SlotState::Live { hash: 4 });
        assert_eq!(s.bury(), Some(("k", 1)));
        assert_eq!(s.state(), SlotState::Tombstone);
        // A second bury finds nothing live.
        assert_eq!(s.bury(), None);
        assert_eq!(s.state(), SlotState::Tombstone);
    }

    #[test]
    fn occupied_value_mut_writes_through() {
        let mut s = Slot::Live(Entry {
            key: "k",
            value: 1,
            hash: 0,
        });
        *s.occupied_value_mut() += 41;
        assert_eq!(s.live().map(|e| e.value), Some(42));
    }

    #[test]
    #[should_panic]
    fn occupied_value_mut_rejects_tombstone() {
        let mut s: Slot<&str, i32> = Slot::Tombstone;
        s.occupied_value_mut();
    }

    #[test]
    fn empty_slot_has_no_entry() {
        let mut s: Slot<&str, i32> = Slot::default();
        assert!(s.live().is_none());
        assert!(s.live_mut().is_none());
        assert_eq!(s.bury(), None);
        assert_eq!(s.state(), SlotState::Empty);
    }
}
