#![cfg(test)]

// Property tests for both engines kept inside the crate so they can check
// slot-level bookkeeping through the internal accessors.

use crate::chained_table::ChainedTable;
use crate::entry::SlotState;
use crate::error::TableError;
use crate::hash::ProbeStrategy;
use crate::mapping::Mapping;
use crate::open_table::{OpenConfig, OpenTable, ResizePolicy};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Pool-indexed operations: indices shrink toward earlier keys and the op list
// shrinks in length.
#[derive(Clone, Debug)]
enum OpI {
    Set(usize, i32),
    SetDefault(usize, i32),
    Delete(usize),
    Pop(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    PopArbitrary,
    Resize(usize),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Set(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::SetDefault(i, v)),
            2 => idx.clone().prop_map(OpI::Delete),
            1 => idx.clone().prop_map(OpI::Pop),
            1 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::PopArbitrary),
            1 => (0usize..40).prop_map(OpI::Resize),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// Engine-specific hooks the shared state machine needs.
trait Harness: Mapping<Key = String, Value = i32> {
    fn resize_to(&mut self, min_used: usize);
    fn check_layout(&self) -> Result<(), TestCaseError>;
}

impl Harness for ChainedTable<String, i32> {
    // Chaining has a fixed bucket count.
    fn resize_to(&mut self, _min_used: usize) {}

    fn check_layout(&self) -> Result<(), TestCaseError> {
        prop_assert_eq!(self.chain_lengths().iter().sum::<usize>(), self.filled());
        prop_assert!(self.filled() >= self.len());
        Ok(())
    }
}

impl Harness for OpenTable<String, i32> {
    fn resize_to(&mut self, min_used: usize) {
        self.resize(min_used);
    }

    fn check_layout(&self) -> Result<(), TestCaseError> {
        let states: Vec<SlotState> = self.slot_states().collect();
        let live = states.iter().filter(|s| s.is_live()).count();
        let tombs = states.iter().filter(|s| **s == SlotState::Tombstone).count();
        prop_assert_eq!(states.len(), self.capacity());
        prop_assert_eq!(live, self.len());
        prop_assert_eq!(live + tombs, self.filled());
        Ok(())
    }
}

fn run_state_machine<M: Harness>(
    mut sut: M,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, i32> = HashMap::new();
    for op in ops {
        match op {
            OpI::Set(i, v) => {
                let k = pool[i].clone();
                match sut.set(k.clone(), v) {
                    Ok(prev) => prop_assert_eq!(prev, model.insert(k, v)),
                    Err(TableError::TableFull { capacity }) => {
                        prop_assert!(!model.contains_key(&k), "overwrites never report full");
                        prop_assert_eq!(capacity, sut.len());
                    }
                    Err(e) => return Err(TestCaseError::fail(format!("unexpected error {e}"))),
                }
            }
            OpI::SetDefault(i, v) => {
                let k = pool[i].clone();
                let expected = *model.get(&k).unwrap_or(&v);
                match sut.set_default(k.clone(), v) {
                    Ok(got) => {
                        prop_assert_eq!(*got, expected);
                        model.entry(k).or_insert(v);
                    }
                    Err(TableError::TableFull { .. }) => prop_assert!(!model.contains_key(&k)),
                    Err(e) => return Err(TestCaseError::fail(format!("unexpected error {e}"))),
                }
            }
            OpI::Delete(i) => {
                let k = &pool[i];
                let res = sut.delete(k.as_str());
                prop_assert_eq!(res.is_ok(), model.remove(k).is_some());
                if res.is_err() {
                    prop_assert_eq!(res, Err(TableError::KeyNotFound));
                }
            }
            OpI::Pop(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.pop(k.as_str()).ok(), model.remove(k));
            }
            OpI::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k.as_str()).ok(), model.get(k));
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains(s.as_str()), model.contains_key(&s));
            }
            OpI::Mutate(i, d) => {
                let k = &pool[i];
                if let Ok(v) = sut.get_mut(k.as_str()) {
                    *v = v.wrapping_add(d);
                    let m = model.get_mut(k).expect("model tracks live key");
                    *m = m.wrapping_add(d);
                } else {
                    prop_assert!(!model.contains_key(k));
                }
            }
            OpI::PopArbitrary => match sut.pop_arbitrary() {
                Ok((k, v)) => prop_assert_eq!(model.remove(&k), Some(v)),
                Err(e) => {
                    prop_assert_eq!(e, TableError::EmptyTable);
                    prop_assert!(model.is_empty());
                }
            },
            OpI::Resize(n) => sut.resize_to(n),
            OpI::Iterate => {
                let keys: BTreeSet<&String> = sut.keys().into_iter().collect();
                let expected: BTreeSet<&String> = model.keys().collect();
                prop_assert_eq!(keys, expected);
                for (k, v) in sut.items() {
                    prop_assert_eq!(Some(v), model.get(k));
                }
            }
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        sut.check_layout()?;
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `set` returns the previous value exactly when the model had one.
// - Lookups, deletes and pops agree with the model; misses are KeyNotFound.
// - `pop_arbitrary` removes some live pair and fails only when empty.
// - `len` equals live slots; `filled` equals live slots plus tombstones.
// - A fixed open table reports TableFull only for new keys once every slot is live.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_chained_state_machine((pool, ops) in arb_scenario(), cap in 2usize..16) {
        let sut: ChainedTable<String, i32> = ChainedTable::new(cap).unwrap();
        run_state_machine(sut, &pool, ops)?;
    }

    #[test]
    fn prop_open_fixed_state_machine(
        (pool, ops) in arb_scenario(),
        cap in 2usize..16,
        double in any::<bool>(),
    ) {
        let probe = if double { ProbeStrategy::DoubleHash } else { ProbeStrategy::Linear };
        let config = OpenConfig::new().with_capacity(cap).with_probe(probe);
        let sut: OpenTable<String, i32> = OpenTable::with_config(config).unwrap();
        run_state_machine(sut, &pool, ops)?;
    }

    #[test]
    fn prop_open_growing_state_machine(
        (pool, ops) in arb_scenario(),
        cap in 2usize..8,
        double in any::<bool>(),
    ) {
        let probe = if double { ProbeStrategy::DoubleHash } else { ProbeStrategy::Linear };
        let config = OpenConfig::new()
            .with_capacity(cap)
            .with_probe(probe)
            .with_resize(ResizePolicy::Automatic);
        let sut: OpenTable<String, i32> = OpenTable::with_config(config).unwrap();
        run_state_machine(sut, &pool, ops)?;
    }
}
