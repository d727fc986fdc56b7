// Cursor modification-detection suite.
//
// Cursors are detached from the table: each step borrows the table again,
// so the caller may mutate in between. Invariants covered:
// - An unchanged table yields every live entry exactly once, then None.
// - Insert, delete, resize and clear between steps make the next step
//   fail with ConcurrentModification, on both engines.
// - The failure is sticky: later steps keep failing even if the live
//   count returns to its original value.
// - Overwriting a value or updating it in place is not a structural
//   change and does not invalidate the cursor.
use probe_tables::{
    ChainedTable, ItemsIter, Mapping, OpenConfig, OpenTable, ResizePolicy, TableError,
};
use std::collections::BTreeSet;
use test_log::test;

fn chained() -> ChainedTable<String, i32> {
    let mut t = ChainedTable::new(5).unwrap();
    for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
        t.set(k.to_string(), i as i32).unwrap();
    }
    t
}

fn open() -> OpenTable<String, i32> {
    let mut t = OpenTable::new(11).unwrap();
    for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
        t.set(k.to_string(), i as i32).unwrap();
    }
    t
}

#[test]
fn full_pass_without_mutation() {
    let t = chained();
    let mut c = t.iter_items();
    assert_eq!(c.remaining(), 4);
    let mut seen = BTreeSet::new();
    while let Some(item) = c.next(&t) {
        let (k, v) = item.unwrap();
        assert!(seen.insert(k.clone()));
        assert_eq!(t.get(k.as_str()), Ok(v));
    }
    assert_eq!(seen.len(), 4);
    assert_eq!(c.remaining(), 0);
    assert!(c.next(&t).is_none());

    let t = open();
    let keys: BTreeSet<&String> = t.iter_keys().walk(&t).map(Result::unwrap).collect();
    assert_eq!(keys.len(), 4);
    let total: i32 = t.iter_values().walk(&t).map(Result::unwrap).sum();
    assert_eq!(total, 6);
}

// Test: set of a new key mid-iteration.
#[test]
fn insert_between_steps_is_detected() {
    let mut t = chained();
    let mut c = t.iter_items();
    assert!(matches!(c.next(&t), Some(Ok(_))));
    t.set("e".to_string(), 9).unwrap();
    assert_eq!(c.next(&t), Some(Err(TableError::ConcurrentModification)));

    let mut t = open();
    let mut c = t.iter_keys();
    assert!(matches!(c.next(&t), Some(Ok(_))));
    t.set("e".to_string(), 9).unwrap();
    assert_eq!(c.next(&t), Some(Err(TableError::ConcurrentModification)));
}

// Test: delete mid-iteration.
#[test]
fn delete_between_steps_is_detected() {
    let mut t = chained();
    let mut c = t.iter_values();
    assert!(matches!(c.next(&t), Some(Ok(_))));
    t.delete("c").unwrap();
    assert_eq!(c.next(&t), Some(Err(TableError::ConcurrentModification)));

    let mut t = open();
    let mut c = t.iter_values();
    t.pop_arbitrary().unwrap();
    assert_eq!(c.next(&t), Some(Err(TableError::ConcurrentModification)));
}

// Test: structural changes that keep the live count.
// Verifies: resize and clear on an already-empty table still invalidate.
#[test]
fn resize_and_clear_are_detected() {
    let mut t = open();
    let mut c = t.iter_items();
    assert!(matches!(c.next(&t), Some(Ok(_))));
    t.resize(50);
    assert_eq!(t.len(), 4);
    assert_eq!(c.next(&t), Some(Err(TableError::ConcurrentModification)));

    let mut empty: ChainedTable<String, i32> = ChainedTable::new(3).unwrap();
    let mut c = empty.iter_keys();
    empty.clear();
    assert_eq!(c.next(&empty), Some(Err(TableError::ConcurrentModification)));
}

// Test: automatic growth triggered by an insert.
#[test]
fn automatic_growth_is_detected() {
    let config = OpenConfig::new()
        .with_capacity(5)
        .with_resize(ResizePolicy::Automatic);
    let mut t: OpenTable<u32, u32> = OpenTable::with_config(config).unwrap();
    t.set(1, 1).unwrap();
    let mut c: ItemsIter<OpenTable<u32, u32>> = t.iter_items();
    for k in [2u32, 3, 4] {
        t.set(k, k).unwrap();
    }
    for k in [2u32, 3, 4] {
        t.delete(&k).unwrap();
    }
    // Same live count as at binding, but the array was rebuilt.
    assert_eq!(t.len(), 1);
    assert!(t.capacity() > 5);
    assert_eq!(c.next(&t), Some(Err(TableError::ConcurrentModification)));
}

// Test: once poisoned, always poisoned.
#[test]
fn failure_is_sticky() {
    let mut t = chained();
    let mut c = t.iter_keys();
    t.set("x".to_string(), 0).unwrap();
    assert_eq!(c.next(&t), Some(Err(TableError::ConcurrentModification)));
    assert!(c.is_poisoned());
    t.delete("x").unwrap();
    assert_eq!(t.len(), 4);
    for _ in 0..3 {
        assert_eq!(c.next(&t), Some(Err(TableError::ConcurrentModification)));
    }
    assert!(TableError::ConcurrentModification.is_sticky());
}

// Test: walk surfaces the failure once and then ends.
#[test]
fn walk_stops_after_error() {
    let mut t = open();
    let c = t.iter_items();
    t.delete("a").unwrap();
    let out: Vec<_> = c.walk(&t).collect();
    assert_eq!(out, vec![Err(TableError::ConcurrentModification)]);
}

// Test: value-only updates between steps.
// Verifies: the cursor keeps going and observes the new values.
#[test]
fn overwrite_and_in_place_update_are_allowed() {
    let mut t = open();
    let mut c = t.iter_items();
    let mut visited = 0;
    loop {
        let key = match c.next(&t) {
            Some(item) => item.unwrap().0.clone(),
            None => break,
        };
        visited += 1;
        t.set(key.clone(), 100).unwrap();
        *t.get_mut(key.as_str()).unwrap() += 1;
        assert!(!c.is_poisoned());
    }
    assert_eq!(visited, 4);
    assert!(t.values().into_iter().all(|v| *v == 101));

    let mut t = chained();
    let mut c = t.iter_keys();
    let _ = c.next(&t);
    t.set("a".to_string(), -1).unwrap();
    assert!(matches!(c.next(&t), Some(Ok(_))));
}
