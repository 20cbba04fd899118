#![cfg(test)]

// Property tests for HashTable kept inside the crate so they can reach
// internal state without feature gates.

use crate::error::DbError;
use crate::hash_table::{Entry, HashTable, ResizeInfo, StdHooks, TableHooks};
use crate::sizing::{next_prime, TableConfig};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

#[derive(Clone, Debug)]
enum OpI {
    Add(usize, i32),
    Remove(usize),
    Find(usize),
    Rekey(usize, usize),
    Resize(usize),
    Iterate,
    Flush,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, bool, bool, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Add(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Find),
            1 => (idx.clone(), idx.clone()).prop_map(|(i, j)| OpI::Rekey(i, j)),
            1 => (0usize..40).prop_map(OpI::Resize),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Flush),
        ];
        (
            any::<bool>(),
            any::<bool>(),
            proptest::collection::vec(op, 1..80),
        )
            .prop_map(move |(grow, shrink, ops)| (pool.clone(), grow, shrink, ops))
    })
}

fn is_prime(n: usize) -> bool {
    n >= 2 && (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0)
}

// Shared driver so both hook flavors run the same state machine.
fn run<H: TableHooks<String>>(
    mut sut: HashTable<String, i32, H>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut live: HashMap<String, Entry> = HashMap::new();
    let autogrow = sut.config().autogrow;

    for op in ops {
        match op {
            OpI::Add(i, v) => {
                let k = pool[i].clone();
                let e = sut.new_entry(v);
                let res = sut.add(e, k.clone());
                if model.contains_key(&k) {
                    prop_assert_eq!(res, Err(DbError::Duplicate));
                    prop_assert_eq!(sut.release_entry(e), Ok(v));
                } else if sut.modulus() == 0 && !autogrow {
                    prop_assert_eq!(res, Err(DbError::NoTable));
                    prop_assert_eq!(sut.release_entry(e), Ok(v));
                } else {
                    prop_assert_eq!(res, Ok(()));
                    model.insert(k.clone(), v);
                    live.insert(k, e);
                    if autogrow {
                        prop_assert!(sut.len() <= sut.rollover());
                    }
                }
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                if let Some(e) = live.remove(k) {
                    prop_assert_eq!(sut.remove(e), Ok(()));
                    prop_assert_eq!(sut.remove(e), Err(DbError::Unused));
                    let mv = model.remove(k).expect("present in model");
                    prop_assert_eq!(sut.release_entry(e), Ok(mv));
                    prop_assert_eq!(sut.value(e), Err(DbError::BadArgs));
                } else {
                    prop_assert_eq!(sut.find(k), Err(DbError::NoEntry));
                }
            }
            OpI::Find(i) => {
                let k = &pool[i];
                match live.get(k) {
                    Some(&e) => {
                        prop_assert_eq!(sut.find(k), Ok(e));
                        prop_assert_eq!(sut.value(e), Ok(&model[k]));
                    }
                    None => prop_assert_eq!(sut.find(k), Err(DbError::NoEntry)),
                }
            }
            OpI::Rekey(i, j) => {
                let (from, to) = (pool[i].clone(), pool[j].clone());
                if let Some(&e) = live.get(&from) {
                    let res = sut.rekey(e, to.clone());
                    if model.contains_key(&to) {
                        prop_assert_eq!(res, Err(DbError::Duplicate));
                    } else {
                        prop_assert_eq!(res, Ok(()));
                        let v = model.remove(&from).expect("present in model");
                        model.insert(to.clone(), v);
                        live.remove(&from);
                        live.insert(to, e);
                    }
                }
            }
            OpI::Resize(n) => {
                prop_assert_eq!(sut.resize(n), Ok(()));
                if n > 0 {
                    prop_assert_eq!(sut.modulus(), next_prime(n));
                }
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.entries().map(|(_, k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
            OpI::Flush => {
                prop_assert_eq!(sut.flush(), Ok(()));
                for (_, e) in live.drain() {
                    prop_assert_eq!(sut.is_linked(e), Ok(false));
                    prop_assert!(sut.release_entry(e).is_ok());
                }
                model.clear();
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert!(sut.modulus() == 0 || is_prime(sut.modulus()));
        prop_assert_eq!(sut.entries().count(), model.len());
        for (k, &e) in &live {
            prop_assert_eq!(sut.find(k), Ok(e));
        }
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Duplicate keys are rejected and the rejected entry stays unlinked.
// - Every live key is findable after any sequence of adds, removes,
//   rekeys, automatic and explicit resizes.
// - The modulus is always 0 or prime; with autogrow the count never
//   exceeds the rollover after an add.
// - Removed entries keep their value until released.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, grow, shrink, ops) in arb_scenario()) {
        let config = TableConfig::new().autogrow(grow).autoshrink(shrink);
        let sut = HashTable::with_config(config, StdHooks::new(), (), 7).unwrap();
        run(sut, &pool, ops)?;
    }
}

// Every key hashes to the same bucket.
struct ConstHooks;

impl TableHooks<String> for ConstHooks {
    fn hash(&self, _key: &String) -> u64 {
        0
    }
    fn eq(&self, a: &String, b: &String) -> bool {
        a == b
    }
    fn resized(&mut self, info: ResizeInfo) {
        assert!(info.new_modulus == 0 || is_prime(info.new_modulus));
    }
}

// Property: same state machine under worst-case collisions, starting
// unsized so the first add exercises the no-table and autogrow paths.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, grow, shrink, ops) in arb_scenario()) {
        let config = TableConfig::new().autogrow(grow).autoshrink(shrink);
        let sut = HashTable::with_config(config, ConstHooks, (), 0).unwrap();
        run(sut, &pool, ops)?;
    }
}
