#![cfg(test)]

// Property tests for SparseMatrix: the pair table and the row/column
// chains must stay in step under random inserts, removals and flushes.

use crate::error::DbError;
use crate::sizing::TableConfig;
use crate::smat::{NoResize, SparseMatrix};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug)]
enum Op {
    Insert(u8, u8, i32),
    Remove(u8, u8),
    Find(u8, u8),
    FlushRow(u8),
    FlushCol(u8),
    Resize(usize),
}

prop_compose! {
    fn arb_ops()(ops in proptest::collection::vec(
        prop_oneof![
            5 => (0u8..6, 0u8..6, any::<i32>()).prop_map(|(r, c, v)| Op::Insert(r, c, v)),
            2 => (0u8..6, 0u8..6).prop_map(|(r, c)| Op::Remove(r, c)),
            2 => (0u8..6, 0u8..6).prop_map(|(r, c)| Op::Find(r, c)),
            1 => (0u8..6).prop_map(Op::FlushRow),
            1 => (0u8..6).prop_map(Op::FlushCol),
            1 => (0usize..30).prop_map(Op::Resize),
        ], 1..100)) -> Vec<Op> { ops }
}

// Model: value per pair plus insertion order per row and per column.
#[derive(Default)]
struct Model {
    cells: BTreeMap<(u8, u8), i32>,
    rows: BTreeMap<u8, Vec<u8>>,
    cols: BTreeMap<u8, Vec<u8>>,
}

impl Model {
    fn insert(&mut self, r: u8, c: u8, v: i32) {
        self.cells.insert((r, c), v);
        self.rows.entry(r).or_default().push(c);
        self.cols.entry(c).or_default().push(r);
    }

    fn remove(&mut self, r: u8, c: u8) -> Option<i32> {
        let v = self.cells.remove(&(r, c))?;
        if let Some(l) = self.rows.get_mut(&r) {
            l.retain(|&x| x != c);
            if l.is_empty() {
                self.rows.remove(&r);
            }
        }
        if let Some(l) = self.cols.get_mut(&c) {
            l.retain(|&x| x != r);
            if l.is_empty() {
                self.cols.remove(&c);
            }
        }
        Some(v)
    }
}

// Property: every operation agrees with the model, and after each op
// - each row and column lists exactly its model cells, in insertion order;
// - only non-empty lines exist;
// - every model pair is findable with its value.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_matrix_matches_model(ops in arb_ops(), shrink in any::<bool>()) {
        let config = TableConfig::new().autogrow(true).autoshrink(shrink);
        let mut sut: SparseMatrix<u8, u8, i32> = SparseMatrix::with_config(config, NoResize, (), 0).unwrap();
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Insert(r, c, v) => {
                    let got = sut.insert(r, c, v);
                    if model.cells.contains_key(&(r, c)) {
                        prop_assert_eq!(got, Err(DbError::Duplicate));
                    } else {
                        prop_assert!(got.is_ok());
                        model.insert(r, c, v);
                    }
                }
                Op::Remove(r, c) => {
                    let got = sut.remove(&r, &c);
                    match model.remove(r, c) {
                        Some(v) => prop_assert_eq!(got, Ok(v)),
                        None => prop_assert_eq!(got, Err(DbError::NoEntry)),
                    }
                }
                Op::Find(r, c) => {
                    let got = sut.get(&r, &c);
                    prop_assert_eq!(got.ok(), model.cells.get(&(r, c)));
                }
                Op::FlushRow(r) => {
                    let mut seen = Vec::new();
                    let res: Result<(), DbError> = sut.flush_row(&r, |rr, c, v| {
                        seen.push((rr, c, v));
                        Ok(())
                    });
                    prop_assert_eq!(res, Ok(()));
                    let want: Vec<(u8, u8, i32)> = model
                        .rows
                        .get(&r)
                        .cloned()
                        .unwrap_or_default()
                        .into_iter()
                        .map(|c| (r, c, model.cells[&(r, c)]))
                        .collect();
                    prop_assert_eq!(&seen, &want);
                    for (rr, c, _) in want {
                        model.remove(rr, c);
                    }
                }
                Op::FlushCol(c) => {
                    let res: Result<(), DbError> = sut.flush_col(&c, |_, _, _| Ok(()));
                    prop_assert_eq!(res, Ok(()));
                    for r in model.cols.get(&c).cloned().unwrap_or_default() {
                        model.remove(r, c);
                    }
                }
                Op::Resize(n) => {
                    prop_assert_eq!(sut.resize(n), Ok(()));
                }
            }

            // Post-conditions after each op
            prop_assert_eq!(sut.len(), model.cells.len());
            let rows: BTreeSet<u8> = sut.rows().copied().collect();
            prop_assert_eq!(rows, model.rows.keys().copied().collect::<BTreeSet<_>>());
            let cols: BTreeSet<u8> = sut.cols().copied().collect();
            prop_assert_eq!(cols, model.cols.keys().copied().collect::<BTreeSet<_>>());
            for (r, want) in &model.rows {
                let got: Vec<u8> = sut.row_cells(r).map(|(_, c, _)| *c).collect();
                prop_assert_eq!(&got, want);
            }
            for (c, want) in &model.cols {
                let got: Vec<u8> = sut.col_cells(c).map(|(_, r, _)| *r).collect();
                prop_assert_eq!(&got, want);
            }
            for (&(r, c), v) in &model.cells {
                prop_assert_eq!(sut.get(&r, &c), Ok(v));
            }
        }
    }
}
