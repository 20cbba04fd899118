#![cfg(test)]

// Property tests for LinkList against a Vec-per-list model.

use crate::chain::Location;
use crate::error::DbError;
use crate::list::{Elem, LinkList, ListId};
use proptest::prelude::*;

const LISTS: usize = 3;
const ELEMS: usize = 8;

#[derive(Clone, Copy, Debug)]
enum Place {
    Head,
    Tail,
    Before(usize),
    After(usize),
}

#[derive(Clone, Debug)]
enum Op {
    Add(usize, usize, Place),
    Move(usize, usize, Place),
    Remove(usize, usize),
    Find(usize, usize),
    Flush(usize),
}

fn arb_place() -> impl Strategy<Value = Place> {
    prop_oneof![
        Just(Place::Head),
        Just(Place::Tail),
        (0..ELEMS).prop_map(Place::Before),
        (0..ELEMS).prop_map(Place::After),
    ]
}

prop_compose! {
    fn arb_ops()(ops in proptest::collection::vec(
        prop_oneof![
            4 => (0..LISTS, 0..ELEMS, arb_place()).prop_map(|(l, e, p)| Op::Add(l, e, p)),
            2 => (0..LISTS, 0..ELEMS, arb_place()).prop_map(|(l, e, p)| Op::Move(l, e, p)),
            2 => (0..LISTS, 0..ELEMS).prop_map(|(l, e)| Op::Remove(l, e)),
            1 => (0..LISTS, 0..ELEMS).prop_map(|(l, e)| Op::Find(l, e)),
            1 => (0..LISTS).prop_map(Op::Flush),
        ], 1..80)) -> Vec<Op> { ops }
}

fn owner_of(model: &[Vec<usize>], e: usize) -> Option<usize> {
    model.iter().position(|l| l.contains(&e))
}

// Expected outcome of splicing `e` into `model[l]` at `p`.
fn expect_add(model: &[Vec<usize>], l: usize, e: usize, p: Place) -> Result<usize, DbError> {
    if owner_of(model, e).is_some() {
        return Err(DbError::Busy);
    }
    anchor_index(model, l, p)
}

fn anchor_index(model: &[Vec<usize>], l: usize, p: Place) -> Result<usize, DbError> {
    match p {
        Place::Head => Ok(0),
        Place::Tail => Ok(model[l].len()),
        Place::Before(r) | Place::After(r) => match owner_of(model, r) {
            None => Err(DbError::Unused),
            Some(o) if o != l => Err(DbError::WrongTable),
            Some(_) => {
                let i = model[l].iter().position(|&x| x == r).unwrap_or(0);
                Ok(if matches!(p, Place::After(_)) { i + 1 } else { i })
            }
        },
    }
}

fn to_location(elems: &[Elem], p: Place) -> Location<Elem> {
    match p {
        Place::Head => Location::Head,
        Place::Tail => Location::Tail,
        Place::Before(r) => Location::Before(elems[r]),
        Place::After(r) => Location::After(elems[r]),
    }
}

// Property: list contents, ends and owners match the model after every op.
// - Busy/Unused/WrongTable are reported exactly when the model says so and
//   leave every list unchanged.
// - Move within a list is equivalent to remove-then-insert at the anchor.
// - Flush empties the list and leaves the payloads in the arena.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_lists_match_model(ops in arb_ops()) {
        let mut sut: LinkList<usize> = LinkList::new();
        let lists: Vec<ListId> = (0..LISTS).map(|_| sut.init_list(())).collect();
        let elems: Vec<Elem> = (0..ELEMS).map(|i| sut.new_elem(i)).collect();
        let mut model: Vec<Vec<usize>> = vec![Vec::new(); LISTS];

        for op in ops {
            match op {
                Op::Add(l, e, p) => {
                    let want = expect_add(&model, l, e, p);
                    let got = sut.add(lists[l], elems[e], to_location(&elems, p));
                    match want {
                        Ok(at) => {
                            prop_assert_eq!(got, Ok(()));
                            model[l].insert(at, e);
                        }
                        Err(err) => prop_assert_eq!(got, Err(err)),
                    }
                }
                Op::Move(l, e, p) => {
                    let got = sut.move_elem(lists[l], elems[e], to_location(&elems, p));
                    let self_anchor = matches!(p, Place::Before(r) | Place::After(r) if r == e);
                    match owner_of(&model, e) {
                        None if !self_anchor => prop_assert_eq!(got, Err(DbError::Unused)),
                        Some(o) if o != l && !self_anchor => {
                            prop_assert_eq!(got, Err(DbError::WrongTable))
                        }
                        _ if self_anchor => prop_assert_eq!(got, Err(DbError::Busy)),
                        _ => {
                            let mut after = model.clone();
                            after[l].retain(|&x| x != e);
                            match anchor_index(&after, l, p) {
                                Ok(at) => {
                                    prop_assert_eq!(got, Ok(()));
                                    after[l].insert(at, e);
                                    model = after;
                                }
                                Err(err) => prop_assert_eq!(got, Err(err)),
                            }
                        }
                    }
                }
                Op::Remove(l, e) => {
                    let got = sut.remove(lists[l], elems[e]);
                    match owner_of(&model, e) {
                        None => prop_assert_eq!(got, Err(DbError::Unused)),
                        Some(o) if o != l => prop_assert_eq!(got, Err(DbError::WrongTable)),
                        Some(_) => {
                            prop_assert_eq!(got, Ok(()));
                            model[l].retain(|&x| x != e);
                        }
                    }
                }
                Op::Find(l, e) => {
                    let got = sut.find(lists[l], None, &e, |k, p| k == p);
                    if model[l].contains(&e) {
                        prop_assert_eq!(got, Ok(elems[e]));
                    } else {
                        prop_assert_eq!(got, Err(DbError::NoEntry));
                    }
                }
                Op::Flush(l) => {
                    let mut seen = Vec::new();
                    let res: Result<(), DbError> = sut.flush_with(lists[l], |_, p| {
                        seen.push(*p);
                        Ok(())
                    });
                    prop_assert_eq!(res, Ok(()));
                    prop_assert_eq!(&seen, &model[l]);
                    model[l].clear();
                }
            }

            // Post-conditions after each op
            for (i, &id) in lists.iter().enumerate() {
                let order: Vec<usize> = sut.elems(id).unwrap().map(|(_, p)| *p).collect();
                prop_assert_eq!(&order, &model[i]);
                prop_assert_eq!(sut.count(id), Ok(model[i].len()));
                prop_assert_eq!(sut.first(id), Ok(model[i].first().map(|&x| elems[x])));
                prop_assert_eq!(sut.last(id), Ok(model[i].last().map(|&x| elems[x])));
            }
            for (x, &e) in elems.iter().enumerate() {
                prop_assert_eq!(sut.owner(e), Ok(owner_of(&model, x).map(|o| lists[o])));
            }
        }
    }
}
