//! Chain: the intrusive splice engine behind lists, hash buckets and matrix
//! rows/columns.
//!
//! Nodes live in a `SlotMap` and carry one `Link` per chain they can join.
//! `Linked<E, H>` selects the link by the head type `H`, so a single node
//! type can be threaded through several chains at once (a matrix cell sits
//! in a hash bucket, a row and a column).
//!
//! The link's `head` back-reference is the only record of membership. Every
//! mutating operation checks it before rewriting any neighbor, so a failed
//! call leaves both the chain and the nodes untouched.

use crate::error::{DbError, DbResult};
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};
use slotmap::{Key, SlotMap};

/// Where to place an element relative to a chain or to another element.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Location<E> {
    Head,
    Tail,
    Before(E),
    After(E),
}

impl<E: Copy> Location<E> {
    pub(crate) fn anchor(&self) -> Option<E> {
        match *self {
            Location::Before(e) | Location::After(e) => Some(e),
            Location::Head | Location::Tail => None,
        }
    }

    /// Translate the reference element, failing if it does not resolve.
    pub(crate) fn try_map<U, F>(self, f: F) -> DbResult<Location<U>>
    where
        F: FnOnce(E) -> DbResult<U>,
    {
        Ok(match self {
            Location::Head => Location::Head,
            Location::Tail => Location::Tail,
            Location::Before(e) => Location::Before(f(e)?),
            Location::After(e) => Location::After(f(e)?),
        })
    }
}

/// Identity stamped on a container; handles carry it to detect foreign use.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Tag(u64);

impl Tag {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Tag(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Link<E, H> {
    prev: Option<E>,
    next: Option<E>,
    head: Option<H>,
}

impl<E: Copy, H: Copy> Link<E, H> {
    pub(crate) const fn new() -> Self {
        Self {
            prev: None,
            next: None,
            head: None,
        }
    }

    pub(crate) fn head(&self) -> Option<H> {
        self.head
    }

    pub(crate) fn next(&self) -> Option<E> {
        self.next
    }

    pub(crate) fn prev(&self) -> Option<E> {
        self.prev
    }

    fn clear(&mut self) {
        self.prev = None;
        self.next = None;
        self.head = None;
    }
}

impl<E: Copy, H: Copy> Default for Link<E, H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Head of a chain: element count plus both ends.
#[derive(Clone, Debug)]
pub(crate) struct Chain<E> {
    count: usize,
    first: Option<E>,
    last: Option<E>,
}

impl<E: Copy> Chain<E> {
    pub(crate) const fn new() -> Self {
        Self {
            count: 0,
            first: None,
            last: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub(crate) fn first(&self) -> Option<E> {
        self.first
    }

    pub(crate) fn last(&self) -> Option<E> {
        self.last
    }
}

impl<E: Copy> Default for Chain<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Access to the link a node uses for chains headed by `H`.
pub(crate) trait Linked<E, H> {
    fn link(&self) -> &Link<E, H>;
    fn link_mut(&mut self) -> &mut Link<E, H>;
}

/// Mutable view of one chain over its node storage.
pub(crate) struct ChainMut<'a, E: Key, H, N> {
    nodes: &'a mut SlotMap<E, N>,
    chain: &'a mut Chain<E>,
    head: H,
}

impl<'a, E, H, N> ChainMut<'a, E, H, N>
where
    E: Key,
    H: Copy + Eq,
    N: Linked<E, H>,
{
    pub(crate) fn new(nodes: &'a mut SlotMap<E, N>, chain: &'a mut Chain<E>, head: H) -> Self {
        Self { nodes, chain, head }
    }

    fn membership(&self, e: E) -> DbResult<()> {
        let node = self.nodes.get(e).ok_or(DbError::BadArgs)?;
        match node.link().head {
            None => Err(DbError::Unused),
            Some(h) if h == self.head => Ok(()),
            Some(_) => Err(DbError::WrongTable),
        }
    }

    /// Link an unlinked node at `loc`.
    pub(crate) fn insert(&mut self, new: E, loc: Location<E>) -> DbResult<()> {
        let busy = self
            .nodes
            .get(new)
            .ok_or(DbError::BadArgs)?
            .link()
            .head
            .is_some();
        if let Some(r) = loc.anchor() {
            if !self.nodes.contains_key(r) {
                return Err(DbError::BadArgs);
            }
        }
        if busy {
            return Err(DbError::Busy);
        }
        if let Some(r) = loc.anchor() {
            self.membership(r)?;
        }

        self.attach(new, loc);
        if let Some(n) = self.nodes.get_mut(new) {
            n.link_mut().head = Some(self.head);
        }
        Ok(())
    }

    /// Unlink a node of this chain and reset it to the unlinked state.
    pub(crate) fn remove(&mut self, e: E) -> DbResult<()> {
        self.membership(e)?;
        self.detach(e);
        if let Some(n) = self.nodes.get_mut(e) {
            n.link_mut().clear();
        }
        Ok(())
    }

    /// Reposition a node that already belongs to this chain.
    pub(crate) fn relocate(&mut self, e: E, loc: Location<E>) -> DbResult<()> {
        if !self.nodes.contains_key(e) {
            return Err(DbError::BadArgs);
        }
        if let Some(r) = loc.anchor() {
            if !self.nodes.contains_key(r) {
                return Err(DbError::BadArgs);
            }
            if r == e {
                return Err(DbError::Busy);
            }
        }
        self.membership(e)?;
        if let Some(r) = loc.anchor() {
            self.membership(r)?;
        }

        self.detach(e);
        self.attach(e, loc);
        Ok(())
    }

    /// Unlink and return the head-most node.
    pub(crate) fn pop_front(&mut self) -> Option<E> {
        let first = self.chain.first?;
        self.detach(first);
        if let Some(n) = self.nodes.get_mut(first) {
            n.link_mut().clear();
        }
        Some(first)
    }

    // Splice `new` in; `new` must be validated and detached.
    fn attach(&mut self, new: E, loc: Location<E>) {
        let (prev, next) = match loc {
            Location::Head => (None, self.chain.first),
            Location::Tail => (self.chain.last, None),
            Location::Before(r) => (self.nodes.get(r).and_then(|n| n.link().prev), Some(r)),
            Location::After(r) => (Some(r), self.nodes.get(r).and_then(|n| n.link().next)),
        };
        if let Some(n) = self.nodes.get_mut(new) {
            let link = n.link_mut();
            link.prev = prev;
            link.next = next;
        }
        match prev.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.link_mut().next = Some(new),
            None => self.chain.first = Some(new),
        }
        match next.and_then(|n| self.nodes.get_mut(n)) {
            Some(n) => n.link_mut().prev = Some(new),
            None => self.chain.last = Some(new),
        }
        self.chain.count += 1;
    }

    // Clip `e` out, keeping its head back-reference.
    fn detach(&mut self, e: E) {
        let (prev, next) = match self.nodes.get_mut(e) {
            Some(n) => {
                let link = n.link_mut();
                (link.prev.take(), link.next.take())
            }
            None => return,
        };
        match prev.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.link_mut().next = next,
            None => self.chain.first = next,
        }
        match next.and_then(|n| self.nodes.get_mut(n)) {
            Some(n) => n.link_mut().prev = prev,
            None => self.chain.last = prev,
        }
        self.chain.count -= 1;
    }
}

/// Read-only view of one chain over its node storage.
pub(crate) struct ChainRef<'a, E: Key, H, N> {
    nodes: &'a SlotMap<E, N>,
    chain: &'a Chain<E>,
    head: H,
}

impl<'a, E, H, N> ChainRef<'a, E, H, N>
where
    E: Key,
    H: Copy + Eq,
    N: Linked<E, H>,
{
    pub(crate) fn new(nodes: &'a SlotMap<E, N>, chain: &'a Chain<E>, head: H) -> Self {
        Self { nodes, chain, head }
    }

    /// Scan from `start` (or the first node) towards the tail and return the
    /// first node accepted by `pred`.
    pub(crate) fn find<F>(&self, start: Option<E>, mut pred: F) -> DbResult<E>
    where
        F: FnMut(E, &N) -> bool,
    {
        let mut cur = match start {
            Some(s) => {
                let node = self.nodes.get(s).ok_or(DbError::BadArgs)?;
                if node.link().head != Some(self.head) {
                    return Err(DbError::WrongTable);
                }
                Some(s)
            }
            None => self.chain.first,
        };
        while let Some(e) = cur {
            let Some(node) = self.nodes.get(e) else { break };
            if pred(e, node) {
                return Ok(e);
            }
            cur = node.link().next;
        }
        Err(DbError::NoEntry)
    }

    pub(crate) fn iter(&self) -> ChainIter<'a, E, H, N> {
        ChainIter {
            nodes: self.nodes,
            next: self.chain.first,
            remaining: self.chain.count,
            _head: PhantomData,
        }
    }
}

/// Head-to-tail iterator over a chain.
pub(crate) struct ChainIter<'a, E: Key, H, N> {
    nodes: &'a SlotMap<E, N>,
    next: Option<E>,
    remaining: usize,
    _head: PhantomData<H>,
}

impl<'a, E, H, N> Iterator for ChainIter<'a, E, H, N>
where
    E: Key,
    H: Copy,
    N: Linked<E, H>,
{
    type Item = (E, &'a N);

    fn next(&mut self) -> Option<Self::Item> {
        let e = self.next?;
        let node = self.nodes.get(e)?;
        self.next = node.link().next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((e, node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
