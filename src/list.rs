//! LinkList: standalone intrusive lists over a handle arena.
//!
//! Elements and list heads both live in the arena and are addressed by
//! small `Copy` handles. An element is created unlinked, may be linked into
//! at most one list of the arena at a time and keeps its payload across
//! unlinking; only `release_elem` hands the payload back.

use crate::chain::{Chain, ChainIter, ChainMut, ChainRef, Link, Linked, Location, Tag};
use crate::error::{DbError, DbResult};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    struct ElemSlot;
    struct HeadSlot;
}

/// Handle to an element of a `LinkList`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Elem {
    tag: Tag,
    slot: ElemSlot,
}

/// Handle to a list head of a `LinkList`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ListId {
    tag: Tag,
    slot: HeadSlot,
}

#[derive(Debug)]
struct Element<T> {
    link: Link<ElemSlot, HeadSlot>,
    payload: T,
}

impl<T> Linked<ElemSlot, HeadSlot> for Element<T> {
    fn link(&self) -> &Link<ElemSlot, HeadSlot> {
        &self.link
    }
    fn link_mut(&mut self) -> &mut Link<ElemSlot, HeadSlot> {
        &mut self.link
    }
}

#[derive(Debug)]
struct Head<X> {
    chain: Chain<ElemSlot>,
    extra: X,
}

pub struct LinkList<T, X = ()> {
    tag: Tag,
    elems: SlotMap<ElemSlot, Element<T>>,
    heads: SlotMap<HeadSlot, Head<X>>,
}

impl<T, X> Default for LinkList<T, X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, X> LinkList<T, X> {
    pub fn new() -> Self {
        Self {
            tag: Tag::fresh(),
            elems: SlotMap::with_key(),
            heads: SlotMap::with_key(),
        }
    }

    fn elem(&self, slot: ElemSlot) -> Elem {
        Elem {
            tag: self.tag,
            slot,
        }
    }

    fn list(&self, slot: HeadSlot) -> ListId {
        ListId {
            tag: self.tag,
            slot,
        }
    }

    fn elem_slot(&self, e: Elem) -> DbResult<ElemSlot> {
        if e.tag != self.tag {
            Err(DbError::WrongTable)
        } else if self.elems.contains_key(e.slot) {
            Ok(e.slot)
        } else {
            Err(DbError::BadArgs)
        }
    }

    fn head_slot(&self, l: ListId) -> DbResult<HeadSlot> {
        if l.tag == self.tag && self.heads.contains_key(l.slot) {
            Ok(l.slot)
        } else {
            Err(DbError::BadArgs)
        }
    }

    fn head(&self, l: ListId) -> DbResult<&Head<X>> {
        let hs = self.head_slot(l)?;
        self.heads.get(hs).ok_or(DbError::BadArgs)
    }

    /// Create an empty list carrying `extra`.
    pub fn init_list(&mut self, extra: X) -> ListId {
        let slot = self.heads.insert(Head {
            chain: Chain::new(),
            extra,
        });
        self.list(slot)
    }

    /// Drop an empty list head and return its extra data.
    pub fn remove_list(&mut self, list: ListId) -> DbResult<X> {
        let hs = self.head_slot(list)?;
        if !self.head(list)?.chain.is_empty() {
            return Err(DbError::NotEmpty);
        }
        self.heads
            .remove(hs)
            .map(|h| h.extra)
            .ok_or(DbError::BadArgs)
    }

    /// Create an unlinked element anchoring `payload`.
    pub fn new_elem(&mut self, payload: T) -> Elem {
        let slot = self.elems.insert(Element {
            link: Link::new(),
            payload,
        });
        self.elem(slot)
    }

    /// Take the payload of an unlinked element back out of the arena.
    pub fn release_elem(&mut self, elem: Elem) -> DbResult<T> {
        let es = self.elem_slot(elem)?;
        if self.elems[es].link.head().is_some() {
            return Err(DbError::Busy);
        }
        self.elems
            .remove(es)
            .map(|e| e.payload)
            .ok_or(DbError::BadArgs)
    }

    /// Link `elem` into `list` at `loc`.
    pub fn add(&mut self, list: ListId, elem: Elem, loc: Location<Elem>) -> DbResult<()> {
        let hs = self.head_slot(list)?;
        let es = self.elem_slot(elem)?;
        let loc = loc.try_map(|r| self.elem_slot(r))?;
        let head = self.heads.get_mut(hs).ok_or(DbError::BadArgs)?;
        ChainMut::new(&mut self.elems, &mut head.chain, hs).insert(es, loc)
    }

    /// Reposition `elem`, which must already be linked into `list`.
    pub fn move_elem(&mut self, list: ListId, elem: Elem, loc: Location<Elem>) -> DbResult<()> {
        let hs = self.head_slot(list)?;
        let es = self.elem_slot(elem)?;
        let loc = loc.try_map(|r| self.elem_slot(r))?;
        let head = self.heads.get_mut(hs).ok_or(DbError::BadArgs)?;
        ChainMut::new(&mut self.elems, &mut head.chain, hs).relocate(es, loc)
    }

    /// Unlink `elem` from `list`. The payload stays in the arena.
    pub fn remove(&mut self, list: ListId, elem: Elem) -> DbResult<()> {
        let hs = self.head_slot(list)?;
        let es = self.elem_slot(elem)?;
        let head = self.heads.get_mut(hs).ok_or(DbError::BadArgs)?;
        ChainMut::new(&mut self.elems, &mut head.chain, hs).remove(es)
    }

    /// Linear scan from `start` (or the first element) to the tail; returns
    /// the first element whose payload `compare` reports equal to `key`.
    pub fn find<Q, F>(
        &self,
        list: ListId,
        start: Option<Elem>,
        key: &Q,
        mut compare: F,
    ) -> DbResult<Elem>
    where
        Q: ?Sized,
        F: FnMut(&Q, &T) -> bool,
    {
        let hs = self.head_slot(list)?;
        let start = start.map(|s| self.elem_slot(s)).transpose()?;
        let head = self.head(list)?;
        ChainRef::new(&self.elems, &head.chain, hs)
            .find(start, |_, e| compare(key, &e.payload))
            .map(|s| self.elem(s))
    }

    /// Visit every element head-to-tail; the first `Err` from `visit` stops
    /// the walk and is returned.
    pub fn iter<E, F>(&self, list: ListId, mut visit: F) -> Result<(), E>
    where
        E: From<DbError>,
        F: FnMut(Elem, &T) -> Result<(), E>,
    {
        for (elem, payload) in self.elems(list)? {
            visit(elem, payload)?;
        }
        Ok(())
    }

    /// Borrowing head-to-tail iterator over a list.
    pub fn elems(&self, list: ListId) -> DbResult<Elems<'_, T>> {
        let hs = self.head_slot(list)?;
        let head = self.head(list)?;
        Ok(Elems {
            tag: self.tag,
            inner: ChainRef::new(&self.elems, &head.chain, hs).iter(),
        })
    }

    /// Unlink every element of `list`.
    pub fn flush(&mut self, list: ListId) -> DbResult<()> {
        self.flush_with(list, |_, _| Ok::<(), DbError>(()))
    }

    /// Unlink elements head-first, calling `visit` on each after it has been
    /// unlinked. The first `Err` stops flushing; elements not yet reached stay
    /// linked in their original order.
    pub fn flush_with<E, F>(&mut self, list: ListId, mut visit: F) -> Result<(), E>
    where
        E: From<DbError>,
        F: FnMut(Elem, &mut T) -> Result<(), E>,
    {
        let hs = self.head_slot(list)?;
        loop {
            let head = self.heads.get_mut(hs).ok_or(DbError::BadArgs)?;
            let Some(es) = ChainMut::new(&mut self.elems, &mut head.chain, hs).pop_front() else {
                return Ok(());
            };
            let elem = self.elem(es);
            let element = self.elems.get_mut(es).ok_or(DbError::BadArgs)?;
            visit(elem, &mut element.payload)?;
        }
    }

    pub fn count(&self, list: ListId) -> DbResult<usize> {
        Ok(self.head(list)?.chain.len())
    }

    pub fn first(&self, list: ListId) -> DbResult<Option<Elem>> {
        Ok(self.head(list)?.chain.first().map(|s| self.elem(s)))
    }

    pub fn last(&self, list: ListId) -> DbResult<Option<Elem>> {
        Ok(self.head(list)?.chain.last().map(|s| self.elem(s)))
    }

    pub fn extra(&self, list: ListId) -> DbResult<&X> {
        Ok(&self.head(list)?.extra)
    }

    pub fn extra_mut(&mut self, list: ListId) -> DbResult<&mut X> {
        let hs = self.head_slot(list)?;
        self.heads
            .get_mut(hs)
            .map(|h| &mut h.extra)
            .ok_or(DbError::BadArgs)
    }

    pub fn payload(&self, elem: Elem) -> DbResult<&T> {
        let es = self.elem_slot(elem)?;
        Ok(&self.elems[es].payload)
    }

    pub fn payload_mut(&mut self, elem: Elem) -> DbResult<&mut T> {
        let es = self.elem_slot(elem)?;
        Ok(&mut self.elems[es].payload)
    }

    /// The list `elem` is currently linked into, if any.
    pub fn owner(&self, elem: Elem) -> DbResult<Option<ListId>> {
        let es = self.elem_slot(elem)?;
        Ok(self.elems[es].link.head().map(|h| self.list(h)))
    }

    pub fn next(&self, elem: Elem) -> DbResult<Option<Elem>> {
        let es = self.elem_slot(elem)?;
        Ok(self.elems[es].link.next().map(|s| self.elem(s)))
    }

    pub fn prev(&self, elem: Elem) -> DbResult<Option<Elem>> {
        let es = self.elem_slot(elem)?;
        Ok(self.elems[es].link.prev().map(|s| self.elem(s)))
    }
}

/// Iterator over `(Elem, &T)` in list order.
pub struct Elems<'a, T> {
    tag: Tag,
    inner: ChainIter<'a, ElemSlot, HeadSlot, Element<T>>,
}

impl<'a, T> Iterator for Elems<'a, T> {
    type Item = (Elem, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.tag;
        self.inner
            .next()
            .map(|(slot, e)| (Elem { tag, slot }, &e.payload))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
