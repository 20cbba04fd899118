//! HashTable: chained hash table with a prime modulus and automatic resizing.
//!
//! Buckets are chains threaded through the entries, so an entry is linked
//! into exactly one bucket while it is in the table. Entries are created
//! unlinked with `new_entry`, keyed by `add`, and keep their value after
//! `remove`; only `release_entry` gives the value back.
//!
//! Each entry caches the full 64-bit hash of its key. Rehashing on resize
//! uses the cached hash, so the hooks' `hash` is never called for keys that
//! are already in the table.

use crate::chain::{Chain, ChainMut, ChainRef, Link, Linked, Location, Tag};
use crate::error::{DbError, DbResult};
use crate::sizing::{next_prime, TableConfig};
use core::hash::{BuildHasher, Hash};
use slotmap::{new_key_type, SlotMap};
use std::collections::hash_map::RandomState;

new_key_type! {
    pub(crate) struct EntrySlot;
}

/// Handle to an entry of a `HashTable`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Entry {
    tag: Tag,
    slot: EntrySlot,
}

/// Shape of a table right after it was resized.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ResizeInfo {
    pub old_modulus: usize,
    pub new_modulus: usize,
    pub count: usize,
}

/// Key hashing, key equality and resize notification for a table.
pub trait TableHooks<K: ?Sized> {
    fn hash(&self, key: &K) -> u64;

    fn eq(&self, a: &K, b: &K) -> bool;

    /// Called once every entry has been relinked into the new buckets.
    fn resized(&mut self, _info: ResizeInfo) {}
}

/// Hooks backed by `K: Hash + Eq` and a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct StdHooks<S = RandomState> {
    hasher: S,
}

impl StdHooks {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<S> StdHooks<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<K, S> TableHooks<K> for StdHooks<S>
where
    K: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    fn eq(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

#[derive(Debug)]
pub(crate) struct HashEntry<K, V> {
    link: Link<EntrySlot, usize>,
    key: Option<K>,
    hash: u64,
    pub(crate) value: V,
}

impl<K, V> HashEntry<K, V> {
    pub(crate) fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }
}

impl<K, V> Linked<EntrySlot, usize> for HashEntry<K, V> {
    fn link(&self) -> &Link<EntrySlot, usize> {
        &self.link
    }
    fn link_mut(&mut self) -> &mut Link<EntrySlot, usize> {
        &mut self.link
    }
}

pub struct HashTable<K, V, H = StdHooks, X = ()> {
    tag: Tag,
    config: TableConfig,
    modulus: usize,
    count: usize,
    rollover: usize,
    rollunder: usize,
    buckets: Vec<Chain<EntrySlot>>,
    slots: SlotMap<EntrySlot, HashEntry<K, V>>,
    hooks: H,
    extra: X,
}

impl<K, V> HashTable<K, V>
where
    K: Hash + Eq,
{
    /// Unsized, fixed-policy table using `StdHooks`.
    pub fn new() -> Self {
        Self::build(TableConfig::new(), StdHooks::new(), (), 0)
    }
}

impl<K, V> Default for HashTable<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H, X> HashTable<K, V, H, X>
where
    H: TableHooks<K>,
{
    /// Build a table; a non-zero `modulus` is rounded up to the next prime and
    /// its buckets are allocated, zero leaves the table unsized. BadArgs if
    /// `config` fails `TableConfig::validate`.
    pub fn with_config(
        config: TableConfig,
        hooks: H,
        extra: X,
        modulus: usize,
    ) -> DbResult<Self> {
        config.validate()?;
        Ok(Self::build(config, hooks, extra, modulus))
    }

    pub(crate) fn build(config: TableConfig, hooks: H, extra: X, modulus: usize) -> Self {
        let modulus = next_prime(modulus);
        Self {
            tag: Tag::fresh(),
            config,
            modulus,
            count: 0,
            rollover: config.rollover_for(modulus),
            rollunder: config.rollunder_for(modulus),
            buckets: (0..modulus).map(|_| Chain::new()).collect(),
            slots: SlotMap::with_key(),
            hooks,
            extra,
        }
    }

    pub(crate) fn handle(&self, slot: EntrySlot) -> Entry {
        Entry {
            tag: self.tag,
            slot,
        }
    }

    pub(crate) fn entry_slot(&self, e: Entry) -> DbResult<EntrySlot> {
        if e.tag != self.tag {
            Err(DbError::WrongTable)
        } else if self.slots.contains_key(e.slot) {
            Ok(e.slot)
        } else {
            Err(DbError::BadArgs)
        }
    }

    pub(crate) fn slots(&self) -> &SlotMap<EntrySlot, HashEntry<K, V>> {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut SlotMap<EntrySlot, HashEntry<K, V>> {
        &mut self.slots
    }

    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.modulus as u64) as usize
    }

    fn lookup(&self, hash: u64, key: &K) -> Option<EntrySlot> {
        self.find_hashed(hash, |k| self.hooks.eq(key, k))
    }

    /// Search the bucket for `hash` with a caller-supplied key predicate.
    pub(crate) fn find_hashed<F>(&self, hash: u64, mut matches: F) -> Option<EntrySlot>
    where
        F: FnMut(&K) -> bool,
    {
        if self.count == 0 || self.modulus == 0 {
            return None;
        }
        let b = self.bucket_of(hash);
        ChainRef::new(&self.slots, &self.buckets[b], b)
            .find(None, |_, n| n.hash == hash && n.key.as_ref().is_some_and(&mut matches))
            .ok()
    }

    /// Create an unlinked entry holding `value`.
    pub fn new_entry(&mut self, value: V) -> Entry {
        let slot = self.slots.insert(HashEntry {
            link: Link::new(),
            key: None,
            hash: 0,
            value,
        });
        self.handle(slot)
    }

    /// Take the value of an unlinked entry back out of the table.
    pub fn release_entry(&mut self, e: Entry) -> DbResult<V> {
        self.take_entry(e).map(|(_, v)| v)
    }

    pub(crate) fn take_entry(&mut self, e: Entry) -> DbResult<(Option<K>, V)> {
        let es = self.entry_slot(e)?;
        if self.slots[es].link.head().is_some() {
            return Err(DbError::Busy);
        }
        self.slots
            .remove(es)
            .map(|n| (n.key, n.value))
            .ok_or(DbError::BadArgs)
    }

    /// Key `e` with `key` and link it into its bucket, growing the table
    /// first when autogrow is on and the count passes the rollover.
    pub fn add(&mut self, e: Entry, key: K) -> DbResult<()> {
        let es = self.entry_slot(e)?;
        if self.slots[es].link.head().is_some() {
            return Err(DbError::Busy);
        }
        if self.modulus == 0 && !self.config.autogrow {
            return Err(DbError::NoTable);
        }
        let hash = self.hooks.hash(&key);
        if self.lookup(hash, &key).is_some() {
            return Err(DbError::Duplicate);
        }

        self.count += 1;
        if self.config.autogrow && self.count > self.rollover {
            tracing::trace!(
                target: "dbprim",
                count = self.count,
                rollover = self.rollover,
                "autogrow triggered"
            );
            self.rebuild(self.config.target_for(self.count));
        }

        let node = &mut self.slots[es];
        node.key = Some(key);
        node.hash = hash;
        let b = self.bucket_of(hash);
        let linked = ChainMut::new(&mut self.slots, &mut self.buckets[b], b).insert(es, Location::Head);
        if linked.is_err() {
            self.count -= 1;
        }
        linked
    }

    /// Find the entry whose key compares equal to `key`.
    pub fn find(&self, key: &K) -> DbResult<Entry> {
        let hash = self.hooks.hash(key);
        self.lookup(hash, key)
            .map(|s| self.handle(s))
            .ok_or(DbError::NoEntry)
    }

    /// Unlink `e`, shrinking afterwards when autoshrink is on and the count
    /// drops under the rollunder.
    pub fn remove(&mut self, e: Entry) -> DbResult<()> {
        self.unlink(e)?;
        self.shrink_if_under();
        Ok(())
    }

    /// Unlink `e` without considering a shrink.
    pub(crate) fn unlink(&mut self, e: Entry) -> DbResult<()> {
        let es = self.entry_slot(e)?;
        let b = self.slots[es].link.head().ok_or(DbError::Unused)?;
        ChainMut::new(&mut self.slots, &mut self.buckets[b], b).remove(es)?;
        self.count -= 1;
        Ok(())
    }

    pub(crate) fn shrink_if_under(&mut self) {
        if self.config.autoshrink
            && self.count < self.rollunder
            && self.modulus > self.config.min_modulus
        {
            let target = self
                .config
                .target_for(self.count)
                .max(next_prime(self.config.min_modulus));
            if target < self.modulus {
                tracing::trace!(
                    target: "dbprim",
                    count = self.count,
                    rollunder = self.rollunder,
                    "autoshrink triggered"
                );
                self.rebuild(target);
            }
        }
    }

    /// Move a linked entry to a new key.
    pub fn rekey(&mut self, e: Entry, key: K) -> DbResult<()> {
        let es = self.entry_slot(e)?;
        let b = self.slots[es].link.head().ok_or(DbError::Unused)?;
        let hash = self.hooks.hash(&key);
        if self.lookup(hash, &key).is_some() {
            return Err(DbError::Duplicate);
        }
        ChainMut::new(&mut self.slots, &mut self.buckets[b], b).remove(es)?;

        let node = &mut self.slots[es];
        node.key = Some(key);
        node.hash = hash;
        let nb = self.bucket_of(hash);
        ChainMut::new(&mut self.slots, &mut self.buckets[nb], nb).insert(es, Location::Head)
    }

    /// Resize to the next prime `>= new_modulus`; zero picks a size from the
    /// current count.
    pub fn resize(&mut self, new_modulus: usize) -> DbResult<()> {
        let target = if new_modulus == 0 {
            self.config.target_for(self.count)
        } else {
            next_prime(new_modulus)
        };
        self.rebuild(target);
        Ok(())
    }

    fn rebuild(&mut self, new_modulus: usize) {
        let old_modulus = self.modulus;
        let mut old = core::mem::replace(
            &mut self.buckets,
            (0..new_modulus).map(|_| Chain::new()).collect(),
        );
        self.modulus = new_modulus;

        for (i, chain) in old.iter_mut().enumerate() {
            while let Some(es) = ChainMut::new(&mut self.slots, &mut *chain, i).pop_front() {
                let b = self.bucket_of(self.slots[es].hash);
                let relinked =
                    ChainMut::new(&mut self.slots, &mut self.buckets[b], b).insert(es, Location::Head);
                debug_assert!(relinked.is_ok(), "rehash failed to relink an entry");
            }
        }

        self.rollover = self.config.rollover_for(new_modulus);
        self.rollunder = self.config.rollunder_for(new_modulus);
        tracing::debug!(
            target: "dbprim",
            old_modulus,
            new_modulus,
            count = self.count,
            "hash table resized"
        );
        self.hooks.resized(ResizeInfo {
            old_modulus,
            new_modulus,
            count: self.count,
        });
    }

    /// Visit every linked entry; the first `Err` from `visit` is returned.
    pub fn iter<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(Entry, &K, &V) -> Result<(), E>,
    {
        for (e, k, v) in self.entries() {
            visit(e, k, v)?;
        }
        Ok(())
    }

    /// Linked entries, bucket by bucket.
    pub fn entries(&self) -> impl Iterator<Item = (Entry, &K, &V)> + '_ {
        let tag = self.tag;
        let slots = &self.slots;
        self.buckets
            .iter()
            .enumerate()
            .flat_map(move |(i, chain)| ChainRef::new(slots, chain, i).iter())
            .filter_map(move |(slot, n)| {
                n.key
                    .as_ref()
                    .map(|k| (Entry { tag, slot }, k, &n.value))
            })
    }

    /// Unlink every entry.
    pub fn flush(&mut self) -> DbResult<()> {
        self.flush_with(|_, _, _| Ok::<(), DbError>(()))
    }

    /// Unlink entries one by one, calling `visit` after each is unlinked. The
    /// first `Err` stops flushing. A complete flush of an autoshrink table
    /// also frees the bucket array.
    pub fn flush_with<E, F>(&mut self, mut visit: F) -> Result<(), E>
    where
        E: From<DbError>,
        F: FnMut(Entry, &K, &mut V) -> Result<(), E>,
    {
        for i in 0..self.buckets.len() {
            while let Some(es) = ChainMut::new(&mut self.slots, &mut self.buckets[i], i).pop_front() {
                self.count -= 1;
                let entry = self.handle(es);
                let HashEntry { key, value, .. } = &mut self.slots[es];
                if let Some(k) = key.as_ref() {
                    visit(entry, k, value)?;
                }
            }
        }
        tracing::trace!(target: "dbprim", modulus = self.modulus, "hash table flushed");
        self.count = 0;
        if self.config.autoshrink {
            self.free()?;
        }
        Ok(())
    }

    /// Release the bucket array of an empty table.
    pub fn free(&mut self) -> DbResult<()> {
        if self.count != 0 {
            return Err(DbError::NotEmpty);
        }
        self.buckets = Vec::new();
        self.modulus = 0;
        self.rollover = 0;
        self.rollunder = 0;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn modulus(&self) -> usize {
        self.modulus
    }

    pub fn rollover(&self) -> usize {
        self.rollover
    }

    pub fn rollunder(&self) -> usize {
        self.rollunder
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Replace the policy; thresholds are recomputed for the current modulus.
    /// An invalid config is rejected with BadArgs and the old one kept.
    pub fn set_config(&mut self, config: TableConfig) -> DbResult<()> {
        config.validate()?;
        self.config = config;
        self.rollover = config.rollover_for(self.modulus);
        self.rollunder = config.rollunder_for(self.modulus);
        Ok(())
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn extra(&self) -> &X {
        &self.extra
    }

    pub fn extra_mut(&mut self) -> &mut X {
        &mut self.extra
    }

    pub fn is_linked(&self, e: Entry) -> DbResult<bool> {
        let es = self.entry_slot(e)?;
        Ok(self.slots[es].link.head().is_some())
    }

    /// Key most recently assigned to `e`; Unused if it was never added.
    pub fn key(&self, e: Entry) -> DbResult<&K> {
        let es = self.entry_slot(e)?;
        self.slots[es].key.as_ref().ok_or(DbError::Unused)
    }

    pub fn value(&self, e: Entry) -> DbResult<&V> {
        let es = self.entry_slot(e)?;
        Ok(&self.slots[es].value)
    }

    pub fn value_mut(&mut self, e: Entry) -> DbResult<&mut V> {
        let es = self.entry_slot(e)?;
        Ok(&mut self.slots[es].value)
    }
}
