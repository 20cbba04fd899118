//! SparseMatrix: a two-key (row, column) table.
//!
//! Cells are entries of an embedded `HashTable` keyed by `(R, C)`, so a pair
//! is found in one bucket probe. Every cell is additionally threaded through
//! a chain for its row and a chain for its column, which makes "all cells of
//! row r" a walk over just those cells. A line (row or column) exists only
//! while it holds at least one cell.
//!
//! The embedded table always hashes with a fixed multiply-by-257 byte fold
//! and compares keys with `==`. A user resize hook, if any, is called after
//! the table has finished relocating its entries.

use crate::chain::{Chain, ChainMut, ChainRef, Link, Linked, Location};
use crate::error::{DbError, DbResult};
use crate::hash_table::{Entry, EntrySlot, HashEntry, HashTable, ResizeInfo, TableHooks};
use crate::sizing::TableConfig;
use core::hash::{Hash, Hasher};
use hashbrown::HashMap;
use slotmap::SlotMap;

/// Handle to a cell of a `SparseMatrix`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Cell(Entry);

/// User notification run after the matrix's table has been resized.
pub trait MatrixResize {
    fn resized(&mut self, info: ResizeInfo);
}

/// Resize hook that does nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoResize;

impl MatrixResize for NoResize {
    fn resized(&mut self, _info: ResizeInfo) {}
}

impl<F> MatrixResize for F
where
    F: FnMut(ResizeInfo),
{
    fn resized(&mut self, info: ResizeInfo) {
        self(info)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct RowId(u64);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct ColId(u64);

#[derive(Debug)]
pub(crate) struct CellData<V> {
    value: V,
    row: Link<EntrySlot, RowId>,
    col: Link<EntrySlot, ColId>,
}

impl<K, V> Linked<EntrySlot, RowId> for HashEntry<K, CellData<V>> {
    fn link(&self) -> &Link<EntrySlot, RowId> {
        &self.value.row
    }
    fn link_mut(&mut self) -> &mut Link<EntrySlot, RowId> {
        &mut self.value.row
    }
}

impl<K, V> Linked<EntrySlot, ColId> for HashEntry<K, CellData<V>> {
    fn link(&self) -> &Link<EntrySlot, ColId> {
        &self.value.col
    }
    fn link_mut(&mut self) -> &mut Link<EntrySlot, ColId> {
        &mut self.value.col
    }
}

/// `h = h * 257 + byte` over every byte the key writes.
#[derive(Default)]
struct Fold257(u64);

impl Hasher for Fold257 {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_mul(257).wrapping_add(u64::from(b));
        }
    }
}

fn fold<T: Hash + ?Sized>(key: &T) -> u64 {
    let mut h = Fold257::default();
    key.hash(&mut h);
    h.finish()
}

/// Table hooks of the embedded table: fixed hash and equality, plus the
/// internal resize routine that forwards to the user hook.
struct MatrixHooks<U> {
    user: U,
}

impl<R, C, U> TableHooks<(R, C)> for MatrixHooks<U>
where
    R: Hash + Eq,
    C: Hash + Eq,
    U: MatrixResize,
{
    fn hash(&self, key: &(R, C)) -> u64 {
        fold(key)
    }

    fn eq(&self, a: &(R, C), b: &(R, C)) -> bool {
        a == b
    }

    fn resized(&mut self, info: ResizeInfo) {
        tracing::trace!(
            target: "dbprim",
            new_modulus = info.new_modulus,
            "forwarding matrix resize"
        );
        self.user.resized(info);
    }
}

#[derive(Debug)]
struct Line<I> {
    id: I,
    chain: Chain<EntrySlot>,
}

pub struct SparseMatrix<R, C, V, U = NoResize, X = ()> {
    table: HashTable<(R, C), CellData<V>, MatrixHooks<U>, X>,
    rows: HashMap<R, Line<RowId>>,
    cols: HashMap<C, Line<ColId>>,
    next_line: u64,
}

impl<R, C, V> SparseMatrix<R, C, V>
where
    R: Hash + Eq + Clone,
    C: Hash + Eq + Clone,
{
    /// Unsized matrix whose table grows on demand.
    pub fn new() -> Self {
        let config = TableConfig::new().autogrow(true);
        Self::from_table(HashTable::build(config, MatrixHooks { user: NoResize }, (), 0))
    }
}

impl<R, C, V> Default for SparseMatrix<R, C, V>
where
    R: Hash + Eq + Clone,
    C: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, C, V, U, X> SparseMatrix<R, C, V, U, X>
where
    R: Hash + Eq + Clone,
    C: Hash + Eq + Clone,
    U: MatrixResize,
{
    /// BadArgs if `config` fails `TableConfig::validate`.
    pub fn with_config(
        config: TableConfig,
        resize: U,
        extra: X,
        modulus: usize,
    ) -> DbResult<Self> {
        let table = HashTable::with_config(config, MatrixHooks { user: resize }, extra, modulus)?;
        Ok(Self::from_table(table))
    }

    fn from_table(table: HashTable<(R, C), CellData<V>, MatrixHooks<U>, X>) -> Self {
        Self {
            table,
            rows: HashMap::new(),
            cols: HashMap::new(),
            next_line: 0,
        }
    }

    fn cell(&self, slot: EntrySlot) -> Cell {
        Cell(self.table.handle(slot))
    }

    fn lookup(&self, row: &R, col: &C) -> Option<EntrySlot> {
        let (Some(r), Some(c)) = (self.rows.get(row), self.cols.get(col)) else {
            return None;
        };
        if r.chain.is_empty() || c.chain.is_empty() {
            return None;
        }
        self.table
            .find_hashed(fold(&(row, col)), |(kr, kc)| kr == row && kc == col)
    }

    /// Insert at the tail of both the row and the column.
    pub fn insert(&mut self, row: R, col: C, value: V) -> DbResult<Cell> {
        self.insert_at(row, Location::Tail, col, Location::Tail, value)
    }

    /// Insert a new cell, placing it in its row at `row_loc` and in its
    /// column at `col_loc`. Reference cells must belong to the named row or
    /// column.
    pub fn insert_at(
        &mut self,
        row: R,
        row_loc: Location<Cell>,
        col: C,
        col_loc: Location<Cell>,
        value: V,
    ) -> DbResult<Cell> {
        if self.lookup(&row, &col).is_some() {
            return Err(DbError::Duplicate);
        }
        let row_loc = row_loc.try_map(|c| self.table.entry_slot(c.0))?;
        let col_loc = col_loc.try_map(|c| self.table.entry_slot(c.0))?;
        check_anchor(&self.rows, self.table.slots(), &row, row_loc)?;
        check_anchor(&self.cols, self.table.slots(), &col, col_loc)?;
        if self.table.modulus() == 0 && !self.table.config().autogrow {
            return Err(DbError::NoTable);
        }

        let entry = self.table.new_entry(CellData {
            value,
            row: Link::new(),
            col: Link::new(),
        });
        if let Err(err) = self.table.add(entry, (row.clone(), col.clone())) {
            self.table.release_entry(entry)?;
            return Err(err);
        }
        let es = self.table.entry_slot(entry)?;

        let next = &mut self.next_line;
        let line = self.rows.entry(row).or_insert_with(|| {
            *next += 1;
            Line {
                id: RowId(*next),
                chain: Chain::new(),
            }
        });
        ChainMut::new(self.table.slots_mut(), &mut line.chain, line.id).insert(es, row_loc)?;

        let line = self.cols.entry(col).or_insert_with(|| {
            *next += 1;
            Line {
                id: ColId(*next),
                chain: Chain::new(),
            }
        });
        ChainMut::new(self.table.slots_mut(), &mut line.chain, line.id).insert(es, col_loc)?;

        Ok(Cell(entry))
    }

    /// Find the cell at `(row, col)`.
    pub fn find(&self, row: &R, col: &C) -> DbResult<Cell> {
        self.lookup(row, col)
            .map(|s| self.cell(s))
            .ok_or(DbError::NoEntry)
    }

    pub fn get(&self, row: &R, col: &C) -> DbResult<&V> {
        let es = self.lookup(row, col).ok_or(DbError::NoEntry)?;
        Ok(&self.table.slots()[es].value.value)
    }

    pub fn get_mut(&mut self, row: &R, col: &C) -> DbResult<&mut V> {
        let es = self.lookup(row, col).ok_or(DbError::NoEntry)?;
        Ok(&mut self.table.slots_mut()[es].value.value)
    }

    /// Remove the cell at `(row, col)` and return its value.
    pub fn remove(&mut self, row: &R, col: &C) -> DbResult<V> {
        let es = self.lookup(row, col).ok_or(DbError::NoEntry)?;
        let entry = self.table.handle(es);
        self.take(entry).map(|(_, _, v)| v)
    }

    pub fn remove_cell(&mut self, cell: Cell) -> DbResult<V> {
        self.take(cell.0).map(|(_, _, v)| v)
    }

    fn take(&mut self, entry: Entry) -> DbResult<(R, C, V)> {
        let taken = self.detach(entry)?;
        self.table.shrink_if_under();
        Ok(taken)
    }

    // Unlink from both lines and the table, then release the entry. Never
    // resizes.
    fn detach(&mut self, entry: Entry) -> DbResult<(R, C, V)> {
        let es = self.table.entry_slot(entry)?;
        let (row, col) = self.table.key(entry)?.clone();
        unlink(&mut self.rows, self.table.slots_mut(), &row, es)?;
        unlink(&mut self.cols, self.table.slots_mut(), &col, es)?;
        self.table.unlink(entry)?;
        let (_, data) = self.table.take_entry(entry)?;
        Ok((row, col, data.value))
    }

    /// Resize the embedded table; see `HashTable::resize`.
    pub fn resize(&mut self, new_modulus: usize) -> DbResult<()> {
        self.table.resize(new_modulus)
    }

    pub fn row_len(&self, row: &R) -> usize {
        self.rows.get(row).map_or(0, |l| l.chain.len())
    }

    pub fn col_len(&self, col: &C) -> usize {
        self.cols.get(col).map_or(0, |l| l.chain.len())
    }

    /// Rows holding at least one cell.
    pub fn rows(&self) -> impl Iterator<Item = &R> + '_ {
        self.rows.keys()
    }

    /// Columns holding at least one cell.
    pub fn cols(&self) -> impl Iterator<Item = &C> + '_ {
        self.cols.keys()
    }

    /// Cells of `row` in row order, with their column and value.
    pub fn row_cells(&self, row: &R) -> impl Iterator<Item = (Cell, &C, &V)> + '_ {
        let table = &self.table;
        line_iter(table.slots(), &self.rows, row).filter_map(move |(es, n)| {
            n.key()
                .map(|(_, c)| (Cell(table.handle(es)), c, &n.value.value))
        })
    }

    /// Cells of `col` in column order, with their row and value.
    pub fn col_cells(&self, col: &C) -> impl Iterator<Item = (Cell, &R, &V)> + '_ {
        let table = &self.table;
        line_iter(table.slots(), &self.cols, col).filter_map(move |(es, n)| {
            n.key()
                .map(|(r, _)| (Cell(table.handle(es)), r, &n.value.value))
        })
    }

    pub fn iter_row<E, F>(&self, row: &R, mut visit: F) -> Result<(), E>
    where
        F: FnMut(Cell, &C, &V) -> Result<(), E>,
    {
        for (cell, col, value) in self.row_cells(row) {
            visit(cell, col, value)?;
        }
        Ok(())
    }

    pub fn iter_col<E, F>(&self, col: &C, mut visit: F) -> Result<(), E>
    where
        F: FnMut(Cell, &R, &V) -> Result<(), E>,
    {
        for (cell, row, value) in self.col_cells(col) {
            visit(cell, row, value)?;
        }
        Ok(())
    }

    /// Scan `row` from `start` (or its first cell) for a cell accepted by
    /// `compare(col, value)`.
    pub fn find_in_row<F>(&self, row: &R, start: Option<Cell>, mut compare: F) -> DbResult<Cell>
    where
        F: FnMut(&C, &V) -> bool,
    {
        let start = start.map(|c| self.table.entry_slot(c.0)).transpose()?;
        line_find(self.table.slots(), &self.rows, row, start, |n| {
            n.key().is_some_and(|(_, c)| compare(c, &n.value.value))
        })
        .map(|s| self.cell(s))
    }

    /// Scan `col` from `start` (or its first cell) for a cell accepted by
    /// `compare(row, value)`.
    pub fn find_in_col<F>(&self, col: &C, start: Option<Cell>, mut compare: F) -> DbResult<Cell>
    where
        F: FnMut(&R, &V) -> bool,
    {
        let start = start.map(|c| self.table.entry_slot(c.0)).transpose()?;
        line_find(self.table.slots(), &self.cols, col, start, |n| {
            n.key().is_some_and(|(r, _)| compare(r, &n.value.value))
        })
        .map(|s| self.cell(s))
    }

    /// Reposition `cell` within `row`.
    pub fn move_in_row(&mut self, row: &R, cell: Cell, loc: Location<Cell>) -> DbResult<()> {
        let es = self.table.entry_slot(cell.0)?;
        let loc = loc.try_map(|c| self.table.entry_slot(c.0))?;
        let line = self.rows.get_mut(row).ok_or(DbError::WrongTable)?;
        ChainMut::new(self.table.slots_mut(), &mut line.chain, line.id).relocate(es, loc)
    }

    /// Reposition `cell` within `col`.
    pub fn move_in_col(&mut self, col: &C, cell: Cell, loc: Location<Cell>) -> DbResult<()> {
        let es = self.table.entry_slot(cell.0)?;
        let loc = loc.try_map(|c| self.table.entry_slot(c.0))?;
        let line = self.cols.get_mut(col).ok_or(DbError::WrongTable)?;
        ChainMut::new(self.table.slots_mut(), &mut line.chain, line.id).relocate(es, loc)
    }

    /// Remove every cell of `row` in row order, handing each removed cell to
    /// `visit`. The first `Err` stops flushing.
    pub fn flush_row<E, F>(&mut self, row: &R, mut visit: F) -> Result<(), E>
    where
        E: From<DbError>,
        F: FnMut(R, C, V) -> Result<(), E>,
    {
        while let Some(es) = self.rows.get(row).and_then(|l| l.chain.first()) {
            let (r, c, v) = self.take(self.table.handle(es))?;
            visit(r, c, v)?;
        }
        Ok(())
    }

    /// Remove every cell of `col` in column order; see `flush_row`.
    pub fn flush_col<E, F>(&mut self, col: &C, mut visit: F) -> Result<(), E>
    where
        E: From<DbError>,
        F: FnMut(R, C, V) -> Result<(), E>,
    {
        while let Some(es) = self.cols.get(col).and_then(|l| l.chain.first()) {
            let (r, c, v) = self.take(self.table.handle(es))?;
            visit(r, c, v)?;
        }
        Ok(())
    }

    /// Remove every cell.
    pub fn flush(&mut self) -> DbResult<()> {
        self.flush_with(|_, _, _| Ok::<(), DbError>(()))
    }

    /// Remove every cell, handing each to `visit`. The first `Err` stops
    /// flushing. The table is never resized mid-flush; a complete flush of
    /// an autoshrink matrix frees the bucket array instead.
    pub fn flush_with<E, F>(&mut self, mut visit: F) -> Result<(), E>
    where
        E: From<DbError>,
        F: FnMut(R, C, V) -> Result<(), E>,
    {
        let cells: Vec<Entry> = self.table.entries().map(|(e, _, _)| e).collect();
        for entry in cells {
            let (r, c, v) = self.detach(entry)?;
            visit(r, c, v)?;
        }
        tracing::trace!(target: "dbprim", "sparse matrix flushed");
        if self.table.config().autoshrink {
            self.table.free()?;
        }
        Ok(())
    }

    /// Release the bucket array of an empty matrix.
    pub fn free(&mut self) -> DbResult<()> {
        self.table.free()
    }

    pub fn key(&self, cell: Cell) -> DbResult<(&R, &C)> {
        self.table.key(cell.0).map(|(r, c)| (r, c))
    }

    pub fn value(&self, cell: Cell) -> DbResult<&V> {
        self.table.value(cell.0).map(|d| &d.value)
    }

    pub fn value_mut(&mut self, cell: Cell) -> DbResult<&mut V> {
        self.table.value_mut(cell.0).map(|d| &mut d.value)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn modulus(&self) -> usize {
        self.table.modulus()
    }

    pub fn config(&self) -> &TableConfig {
        self.table.config()
    }

    pub fn set_config(&mut self, config: TableConfig) -> DbResult<()> {
        self.table.set_config(config)
    }

    pub fn resize_hook(&self) -> &U {
        &self.table.hooks().user
    }

    pub fn resize_hook_mut(&mut self) -> &mut U {
        &mut self.table.hooks_mut().user
    }

    pub fn extra(&self) -> &X {
        self.table.extra()
    }

    pub fn extra_mut(&mut self) -> &mut X {
        self.table.extra_mut()
    }
}

// A reference cell must sit in the line named by `key`.
fn check_anchor<L, I, N>(
    lines: &HashMap<L, Line<I>>,
    slots: &SlotMap<EntrySlot, N>,
    key: &L,
    loc: Location<EntrySlot>,
) -> DbResult<()>
where
    L: Hash + Eq,
    I: Copy + Eq,
    N: Linked<EntrySlot, I>,
{
    let Some(r) = loc.anchor() else {
        return Ok(());
    };
    let node = slots.get(r).ok_or(DbError::BadArgs)?;
    match node.link().head() {
        None => Err(DbError::Unused),
        Some(h) if lines.get(key).is_some_and(|l| l.id == h) => Ok(()),
        Some(_) => Err(DbError::WrongTable),
    }
}

fn unlink<L, I, N>(
    lines: &mut HashMap<L, Line<I>>,
    slots: &mut SlotMap<EntrySlot, N>,
    key: &L,
    es: EntrySlot,
) -> DbResult<()>
where
    L: Hash + Eq,
    I: Copy + Eq,
    N: Linked<EntrySlot, I>,
{
    let line = lines.get_mut(key).ok_or(DbError::Unused)?;
    ChainMut::new(slots, &mut line.chain, line.id).remove(es)?;
    if line.chain.is_empty() {
        lines.remove(key);
    }
    Ok(())
}

fn line_iter<'a, L, I, N>(
    slots: &'a SlotMap<EntrySlot, N>,
    lines: &'a HashMap<L, Line<I>>,
    key: &L,
) -> impl Iterator<Item = (EntrySlot, &'a N)> + 'a
where
    L: Hash + Eq,
    I: Copy + Eq + 'a,
    N: Linked<EntrySlot, I>,
{
    lines
        .get(key)
        .into_iter()
        .flat_map(move |line| ChainRef::new(slots, &line.chain, line.id).iter())
}

fn line_find<L, I, N, F>(
    slots: &SlotMap<EntrySlot, N>,
    lines: &HashMap<L, Line<I>>,
    key: &L,
    start: Option<EntrySlot>,
    mut pred: F,
) -> DbResult<EntrySlot>
where
    L: Hash + Eq,
    I: Copy + Eq,
    N: Linked<EntrySlot, I>,
    F: FnMut(&N) -> bool,
{
    match lines.get(key) {
        Some(line) => ChainRef::new(slots, &line.chain, line.id).find(start, |_, n| pred(n)),
        None if start.is_some() => Err(DbError::WrongTable),
        None => Err(DbError::NoEntry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizing::Ratio;
    use std::cell::Cell as Counter;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder(Vec<ResizeInfo>);

    impl MatrixResize for Recorder {
        fn resized(&mut self, info: ResizeInfo) {
            self.0.push(info);
        }
    }

    fn cols_of(m: &SparseMatrix<u32, u32, &'static str>, row: u32) -> Vec<u32> {
        m.row_cells(&row).map(|(_, c, _)| *c).collect()
    }

    fn rows_of(m: &SparseMatrix<u32, u32, &'static str>, col: u32) -> Vec<u32> {
        m.col_cells(&col).map(|(_, r, _)| *r).collect()
    }

    #[test]
    fn fold_multiplies_by_257() {
        assert_eq!(fold(&(1u8, 2u8)), 259);
        assert_eq!(fold(&(1u8, 2u8)), fold(&(&1u8, &2u8)));
    }

    #[test]
    fn insert_then_find_and_get() {
        let mut m = SparseMatrix::new();
        let a = m.insert(1, 10, "a").unwrap();
        let b = m.insert(1, 20, "b").unwrap();
        m.insert(2, 10, "c").unwrap();
        assert_eq!(m.find(&1, &10), Ok(a));
        assert_eq!(m.find(&1, &20), Ok(b));
        assert_eq!(m.get(&2, &10), Ok(&"c"));
        assert_eq!(m.find(&2, &20), Err(DbError::NoEntry));
        assert_eq!(m.find(&9, &10), Err(DbError::NoEntry));
        assert_eq!(m.key(a), Ok((&1, &10)));
        assert_eq!(m.len(), 3);
        assert_eq!(m.row_len(&1), 2);
        assert_eq!(m.col_len(&10), 2);
    }

    /// Invariant: a rejected duplicate leaves table and lines untouched.
    #[test]
    fn duplicate_pair_rejected() {
        let mut m = SparseMatrix::new();
        m.insert(1, 1, "a").unwrap();
        assert_eq!(m.insert(1, 1, "b"), Err(DbError::Duplicate));
        assert_eq!(m.len(), 1);
        assert_eq!(m.row_len(&1), 1);
        assert_eq!(m.col_len(&1), 1);
        assert_eq!(m.get(&1, &1), Ok(&"a"));
    }

    #[test]
    fn insert_at_positions_within_lines() {
        let mut m = SparseMatrix::new();
        let c10 = m.insert(1, 10, "a").unwrap();
        let c30 = m.insert(1, 30, "b").unwrap();
        m.insert_at(1, Location::Before(c30), 20, Location::Tail, "c")
            .unwrap();
        m.insert_at(1, Location::Head, 5, Location::Tail, "d")
            .unwrap();
        assert_eq!(cols_of(&m, 1), vec![5, 10, 20, 30]);

        m.insert_at(0, Location::Tail, 10, Location::After(c10), "e")
            .unwrap();
        assert_eq!(rows_of(&m, 10), vec![1, 0]);
    }

    #[test]
    fn reference_cell_in_other_line_is_wrong_table() {
        let mut m = SparseMatrix::new();
        let c = m.insert(1, 1, "a").unwrap();
        assert_eq!(
            m.insert_at(2, Location::After(c), 2, Location::Tail, "b"),
            Err(DbError::WrongTable)
        );
        assert_eq!(
            m.insert_at(1, Location::Tail, 2, Location::Before(c), "b"),
            Err(DbError::WrongTable)
        );
        assert_eq!(m.len(), 1);
        assert_eq!(m.row_len(&2), 0);
        assert_eq!(m.col_len(&2), 0);
    }

    #[test]
    fn stale_cell_is_bad_args() {
        let mut m = SparseMatrix::new();
        let c = m.insert(1, 1, "a").unwrap();
        m.remove_cell(c).unwrap();
        assert_eq!(m.remove_cell(c), Err(DbError::BadArgs));
        assert_eq!(m.value(c), Err(DbError::BadArgs));
    }

    #[test]
    fn cells_from_another_matrix_are_wrong_table() {
        let mut a = SparseMatrix::<u32, u32, &str>::new();
        let mut b = SparseMatrix::<u32, u32, &str>::new();
        let foreign = b.insert(1, 1, "b").unwrap();
        a.insert(1, 1, "a").unwrap();
        assert_eq!(a.remove_cell(foreign), Err(DbError::WrongTable));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn unsized_fixed_matrix_has_no_table() {
        let mut m: SparseMatrix<u32, u32, &str> =
            SparseMatrix::with_config(TableConfig::new(), NoResize, (), 0).unwrap();
        assert_eq!(m.insert(1, 1, "a"), Err(DbError::NoTable));
        assert_eq!(m.row_len(&1), 0);
        assert!(m.is_empty());
    }

    /// Invariant: removing the last cell of a line drops the line.
    #[test]
    fn remove_drops_empty_lines() {
        let mut m = SparseMatrix::new();
        m.insert(1, 1, "a").unwrap();
        m.insert(1, 2, "b").unwrap();
        assert_eq!(m.remove(&1, &1), Ok("a"));
        assert_eq!(m.rows().count(), 1);
        assert_eq!(m.cols().copied().collect::<Vec<_>>(), vec![2]);
        assert_eq!(m.remove(&1, &1), Err(DbError::NoEntry));
        assert_eq!(m.remove(&1, &2), Ok("b"));
        assert_eq!(m.rows().count(), 0);
        assert_eq!(m.cols().count(), 0);
        assert!(m.is_empty());
    }

    #[test]
    fn resize_keeps_every_pair_and_notifies_user() {
        let mut m: SparseMatrix<u32, u32, u32, Recorder> = SparseMatrix::with_config(
            TableConfig::new().autogrow(true),
            Recorder::default(),
            (),
            3,
        )
        .unwrap();
        for r in 0..6u32 {
            for c in 0..5u32 {
                m.insert(r, c, r * 10 + c).unwrap();
            }
        }
        let grown = m.resize_hook().0.len();
        assert!(grown > 0);
        m.resize(97).unwrap();
        assert_eq!(m.modulus(), 97);
        assert_eq!(m.resize_hook().0.len(), grown + 1);
        assert_eq!(m.resize_hook().0[grown].count, 30);
        for r in 0..6u32 {
            for c in 0..5u32 {
                assert_eq!(m.get(&r, &c), Ok(&(r * 10 + c)));
            }
        }
    }

    #[test]
    fn closure_resize_hook() {
        let calls = Rc::new(Counter::new(0));
        let seen = Rc::clone(&calls);
        let mut m: SparseMatrix<u8, u8, (), _> = SparseMatrix::with_config(
            TableConfig::new(),
            move |_info: ResizeInfo| seen.set(seen.get() + 1),
            (),
            5,
        )
        .unwrap();
        m.insert(1, 1, ()).unwrap();
        m.resize(0).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn find_and_move_in_lines() {
        let mut m = SparseMatrix::new();
        let a = m.insert(1, 10, "a").unwrap();
        let b = m.insert(1, 20, "b").unwrap();
        let c = m.insert(1, 30, "a").unwrap();
        assert_eq!(m.find_in_row(&1, None, |_, v| *v == "a"), Ok(a));
        assert_eq!(m.find_in_row(&1, Some(b), |_, v| *v == "a"), Ok(c));
        assert_eq!(m.find_in_col(&20, None, |r, _| *r == 1), Ok(b));
        assert_eq!(
            m.find_in_row(&2, Some(a), |_, _| true),
            Err(DbError::WrongTable)
        );
        assert_eq!(m.find_in_row(&2, None, |_, _| true), Err(DbError::NoEntry));

        m.move_in_row(&1, c, Location::Head).unwrap();
        assert_eq!(cols_of(&m, 1), vec![30, 10, 20]);
        assert_eq!(
            m.move_in_row(&1, a, Location::After(a)),
            Err(DbError::Busy)
        );
        assert_eq!(
            m.move_in_col(&10, b, Location::Head),
            Err(DbError::WrongTable)
        );
    }

    /// Invariant: flushing a row removes its cells from their columns too.
    #[test]
    fn flush_row_clears_crossing_columns() {
        let mut m = SparseMatrix::new();
        m.insert(1, 10, "a").unwrap();
        m.insert(1, 20, "b").unwrap();
        m.insert(2, 10, "c").unwrap();
        let mut removed = Vec::new();
        m.flush_row(&1, |r, c, v| {
            removed.push((r, c, v));
            Ok::<(), DbError>(())
        })
        .unwrap();
        assert_eq!(removed, vec![(1, 10, "a"), (1, 20, "b")]);
        assert_eq!(m.row_len(&1), 0);
        assert_eq!(rows_of(&m, 10), vec![2]);
        assert_eq!(m.col_len(&20), 0);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn flush_col_stops_on_error() {
        let mut m = SparseMatrix::new();
        for r in 0..3u32 {
            m.insert(r, 7, "x").unwrap();
        }
        let res = m.flush_col(&7, |_, _, _| Err(DbError::NoEntry));
        assert_eq!(res, Err(DbError::NoEntry));
        assert_eq!(m.col_len(&7), 2);
        assert_eq!(rows_of(&m, 7), vec![1, 2]);
    }

    /// Invariant: a whole-matrix flush never resizes the table, even with
    /// autoshrink on; the bucket array is freed once at the end.
    #[test]
    fn flush_sends_no_resize_notifications() {
        let mut m: SparseMatrix<u32, u32, u32, Recorder> = SparseMatrix::with_config(
            TableConfig::new().autogrow(true).autoshrink(true),
            Recorder::default(),
            (),
            0,
        )
        .unwrap();
        for i in 0..200u32 {
            m.insert(i / 10, i % 10, i).unwrap();
        }
        let grown = m.resize_hook().0.len();
        assert!(grown > 0);

        let mut seen = 0;
        let res = m.flush_with(|_, _, _| {
            seen += 1;
            if seen == 150 {
                Err(DbError::NoEntry)
            } else {
                Ok(())
            }
        });
        assert_eq!(res, Err(DbError::NoEntry));
        assert_eq!(m.len(), 50);
        assert_eq!(m.resize_hook().0.len(), grown);

        m.flush().unwrap();
        assert_eq!(m.resize_hook().0.len(), grown);
        assert_eq!(m.modulus(), 0);
        assert_eq!(m.rows().count(), 0);
        assert_eq!(m.cols().count(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let zero_fuzz = TableConfig::new().autogrow(true).fuzz(Ratio::new(0, 1));
        assert!(matches!(
            SparseMatrix::<u8, u8, ()>::with_config(zero_fuzz, NoResize, (), 0),
            Err(DbError::BadArgs)
        ));
        let mut m = SparseMatrix::<u8, u8, ()>::new();
        m.insert(1, 1, ()).unwrap();
        assert_eq!(
            m.set_config(TableConfig::new().rollunder(Ratio::new(2, 1))),
            Err(DbError::BadArgs)
        );
        assert!(m.config().autogrow);
    }

    #[test]
    fn flush_empties_and_autoshrink_frees() {
        let mut m: SparseMatrix<u32, u32, u32> = SparseMatrix::with_config(
            TableConfig::new().autogrow(true).autoshrink(true),
            NoResize,
            (),
            0,
        )
        .unwrap();
        for i in 0..20u32 {
            m.insert(i % 4, i, i).unwrap();
        }
        let mut total = 0;
        m.flush_with(|_, _, v| {
            total += v;
            Ok::<(), DbError>(())
        })
        .unwrap();
        assert_eq!(total, (0..20).sum::<u32>());
        assert!(m.is_empty());
        assert_eq!(m.rows().count(), 0);
        assert_eq!(m.modulus(), 0);
        m.insert(1, 1, 1).unwrap();
        assert_eq!(m.get(&1, &1), Ok(&1));
    }

    #[test]
    fn free_requires_empty() {
        let mut m = SparseMatrix::new();
        m.insert(1u8, 1u8, ()).unwrap();
        assert_eq!(m.free(), Err(DbError::NotEmpty));
        m.flush().unwrap();
        m.free().unwrap();
        assert_eq!(m.modulus(), 0);
    }

    #[test]
    fn value_mut_updates_in_place() {
        let mut m = SparseMatrix::new();
        let c = m.insert("r".to_string(), 'c', 1u32).unwrap();
        *m.value_mut(c).unwrap() += 1;
        *m.get_mut(&"r".to_string(), &'c').unwrap() += 1;
        assert_eq!(m.value(c), Ok(&3));
    }
}
