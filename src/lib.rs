//! dbprim: single-threaded intrusive lists, a chained hash table with
//! prime-modulus resizing, and a sparse two-key matrix built on both.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: index large, frequently mutated collections (connection
//!   tables, name registries, membership sets) without per-operation heap
//!   churn, in layers that can each be reasoned about on their own.
//! - Layers:
//!   - chain: the splice engine. A `Link` (prev, next, owning head) lives
//!     inside each node; a `Chain` (count, first, last) is the head. Nodes
//!     are stored in a `SlotMap` and a chain only ever holds slot keys.
//!   - LinkList<T, X>: standalone lists. Elements and heads live in one
//!     arena and are addressed by `Elem` / `ListId` handles.
//!   - HashTable<K, V, H, X>: buckets are chains; owns modulus selection,
//!     growth and shrink policy and rehashing.
//!   - SparseMatrix<R, C, V, U, X>: a hash table keyed by `(row, col)` plus
//!     per-row and per-column chains through the same cells.
//!
//! Constraints
//! - Single-threaded; no locks, no atomics beyond handle tagging.
//! - Payloads are owned by the container between `new_*` and `release_*`.
//!   Unlinking never drops a payload.
//! - Every handle carries the tag of the container that issued it. A handle
//!   from another container reports `WrongTable`; a released one reports
//!   `BadArgs`.
//! - Arguments are validated before any link is rewritten, so an `Err`
//!   leaves the container as it was.
//!
//! Membership
//! - A node's `head` back-reference is the only record of which chain it is
//!   in. `Busy`, `Unused` and `WrongTable` are all decided from it.
//! - A node may carry several links, one per head type. Matrix cells carry
//!   three: bucket, row and column.
//!
//! Hashing and resizing
//! - Each hash entry stores the full `u64` hash of its key. Rehashing uses
//!   the stored hash; `TableHooks::hash` is never called again for a key
//!   already in the table.
//! - The modulus is 0 (unsized) or prime. Rollover and rollunder thresholds
//!   follow the modulus; automatic resizes pick `prime(fuzz(count))`. See
//!   `TableConfig` for the ratios.
//! - `TableHooks::resized` runs after every entry has been relinked.
//!
//! Notes and non-goals
//! - No thread-safety, persistence or borrowed-key lookup.
//! - Visitor callbacks return `Result<(), E>`; the first `Err` stops the
//!   walk and is returned unchanged.

mod chain;
pub mod error;
pub mod hash_table;
mod hash_table_proptest;
pub mod list;
mod list_proptest;
pub mod sizing;
pub mod smat;
mod smat_proptest;

// Public surface
pub use chain::Location;
pub use error::{DbError, DbResult};
pub use hash_table::{Entry, HashTable, ResizeInfo, StdHooks, TableHooks};
pub use list::{Elem, Elems, LinkList, ListId};
pub use sizing::{next_prime, Ratio, TableConfig};
pub use smat::{Cell, MatrixResize, NoResize, SparseMatrix};
