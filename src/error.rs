//! Result codes shared by every container in the crate.

use thiserror::Error;

/// Failure kinds reported by list, hash table and sparse matrix operations.
///
/// Every operation validates its arguments before touching any link, so an
/// `Err` never leaves a container partially mutated.
#[derive(Error, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DbError {
    /// A handle is stale or otherwise fails its validity check.
    #[error("invalid argument")]
    BadArgs,
    /// The element is already linked into a list or table.
    #[error("element is already linked")]
    Busy,
    /// A handle belongs to a different list or table than the one given.
    #[error("element belongs to a different container")]
    WrongTable,
    /// A reference element is not linked anywhere.
    #[error("element is not linked")]
    Unused,
    /// A search completed without a match.
    #[error("no matching entry")]
    NoEntry,
    /// An entry with an equal key is already in the table.
    #[error("duplicate key")]
    Duplicate,
    /// The table has no bucket array and automatic growth is disabled.
    #[error("table has no bucket array")]
    NoTable,
    /// The container still holds elements.
    #[error("container is not empty")]
    NotEmpty,
}

impl DbError {
    /// Stable numeric code; success is reported as `Ok` and corresponds to 0.
    pub const fn code(&self) -> u32 {
        match self {
            Self::BadArgs => 1,
            Self::Busy => 2,
            Self::WrongTable => 3,
            Self::Unused => 4,
            Self::NoEntry => 5,
            Self::Duplicate => 6,
            Self::NoTable => 7,
            Self::NotEmpty => 8,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::DbError;
    use std::collections::BTreeSet;

    #[test]
    fn codes_are_distinct_and_nonzero() {
        let all = [
            DbError::BadArgs,
            DbError::Busy,
            DbError::WrongTable,
            DbError::Unused,
            DbError::NoEntry,
            DbError::Duplicate,
            DbError::NoTable,
            DbError::NotEmpty,
        ];
        let codes: BTreeSet<u32> = all.iter().map(DbError::code).collect();
        assert_eq!(codes.len(), all.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(DbError::NoEntry.to_string(), "no matching entry");
        assert_eq!(DbError::Busy.to_string(), "element is already linked");
    }
}
