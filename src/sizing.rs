//! Modulus selection and resize thresholds.
//!
//! A table's modulus is always zero (unsized) or prime. The rollover and
//! rollunder thresholds are element counts derived from the modulus; the
//! fuzz ratio picks the target size for an automatic resize from the current
//! element count.
//!
//! Tables only accept a config that passes `TableConfig::validate`: no zero
//! denominators, and a grow target that always lands back under the new
//! rollover.

use crate::error::{DbError, DbResult};

/// A rational scale factor applied with integer arithmetic: `n * num / den`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ratio {
    pub num: usize,
    pub den: usize,
}

impl Ratio {
    pub const fn new(num: usize, den: usize) -> Self {
        Self { num, den }
    }

    /// `None` when the denominator is zero.
    pub const fn apply(&self, n: usize) -> Option<usize> {
        n.saturating_mul(self.num).checked_div(self.den)
    }

    /// `self * other >= 1`, computed without division.
    const fn covers_inverse_of(&self, other: Ratio) -> bool {
        self.num.saturating_mul(other.num) >= self.den.saturating_mul(other.den)
    }

    /// `self < other`, computed without division.
    const fn less_than(&self, other: Ratio) -> bool {
        self.num.saturating_mul(other.den) < other.num.saturating_mul(self.den)
    }
}

/// Growth and shrink policy for a hash table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableConfig {
    /// Grow when the element count exceeds the rollover threshold.
    pub autogrow: bool,
    /// Shrink when the element count drops under the rollunder threshold.
    pub autoshrink: bool,
    /// Rollover threshold as a multiple of the modulus.
    pub rollover: Ratio,
    /// Rollunder threshold as a multiple of the modulus.
    pub rollunder: Ratio,
    /// Target modulus for an automatic resize, as a multiple of the count.
    pub fuzz: Ratio,
    /// Automatic shrinking never goes below this modulus.
    pub min_modulus: usize,
}

impl TableConfig {
    pub const DEFAULT_ROLLOVER: Ratio = Ratio::new(4, 3);
    pub const DEFAULT_ROLLUNDER: Ratio = Ratio::new(3, 4);
    pub const DEFAULT_FUZZ: Ratio = Ratio::new(4, 3);

    /// Fixed-size table with the default ratios.
    pub const fn new() -> Self {
        Self {
            autogrow: false,
            autoshrink: false,
            rollover: Self::DEFAULT_ROLLOVER,
            rollunder: Self::DEFAULT_ROLLUNDER,
            fuzz: Self::DEFAULT_FUZZ,
            min_modulus: 0,
        }
    }

    pub const fn autogrow(mut self, on: bool) -> Self {
        self.autogrow = on;
        self
    }

    pub const fn autoshrink(mut self, on: bool) -> Self {
        self.autoshrink = on;
        self
    }

    pub const fn rollover(mut self, r: Ratio) -> Self {
        self.rollover = r;
        self
    }

    pub const fn rollunder(mut self, r: Ratio) -> Self {
        self.rollunder = r;
        self
    }

    pub const fn fuzz(mut self, r: Ratio) -> Self {
        self.fuzz = r;
        self
    }

    pub const fn min_modulus(mut self, m: usize) -> Self {
        self.min_modulus = m;
        self
    }

    /// Reject ratios a table cannot resize with.
    ///
    /// Every denominator must be non-zero, `rollover` and `fuzz` must be
    /// positive with `fuzz * rollover >= 1`, and `rollunder` must be below
    /// `rollover`.
    pub const fn validate(&self) -> DbResult<()> {
        let (over, under, fuzz) = (self.rollover, self.rollunder, self.fuzz);
        if over.den == 0 || under.den == 0 || fuzz.den == 0 {
            return Err(DbError::BadArgs);
        }
        if over.num == 0 || fuzz.num == 0 || !fuzz.covers_inverse_of(over) {
            return Err(DbError::BadArgs);
        }
        if !under.less_than(over) {
            return Err(DbError::BadArgs);
        }
        Ok(())
    }

    // The threshold helpers below run on validated configs only.

    pub(crate) fn rollover_for(&self, modulus: usize) -> usize {
        self.rollover.apply(modulus).unwrap_or(0)
    }

    pub(crate) fn rollunder_for(&self, modulus: usize) -> usize {
        self.rollunder.apply(modulus).unwrap_or(0)
    }

    /// Modulus an automatic resize picks for `count` elements: the smallest
    /// prime `>= fuzz(count)` whose rollover holds `count`.
    pub(crate) fn target_for(&self, count: usize) -> usize {
        let fuzzed = self.fuzz.apply(count.max(1)).unwrap_or(0);
        let mut m = next_prime(fuzzed.max(2));
        while self.rollover_for(m) < count {
            m = next_prime(m + 1);
        }
        m
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3usize;
    while d.saturating_mul(d) <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Smallest prime `>= n`; zero stays zero.
pub fn next_prime(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    if n <= 2 {
        return 2;
    }
    let mut c = n | 1;
    while !is_prime(c) {
        c += 2;
    }
    c
}
