// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use smallvec::SmallVec;

use crate::errors::{invalid_model_error, Result};
use crate::model::{Model, Range, MAX_TOTAL};

/// A general frequency table: symbol `i` has mass `f_i >= 1`. Cumulative sums are precomputed at
/// construction so `range` is O(1) and `find` is a binary search.
#[derive(Clone, Debug)]
pub struct FrequencyTable {
    // cumulative[i] = sum of frequencies of symbols [0, i). cumulative.len() == n + 1.
    cumulative: SmallVec<[u32; 16]>,
}

impl FrequencyTable {
    /// Builds a table from per-symbol frequencies. Every frequency must be `>= 1`, and the total
    /// must not exceed [`MAX_TOTAL`].
    pub fn new(frequencies: &[u32]) -> Result<Self> {
        if frequencies.is_empty() {
            return invalid_model_error("frequency table must have at least one symbol");
        }

        let mut cumulative = SmallVec::with_capacity(frequencies.len() + 1);
        cumulative.push(0u32);

        let mut total: u64 = 0;
        for &f in frequencies {
            if f == 0 {
                return invalid_model_error("frequency table entries must be at least 1");
            }
            total += u64::from(f);
            if total > u64::from(MAX_TOTAL) {
                return invalid_model_error("frequency table total exceeds 2^30");
            }
            cumulative.push(total as u32);
        }

        Ok(FrequencyTable { cumulative })
    }

    /// Builds a table directly from precomputed cumulative sums (`cumulative[0] == 0`,
    /// monotonically increasing, `cumulative.len() == n + 1`). Used by model builders that
    /// maintain running cumulative sums themselves (e.g. the English context tables).
    pub(crate) fn from_cumulative(cumulative: SmallVec<[u32; 16]>) -> Result<Self> {
        if cumulative.len() < 2 {
            return invalid_model_error("frequency table must have at least one symbol");
        }
        if *cumulative.last().unwrap() > MAX_TOTAL {
            return invalid_model_error("frequency table total exceeds 2^30");
        }
        for w in cumulative.windows(2) {
            if w[1] <= w[0] {
                return invalid_model_error("frequency table entries must be at least 1");
            }
        }
        Ok(FrequencyTable { cumulative })
    }
}

impl Model for FrequencyTable {
    #[inline(always)]
    fn symbol_count(&self) -> usize {
        self.cumulative.len() - 1
    }

    #[inline(always)]
    fn total(&self) -> u32 {
        *self.cumulative.last().unwrap()
    }

    #[inline(always)]
    fn range(&self, symbol: usize) -> Range {
        assert!(symbol < self.symbol_count(), "symbol out of range for frequency table");
        Range { lo: self.cumulative[symbol], hi: self.cumulative[symbol + 1] }
    }

    fn find(&self, cf: u32) -> usize {
        assert!(cf < self.total(), "cumulative frequency out of range for frequency table");

        // Binary search for the largest i with cumulative[i] <= cf.
        let mut lo = 0usize;
        let mut hi = self.cumulative.len() - 1;

        while lo + 1 < hi {
            let mid = lo + (hi - lo) / 2;
            if self.cumulative[mid] <= cf {
                lo = mid;
            }
            else {
                hi = mid;
            }
        }

        lo
    }
}
