// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{invalid_model_error, Result};
use crate::model::{Model, Range, MAX_TOTAL};

/// The flat model: every symbol in `[0, n)` has equal mass 1, so `range(s) = (s, s+1)` and
/// `find(cf) = cf`.
#[derive(Copy, Clone, Debug)]
pub struct Uniform {
    n: u32,
}

impl Uniform {
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return invalid_model_error("uniform model must have at least one symbol");
        }
        if n as u32 > MAX_TOTAL {
            return invalid_model_error("uniform model alphabet exceeds the total bound");
        }
        Ok(Uniform { n: n as u32 })
    }
}

impl Model for Uniform {
    #[inline(always)]
    fn symbol_count(&self) -> usize {
        self.n as usize
    }

    #[inline(always)]
    fn total(&self) -> u32 {
        self.n
    }

    #[inline(always)]
    fn range(&self, symbol: usize) -> Range {
        assert!(symbol < self.n as usize, "symbol out of range for uniform model");
        Range { lo: symbol as u32, hi: symbol as u32 + 1 }
    }

    #[inline(always)]
    fn find(&self, cf: u32) -> usize {
        assert!(cf < self.n, "cumulative frequency out of range for uniform model");
        cf as usize
    }
}
