// Structpress
// Copyright (c) 2026 The Structpress Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The three "static" English character models: order-0 (a fixed per-character frequency table),
//! order-1 (previous character -> table), and order-2 (previous two characters -> table). All
//! three share one alphabet: the ASCII letters ordered roughly by English frequency, digits,
//! common punctuation and whitespace, with a sentinel "other" symbol occupying the last index for
//! any code point outside the table.
//!
//! These tables are process-lifetime immutable data, so they are built once behind
//! [`once_cell::sync::Lazy`], deferring expensive, read-only static construction until first use.

use hashbrown::HashMap;
use once_cell::sync::Lazy;

use crate::model::{CharContext, FrequencyTable, Model, Range};

/// The fixed character alphabet, ordered roughly by English text frequency: lowercase letters,
/// uppercase letters, digits, then common punctuation and whitespace. Index into this array with
/// a symbol `< ALPHABET.len()`; [`OTHER_SYMBOL`] is one past the end of it.
pub const ALPHABET: &[char] = &[
    // Lowercase letters, most to least frequent in English prose.
    ' ', 'e', 't', 'a', 'o', 'i', 'n', 's', 'h', 'r', 'd', 'l', 'c', 'u', 'm', 'w', 'f', 'g', 'y',
    'p', 'b', 'v', 'k', 'j', 'x', 'q', 'z',
    // Uppercase letters, same relative order (start-of-sentence / proper-noun capitals).
    'E', 'T', 'A', 'O', 'I', 'N', 'S', 'H', 'R', 'D', 'L', 'C', 'U', 'M', 'W', 'F', 'G', 'Y', 'P',
    'B', 'V', 'K', 'J', 'X', 'Q', 'Z',
    // Digits.
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    // Common punctuation and whitespace.
    '.', ',', '\n', '\'', '"', '-', '!', '?', ':', ';', '(', ')', '\t', '/', '_', '@', '#', '$',
    '%', '&', '*', '+', '=', '<', '>', '[', ']', '{', '}', '|', '\\', '~', '`', '^',
];

/// The sentinel symbol for a code point not present in [`ALPHABET`]. Always `ALPHABET.len()`.
pub const OTHER_SYMBOL: usize = ALPHABET.len();

/// Total alphabet size including the "other" sentinel.
const N: usize = ALPHABET.len() + 1;

fn base_frequency(index: usize) -> u32 {
    // A smoothly decaying frequency curve favouring the front of ALPHABET (most common
    // characters), with a floor so no in-table symbol is ever starved. The "other" sentinel gets
    // a small, fixed mass: it is rare in well-formed English prose.
    if index == OTHER_SYMBOL {
        4
    }
    else {
        let decay = (ALPHABET.len() as u32).saturating_sub(index as u32 / 2);
        20 + decay
    }
}

static ORDER0_TABLE: Lazy<FrequencyTable> = Lazy::new(|| {
    let freqs: Vec<u32> = (0..N).map(base_frequency).collect();
    FrequencyTable::new(&freqs).expect("static order-0 table must be well-formed")
});

fn symbol_of(c: char) -> usize {
    ALPHABET.iter().position(|&a| a == c).unwrap_or(OTHER_SYMBOL)
}

/// A small, hand-picked set of frequency biases applied on top of the order-0 floor for a given
/// preceding symbol, modelling a handful of common English digraphs (e.g. 'q' is almost always
/// followed by 'u'; 't' is very often followed by 'h').
fn order1_biases(prev: char) -> &'static [(char, u32)] {
    match prev {
        'q' | 'Q' => &[('u', 400), ('U', 100)],
        't' => &[('h', 200), ('e', 120), ('o', 80), (' ', 60)],
        'T' => &[('h', 200), ('e', 80)],
        'h' => &[('e', 180), (' ', 90), ('a', 60)],
        ' ' => &[('t', 140), ('a', 120), ('o', 100), ('i', 80), ('s', 70), ('w', 60)],
        'a' => &[('n', 120), ('t', 100), ('r', 80), ('l', 70), ('s', 60)],
        'e' => &[(' ', 140), ('r', 100), ('n', 90), ('d', 80), ('s', 70)],
        'i' => &[('n', 140), ('s', 90), ('o', 70), ('t', 60)],
        'o' => &[('n', 130), ('u', 100), ('r', 90), ('f', 70), (' ', 60)],
        'n' => &[(' ', 130), ('d', 110), ('g', 90), ('t', 70)],
        'r' => &[('e', 120), (' ', 100), ('o', 70), ('i', 60)],
        's' => &[(' ', 120), ('t', 100), ('h', 60), ('i', 50)],
        '.' | '!' | '?' => &[(' ', 400), ('\n', 120)],
        ',' => &[(' ', 400)],
        _ => &[],
    }
}

fn build_context_table(prev: char) -> FrequencyTable {
    const FLOOR: u32 = 10;
    let mut freqs = vec![FLOOR; N];
    freqs[OTHER_SYMBOL] = 4;

    for &(c, bias) in order1_biases(prev) {
        freqs[symbol_of(c)] += bias;
    }

    FrequencyTable::new(&freqs).expect("static order-1 context table must be well-formed")
}

/// The two dozen most common preceding characters get a hand-tuned context table; anything else
/// falls back to the order-0 default.
const CONTEXT_CHARS: &[char] = &[
    ' ', 'e', 't', 'a', 'o', 'i', 'n', 's', 'h', 'r', 'd', 'l', 'c', 'u', 'q', 'Q', 'T', '.', ',',
    '!', '?',
];

static ORDER1_TABLES: Lazy<HashMap<usize, FrequencyTable>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for &c in CONTEXT_CHARS {
        map.insert(symbol_of(c), build_context_table(c));
    }
    map
});

/// The order-0 English character model: one fixed frequency table shared by every position in the
/// text, independent of context.
#[derive(Copy, Clone, Debug, Default)]
pub struct EnglishOrder0;

impl EnglishOrder0 {
    /// Maps a decoded code point to its symbol, or [`OTHER_SYMBOL`] if it is not in [`ALPHABET`].
    pub fn symbol_for(c: char) -> usize {
        symbol_of(c)
    }

    /// Maps a symbol back to its code point. Panics for [`OTHER_SYMBOL`], which carries no
    /// intrinsic code point (the caller must have decoded one via the "other" escape path).
    pub fn char_for(symbol: usize) -> char {
        ALPHABET[symbol]
    }
}

impl Model for EnglishOrder0 {
    fn symbol_count(&self) -> usize {
        ORDER0_TABLE.symbol_count()
    }

    fn total(&self) -> u32 {
        ORDER0_TABLE.total()
    }

    fn range(&self, symbol: usize) -> Range {
        ORDER0_TABLE.range(symbol)
    }

    fn find(&self, cf: u32) -> usize {
        ORDER0_TABLE.find(cf)
    }
}

impl CharContext for EnglishOrder0 {
    fn advance(&mut self, _symbol: usize) {
        // Stateless: order-0 never varies by context.
    }
}

/// The order-1 English context model: the table selected for the symbol most recently emitted or
/// decoded, falling back to the order-0 default for any preceding symbol without a dedicated
/// table.
#[derive(Copy, Clone, Debug)]
pub struct EnglishOrder1 {
    prev: usize,
}

impl EnglishOrder1 {
    /// Creates a context model with no preceding symbol (as at the start of a string); behaves
    /// identically to [`EnglishOrder0`] until [`Self::advance`] is called.
    pub fn new() -> Self {
        EnglishOrder1 { prev: OTHER_SYMBOL }
    }

    /// Advances the context by recording `symbol` as the new "previous" symbol. This happens
    /// unconditionally, even along the "other" escape path.
    pub fn advance(&mut self, symbol: usize) {
        self.prev = symbol;
    }

    fn active(&self) -> &'static FrequencyTable {
        ORDER1_TABLES.get(&self.prev).unwrap_or(&ORDER0_TABLE)
    }
}

impl Default for EnglishOrder1 {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for EnglishOrder1 {
    fn symbol_count(&self) -> usize {
        self.active().symbol_count()
    }

    fn total(&self) -> u32 {
        self.active().total()
    }

    fn range(&self, symbol: usize) -> Range {
        self.active().range(symbol)
    }

    fn find(&self, cf: u32) -> usize {
        self.active().find(cf)
    }
}

impl CharContext for EnglishOrder1 {
    fn advance(&mut self, symbol: usize) {
        EnglishOrder1::advance(self, symbol)
    }
}

/// The order-2 English context model: keyed by the previous two symbols, falling back to
/// [`EnglishOrder1`] (which itself falls back to [`EnglishOrder0`]) when no dedicated table has
/// been built for that pair.
///
/// To keep the static table small, only digraphs whose *second* character is one of
/// [`CONTEXT_CHARS`] get a dedicated order-2 table; all others fall back to order-1.
pub struct EnglishOrder2 {
    prev1: EnglishOrder1,
    prev2: usize,
    tables: &'static Lazy<HashMap<(usize, usize), FrequencyTable>>,
}

static ORDER2_TABLES: Lazy<HashMap<(usize, usize), FrequencyTable>> = Lazy::new(|| {
    // A handful of trigraph biases layered on top of the order-1 table for the more common
    // digraphs, e.g. "th" is very often followed by 'e', "qu" by a vowel.
    let mut map = HashMap::new();
    let digraphs: &[(char, char, &[(char, u32)])] = &[
        ('t', 'h', &[('e', 250), (' ', 80)]),
        ('q', 'u', &[('e', 150), ('i', 120), ('a', 100), ('o', 80)]),
        ('i', 'n', &[('g', 200), (' ', 100)]),
        ('a', 'n', &[('d', 200), (' ', 90)]),
        ('e', 'r', &[(' ', 150), ('s', 90)]),
    ];

    for &(a, b, biases) in digraphs {
        let mut freqs = vec![10u32; N];
        freqs[OTHER_SYMBOL] = 4;
        for &(c, bias) in biases {
            freqs[symbol_of(c)] += bias;
        }
        map.insert(
            (symbol_of(a), symbol_of(b)),
            FrequencyTable::new(&freqs).expect("static order-2 table must be well-formed"),
        );
    }

    map
});

impl EnglishOrder2 {
    pub fn new() -> Self {
        EnglishOrder2 { prev1: EnglishOrder1::new(), prev2: OTHER_SYMBOL, tables: &ORDER2_TABLES }
    }

    /// Advances the context, recording `symbol` as the new most-recent symbol (and demoting the
    /// previous "most recent" to "second most recent"). Happens unconditionally, even along the
    /// "other" escape path.
    pub fn advance(&mut self, symbol: usize) {
        self.prev2 = self.prev1.prev;
        self.prev1.advance(symbol);
    }

    fn active(&self) -> &dyn Model {
        match self.tables.get(&(self.prev2, self.prev1.prev)) {
            Some(t) => t,
            None => &self.prev1,
        }
    }
}

impl Default for EnglishOrder2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for EnglishOrder2 {
    fn symbol_count(&self) -> usize {
        self.active().symbol_count()
    }

    fn total(&self) -> u32 {
        self.active().total()
    }

    fn range(&self, symbol: usize) -> Range {
        self.active().range(symbol)
    }

    fn find(&self, cf: u32) -> usize {
        self.active().find(cf)
    }
}

impl CharContext for EnglishOrder2 {
    fn advance(&mut self, symbol: usize) {
        EnglishOrder2::advance(self, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::assert_model_consistent;

    #[test]
    fn order0_is_consistent() {
        assert_model_consistent(&EnglishOrder0);
    }

    #[test]
    fn order1_is_consistent_for_every_context() {
        for symbol in 0..N {
            let mut m = EnglishOrder1::new();
            m.advance(symbol);
            assert_model_consistent(&m);
        }
    }

    #[test]
    fn order2_is_consistent_for_sampled_contexts() {
        for a in [0usize, 1, 2, OTHER_SYMBOL] {
            for b in [0usize, symbol_of('h'), symbol_of('u')] {
                let mut m = EnglishOrder2::new();
                m.advance(a);
                m.advance(b);
                assert_model_consistent(&m);
            }
        }
    }

    #[test]
    fn other_symbol_is_last_index() {
        assert_eq!(OTHER_SYMBOL, ALPHABET.len());
        assert_eq!(EnglishOrder0.symbol_count(), ALPHABET.len() + 1);
    }

    #[test]
    fn symbol_and_char_roundtrip_for_in_table_chars() {
        for (i, &c) in ALPHABET.iter().enumerate() {
            assert_eq!(EnglishOrder0::symbol_for(c), i);
            assert_eq!(EnglishOrder0::char_for(i), c);
        }
    }

    #[test]
    fn out_of_table_char_maps_to_other() {
        assert_eq!(EnglishOrder0::symbol_for('€'), OTHER_SYMBOL);
    }
}
