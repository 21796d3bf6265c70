//! Braille symbol table: cell masks to letters, digits, punctuation and
//! the two shift codes.
//!
//! The table is a plain value built once and passed by reference. Entries
//! are written as Braille dot numbers and packed with [`CellMask::from_dots`],
//! so the bit order is fixed in a single place.

use crate::models::CellMask;

/// Capital sign: dot 6
pub const CAPITAL_SIGN: CellMask = CellMask::from_dots(&[6]);
/// Number sign: dots 3-4-5-6
pub const NUMBER_SIGN: CellMask = CellMask::from_dots(&[3, 4, 5, 6]);

/// Meaning of a cell mask, independent of assembler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// Lowercase Latin letter
    Letter(char),
    /// Punctuation mark
    Punctuation(char),
    /// Capitalizes the next printable symbol
    Capital,
    /// Switches to number mode
    Number,
    /// No table entry
    Unknown,
}

const LETTERS: [(char, &[u8]); 26] = [
    ('a', &[1]),
    ('b', &[1, 2]),
    ('c', &[1, 4]),
    ('d', &[1, 4, 5]),
    ('e', &[1, 5]),
    ('f', &[1, 2, 4]),
    ('g', &[1, 2, 4, 5]),
    ('h', &[1, 2, 5]),
    ('i', &[2, 4]),
    ('j', &[2, 4, 5]),
    ('k', &[1, 3]),
    ('l', &[1, 2, 3]),
    ('m', &[1, 3, 4]),
    ('n', &[1, 3, 4, 5]),
    ('o', &[1, 3, 5]),
    ('p', &[1, 2, 3, 4]),
    ('q', &[1, 2, 3, 4, 5]),
    ('r', &[1, 2, 3, 5]),
    ('s', &[2, 3, 4]),
    ('t', &[2, 3, 4, 5]),
    ('u', &[1, 3, 6]),
    ('v', &[1, 2, 3, 6]),
    ('w', &[2, 4, 5, 6]),
    ('x', &[1, 3, 4, 6]),
    ('y', &[1, 3, 4, 5, 6]),
    ('z', &[1, 3, 5, 6]),
];

// Digits reuse the cells of a..j.
const DIGITS: [(char, char); 10] = [
    ('1', 'a'),
    ('2', 'b'),
    ('3', 'c'),
    ('4', 'd'),
    ('5', 'e'),
    ('6', 'f'),
    ('7', 'g'),
    ('8', 'h'),
    ('9', 'i'),
    ('0', 'j'),
];

const PUNCTUATION: [(char, &[u8]); 8] = [
    (',', &[2]),
    (';', &[2, 3]),
    (':', &[2, 5]),
    ('.', &[2, 5, 6]),
    ('!', &[2, 3, 5]),
    ('?', &[2, 3, 6]),
    ('\'', &[3]),
    ('-', &[3, 6]),
];

/// Immutable mask lookup table
#[derive(Debug, Clone)]
pub struct SymbolTable {
    by_mask: [Symbol; 64],
    digits: [Option<char>; 64],
    // Table order, used for deterministic nearest-code search.
    entries: Vec<(CellMask, Symbol)>,
}

impl SymbolTable {
    /// Letters a-z, digits, common punctuation, capital and number signs
    pub fn standard() -> Self {
        let mut entries: Vec<(CellMask, Symbol)> = LETTERS
            .iter()
            .map(|&(c, dots)| (CellMask::from_dots(dots), Symbol::Letter(c)))
            .collect();
        entries.extend(
            PUNCTUATION
                .iter()
                .map(|&(c, dots)| (CellMask::from_dots(dots), Symbol::Punctuation(c))),
        );
        entries.push((CAPITAL_SIGN, Symbol::Capital));
        entries.push((NUMBER_SIGN, Symbol::Number));

        let digits = DIGITS.iter().filter_map(|&(digit, letter)| {
            LETTERS
                .iter()
                .find(|(c, _)| *c == letter)
                .map(|(_, dots)| (CellMask::from_dots(dots), digit))
        });
        Self::from_entries(entries, digits)
    }

    /// Build a table from explicit entries. Later duplicates of a mask are ignored.
    pub fn from_entries<I, D>(entries: I, digits: D) -> Self
    where
        I: IntoIterator<Item = (CellMask, Symbol)>,
        D: IntoIterator<Item = (CellMask, char)>,
    {
        let mut by_mask = [Symbol::Unknown; 64];
        let mut kept = Vec::new();
        for (mask, symbol) in entries {
            if symbol == Symbol::Unknown || by_mask[mask.bits() as usize] != Symbol::Unknown {
                continue;
            }
            by_mask[mask.bits() as usize] = symbol;
            kept.push((mask, symbol));
        }
        let mut digit_table = [None; 64];
        for (mask, digit) in digits {
            digit_table[mask.bits() as usize].get_or_insert(digit);
        }
        Self {
            by_mask,
            digits: digit_table,
            entries: kept,
        }
    }

    /// Context-free meaning of `mask`
    pub fn classify(&self, mask: CellMask) -> Symbol {
        self.by_mask[mask.bits() as usize]
    }

    /// Digit read from `mask` while number mode is active
    pub fn digit(&self, mask: CellMask) -> Option<char> {
        self.digits[mask.bits() as usize]
    }

    /// Whether `mask` has a table entry (letter, punctuation or shift code)
    pub fn is_known(&self, mask: CellMask) -> bool {
        self.classify(mask) != Symbol::Unknown
    }

    /// Mask for a printable character; uppercase maps to its lowercase cell
    pub fn mask_for(&self, c: char) -> Option<CellMask> {
        if c.is_ascii_digit() {
            return (0..64u8)
                .map(CellMask::from_bits)
                .find(|&m| self.digit(m) == Some(c));
        }
        let lower = c.to_ascii_lowercase();
        self.entries.iter().find_map(|&(mask, symbol)| match symbol {
            Symbol::Letter(l) | Symbol::Punctuation(l) if l == lower => Some(mask),
            _ => None,
        })
    }

    /// Table entries in table order
    pub fn entries(&self) -> impl Iterator<Item = (CellMask, Symbol)> + '_ {
        self.entries.iter().copied()
    }

    /// Closest table entry by Hamming distance, if within `max_distance`.
    ///
    /// Ties keep the entry that comes first in table order.
    pub fn nearest_known(&self, mask: CellMask, max_distance: u32) -> Option<(CellMask, u32)> {
        let mut best: Option<(CellMask, u32)> = None;
        for &(candidate, _) in &self.entries {
            let d = mask.hamming(candidate);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((candidate, d));
            }
        }
        best.filter(|&(_, d)| d <= max_distance)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::standard()
    }
}
