//! Text assembly from chosen cell masks.
//!
//! Shift codes are modal: the capital sign uppercases the next printable
//! symbol, the number sign makes a..j read as digits until something else
//! is printed. A wide horizontal gap or the end of a row is a word break
//! and resets both.

use super::config::{AssemblyConfig, UnknownPolicy};
use super::symbols::{Symbol, SymbolTable};
use crate::models::{CellBBox, CellMask};

/// Modal state carried across the cells of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextState {
    /// Digits are read instead of the letters a..j
    pub number_mode: bool,
    /// Next printable symbol is uppercased
    pub capitalize_next: bool,
}

impl TextState {
    /// Back to lowercase letters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A cell as seen by the assembler: its chosen mask and horizontal extent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellToken {
    /// Chosen mask; `None` when the cell yielded nothing
    pub mask: Option<CellMask>,
    /// Left edge of the grid frame
    pub left: f32,
    /// Right edge of the grid frame
    pub right: f32,
    /// Frame width
    pub width: f32,
}

impl CellToken {
    /// Token for a cell with the given frame
    pub fn new(mask: Option<CellMask>, frame: &CellBBox) -> Self {
        Self {
            mask,
            left: frame.left,
            right: frame.right,
            width: frame.width(),
        }
    }
}

/// Turns rows of cell tokens into text
#[derive(Debug, Clone, Copy)]
pub struct TextAssembler<'a> {
    table: &'a SymbolTable,
    spacing_factor: f32,
    unknown: UnknownPolicy,
}

impl<'a> TextAssembler<'a> {
    /// Assembler over `table` with the configured spacing and unknown policy
    pub fn new(table: &'a SymbolTable, config: &AssemblyConfig) -> Self {
        Self {
            table,
            spacing_factor: config.spacing_factor,
            unknown: config.unknown,
        }
    }

    /// Feed one mask through the state machine, returning what it prints
    pub fn step(&self, state: &mut TextState, mask: Option<CellMask>) -> Option<char> {
        let mask = mask?;
        match self.table.classify(mask) {
            Symbol::Capital => {
                state.capitalize_next = true;
                None
            }
            Symbol::Number => {
                state.number_mode = true;
                None
            }
            symbol => {
                if state.number_mode {
                    if let Some(digit) = self.table.digit(mask) {
                        state.capitalize_next = false;
                        return Some(digit);
                    }
                }
                state.number_mode = false;
                match symbol {
                    Symbol::Letter(c) => {
                        let upper = std::mem::take(&mut state.capitalize_next);
                        Some(if upper { c.to_ascii_uppercase() } else { c })
                    }
                    Symbol::Punctuation(c) => {
                        state.capitalize_next = false;
                        Some(c)
                    }
                    _ => match self.unknown {
                        UnknownPolicy::Placeholder(c) => Some(c),
                        UnknownPolicy::Skip => None,
                    },
                }
            }
        }
    }

    /// Assemble one row, including its trailing space
    pub fn assemble_row(&self, tokens: &[CellToken], out: &mut String) {
        let mut state = TextState::default();
        let mut previous: Option<&CellToken> = None;
        for token in tokens {
            if let Some(prev) = previous {
                if token.left - prev.right > self.spacing_factor * token.width {
                    out.push(' ');
                    state.reset();
                }
            }
            if let Some(c) = self.step(&mut state, token.mask) {
                out.push(c);
            }
            previous = Some(token);
        }
        out.push(' ');
    }

    /// Assemble all rows of a frame into one line
    pub fn assemble(&self, rows: &[Vec<CellToken>]) -> String {
        let mut out = String::new();
        for row in rows {
            self.assemble_row(row, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::symbols::{CAPITAL_SIGN, NUMBER_SIGN};

    fn run(table: &SymbolTable, masks: &[CellMask]) -> String {
        let assembler = TextAssembler::new(table, &AssemblyConfig::default());
        let mut state = TextState::default();
        masks
            .iter()
            .filter_map(|&m| assembler.step(&mut state, Some(m)))
            .collect()
    }

    fn m(table: &SymbolTable, c: char) -> CellMask {
        table.mask_for(c).unwrap()
    }

    #[test]
    fn test_capital_affects_next_printable_only() {
        let t = SymbolTable::standard();
        assert_eq!(run(&t, &[CAPITAL_SIGN, m(&t, 'a')]), "A");
        assert_eq!(run(&t, &[CAPITAL_SIGN, CAPITAL_SIGN, m(&t, 'a')]), "A");
        assert_eq!(run(&t, &[CAPITAL_SIGN, m(&t, 'a'), m(&t, 'b')]), "Ab");
        // Punctuation consumes the pending capital.
        assert_eq!(run(&t, &[CAPITAL_SIGN, m(&t, ','), m(&t, 'b')]), ",b");
    }

    #[test]
    fn test_number_mode_persists_over_digits() {
        let t = SymbolTable::standard();
        let seq = [NUMBER_SIGN, m(&t, '1'), m(&t, '2'), m(&t, 'k')];
        assert_eq!(run(&t, &seq), "12k");
        // a..j stay digits while number mode holds.
        let seq = [NUMBER_SIGN, m(&t, '1'), m(&t, '2'), m(&t, 'a')];
        assert_eq!(run(&t, &seq), "121");
        // A letter outside a..j ends the number; a..j read as letters again.
        let seq = [NUMBER_SIGN, m(&t, '4'), m(&t, 'k'), m(&t, 'a')];
        assert_eq!(run(&t, &seq), "4ka");
    }

    #[test]
    fn test_punctuation_and_unknown_clear_number_mode() {
        let t = SymbolTable::standard();
        let seq = [NUMBER_SIGN, m(&t, '3'), m(&t, '.'), m(&t, 'c')];
        assert_eq!(run(&t, &seq), "3.c");

        let unknown = CellMask::from_dots(&[4]);
        assert!(!t.is_known(unknown));
        let seq = [NUMBER_SIGN, m(&t, '3'), unknown, m(&t, 'c')];
        assert_eq!(run(&t, &seq), "3?c");

        let skip = TextAssembler::new(
            &t,
            &AssemblyConfig {
                unknown: UnknownPolicy::Skip,
                ..AssemblyConfig::default()
            },
        );
        let mut state = TextState {
            number_mode: true,
            capitalize_next: true,
        };
        assert_eq!(skip.step(&mut state, Some(unknown)), None);
        assert!(!state.number_mode);
        // An unknown cell does not use up the capital.
        assert!(state.capitalize_next);
    }

    #[test]
    fn test_missing_mask_prints_nothing() {
        let t = SymbolTable::standard();
        let assembler = TextAssembler::new(&t, &AssemblyConfig::default());
        let mut state = TextState {
            number_mode: true,
            capitalize_next: false,
        };
        assert_eq!(assembler.step(&mut state, None), None);
        assert!(state.number_mode);
    }

    fn token(mask: CellMask, left: f32) -> CellToken {
        CellToken {
            mask: Some(mask),
            left,
            right: left + 10.0,
            width: 10.0,
        }
    }

    #[test]
    fn test_spacing_threshold() {
        let t = SymbolTable::standard();
        let assembler = TextAssembler::new(&t, &AssemblyConfig::default());

        // Gap 23 > 2.2 * 10
        let mut out = String::new();
        assembler.assemble_row(&[token(m(&t, 'a'), 0.0), token(m(&t, 'b'), 33.0)], &mut out);
        assert_eq!(out, "a b ");

        // Gap 21 < 22
        let mut out = String::new();
        assembler.assemble_row(&[token(m(&t, 'a'), 0.0), token(m(&t, 'b'), 31.0)], &mut out);
        assert_eq!(out, "ab ");
    }

    #[test]
    fn test_space_resets_modes() {
        let t = SymbolTable::standard();
        let assembler = TextAssembler::new(&t, &AssemblyConfig::default());
        let row = [
            token(NUMBER_SIGN, 0.0),
            token(m(&t, '1'), 15.0),
            token(m(&t, '2'), 30.0),
            token(m(&t, 'b'), 80.0),
        ];
        let mut out = String::new();
        assembler.assemble_row(&row, &mut out);
        assert_eq!(out, "12 b ");

        // A capital sign opening a word still gets its space.
        let row = [
            token(m(&t, 'a'), 0.0),
            token(CAPITAL_SIGN, 50.0),
            token(m(&t, 'b'), 65.0),
        ];
        let mut out = String::new();
        assembler.assemble_row(&row, &mut out);
        assert_eq!(out, "a B ");
    }

    #[test]
    fn test_rows_end_with_space_and_reset() {
        let t = SymbolTable::standard();
        let assembler = TextAssembler::new(&t, &AssemblyConfig::default());
        let rows = vec![
            vec![token(CAPITAL_SIGN, 0.0)],
            vec![token(m(&t, 'a'), 0.0)],
            vec![token(NUMBER_SIGN, 0.0)],
            vec![token(m(&t, 'b'), 0.0)],
        ];
        assert_eq!(assembler.assemble(&rows), " a  b ");
    }
}
