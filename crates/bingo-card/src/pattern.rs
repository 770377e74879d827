//! Win-pattern evaluation over a set of marked cells.
//!
//! A card wins when the marked cells (FREE always included) cover any of:
//! a full row, a full column, *both* diagonals at once, or the four corners.
//! A single diagonal on its own is not a win.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::card::{CARD_CELLS, FREE_INDEX, GRID_SIZE};

/// A named set of cells that can complete a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "kebab-case")]
pub enum Pattern {
    Row(u8),
    Column(u8),
    /// Top-left to bottom-right.
    DiagonalMain,
    /// Top-right to bottom-left.
    DiagonalAnti,
    FourCorners,
}

impl Pattern {
    /// Every pattern on the card.
    pub fn all() -> impl Iterator<Item = Pattern> {
        let rows = (0..GRID_SIZE as u8).map(Pattern::Row);
        let cols = (0..GRID_SIZE as u8).map(Pattern::Column);
        rows.chain(cols).chain([
            Pattern::DiagonalMain,
            Pattern::DiagonalAnti,
            Pattern::FourCorners,
        ])
    }

    /// The cell indices this pattern covers, ascending.
    pub fn cells(self) -> Vec<usize> {
        match self {
            Pattern::Row(r) => {
                let start = usize::from(r) * GRID_SIZE;
                (start..start + GRID_SIZE).collect()
            }
            Pattern::Column(c) => (0..GRID_SIZE).map(|r| r * GRID_SIZE + usize::from(c)).collect(),
            Pattern::DiagonalMain => (0..GRID_SIZE).map(|i| i * GRID_SIZE + i).collect(),
            Pattern::DiagonalAnti => (0..GRID_SIZE)
                .map(|i| i * GRID_SIZE + (GRID_SIZE - 1 - i))
                .collect(),
            Pattern::FourCorners => vec![0, GRID_SIZE - 1, CARD_CELLS - GRID_SIZE, CARD_CELLS - 1],
        }
    }

    fn mask(self) -> u32 {
        self.cells().into_iter().fold(0, |m, i| m | (1 << i))
    }
}

/// The marks a player has placed on their card.
///
/// Stored as a 25-bit set. The FREE cell is always present, so a fresh set
/// has length 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkedCells(u32);

impl MarkedCells {
    pub fn new() -> Self {
        Self(1 << FREE_INDEX)
    }

    /// Builds a set from cell indices. Out-of-range indices are dropped.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new();
        for i in indices {
            set.insert(i);
        }
        set
    }

    /// Marks `index`. Returns `false` when it was already marked or is not
    /// a card cell.
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= CARD_CELLS || self.contains(index) {
            return false;
        }
        self.0 |= 1 << index;
        true
    }

    pub fn contains(&self, index: usize) -> bool {
        index < CARD_CELLS && self.0 & (1 << index) != 0
    }

    /// Number of marked cells, FREE included.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Never true: FREE is always marked.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..CARD_CELLS).filter(|&i| self.contains(i))
    }

    fn covers(&self, pattern: Pattern) -> bool {
        let mask = pattern.mask();
        self.0 & mask == mask
    }
}

impl Default for MarkedCells {
    fn default() -> Self {
        Self::new()
    }
}

/// Every fully covered pattern, including a lone diagonal.
///
/// Use [`has_any_win`] or [`winning_patterns`] to decide whether the card
/// actually wins.
pub fn evaluate(marked: &MarkedCells) -> BTreeSet<Pattern> {
    Pattern::all().filter(|p| marked.covers(*p)).collect()
}

/// The winning patterns the marks complete, in evaluation order.
///
/// The two diagonals only count together: when both are covered they are
/// reported as a pair.
pub fn winning_patterns(marked: &MarkedCells) -> Vec<Pattern> {
    let covered = evaluate(marked);
    let both_diagonals =
        covered.contains(&Pattern::DiagonalMain) && covered.contains(&Pattern::DiagonalAnti);

    covered
        .into_iter()
        .filter(|p| match p {
            Pattern::DiagonalMain | Pattern::DiagonalAnti => both_diagonals,
            _ => true,
        })
        .collect()
}

/// Whether the marks form at least one winning configuration.
pub fn has_any_win(marked: &MarkedCells) -> bool {
    !winning_patterns(marked).is_empty()
}

/// A completed pattern and the cells that make it up, as shown to players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningPattern {
    pub pattern: Pattern,
    pub cells: Vec<usize>,
}

impl From<Pattern> for WinningPattern {
    fn from(pattern: Pattern) -> Self {
        Self {
            pattern,
            cells: pattern.cells(),
        }
    }
}
