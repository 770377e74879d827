//! Bingo cards and card pools.
//!
//! A card is a 5×5 grid stored row-major, so cell `i` sits at row `i / 5`,
//! column `i % 5`. Column `c` only ever holds numbers from its band
//! (`15c + 1 ..= 15c + 15`), and the center cell is the FREE slot.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use rand::Rng;
use serde::{Deserialize, Serialize, Serializer};

use crate::CardError;

/// Cells per side of the grid.
pub const GRID_SIZE: usize = 5;

/// Total cells on a card.
pub const CARD_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// Index of the always-marked center cell.
pub const FREE_INDEX: usize = 12;

/// Highest number in the deck (numbers run `1..=75`).
pub const MAX_NUMBER: u8 = 75;

/// Numbers per column band.
const BAND_WIDTH: u8 = 15;

/// Column headings, left to right.
pub const COLUMN_LETTERS: [char; GRID_SIZE] = ['B', 'I', 'N', 'G', 'O'];

/// The band of numbers column `col` may hold. `col` must be below 5.
pub fn column_band(col: usize) -> RangeInclusive<u8> {
    let low = col as u8 * BAND_WIDTH + 1;
    low..=low + BAND_WIDTH - 1
}

/// The column letter a called number belongs to (`7` → `'B'`).
pub fn letter_for(number: u8) -> Option<char> {
    if number == 0 || number > MAX_NUMBER {
        return None;
    }
    COLUMN_LETTERS.get(usize::from((number - 1) / BAND_WIDTH)).copied()
}

// ---------------------------------------------------------------------------
// Cell / Card
// ---------------------------------------------------------------------------

/// One slot on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    /// The center slot. Always marked, never called.
    Free,
    /// A numbered slot.
    Number(u8),
}

/// An immutable 5×5 bingo card.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Card {
    cells: [Cell; CARD_CELLS],
}

impl Card {
    /// Builds a card from its columns (each listed top to bottom),
    /// validating bands and uniqueness.
    ///
    /// The value given for the center cell is ignored; it always becomes
    /// [`Cell::Free`].
    pub fn from_columns(columns: [[u8; GRID_SIZE]; GRID_SIZE]) -> Result<Self, CardError> {
        let mut cells = [Cell::Free; CARD_CELLS];
        let mut seen = HashSet::with_capacity(CARD_CELLS);

        for (col, values) in columns.iter().enumerate() {
            for (row, &number) in values.iter().enumerate() {
                let index = row * GRID_SIZE + col;
                if index == FREE_INDEX {
                    continue;
                }
                if !column_band(col).contains(&number) {
                    return Err(CardError::OutOfBand { index, number });
                }
                if !seen.insert(number) {
                    return Err(CardError::DuplicateNumber(number));
                }
                cells[index] = Cell::Number(number);
            }
        }

        Ok(Self { cells })
    }

    /// The cell at `index`, or `None` when out of range.
    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// The number printed at `index`. `None` for FREE or out of range.
    pub fn number_at(&self, index: usize) -> Option<u8> {
        match self.cell(index)? {
            Cell::Number(n) => Some(n),
            Cell::Free => None,
        }
    }

    /// Where `number` sits on this card, if anywhere.
    pub fn position_of(&self, number: u8) -> Option<usize> {
        self.cells.iter().position(|c| *c == Cell::Number(number))
    }

    /// Numbers of one column, top to bottom, skipping FREE.
    pub fn column(&self, col: usize) -> Vec<u8> {
        (0..GRID_SIZE)
            .filter_map(|row| self.number_at(row * GRID_SIZE + col))
            .collect()
    }

    /// All 24 numbers on the card in cell order.
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.cells.iter().filter_map(|c| match c {
            Cell::Number(n) => Some(*n),
            Cell::Free => None,
        })
    }

    /// The column-wise summary shown to every player during selection.
    pub fn preview(&self) -> CardPreview {
        CardPreview {
            b: self.column(0),
            i: self.column(1),
            n: self.column(2),
            g: self.column(3),
            o: self.column(4),
        }
    }

    /// The full layout, sent only to the card's owner.
    pub fn layout(&self) -> Vec<CardCell> {
        self.cells
            .iter()
            .enumerate()
            .map(|(index, cell)| match cell {
                Cell::Free => CardCell {
                    index,
                    number: None,
                    is_free: true,
                },
                Cell::Number(n) => CardCell {
                    index,
                    number: Some(*n),
                    is_free: false,
                },
            })
            .collect()
    }
}

/// Cards go on the wire as their full layout.
impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.layout().serialize(serializer)
    }
}

/// One cell of a card's wire layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCell {
    pub index: usize,
    pub number: Option<u8>,
    pub is_free: bool,
}

/// Column-wise card summary: `{"B": [...], "I": [...], ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPreview {
    #[serde(rename = "B")]
    pub b: Vec<u8>,
    #[serde(rename = "I")]
    pub i: Vec<u8>,
    #[serde(rename = "N")]
    pub n: Vec<u8>,
    #[serde(rename = "G")]
    pub g: Vec<u8>,
    #[serde(rename = "O")]
    pub o: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Deals one random card.
///
/// Each column gets five distinct numbers drawn uniformly from its band
/// (redrawing on duplicates), placed top to bottom; the center is then
/// overwritten with FREE.
pub fn generate_card<R: Rng + ?Sized>(rng: &mut R) -> Card {
    let mut cells = [Cell::Free; CARD_CELLS];

    for col in 0..GRID_SIZE {
        let band = column_band(col);
        let mut picked: Vec<u8> = Vec::with_capacity(GRID_SIZE);
        while picked.len() < GRID_SIZE {
            let n = rng.random_range(band.clone());
            if !picked.contains(&n) {
                picked.push(n);
            }
        }
        for (row, n) in picked.into_iter().enumerate() {
            cells[row * GRID_SIZE + col] = Cell::Number(n);
        }
    }

    cells[FREE_INDEX] = Cell::Free;
    Card { cells }
}

/// Ordered set of distinct cards offered to one room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPool {
    cards: Vec<Card>,
}

impl CardPool {
    /// The card at `index`.
    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    /// Previews for every card, in pool order.
    pub fn previews(&self) -> Vec<CardPreview> {
        self.cards.iter().map(Card::preview).collect()
    }
}

/// Deals `n` cards, no two identical cell-for-cell.
///
/// Duplicates are discarded and redrawn. The number of attempts is capped,
/// so an unreachable `n` fails with [`CardError::GenerationExhausted`]
/// instead of spinning.
pub fn generate_pool<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Result<CardPool, CardError> {
    fill_pool(n, || generate_card(rng))
}

fn fill_pool(n: usize, mut deal: impl FnMut() -> Card) -> Result<CardPool, CardError> {
    let budget = n.saturating_mul(64).saturating_add(64);
    let mut seen: HashSet<Card> = HashSet::with_capacity(n);
    let mut cards = Vec::with_capacity(n);

    for _ in 0..budget {
        if cards.len() == n {
            break;
        }
        let card = deal();
        if seen.insert(card.clone()) {
            cards.push(card);
        }
    }

    if cards.len() < n {
        return Err(CardError::GenerationExhausted {
            requested: n,
            generated: cards.len(),
        });
    }
    Ok(CardPool { cards })
}
