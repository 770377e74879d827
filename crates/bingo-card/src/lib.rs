//! # bingo-card
//!
//! Card generation and win evaluation for 75-ball bingo.
//!
//! Everything here is pure and synchronous. Randomness is always passed in,
//! so callers (and tests) control seeding.

pub mod card;
mod error;
pub mod pattern;

pub use card::{
    CARD_CELLS, COLUMN_LETTERS, Card, CardCell, CardPool, CardPreview, Cell, FREE_INDEX,
    GRID_SIZE, MAX_NUMBER, column_band, generate_card, generate_pool, letter_for,
};
pub use error::CardError;
pub use pattern::{MarkedCells, Pattern, WinningPattern, evaluate, has_any_win, winning_patterns};
