//! Error types for card construction and pool generation.

/// Errors that can occur while building cards or card pools.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    /// A number does not belong to the band of the column it was placed in.
    #[error("number {number} at cell {index} is outside its column band")]
    OutOfBand { index: usize, number: u8 },

    /// The same number appears twice on one card.
    #[error("number {0} appears more than once on the card")]
    DuplicateNumber(u8),

    /// The retry budget ran out before enough distinct cards were found.
    #[error("card pool exhausted: wanted {requested} distinct cards, produced {generated}")]
    GenerationExhausted { requested: usize, generated: usize },
}
