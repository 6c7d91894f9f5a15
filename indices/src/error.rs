use thiserror::Error;

/// Errors raised when inputs are rejected at the boundary of the calculation.
///
/// The dynamic programs themselves never fail. Everything here is checked
/// before they run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicesError {
    #[error("card distribution of count bucket {bucket} sums to {sum}, expected 1")]
    UnnormalizedDistribution { bucket: i32, sum: f64 },

    #[error("card distribution of count bucket {bucket} has probability {probability} for rank {rank}")]
    InvalidProbability {
        bucket: i32,
        rank: u8,
        probability: f64,
    },

    #[error("count bucket {bucket} is outside the configured range [{min}, {max}]")]
    CountOutOfRange { bucket: i32, min: i32, max: i32 },

    #[error("count range [{min}, {max}] is empty")]
    EmptyCountRange { min: i32, max: i32 },

    #[error("dealer table covers count range [{dealer_min}, {dealer_max}] but card table covers [{card_min}, {card_max}]")]
    MismatchedCountRange {
        dealer_min: i32,
        dealer_max: i32,
        card_min: i32,
        card_max: i32,
    },

    #[error("expected {expected} card distributions, got {actual}")]
    DistributionLength { expected: usize, actual: usize },

    #[error("hand length {cards_held} is outside [{min}, {max}]")]
    HandLengthOutOfRange { cards_held: u8, min: u8, max: u8 },

    #[error("invalid card rank {0}, expected 1..=10")]
    InvalidRank(u8),

    #[error("invalid hand state: total {total}, soft {is_soft}")]
    InvalidHandState { total: u8, is_soft: bool },

    #[error("invalid rule: {0}")]
    InvalidRule(String),
}

pub(crate) fn check_rank(rank: u8) -> Result<(), IndicesError> {
    if (1..=10).contains(&rank) {
        Ok(())
    } else {
        Err(IndicesError::InvalidRank(rank))
    }
}
