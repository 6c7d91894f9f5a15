use crate::error::check_rank;
use crate::{Game, IndicesError};
use std::ops::{Index, RangeInclusive};

/// How far a distribution may drift from summing to 1 before it is rejected.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-9;

/// Probability of the next card being each rank, from ace (1) to ten (10).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardDistribution {
    probabilities: [f64; 10],
}

impl CardDistribution {
    /// Wraps raw probabilities. Nothing is checked until `validate`.
    pub fn new(probabilities: [f64; 10]) -> CardDistribution {
        CardDistribution { probabilities }
    }

    /// Scales non-negative weights so that they sum to 1.
    pub fn from_weights(weights: [f64; 10]) -> CardDistribution {
        let total: f64 = weights.iter().sum();
        let mut probabilities = weights;
        if total > 0.0 {
            for p in probabilities.iter_mut() {
                *p /= total;
            }
        }
        CardDistribution { probabilities }
    }

    pub fn from_counts(counts: &[u64; 10]) -> CardDistribution {
        let mut weights = [0.0; 10];
        for (weight, count) in weights.iter_mut().zip(counts) {
            *weight = *count as f64;
        }
        Self::from_weights(weights)
    }

    /// The composition of a full shoe of the given game.
    pub fn for_game(game: Game, number_of_decks: u32) -> CardDistribution {
        let mut counts = [0; 10];
        for (count, per_deck) in counts.iter_mut().zip(game.counts_per_deck()) {
            *count = (per_deck * number_of_decks) as u64;
        }
        Self::from_counts(&counts)
    }

    /// Every listed rank is equally likely. Repeated ranks count once per
    /// listing.
    pub fn uniform(ranks: &[u8]) -> Result<CardDistribution, IndicesError> {
        let mut counts = [0; 10];
        for rank in ranks {
            check_rank(*rank)?;
            counts[(*rank - 1) as usize] += 1;
        }
        Ok(Self::from_counts(&counts))
    }

    /// Probability of `rank`, rejecting ranks outside 1..=10.
    pub fn get(&self, rank: u8) -> Result<f64, IndicesError> {
        check_rank(rank)?;
        Ok(self[rank])
    }

    pub fn sum(&self) -> f64 {
        self.probabilities.iter().sum()
    }

    /// Rejects negative or non-finite entries and vectors that do not sum to
    /// 1. `bucket` only labels the error.
    pub fn validate(&self, bucket: i32) -> Result<(), IndicesError> {
        for (rank, probability) in (1..=10).zip(self.probabilities) {
            if !probability.is_finite() || probability < 0.0 {
                return Err(IndicesError::InvalidProbability {
                    bucket,
                    rank,
                    probability,
                });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > NORMALIZATION_TOLERANCE {
            return Err(IndicesError::UnnormalizedDistribution { bucket, sum });
        }
        Ok(())
    }
}

/// Panics on ranks outside 1..=10. See `CardDistribution::get`.
impl Index<u8> for CardDistribution {
    type Output = f64;
    fn index(&self, rank: u8) -> &Self::Output {
        &self.probabilities[(rank - 1) as usize]
    }
}

/// An inclusive range of count buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRange {
    pub min: i32,
    pub max: i32,
}

impl CountRange {
    pub fn new(min: i32, max: i32) -> Result<CountRange, IndicesError> {
        if min > max {
            return Err(IndicesError::EmptyCountRange { min, max });
        }
        Ok(CountRange { min, max })
    }

    /// `[-cap, cap]`.
    pub fn symmetric(cap: u32) -> CountRange {
        let cap = cap as i32;
        CountRange {
            min: -cap,
            max: cap,
        }
    }

    pub fn contains(&self, bucket: i32) -> bool {
        (self.min..=self.max).contains(&bucket)
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.max - self.min + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn iter(&self) -> RangeInclusive<i32> {
        self.min..=self.max
    }

    /// Position of `bucket` in tables that start at `min`.
    pub fn offset(&self, bucket: i32) -> Result<usize, IndicesError> {
        if !self.contains(bucket) {
            return Err(IndicesError::CountOutOfRange {
                bucket,
                min: self.min,
                max: self.max,
            });
        }
        Ok((bucket - self.min) as usize)
    }
}

/// One card distribution per count bucket, covering a full `CountRange`.
#[derive(Debug, Clone, PartialEq)]
pub struct CardDistributionTable {
    range: CountRange,
    distributions: Vec<CardDistribution>,
}

impl CardDistributionTable {
    /// Validates every distribution. `distributions[i]` belongs to bucket
    /// `range.min + i`.
    pub fn new(
        range: CountRange,
        distributions: Vec<CardDistribution>,
    ) -> Result<CardDistributionTable, IndicesError> {
        if distributions.len() != range.len() {
            return Err(IndicesError::DistributionLength {
                expected: range.len(),
                actual: distributions.len(),
            });
        }
        for (bucket, distribution) in range.iter().zip(&distributions) {
            distribution.validate(bucket)?;
        }
        Ok(CardDistributionTable {
            range,
            distributions,
        })
    }

    /// The same distribution in every bucket.
    pub fn flat(
        range: CountRange,
        distribution: CardDistribution,
    ) -> Result<CardDistributionTable, IndicesError> {
        Self::new(range, vec![distribution; range.len()])
    }

    pub fn range(&self) -> CountRange {
        self.range
    }

    pub fn get(&self, bucket: i32) -> Result<&CardDistribution, IndicesError> {
        let offset = self.range.offset(bucket)?;
        Ok(&self.distributions[offset])
    }

    pub fn distributions(&self) -> &[CardDistribution] {
        &self.distributions
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &CardDistribution)> {
        self.range.iter().zip(self.distributions.iter())
    }
}
