use crate::{ConfigError, ConfigSampler, LookupCount, Shoe};
use indices::{CardDistribution, CardDistributionTable, CountRange, Game, IndicesError};
use log::{info, warn};
use rand::Rng;
use thiserror::Error;

const PROGRESS_INTERVAL: u64 = 10_000;

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("count bucket {bucket} got no samples in {shoes} shoes")]
    EmptyBucket { bucket: i32, shoes: u64 },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Indices(#[from] IndicesError),
}

/// Estimates the next-card distribution of every count bucket by dealing
/// shuffled shoes and recording which rank follows each running count.
#[derive(Debug, Clone)]
pub struct Sampler {
    shoe: Shoe,
    count: LookupCount,
    range: CountRange,
    penetration: f64,
    buckets_per_count: f64,
    trials: u64,
    max_shoes: u64,
}

impl Sampler {
    pub fn new(game: Game, config: &ConfigSampler) -> Result<Sampler, ConfigError> {
        config.validate()?;
        Ok(Sampler {
            shoe: Shoe::new(game, config.number_of_decks),
            count: LookupCount::for_system(config.count_system()?),
            range: CountRange::symmetric(config.count_cap),
            penetration: config.penetration,
            buckets_per_count: config.buckets_per_count,
            trials: config.trials,
            max_shoes: config.max_shoes,
        })
    }

    pub fn range(&self) -> CountRange {
        self.range
    }

    /// Deals shoes until every bucket holds `trials` samples or `max_shoes`
    /// shoes have been dealt. Cards seen while their bucket is out of range
    /// or already full are dealt without being recorded.
    pub fn estimate<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<CardDistributionTable, SamplerError> {
        let mut samples = vec![[0u64; 10]; self.range.len()];
        let mut filled = 0;
        let mut shoes = 0;

        while filled < samples.len() && shoes < self.max_shoes {
            self.shoe.shuffle(rng);
            self.count.reset();
            shoes += 1;

            while self.shoe.penetration() < self.penetration {
                let true_count = match self
                    .count
                    .true_count(self.shoe.remaining(), self.shoe.cards_per_deck())
                {
                    Some(true_count) => true_count,
                    None => break,
                };
                let card = match self.shoe.deal_card() {
                    Some(card) => card,
                    None => break,
                };
                let rank = card.blackjack_value();
                self.count.notify(rank);

                let bucket = (self.buckets_per_count * true_count).round() as i32;
                if let Ok(offset) = self.range.offset(bucket) {
                    let bucket_samples = &mut samples[offset];
                    if bucket_samples.iter().sum::<u64>() < self.trials {
                        bucket_samples[(rank - 1) as usize] += 1;
                        if bucket_samples.iter().sum::<u64>() == self.trials {
                            filled += 1;
                        }
                    }
                }
            }

            if shoes % PROGRESS_INTERVAL == 0 {
                info!(
                    "dealt {} shoes, {} of {} count buckets filled",
                    shoes,
                    filled,
                    samples.len()
                );
            }
        }
        info!(
            "sampling finished after {} shoes, {} of {} count buckets filled",
            shoes,
            filled,
            samples.len()
        );

        let mut distributions = Vec::with_capacity(samples.len());
        for (bucket, bucket_samples) in self.range.iter().zip(&samples) {
            let total: u64 = bucket_samples.iter().sum();
            if total == 0 {
                return Err(SamplerError::EmptyBucket { bucket, shoes });
            }
            if total < self.trials {
                warn!(
                    "count bucket {} has only {} of {} samples",
                    bucket, total, self.trials
                );
            }
            distributions.push(CardDistribution::from_counts(bucket_samples));
        }

        Ok(CardDistributionTable::new(self.range, distributions)?)
    }
}

/// Builds a sampler for `game` and runs it once.
pub fn estimate_card_distributions<R: Rng + ?Sized>(
    game: Game,
    config: &ConfigSampler,
    rng: &mut R,
) -> Result<CardDistributionTable, SamplerError> {
    let mut sampler = Sampler::new(game, config)?;
    sampler.estimate(rng)
}
