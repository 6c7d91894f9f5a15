use crate::error::check_rank;
use crate::{
    blackjack_states, CardDistribution, CardDistributionTable, CountRange, HandState,
    HandStateArray, IndicesError, PeekPolicy, Rule,
};
use log::{debug, info};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::ops::Index;

/// Totals the dealer can finish on. 22 stands for any bust.
pub const DEALER_FINAL_TOTALS: std::ops::RangeInclusive<u8> = 17..=22;

/// Probability of each final dealer total.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FinalTotalDistribution {
    // [0, 4] for [17, 21].
    // 5 for Bust.
    probabilities: [f64; 6],
    // Share of the 21s that are a two-card natural. Only an unpeeked ace or
    // ten upcard can have one.
    natural: f64,
}

impl FinalTotalDistribution {
    pub fn p(&self, final_total: u8) -> f64 {
        match final_total {
            17..=22 => self.probabilities[(final_total - 17) as usize],
            _ => 0.0,
        }
    }

    pub fn p_bust(&self) -> f64 {
        self.probabilities[5]
    }

    /// Probability that the dealer finishes on a two-card 21.
    pub fn p_natural(&self) -> f64 {
        self.natural
    }

    pub fn sum(&self) -> f64 {
        self.probabilities.iter().sum()
    }

    /// Expectation of standing on `player_total` against this dealer: +1 for
    /// a win, 0 for a push, -1 for a loss.
    pub fn stand_ev(&self, player_total: u8) -> f64 {
        DEALER_FINAL_TOTALS
            .map(|dealer_total| {
                let outcome = if dealer_total >= 22 {
                    1.0
                } else {
                    match player_total.cmp(&dealer_total) {
                        Ordering::Less => -1.0,
                        Ordering::Equal => 0.0,
                        Ordering::Greater => 1.0,
                    }
                };
                outcome * self.p(dealer_total)
            })
            .sum()
    }

    /// Expectation of a player 21 of three or more cards that is paid
    /// `payout` when it wins and pushes against a dealer 21.
    pub fn ev_for_player_21(&self, payout: f64) -> f64 {
        payout * (1.0 - self.p(21))
    }

    /// Expectation of a player natural paid `payout`. It beats every dealer
    /// 21 except another natural.
    pub fn ev_for_player_natural(&self, payout: f64) -> f64 {
        payout * (1.0 - self.natural)
    }

    fn end_with(final_total: u8) -> Self {
        let mut ret = Self::default();
        ret.probabilities[(final_total.min(22) - 17) as usize] = 1.0;
        ret
    }

    fn add_assign_with_p(&mut self, rhs: &Self, p: f64) {
        for i in 0..self.probabilities.len() {
            self.probabilities[i] += rhs.probabilities[i] * p;
        }
    }

    fn scale(&mut self, factor: f64) {
        for p in self.probabilities.iter_mut() {
            *p *= factor;
        }
    }
}

/// Whether the dealer stops drawing in `state`.
pub fn dealer_must_stand(state: HandState, hit_soft_17: bool) -> bool {
    if state.is_bust() {
        return true;
    }
    match state.total {
        18..=21 => true,
        17 => !(state.is_soft && hit_soft_17),
        _ => false,
    }
}

/// For every hand state, the distribution of the total the dealer finishes
/// on when drawing from `cards`.
///
/// States are visited in the order of `blackjack_states`, so every successor
/// is final before it is read.
pub fn dealer_terminal_distribution(
    cards: &CardDistribution,
    hit_soft_17: bool,
) -> HandStateArray<FinalTotalDistribution> {
    let mut terminal = HandStateArray::new();

    for state in blackjack_states() {
        // Case 1: Dealer must stand.
        if dealer_must_stand(state, hit_soft_17) {
            terminal.finalize(state, FinalTotalDistribution::end_with(state.total));
            continue;
        }

        // Case 2: Dealer must hit.
        let mut distribution = FinalTotalDistribution::default();
        for card in 1..=10 {
            let p = cards[card];
            if p == 0.0 {
                continue;
            }
            distribution.add_assign_with_p(&terminal[state.next_state(card)], p);
        }
        terminal.finalize(state, distribution);
    }

    terminal
}

/// Distribution of the dealer's final total for `dealer_up_card` once the
/// dealer has peeked and the hole card is known not to be
/// `excluded_hole_card`.
///
/// By Bayes' theorem, p(card | card != excluded) = p(card) / (1 - p(excluded)).
/// When the excluded card is certain the condition is impossible and the
/// unconditioned distribution is returned, with the dealer always holding a
/// natural.
pub fn peeked_upcard_distribution(
    terminal: &HandStateArray<FinalTotalDistribution>,
    cards: &CardDistribution,
    dealer_up_card: u8,
    excluded_hole_card: u8,
) -> FinalTotalDistribution {
    let up = HandState::upcard(dealer_up_card);
    let p_excluded = cards[excluded_hole_card];
    if p_excluded >= 1.0 {
        let mut distribution = terminal[up];
        distribution.natural = 1.0;
        return distribution;
    }

    let mut distribution = FinalTotalDistribution::default();
    for hole_card in (1..=10).filter(|card| *card != excluded_hole_card) {
        let p = cards[hole_card];
        if p == 0.0 {
            continue;
        }
        distribution.add_assign_with_p(&terminal[up.next_state(hole_card)], p);
    }
    distribution.scale(1.0 / (1.0 - p_excluded));
    distribution
}

/// Final-total distribution for each dealer upcard, as the player sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct DealerDistribution {
    by_upcard: [FinalTotalDistribution; 10],
}

impl DealerDistribution {
    /// Panics if `dealer_up_card` is not in 1..=10. See `get` for a checked
    /// lookup.
    pub fn upcard(&self, dealer_up_card: u8) -> &FinalTotalDistribution {
        &self.by_upcard[(dealer_up_card - 1) as usize]
    }

    pub fn get(&self, dealer_up_card: u8) -> Result<&FinalTotalDistribution, IndicesError> {
        check_rank(dealer_up_card)?;
        Ok(self.upcard(dealer_up_card))
    }
}

/// Panics on ranks outside 1..=10, like `DealerDistribution::upcard`.
impl Index<u8> for DealerDistribution {
    type Output = FinalTotalDistribution;
    fn index(&self, dealer_up_card: u8) -> &Self::Output {
        self.upcard(dealer_up_card)
    }
}

/// Chance of a natural for an upcard the dealer does not peek under.
fn unpeeked_natural(cards: &CardDistribution, dealer_up_card: u8) -> f64 {
    match dealer_up_card {
        1 => cards[10],
        10 => cards[1],
        _ => 0.0,
    }
}

pub fn compute_dealer_distribution(
    cards: &CardDistribution,
    peek_policy: PeekPolicy,
    hit_soft_17: bool,
) -> DealerDistribution {
    let terminal = dealer_terminal_distribution(cards, hit_soft_17);

    let mut by_upcard = [FinalTotalDistribution::default(); 10];
    for (dealer_up_card, distribution) in (1..=10).zip(by_upcard.iter_mut()) {
        *distribution = match peek_policy.excluded_hole_card(dealer_up_card) {
            Some(excluded) => {
                peeked_upcard_distribution(&terminal, cards, dealer_up_card, excluded)
            }
            None => {
                let mut unpeeked = terminal[HandState::upcard(dealer_up_card)];
                unpeeked.natural = unpeeked_natural(cards, dealer_up_card);
                unpeeked
            }
        };
    }

    DealerDistribution { by_upcard }
}

/// One `DealerDistribution` per count bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct DealerDistributionTable {
    range: CountRange,
    distributions: Vec<DealerDistribution>,
}

impl DealerDistributionTable {
    /// Buckets do not depend on each other and are computed in parallel.
    pub fn compute(cards: &CardDistributionTable, rule: &Rule) -> DealerDistributionTable {
        let distributions: Vec<DealerDistribution> = cards
            .distributions()
            .par_iter()
            .map(|distribution| {
                compute_dealer_distribution(
                    distribution,
                    rule.peek_policy,
                    rule.dealer_hit_on_soft17,
                )
            })
            .collect();

        let range = cards.range();
        for (bucket, distribution) in range.iter().zip(&distributions) {
            debug!(
                "count bucket {}: dealer busts {:.4} with a ten up, {:.4} with a six up",
                bucket,
                distribution.upcard(10).p_bust(),
                distribution.upcard(6).p_bust()
            );
        }
        info!(
            "computed dealer outcomes for count buckets [{}, {}]",
            range.min, range.max
        );

        DealerDistributionTable {
            range,
            distributions,
        }
    }

    pub fn range(&self) -> CountRange {
        self.range
    }

    pub fn get(&self, bucket: i32) -> Result<&DealerDistribution, IndicesError> {
        let offset = self.range.offset(bucket)?;
        Ok(&self.distributions[offset])
    }
}
