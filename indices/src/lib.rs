pub mod card_distribution;
pub mod dealer;
mod error;
pub mod player;
mod statearray;

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

pub use card_distribution::{CardDistribution, CardDistributionTable, CountRange};
pub use dealer::{
    compute_dealer_distribution, DealerDistribution, DealerDistributionTable,
    FinalTotalDistribution,
};
pub use error::IndicesError;
pub use player::{compute_player_strategy, Decision, StateEv, StrategyTables};
pub use statearray::{blackjack_states, HandState, HandStateArray};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
pub enum Game {
    Blackjack,
    Spanish21,
}

impl Game {
    /// Blackjack values of the cards of one suit.
    pub fn ranks_per_suit(&self) -> &'static [u8] {
        match self {
            Game::Blackjack => &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 10, 10, 10],
            // The pip tens are removed, the court cards stay.
            Game::Spanish21 => &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 10, 10],
        }
    }

    /// Number of cards of each rank (1 to 10) in a single deck.
    pub fn counts_per_deck(&self) -> [u32; 10] {
        let mut counts = [0; 10];
        for rank in self.ranks_per_suit() {
            counts[(*rank - 1) as usize] += 4;
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
pub enum PeekPolicy {
    UpAceOrTen,
    UpAce,
    NoPeek,
}

impl PeekPolicy {
    /// The hole card the dealer is known not to hold once the round goes on
    /// after peeking, if the dealer peeks with this upcard.
    pub fn excluded_hole_card(&self, dealer_up_card: u8) -> Option<u8> {
        match self {
            PeekPolicy::UpAceOrTen => match dealer_up_card {
                1 => Some(10),
                10 => Some(1),
                _ => None,
            },
            PeekPolicy::UpAce => match dealer_up_card {
                1 => Some(10),
                _ => None,
            },
            PeekPolicy::NoPeek => None,
        }
    }
}

impl From<bool> for PeekPolicy {
    fn from(peek: bool) -> Self {
        if peek {
            PeekPolicy::UpAceOrTen
        } else {
            PeekPolicy::NoPeek
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub game: Game,
    pub dealer_hit_on_soft17: bool,
    pub peek_policy: PeekPolicy,
    /// A player 21 wins outright instead of being compared with the dealer.
    pub player_21_always_wins: bool,
    /// Hands are tracked up to this many cards. Beyond `max_hand_length - 1`
    /// cards only a 21 changes the payout.
    pub max_hand_length: u8,
    /// Payout of a 21, keyed by the number of cards held.
    pub bonus_schedule: Vec<f64>,
}

impl Rule {
    pub fn for_game(game: Game) -> Rule {
        match game {
            Game::Blackjack => Rule {
                game,
                dealer_hit_on_soft17: false,
                peek_policy: PeekPolicy::UpAceOrTen,
                player_21_always_wins: false,
                max_hand_length: 7,
                bonus_schedule: vec![1.0, 1.0, 1.5, 1.0, 1.0, 1.0, 1.0, 1.0],
            },
            Game::Spanish21 => Rule {
                game,
                dealer_hit_on_soft17: true,
                peek_policy: PeekPolicy::UpAceOrTen,
                player_21_always_wins: true,
                max_hand_length: 7,
                // 5-card 21 pays 3:2, 6-card 2:1, 7 or more 3:1.
                bonus_schedule: vec![1.0, 1.0, 1.5, 1.0, 1.0, 1.5, 2.0, 3.0],
            },
        }
    }

    pub fn validate(&self) -> Result<(), IndicesError> {
        if self.max_hand_length < player::MIN_HAND_LENGTH + 1 {
            return Err(IndicesError::InvalidRule(format!(
                "max_hand_length must be at least {}, got {}",
                player::MIN_HAND_LENGTH + 1,
                self.max_hand_length
            )));
        }
        if self.bonus_schedule.len() <= self.max_hand_length as usize {
            return Err(IndicesError::InvalidRule(format!(
                "bonus_schedule needs {} entries to cover hands of up to {} cards, got {}",
                self.max_hand_length as usize + 1,
                self.max_hand_length,
                self.bonus_schedule.len()
            )));
        }
        if let Some(bonus) = self
            .bonus_schedule
            .iter()
            .find(|bonus| !bonus.is_finite() || **bonus < 0.0)
        {
            return Err(IndicesError::InvalidRule(format!(
                "bonus payouts must be non-negative, got {}",
                bonus
            )));
        }
        Ok(())
    }

    /// Payout of a 21 made with `cards_held` cards. Hands longer than the
    /// schedule get its last entry.
    pub fn payout_for_21(&self, cards_held: u8) -> f64 {
        let index = cards_held as usize;
        self.bonus_schedule
            .get(index)
            .or_else(|| self.bonus_schedule.last())
            .copied()
            .unwrap_or(1.0)
    }
}

/// Runs the whole pipeline for one card-distribution table: dealer outcomes
/// per count bucket, then the player's backward induction.
pub fn solve(cards: &CardDistributionTable, rule: &Rule) -> Result<StrategyTables, IndicesError> {
    rule.validate()?;
    let dealer = DealerDistributionTable::compute(cards, rule);
    compute_player_strategy(&dealer, cards, rule)
}
