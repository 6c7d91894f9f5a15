use crate::IndicesError;
use std::fmt;
use std::ops::Index;

const BUST_TOTAL: u8 = 22;
const NUMBER_OF_SLOTS: usize = (BUST_TOTAL as usize + 1) * 2;

/// A hand reduced to what matters for drawing: its total and whether an ace
/// is currently counted as 11.
///
/// All totals above 21 collapse into the single hard bust state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandState {
    pub total: u8,
    pub is_soft: bool,
}

impl HandState {
    pub const BUST: HandState = HandState {
        total: BUST_TOTAL,
        is_soft: false,
    };

    pub const fn hard(total: u8) -> HandState {
        HandState {
            total,
            is_soft: false,
        }
    }

    pub const fn soft(total: u8) -> HandState {
        HandState {
            total,
            is_soft: true,
        }
    }

    /// The state of a hand holding the single card `rank`. An ace alone is
    /// soft 11.
    pub fn upcard(rank: u8) -> HandState {
        if rank == 1 {
            HandState::soft(11)
        } else {
            HandState::hard(rank)
        }
    }

    pub fn is_bust(&self) -> bool {
        self.total >= BUST_TOTAL
    }

    /// Returns the state after drawing `card` (1 for an ace, 10 for any
    /// ten-valued card).
    ///
    /// Note that this method won't check if the card value is valid.
    pub fn next_state(self, card: u8) -> HandState {
        let total = self.total + card;

        if self.is_soft {
            if total > 21 {
                // The ace falls back to 1.
                HandState::hard(total - 10)
            } else {
                HandState::soft(total)
            }
        } else if card == 1 && total < 12 {
            HandState::soft(total + 10)
        } else {
            HandState::hard(total.min(BUST_TOTAL))
        }
    }

    /// Checks that the state belongs to the enumerated state space.
    pub fn validate(&self) -> Result<(), IndicesError> {
        let valid = if self.is_soft {
            (11..=21).contains(&self.total)
        } else {
            (2..=BUST_TOTAL).contains(&self.total)
        };
        if valid {
            Ok(())
        } else {
            Err(IndicesError::InvalidHandState {
                total: self.total,
                is_soft: self.is_soft,
            })
        }
    }

    fn slot(&self) -> usize {
        self.total as usize * 2 + self.is_soft as usize
    }
}

impl fmt::Display for HandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bust() {
            write!(f, "bust")
        } else if self.is_soft {
            write!(f, "S{}", self.total)
        } else {
            write!(f, "H{}", self.total)
        }
    }
}

/// Yields every hand state in reverse topological order: every state comes
/// after all the states it can reach by drawing one card.
///
/// Soft 11 is the dealer's ace-only pseudo state. It is never absorbing.
pub fn blackjack_states() -> impl Iterator<Item = HandState> {
    (12..=BUST_TOTAL)
        .rev()
        .map(HandState::hard)
        .chain((11..=21).rev().map(HandState::soft))
        .chain((2..=11).rev().map(HandState::hard))
}

/// A dense array indexed by `HandState`.
///
/// Each slot is written exactly once through `finalize`. Indexing a slot that
/// has not been finalized panics, so reading a state before the states it
/// depends on are done cannot go unnoticed.
#[derive(Debug, Clone)]
pub struct HandStateArray<T> {
    data: Vec<T>,
    finalized: u64,
}

impl<T: Default + Clone> HandStateArray<T> {
    pub fn new() -> HandStateArray<T> {
        HandStateArray {
            data: vec![T::default(); NUMBER_OF_SLOTS],
            finalized: 0,
        }
    }

    pub fn contains_state(&self, state: HandState) -> bool {
        self.finalized & (1 << state.slot()) != 0
    }

    /// Stores the final value of `state`. Panics if it was already stored.
    pub fn finalize(&mut self, state: HandState, value: T) {
        assert!(
            !self.contains_state(state),
            "state {} finalized twice",
            state
        );
        self.data[state.slot()] = value;
        self.finalized |= 1 << state.slot();
    }

    pub fn get(&self, state: HandState) -> Option<&T> {
        if self.contains_state(state) {
            Some(&self.data[state.slot()])
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.finalized.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.finalized == 0
    }
}

impl<T: Default + Clone> Default for HandStateArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default + Clone> Index<HandState> for HandStateArray<T> {
    type Output = T;
    fn index(&self, state: HandState) -> &Self::Output {
        match self.get(state) {
            Some(value) => value,
            None => panic!("state {} read before it was finalized", state),
        }
    }
}
