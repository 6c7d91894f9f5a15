use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
pub enum CountSystem {
    HiLo,
    Spanish21,
}

/// A running count where every card rank adds a fixed tag.
#[derive(Debug, Clone)]
pub struct LookupCount {
    // Tags of ranks 1 (ace) to 10.
    tags: [i32; 10],
    running_count: i32,
}

impl LookupCount {
    pub fn new(tags: [i32; 10]) -> LookupCount {
        LookupCount {
            tags,
            running_count: 0,
        }
    }

    /// 2 to 6 count +1, tens and aces -1.
    pub fn hi_lo() -> LookupCount {
        Self::new([-1, 1, 1, 1, 1, 1, 0, 0, 0, -1])
    }

    /// Hi-lo with the ace at -2, which balances a deck without pip tens.
    pub fn spanish21() -> LookupCount {
        Self::new([-2, 1, 1, 1, 1, 1, 0, 0, 0, -1])
    }

    pub fn for_system(system: CountSystem) -> LookupCount {
        match system {
            CountSystem::HiLo => Self::hi_lo(),
            CountSystem::Spanish21 => Self::spanish21(),
        }
    }

    pub fn reset(&mut self) {
        self.running_count = 0;
    }

    /// Note that this method won't check if the card value is valid.
    pub fn notify(&mut self, blackjack_value: u8) {
        self.running_count += self.tags[(blackjack_value - 1) as usize];
    }

    pub fn running_count(&self) -> i32 {
        self.running_count
    }

    /// Running count per deck still in the shoe. `None` once the shoe is
    /// empty.
    pub fn true_count(&self, remaining: usize, cards_per_deck: usize) -> Option<f64> {
        if remaining == 0 {
            return None;
        }
        Some(self.running_count as f64 * cards_per_deck as f64 / remaining as f64)
    }

    /// Sum of the tags over one full deck of the given composition.
    pub fn deck_total(&self, counts_per_deck: &[u32; 10]) -> i64 {
        self.tags
            .iter()
            .zip(counts_per_deck)
            .map(|(tag, count)| *tag as i64 * *count as i64)
            .sum()
    }
}
