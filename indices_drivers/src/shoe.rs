use indices::Game;
use rand::seq::SliceRandom;
use rand::Rng;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Suit {
    Diamond = 0,
    Club,
    Heart,
    Spade,
}

/// Represents a card in the real world with a suit and a face value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub face_value: u8,
    pub suit: Suit,
}

impl Card {
    pub fn blackjack_value(&self) -> u8 {
        self.face_value.min(10)
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let suit = match self.suit {
            Suit::Diamond => 'D',
            Suit::Club => 'C',
            Suit::Heart => 'H',
            Suit::Spade => 'S',
        };
        let value = match self.face_value {
            1 => 'A',
            10 => 'T',
            11 => 'J',
            12 => 'Q',
            13 => 'K',
            v => char::from_digit(v as u32, 10).unwrap_or('?'),
        };
        write!(f, "{}{}", suit, value)
    }
}

/// Face values of one suit. Spanish 21 decks have no pip tens.
fn face_values(game: Game) -> impl Iterator<Item = u8> {
    (1..=13).filter(move |face_value| !(game == Game::Spanish21 && *face_value == 10))
}

/// Represents a shoe in the real world.
#[derive(Debug, Clone)]
pub struct Shoe {
    cards_per_deck: usize,
    cards: Vec<Card>,
    current_index: usize,
}

impl Shoe {
    /// Creates a new shoe with ordered cards.
    pub fn new(game: Game, number_of_decks: u32) -> Shoe {
        let mut cards = Vec::new();
        for _ in 0..number_of_decks {
            for suit in Suit::iter() {
                for face_value in face_values(game) {
                    cards.push(Card { face_value, suit });
                }
            }
        }
        Shoe {
            cards_per_deck: face_values(game).count() * Suit::iter().count(),
            cards,
            current_index: 0,
        }
    }

    /// Returns the dealt cards back into the shoe and shuffles.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
        self.current_index = 0;
    }

    /// Deals a card if the shoe is not empty. Returns None if empty.
    pub fn deal_card(&mut self) -> Option<Card> {
        let card = self.cards.get(self.current_index).copied()?;
        self.current_index += 1;
        Some(card)
    }

    /// Fraction of the shoe already dealt.
    pub fn penetration(&self) -> f64 {
        if self.cards.is_empty() {
            return 1.0;
        }
        self.current_index as f64 / self.cards.len() as f64
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.current_index
    }

    pub fn cards_per_deck(&self) -> usize {
        self.cards_per_deck
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
