use crate::error::check_rank;
use crate::{
    blackjack_states, CardDistribution, CardDistributionTable, CountRange, DealerDistribution,
    DealerDistributionTable, FinalTotalDistribution, HandState, HandStateArray, IndicesError,
    Rule,
};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

/// Hands are evaluated from two cards on.
pub const MIN_HAND_LENGTH: u8 = 2;

/// Expected loss at which giving up half the wager breaks even.
pub const SURRENDER_THRESHOLD: f64 = -0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Hit,
    Stand,
    Surrender,
}

/// Expectations of one hand state against one dealer upcard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEv {
    pub hit: f64,
    pub stay: f64,
    pub hand: f64,
}

impl Default for StateEv {
    fn default() -> Self {
        Self {
            hit: -f64::INFINITY,
            stay: -f64::INFINITY,
            hand: -f64::INFINITY,
        }
    }
}

impl StateEv {
    /// A state that is settled by rule: no more cards are taken.
    fn settled(hand: f64) -> Self {
        Self {
            hit: -f64::INFINITY,
            stay: hand,
            hand,
        }
    }

    fn played(hit: f64, stay: f64) -> Self {
        Self {
            hit,
            stay,
            hand: hit.max(stay),
        }
    }

    /// Standing wins ties.
    pub fn should_hit(&self) -> bool {
        self.hit > self.stay
    }

    pub fn decision(&self) -> Decision {
        if self.should_hit() {
            Decision::Hit
        } else {
            Decision::Stand
        }
    }
}

/// Every state against every upcard for one number of cards held.
///
/// A layer is read by shorter hands only once it is completed.
#[derive(Debug, Clone)]
pub struct HandLengthLayer {
    cards_held: u8,
    by_upcard: [HandStateArray<StateEv>; 10],
    completed: bool,
}

impl HandLengthLayer {
    fn new(cards_held: u8) -> Self {
        Self {
            cards_held,
            by_upcard: std::array::from_fn(|_| HandStateArray::new()),
            completed: false,
        }
    }

    pub fn cards_held(&self) -> u8 {
        self.cards_held
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Panics if the layer is not completed or `state` was never evaluated.
    /// The layer of `max_hand_length` cards only holds hard and soft 21.
    pub fn state_ev(&self, dealer_up_card: u8, state: HandState) -> &StateEv {
        assert!(
            self.completed,
            "layer of {}-card hands read before it was completed",
            self.cards_held
        );
        &self.by_upcard[(dealer_up_card - 1) as usize][state]
    }

    /// Reads a state of a layer that is still being filled. Only states that
    /// are already final can be read.
    fn partial_state_ev(&self, dealer_up_card: u8, state: HandState) -> &StateEv {
        &self.by_upcard[(dealer_up_card - 1) as usize][state]
    }

    fn finalize(&mut self, dealer_up_card: u8, state: HandState, ev: StateEv) {
        self.by_upcard[(dealer_up_card - 1) as usize].finalize(state, ev);
    }
}

/// Value of a player 21 held with `cards_held` cards. A two-card 21 is a
/// natural and only pushes against a dealer natural.
fn player_21_value(rule: &Rule, dealer: &FinalTotalDistribution, cards_held: u8) -> f64 {
    let payout = rule.payout_for_21(cards_held);
    if rule.player_21_always_wins {
        payout
    } else if cards_held == MIN_HAND_LENGTH {
        dealer.ev_for_player_natural(payout)
    } else {
        dealer.ev_for_player_21(payout)
    }
}

/// All hand-length layers of one count bucket.
#[derive(Debug, Clone)]
pub struct BucketSolution {
    bucket: i32,
    // layers[i] holds hands of MIN_HAND_LENGTH + i cards.
    layers: Vec<HandLengthLayer>,
}

impl BucketSolution {
    /// Backward induction from the longest hand down to two cards.
    ///
    /// Hands of `max_hand_length - 1` or more cards share one layer: past that
    /// point only a 21 changes the payout, and a draw to 21 still moves to the
    /// next length so the bonus is looked up with the true card count.
    pub fn solve(
        bucket: i32,
        cards: &CardDistribution,
        dealer: &DealerDistribution,
        rule: &Rule,
    ) -> BucketSolution {
        let max_hand_length = rule.max_hand_length;

        // Longest first.
        let mut built: Vec<HandLengthLayer> = Vec::with_capacity(max_hand_length as usize);
        built.push(Self::charlie_layer(dealer, rule));

        for cards_held in (MIN_HAND_LENGTH..max_hand_length).rev() {
            let layer = Self::solve_layer(cards_held, cards, dealer, rule, &built);
            built.push(layer);
        }
        built.reverse();

        debug!("solved count bucket {}", bucket);
        BucketSolution {
            bucket,
            layers: built,
        }
    }

    /// The longest tracked hand only matters when it is a 21.
    fn charlie_layer(dealer: &DealerDistribution, rule: &Rule) -> HandLengthLayer {
        let cards_held = rule.max_hand_length;
        let mut layer = HandLengthLayer::new(cards_held);
        for dealer_up_card in 1..=10 {
            let value = player_21_value(rule, dealer.upcard(dealer_up_card), cards_held);
            layer.finalize(dealer_up_card, HandState::hard(21), StateEv::settled(value));
            layer.finalize(dealer_up_card, HandState::soft(21), StateEv::settled(value));
        }
        layer.completed = true;
        layer
    }

    fn solve_layer(
        cards_held: u8,
        cards: &CardDistribution,
        dealer: &DealerDistribution,
        rule: &Rule,
        built: &[HandLengthLayer],
    ) -> HandLengthLayer {
        let max_hand_length = rule.max_hand_length;
        let longest_played = max_hand_length - 1;

        let mut layer = HandLengthLayer::new(cards_held);
        for dealer_up_card in 1..=10 {
            let dealer_final = dealer.upcard(dealer_up_card);

            for state in blackjack_states() {
                let ev = if state.is_bust() {
                    StateEv::settled(-1.0)
                } else if state.total == 21 {
                    StateEv::settled(player_21_value(rule, dealer_final, cards_held))
                } else {
                    let mut hit = 0.0;
                    for card in 1..=10 {
                        let p = cards[card];
                        if p == 0.0 {
                            continue;
                        }
                        let next_state = state.next_state(card);
                        let next_cards_held = if next_state.total == 21 {
                            cards_held + 1
                        } else {
                            (cards_held + 1).min(longest_played)
                        };
                        let next_ev = if next_cards_held == cards_held {
                            layer.partial_state_ev(dealer_up_card, next_state)
                        } else {
                            built[(max_hand_length - next_cards_held) as usize]
                                .state_ev(dealer_up_card, next_state)
                        };
                        hit += p * next_ev.hand;
                    }
                    StateEv::played(hit, dealer_final.stand_ev(state.total))
                };
                layer.finalize(dealer_up_card, state, ev);
            }
        }
        layer.completed = true;
        layer
    }

    pub fn bucket(&self) -> i32 {
        self.bucket
    }

    /// Layers of 2 to `max_hand_length` cards. The longest one is only
    /// evaluated at 21, the hands that can still reach it.
    pub fn layer(&self, cards_held: u8) -> Option<&HandLengthLayer> {
        let index = cards_held.checked_sub(MIN_HAND_LENGTH)?;
        self.layers.get(index as usize)
    }
}

/// Expectations for every (cards held, count bucket, upcard, state) and the
/// deviation indices derived from them.
#[derive(Debug, Clone)]
pub struct StrategyTables {
    range: CountRange,
    max_hand_length: u8,
    buckets: Vec<BucketSolution>,
    // stay_indices[i] holds hands of MIN_HAND_LENGTH + i cards.
    stay_indices: Vec<[HandStateArray<i32>; 10]>,
    surrender_indices: [HandStateArray<i32>; 10],
}

impl StrategyTables {
    pub fn range(&self) -> CountRange {
        self.range
    }

    /// The longest hand that still has a hit or stand decision.
    pub fn longest_played_hand(&self) -> u8 {
        self.max_hand_length - 1
    }

    pub fn hit_ev(
        &self,
        cards_held: u8,
        bucket: i32,
        dealer_up_card: u8,
        state: HandState,
    ) -> Result<f64, IndicesError> {
        Ok(self.state_ev(cards_held, bucket, dealer_up_card, state)?.hit)
    }

    pub fn stay_ev(
        &self,
        cards_held: u8,
        bucket: i32,
        dealer_up_card: u8,
        state: HandState,
    ) -> Result<f64, IndicesError> {
        Ok(self.state_ev(cards_held, bucket, dealer_up_card, state)?.stay)
    }

    pub fn hand_ev(
        &self,
        cards_held: u8,
        bucket: i32,
        dealer_up_card: u8,
        state: HandState,
    ) -> Result<f64, IndicesError> {
        Ok(self.state_ev(cards_held, bucket, dealer_up_card, state)?.hand)
    }

    pub fn decision(
        &self,
        cards_held: u8,
        bucket: i32,
        dealer_up_card: u8,
        state: HandState,
    ) -> Result<Decision, IndicesError> {
        Ok(self
            .state_ev(cards_held, bucket, dealer_up_card, state)?
            .decision())
    }

    /// The best play of a two-card hand when surrender is offered.
    pub fn two_card_decision(
        &self,
        bucket: i32,
        dealer_up_card: u8,
        state: HandState,
    ) -> Result<Decision, IndicesError> {
        let ev = self.state_ev(MIN_HAND_LENGTH, bucket, dealer_up_card, state)?;
        if ev.hand < SURRENDER_THRESHOLD {
            Ok(Decision::Surrender)
        } else {
            Ok(ev.decision())
        }
    }

    pub fn state_ev(
        &self,
        cards_held: u8,
        bucket: i32,
        dealer_up_card: u8,
        state: HandState,
    ) -> Result<&StateEv, IndicesError> {
        self.check_hand_length(cards_held)?;
        check_rank(dealer_up_card)?;
        state.validate()?;
        let offset = self.range.offset(bucket)?;
        let layer = self.buckets[offset]
            .layer(cards_held)
            .ok_or_else(|| self.hand_length_error(cards_held))?;
        Ok(layer.state_ev(dealer_up_card, state))
    }

    /// First count bucket at which standing is at least as good as hitting.
    /// The top of the range when hitting stays better throughout.
    pub fn stay_index(
        &self,
        cards_held: u8,
        dealer_up_card: u8,
        state: HandState,
    ) -> Result<i32, IndicesError> {
        self.check_hand_length(cards_held)?;
        check_rank(dealer_up_card)?;
        state.validate()?;
        let indices = &self.stay_indices[(cards_held - MIN_HAND_LENGTH) as usize];
        Ok(indices[(dealer_up_card - 1) as usize][state])
    }

    /// First count bucket at which a two-card hand loses more than half the
    /// wager. The top of the range when that never happens.
    pub fn surrender_index(&self, dealer_up_card: u8, state: HandState) -> Result<i32, IndicesError> {
        check_rank(dealer_up_card)?;
        state.validate()?;
        Ok(self.surrender_indices[(dealer_up_card - 1) as usize][state])
    }

    fn check_hand_length(&self, cards_held: u8) -> Result<(), IndicesError> {
        if (MIN_HAND_LENGTH..=self.longest_played_hand()).contains(&cards_held) {
            Ok(())
        } else {
            Err(self.hand_length_error(cards_held))
        }
    }

    fn hand_length_error(&self, cards_held: u8) -> IndicesError {
        IndicesError::HandLengthOutOfRange {
            cards_held,
            min: MIN_HAND_LENGTH,
            max: self.longest_played_hand(),
        }
    }
}

/// Scans the buckets from the lowest count up and returns the first one
/// where `deviates` holds, or the top of the range.
fn first_deviation<F>(
    range: CountRange,
    buckets: &[BucketSolution],
    cards_held: u8,
    mut deviates: F,
) -> [HandStateArray<i32>; 10]
where
    F: FnMut(&StateEv) -> bool,
{
    let mut indices: [HandStateArray<i32>; 10] = std::array::from_fn(|_| HandStateArray::new());
    for (dealer_up_card, by_state) in (1..=10).zip(indices.iter_mut()) {
        for state in blackjack_states() {
            let index = buckets
                .iter()
                .find(|solution| {
                    solution
                        .layer(cards_held)
                        .map(|layer| deviates(layer.state_ev(dealer_up_card, state)))
                        .unwrap_or(false)
                })
                .map(|solution| solution.bucket())
                .unwrap_or(range.max);
            by_state.finalize(state, index);
        }
    }
    indices
}

/// Backward induction over every count bucket, then index extraction.
///
/// Both tables must cover the same count range. Buckets are independent and
/// are solved in parallel.
pub fn compute_player_strategy(
    dealer: &DealerDistributionTable,
    cards: &CardDistributionTable,
    rule: &Rule,
) -> Result<StrategyTables, IndicesError> {
    rule.validate()?;
    let range = cards.range();
    if dealer.range() != range {
        return Err(IndicesError::MismatchedCountRange {
            dealer_min: dealer.range().min,
            dealer_max: dealer.range().max,
            card_min: range.min,
            card_max: range.max,
        });
    }

    let buckets: Vec<BucketSolution> = range
        .iter()
        .collect::<Vec<i32>>()
        .into_par_iter()
        .map(|bucket| {
            let card_distribution = cards.get(bucket)?;
            let dealer_distribution = dealer.get(bucket)?;
            Ok(BucketSolution::solve(
                bucket,
                card_distribution,
                dealer_distribution,
                rule,
            ))
        })
        .collect::<Result<Vec<_>, IndicesError>>()?;

    let stay_indices = (MIN_HAND_LENGTH..rule.max_hand_length)
        .map(|cards_held| first_deviation(range, &buckets, cards_held, |ev| !ev.should_hit()))
        .collect();
    let surrender_indices = first_deviation(range, &buckets, MIN_HAND_LENGTH, |ev| {
        ev.hand < SURRENDER_THRESHOLD
    });

    info!(
        "solved {} count buckets for hands of {} to {} cards",
        range.len(),
        MIN_HAND_LENGTH,
        rule.max_hand_length - 1
    );

    Ok(StrategyTables {
        range,
        max_hand_length: rule.max_hand_length,
        buckets,
        stay_indices,
        surrender_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compute_dealer_distribution, Game, PeekPolicy};

    const EPSILON: f64 = 1e-12;

    fn solve_flat(cards: CardDistribution, rule: &Rule) -> StrategyTables {
        let table = CardDistributionTable::flat(CountRange::symmetric(1), cards).unwrap();
        crate::solve(&table, rule).unwrap()
    }

    #[test]
    fn settled_states() {
        let rule = Rule::for_game(Game::Spanish21);
        let tables = solve_flat(CardDistribution::for_game(Game::Spanish21, 6), &rule);
        for dealer_up_card in 1..=10 {
            for cards_held in 2..=6 {
                let bust = tables
                    .state_ev(cards_held, 0, dealer_up_card, HandState::BUST)
                    .unwrap();
                assert_eq!(bust.hand, -1.0);
                assert!(!bust.should_hit());

                for state in [HandState::hard(21), HandState::soft(21)] {
                    let hand = tables
                        .hand_ev(cards_held, 0, dealer_up_card, state)
                        .unwrap();
                    assert_eq!(hand, rule.payout_for_21(cards_held));
                }
            }
        }
        assert_eq!(
            tables.hand_ev(5, 1, 7, HandState::soft(21)).unwrap(),
            1.5
        );
        assert_eq!(tables.hand_ev(6, -1, 7, HandState::hard(21)).unwrap(), 2.0);
    }

    #[test]
    fn player_21_pushes_against_dealer_21_in_blackjack() {
        let rule = Rule::for_game(Game::Blackjack);
        let cards = CardDistribution::for_game(Game::Blackjack, 8);
        let tables = solve_flat(cards, &rule);
        let dealer = compute_dealer_distribution(&cards, rule.peek_policy, false);
        for dealer_up_card in 1..=10 {
            let hand = tables
                .hand_ev(3, 0, dealer_up_card, HandState::hard(21))
                .unwrap();
            assert!((hand - (1.0 - dealer[dealer_up_card].p(21))).abs() < EPSILON);
        }
    }

    #[test]
    fn peeked_blackjack_natural_pays_in_full() {
        let rule = Rule::for_game(Game::Blackjack);
        let tables = solve_flat(CardDistribution::for_game(Game::Blackjack, 8), &rule);
        for dealer_up_card in [1, 6, 10] {
            let hand = tables
                .hand_ev(2, 0, dealer_up_card, HandState::soft(21))
                .unwrap();
            assert_eq!(hand, 1.5);
        }
    }

    #[test]
    fn unpeeked_blackjack_natural_pushes_against_dealer_natural() {
        let mut rule = Rule::for_game(Game::Blackjack);
        rule.peek_policy = PeekPolicy::NoPeek;
        let cards = CardDistribution::for_game(Game::Blackjack, 8);
        let tables = solve_flat(cards, &rule);

        let against_ace = tables.hand_ev(2, 0, 1, HandState::soft(21)).unwrap();
        assert!((against_ace - 1.5 * (1.0 - cards[10])).abs() < EPSILON);
        let against_ten = tables.hand_ev(2, 0, 10, HandState::soft(21)).unwrap();
        assert!((against_ten - 1.5 * (1.0 - cards[1])).abs() < EPSILON);
        // Dealer 21s of three or more cards lose to a natural.
        assert_eq!(tables.hand_ev(2, 0, 6, HandState::soft(21)).unwrap(), 1.5);

        // Longer 21s still push against any dealer 21.
        let dealer = compute_dealer_distribution(&cards, PeekPolicy::NoPeek, false);
        let three_cards = tables.hand_ev(3, 0, 1, HandState::soft(21)).unwrap();
        assert!((three_cards - (1.0 - dealer[1].p(21))).abs() < EPSILON);
    }

    #[test]
    fn longest_layer_holds_only_21s() {
        let rule = Rule::for_game(Game::Spanish21);
        let cards = CardDistribution::for_game(Game::Spanish21, 8);
        let dealer = compute_dealer_distribution(&cards, rule.peek_policy, true);
        let solution = BucketSolution::solve(0, &cards, &dealer, &rule);
        let layer = solution.layer(rule.max_hand_length).unwrap();
        assert_eq!(layer.state_ev(10, HandState::soft(21)).hand, 3.0);
        assert_eq!(layer.state_ev(10, HandState::hard(21)).hand, 3.0);
        assert!(!layer.by_upcard[9].contains_state(HandState::hard(20)));
    }

    #[test]
    fn hand_is_best_of_hit_and_stay() {
        let rule = Rule::for_game(Game::Spanish21);
        let tables = solve_flat(CardDistribution::for_game(Game::Spanish21, 8), &rule);
        for cards_held in 2..=6 {
            for dealer_up_card in 1..=10 {
                for state in blackjack_states().filter(|s| !s.is_bust() && s.total != 21) {
                    let ev = tables.state_ev(cards_held, 1, dealer_up_card, state).unwrap();
                    assert_eq!(ev.hand, ev.hit.max(ev.stay));
                    assert!(ev.hand >= -1.0 && ev.hand <= 3.0);
                    assert_eq!(ev.should_hit(), ev.hit > ev.stay);
                }
            }
        }
    }

    #[test]
    fn hit_expectation_by_hand() {
        // Ten upcard, only nines and tens: the dealer always finishes on 19
        // or 20. Hard 12 makes 21 on a nine and busts on a ten.
        let rule = Rule::for_game(Game::Spanish21);
        let cards = CardDistribution::from_weights([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.25, 0.75]);
        let tables = solve_flat(cards, &rule);

        let hit = tables.hit_ev(2, 0, 10, HandState::hard(12)).unwrap();
        assert!((hit - (0.25 * 1.0 - 0.75)).abs() < EPSILON);
        let hit = tables.hit_ev(4, 0, 10, HandState::hard(12)).unwrap();
        assert!((hit - (0.25 * 1.5 - 0.75)).abs() < EPSILON);

        let stay = tables.stay_ev(2, 0, 10, HandState::hard(19)).unwrap();
        assert!((stay - (-0.75)).abs() < EPSILON);
        assert_eq!(
            tables.decision(2, 0, 10, HandState::hard(19)).unwrap(),
            Decision::Stand
        );
    }

    #[test]
    fn ties_are_stood() {
        let tie = StateEv::played(-0.25, -0.25);
        assert!(!tie.should_hit());
        assert_eq!(tie.decision(), Decision::Stand);
        assert_eq!(StateEv::played(0.1, 0.0).decision(), Decision::Hit);
    }

    #[test]
    fn accessors_reject_out_of_range_input() {
        let rule = Rule::for_game(Game::Blackjack);
        let tables = solve_flat(CardDistribution::for_game(Game::Blackjack, 2), &rule);
        let state = HandState::hard(16);
        assert!(matches!(
            tables.hit_ev(2, 2, 10, state),
            Err(IndicesError::CountOutOfRange { bucket: 2, .. })
        ));
        assert!(matches!(
            tables.hit_ev(7, 0, 10, state),
            Err(IndicesError::HandLengthOutOfRange { cards_held: 7, .. })
        ));
        assert!(matches!(
            tables.stay_index(1, 10, state),
            Err(IndicesError::HandLengthOutOfRange { .. })
        ));
        assert_eq!(
            tables.hit_ev(2, 0, 11, state),
            Err(IndicesError::InvalidRank(11))
        );
        assert!(matches!(
            tables.surrender_index(10, HandState::soft(5)),
            Err(IndicesError::InvalidHandState { .. })
        ));
    }

    #[test]
    fn mismatched_ranges_are_rejected() {
        let rule = Rule::for_game(Game::Blackjack);
        let cards = CardDistribution::for_game(Game::Blackjack, 8);
        let narrow = CardDistributionTable::flat(CountRange::symmetric(1), cards).unwrap();
        let wide = CardDistributionTable::flat(CountRange::symmetric(2), cards).unwrap();
        let dealer = DealerDistributionTable::compute(&narrow, &rule);
        assert!(matches!(
            compute_player_strategy(&dealer, &wide, &rule),
            Err(IndicesError::MismatchedCountRange { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "read before it was completed")]
    fn incomplete_layers_cannot_be_read() {
        let layer = HandLengthLayer::new(3);
        let _ = layer.state_ev(10, HandState::hard(16));
    }

    #[test]
    fn flat_table_indices() {
        // With the same cards in every bucket, a decision either holds from
        // the lowest bucket or never.
        let rule = Rule::for_game(Game::Blackjack);
        let tables = solve_flat(CardDistribution::for_game(Game::Blackjack, 8), &rule);
        let range = tables.range();

        assert_eq!(tables.stay_index(2, 10, HandState::hard(17)).unwrap(), range.min);
        assert_eq!(tables.stay_index(2, 6, HandState::hard(13)).unwrap(), range.min);
        assert_eq!(tables.stay_index(2, 10, HandState::hard(12)).unwrap(), range.max);
        assert_eq!(tables.stay_index(2, 7, HandState::hard(11)).unwrap(), range.max);

        assert_eq!(
            tables.surrender_index(10, HandState::hard(16)).unwrap(),
            range.min
        );
        assert_eq!(
            tables.surrender_index(10, HandState::hard(20)).unwrap(),
            range.max
        );
        assert_eq!(
            tables.surrender_index(5, HandState::hard(12)).unwrap(),
            range.max
        );

        assert_eq!(
            tables.two_card_decision(0, 10, HandState::hard(16)).unwrap(),
            Decision::Surrender
        );
        assert_eq!(
            tables.two_card_decision(0, 10, HandState::hard(12)).unwrap(),
            Decision::Hit
        );
        assert_eq!(
            tables.two_card_decision(0, 10, HandState::hard(20)).unwrap(),
            Decision::Stand
        );
    }

    #[test]
    fn layers_are_built_for_every_length() {
        let rule = Rule::for_game(Game::Spanish21);
        let cards = CardDistribution::for_game(Game::Spanish21, 8);
        let dealer = compute_dealer_distribution(&cards, rule.peek_policy, true);
        let solution = BucketSolution::solve(0, &cards, &dealer, &rule);
        for cards_held in 2..=7 {
            let layer = solution.layer(cards_held).unwrap();
            assert_eq!(layer.cards_held(), cards_held);
            assert!(layer.is_completed());
        }
        assert!(solution.layer(1).is_none());
        assert!(solution.layer(8).is_none());
    }
}
