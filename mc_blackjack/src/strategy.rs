use rand::Rng;

use crate::{
    Action, Card, EnvironmentModel, EpisodeTrace, ExplorationSchedule, Hand, LearningRule,
    ReturnPropagation, State, UpdateRule,
};

/// Totals up to this value can never lose anything by taking another card.
const ALWAYS_HIT_UP_TO: u32 = 11;
const DEALER_STANDS_FROM: u32 = 17;

/// A player's way of choosing actions and of reacting once a game is over.
///
/// The environment model and the random generator belong to the caller and are lent
/// for each call, so several strategies can share one model during a run.
pub trait PlayerStrategy {
    fn decide<R: Rng + ?Sized>(
        &mut self,
        model: &EnvironmentModel,
        player_hand: &Hand,
        dealer_up_card: Card,
        rng: &mut R,
    ) -> crate::Result<Action>;

    fn update(
        &mut self,
        model: &mut EnvironmentModel,
        trace: &EpisodeTrace,
        final_reward: f64,
        discount_factor: f64,
    );
}

/// Values of both actions for the hand, or None when the hand is too small to stand on.
fn lookup_action_values(
    model: &EnvironmentModel,
    player_hand: &Hand,
    dealer_up_card: Card,
) -> crate::Result<Option<(State, f64, f64)>> {
    if matches!(player_hand.best_total(), Some(total) if total <= ALWAYS_HIT_UP_TO) {
        return Ok(None);
    }
    let state = State::encode(player_hand, dealer_up_card)?;
    let hit_value = model.get_value(state, Action::Hit);
    let stand_value = model.get_value(state, Action::Stand);
    Ok(Some((state, hit_value, stand_value)))
}

fn stand_at_random<R: Rng + ?Sized>(probability_of_stand: f64, rng: &mut R) -> Action {
    if rng.gen::<f64>() <= probability_of_stand {
        Action::Stand
    } else {
        Action::Hit
    }
}

fn choose_greedily<R: Rng + ?Sized>(
    hit_value: f64,
    stand_value: f64,
    probability_of_stand: f64,
    rng: &mut R,
) -> Action {
    if stand_value > hit_value {
        Action::Stand
    } else if stand_value == hit_value {
        stand_at_random(probability_of_stand, rng)
    } else {
        Action::Hit
    }
}

/// Plays greedily on the current table and never learns.
#[derive(Debug, Clone)]
pub struct FixedThresholdStrategy {
    probability_of_stand: f64,
}

impl FixedThresholdStrategy {
    pub fn new(probability_of_stand: f64) -> Self {
        FixedThresholdStrategy {
            probability_of_stand,
        }
    }
}

impl PlayerStrategy for FixedThresholdStrategy {
    fn decide<R: Rng + ?Sized>(
        &mut self,
        model: &EnvironmentModel,
        player_hand: &Hand,
        dealer_up_card: Card,
        rng: &mut R,
    ) -> crate::Result<Action> {
        let action = match lookup_action_values(model, player_hand, dealer_up_card)? {
            None => Action::Hit,
            Some((_, hit_value, stand_value)) => {
                choose_greedily(hit_value, stand_value, self.probability_of_stand, rng)
            }
        };
        Ok(action)
    }

    fn update(
        &mut self,
        _model: &mut EnvironmentModel,
        _trace: &EpisodeTrace,
        _final_reward: f64,
        _discount_factor: f64,
    ) {
    }
}

/// Explores with probability epsilon and otherwise plays greedily. Learns from every
/// finished episode by Monte Carlo credit assignment.
#[derive(Debug, Clone)]
pub struct EpsilonGreedyLearningStrategy {
    rule: LearningRule,
    completed_episodes: u64,
    /// Explorations of the running episode, written to the model by `update`.
    explorations: Vec<(State, Action)>,
}

impl EpsilonGreedyLearningStrategy {
    pub fn new(rule: &LearningRule) -> Self {
        EpsilonGreedyLearningStrategy {
            rule: *rule,
            completed_episodes: 0,
            explorations: Vec::new(),
        }
    }

    pub fn current_epsilon(&self) -> f64 {
        match self.rule.exploration_schedule {
            ExplorationSchedule::Constant => self.rule.epsilon,
            ExplorationSchedule::Harmonic => 1.0 / (1 + self.completed_episodes) as f64,
        }
    }

    pub fn get_completed_episodes(&self) -> u64 {
        self.completed_episodes
    }

    fn updated_value(&self, value: f64, visits: u32, sampled_return: f64) -> f64 {
        match self.rule.update_rule {
            UpdateRule::SampleMean => value + (sampled_return - value) / (visits + 1) as f64,
            UpdateRule::FixedLearningRate => {
                value + self.rule.learning_rate * (sampled_return - value)
            }
            UpdateRule::DecayedLearningRate => {
                let rate = self.rule.learning_rate;
                (1.0 - rate) * value + rate * (sampled_return - value)
            }
        }
    }
}

impl PlayerStrategy for EpsilonGreedyLearningStrategy {
    fn decide<R: Rng + ?Sized>(
        &mut self,
        model: &EnvironmentModel,
        player_hand: &Hand,
        dealer_up_card: Card,
        rng: &mut R,
    ) -> crate::Result<Action> {
        let (state, hit_value, stand_value) =
            match lookup_action_values(model, player_hand, dealer_up_card)? {
                None => return Ok(Action::Hit),
                Some(values) => values,
            };

        if rng.gen::<f64>() <= self.current_epsilon() {
            let action = stand_at_random(self.rule.probability_of_stand, rng);
            log::trace!("exploring {:?} in {:?}", action, state);
            self.explorations.push((state, action));
            Ok(action)
        } else {
            Ok(choose_greedily(
                hit_value,
                stand_value,
                self.rule.probability_of_stand,
                rng,
            ))
        }
    }

    fn update(
        &mut self,
        model: &mut EnvironmentModel,
        trace: &EpisodeTrace,
        final_reward: f64,
        discount_factor: f64,
    ) {
        // No intermediate rewards, so discounting only decays the terminal reward.
        let mut discounted_return = final_reward;
        for &(state, action) in trace.iter().rev() {
            let value = model.get_value(state, action);
            let visits = model.get_visits(state, action);
            let new_value = self.updated_value(value, visits, discounted_return);
            model.set_value(state, action, new_value);
            model.increment_visits(state, action);

            discounted_return = match self.rule.return_propagation {
                ReturnPropagation::TerminalReward => discounted_return * discount_factor,
                ReturnPropagation::UpdatedValue => new_value * discount_factor,
            };
        }

        for (state, action) in self.explorations.drain(..) {
            model.increment_explores(state, action);
        }
        self.completed_episodes += 1;
    }
}

/// The house rule: draw until reaching 17, standing on soft 17.
#[derive(Debug, Clone, Copy, Default)]
pub struct DealerPolicy;

impl DealerPolicy {
    pub fn act(&self, dealer_hand: &Hand) -> Action {
        match dealer_hand.best_total() {
            Some(total) if total < DEALER_STANDS_FROM => Action::Hit,
            // A bust hand has nothing left to play.
            _ => Action::Stand,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Card as C;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stand_favouring_model(hand: &Hand, dealer_up_card: C) -> EnvironmentModel {
        let mut model = EnvironmentModel::new();
        let total = hand.best_total().unwrap() as u8;
        let up = dealer_up_card.max_value() as u8;
        for usable_ace in [false, true] {
            let state = State::new(total, up, usable_ace);
            model.set_value(state, Action::Stand, 1.0);
            model.set_value(state, Action::Hit, -1.0);
        }
        model
    }

    #[test]
    fn small_totals_always_hit() {
        let mut rng = StdRng::seed_from_u64(7);
        let hands = [
            vec![C::Ace],
            vec![C::Two, C::Nine],
            vec![C::Two, C::Three],
            vec![],
            vec![C::King],
        ];
        let rule = LearningRule {
            epsilon: 1.0,
            probability_of_stand: 1.0,
            ..Default::default()
        };
        for cards in hands {
            let hand = Hand::from_cards(&cards);
            let model = stand_favouring_model(&hand, C::Jack);
            let mut fixed = FixedThresholdStrategy::new(1.0);
            let mut learning = EpsilonGreedyLearningStrategy::new(&rule);
            for _ in 0..20 {
                assert_eq!(
                    fixed.decide(&model, &hand, C::Jack, &mut rng),
                    Ok(Action::Hit)
                );
                assert_eq!(
                    learning.decide(&model, &hand, C::Jack, &mut rng),
                    Ok(Action::Hit)
                );
            }
        }
    }

    #[test]
    fn small_totals_draw_nothing_from_generator() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut untouched = StdRng::seed_from_u64(11);
        let mut learning = EpsilonGreedyLearningStrategy::new(&LearningRule::default());
        let hand = Hand::from_cards(&[C::Five, C::Six]);
        learning
            .decide(&EnvironmentModel::new(), &hand, C::Two, &mut rng)
            .unwrap();
        assert_eq!(rng.gen::<u64>(), untouched.gen::<u64>());
    }

    #[test]
    fn fixed_strategy_follows_table() {
        let mut rng = StdRng::seed_from_u64(3);
        let hand = Hand::from_cards(&[C::Ten, C::Eight]);
        let state = State::encode(&hand, C::Six).unwrap();
        let mut model = EnvironmentModel::new();
        let mut strategy = FixedThresholdStrategy::new(0.5);

        model.set_value(state, Action::Stand, 0.4);
        model.set_value(state, Action::Hit, -0.2);
        assert_eq!(strategy.decide(&model, &hand, C::Six, &mut rng), Ok(Action::Stand));

        model.set_value(state, Action::Hit, 0.6);
        assert_eq!(strategy.decide(&model, &hand, C::Six, &mut rng), Ok(Action::Hit));
    }

    #[test]
    fn ties_are_broken_by_probability_of_stand() {
        let mut rng = StdRng::seed_from_u64(5);
        let hand = Hand::from_cards(&[C::Ten, C::Four]);
        let model = EnvironmentModel::new();
        let mut always_stand = FixedThresholdStrategy::new(1.0);
        let mut never_stand = FixedThresholdStrategy::new(-1.0);
        for _ in 0..20 {
            assert_eq!(always_stand.decide(&model, &hand, C::Two, &mut rng), Ok(Action::Stand));
            assert_eq!(never_stand.decide(&model, &hand, C::Two, &mut rng), Ok(Action::Hit));
        }
    }

    #[test]
    fn fixed_strategy_does_not_learn() {
        let mut model = EnvironmentModel::new();
        let trace = vec![(State::new(15, 10, false), Action::Stand)];
        FixedThresholdStrategy::new(0.5).update(&mut model, &trace, 1.0, 1.0);
        assert!(model.is_empty());
        assert_eq!(model.get_visits(trace[0].0, Action::Stand), 0);
    }

    #[test]
    fn sample_mean_update_averages_returns() {
        let mut model = EnvironmentModel::new();
        let mut strategy = EpsilonGreedyLearningStrategy::new(&LearningRule::default());
        let state = State::new(19, 10, false);
        let trace = vec![(state, Action::Stand)];

        strategy.update(&mut model, &trace, 1.0, 1.0);
        assert_eq!(model.get_value(state, Action::Stand), 1.0);
        assert_eq!(model.get_visits(state, Action::Stand), 1);

        strategy.update(&mut model, &trace, 1.0, 1.0);
        assert_eq!(model.get_value(state, Action::Stand), 1.0);
        assert_eq!(model.get_visits(state, Action::Stand), 2);

        strategy.update(&mut model, &trace, -1.0, 1.0);
        assert!((model.get_value(state, Action::Stand) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(strategy.get_completed_episodes(), 3);
    }

    #[test]
    fn credit_decays_backwards_along_trace() {
        let mut model = EnvironmentModel::new();
        let mut strategy = EpsilonGreedyLearningStrategy::new(&LearningRule::default());
        let first = State::new(12, 5, false);
        let second = State::new(16, 5, false);
        let last = State::new(20, 5, false);
        let trace = vec![(first, Action::Hit), (second, Action::Hit), (last, Action::Stand)];

        strategy.update(&mut model, &trace, -1.0, 0.5);
        assert_eq!(model.get_value(last, Action::Stand), -1.0);
        assert_eq!(model.get_value(second, Action::Hit), -0.5);
        assert_eq!(model.get_value(first, Action::Hit), -0.25);
    }

    #[test]
    fn fixed_learning_rate_blends_towards_return() {
        let rule = LearningRule {
            update_rule: UpdateRule::FixedLearningRate,
            learning_rate: 0.25,
            ..Default::default()
        };
        let mut model = EnvironmentModel::new();
        let mut strategy = EpsilonGreedyLearningStrategy::new(&rule);
        let state = State::new(17, 8, true);
        let trace = vec![(state, Action::Hit)];

        strategy.update(&mut model, &trace, 1.0, 1.0);
        assert_eq!(model.get_value(state, Action::Hit), 0.25);
        strategy.update(&mut model, &trace, 1.0, 1.0);
        assert_eq!(model.get_value(state, Action::Hit), 0.4375);
        assert_eq!(model.get_visits(state, Action::Hit), 2);
    }

    #[test]
    fn decayed_learning_rate_shrinks_old_value() {
        let rule = LearningRule {
            update_rule: UpdateRule::DecayedLearningRate,
            learning_rate: 0.25,
            ..Default::default()
        };
        let mut model = EnvironmentModel::new();
        let mut strategy = EpsilonGreedyLearningStrategy::new(&rule);
        let state = State::new(15, 10, false);
        let trace = vec![(state, Action::Stand)];

        strategy.update(&mut model, &trace, 1.0, 1.0);
        assert_eq!(model.get_value(state, Action::Stand), 0.25);
        // 0.75 * 0.25 + 0.25 * (1 - 0.25)
        strategy.update(&mut model, &trace, 1.0, 1.0);
        assert_eq!(model.get_value(state, Action::Stand), 0.375);
    }

    #[test]
    fn updated_value_propagation_discounts_new_value() {
        let rule = LearningRule {
            update_rule: UpdateRule::FixedLearningRate,
            learning_rate: 0.5,
            return_propagation: ReturnPropagation::UpdatedValue,
            ..Default::default()
        };
        let mut model = EnvironmentModel::new();
        let mut strategy = EpsilonGreedyLearningStrategy::new(&rule);
        let earlier = State::new(13, 4, false);
        let later = State::new(18, 4, false);
        let trace = vec![(earlier, Action::Hit), (later, Action::Stand)];

        strategy.update(&mut model, &trace, 1.0, 0.5);
        // later: 0 + 0.5 * (1 - 0) = 0.5, then the earlier step sees 0.5 * 0.5
        assert_eq!(model.get_value(later, Action::Stand), 0.5);
        assert_eq!(model.get_value(earlier, Action::Hit), 0.125);
    }

    #[test]
    fn explorations_are_counted_on_update() {
        let rule = LearningRule {
            epsilon: 1.0,
            probability_of_stand: 1.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(13);
        let mut model = EnvironmentModel::new();
        let mut strategy = EpsilonGreedyLearningStrategy::new(&rule);
        let hand = Hand::from_cards(&[C::Ten, C::Five]);
        let action = strategy.decide(&model, &hand, C::Nine, &mut rng).unwrap();
        assert_eq!(action, Action::Stand);

        let state = State::encode(&hand, C::Nine).unwrap();
        assert_eq!(model.get_explores(state, Action::Stand), 0);
        strategy.update(&mut model, &vec![(state, action)], 0.0, 1.0);
        assert_eq!(model.get_explores(state, Action::Stand), 1);
    }

    #[test]
    fn harmonic_schedule_decays_epsilon() {
        let rule = LearningRule {
            exploration_schedule: ExplorationSchedule::Harmonic,
            ..Default::default()
        };
        let mut model = EnvironmentModel::new();
        let mut strategy = EpsilonGreedyLearningStrategy::new(&rule);
        assert_eq!(strategy.current_epsilon(), 1.0);
        strategy.update(&mut model, &vec![], 0.0, 1.0);
        assert_eq!(strategy.current_epsilon(), 0.5);
        strategy.update(&mut model, &vec![], 0.0, 1.0);
        assert!((strategy.current_epsilon() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn dealer_stands_on_soft_seventeen() {
        let dealer = DealerPolicy;
        assert_eq!(dealer.act(&Hand::from_cards(&[C::Ace, C::Six])), Action::Stand);
        assert_eq!(dealer.act(&Hand::from_cards(&[C::Ten, C::Six])), Action::Hit);
        assert_eq!(dealer.act(&Hand::from_cards(&[C::Ten, C::Seven])), Action::Stand);
        assert_eq!(dealer.act(&Hand::from_cards(&[C::Ace])), Action::Hit);
        assert_eq!(dealer.act(&Hand::from_cards(&[C::Ace, C::Five, C::Ten])), Action::Hit);
        assert_eq!(dealer.act(&Hand::from_cards(&[C::Ace, C::Six, C::Ten])), Action::Stand);
    }
}
