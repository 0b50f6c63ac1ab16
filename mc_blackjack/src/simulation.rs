pub mod deck;

use mc_blackjack_macros::allowed_phase;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

use crate::strategy::{DealerPolicy, PlayerStrategy};
use crate::{Action, BlackjackError, Card, EnvironmentModel, EpisodeTrace, GameOutcome, Hand, State};

use self::deck::InfiniteDeck;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Start,
    PlayerTurn,
    DealerTurn,
    Settlement,
    Finished,
}

/// The player's hand before the first decision. Fixed for a whole run, since it
/// changes the state of the very first decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize_enum_str, Deserialize_enum_str)]
pub enum InitialHand {
    Empty,
    SingleCard,
}

/// Plays single episodes between one player and the dealer.
///
/// Every card, exploration coin flip and tie-break comes from the one generator owned
/// here, in the order the game asks for them, so a seed fixes the whole run.
pub struct EpisodeSimulator<R: Rng> {
    initial_hand: InitialHand,
    dealer_policy: DealerPolicy,
    deck: InfiniteDeck<R>,

    // Game state
    current_game_phase: GamePhase,
    player_hand: Hand,
    dealer_hand: Hand,
    trace: EpisodeTrace,
    outcome: Option<GameOutcome>,
}

impl EpisodeSimulator<StdRng> {
    pub fn with_seed(initial_hand: InitialHand, seed: u64) -> Self {
        EpisodeSimulator::new(initial_hand, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> EpisodeSimulator<R> {
    pub fn new(initial_hand: InitialHand, rng: R) -> Self {
        EpisodeSimulator {
            initial_hand,
            dealer_policy: DealerPolicy,
            deck: InfiniteDeck::new(rng),
            current_game_phase: GamePhase::Start,
            player_hand: Hand::new(),
            dealer_hand: Hand::new(),
            trace: Vec::new(),
            outcome: None,
        }
    }

    /// Plays one whole episode. Returns the outcome and the states the player went
    /// through, in the order they were visited.
    pub fn run_episode<S: PlayerStrategy>(
        &mut self,
        strategy: &mut S,
        model: &EnvironmentModel,
    ) -> crate::Result<(GameOutcome, EpisodeTrace)> {
        self.new_game();
        self.deal_initial_cards()?;
        while self.current_game_phase == GamePhase::PlayerTurn {
            self.player_plays(strategy, model)?;
        }
        while self.current_game_phase == GamePhase::DealerTurn {
            self.dealer_plays()?;
        }
        if self.current_game_phase == GamePhase::Settlement {
            self.settle()?;
        }

        let outcome = self
            .outcome
            .ok_or(BlackjackError::NonTerminalOutcome(self.current_game_phase))?;
        log::debug!(
            "{:?}: player [{}] dealer [{}]",
            outcome,
            self.player_hand,
            self.dealer_hand
        );
        Ok((outcome, std::mem::take(&mut self.trace)))
    }

    /// Can be called at any phase. Discards both hands and returns to Start phase.
    pub fn new_game(&mut self) {
        self.player_hand.clear();
        self.dealer_hand.clear();
        self.trace.clear();
        self.outcome = None;
        self.current_game_phase = GamePhase::Start;
    }

    /// Can be called at Start phase.
    /// Deals the dealer's only card, which is also the up card, then the player's
    /// initial hand. Returns the up card.
    #[allowed_phase(Start)]
    pub fn deal_initial_cards(&mut self) -> crate::Result<Card> {
        let up_card = self.deck.deal_card()?;
        self.dealer_hand.receive_card(up_card);
        if self.initial_hand == InitialHand::SingleCard {
            let card = self.deck.deal_card()?;
            self.player_hand.receive_card(card);
        }
        self.current_game_phase = GamePhase::PlayerTurn;
        Ok(up_card)
    }

    /// Can be called at PlayerTurn phase.
    /// Asks the strategy for one action and applies it. A bust ends the game, a stand
    /// hands the turn to the dealer.
    #[allowed_phase(PlayerTurn)]
    pub fn player_plays<S: PlayerStrategy>(
        &mut self,
        strategy: &mut S,
        model: &EnvironmentModel,
    ) -> crate::Result<Action> {
        // Only reachable when the phase was moved past Start without dealing.
        let up_card = self.dealer_up_card().ok_or(BlackjackError::PhaseViolation {
            operation: "deal_initial_cards",
            expected: GamePhase::Start,
            actual: self.current_game_phase,
        })?;
        let state = State::encode(&self.player_hand, up_card)?;
        let action = strategy.decide(model, &self.player_hand, up_card, self.deck.rng_mut())?;
        log::trace!("player {:?} in {:?}", action, state);
        self.trace.push((state, action));

        match action {
            Action::Hit => {
                let card = self.deck.deal_card()?;
                self.player_hand.receive_card(card);
                if self.player_hand.is_bust() {
                    self.finish(GameOutcome::DealerWon);
                }
            }
            Action::Stand => self.current_game_phase = GamePhase::DealerTurn,
        }
        Ok(action)
    }

    /// Can be called at DealerTurn phase.
    /// Plays one action by the house rule.
    #[allowed_phase(DealerTurn)]
    pub fn dealer_plays(&mut self) -> crate::Result<Action> {
        let action = self.dealer_policy.act(&self.dealer_hand);
        match action {
            Action::Hit => {
                let card = self.deck.deal_card()?;
                self.dealer_hand.receive_card(card);
                if self.dealer_hand.is_bust() {
                    self.finish(GameOutcome::PlayerWon);
                }
            }
            Action::Stand => self.current_game_phase = GamePhase::Settlement,
        }
        Ok(action)
    }

    /// Can be called at Settlement phase.
    /// Compares the best totals of both hands, neither of which has bust.
    #[allowed_phase(Settlement)]
    pub fn settle(&mut self) -> crate::Result<GameOutcome> {
        let outcome = match self.player_hand.best_total().cmp(&self.dealer_hand.best_total()) {
            std::cmp::Ordering::Greater => GameOutcome::PlayerWon,
            std::cmp::Ordering::Less => GameOutcome::DealerWon,
            std::cmp::Ordering::Equal => GameOutcome::Draw,
        };
        self.finish(outcome);
        Ok(outcome)
    }

    /// The player's terminal reward. Errors until the game is finished.
    pub fn player_reward(&self) -> crate::Result<f64> {
        self.outcome
            .map(|outcome| outcome.reward())
            .ok_or(BlackjackError::NonTerminalOutcome(self.current_game_phase))
    }

    pub fn get_game_phase(&self) -> GamePhase {
        self.current_game_phase
    }

    pub fn get_player_hand(&self) -> &Hand {
        &self.player_hand
    }

    pub fn get_dealer_hand(&self) -> &Hand {
        &self.dealer_hand
    }

    pub fn get_trace(&self) -> &EpisodeTrace {
        &self.trace
    }

    pub fn dealer_up_card(&self) -> Option<Card> {
        self.dealer_hand.get_cards().first().copied()
    }

    fn finish(&mut self, outcome: GameOutcome) {
        self.outcome = Some(outcome);
        self.current_game_phase = GamePhase::Finished;
    }
}
