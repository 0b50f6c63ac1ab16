pub mod hand;
pub mod simulation;
mod statearray;
pub mod strategy;

use serde::{Deserialize, Serialize};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use thiserror::Error;

pub use hand::{all_values, is_bust, nonbusting_values, Card, Hand, BUST_FROM};
pub use simulation::{EpisodeSimulator, GamePhase, InitialHand};
pub use statearray::{EnvironmentModel, State, StateActionArray};
pub use strategy::{DealerPolicy, EpsilonGreedyLearningStrategy, FixedThresholdStrategy, PlayerStrategy};

pub type Result<T> = std::result::Result<T, BlackjackError>;

/// Ordered (state, action) pairs the player went through during one episode.
pub type EpisodeTrace = Vec<(State, Action)>;

/// Contract violations. None of them is recoverable: a correct caller never sees one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlackjackError {
    #[error("cannot encode a state for bust hand [{0}]")]
    InvalidHand(String),
    #[error("unknown card rank index {0}")]
    UnknownCard(u8),
    #[error("the game has not yet ended, current phase is {0:?}")]
    NonTerminalOutcome(GamePhase),
    #[error("{operation} is only allowed in {expected:?} phase, current phase is {actual:?}")]
    PhaseViolation {
        operation: &'static str,
        expected: GamePhase,
        actual: GamePhase,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Hit,
    Stand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameOutcome {
    PlayerWon,
    DealerWon,
    Draw,
}

impl GameOutcome {
    /// Terminal reward from the player's point of view.
    pub fn reward(&self) -> f64 {
        match self {
            GameOutcome::PlayerWon => 1.0,
            GameOutcome::DealerWon => -1.0,
            GameOutcome::Draw => 0.0,
        }
    }
}

/// How a learning strategy folds a sampled return into the stored action value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize_enum_str, Deserialize_enum_str)]
pub enum UpdateRule {
    /// `new = old + (return - old) / (visits + 1)`
    SampleMean,
    /// `new = old + learning_rate * (return - old)`
    FixedLearningRate,
    /// `new = (1 - learning_rate) * old + learning_rate * (return - old)`
    ///
    /// Shrinks the old value twice, so it settles at half the expected return.
    DecayedLearningRate,
}

/// What gets discounted when credit moves one step back along the trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize_enum_str, Deserialize_enum_str)]
pub enum ReturnPropagation {
    /// The running return, starting from the terminal reward.
    TerminalReward,
    /// The value that was just written for the later step.
    UpdatedValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize_enum_str, Deserialize_enum_str)]
pub enum ExplorationSchedule {
    /// Explore with the configured epsilon for the whole run.
    Constant,
    /// Explore with probability `1 / (1 + completed episodes)`.
    Harmonic,
}

#[derive(Clone, Copy, Debug)]
pub struct LearningRule {
    pub epsilon: f64,
    pub probability_of_stand: f64,
    pub update_rule: UpdateRule,
    pub learning_rate: f64,
    pub return_propagation: ReturnPropagation,
    pub exploration_schedule: ExplorationSchedule,
}

impl Default for LearningRule {
    fn default() -> Self {
        LearningRule {
            epsilon: 0.1,
            probability_of_stand: 0.5,
            update_rule: UpdateRule::SampleMean,
            learning_rate: 0.1,
            return_propagation: ReturnPropagation::TerminalReward,
            exploration_schedule: ExplorationSchedule::Constant,
        }
    }
}
