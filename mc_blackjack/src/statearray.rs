use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{Action, BlackjackError, Card, Hand};

/// Number of (state, action) pairs reachable from a non-empty hand:
/// 20 player totals x 10 up card values x 2 ace flags x 2 actions.
pub const STATE_ACTION_CAPACITY: usize = 20 * 10 * 2 * 2;

/// What the player knows when making a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State {
    /// The largest total of the hand that does not bust.
    pub player_total: u8,
    /// Ace counts as 11.
    pub dealer_up_card_value: u8,
    pub usable_ace: bool,
}

impl State {
    pub fn new(player_total: u8, dealer_up_card_value: u8, usable_ace: bool) -> State {
        State {
            player_total,
            dealer_up_card_value,
            usable_ace,
        }
    }

    /// Encodes a hand that has not bust together with the dealer's up card.
    pub fn encode(player_hand: &Hand, dealer_up_card: Card) -> crate::Result<State> {
        let player_total = player_hand
            .best_total()
            .ok_or_else(|| BlackjackError::InvalidHand(player_hand.to_string()))?;
        Ok(State {
            player_total: player_total as u8,
            dealer_up_card_value: dealer_up_card.max_value() as u8,
            usable_ace: player_hand.is_soft(),
        })
    }
}

/// This struct provides a convenient way to use (State, Action) as the index of a
/// table whose absent entries read as `T::default()`.
#[derive(Debug, Default, Clone)]
pub struct StateActionArray<T: Default + Copy> {
    data: HashMap<(State, Action), T>,
}

impl<T: Default + Copy> StateActionArray<T> {
    pub fn new() -> StateActionArray<T> {
        StateActionArray {
            data: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, state: State, action: Action) -> T {
        self.data.get(&(state, action)).copied().unwrap_or_default()
    }

    pub fn get_mut(&mut self, state: State, action: Action) -> &mut T {
        self.data.entry((state, action)).or_default()
    }

    pub fn set(&mut self, state: State, action: Action, value: T) {
        self.data.insert((state, action), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(State, Action), &T)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Everything the player learns during a training run. One instance lives for the
/// whole run; strategies get it by reference.
#[derive(Debug, Clone)]
pub struct EnvironmentModel {
    values: StateActionArray<f64>,
    visits: StateActionArray<u32>,
    explores: StateActionArray<u32>,
}

impl EnvironmentModel {
    pub fn new() -> EnvironmentModel {
        EnvironmentModel {
            values: StateActionArray::with_capacity(STATE_ACTION_CAPACITY),
            visits: StateActionArray::with_capacity(STATE_ACTION_CAPACITY),
            explores: StateActionArray::new(),
        }
    }

    pub fn get_value(&self, state: State, action: Action) -> f64 {
        self.values.get(state, action)
    }

    pub fn set_value(&mut self, state: State, action: Action, value: f64) {
        self.values.set(state, action, value);
    }

    pub fn get_visits(&self, state: State, action: Action) -> u32 {
        self.visits.get(state, action)
    }

    pub fn increment_visits(&mut self, state: State, action: Action) {
        *self.visits.get_mut(state, action) += 1;
    }

    /// How many times the action was picked by exploration rather than greedily.
    pub fn get_explores(&self, state: State, action: Action) -> u32 {
        self.explores.get(state, action)
    }

    pub fn increment_explores(&mut self, state: State, action: Action) {
        *self.explores.get_mut(state, action) += 1;
    }

    /// The action with the larger value. Ties go to Hit.
    pub fn greedy_action(&self, state: State) -> Action {
        if self.get_value(state, Action::Stand) > self.get_value(state, Action::Hit) {
            Action::Stand
        } else {
            Action::Hit
        }
    }

    /// A read-only copy of the learned values, ordered by state then action.
    pub fn snapshot(&self) -> BTreeMap<(State, Action), f64> {
        self.values.iter().map(|(key, value)| (*key, *value)).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for EnvironmentModel {
    fn default() -> Self {
        EnvironmentModel::new()
    }
}
