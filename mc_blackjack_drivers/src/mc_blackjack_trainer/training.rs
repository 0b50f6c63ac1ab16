use mc_blackjack::{
    EnvironmentModel, EpisodeSimulator, FixedThresholdStrategy, GameOutcome, InitialHand,
    PlayerStrategy,
};
use rand::rngs::StdRng;

mod private {
    use mc_blackjack::GameOutcome;

    /// Running mean and variance of the player-win indicator over decided games.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct WinRate {
        decided_games: u64,
        mean: f64,
        sum_of_squares: f64,
    }

    impl WinRate {
        pub fn record(&mut self, outcome: GameOutcome) {
            let won = match outcome {
                GameOutcome::PlayerWon => 1.0,
                GameOutcome::DealerWon => 0.0,
                GameOutcome::Draw => return,
            };
            self.decided_games += 1;
            let delta = won - self.mean;
            self.mean += delta / self.decided_games as f64;
            self.sum_of_squares += delta * (won - self.mean);
        }

        pub fn get_mean(&self) -> f64 {
            self.mean
        }

        pub fn get_std(&self) -> f64 {
            if self.decided_games == 0 {
                0.0
            } else {
                (self.sum_of_squares / self.decided_games as f64).sqrt()
            }
        }
    }
}

use self::private::WinRate;

#[derive(Debug, Clone, Default)]
pub struct TrainingStatistics {
    player_wins: u64,
    dealer_wins: u64,
    draws: u64,
    total_reward: f64,
    outcomes: Vec<GameOutcome>,
    win_rate: WinRate,
}

impl TrainingStatistics {
    pub fn record(&mut self, outcome: GameOutcome) {
        match outcome {
            GameOutcome::PlayerWon => self.player_wins += 1,
            GameOutcome::DealerWon => self.dealer_wins += 1,
            GameOutcome::Draw => self.draws += 1,
        }
        self.total_reward += outcome.reward();
        self.outcomes.push(outcome);
        self.win_rate.record(outcome);
    }

    pub fn get_outcomes(&self) -> &[GameOutcome] {
        &self.outcomes
    }

    pub fn get_counts(&self) -> (u64, u64, u64) {
        (self.player_wins, self.dealer_wins, self.draws)
    }

    /// Share of player wins among games that were not drawn.
    pub fn get_win_average(&self) -> f64 {
        self.win_rate.get_mean()
    }

    pub fn get_win_std(&self) -> f64 {
        self.win_rate.get_std()
    }

    pub fn get_average_reward(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.total_reward / self.outcomes.len() as f64
        }
    }
}

/// Owns everything one training run needs: the learned table and a seeded simulator.
pub struct Trainer {
    model: EnvironmentModel,
    simulator: EpisodeSimulator<StdRng>,
    discount_factor: f64,
    progress_interval: u64,
}

impl Trainer {
    pub fn new(
        initial_hand: InitialHand,
        seed: u64,
        discount_factor: f64,
        progress_interval: u64,
    ) -> Self {
        Trainer {
            model: EnvironmentModel::new(),
            simulator: EpisodeSimulator::with_seed(initial_hand, seed),
            discount_factor,
            progress_interval,
        }
    }

    /// Plays the given number of episodes, letting the strategy learn after each one.
    pub fn train<S: PlayerStrategy>(
        &mut self,
        strategy: &mut S,
        episodes: u64,
    ) -> mc_blackjack::Result<TrainingStatistics> {
        log::info!("{:<32}{:<32}", "beginning training loop", episodes);
        let mut statistics = TrainingStatistics::default();
        for episode in 1..=episodes {
            let (outcome, trace) = self.simulator.run_episode(strategy, &self.model)?;
            let final_reward = self.simulator.player_reward()?;
            strategy.update(&mut self.model, &trace, final_reward, self.discount_factor);
            statistics.record(outcome);

            if self.progress_interval > 0 && episode % self.progress_interval == 0 {
                log::info!(
                    "average player wins/dealer wins: {:.5} standard deviation: {:.3E}",
                    statistics.get_win_average(),
                    statistics.get_win_std()
                );
                log::info!(
                    "completed episodes {} out of {}, {} state-action values",
                    episode,
                    episodes,
                    self.model.len()
                );
            }
        }
        Ok(statistics)
    }

    /// Plays greedily on the learned table without changing it.
    pub fn evaluate(
        &mut self,
        probability_of_stand: f64,
        episodes: u64,
    ) -> mc_blackjack::Result<TrainingStatistics> {
        let mut strategy = FixedThresholdStrategy::new(probability_of_stand);
        let mut statistics = TrainingStatistics::default();
        for _ in 0..episodes {
            let (outcome, _) = self.simulator.run_episode(&mut strategy, &self.model)?;
            statistics.record(outcome);
        }
        log::info!(
            "evaluation over {} episodes: average reward {:.5}",
            episodes,
            statistics.get_average_reward()
        );
        Ok(statistics)
    }

    pub fn get_model(&self) -> &EnvironmentModel {
        &self.model
    }
}
