mod report;
mod training;

use anyhow::{anyhow, Context};
use clap::Parser;
use mc_blackjack::{EpsilonGreedyLearningStrategy, FixedThresholdStrategy, LearningRule};
use mc_blackjack_drivers::{init_logging, parse_config_from_file, Config, StrategyKind};

use self::training::Trainer;

const DEFAULT_CONFIG_PATH: &str = "~/.mc_blackjack.yml";

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG_PATH))]
    config: String,

    /// Overrides the seed of the config file
    #[arg(short, long)]
    seed: Option<u64>,

    /// Trains once for this many episodes instead of the configured counts
    #[arg(short, long)]
    episodes: Option<u64>,
}

fn resolve_config_path(config: String) -> anyhow::Result<String> {
    if config != DEFAULT_CONFIG_PATH {
        return Ok(config);
    }
    let home_dir = home::home_dir().ok_or_else(|| anyhow!("cannot find home directory"))?;
    let config_file_path = home_dir.join(".mc_blackjack.yml");
    if !config_file_path.is_file() {
        return Err(anyhow!("config file {} not found", config_file_path.display()));
    }
    config_file_path
        .to_str()
        .map(String::from)
        .ok_or_else(|| anyhow!("config path is not valid unicode"))
}

fn run_once(config: &Config, episodes: u64, rule: &LearningRule) -> anyhow::Result<()> {
    let initial_hand = config.training.get_initial_hand()?;
    let mut trainer = Trainer::new(
        initial_hand,
        config.training.seed,
        config.learning.discount_factor,
        config.training.progress_interval,
    );

    log::info!(
        "discount factor {}, epsilon {}, episodes {}, seed {}",
        config.learning.discount_factor,
        rule.epsilon,
        episodes,
        config.training.seed
    );
    let strategy_kind = config.training.get_strategy_kind()?;
    let statistics = match strategy_kind {
        StrategyKind::EpsilonGreedy => {
            let mut strategy = EpsilonGreedyLearningStrategy::new(rule);
            trainer.train(&mut strategy, episodes)?
        }
        StrategyKind::FixedThreshold => {
            let mut strategy = FixedThresholdStrategy::new(rule.probability_of_stand);
            trainer.train(&mut strategy, episodes)?
        }
    };
    let (player_wins, dealer_wins, draws) = statistics.get_counts();
    log::info!(
        "{} games: player won {}, dealer won {}, draws {}, average reward {:.5}",
        statistics.get_outcomes().len(),
        player_wins,
        dealer_wins,
        draws,
        statistics.get_average_reward()
    );

    if config.training.evaluation_episodes > 0 {
        trainer.evaluate(rule.probability_of_stand, config.training.evaluation_episodes)?;
    }
    report::policy_table(trainer.get_model()).printstd();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = CommandLineArgs::parse();
    let config_path = resolve_config_path(args.config)?;
    let mut config = parse_config_from_file(&config_path)?;
    if let Some(seed) = args.seed {
        config.training.seed = seed;
    }
    if let Some(episodes) = args.episodes {
        config.training.episode_counts = vec![episodes];
    }
    init_logging(&config.logging)?;

    let rules = config
        .learning
        .learning_rules()
        .context("invalid learning section")?;
    for episodes in &config.training.episode_counts {
        for rule in &rules {
            run_once(&config, *episodes, rule)?;
        }
    }
    Ok(())
}
