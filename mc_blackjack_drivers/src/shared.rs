use anyhow::{anyhow, Context};
use mc_blackjack::{
    ExplorationSchedule, InitialHand, LearningRule, ReturnPropagation, UpdateRule,
};
use serde::{Deserialize, Serialize};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub learning: ConfigLearning,
    pub training: ConfigTraining,
    #[serde(default)]
    pub logging: ConfigLogging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigLearning {
    /// One training run is made for every exploration rate listed here.
    pub epsilons: Vec<f64>,
    pub probability_of_stand: f64,
    pub discount_factor: f64,
    pub update_rule: String,
    pub learning_rate: f64,
    pub return_propagation: String,
    pub exploration_schedule: String,
}

impl ConfigLearning {
    /// Builds one learning rule per configured epsilon.
    pub fn learning_rules(&self) -> Result<Vec<LearningRule>, serde::de::value::Error> {
        let update_rule: UpdateRule = self.update_rule.parse()?;
        let return_propagation: ReturnPropagation = self.return_propagation.parse()?;
        let exploration_schedule: ExplorationSchedule = self.exploration_schedule.parse()?;

        let rules = self
            .epsilons
            .iter()
            .map(|epsilon| LearningRule {
                epsilon: *epsilon,
                probability_of_stand: self.probability_of_stand,
                update_rule,
                learning_rate: self.learning_rate,
                return_propagation,
                exploration_schedule,
            })
            .collect();
        Ok(rules)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize_enum_str, Deserialize_enum_str)]
pub enum StrategyKind {
    EpsilonGreedy,
    FixedThreshold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigTraining {
    pub seed: u64,
    /// One training run is made for every episode count listed here.
    pub episode_counts: Vec<u64>,
    pub initial_hand: String,
    pub progress_interval: u64,
    pub evaluation_episodes: u64,
    pub strategy: String,
}

impl ConfigTraining {
    pub fn get_initial_hand(&self) -> Result<InitialHand, serde::de::value::Error> {
        Ok(self.initial_hand.parse()?)
    }

    pub fn get_strategy_kind(&self) -> Result<StrategyKind, serde::de::value::Error> {
        Ok(self.strategy.parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigLogging {
    pub level: String,
    /// Also write the log to this file when set.
    pub file: Option<String>,
}

impl Default for ConfigLogging {
    fn default() -> Self {
        ConfigLogging {
            level: String::from("info"),
            file: None,
        }
    }
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file(filename: &str) -> anyhow::Result<Config> {
    let file_content =
        fs::read_to_string(filename).with_context(|| format!("cannot read {}", filename))?;
    parse_config(&file_content).with_context(|| format!("cannot parse {}", filename))
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    Ok(serde_yaml::from_str(content)?)
}

/// Logs to the terminal, and to a file as well when the config names one.
pub fn init_logging(config: &ConfigLogging) -> anyhow::Result<()> {
    let level: log::LevelFilter = config
        .level
        .parse()
        .map_err(|_| anyhow!("unknown log level {}", config.level))?;
    let log_config = ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        log_config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = &config.file {
        let file = fs::File::create(path).with_context(|| format!("cannot create {}", path))?;
        loggers.push(WriteLogger::new(level, log_config, file));
    }
    CombinedLogger::init(loggers).map_err(|_| anyhow!("logger already initialized"))
}
