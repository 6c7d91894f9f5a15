pub mod count;
pub mod report;
pub mod sampler;
pub mod shoe;

use indices::{Game, IndicesError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use count::{CountSystem, LookupCount};
pub use report::{render_report, render_stay_indices, render_surrender_indices};
pub use sampler::{estimate_card_distributions, Sampler, SamplerError};
pub use shoe::{Card, Shoe, Suit};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config value: {0}")]
    Parse(#[from] serde::de::value::Error),

    #[error("invalid sampler config: {0}")]
    Sampler(String),

    #[error("config file {0} does not exist")]
    NotFound(PathBuf),

    #[error("config path {0} is a directory")]
    IsDirectory(PathBuf),

    #[error("cannot find home directory")]
    NoHomeDirectory,

    #[error(transparent)]
    Indices(#[from] IndicesError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rule: ConfigRule,
    pub sampler: ConfigSampler,
}

/// Rules of the game. Anything left out takes the default of `game`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRule {
    pub game: String,
    pub dealer_hit_on_soft17: Option<bool>,
    pub peek_policy: Option<String>,
    pub player_21_always_wins: Option<bool>,
    pub max_hand_length: Option<u8>,
    pub bonus_schedule: Option<Vec<f64>>,
}

impl TryInto<indices::Rule> for ConfigRule {
    type Error = ConfigError;

    fn try_into(self) -> Result<indices::Rule, Self::Error> {
        let game: Game = self.game.parse()?;
        let mut rule = indices::Rule::for_game(game);
        if let Some(dealer_hit_on_soft17) = self.dealer_hit_on_soft17 {
            rule.dealer_hit_on_soft17 = dealer_hit_on_soft17;
        }
        if let Some(peek_policy) = self.peek_policy {
            rule.peek_policy = peek_policy.parse()?;
        }
        if let Some(player_21_always_wins) = self.player_21_always_wins {
            rule.player_21_always_wins = player_21_always_wins;
        }
        if let Some(max_hand_length) = self.max_hand_length {
            rule.max_hand_length = max_hand_length;
        }
        if let Some(bonus_schedule) = self.bonus_schedule {
            rule.bonus_schedule = bonus_schedule;
        }
        rule.validate()?;

        Ok(rule)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSampler {
    pub number_of_decks: u32,
    /// Fraction of the shoe dealt before it is reshuffled.
    pub penetration: f64,
    /// Buckets run from `-count_cap` to `count_cap`.
    pub count_cap: u32,
    /// Buckets per unit of true count. 2 gives half-count buckets.
    pub buckets_per_count: f64,
    /// Samples recorded per bucket.
    pub trials: u64,
    pub max_shoes: u64,
    pub seed: Option<u64>,
    pub count_system: String,
}

impl ConfigSampler {
    pub fn count_system(&self) -> Result<CountSystem, ConfigError> {
        Ok(self.count_system.parse()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.number_of_decks == 0 {
            return Err(ConfigError::Sampler(String::from(
                "number_of_decks must be positive",
            )));
        }
        if !(self.penetration > 0.0 && self.penetration < 1.0) {
            return Err(ConfigError::Sampler(format!(
                "penetration must be in (0, 1), got {}",
                self.penetration
            )));
        }
        if !(self.buckets_per_count.is_finite() && self.buckets_per_count > 0.0) {
            return Err(ConfigError::Sampler(format!(
                "buckets_per_count must be positive, got {}",
                self.buckets_per_count
            )));
        }
        if self.trials == 0 || self.max_shoes == 0 {
            return Err(ConfigError::Sampler(String::from(
                "trials and max_shoes must be positive",
            )));
        }
        self.count_system()?;
        Ok(())
    }
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file(path: &Path) -> Result<Config, ConfigError> {
    let file_content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&file_content)?)
}

/// Expands a leading `~/` to the home directory and checks that the result
/// is a file.
pub fn resolve_config_path(path: &str) -> Result<PathBuf, ConfigError> {
    let resolved = match path.strip_prefix("~/") {
        Some(relative) => home::home_dir()
            .ok_or(ConfigError::NoHomeDirectory)?
            .join(relative),
        None => PathBuf::from(path),
    };
    if !resolved.exists() {
        return Err(ConfigError::NotFound(resolved));
    }
    if resolved.is_dir() {
        return Err(ConfigError::IsDirectory(resolved));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_typical_config_rule() -> ConfigRule {
        ConfigRule {
            game: String::from("Spanish21"),
            dealer_hit_on_soft17: Some(false),
            peek_policy: Some(String::from("UpAce")),
            player_21_always_wins: None,
            max_hand_length: None,
            bonus_schedule: None,
        }
    }

    fn get_typical_config_sampler() -> ConfigSampler {
        ConfigSampler {
            number_of_decks: 6,
            penetration: 0.75,
            count_cap: 4,
            buckets_per_count: 2.0,
            trials: 200,
            max_shoes: 20_000,
            seed: Some(17),
            count_system: String::from("Spanish21"),
        }
    }

    #[test]
    fn can_convert_rule() {
        let config_rule = get_typical_config_rule();
        let converted_rule: indices::Rule = config_rule.try_into().unwrap();
        assert_eq!(converted_rule.game, Game::Spanish21);
        assert!(!converted_rule.dealer_hit_on_soft17);
        assert_eq!(converted_rule.peek_policy, indices::PeekPolicy::UpAce);
        assert!(converted_rule.player_21_always_wins);
        assert_eq!(converted_rule.max_hand_length, 7);
        assert_eq!(converted_rule.payout_for_21(6), 2.0);
    }

    #[test]
    fn should_return_error_when_converting_rule() {
        let mut config_rule = get_typical_config_rule();
        config_rule.peek_policy = Some(String::from("Not a policy"));
        let convert_result: Result<indices::Rule, ConfigError> = config_rule.try_into();
        assert!(matches!(convert_result, Err(ConfigError::Parse(_))));

        let mut config_rule = get_typical_config_rule();
        config_rule.max_hand_length = Some(12);
        let convert_result: Result<indices::Rule, ConfigError> = config_rule.try_into();
        assert!(matches!(
            convert_result,
            Err(ConfigError::Indices(IndicesError::InvalidRule(_)))
        ));
    }

    #[test]
    fn can_parse_yaml_config() {
        let yaml = "
rule:
  game: Blackjack
  dealer_hit_on_soft17: true
sampler:
  number_of_decks: 8
  penetration: 0.8
  count_cap: 14
  buckets_per_count: 2
  trials: 1000
  max_shoes: 100000
  count_system: HiLo
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sampler.count_cap, 14);
        assert_eq!(config.sampler.seed, None);
        assert_eq!(config.sampler.count_system().unwrap(), CountSystem::HiLo);
        assert!(config.sampler.validate().is_ok());

        let rule: indices::Rule = config.rule.try_into().unwrap();
        assert_eq!(rule.game, Game::Blackjack);
        assert!(rule.dealer_hit_on_soft17);
        assert_eq!(rule.peek_policy, indices::PeekPolicy::UpAceOrTen);
    }

    #[test]
    fn should_reject_invalid_sampler_config() {
        let mut config_sampler = get_typical_config_sampler();
        assert!(config_sampler.validate().is_ok());

        config_sampler.penetration = 1.0;
        assert!(matches!(
            config_sampler.validate(),
            Err(ConfigError::Sampler(_))
        ));

        let mut config_sampler = get_typical_config_sampler();
        config_sampler.count_system = String::from("Zen");
        assert!(matches!(
            config_sampler.validate(),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_config_file() {
        let result = resolve_config_path("/nonexistent/indices.yml");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
        let result = resolve_config_path(env!("CARGO_MANIFEST_DIR"));
        assert!(matches!(result, Err(ConfigError::IsDirectory(_))));
    }
}
