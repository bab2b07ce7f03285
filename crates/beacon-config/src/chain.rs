use std::{fmt, path::Path, time::Duration};

use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::Config;

/// Named set of chain parameters used when a key is absent from the configuration.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Mainnet,
    Minimal,
}

impl Preset {
    pub const fn genesis_time(&self) -> Option<u64> {
        match self {
            Preset::Mainnet => Some(1_606_824_023),
            Preset::Minimal => None,
        }
    }

    pub const fn seconds_per_slot(&self) -> u64 {
        match self {
            Preset::Mainnet => 12,
            Preset::Minimal => 6,
        }
    }

    pub const fn slots_per_epoch(&self) -> u64 {
        match self {
            Preset::Mainnet => 32,
            Preset::Minimal => 8,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Mainnet => write!(f, "mainnet"),
            Preset::Minimal => write!(f, "minimal"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("No genesis time configured for the {0} preset")]
    MissingGenesisTime(Preset),

    #[error("Slot duration must be greater than zero")]
    ZeroSlotDuration,

    #[error("Slots per epoch must be greater than zero")]
    ZeroSlotsPerEpoch,
}

/// Chain time parameters, read from the `[chain]` section of `config.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ChainConfig {
    /// Preset supplying the parameters that are not set explicitly
    #[serde(default)]
    pub preset: Preset,

    /// Genesis time, in seconds since the UNIX epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_time: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_per_slot: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots_per_epoch: Option<u64>,

    /// Tolerance for peer clock skew, in milliseconds
    #[serde(default = "ChainConfig::default_maximum_gossip_clock_disparity_ms")]
    pub maximum_gossip_clock_disparity_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            preset: Preset::default(),
            genesis_time: None,
            seconds_per_slot: None,
            slots_per_epoch: None,
            maximum_gossip_clock_disparity_ms: Self::MAXIMUM_GOSSIP_CLOCK_DISPARITY_MS,
        }
    }
}

impl ChainConfig {
    pub const MAXIMUM_GOSSIP_CLOCK_DISPARITY_MS: u64 = 500;

    const fn default_maximum_gossip_clock_disparity_ms() -> u64 {
        Self::MAXIMUM_GOSSIP_CLOCK_DISPARITY_MS
    }

    pub fn genesis_time(&self) -> Option<u64> {
        self.genesis_time.or(self.preset.genesis_time())
    }

    pub fn seconds_per_slot(&self) -> u64 {
        self.seconds_per_slot
            .unwrap_or(self.preset.seconds_per_slot())
    }

    pub fn slots_per_epoch(&self) -> u64 {
        self.slots_per_epoch
            .unwrap_or(self.preset.slots_per_epoch())
    }

    pub fn maximum_gossip_clock_disparity(&self) -> Duration {
        Duration::from_millis(self.maximum_gossip_clock_disparity_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.genesis_time().is_none() {
            return Err(ConfigError::MissingGenesisTime(self.preset));
        }

        if self.seconds_per_slot() == 0 {
            return Err(ConfigError::ZeroSlotDuration);
        }

        if self.slots_per_epoch() == 0 {
            return Err(ConfigError::ZeroSlotsPerEpoch);
        }

        Ok(())
    }
}

impl Config for ChainConfig {
    type Output = ChainConfig;

    fn load_from_file(figment: Figment, home: &Path) -> Figment {
        let home = home.join("config.toml");

        let chain = Figment::new()
            .merge(Toml::file(home).nested())
            .select("chain");

        figment.merge(chain)
    }

    fn load_context(figment: Figment) -> Result<Self::Output, figment::Error> {
        figment.extract()
    }

    fn profile() -> String {
        "chain".to_string()
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use rstest::rstest;
    use serde::Serialize;

    use super::*;
    use crate::load_chain_config;

    #[derive(Serialize, Default)]
    #[serde(rename_all = "kebab-case")]
    struct Overrides {
        #[serde(skip_serializing_if = "Option::is_none")]
        genesis_time: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        seconds_per_slot: Option<u64>,
    }

    #[test]
    fn missing_file_falls_back_to_mainnet() {
        Jail::expect_with(|jail| {
            let config = ChainConfig::load(jail.directory(), None::<Overrides>)?;

            assert_eq!(config.preset, Preset::Mainnet);
            assert_eq!(config.genesis_time(), Some(1_606_824_023));
            assert_eq!(config.seconds_per_slot(), 12);
            assert_eq!(config.slots_per_epoch(), 32);
            assert_eq!(
                config.maximum_gossip_clock_disparity(),
                Duration::from_millis(500)
            );

            Ok(())
        });
    }

    #[test]
    fn explicit_keys_override_the_preset() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [chain]
                preset = "minimal"
                genesis-time = 42
                slots-per-epoch = 4
                maximum-gossip-clock-disparity-ms = 250
                "#,
            )?;

            let config = ChainConfig::load(jail.directory(), None::<Overrides>)?;

            assert_eq!(config.preset, Preset::Minimal);
            assert_eq!(config.genesis_time(), Some(42));
            assert_eq!(config.seconds_per_slot(), 6);
            assert_eq!(config.slots_per_epoch(), 4);
            assert_eq!(config.maximum_gossip_clock_disparity_ms, 250);

            Ok(())
        });
    }

    #[test]
    fn command_line_overrides_the_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [chain]
                genesis-time = 42
                seconds-per-slot = 2
                "#,
            )?;

            let overrides = Overrides {
                seconds_per_slot: Some(3),
                ..Default::default()
            };
            let config = ChainConfig::load(jail.directory(), Some(overrides))?;

            assert_eq!(config.genesis_time(), Some(42));
            assert_eq!(config.seconds_per_slot(), 3);

            Ok(())
        });
    }

    #[test]
    fn minimal_preset_requires_a_genesis_time() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[chain]\npreset = \"minimal\"")?;

            let result = load_chain_config(jail.directory(), None::<Overrides>);
            assert!(matches!(
                result,
                Err(ConfigError::MissingGenesisTime(Preset::Minimal))
            ));

            let overrides = Overrides {
                genesis_time: Some(7),
                ..Default::default()
            };
            let config = load_chain_config(jail.directory(), Some(overrides))
                .expect("Genesis time provided on the command line");
            assert_eq!(config.genesis_time(), Some(7));

            Ok(())
        });
    }

    #[rstest]
    #[case(Some(0), None)]
    #[case(None, Some(0))]
    fn zero_durations_are_rejected(
        #[case] seconds_per_slot: Option<u64>,
        #[case] slots_per_epoch: Option<u64>,
    ) {
        let config = ChainConfig {
            seconds_per_slot,
            slots_per_epoch,
            ..Default::default()
        };

        match (seconds_per_slot, config.validate()) {
            (Some(_), Err(ConfigError::ZeroSlotDuration)) => {}
            (None, Err(ConfigError::ZeroSlotsPerEpoch)) => {}
            (_, result) => panic!("Unexpected validation result: {result:?}"),
        }
    }

    #[test]
    fn config_is_written_back_as_toml() {
        let config = ChainConfig {
            genesis_time: Some(42),
            ..Default::default()
        };

        let table = config.to_toml().expect("Unable to serialize the config");

        assert_eq!(table["preset"].as_str(), Some("mainnet"));
        assert_eq!(table["genesis-time"].as_integer(), Some(42));
        assert!(!table.contains_key("seconds-per-slot"));
    }
}
