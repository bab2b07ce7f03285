pub mod chain;

use std::path::Path;

use figment::providers::Serialized;
use figment::Figment;
use serde::Serialize;

pub use chain::{ChainConfig, ConfigError, Preset};

pub trait Config: Serialize {
    /// The configuration type returned (should be Self).
    type Output;

    /// Load the configuration from a file or multiple files.
    /// The home is the directory where the configuration files are located,
    /// usually $BEACON_HOME.
    fn load_from_file(figment: Figment, home: &Path) -> Figment;

    /// Load the configuration from the context.
    /// Trying to extract the configuration from the figment context.
    fn load_context(figment: Figment) -> Result<Self::Output, figment::Error>;

    /// Return the profile name of the configuration to be used
    /// when generating the file.
    fn profile() -> String;

    /// Convert the configuration to a TOML table.
    fn to_toml(&self) -> Result<toml::Table, toml::ser::Error> {
        toml::Table::try_from(self)
    }

    /// Main function to load the configuration.
    /// It will load the configuration from the file and the command line (if any)
    /// and then extract the configuration from the context in order to build the Config.
    fn load<S: Serialize>(home: &Path, command: Option<S>) -> Result<Self::Output, figment::Error> {
        let mut figment = Figment::new();

        figment = Self::load_from_file(figment, home);

        if let Some(command) = command {
            figment = figment.merge(Serialized::from(command, Self::profile()))
        }

        Self::load_context(figment)
    }
}

/// Load and validate the chain configuration found in `home`, overlaid by `command`.
pub fn load_chain_config<S: Serialize>(
    home: &Path,
    command: Option<S>,
) -> Result<ChainConfig, ConfigError> {
    let config = ChainConfig::load(home, command)?;
    config.validate()?;

    Ok(config)
}
