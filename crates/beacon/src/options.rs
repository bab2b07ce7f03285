use clap::{Parser, Subcommand};
use std::{ffi::OsString, path::PathBuf};

use crate::components::clock::commands::ClockCommand;

#[derive(Parser, Debug)]
#[clap(name = "beacon", about = "Beacon chain clock CLI")]
pub struct Opt {
    /// Defines the verbosity level
    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true
    )]
    pub(crate) verbose: u8,

    /// Home directory for the configuration
    #[arg(
        long,
        env = "BEACON_HOME",
        default_value = get_default_home(),
        global = true
    )]
    pub(crate) home: PathBuf,

    #[command(subcommand)]
    pub(crate) commands: BeaconCommand,
}

/// If no path is given for the --home argument, we use the default one
/// ~/.config/beacon for a UNIX subsystem
fn get_default_home() -> OsString {
    let mut home = dirs::home_dir().unwrap_or_default();
    home.push(".config");
    home.push("beacon");
    home.into_os_string()
}

#[derive(Subcommand, Debug)]
pub(crate) enum BeaconCommand {
    Clock(ClockCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_and_home_are_global() {
        let opt = Opt::try_parse_from(["beacon", "clock", "-vv", "--home", "/tmp/beacon", "status"])
            .expect("Unable to parse the arguments");

        assert_eq!(opt.verbose, 2);
        assert_eq!(opt.home, PathBuf::from("/tmp/beacon"));
    }
}
