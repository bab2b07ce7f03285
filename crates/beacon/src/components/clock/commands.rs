use std::path::PathBuf;

use beacon_config::Preset;
use clap::{Args, Subcommand};
use serde::Serialize;

mod run;
mod status;
mod wait;

pub(crate) use run::Run;
pub(crate) use status::Status;
pub(crate) use wait::Wait;

/// Chain parameters overriding the `[chain]` section of the configuration file
#[derive(Args, Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct ChainArgs {
    /// Preset supplying the parameters that are not set explicitly
    #[arg(long, env = "BEACON_PRESET", value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) preset: Option<Preset>,

    /// Genesis time, in seconds since the UNIX epoch
    #[arg(long, env = "BEACON_GENESIS_TIME")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) genesis_time: Option<u64>,

    #[arg(long, env = "BEACON_SECONDS_PER_SLOT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) seconds_per_slot: Option<u64>,

    #[arg(long, env = "BEACON_SLOTS_PER_EPOCH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) slots_per_epoch: Option<u64>,
}

/// Inspect and follow the chain clock
#[derive(Args, Debug)]
pub(crate) struct ClockCommand {
    #[clap(from_global)]
    pub(crate) verbose: u8,

    #[clap(from_global)]
    pub(crate) home: PathBuf,

    #[command(flatten)]
    pub(crate) chain: ChainArgs,

    #[clap(subcommand)]
    pub(crate) subcommands: Option<ClockCommands>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ClockCommands {
    Run(Run),
    Status(Status),
    Wait(Wait),
}
