use clap::Args;

#[derive(Args, Debug)]
#[command(about = "Print the chain time parameters and the current slot")]
pub(crate) struct Status {}
