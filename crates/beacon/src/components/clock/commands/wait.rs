use clap::Args;

#[derive(Args, Debug)]
#[command(about = "Block until the clock reaches a slot")]
pub(crate) struct Wait {
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) slot: i64,

    /// Give up after this many seconds
    #[arg(long)]
    pub(crate) timeout_secs: Option<u64>,
}
