use std::net::SocketAddr;

use clap::Args;

#[derive(Args, Debug)]
#[command(about = "Follow the clock and log every slot and epoch until ctrl-c")]
pub(crate) struct Run {
    /// Serve the prometheus metrics on this address
    #[arg(long, env = "BEACON_METRICS_ADDR")]
    pub(crate) metrics_addr: Option<SocketAddr>,
}
