use clap::Parser;

mod components;
mod options;
mod tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = options::Opt::parse();

    match args.commands {
        options::BeaconCommand::Clock(cmd) => components::clock::handle_command(cmd).await,
    }
}
