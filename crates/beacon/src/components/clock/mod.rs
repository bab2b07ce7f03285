use std::time::Duration;

use beacon_clock::{ChainClock, ClockEvent};
use beacon_config::{load_chain_config, ChainConfig};
use beacon_metrics::ServerBuilder;
use futures::StreamExt;
use tokio::{signal, spawn};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::tracing::setup_tracing;

use self::commands::{ClockCommand, ClockCommands, Run, Wait};

pub(crate) mod commands;

pub(crate) async fn handle_command(
    ClockCommand {
        verbose,
        home,
        chain,
        subcommands,
    }: ClockCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing(verbose)?;

    let config = load_chain_config(&home, Some(chain))?;
    let shutdown = CancellationToken::new();

    let clock = ChainClock::builder()
        .with_genesis_time(config.genesis_time().unwrap_or_default())
        .with_seconds_per_slot(config.seconds_per_slot())
        .with_slots_per_epoch(config.slots_per_epoch())
        .with_maximum_gossip_clock_disparity(config.maximum_gossip_clock_disparity())
        .with_shutdown(shutdown.clone())
        .build()?;

    match subcommands {
        Some(ClockCommands::Run(cmd)) => run(clock, shutdown, cmd).await,
        Some(ClockCommands::Status(_)) => {
            print_status(&clock, &config);

            Ok(())
        }
        Some(ClockCommands::Wait(cmd)) => wait(clock, shutdown, cmd).await,
        None => Ok(()),
    }
}

async fn run(
    clock: ChainClock,
    shutdown: CancellationToken,
    Run { metrics_addr }: Run,
) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = metrics_addr.map(|addr| {
        spawn(
            ServerBuilder::default()
                .serve_addr(addr)
                .shutdown(shutdown.child_token())
                .serve(),
        )
    });

    info!(
        "Following the chain clock from slot {} (epoch {})",
        clock.current_slot(),
        clock.current_epoch()
    );

    let mut events = clock.events();
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c, if !shutdown.is_cancelled() => {
                if let Err(e) = result {
                    error!("Unable to listen for ctrl_c: {e}");
                }
                info!("Received ctrl_c, shutting down application...");
                shutdown.cancel();
            }
            event = events.next() => match event {
                Some(ClockEvent::Slot(slot)) => info!(slot, "New slot"),
                Some(ClockEvent::Epoch(epoch)) => info!(epoch, "New epoch"),
                None => break,
            }
        }
    }

    if let Some(metrics) = metrics {
        if let Ok(Err(e)) = metrics.await {
            warn!("Metrics server terminated with an error: {e}");
        }
    }

    info!("Shutdown procedure finished, exiting...");

    Ok(())
}

fn print_status(clock: &ChainClock, config: &ChainConfig) {
    println!("Preset: {}", config.preset);
    println!("Genesis time: {}", clock.genesis_time());
    println!("Seconds per slot: {}", clock.slot_duration().as_secs());
    println!("Slots per epoch: {}", clock.slots_per_epoch());
    println!("Current slot: {}", clock.current_slot());
    println!("Current epoch: {}", clock.current_epoch());
    println!(
        "Next slot in: {}ms",
        clock.duration_until_next_slot().as_millis()
    );
}

async fn wait(
    clock: ChainClock,
    shutdown: CancellationToken,
    Wait { slot, timeout_secs }: Wait,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(timeout_secs) = timeout_secs {
        let timeout = shutdown.clone();
        spawn(async move {
            tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
            timeout.cancel();
        });
    }

    let interrupt = shutdown.clone();
    spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    info!("Waiting for slot {slot}, current slot is {}", clock.current_slot());
    clock.wait_for_slot(slot).await?;
    println!("Reached slot {}", clock.current_slot());

    Ok(())
}
