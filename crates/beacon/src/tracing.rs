use tracing::Level;
use tracing_subscriber::{
    prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

fn verbose_to_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        4..=u8::MAX => Level::TRACE,
    }
}

// Setup tracing
// The verbosity flag wins over RUST_LOG, BEACON_LOG_FORMAT selects the output format
pub(crate) fn setup_tracing(verbose: u8) -> Result<(), Box<dyn std::error::Error>> {
    let filter = if verbose > 0 {
        EnvFilter::try_new(format!("warn,beacon={}", verbose_to_level(verbose).as_str()))?
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,beacon=info"))
    };

    let layer = match std::env::var("BEACON_LOG_FORMAT")
        .map(|f| f.to_lowercase())
        .as_deref()
    {
        Ok("json") => tracing_subscriber::fmt::layer()
            .json()
            .with_filter(filter)
            .boxed(),
        Ok("pretty") => tracing_subscriber::fmt::layer()
            .pretty()
            .with_filter(filter)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, Level::ERROR)]
    #[case(2, Level::INFO)]
    #[case(3, Level::DEBUG)]
    #[case(9, Level::TRACE)]
    fn verbosity_maps_to_level(#[case] verbose: u8, #[case] expected: Level) {
        assert_eq!(verbose_to_level(verbose), expected);
    }
}
