use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber: RUST_LOG-driven filter over a
/// standard fmt layer.
pub fn setup_tracing() -> color_eyre::Result<()> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::builder().parse(&rust_log).map_err(|e| {
        color_eyre::eyre::eyre!("Couldn't create env filter from {}: {}", rust_log, e)
    })?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
