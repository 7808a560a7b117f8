use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the process-wide tracing subscriber used by examples and by
/// programs embedding the crate. `RUST_LOG` takes precedence over
/// `log_level` when set.
pub fn setup_global_logging(log_level: &tracing::Level) -> Result<()> {
    // Format: warn,monologue=debug
    let default_filter = format!("warn,monologue={}", log_level.as_str());

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::builder().parse(&default_filter))?;

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_thread_ids(true)
        .with_target(true)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(stdout_layer.with_filter(filter))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
