//! Logging setup: env filter, pretty or JSON output, non-blocking stdout

use crate::config::LogFormat;
use crate::telemetry;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "docpipe=info";

/// Install the global subscriber. Keep the guard alive until exit or
/// buffered lines are lost.
pub fn init(format: LogFormat) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let fmt_layer = match format {
        // Production: JSON structured logging
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        // Development: pretty formatting with colors
        LogFormat::Pretty => fmt::layer().pretty().with_writer(writer).boxed(),
    };

    let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);
    let otel = telemetry::otel_layer()?;
    registry
        .with(otel)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
