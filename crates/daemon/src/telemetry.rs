//! Telemetry setup for OpenTelemetry integration
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
//! - `OTEL_SERVICE_NAME`: Service name (default: docpipe)
//!
//! # Example
//!
//! ```text
//! OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
//! OTEL_SERVICE_NAME=docpipe-dev \
//!     cargo run -p docpipe-daemon --features telemetry
//! ```

use anyhow::Result;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

pub const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Boxed layer over the subscriber stack built in `logging`
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// True when an endpoint is set but the binary was built without `telemetry`
pub fn requested_but_disabled() -> bool {
    cfg!(not(feature = "telemetry")) && std::env::var(OTLP_ENDPOINT_VAR).is_ok()
}

/// Build the OpenTelemetry layer, if configured and compiled in
pub fn otel_layer<S>() -> Result<Option<BoxedLayer<S>>>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
{
    let endpoint = match std::env::var(OTLP_ENDPOINT_VAR) {
        Ok(endpoint) => endpoint,
        Err(_) => return Ok(None),
    };

    #[cfg(feature = "telemetry")]
    {
        Ok(Some(init_otel_layer(&endpoint)?))
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = endpoint;
        Ok(None)
    }
}

#[cfg(feature = "telemetry")]
fn init_otel_layer<S>(endpoint: &str) -> Result<BoxedLayer<S>>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
{
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "docpipe".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.clone(),
        )]))
        .build();

    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}

/// Flush pending spans
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}
