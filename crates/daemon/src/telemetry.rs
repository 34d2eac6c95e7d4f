//! Telemetry setup for OpenTelemetry integration

use anyhow::Result;
use tracing_subscriber::Layer;

/// Boxed layer over the daemon's base subscriber
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Keeps the exporter alive; flush with [`Telemetry::shutdown`]
pub struct Telemetry {
    #[cfg(feature = "telemetry")]
    provider: opentelemetry_sdk::trace::TracerProvider,
    pub service_name: String,
    pub endpoint: String,
}

impl Telemetry {
    pub fn shutdown(self) {
        #[cfg(feature = "telemetry")]
        if let Err(e) = self.provider.shutdown() {
            tracing::warn!(error = ?e, "OpenTelemetry shutdown failed");
        }
    }
}

/// Build an OTLP tracing layer if enabled
///
/// # Environment Variables
///
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
/// - `OTEL_SERVICE_NAME`: Service name (default: jobengine)
///
/// # Example
///
/// ```text
/// OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
/// OTEL_SERVICE_NAME=jobengine-dev \
///     ./jobengine
/// ```
///
/// Returns `None` when no endpoint is configured. Runs before the subscriber
/// is installed, so it does not log; the caller reports the outcome.
pub fn otlp_layer<S>() -> Result<Option<(BoxedLayer<S>, Telemetry)>>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok(None);
    };
    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "jobengine".to_string());

    #[cfg(feature = "telemetry")]
    {
        build_layer(service_name, endpoint).map(Some)
    }

    #[cfg(not(feature = "telemetry"))]
    {
        anyhow::bail!(
            "OTEL_EXPORTER_OTLP_ENDPOINT={} set but feature 'telemetry' not enabled \
             (service {}); rebuild with: cargo build --features telemetry",
            endpoint,
            service_name
        )
    }
}

#[cfg(feature = "telemetry")]
fn build_layer<S>(service_name: String, endpoint: String) -> Result<(BoxedLayer<S>, Telemetry)>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::TracerProvider;
    use opentelemetry_sdk::Resource;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.clone(),
        )]))
        .build();

    let tracer = provider.tracer(service_name.clone());
    opentelemetry::global::set_tracer_provider(provider.clone());

    let layer = tracing_opentelemetry::layer().with_tracer(tracer).boxed();
    Ok((
        layer,
        Telemetry {
            provider,
            service_name,
            endpoint,
        },
    ))
}
