//! Logging and OpenTelemetry export for crossjob.
//!
//! Logs always go to stderr so CLI output on stdout stays parseable. With
//! an OTLP endpoint, resolve/save spans and the job metrics in [`metrics`]
//! are exported as well. Logs are not exported: the CLI is short-lived and
//! every log line already lands inside an exported span.

pub mod job;
pub mod metrics;

use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

use crate::error::{Error, Result};
use crate::model::Workflow;

/// Configuration for telemetry initialization.
pub struct TelemetryConfig {
    /// Optional OTLP endpoint (e.g. "http://localhost:4317").
    pub endpoint: Option<String>,
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Holds the OTLP providers, if any. Flushes and shuts them down on drop.
pub struct TelemetryGuard {
    export: Option<(SdkTracerProvider, SdkMeterProvider)>,
}

impl TelemetryGuard {
    /// Whether spans and metrics leave the process.
    pub fn is_exporting(&self) -> bool {
        self.export.is_some()
    }

    /// Push pending spans and metrics before a CLI command exits.
    pub fn force_flush(&self) {
        if let Some((tracer, meter)) = &self.export {
            let _ = tracer.force_flush();
            let _ = meter.force_flush();
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some((tracer, meter)) = self.export.take() {
            let _ = meter.shutdown();
            let _ = tracer.shutdown();
        }
    }
}

/// Resource describing this process: service name, crate version, and the
/// workflows it resolves jobs for.
fn resource(service_name: String) -> Resource {
    let workflows = Workflow::ALL.map(Workflow::as_str).join(",");
    Resource::builder()
        .with_service_name(service_name)
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .with_attribute(KeyValue::new("crossjob.workflows", workflows))
        .build()
}

fn exporter_error(signal: &str, e: impl std::fmt::Display) -> Error {
    Error::Other(format!("failed to create OTLP {signal} exporter: {e}"))
}

/// Trace and metric providers exporting to `endpoint`. The meter provider is
/// registered globally so [`metrics`] instruments report through it.
fn otlp_providers(
    endpoint: &str,
    resource: Resource,
) -> Result<(SdkTracerProvider, SdkMeterProvider)> {
    use opentelemetry_otlp::WithExportConfig as _;

    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| exporter_error("span", e))?;
    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .with_resource(resource.clone())
        .build();

    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| exporter_error("metric", e))?;
    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .with_resource(resource)
        .build();
    opentelemetry::global::set_meter_provider(meter_provider.clone());

    Ok((tracer_provider, meter_provider))
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if an OTLP exporter fails to build or a subscriber is
/// already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard> {
    use opentelemetry::trace::TracerProvider as _;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let stderr = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr);

    let export = match config.endpoint.as_deref() {
        Some(endpoint) => Some(otlp_providers(endpoint, resource(config.service_name))?),
        None => None,
    };
    // Option<Layer> is itself a layer; None installs nothing.
    let otel_traces = export
        .as_ref()
        .map(|(tracer, _)| tracing_opentelemetry::layer().with_tracer(tracer.tracer("crossjob")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr)
        .with(otel_traces)
        .try_init()
        .map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))?;

    tracing::debug!(
        endpoint = config.endpoint.as_deref().unwrap_or("-"),
        "telemetry initialized"
    );
    Ok(TelemetryGuard { export })
}
