use crate::app_env;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Tracer, TracerProvider};
use opentelemetry_sdk::{Resource, runtime};
use tracing::level_filters::LevelFilter;
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer};
use tracing_subscriber::{EnvFilter, prelude::*, registry};

/// The name of the client as it should appear in OpenTelemetry collectors
const SERVICE_NAME: &str = "productivity-client";

/// Struct containing OpenTelemetry primitives which export data to a tracing server
pub struct OtelExporters {
    pub tracer: Tracer,
    pub tracer_provider: TracerProvider,
    pub meter: SdkMeterProvider,
}

impl OtelExporters {
    /// Flushes and stops the background exporters. Call this before the process exits so the
    /// last batch of spans isn't lost.
    pub fn shutdown(self) {
        if let Err(err) = self.tracer_provider.shutdown() {
            eprintln!("failed to shut down span exporter: {err}");
        }
        if let Err(err) = self.meter.shutdown() {
            eprintln!("failed to shut down metric exporter: {err}");
        }
    }
}

/// Instantiates OpenTelemetry exporters which run in the background and send tracing/metrics
/// data to an opentelemetry-compatible gRPC endpoint. Fails if either exporter can't be built.
pub fn init_exporters(
    otlp_traces_endpoint: &str,
    otlp_metrics_endpoint: &str,
) -> Result<OtelExporters, anyhow::Error> {
    let span_export = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_traces_endpoint)
        .build()?;
    let meter_export = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_metrics_endpoint)
        .build()?;

    let metrics_reader = PeriodicReader::builder(meter_export, runtime::Tokio).build();

    let tracer_provider = TracerProvider::builder()
        .with_batch_exporter(span_export, runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build();
    let meter_provider = SdkMeterProvider::builder()
        .with_reader(metrics_reader)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build();

    Ok(OtelExporters {
        tracer: tracer_provider.tracer(SERVICE_NAME),
        tracer_provider,
        meter: meter_provider,
    })
}

/// Builds exporters from [app_env::OTEL_SPAN_EXPORT_URL] and [app_env::OTEL_METRIC_EXPORT_URL].
/// Returns [None] when span export isn't configured. The metrics endpoint falls back to the span
/// endpoint.
pub fn exporters_from_env() -> Result<Option<OtelExporters>, anyhow::Error> {
    let Ok(span_url) = std::env::var(app_env::OTEL_SPAN_EXPORT_URL) else {
        return Ok(None);
    };
    let metric_url =
        std::env::var(app_env::OTEL_METRIC_EXPORT_URL).unwrap_or_else(|_| span_url.clone());

    init_exporters(&span_url, &metric_url).map(Some)
}

/// Constructs a filter which uses [app_env::LOG_LEVEL] to configure per-module logging. Filters
/// to the "info" level by default.
pub fn init_env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(app_env::LOG_LEVEL)
        .from_env_lossy()
}

/// Sets up the global logging and tracing sinks. All spans and metrics at the "debug" level and
/// above go to OpenTelemetry if [otel_exporters] is provided. [env_filter] only applies to the
/// JSON logger printing to stdout. The W3C trace-context propagator is installed either way so
/// outgoing HTTP requests carry trace headers.
pub fn setup_logging_and_tracing(env_filter: EnvFilter, otel_exporters: Option<&OtelExporters>) {
    global::set_text_map_propagator(TraceContextPropagator::new());

    if let Some(exporters) = otel_exporters {
        registry()
            .with(LevelFilter::DEBUG)
            .with(OpenTelemetryLayer::new(exporters.tracer.clone()))
            .with(MetricsLayer::new(exporters.meter.clone()))
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_filter(env_filter),
            )
            .init();
    } else {
        registry()
            .with(LevelFilter::DEBUG)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_filter(env_filter),
            )
            .init();
    }
}
