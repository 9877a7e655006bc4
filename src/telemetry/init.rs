use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, logs::SdkLoggerProvider, metrics::SdkMeterProvider, trace::SdkTracerProvider,
};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn,h2=warn,tonic=warn,opentelemetry=warn";

struct OtelProviders {
    tracer: SdkTracerProvider,
    meter: SdkMeterProvider,
    logger: SdkLoggerProvider,
}

/// Flushes exporters on shutdown. Holds nothing when OTLP export is disabled.
pub struct TelemetryGuard {
    providers: Option<OtelProviders>,
}

impl TelemetryGuard {
    pub fn shutdown(self) {
        let Some(providers) = self.providers else {
            return;
        };
        if let Err(e) = providers.tracer.shutdown() {
            tracing::warn!(error = %e, "Failed to shut down tracer provider");
        }
        if let Err(e) = providers.meter.shutdown() {
            tracing::warn!(error = %e, "Failed to shut down meter provider");
        }
        if let Err(e) = providers.logger.shutdown() {
            tracing::warn!(error = %e, "Failed to shut down logger provider");
        }
    }
}

pub fn init_telemetry(config: &Config) -> anyhow::Result<TelemetryGuard> {
    let providers = match &config.otel_exporter_endpoint {
        Some(endpoint) => Some(build_providers(config, endpoint)?),
        None => None,
    };

    let trace_layer = providers.as_ref().map(|p| {
        OpenTelemetryLayer::new(p.tracer.tracer(config.otel_service_name.clone()))
    });
    let log_layer = providers
        .as_ref()
        .map(|p| OpenTelemetryTracingBridge::new(&p.logger));

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // stdout carries the analysis output; logs go to stderr.
    let fmt_layer = if config.is_production() {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(trace_layer)
        .with(log_layer)
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!(
        service = %config.otel_service_name,
        endpoint = config.otel_exporter_endpoint.as_deref().unwrap_or("disabled"),
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { providers })
}

fn build_providers(config: &Config, endpoint: &str) -> anyhow::Result<OtelProviders> {
    let resource = Resource::builder()
        .with_service_name(config.otel_service_name.clone())
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .with_attribute(KeyValue::new(
            "deployment.environment",
            config.environment.clone(),
        ))
        .build();

    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(10))
        .build()?;
    let tracer = SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .with_resource(resource.clone())
        .build();
    global::set_tracer_provider(tracer.clone());

    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(10))
        .build()?;
    let meter = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .with_resource(resource.clone())
        .build();
    global::set_meter_provider(meter.clone());

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(10))
        .build()?;
    let logger = SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();

    Ok(OtelProviders {
        tracer,
        meter,
        logger,
    })
}
