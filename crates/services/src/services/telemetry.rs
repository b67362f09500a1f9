//! Logging, trace export and metrics wiring.
//!
//! Spans go to the console and, when enabled, to an OTLP/HTTP collector.
//! Metrics go through the [`MetricSink`] capability. The concrete sink is
//! picked once at startup by [`metric_sink`]: Prometheus when metrics are
//! enabled, a no-op otherwise. Handlers never check whether metrics are on.

use std::sync::Arc;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{ExporterBuildError, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};

use crate::services::config::{AppConfig, MetricsConfig};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),
    #[error("Failed to build OTLP trace exporter: {0}")]
    Exporter(#[from] ExporterBuildError),
    #[error("Invalid log filter: {0}")]
    Filter(String),
    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

const LOG_TARGETS: &[&str] = &[
    "server",
    "services",
    "db",
    "deployment",
    "local_deployment",
    "utils",
    "tower_http",
];

/// Builds the filter directive `warn,server=<level>,services=<level>,...`.
pub fn log_filter(level: &str) -> String {
    let targets: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();
    format!("warn,{}", targets.join(","))
}

/// Keeps the OTLP tracer provider alive; dropping it flushes buffered spans
/// and shuts the exporter down.
#[must_use = "dropping the guard stops trace export"]
#[derive(Default)]
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl TracingGuard {
    pub fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!("Failed to shut down trace exporter: {}", e);
            }
        }
    }
}

/// Builds the OTLP tracer provider, `None` when trace export is off.
pub fn tracer_provider(config: &AppConfig) -> Result<Option<SdkTracerProvider>, TelemetryError> {
    let Some(endpoint) = config.traces_endpoint() else {
        return Ok(None);
    };

    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()?;
    let provider = SdkTracerProvider::builder()
        .with_resource(
            Resource::builder()
                .with_service_name(config.app_name.clone())
                .build(),
        )
        .with_batch_exporter(exporter)
        .build();
    Ok(Some(provider))
}

/// Installs the global subscriber: human readable output during
/// development, one JSON object per line in production, plus an OTLP layer
/// when trace export is configured.
pub fn init_tracing(config: &AppConfig) -> Result<TracingGuard, TelemetryError> {
    let env_filter = EnvFilter::try_new(log_filter(&config.log_level))
        .map_err(|e| TelemetryError::Filter(e.to_string()))?;

    let provider = tracer_provider(config)?;
    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(config.app_name.clone()))
    });

    let registry = tracing_subscriber::registry().with(env_filter).with(otel_layer);
    let result = if config.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    if let Some(endpoint) = config.traces_endpoint() {
        tracing::info!("Exporting traces to {}", endpoint);
    }
    Ok(TracingGuard { provider })
}

/// Counter metric name for a route group, e.g. `User` -> `user_requests_total`.
pub fn metric_key(route_name: &str) -> String {
    format!("{}_requests_total", route_name.to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteLabels {
    pub endpoint: &'static str,
    pub method: &'static str,
}

impl RouteLabels {
    pub const fn new(endpoint: &'static str, method: &'static str) -> Self {
        Self { endpoint, method }
    }
}

pub trait RouteCounter: Send + Sync {
    fn add(&self, labels: &RouteLabels);
}

pub type Counter = Arc<dyn RouteCounter>;

impl RouteCounter for IntCounterVec {
    fn add(&self, labels: &RouteLabels) {
        self.with_label_values(&[labels.endpoint, labels.method]).inc();
    }
}

struct NoopCounter;

impl RouteCounter for NoopCounter {
    fn add(&self, _labels: &RouteLabels) {}
}

pub trait MetricSink: Send + Sync + 'static {
    /// Creates a counter labelled by `endpoint` and `method`.
    fn counter(&self, name: &str, description: &str) -> Result<Counter, TelemetryError>;

    /// Prometheus text exposition, `None` when metrics are disabled.
    fn render(&self) -> Option<Result<String, TelemetryError>>;
}

#[derive(Clone, Default)]
pub struct PrometheusMetricSink {
    registry: Registry,
}

impl PrometheusMetricSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricSink for PrometheusMetricSink {
    fn counter(&self, name: &str, description: &str) -> Result<Counter, TelemetryError> {
        let counter = IntCounterVec::new(Opts::new(name, description), &["endpoint", "method"])?;
        self.registry.register(Box::new(counter.clone()))?;
        Ok(Arc::new(counter))
    }

    fn render(&self) -> Option<Result<String, TelemetryError>> {
        let families = self.registry.gather();
        Some(
            TextEncoder::new()
                .encode_to_string(&families)
                .map_err(TelemetryError::from),
        )
    }
}

#[derive(Clone, Copy, Default)]
pub struct NoopMetricSink;

impl MetricSink for NoopMetricSink {
    fn counter(&self, _name: &str, _description: &str) -> Result<Counter, TelemetryError> {
        Ok(Arc::new(NoopCounter))
    }

    fn render(&self) -> Option<Result<String, TelemetryError>> {
        None
    }
}

pub fn metric_sink(config: &MetricsConfig) -> Arc<dyn MetricSink> {
    if config.enabled {
        Arc::new(PrometheusMetricSink::new())
    } else {
        Arc::new(NoopMetricSink)
    }
}
