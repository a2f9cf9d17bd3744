//! Tracing setup for the gateway.
//!
//! Logs always go to stderr through `tracing-subscriber`. When an OTLP
//! endpoint is configured, spans are also exported over gRPC.

use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SERVICE_NAME: &str = "flare-copilot";

/// Timeout for OTLP exports - prevents blocking on unavailable endpoints
const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Holds the tracer provider so pending spans can be flushed on exit.
pub struct Telemetry {
    provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            tracing::info!("flushing OpenTelemetry spans");
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "OpenTelemetry shutdown failed");
            }
        }
    }
}

/// `RUST_LOG` wins over the configured level.
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Plain stderr logging for one-shot CLI commands.
pub fn init_cli(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(log_level))
        .with_writer(std::io::stderr)
        .init();
}

/// Logging for the server, with span export when `otlp_endpoint` is set.
pub fn init(log_level: &str, otlp_endpoint: Option<&str>) -> Result<Telemetry> {
    let Some(otlp_endpoint) = otlp_endpoint else {
        tracing_subscriber::registry()
            .with(env_filter(log_level))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(Telemetry { provider: None });
    };

    let resource = Resource::builder_empty()
        .with_service_name(SERVICE_NAME)
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let endpoint = if otlp_endpoint.starts_with("http") {
        otlp_endpoint.to_string()
    } else {
        format!("http://{}", otlp_endpoint)
    };

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to create OTLP span exporter")?;

    let provider = SdkTracerProvider::builder()
        .with_span_processor(
            opentelemetry_sdk::trace::BatchSpanProcessor::builder(exporter).build(),
        )
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    let tracer = provider.tracer(SERVICE_NAME);
    global::set_tracer_provider(provider.clone());

    tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    tracing::info!(endpoint = otlp_endpoint, "OpenTelemetry span export enabled");

    Ok(Telemetry {
        provider: Some(provider),
    })
}
