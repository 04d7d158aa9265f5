//! Tracing, trace propagation and metrics for the storyboard service.
//!
//! # Purpose
//! [`init_observability`] installs the log subscriber, the W3C trace-context
//! propagator and the Prometheus recorder, and registers the service metrics.
//! Spans are exported over OTLP only when `OTEL_EXPORTER_OTLP_ENDPOINT` is
//! set.
//!
//! # Metrics
//! - [`RELAY_SUBSCRIPTIONS_ACTIVE`]: gauge of open change subscriptions.
//! - [`RELAY_EVENTS_TOTAL`]: relay frames pushed, labelled `event_type`.
//! - [`STORE_DELETES_TOTAL`]: stories deleted, labelled `backend`.
//!
//! # Notes
//! Process-wide state is installed once; later calls (tests, restarts inside
//! one process) get clones of the first handles.
use crate::config::Environment;
use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const RELAY_SUBSCRIPTIONS_ACTIVE: &str = "storyboard_relay_subscriptions_active";
pub const RELAY_EVENTS_TOTAL: &str = "storyboard_relay_events_total";
pub const STORE_DELETES_TOTAL: &str = "storyboard_store_deletes_total";

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const DEFAULT_FILTER: &str = "info";

static TRACER: OnceLock<Option<SdkTracerProvider>> = OnceLock::new();
static METRICS: OnceLock<PrometheusHandle> = OnceLock::new();
static PROPAGATOR: OnceLock<()> = OnceLock::new();

/// Handles kept by `main` for the lifetime of the process.
#[derive(Clone)]
pub struct Telemetry {
    metrics: PrometheusHandle,
    tracer: Option<SdkTracerProvider>,
}

impl Telemetry {
    pub fn metrics_handle(&self) -> PrometheusHandle {
        self.metrics.clone()
    }

    pub fn exports_traces(&self) -> bool {
        self.tracer.is_some()
    }

    /// Flush buffered spans. Safe to call when no exporter is configured.
    pub fn shutdown(&self) {
        if let Some(provider) = &self.tracer {
            if let Err(err) = provider.shutdown() {
                tracing::warn!(error = ?err, "trace exporter shutdown failed");
            }
        }
    }
}

pub fn init_observability(service_name: &str, environment: Environment) -> Result<Telemetry> {
    install_propagator();
    let tracer = TRACER
        .get_or_init(|| {
            let provider = build_tracer_provider(service_name, environment);
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
            let registry = tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer());
            match &provider {
                Some(provider) => {
                    let otel = tracing_opentelemetry::layer()
                        .with_tracer(provider.tracer(service_name.to_string()));
                    let _ = registry.with(otel).try_init();
                }
                None => {
                    let _ = registry.try_init();
                }
            }
            provider
        })
        .clone();

    let metrics = install_metrics_recorder()?;
    describe_metrics();
    Ok(Telemetry { metrics, tracer })
}

fn describe_metrics() {
    metrics::describe_gauge!(
        RELAY_SUBSCRIPTIONS_ACTIVE,
        "Open change subscriptions held by relay streams"
    );
    metrics::describe_counter!(RELAY_EVENTS_TOTAL, "Change events pushed to relay clients");
    metrics::describe_counter!(STORE_DELETES_TOTAL, "Stories deleted through the store");
}

fn build_tracer_provider(
    service_name: &str,
    environment: Environment,
) -> Option<SdkTracerProvider> {
    std::env::var(OTLP_ENDPOINT_ENV)
        .ok()
        .filter(|endpoint| !endpoint.trim().is_empty())?;
    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
    {
        Ok(exporter) => exporter,
        Err(err) => {
            eprintln!("otlp exporter disabled: {err}");
            return None;
        }
    };
    let resource = Resource::builder_empty()
        .with_attributes(resource_attributes(service_name, environment))
        .build();
    Some(
        SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build(),
    )
}

fn resource_attributes(service_name: &str, environment: Environment) -> Vec<KeyValue> {
    let mut attrs = vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        KeyValue::new("deployment.environment", environment.as_str()),
    ];
    if let Ok(instance) =
        std::env::var("STORYBOARD_SERVICE_INSTANCE_ID").or_else(|_| std::env::var("HOSTNAME"))
    {
        attrs.push(KeyValue::new("service.instance.id", instance));
    }
    attrs
}

fn install_propagator() {
    PROPAGATOR.get_or_init(|| global::set_text_map_propagator(TraceContextPropagator::new()));
}

/// Parent context carried by an inbound request's `traceparent` header.
pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    install_propagator();
    global::get_text_map_propagator(|propagator| propagator.extract(&TraceHeaders(headers)))
}

struct TraceHeaders<'a>(&'a axum::http::HeaderMap);

impl Extractor for TraceHeaders<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

fn install_metrics_recorder() -> Result<PrometheusHandle> {
    if let Some(handle) = METRICS.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("install prometheus recorder")?;
    Ok(METRICS.get_or_init(|| handle).clone())
}

fn metrics_router(handle: PrometheusHandle) -> axum::Router {
    axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

/// Serve Prometheus text on `addr` until `shutdown` resolves.
pub async fn serve_metrics<F>(
    handle: PrometheusHandle,
    addr: SocketAddr,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics listening");
    axum::serve(listener, metrics_router(handle).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::EnvGuard;
    use axum::body::Body;
    use axum::http::{HeaderMap, Request, StatusCode};
    use http_body_util::BodyExt;
    use opentelemetry::trace::{TraceContextExt, TraceId};
    use serial_test::serial;
    use tower::ServiceExt;

    fn attribute(attrs: &[KeyValue], key: &str) -> Option<String> {
        attrs
            .iter()
            .find(|attr| attr.key.as_str() == key)
            .map(|attr| attr.value.to_string())
    }

    #[test]
    #[serial]
    fn resource_carries_service_and_environment() {
        let _instance = EnvGuard::set("STORYBOARD_SERVICE_INSTANCE_ID", "api-7");
        let attrs = resource_attributes("storyboard-api", Environment::Production);
        assert_eq!(
            attribute(&attrs, "service.name").as_deref(),
            Some("storyboard-api")
        );
        assert_eq!(
            attribute(&attrs, "deployment.environment").as_deref(),
            Some("production")
        );
        assert_eq!(
            attribute(&attrs, "service.instance.id").as_deref(),
            Some("api-7")
        );
    }

    #[test]
    #[serial]
    fn no_exporter_without_endpoint() {
        let _endpoint = EnvGuard::unset(OTLP_ENDPOINT_ENV);
        assert!(build_tracer_provider("storyboard-api", Environment::Test).is_none());
    }

    #[test]
    fn extracts_parent_from_traceparent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
                .parse()
                .unwrap(),
        );
        let context = trace_context_from_headers(&headers);
        let span = context.span();
        assert!(span.span_context().is_valid());
        assert_eq!(
            span.span_context().trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
        );
    }

    #[test]
    fn missing_traceparent_gives_empty_parent() {
        let context = trace_context_from_headers(&HeaderMap::new());
        assert!(!context.span().span_context().is_valid());
    }

    #[tokio::test]
    #[serial]
    async fn metrics_route_renders_storyboard_metrics() {
        let _endpoint = EnvGuard::unset(OTLP_ENDPOINT_ENV);
        let telemetry = init_observability("storyboard-test", Environment::Test).expect("init");
        assert!(!telemetry.exports_traces());
        metrics::gauge!(RELAY_SUBSCRIPTIONS_ACTIVE).set(0.0);
        metrics::counter!(STORE_DELETES_TOTAL, "backend" => "memory").increment(1);

        let response = metrics_router(telemetry.metrics_handle())
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains(RELAY_SUBSCRIPTIONS_ACTIVE));
        assert!(text.contains(STORE_DELETES_TOTAL));
        telemetry.shutdown();
    }
}
