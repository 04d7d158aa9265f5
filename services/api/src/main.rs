//! Storyboard HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, the session verifier and the workflow client
//! into the router, then serves the API and the metrics endpoint.
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use storyboard_api::app::{AppState, build_router};
use storyboard_api::auth::SessionVerifier;
use storyboard_api::config::{ApiConfig, StorageBackend};
use storyboard_api::observability;
use storyboard_api::store::StoryStore;
use storyboard_api::store::memory::InMemoryStore;
use storyboard_api::store::postgres::PostgresStore;
use storyboard_api::workflow::WorkflowClient;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env_or_yaml().context("storyboard config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// Serve the API and the metrics endpoint until `shutdown` resolves.
///
/// Open relay streams never finish on their own, so the API listener is
/// dropped on shutdown instead of draining connections.
async fn run_with_shutdown<F>(config: ApiConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let telemetry = observability::init_observability("storyboard-api", config.environment)?;
    let state = build_state(config.clone()).await?;
    tracing::info!(
        backend = state.store.backend_name(),
        durable = state.store.is_durable(),
        environment = config.environment.as_str(),
        traces = telemetry.exports_traces(),
        "story store ready"
    );

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let metrics_task = tokio::spawn(observability::serve_metrics(
        telemetry.metrics_handle(),
        config.metrics_bind,
        async move {
            let _ = stop_rx.wait_for(|stopped| *stopped).await;
        },
    ));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "storyboard api listening");
    let served = tokio::select! {
        result = axum::serve(listener, build_router(state).into_make_service()) => result,
        _ = shutdown => {
            tracing::info!("shutdown requested");
            Ok(())
        }
    };

    let _ = stop_tx.send(true);
    match metrics_task.await {
        Ok(Err(err)) => tracing::warn!(error = %err, "metrics server stopped with error"),
        Err(err) => tracing::warn!(error = %err, "metrics task failed"),
        Ok(Ok(())) => {}
    }
    telemetry.shutdown();
    served.context("serve storyboard api")
}

async fn build_state(config: ApiConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn StoryStore> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg).await?)
        }
    };

    Ok(AppState {
        store,
        verifier: Arc::new(SessionVerifier::new(&config.auth)),
        environment: config.environment,
        relay: config.relay,
        webhook_secret: config.webhook_secret,
        workflow: Arc::new(WorkflowClient::new(config.workflow, config.environment)),
    })
}
