//! HTTP server setup and configuration.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeFile, trace::TraceLayer};

use super::handlers;
use super::upstream::UpstreamClient;
use crate::config::{Config, API_KEY_ENV};
use crate::error::Error;

/// Shared application state.
///
/// Holds read-only configuration only; nothing is mutated across requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, Error> {
        let upstream = UpstreamClient::new(&config.upstream)
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            upstream,
        })
    }
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let index_path = Path::new(&state.config.server.static_dir).join("index.html");

    Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/health", get(handlers::health))
        .route_service("/", ServeFile::new(index_path))
        .fallback(handlers::not_found)
        // Guards every /api path, registered or not
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::require_api_key,
        ))
        // State and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(CatchPanicLayer::custom(handlers::handle_panic))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    if config.upstream.api_key.is_none() {
        tracing::warn!(
            "{} not configured - /api requests will be rejected",
            API_KEY_ENV
        );
    }

    let state = AppState::new(config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting chat-relay server");

    serve_with_shutdown(listener, app, shutdown_signal()).await
}

/// Serve `app` on `listener` until `shutdown` resolves, then drain open
/// connections and return.
pub async fn serve_with_shutdown<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on ctrl-c or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install ctrl-c handler");
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received ctrl-c, draining in-flight requests"),
        () = terminate => tracing::info!("Received SIGTERM, draining in-flight requests"),
    }
}
