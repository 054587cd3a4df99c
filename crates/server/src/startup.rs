use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::HeaderValue;
use axum::Router;
use configs::{AppConfig, StorageMode};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{info, warn};

use service::auth::{AuthConfig, AuthService};
use service::document::DocumentStore;
use service::insights::InsightsService;
use service::registry::RegistryService;

use crate::routes::{self, auth::ServerState};

/// Credentialed CORS for the configured origins only.
pub fn build_cors(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| o.parse::<HeaderValue>().with_context(|| format!("invalid CORS origin {o:?}")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

/// Wire services around one document store built from config.
pub fn build_state(cfg: &AppConfig) -> anyhow::Result<ServerState> {
    let store = Arc::new(DocumentStore::from_config(&cfg.storage)?);
    Ok(state_from_store(store, AuthConfig::from(&cfg.auth)))
}

pub fn state_from_store(store: Arc<DocumentStore>, auth: AuthConfig) -> ServerState {
    ServerState {
        auth: Arc::new(AuthService::new(auth)),
        registry: Arc::new(RegistryService::new(Arc::clone(&store))),
        insights: Arc::new(InsightsService::new(store)),
    }
}

pub fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = build_state(cfg)?;
    let cors = build_cors(&cfg.server.allowed_origins)?;
    Ok(routes::build_router(state, cors))
}

fn load_bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    let (host, port) = (&cfg.server.host, cfg.server.port);
    format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(event = "shutdown_signal", "received Ctrl+C, shutting down");
    }
}

/// Public entry: build the app and run the HTTP server until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    if cfg.auth.uses_default_secret() {
        warn!("SECRET_KEY is the built-in default; set it before exposing this service");
    }
    if cfg.storage.mode == StorageMode::Local {
        common::env::check_data_root(&cfg.storage.local_root).await?;
    }

    let app = build_app(&cfg)?;
    let addr = load_bind_addr(&cfg)?;
    info!(
        %addr,
        mode = ?cfg.storage.mode,
        registry_key = %cfg.storage.registry_key,
        insights_key = %cfg.storage.insights_key,
        "starting registry admin server"
    );
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
