pub mod auth;
pub mod insights;
pub mod registry;

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::{Health, ServiceInfo};

use self::auth::ServerState;

pub const SERVICE_NAME: &str = "Registry Admin API";

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo { status: "healthy", service: SERVICE_NAME, version: env!("CARGO_PKG_VERSION") })
}

/// Every `/api` response is marked uncacheable so browsers never show stale documents.
pub async fn no_cache_headers(req: Request, next: Next) -> Response {
    let is_api = req.uri().path().starts_with("/api");
    let mut resp = next.run(req).await;
    if is_api {
        let headers = resp.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store, must-revalidate"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    }
    resp
}

/// Build the full application router. Public reads and login pass the token
/// check; everything else needs a bearer token or the `auth_token` cookie.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/registry", get(registry::get_registry))
        .route("/api/registry/totals", get(registry::get_totals))
        .route(
            "/api/registry/:list",
            get(registry::list_records).post(registry::add_record),
        )
        .route(
            "/api/registry/:list/:id",
            get(registry::get_record)
                .put(registry::update_record)
                .delete(registry::delete_record),
        )
        .route(
            "/api/insights",
            get(insights::get_insights).put(insights::replace_insights),
        )
        .route("/api/insights/:section", put(insights::update_section))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token_state,
        ))
        .layer(middleware::from_fn(no_cache_headers))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
        .with_state(state)
}
