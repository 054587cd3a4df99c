use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;

use service::auth::{
    domain::{AuthSession, Claims, LoginInput},
    errors::AuthError,
    AuthService,
};
use service::{insights::InsightsService, registry::RegistryService};

use crate::errors::JsonApiError;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerState {
    pub auth: Arc<AuthService>,
    pub registry: Arc<RegistryService>,
    pub insights: Arc<InsightsService>,
}

#[derive(Serialize)]
pub struct MeOutput {
    pub username: String,
    pub expires_at: i64,
}

pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<AuthSession>), JsonApiError> {
    let session = state.auth.login(input)?;
    let mut cookie = Cookie::new(AUTH_COOKIE, session.access_token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    Ok((jar.add(cookie), Json(session)))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    (jar.remove(cookie), StatusCode::NO_CONTENT)
}

pub async fn me(Extension(claims): Extension<Claims>) -> Json<MeOutput> {
    Json(MeOutput { username: claims.sub, expires_at: claims.exp })
}

/// Routes reachable without a token: liveness, login/logout, CORS preflight
/// and the public document reads.
fn is_public(method: &Method, path: &str) -> bool {
    if method == Method::OPTIONS {
        return true;
    }
    match path {
        "/" | "/api/health" | "/api/auth/login" | "/api/auth/logout" => true,
        "/api/registry" | "/api/registry/totals" | "/api/insights" => {
            method == Method::GET || method == Method::HEAD
        }
        _ => false,
    }
}

/// Read `Authorization: Bearer <token>`, falling back to the `auth_token` cookie.
fn extract_token(req: &Request) -> Result<String, AuthError> {
    if let Some(h) = req.headers().get(header::AUTHORIZATION) {
        let raw = h.to_str().map_err(|_| AuthError::InvalidToken("non-ascii Authorization header".into()))?;
        // auth scheme names are case-insensitive
        return match raw.trim().split_once(' ') {
            Some((scheme, tok)) if scheme.eq_ignore_ascii_case("bearer") && !tok.trim().is_empty() => {
                Ok(tok.trim().to_string())
            }
            _ => Err(AuthError::InvalidToken("expected Authorization: Bearer <token>".into())),
        };
    }
    CookieJar::from_headers(req.headers())
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Global middleware: everything outside [`is_public`] requires a valid
/// admin token. Verified claims are attached as a request extension.
pub async fn require_bearer_token_state(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let path = req.uri().path().to_string();
    if is_public(req.method(), &path) {
        return Ok(next.run(req).await);
    }

    let token = extract_token(&req).map_err(|e| {
        tracing::warn!(path = %path, err = %e, "request without usable token");
        JsonApiError::from(e)
    })?;
    let claims = state.auth.verify(&token).map_err(|e| {
        tracing::warn!(path = %path, err = %e, "token validation failed");
        JsonApiError::from(e)
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
