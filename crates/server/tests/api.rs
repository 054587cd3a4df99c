use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use server::routes;
use server::startup::{build_cors, state_from_store};
use service::auth::AuthConfig;
use service::document::{store::today, DocumentKeys, DocumentStore};
use service::storage::MemoryBackend;

const ORIGIN: &str = "http://localhost:5173";

struct TestApp {
    router: Router,
    backend: Arc<MemoryBackend>,
}

async fn build_app(registry: Option<Value>, insights: Option<Value>) -> TestApp {
    let backend = Arc::new(MemoryBackend::new());
    if let Some(doc) = registry {
        backend.put_raw("registry.json", doc.to_string()).await;
    }
    if let Some(doc) = insights {
        backend.put_raw("insights.json", doc.to_string()).await;
    }
    let store = Arc::new(DocumentStore::new(backend.clone(), DocumentKeys::default()));
    let state = state_from_store(
        store,
        AuthConfig {
            jwt_secret: "test-secret".into(),
            admin_username: "admin".into(),
            admin_password: "changeme".into(),
            token_ttl: chrono::Duration::minutes(60),
        },
    );
    let cors = build_cors(&[ORIGIN.to_string()]).expect("cors");
    TestApp { router: routes::build_router(state, cors), backend }
}

fn sample_registry() -> Value {
    json!({
        "lastUpdated": "2024-01-01",
        "carbonRegistries": [{"id": "verra", "name": "Verra", "country": "USA", "issued": 100, "retired": 40}],
        "recRegistries": [],
        "etsRegistries": [{"id": "eu-ets", "country": "EU"}],
        "totals": {}
    })
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> anyhow::Result<(StatusCode, HeaderMap, Value)> {
        let resp = self.router.clone().oneshot(req).await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, headers, body))
    }

    async fn token(&self) -> anyhow::Result<String> {
        let (status, _, body) = self
            .send(json_request("POST", "/api/auth/login", None, json!({"username": "admin", "password": "changeme"}))?)
            .await?;
        assert_eq!(status, StatusCode::OK);
        Ok(body["access_token"].as_str().expect("access_token").to_string())
    }
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    Ok(builder.body(Body::from(serde_json::to_vec(&body)?))?)
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    Ok(builder.body(Body::empty())?)
}

#[tokio::test]
async fn health_endpoints_are_public_and_api_is_uncacheable() -> anyhow::Result<()> {
    let app = build_app(None, None).await;

    let (status, headers, body) = app.send(empty_request("GET", "/api/health", None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-store, must-revalidate");
    assert_eq!(headers[header::PRAGMA], "no-cache");
    assert_eq!(headers[header::EXPIRES], "0");

    let (status, headers, body) = app.send(empty_request("GET", "/", None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(headers.get(header::CACHE_CONTROL).is_none());
    Ok(())
}

#[tokio::test]
async fn registry_reads_are_public() -> anyhow::Result<()> {
    let app = build_app(Some(sample_registry()), None).await;

    let (status, _, body) = app.send(empty_request("GET", "/api/registry", None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["carbonRegistries"][0]["id"], "verra");

    let (status, _, body) = app.send(empty_request("GET", "/api/registry/totals", None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["carbon"], json!({"registries": 1, "issued": 100, "retired": 40}));
    assert_eq!(body["totalRegistries"], 2);
    assert_eq!(body["totalCountries"], 2);
    Ok(())
}

#[tokio::test]
async fn mutations_require_a_token() -> anyhow::Result<()> {
    let app = build_app(Some(sample_registry()), None).await;

    let req = json_request("POST", "/api/registry/carbonRegistries", None, json!({"id": "x"}))?;
    let (status, _, body) = app.send(req).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let req = json_request("POST", "/api/registry/carbonRegistries", Some("not-a-jwt"), json!({"id": "x"}))?;
    let (status, _, _) = app.send(req).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // nothing was written
    let raw = app.backend.get_raw("registry.json").await.expect("seeded");
    assert_eq!(serde_json::from_slice::<Value>(&raw)?, sample_registry());
    Ok(())
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_sets_cookie_on_success() -> anyhow::Result<()> {
    let app = build_app(None, None).await;

    let req = json_request("POST", "/api/auth/login", None, json!({"username": "admin", "password": "wrong"}))?;
    let (status, _, _) = app.send(req).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = json_request("POST", "/api/auth/login", None, json!({"username": "admin", "password": "changeme"}))?;
    let (status, headers, body) = app.send(req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 3600);
    let cookie = headers[header::SET_COOKIE].to_str()?;
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));
    Ok(())
}

#[tokio::test]
async fn cookie_token_authenticates_me() -> anyhow::Result<()> {
    let app = build_app(None, None).await;
    let token = app.token().await?;

    let req = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, format!("theme=dark; auth_token={token}"))
        .body(Body::empty())?;
    let (status, _, body) = app.send(req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "admin");
    Ok(())
}

#[tokio::test]
async fn record_crud_flow_keeps_totals_current() -> anyhow::Result<()> {
    let app = build_app(Some(sample_registry()), None).await;
    let token = app.token().await?;
    let t = Some(token.as_str());

    // add
    let req = json_request(
        "POST",
        "/api/registry/recRegistries",
        t,
        json!({"id": "irec", "country": "India", "issued": 10, "retired": 2}),
    )?;
    let (status, _, body) = app.send(req).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recRegistries"][0]["id"], "irec");
    assert_eq!(body["totals"]["rec"], json!({"registries": 1, "issued": 10, "retired": 2}));
    assert_eq!(body["totals"]["totalCountries"], 3);
    assert_eq!(body["lastUpdated"], today());

    // read back single record
    let (status, _, body) = app.send(empty_request("GET", "/api/registry/recRegistries/irec", t)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country"], "India");

    // update replaces verbatim
    let req = json_request("PUT", "/api/registry/recRegistries/irec", t, json!({"id": "irec", "issued": 50}))?;
    let (status, _, body) = app.send(req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recRegistries"][0], json!({"id": "irec", "issued": 50}));
    assert_eq!(body["totals"]["rec"]["issued"], 50);
    assert_eq!(body["totals"]["totalCountries"], 2);

    // delete
    let (status, _, body) = app.send(empty_request("DELETE", "/api/registry/recRegistries/irec", t)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recRegistries"], json!([]));
    assert_eq!(body["totals"]["totalRegistries"], 2);

    // update after delete is a not-found, not a fault
    let req = json_request("PUT", "/api/registry/recRegistries/irec", t, json!({"id": "irec"}))?;
    let (status, _, body) = app.send(req).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Record Not Found");
    Ok(())
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() -> anyhow::Result<()> {
    let app = build_app(None, None).await;
    let token = app.token().await?;
    for scheme in ["bearer", "BEARER", "Bearer"] {
        let req = Request::builder()
            .uri("/api/auth/me")
            .header(header::AUTHORIZATION, format!("{scheme} {token}"))
            .body(Body::empty())?;
        let (status, _, body) = app.send(req).await?;
        assert_eq!(status, StatusCode::OK, "scheme {scheme}");
        assert_eq!(body["username"], "admin");
    }

    let req = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, format!("Basic {token}"))
        .body(Body::empty())?;
    let (status, _, _) = app.send(req).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn unknown_list_is_bad_request() -> anyhow::Result<()> {
    let app = build_app(Some(sample_registry()), None).await;
    let token = app.token().await?;
    let (status, _, body) = app
        .send(empty_request("GET", "/api/registry/otherRegistries", Some(&token))?)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation Error");
    Ok(())
}

#[tokio::test]
async fn missing_and_corrupt_documents_are_distinguished() -> anyhow::Result<()> {
    let app = build_app(None, None).await;
    let (status, _, body) = app.send(empty_request("GET", "/api/registry", None)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Document Not Found");

    app.backend.put_raw("registry.json", "{\"carbonRegistries\": [").await;
    let (status, _, body) = app.send(empty_request("GET", "/api/registry", None)?).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Document Corrupt");

    app.backend.put_raw("registry.json", r#"{"carbonRegistries": "oops"}"#).await;
    let (status, _, body) = app.send(empty_request("GET", "/api/registry/totals", None)?).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Document Corrupt");
    Ok(())
}

#[tokio::test]
async fn insights_section_update() -> anyhow::Result<()> {
    let app = build_app(None, Some(json!({"headline": "old", "charts": []}))).await;
    let token = app.token().await?;

    let (status, _, body) = app.send(empty_request("GET", "/api/insights", None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["headline"], "old");

    let req = json_request("PUT", "/api/insights/headline", Some(&token), json!("new"))?;
    let (status, _, body) = app.send(req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["headline"], "new");
    assert_eq!(body["charts"], json!([]));

    let req = json_request("PUT", "/api/insights", None, json!({"headline": "x"}))?;
    let (status, _, _) = app.send(req).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin_with_credentials() -> anyhow::Result<()> {
    let app = build_app(None, None).await;
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/api/registry/carbonRegistries")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(Body::empty())?;
    let resp = app.router.clone().oneshot(req).await?;
    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/api/registry")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())?;
    let resp = app.router.clone().oneshot(req).await?;
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    Ok(())
}
