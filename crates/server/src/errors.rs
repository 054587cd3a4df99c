use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::auth::errors::AuthError;
use service::errors::{ServiceError, StoreError};
use service::registry::RegistryList;
use tracing::error;

/// JSON error body: `{"error": <title>, "detail": <message>}`.
#[derive(Debug)]
pub struct JsonApiError {
    status: StatusCode,
    title: &'static str,
    detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, title: &'static str, detail: Option<String>) -> Self {
        Self { status, title, detail }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Mutation target absent from its list. Maps to 404, not a server fault.
    pub fn record_not_found(list: RegistryList, id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "Record Not Found",
            Some(format!("no record with id {id:?} in {list}")),
        )
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", Some(detail.into()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, title = self.title, detail = ?self.detail, "request failed");
        }
        let body = serde_json::json!({"error": self.title, "detail": self.detail});
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for JsonApiError {
    fn from(e: StoreError) -> Self {
        let (status, title) = match &e {
            StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "Document Not Found"),
            StoreError::Parse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Document Corrupt"),
            StoreError::Backend(_) | StoreError::Encode(_) => (StatusCode::BAD_GATEWAY, "Storage Error"),
        };
        Self::new(status, title, Some(e.to_string()))
    }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        Self::unauthorized(e.to_string())
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Store(store) => store.into(),
            ServiceError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, "Validation Error", Some(msg)),
            ServiceError::Auth(auth) => auth.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_distinct_statuses() {
        let cases = [
            (StoreError::not_found("k"), StatusCode::NOT_FOUND),
            (StoreError::Parse("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (StoreError::Backend("down".into()), StatusCode::BAD_GATEWAY),
            (StoreError::Encode("nan".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(JsonApiError::from(ServiceError::from(err)).status(), status);
        }
    }

    #[test]
    fn validation_and_auth_map_to_client_errors() {
        assert_eq!(JsonApiError::from(ServiceError::validation("x")).status(), StatusCode::BAD_REQUEST);
        assert_eq!(JsonApiError::from(AuthError::MissingToken).status(), StatusCode::UNAUTHORIZED);
    }
}
