use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The boundary error type for PhotoComp request handling.
///
/// Core operations return their own typed failures
/// ([`OrganizationError`](crate::organizations::OrganizationError)); this type
/// is what those failures become once they reach an HTTP route.
#[derive(Debug, thiserror::Error)]
pub enum PhotoCompError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// JSON body returned for failed requests.
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    error_id: String,
}

impl PhotoCompError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns a message suitable for client responses.
    ///
    /// Client errors (4xx) carry their message through. Server errors (5xx)
    /// are replaced with a generic message; the full error is only logged.
    pub fn safe_message(&self) -> String {
        match self {
            Self::NotFound(msg) => format!("Not found: {}", msg),
            Self::BadRequest(msg) => format!("Bad request: {}", msg),
            Self::Unauthorized(msg) => format!("Unauthorized: {}", msg),
            Self::Forbidden(msg) => format!("Forbidden: {}", msg),
            Self::Conflict(msg) => format!("Conflict: {}", msg),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::ServiceUnavailable(_) => "Service unavailable".to_string(),
        }
    }

    /// Build a response, optionally tagging it with a machine-readable code.
    pub(crate) fn into_response_with_code(self, code: Option<&str>) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        // Full message stays server-side
        tracing::error!(
            status = status.as_u16(),
            error_id = %error_id,
            code = code.unwrap_or("-"),
            error = %self,
            "Request failed"
        );

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            code: code.map(str::to_string),
            error_id,
        });

        (status, body).into_response()
    }
}

impl IntoResponse for PhotoCompError {
    fn into_response(self) -> Response {
        self.into_response_with_code(None)
    }
}

/// Result type alias for boundary handlers.
pub type Result<T> = std::result::Result<T, PhotoCompError>;

impl From<serde_json::Error> for PhotoCompError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            PhotoCompError::BadRequest(format!("JSON error: {}", err))
        } else {
            PhotoCompError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = PhotoCompError::not_found("Organization ACME");
        assert!(matches!(err, PhotoCompError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: Organization ACME");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_forbidden_error() {
        let err = PhotoCompError::forbidden("Not a member");
        assert_eq!(err.to_string(), "Forbidden: Not a member");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_conflict_error() {
        let err = PhotoCompError::conflict("Organization already exists");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_internal_error_message_is_hidden() {
        let err = PhotoCompError::internal("table unreachable: 10.0.0.4");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.safe_message(), "Internal server error");
    }

    #[test]
    fn test_client_error_message_is_exposed() {
        let err = PhotoCompError::bad_request("No valid fields provided to update");
        assert_eq!(
            err.safe_message(),
            "Bad request: No valid fields provided to update"
        );
    }

    #[test]
    fn test_json_syntax_error_is_bad_request() {
        let err: PhotoCompError = serde_json::from_str::<serde_json::Value>("{nope")
            .unwrap_err()
            .into();
        assert!(matches!(err, PhotoCompError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_response_body_hides_internal_detail() {
        let response = PhotoCompError::internal("secret detail").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
        assert!(json["error_id"].is_string());
        assert!(json.get("code").is_none());
    }

    #[tokio::test]
    async fn test_response_body_carries_code() {
        let response = PhotoCompError::forbidden("Only an Org Admin can perform this action")
            .into_response_with_code(Some("not_admin"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "not_admin");
    }
}
