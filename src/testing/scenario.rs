//! HTTP scenario testing for organization-scoped routes.
//!
//! Requests run against an axum [`Router`] without starting a server. A
//! scenario can carry a [`CallerIdentity`] the way authentication middleware
//! would leave it in request extensions.
//!
//! # Example
//!
//! ```rust,ignore
//! use photocomp::testing;
//!
//! testing::get(app, "/orgs/Acme/settings")
//!     .caller(CallerIdentity::new("user_1", "user_1@example.com"))
//!     .execute()
//!     .await
//!     .assert_forbidden()
//!     .assert_error_code("not_admin")
//!     .await;
//! ```

use crate::organizations::CallerIdentity;
use axum::{
    Router,
    body::Body,
    http::{HeaderName, Method, Request, StatusCode, header},
};
use serde::{Serialize, de::DeserializeOwned};
use tower::ServiceExt;

/// Test scenario builder for endpoint testing
pub struct Scenario {
    app: Router,
    request: Request<Body>,
}

impl Scenario {
    /// Create a new test scenario with the given app
    pub fn new(app: Router) -> Self {
        let mut request = Request::new(Body::empty());
        *request.uri_mut() = "/".parse().unwrap();
        Self { app, request }
    }

    pub fn method(mut self, method: Method) -> Self {
        *self.request.method_mut() = method;
        self
    }

    pub fn uri(mut self, uri: &str) -> Self {
        *self.request.uri_mut() = uri
            .parse()
            .unwrap_or_else(|e| panic!("invalid test URI {uri:?}: {e}"));
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.headers_mut().insert(
            HeaderName::from_bytes(key.as_bytes()).unwrap(),
            value.parse().unwrap(),
        );
        self
    }

    /// Act as an authenticated caller.
    pub fn caller(mut self, caller: CallerIdentity) -> Self {
        self.request.extensions_mut().insert(caller);
        self
    }

    /// Add query parameters to the request URI
    pub fn with_query(mut self, params: &[(&str, &str)]) -> Self {
        let uri = self.request.uri().clone();
        let mut query_parts: Vec<String> = uri.query().map(str::to_string).into_iter().collect();
        query_parts.extend(
            params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))),
        );

        let new_uri = if query_parts.is_empty() {
            uri.path().to_string()
        } else {
            format!("{}?{}", uri.path(), query_parts.join("&"))
        };
        *self.request.uri_mut() = new_uri.parse().unwrap();
        self
    }

    /// Set JSON body from a serializable type
    pub fn json_body<T: Serialize>(mut self, body: &T) -> Self {
        *self.request.body_mut() = Body::from(serde_json::to_vec(body).unwrap());
        self.request
            .headers_mut()
            .insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        self
    }

    /// Execute the request and get an assertion builder
    pub async fn execute(self) -> ScenarioAssert {
        let response = self.app.oneshot(self.request).await.unwrap();
        ScenarioAssert { response }
    }
}

/// Assertion builder for test responses
pub struct ScenarioAssert {
    response: axum::response::Response,
}

impl ScenarioAssert {
    /// Assert the response status code
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.response.status(),
            expected,
            "Expected status {}, got {}",
            expected,
            self.response.status()
        );
        self
    }

    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn assert_bad_request(self) -> Self {
        self.assert_status(StatusCode::BAD_REQUEST)
    }

    pub fn assert_unauthorized(self) -> Self {
        self.assert_status(StatusCode::UNAUTHORIZED)
    }

    pub fn assert_forbidden(self) -> Self {
        self.assert_status(StatusCode::FORBIDDEN)
    }

    pub fn assert_not_found(self) -> Self {
        self.assert_status(StatusCode::NOT_FOUND)
    }

    pub fn assert_server_error(self) -> Self {
        self.assert_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Get the response body as bytes
    pub async fn body_bytes(self) -> Vec<u8> {
        axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    pub async fn body_string(self) -> String {
        String::from_utf8(self.body_bytes().await).unwrap()
    }

    /// Parse the JSON response body into a type
    pub async fn json<T: DeserializeOwned>(self) -> T {
        let bytes = self.body_bytes().await;
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            panic!(
                "Failed to parse JSON response: {e}. Body: {}",
                String::from_utf8_lossy(&bytes)
            )
        })
    }

    /// Assert the error body carries `code` and return the body.
    pub async fn assert_error_code(self, code: &str) -> serde_json::Value {
        let body: serde_json::Value = self.json().await;
        assert_eq!(body["code"], code, "Error code mismatch. Body: {body}");
        body
    }

    /// Get the underlying response for custom assertions
    pub fn response(self) -> axum::response::Response {
        self.response
    }
}

/// Convenience function to create a GET request scenario
pub fn get(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::GET).uri(uri)
}

/// Convenience function to create a POST request scenario
pub fn post(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::POST).uri(uri)
}

/// Convenience function to create a PUT request scenario
pub fn put(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::PUT).uri(uri)
}

/// Convenience function to create a DELETE request scenario
pub fn delete(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::DELETE).uri(uri)
}
