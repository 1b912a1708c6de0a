//! Outbound request and inbound response values passed across the
//! [`Transport`](super::Transport) seam.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ApiError;

/// A REST call, fully resolved against the base address.
///
/// `retried` is the one-shot marker that bounds token renewal to a single
/// attempt per original call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Replace the Authorization header with a bearer credential.
    pub fn set_bearer(&mut self, token: &str) -> Result<(), ApiError> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidResponse("Access token is not a valid header value".to_string()))?;
        self.headers.insert(header::AUTHORIZATION, value);
        Ok(())
    }

    /// The bearer token currently attached, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// Status and raw body of a completed call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
    }

    /// Map a non-success response to its error variant.
    pub fn error(&self) -> ApiError {
        ApiError::from_status(self.status, &self.body)
    }

    /// Return the response if successful, otherwise its error.
    pub fn into_success(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_round_trips_through_header() {
        let mut req = ApiRequest::get("http://localhost/api/v1/instruments/");
        assert_eq!(req.bearer(), None);
        req.set_bearer("A1").unwrap();
        assert_eq!(req.bearer(), Some("A1"));
        req.set_bearer("A2").unwrap();
        assert_eq!(req.bearer(), Some("A2"));
        assert_eq!(req.headers.get_all(header::AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_new_request_is_not_retried() {
        let req = ApiRequest::post("http://x/").query("page_size", 100);
        assert!(!req.retried);
        assert_eq!(req.query, vec![("page_size".to_string(), "100".to_string())]);
    }

    #[test]
    fn test_into_success_maps_status() {
        let ok = ApiResponse::new(StatusCode::OK, "[]");
        assert!(ok.into_success().is_ok());

        let missing = ApiResponse::new(StatusCode::NOT_FOUND, "gone");
        assert!(matches!(missing.into_success(), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_json_decode_error_is_invalid_response() {
        let resp = ApiResponse::new(StatusCode::OK, "not json");
        let parsed: Result<Vec<i32>, _> = resp.json();
        assert!(matches!(parsed, Err(ApiError::InvalidResponse(_))));
    }
}
