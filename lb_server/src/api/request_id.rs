//! Request ID middleware for log correlation.
//!
//! Every response carries an `x-request-id` header, taken from the request
//! when the client sent one. The middleware also records the request in the
//! HTTP metrics and the API request log.

use crate::{logging, metrics};
use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generate or extract request ID from headers
fn get_or_generate_request_id(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Middleware to add request ID to all requests and responses
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = get_or_generate_request_id(request.headers());
    let method = request.method().to_string();
    // Route template keeps metric label cardinality bounded
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed = started.elapsed();

    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    let status = parts.status.as_u16();
    metrics::http_requests_total(&method, &path, status);
    metrics::http_request_duration_ms(&method, &path, elapsed.as_secs_f64() * 1000.0);
    logging::log_api_request(
        &request_id,
        &method,
        &path,
        status,
        elapsed.as_millis() as u64,
    );

    Response::from_parts(parts, body)
}

/// Request ID wrapper for extracting from request extensions
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Axum extractor for request ID
impl<S> axum::extract::FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestId>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Request ID not found in extensions",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HeaderMap;

    #[test]
    fn test_existing_request_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-42"));
        assert_eq!(get_or_generate_request_id(&headers), "req-42");
    }

    #[test]
    fn test_missing_request_id_is_generated() {
        let request_id = get_or_generate_request_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&request_id).is_ok());
    }

    #[test]
    fn test_empty_request_id_is_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(""));
        assert!(Uuid::parse_str(&get_or_generate_request_id(&headers)).is_ok());
    }
}
