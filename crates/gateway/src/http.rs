//! HTTP adapter for the check protocol (Envoy ext-authz HTTP service mode).
//!
//! The proxy forwards the original request's headers to any path on this
//! router. A 200 response lets the request through and the proxy copies the
//! identity headers upstream; any other status is returned to the client.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::check::{AuthGateway, CheckRequest, CheckResponse};

/// Tells Envoy which request headers to drop before forwarding upstream.
pub const HEADER_HEADERS_TO_REMOVE: &str = "x-envoy-auth-headers-to-remove";

/// Builds a router answering the check on every method and path.
pub fn router(gateway: Arc<AuthGateway>) -> Router {
    Router::new().fallback(check).with_state(gateway)
}

async fn check(State(gateway): State<Arc<AuthGateway>>, headers: HeaderMap) -> Response {
    let request = to_check_request(&headers);
    into_response(gateway.check(&request).await)
}

fn to_check_request(headers: &HeaderMap) -> CheckRequest {
    // Repeated fields (HTTP/2 splits `cookie`) are combined by `CheckRequest`.
    // Non-UTF-8 bytes are replaced rather than dropping the whole field.
    CheckRequest::from_headers(headers.iter().map(|(name, value)| {
        (
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
    }))
}

fn into_response(response: CheckResponse) -> Response {
    let (status, headers, body) = match response {
        CheckResponse::Ok(ok) => {
            let mut headers = ok.headers_to_add;
            headers.push((
                HEADER_HEADERS_TO_REMOVE.to_string(),
                ok.headers_to_remove.join(","),
            ));
            (StatusCode::OK, headers, String::new())
        }
        CheckResponse::Denied(denied) => (
            StatusCode::from_u16(denied.status).unwrap_or(StatusCode::FORBIDDEN),
            denied.headers,
            denied.body,
        ),
    };

    let mut header_map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                header_map.insert(name, value);
            }
            _ => {
                tracing::error!(header = %name, "identity cannot be expressed as a header");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    (status, header_map, Body::from(body)).into_response()
}
