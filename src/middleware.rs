//! Response headers added to every reply, including errors and 404s.

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// API versions this service answers to.
pub const SUPPORTED_API_VERSIONS: &str = "1.0";

pub async fn response_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("api-supported-versions"),
        HeaderValue::from_static(SUPPORTED_API_VERSIONS),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.append(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    response
}
