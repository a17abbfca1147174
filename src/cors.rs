//! Cross-origin headers for the browser-hosted lead form.
//!
//! Every response carries them, including errors, 405s and body-limit
//! rejections, so the form can read the JSON reply from any origin.

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

pub const ALLOWED_METHODS: &str = "POST,OPTIONS";
pub const ALLOWED_HEADERS: &str = "content-type";

/// Mirror the request `Origin` (or `*` when absent) and allow POST/OPTIONS.
pub async fn cors_headers(request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.append(header::VARY, HeaderValue::from_static("Origin"));

    response
}
