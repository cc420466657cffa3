//! CORS headers for the relay routes.
//!
//! The allow-list decides whether the caller's origin is echoed back;
//! everything else gets a wildcard. Rejection of foreign origins happens in
//! the generate handler, not here.

use crate::services::OriginCheck;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::borrow::Cow;

pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";

/// The caller's declared origin: `Origin`, or `Referer` when `Origin` is
/// missing or empty. Returns an empty string when neither is sent.
///
/// Non-UTF-8 bytes are replaced rather than dropped, so a garbled header
/// still counts as declared and fails the allow-list.
pub fn declared_origin(headers: &HeaderMap) -> Cow<'_, str> {
    [header::ORIGIN, header::REFERER]
        .iter()
        .filter_map(|name| headers.get(name))
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
        .find(|value| !value.trim().is_empty())
        .map(|value| match value {
            Cow::Borrowed(value) => Cow::Borrowed(value.trim()),
            Cow::Owned(value) => Cow::Owned(value.trim().to_string()),
        })
        .unwrap_or(Cow::Borrowed(""))
}

pub async fn cors_headers_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let echo_origin = req
        .headers()
        .get(header::ORIGIN)
        .filter(|value| {
            value
                .to_str()
                .map(|origin| state.origin_policy.check(origin) == OriginCheck::Allowed)
                .unwrap_or(false)
        })
        .cloned();

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    match echo_origin {
        Some(origin) => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
        None => {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            );
        }
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );

    response
}
