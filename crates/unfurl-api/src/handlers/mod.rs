//! Request handlers.

pub mod generated;
pub mod health;
pub mod resolve;

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// Write a cached or freshly loaded response as-is.
pub(crate) fn respond(response: unfurl_core::Response) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut http = (status, Body::from(response.payload)).into_response();
    if let Ok(content_type) = HeaderValue::from_str(&response.content_type) {
        http.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    http
}
