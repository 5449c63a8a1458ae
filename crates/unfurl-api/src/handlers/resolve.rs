//! Link and thumbnail handlers.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::respond;
use crate::middleware::request_context;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}

pub async fn link_resolver(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UrlQuery>,
) -> Response {
    let request = request_context(&headers);
    respond(
        state
            .link_resolver
            .resolve(query.url.as_deref(), &request)
            .await,
    )
}

/// `/link_resolver/<percent-encoded url>`, kept for older clients.
pub async fn legacy_link_resolver(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(url): Path<String>,
) -> Response {
    let request = request_context(&headers);
    respond(state.link_resolver.resolve(Some(&url), &request).await)
}

pub async fn thumbnail(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UrlQuery>,
) -> Response {
    let request = request_context(&headers);
    respond(
        state
            .link_resolver
            .thumbnail(query.url.as_deref(), &request)
            .await,
    )
}
