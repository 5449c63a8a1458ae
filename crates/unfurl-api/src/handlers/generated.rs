//! Serves values generated by resolvers, such as tweet collages.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::state::AppState;

pub async fn generated(State(state): State<Arc<AppState>>, Path(token): Path<String>) -> Response {
    match state.link_resolver.generated(&token).await {
        Ok(Some(value)) => {
            let mut response = (StatusCode::OK, Body::from(value.payload)).into_response();
            if let Ok(content_type) = HeaderValue::from_str(&value.content_type) {
                response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, content_type);
            }
            response
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) if e.is_input_error() => {
            debug!(token = %token, "rejecting invalid generated token");
            StatusCode::BAD_REQUEST.into_response()
        }
        Err(e) => {
            error!(token = %token, error = %e, "failed to load generated value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
