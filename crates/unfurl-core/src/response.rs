//! Structured JSON body returned by `/link_resolver`.

use crate::cache::Response;
use crate::markup::{escape_html, path_escape};
use serde::{Deserialize, Serialize};

/// Body of every link-resolver response. `status` mirrors the outcome, the
/// HTTP status of the envelope stays 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Serialized form of [`ResolverResponse::internal_error`], used if
/// serialization itself fails.
const INTERNAL_ERROR_BODY: &[u8] = br#"{"status":500,"message":"Error resolving link"}"#;

impl ResolverResponse {
    /// A successful response carrying a tooltip given as raw HTML.
    pub fn tooltip(html: &str) -> Self {
        Self {
            status: 200,
            thumbnail: None,
            tooltip: Some(path_escape(html)),
            link: None,
            message: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// An error response. The message is HTML-escaped.
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            thumbnail: None,
            tooltip: None,
            link: None,
            message: Some(escape_html(message)),
        }
    }

    pub fn invalid_url() -> Self {
        Self::error(400, "Could not fetch link info: Invalid URL")
    }

    pub fn forbidden_url() -> Self {
        Self::error(403, "Could not fetch link info: Forbidden URL")
    }

    pub fn internal_error() -> Self {
        Self::error(500, "Error resolving link")
    }

    pub fn no_link_info(status: u16) -> Self {
        Self::error(status, "Could not fetch link info: No link info found")
    }

    pub fn too_large(limit: u64) -> Self {
        Self::error(
            413,
            &format!(
                "Could not fetch link info: Response too large (>{}MB)",
                limit / 1024 / 1024
            ),
        )
    }

    pub fn no_thumbnail_found() -> Self {
        Self::error(404, "No thumbnail found")
    }

    pub fn unsupported_thumbnail_type() -> Self {
        Self::error(415, "Unsupported thumbnail type")
    }

    pub fn thumbnail_failed() -> Self {
        Self::error(500, "Error building thumbnail")
    }

    /// Confirmed negative from a provider, e.g. an unknown emote id.
    pub fn not_found(message: &str) -> Self {
        Self::error(404, message)
    }

    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|_| INTERNAL_ERROR_BODY.to_vec())
    }

    /// Wrap as an HTTP-200 JSON [`Response`].
    pub fn to_response(&self) -> Response {
        Response::json(self.to_json())
    }
}
