//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response (`{"error": "..."}`) with an appropriate
//! status code.
//!
//! Diagnostics coming from the external downloader are passed through to the
//! caller, cut to [`MAX_DETAIL_CHARS`] characters.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::ExtractError;

/// Longest external-tool message forwarded to a client.
pub const MAX_DETAIL_CHARS: usize = 200;

/// All errors that can occur in the download request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or wrong `X-Api-Key` while a shared secret is configured.
    #[error("unauthorized")]
    Unauthorized,

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The downloader reported a download-specific failure (network,
    /// geo-restriction, unavailable content).
    #[error("extraction failed: {0}")]
    ExtractionFailure(String),

    /// The downloader exited cleanly but left no MP3 in the workspace.
    #[error("downloader created no mp3 file")]
    NoOutputProduced,

    /// Anything else that went wrong while serving the request.
    #[error("unexpected error: {0}")]
    UnexpectedFailure(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_owned()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),

            ServerError::ExtractionFailure(m) => {
                error!(error = %m, "yt-dlp reported a download error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("yt-dlp error: {}", truncate_detail(m)),
                )
            }
            ServerError::NoOutputProduced => {
                error!("downloader finished without producing an mp3");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Downloader created no mp3 file".to_owned(),
                )
            }
            ServerError::UnexpectedFailure(m) => {
                error!(error = %m, "unexpected failure while serving download");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Unexpected error: {}", truncate_detail(m)),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<ExtractError> for ServerError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Download(m) => ServerError::ExtractionFailure(m),
            ExtractError::Unexpected(m) => ServerError::UnexpectedFailure(m),
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::UnexpectedFailure(e.to_string())
    }
}

/// Cut `message` to at most [`MAX_DETAIL_CHARS`] characters on a char boundary.
pub fn truncate_detail(message: &str) -> &str {
    match message.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((idx, _)) => &message[..idx],
        None => message,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn truncate_keeps_short_messages() {
        assert_eq!(truncate_detail("boom"), "boom");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(MAX_DETAIL_CHARS + 50);
        let cut = truncate_detail(&long);
        assert_eq!(cut.chars().count(), MAX_DETAIL_CHARS);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_401() {
        let resp = ServerError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn extraction_failure_is_truncated_500() {
        let resp = ServerError::ExtractionFailure("x".repeat(1000)).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let msg = body_json(resp).await["error"].as_str().unwrap().to_owned();
        assert_eq!(msg, format!("yt-dlp error: {}", "x".repeat(MAX_DETAIL_CHARS)));
    }

    #[tokio::test]
    async fn unexpected_failure_is_prefixed() {
        let resp = ServerError::UnexpectedFailure("disk full".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "Unexpected error: disk full");
    }

    #[test]
    fn extract_errors_keep_their_kind() {
        assert!(matches!(
            ServerError::from(ExtractError::Download("geo".into())),
            ServerError::ExtractionFailure(_)
        ));
        assert!(matches!(
            ServerError::from(ExtractError::Unexpected("spawn".into())),
            ServerError::UnexpectedFailure(_)
        ));
    }
}
