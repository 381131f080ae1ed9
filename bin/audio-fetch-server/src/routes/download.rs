//! `GET /download?url=…`: fetch a media URL as MP3 and stream it back.
//!
//! Order of operations:
//! 1. `X-Api-Key` check (route layer, before any extractor runs).
//! 2. `url` validation.
//! 3. Workspace acquisition.
//! 4. yt-dlp run into the workspace.
//! 5. Artifact lookup and open.
//! 6. Streaming response; the body owns the workspace.
//!
//! Every failure after step 3 releases the workspace before returning.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::error::ServerError;
use crate::middleware::auth;
use crate::schemas::download::DownloadQuery;
use crate::services::artifact::{self, Artifact};
use crate::services::workspace::WorkspaceStream;
use crate::services::Workspace;
use crate::state::AppState;

const AUDIO_MPEG: &str = "audio/mpeg";

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/download", get(download))
        .route_layer(middleware::from_fn_with_state(state, auth::require_api_key))
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, ServerError> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let url = query
        .url()
        .ok_or_else(|| ServerError::BadRequest("Missing 'url' query param".into()))?
        .to_owned();

    let workspace = Workspace::acquire(&state.config.work_root).await?;
    info!(workspace_id = %workspace.id(), url = %url, "download accepted");

    match produce(&state, &url, &workspace).await {
        Ok((artifact, file, len)) => Ok(stream_artifact(workspace, &artifact, file, len)),
        Err(e) => {
            workspace.release();
            Err(e)
        }
    }
}

/// Run the extractor and open its output. Does not release the workspace.
async fn produce(
    state: &AppState,
    url: &str,
    workspace: &Workspace,
) -> Result<(Artifact, File, u64), ServerError> {
    state
        .extractor
        .extract(url, &workspace.output_template())
        .await?;

    let artifact = artifact::locate(workspace.path(), &workspace.artifact_stem())
        .await?
        .ok_or(ServerError::NoOutputProduced)?;

    let file = File::open(&artifact.path).await?;
    let len = file.metadata().await?.len();
    debug!(file = %artifact.file_name, bytes = len, "artifact ready");
    Ok((artifact, file, len))
}

fn stream_artifact(workspace: Workspace, artifact: &Artifact, file: File, len: u64) -> Response {
    info!(
        workspace_id = %workspace.id(),
        file = %artifact.file_name,
        bytes = len,
        "streaming artifact"
    );

    let body = Body::from_stream(WorkspaceStream::new(ReaderStream::new(file), workspace));
    let disposition = HeaderValue::from_str(&content_disposition(&artifact.file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(AUDIO_MPEG)),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(len)),
        ],
        body,
    )
        .into_response()
}

/// `attachment; filename="<name>"`, with characters that would break the
/// quoted-string replaced by `_`.
fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}
