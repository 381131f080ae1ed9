use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::ServerError;
use crate::state::AppState;

pub static X_API_KEY: &str = "x-api-key";

/// Reject the request with 401 unless `X-Api-Key` matches the configured
/// secret. Without a configured secret every request passes.
///
/// Runs before any extractor of the wrapped handler, so a rejected request
/// never touches the filesystem.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(expected) = state.config.api_key.as_deref() {
        let provided = req.headers().get(X_API_KEY).and_then(|v| v.to_str().ok());
        if provided != Some(expected) {
            warn!(
                header_present = provided.is_some(),
                "rejecting request with missing or wrong api key"
            );
            return ServerError::Unauthorized.into_response();
        }
    }
    next.run(req).await
}
