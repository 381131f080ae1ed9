use crate::state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// `GET` only, `X-Api-Key` allowed in, `Content-Disposition` exposed so a
/// browser caller can read the suggested filename.
pub fn cors_layer(state: Arc<AppState>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any)
        .expose_headers([axum::http::header::CONTENT_DISPOSITION]);

    let origins: Vec<axum::http::HeaderValue> = state
        .config
        .cors_allowed_origins
        .as_deref()
        .map(|list| {
            list.split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    if origins.is_empty() {
        // Wildcard; set AUDIO_FETCH_CORS_ORIGINS to restrict.
        base.allow_origin(Any)
    } else {
        base.allow_origin(origins)
    }
}
