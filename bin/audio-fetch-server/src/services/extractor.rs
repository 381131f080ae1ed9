//! Seam between the HTTP layer and the external downloader.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The tool ran and reported a download problem (network, geo-block,
    /// removed or private content, unsupported URL).
    #[error("{0}")]
    Download(String),

    /// The tool could not be run, was killed, or failed in a way it did not
    /// itself describe as a download error.
    #[error("{0}")]
    Unexpected(String),
}

/// Downloads `url` and transcodes it to MP3.
///
/// `output_template` is a yt-dlp style template (`<dir>/<stem>.%(ext)s`).
/// On `Ok` the implementation has written its output next to the template;
/// the caller is responsible for finding it.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, url: &str, output_template: &Path) -> Result<(), ExtractError>;
}
