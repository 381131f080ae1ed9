//! Request-independent building blocks behind the `/download` route.

pub mod artifact;
pub mod extractor;
pub mod workspace;
pub mod ytdlp;

pub use extractor::{ExtractError, Extractor};
pub use workspace::Workspace;
pub use ytdlp::YtDlpExtractor;
