//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

/// Name of the variable holding the shared secret for `X-Api-Key`.
pub const API_KEY_ENV: &str = "DOWNLOADER_API_KEY";

/// Runtime configuration for audio-fetch-server.
///
/// Loaded once in `main` and shared read-only through [`crate::state::AppState`].
/// Every field has a default so the server runs with no environment set.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Shared secret expected in `X-Api-Key`. `None` leaves `/download` open.
    pub api_key: Option<String>,

    /// yt-dlp executable, resolved through `PATH` when not absolute.
    pub ytdlp_bin: String,

    /// Fetch a managed ffmpeg build at startup if none is installed.
    pub ffmpeg_auto_download: bool,

    /// Parent directory for per-request workspaces.
    pub work_root: PathBuf,

    /// Upper bound on a single extraction. `None` waits indefinitely.
    pub extract_timeout: Option<Duration>,

    /// Comma-separated CORS origin allowlist; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("AUDIO_FETCH_BIND", "0.0.0.0:8000"),
            log_level: env_or("AUDIO_FETCH_LOG", "info"),
            log_json: parse_flag("AUDIO_FETCH_LOG_JSON"),
            api_key: non_empty_env(API_KEY_ENV),
            ytdlp_bin: env_or("AUDIO_FETCH_YTDLP_BIN", "yt-dlp"),
            ffmpeg_auto_download: parse_flag("AUDIO_FETCH_FFMPEG_AUTO_DOWNLOAD"),
            work_root: non_empty_env("AUDIO_FETCH_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            extract_timeout: match parse_env::<u64>("AUDIO_FETCH_EXTRACT_TIMEOUT_SECS", 0) {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            cors_allowed_origins: non_empty_env("AUDIO_FETCH_CORS_ORIGINS"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            api_key: None,
            ytdlp_bin: "yt-dlp".to_owned(),
            ffmpeg_auto_download: false,
            work_root: std::env::temp_dir(),
            extract_timeout: None,
            cors_allowed_origins: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("ytdlp_bin", &self.ytdlp_bin)
            .field("ffmpeg_auto_download", &self.ffmpeg_auto_download)
            .field("work_root", &self.work_root)
            .field("extract_timeout", &self.extract_timeout)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
