//! [`Extractor`] backed by the `yt-dlp` command-line tool.
//!
//! yt-dlp does the site negotiation and download, then runs ffmpeg as its
//! audio post-processor. The option set is fixed:
//!
//! | option                       | purpose                                 |
//! |------------------------------|-----------------------------------------|
//! | `--format bestaudio/best`    | best audio stream, muxed as fallback    |
//! | `--no-playlist`              | a playlist URL yields one item only     |
//! | `--extract-audio` + mp3/192K | ffmpeg post-processing to MP3           |
//! | `--no-check-certificates`    | skip TLS validation                     |
//! | `--quiet --no-warnings`      | only `ERROR:` lines reach stderr        |

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::services::extractor::{ExtractError, Extractor};

/// Target bitrate handed to `--audio-quality`.
const AUDIO_QUALITY: &str = "192K";

/// Marker yt-dlp puts in front of every reported failure.
const ERROR_MARKER: &str = "ERROR:";

#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    program: String,
    leading_args: Vec<String>,
    ffmpeg_location: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl YtDlpExtractor {
    /// `command` is split on whitespace so launchers such as
    /// `python3 -m yt_dlp` work as well as a bare binary name.
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_owned);
        let program = parts.next().unwrap_or_else(|| "yt-dlp".to_owned());
        Self {
            program,
            leading_args: parts.collect(),
            ffmpeg_location: None,
            timeout: None,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let mut extractor = Self::new(&cfg.ytdlp_bin);
        if let Some(limit) = cfg.extract_timeout {
            extractor = extractor.with_timeout(limit);
        }

        // ffmpeg-sidecar falls back to a bare "ffmpeg" when it has no managed
        // copy; in that case yt-dlp finds it on PATH by itself.
        let ffmpeg = ffmpeg_sidecar::paths::ffmpeg_path();
        if ffmpeg.is_absolute() {
            extractor = extractor.with_ffmpeg_location(ffmpeg);
        }
        extractor
    }

    pub fn with_ffmpeg_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_location = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn build_args(&self, url: &str, output_template: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.leading_args.iter().map(OsString::from).collect();
        args.extend(
            [
                "--format",
                "bestaudio/best",
                "--no-playlist",
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                AUDIO_QUALITY,
                "--no-check-certificates",
                "--quiet",
                "--no-warnings",
                "--no-progress",
            ]
            .map(OsString::from),
        );
        args.push("--output".into());
        args.push(output_template.as_os_str().to_owned());
        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.as_os_str().to_owned());
        }
        // Everything after `--` is positional, so a URL can never be read as an option.
        args.push("--".into());
        args.push(url.into());
        args
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn extract(&self, url: &str, output_template: &Path) -> Result<(), ExtractError> {
        let args = self.build_args(url, output_template);
        debug!(program = %self.program, ?args, "spawning yt-dlp");

        let started = Instant::now();
        let run = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                warn!(url, timeout_secs = limit.as_secs_f64(), "yt-dlp timed out, killed");
                ExtractError::Unexpected(format!(
                    "yt-dlp did not finish within {}s",
                    limit.as_secs_f64()
                ))
            })?,
            None => run.await,
        }
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExtractError::Unexpected(format!("yt-dlp executable '{}' not found", self.program))
            } else {
                ExtractError::Unexpected(format!("failed to run yt-dlp: {e}"))
            }
        })?;

        if output.status.success() {
            info!(url, elapsed_ms = started.elapsed().as_millis(), "yt-dlp finished");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(url, status = %output.status, stderr = %stderr.trim(), "yt-dlp failed");
        Err(classify_failure(output.status, &stderr))
    }
}

/// Turn a failed run into an [`ExtractError`].
///
/// yt-dlp prints `ERROR: <reason>` for every failure it understands; the last
/// such line is the most specific one. Anything else (a crash, a signal, a
/// launcher error) is unexpected.
fn classify_failure(status: ExitStatus, stderr: &str) -> ExtractError {
    let last_error = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(ERROR_MARKER));
    if let Some(reason) = last_error {
        return ExtractError::Download(reason.trim().to_owned());
    }

    let tail = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .unwrap_or("no diagnostic output");
    ExtractError::Unexpected(format!("yt-dlp exited with {status}: {tail}"))
}
