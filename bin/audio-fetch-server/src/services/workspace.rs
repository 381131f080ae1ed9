//! Per-request scratch directories.
//!
//! A [`Workspace`] owns one uniquely named directory under the configured
//! work root. The directory is removed exactly once: either by an explicit
//! [`Workspace::release`] on a failure path, or when the handle is dropped.
//! On the success path the handle travels inside the response body stream,
//! so the drop happens only after the last chunk has been sent.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tracing::{debug, warn};
use uuid::Uuid;

/// Directory-name prefix for every workspace.
pub const WORKSPACE_PREFIX: &str = "ydl_";

/// Filename prefix of the artifact the downloader is told to write.
pub const ARTIFACT_PREFIX: &str = "song_";

#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    dir: PathBuf,
    released: bool,
}

impl Workspace {
    /// Create a fresh directory under `root`.
    ///
    /// `create_dir` (not `create_dir_all`) is used for the leaf so an existing
    /// path is an error rather than silently shared.
    pub async fn acquire(root: &Path) -> io::Result<Self> {
        tokio::fs::create_dir_all(root).await?;

        let id = Uuid::new_v4();
        let dir = root.join(format!("{WORKSPACE_PREFIX}{}", id.simple()));
        tokio::fs::create_dir(&dir).await?;

        debug!(workspace = %dir.display(), "workspace acquired");
        Ok(Self {
            id,
            dir,
            released: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Stem of the single file the downloader should produce, e.g. `song_1a2b3c4d`.
    pub fn artifact_stem(&self) -> String {
        let simple = self.id.simple().to_string();
        format!("{ARTIFACT_PREFIX}{}", &simple[..8])
    }

    /// yt-dlp output template scoped to this workspace.
    pub fn output_template(&self) -> PathBuf {
        self.dir.join(format!("{}.%(ext)s", self.artifact_stem()))
    }

    /// Delete the directory now. Never fails; errors are logged and dropped.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(workspace = %self.dir.display(), "workspace removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(workspace = %self.dir.display(), "workspace already gone")
            }
            Err(e) => warn!(
                workspace = %self.dir.display(),
                error = %e,
                "failed to remove workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Stream adapter that owns a [`Workspace`] for as long as the body is alive.
///
/// The workspace is released as soon as the inner stream is exhausted, or
/// when the adapter is dropped (client went away mid-transfer).
pub struct WorkspaceStream<S> {
    inner: S,
    workspace: Option<Workspace>,
}

impl<S> WorkspaceStream<S> {
    pub fn new(inner: S, workspace: Workspace) -> Self {
        Self {
            inner,
            workspace: Some(workspace),
        }
    }
}

impl<S: Stream + Unpin> Stream for WorkspaceStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(None) = polled {
            if let Some(workspace) = self.workspace.take() {
                debug!(workspace = %workspace.path().display(), "stream finished");
                workspace.release();
            }
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::StreamExt;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn acquire_creates_prefixed_directory() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).await.unwrap();

        assert!(ws.path().is_dir());
        assert!(ws.path().starts_with(root.path()));
        let name = ws.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(WORKSPACE_PREFIX));
    }

    #[tokio::test]
    async fn acquire_creates_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let ws = Workspace::acquire(&nested).await.unwrap();
        assert!(ws.path().starts_with(&nested));
    }

    #[tokio::test]
    async fn release_removes_directory_and_contents() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).await.unwrap();
        let dir = ws.path().to_path_buf();
        std::fs::write(dir.join("partial.webm"), b"junk").unwrap();

        ws.release();
        assert!(!dir.exists());
    }

    #[tokio::test]
    #[traced_test]
    async fn release_tolerates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).await.unwrap();
        std::fs::remove_dir_all(ws.path()).unwrap();

        ws.release();
        assert!(logs_contain("workspace already gone"));
    }

    #[tokio::test]
    async fn drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = {
            let ws = Workspace::acquire(root.path()).await.unwrap();
            ws.path().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn concurrent_workspaces_are_isolated() {
        let root = tempfile::tempdir().unwrap();
        let (a, b) = tokio::join!(
            Workspace::acquire(root.path()),
            Workspace::acquire(root.path())
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.id(), b.id());
        assert_ne!(a.path(), b.path());

        std::fs::write(b.path().join("keep.mp3"), b"id3").unwrap();
        let b_dir = b.path().to_path_buf();
        a.release();
        assert!(b_dir.join("keep.mp3").exists());
    }

    #[tokio::test]
    async fn output_template_embeds_artifact_stem() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).await.unwrap();
        let stem = ws.artifact_stem();

        assert!(stem.starts_with(ARTIFACT_PREFIX));
        assert_eq!(stem.len(), ARTIFACT_PREFIX.len() + 8);
        let template = ws.output_template();
        assert_eq!(template.parent(), Some(ws.path()));
        assert_eq!(
            template.file_name().unwrap().to_str().unwrap(),
            format!("{stem}.%(ext)s")
        );
    }

    #[tokio::test]
    async fn stream_holds_workspace_until_exhausted() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).await.unwrap();
        let dir = ws.path().to_path_buf();

        let mut stream = WorkspaceStream::new(futures::stream::iter([1, 2]), ws);
        assert_eq!(stream.next().await, Some(1));
        assert_eq!(stream.next().await, Some(2));
        assert!(dir.exists());

        assert_eq!(stream.next().await, None);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn dropping_unfinished_stream_releases_workspace() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).await.unwrap();
        let dir = ws.path().to_path_buf();

        let mut stream = WorkspaceStream::new(futures::stream::iter([1, 2, 3]), ws);
        assert_eq!(stream.next().await, Some(1));
        drop(stream);
        assert!(!dir.exists());
    }
}
