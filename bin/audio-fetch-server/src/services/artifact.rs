//! Finding the MP3 the downloader left in a workspace.

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

const MP3_EXTENSION: &str = ".mp3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
}

/// Return the MP3 in `dir` whose name starts with `stem`.
///
/// The extension match is case-insensitive. Names that are not valid UTF-8
/// are skipped. If several files qualify, the lexicographically smallest is
/// returned so the choice does not depend on directory-listing order.
pub async fn locate(dir: &Path, stem: &str) -> io::Result<Option<Artifact>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut candidates = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !is_mp3_for(&name, stem) || !entry.file_type().await?.is_file() {
            continue;
        }
        candidates.push(name);
    }

    candidates.sort();
    if candidates.len() > 1 {
        warn!(
            workspace = %dir.display(),
            count = candidates.len(),
            "several mp3 candidates; picking the first by name"
        );
    }

    Ok(candidates.into_iter().next().map(|file_name| Artifact {
        path: dir.join(&file_name),
        file_name,
    }))
}

fn is_mp3_for(name: &str, stem: &str) -> bool {
    name.starts_with(stem)
        && name.len() >= MP3_EXTENSION.len()
        && name
            .get(name.len() - MP3_EXTENSION.len()..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(MP3_EXTENSION))
}

#[cfg(test)]
mod test {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"ID3").unwrap();
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(is_mp3_for("song_ab.mp3", "song_ab"));
        assert!(is_mp3_for("song_ab.MP3", "song_ab"));
        assert!(!is_mp3_for("song_ab.webm", "song_ab"));
        assert!(!is_mp3_for("song_ab.mp3.part", "song_ab"));
        assert!(!is_mp3_for("other.mp3", "song_ab"));
        assert!(!is_mp3_for("mp3", "mp3"));
    }

    #[test]
    fn multibyte_names_do_not_panic() {
        assert!(!is_mp3_for("song_abé", "song_ab"));
    }

    #[tokio::test]
    async fn empty_workspace_has_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(locate(dir.path(), "song_ab").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ignores_intermediates_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "song_ab.webm");
        touch(dir.path(), "song_ab.mp3.part");
        touch(dir.path(), "stray.mp3");
        std::fs::create_dir(dir.path().join("song_ab_dir.mp3")).unwrap();

        assert_eq!(locate(dir.path(), "song_ab").await.unwrap(), None);
    }

    #[tokio::test]
    async fn finds_single_output() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "song_ab.webm");
        touch(dir.path(), "song_ab.mp3");

        let found = locate(dir.path(), "song_ab").await.unwrap().unwrap();
        assert_eq!(found.file_name, "song_ab.mp3");
        assert_eq!(found.path, dir.path().join("song_ab.mp3"));
    }

    #[tokio::test]
    async fn multiple_matches_pick_smallest_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "song_ab.mp3");
        touch(dir.path(), "song_ab (1).MP3");

        let found = locate(dir.path(), "song_ab").await.unwrap().unwrap();
        assert_eq!(found.file_name, "song_ab (1).MP3");
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(locate(&dir.path().join("gone"), "song").await.is_err());
    }
}
