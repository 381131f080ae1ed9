use serde::Deserialize;

/// Query string of `GET /download`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadQuery {
    /// Media page URL handed to the downloader.
    pub url: Option<String>,
}

impl DownloadQuery {
    /// The trimmed URL, or `None` when absent or blank.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blank_url_counts_as_missing() {
        let q = DownloadQuery { url: Some("   ".into()) };
        assert_eq!(q.url(), None);
        assert_eq!(DownloadQuery::default().url(), None);
    }

    #[test]
    fn url_is_trimmed() {
        let q = DownloadQuery { url: Some(" https://x.test/v \n".into()) };
        assert_eq!(q.url(), Some("https://x.test/v"));
    }
}
