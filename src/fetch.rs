//! Fetch boundary and the fragment loader.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

use crate::links::Candidates;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    /// Final URL after redirects, when the fetcher knows it.
    pub url: Option<String>,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            url: None,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            url: None,
            body: String::new(),
        }
    }

    pub fn served_from(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("request to '{url}' failed: {message}")]
    Network { url: String, message: String },

    #[error("could not read body of '{url}': {message}")]
    Body { url: String, message: String },

    #[error("cannot fetch '{0}'")]
    Unsupported(String),
}

/// A single HTTP GET. Implementations must not retry.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

impl<T: Fetch> Fetch for &T {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        (**self).get(url).await
    }
}

/// Fragment markup and where it was actually served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFragment {
    pub html: String,
    pub served_url: String,
}

/// Tries each candidate in order and returns the first 2xx body.
///
/// Failures only advance to the next candidate; running out of candidates
/// yields `None`.
pub async fn load_fragment<F: Fetch>(fetcher: &F, candidates: &Candidates) -> Option<LoadedFragment> {
    for candidate in candidates {
        match fetcher.get(candidate).await {
            Ok(response) if response.is_success() => {
                let served_url = response.url.unwrap_or_else(|| candidate.clone());
                tracing::info!(candidate = %candidate, served = %served_url, "loaded nav fragment");
                return Some(LoadedFragment {
                    html: response.body,
                    served_url,
                });
            }
            Ok(response) => {
                tracing::debug!(candidate = %candidate, status = response.status, "nav candidate rejected");
            }
            Err(err) => {
                tracing::debug!(candidate = %candidate, error = %err, "nav candidate failed");
            }
        }
    }
    tracing::warn!(tried = candidates.len(), "no nav fragment candidate succeeded");
    None
}

/// Serves a static site from a local directory, as a static file host would.
///
/// URLs are resolved against `base` (normally the page location); only URLs
/// on the same origin are served. Path segments are percent-decoded, and a
/// segment that decodes to `..` or contains a separator is refused. Directory
/// URLs map to `index.html`.
#[derive(Debug, Clone)]
pub struct SiteDirFetcher {
    root: PathBuf,
    base: Url,
}

impl SiteDirFetcher {
    pub fn new(root: impl AsRef<Path>, base: Url) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            base,
        }
    }

    fn file_for(&self, url: &Url) -> Option<PathBuf> {
        if url.origin() != self.base.origin() {
            return None;
        }
        let mut path = self.root.clone();
        for segment in url.path_segments()? {
            let segment = percent_decode_str(segment).decode_utf8().ok()?;
            if segment == ".." || segment.contains(['/', '\\']) {
                return None;
            }
            if !segment.is_empty() {
                path.push(&*segment);
            }
        }
        if url.path().ends_with('/') {
            path.push("index.html");
        }
        Some(path)
    }
}

impl Fetch for SiteDirFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let resolved = self
            .base
            .join(url)
            .map_err(|_| FetchError::Unsupported(url.to_string()))?;
        let path = self
            .file_for(&resolved)
            .ok_or_else(|| FetchError::Unsupported(resolved.to_string()))?;

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FetchResponse::with_status(404).served_from(resolved));
            }
            Err(e) => {
                return Err(FetchError::Network {
                    url: resolved.to_string(),
                    message: e.to_string(),
                })
            }
        };
        let body = String::from_utf8(bytes).map_err(|e| FetchError::Body {
            url: resolved.to_string(),
            message: e.to_string(),
        })?;
        Ok(FetchResponse::ok(body).served_from(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Scripted {
        responses: HashMap<String, Result<FetchResponse, String>>,
        requested: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn respond(mut self, url: &str, response: FetchResponse) -> Self {
            self.responses.insert(url.into(), Ok(response));
            self
        }

        fn fail(mut self, url: &str) -> Self {
            self.responses.insert(url.into(), Err("connection reset".into()));
            self
        }
    }

    impl Fetch for Scripted {
        async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
            self.requested.borrow_mut().push(url.to_string());
            match self.responses.get(url) {
                Some(Ok(response)) => Ok(response.clone()),
                Some(Err(message)) => Err(FetchError::Network {
                    url: url.into(),
                    message: message.clone(),
                }),
                None => Ok(FetchResponse::with_status(404)),
            }
        }
    }

    fn candidates() -> Candidates {
        Candidates::build(
            &Url::parse("https://example.org/a/b.html").unwrap(),
            None,
            "includes/nav.html",
        )
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_first_success_wins() {
        let fetcher = Scripted::default()
            .fail("https://example.org/a/b.html/includes/nav.html")
            .respond("https://example.org/a/includes/nav.html", FetchResponse::ok("<nav>a</nav>"))
            .respond("https://example.org/includes/nav.html", FetchResponse::ok("<nav>root</nav>"));

        let loaded = load_fragment(&fetcher, &candidates()).await.unwrap();

        assert_eq!(loaded.html, "<nav>a</nav>");
        assert_eq!(loaded.served_url, "https://example.org/a/includes/nav.html");
        assert_eq!(fetcher.requested.borrow().len(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_non_success_status_falls_through() {
        let fetcher = Scripted::default()
            .respond(
                "https://example.org/a/b.html/includes/nav.html",
                FetchResponse {
                    status: 500,
                    url: None,
                    body: "<nav>error page</nav>".into(),
                },
            )
            .respond("./includes/nav.html", FetchResponse::ok("<nav>bare</nav>"));

        let loaded = load_fragment(&fetcher, &candidates()).await.unwrap();

        assert_eq!(loaded.html, "<nav>bare</nav>");
        assert_eq!(loaded.served_url, "./includes/nav.html");
        assert_eq!(fetcher.requested.borrow().len(), candidates().len());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_redirected_url_is_reported() {
        let fetcher = Scripted::default().respond(
            "https://example.org/a/b.html/includes/nav.html",
            FetchResponse::ok("<nav></nav>").served_from("https://cdn.example.org/site/includes/nav.html"),
        );

        let loaded = load_fragment(&fetcher, &candidates()).await.unwrap();
        assert_eq!(loaded.served_url, "https://cdn.example.org/site/includes/nav.html");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_all_candidates_fail() {
        let fetcher = Scripted::default();
        assert_eq!(load_fragment(&fetcher, &candidates()).await, None);
        assert_eq!(
            fetcher.requested.borrow().as_slice(),
            candidates().as_slice()
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_site_dir_fetcher_serves_files() {
        let site = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(site.path().join("includes")).unwrap();
        std::fs::write(site.path().join("includes/nav.html"), "<nav></nav>").unwrap();
        std::fs::write(site.path().join("index.html"), "home").unwrap();
        let base = Url::parse("https://example.org/docs/page.html").unwrap();
        let fetcher = SiteDirFetcher::new(site.path(), base);

        let nav = fetcher.get("https://example.org/includes/nav.html").await.unwrap();
        assert!(nav.is_success());
        assert_eq!(nav.body, "<nav></nav>");

        let home = fetcher.get("/").await.unwrap();
        assert_eq!(home.body, "home");

        let missing = fetcher.get("includes/nav.html").await.unwrap();
        assert_eq!(missing.status, 404);
        assert_eq!(missing.url.as_deref(), Some("https://example.org/docs/includes/nav.html"));

        assert!(matches!(
            fetcher.get("https://elsewhere.org/includes/nav.html").await,
            Err(FetchError::Unsupported(_))
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_site_dir_fetcher_decodes_segments() {
        let site = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(site.path().join("my docs/includes")).unwrap();
        std::fs::write(site.path().join("my docs/includes/nav.html"), "<nav></nav>").unwrap();
        let base = Url::parse("https://example.org/my docs/page.html").unwrap();
        let fetcher = SiteDirFetcher::new(site.path(), base);

        let nav = fetcher
            .get("https://example.org/my%20docs/includes/nav.html")
            .await
            .unwrap();
        assert!(nav.is_success());
        assert_eq!(nav.body, "<nav></nav>");

        let relative = fetcher.get("includes/nav.html").await.unwrap();
        assert!(relative.is_success());

        assert!(matches!(
            fetcher.get("/my%20docs%2F..%2F..%2Fsecret").await,
            Err(FetchError::Unsupported(_))
        ));
    }
}
