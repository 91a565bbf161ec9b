use std::fmt;

use url::Url;

use super::origin_of;

/// Base every fragment-internal link target is resolved against.
///
/// Empty for root-relative resolution, otherwise an origin plus path with
/// no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SiteRoot(String);

impl SiteRoot {
    /// Derives the root from the URL that served the fragment: the fragment
    /// path suffix and a trailing slash are removed.
    ///
    /// Returns `None` when `served` cannot be resolved against `location`.
    pub fn discover(served: &str, location: &Url, fragment_path: &str) -> Option<Self> {
        let served = location.join(served).ok()?;
        if served.cannot_be_a_base() {
            return None;
        }
        let suffix = format!(
            "/{}",
            fragment_path.trim_start_matches("./").trim_start_matches('/')
        );
        let path = served.path();
        let path = path.strip_suffix(suffix.as_str()).unwrap_or(path);
        let path = path.strip_suffix('/').unwrap_or(path);
        Some(Self(format!("{}{path}", origin_of(&served))))
    }

    pub fn fixed(root: &str) -> Self {
        Self(root.strip_suffix('/').unwrap_or(root).to_string())
    }

    /// Root used when nothing better is known: targets become `/…`.
    pub fn root_relative() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn resolve(&self, target: &str) -> String {
        if is_absolute_url(target) {
            target.to_string()
        } else if target.starts_with('/') {
            format!("{}{target}", self.0)
        } else {
            format!("{}/{}", self.0, target.trim_start_matches('/'))
        }
    }
}

impl fmt::Display for SiteRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `scheme://…` where the scheme is a letter followed by letters, digits,
/// `+`, `-` or `.`.
pub fn is_absolute_url(target: &str) -> bool {
    let Some((scheme, _)) = target.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://user.github.io/Repo/blog/post.html").unwrap()
    }

    #[test]
    fn test_resolution_rules() {
        let root = SiteRoot::fixed("https://x/y");
        assert_eq!(root.resolve("/a/b"), "https://x/y/a/b");
        assert_eq!(root.resolve("a/b"), "https://x/y/a/b");
        assert_eq!(root.resolve("//a/b"), "https://x/y//a/b");
        assert_eq!(root.resolve("https://z/c"), "https://z/c");
    }

    #[test]
    fn test_absolute_resolution_is_idempotent() {
        let root = SiteRoot::fixed("https://x/y");
        let once = root.resolve("about.html");
        assert_eq!(root.resolve(&once), once);
    }

    #[test]
    fn test_root_relative_fallback() {
        let root = SiteRoot::root_relative();
        assert_eq!(root.resolve("about.html"), "/about.html");
        assert_eq!(root.resolve("/about.html"), "/about.html");
    }

    #[test]
    fn test_discover_strips_fragment_suffix() {
        let root = SiteRoot::discover(
            "https://user.github.io/Repo/includes/nav.html",
            &page(),
            "includes/nav.html",
        )
        .unwrap();
        assert_eq!(root.as_str(), "https://user.github.io/Repo");

        let root = SiteRoot::discover("https://example.org/includes/nav.html", &page(), "includes/nav.html")
            .unwrap();
        assert_eq!(root.as_str(), "https://example.org");
    }

    #[test]
    fn test_discover_resolves_relative_served_url() {
        let root = SiteRoot::discover("./includes/nav.html", &page(), "includes/nav.html").unwrap();
        assert_eq!(root.as_str(), "https://user.github.io/Repo/blog");
    }

    #[test]
    fn test_discover_drops_query_and_trailing_slash() {
        let root = SiteRoot::discover("https://example.org/site/?v=1", &page(), "includes/nav.html")
            .unwrap();
        assert_eq!(root.as_str(), "https://example.org/site");
    }

    #[test]
    fn test_discover_fails_without_a_base() {
        let opaque = Url::parse("data:text/html,hi").unwrap();
        assert_eq!(SiteRoot::discover("includes/nav.html", &opaque, "includes/nav.html"), None);
    }

    #[test]
    fn test_absolute_url_pattern() {
        assert!(is_absolute_url("https://example.org"));
        assert!(is_absolute_url("HTTP://example.org"));
        assert!(is_absolute_url("git+ssh://host/repo"));
        assert!(!is_absolute_url("/a?next=https://x"));
        assert!(!is_absolute_url("mailto:a@b"));
        assert!(!is_absolute_url("://nothing"));
    }
}
