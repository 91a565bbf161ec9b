use url::Url;

/// How a nav link's path is compared with the page path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMatch {
    Exact,
    /// Also accept the link path as a trailing part of the page path, for
    /// sites whose links are root-relative but are hosted under a subpath.
    Suffix,
}

/// Strips a trailing `index.html`, then a trailing slash. The root stays `/`.
pub fn normalize_path(path: &str) -> &str {
    let path = match path.strip_suffix("index.html") {
        Some(dir) if dir.is_empty() || dir.ends_with('/') => dir,
        _ => path,
    };
    match path.strip_suffix('/').unwrap_or(path) {
        "" => "/",
        trimmed => trimmed,
    }
}

/// Whether a nav link with `target` points at the page at `location`.
///
/// Targets that do not parse as URLs never match.
pub fn is_active(target: &str, location: &Url, mode: PathMatch) -> bool {
    let link = match location.join(target) {
        Ok(link) if !link.cannot_be_a_base() => link,
        Ok(_) => return false,
        Err(err) => {
            tracing::debug!(%target, %err, "ignoring malformed nav link");
            return false;
        }
    };
    let link_path = normalize_path(link.path());
    let page_path = normalize_path(location.path());

    match mode {
        PathMatch::Exact => link_path == page_path,
        PathMatch::Suffix => {
            link_path == page_path || (link_path != "/" && page_path.ends_with(link_path))
        }
    }
}
