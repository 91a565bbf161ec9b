//! URL work: where to look for the fragment, what its links point at, and
//! which nav link names the current page.

mod active;
mod candidates;
mod resolve;

pub use active::{is_active, normalize_path, PathMatch};
pub use candidates::Candidates;
pub use resolve::{is_absolute_url, SiteRoot};

use url::Url;

/// `scheme://host[:port]` for hierarchical URLs. Opaque origins (`file:`
/// and friends) fall back to the scheme and host text instead of `null`.
pub(crate) fn origin_of(url: &Url) -> String {
    let origin = url.origin();
    if origin.is_tuple() {
        origin.ascii_serialization()
    } else {
        format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default())
    }
}
