use url::Url;

use super::origin_of;

/// Ordered, never-empty list of URLs to try the fragment at.
///
/// Order: the directory of the running script (when known), then every
/// directory prefix of the page path from deepest to the domain root, then
/// the bare relative fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates(Vec<String>);

impl Candidates {
    pub fn build(location: &Url, script_src: Option<&str>, fragment_path: &str) -> Self {
        let fragment_path = fragment_path
            .trim_start_matches("./")
            .trim_start_matches('/');
        let mut urls = Vec::new();

        if let Some(dir) = script_src.and_then(|src| script_directory(location, src)) {
            urls.push(format!("{dir}/{fragment_path}"));
        }

        if let Some(segments) = location.path_segments() {
            let origin = origin_of(location);
            let segments: Vec<&str> = segments.filter(|seg| !seg.is_empty()).collect();
            // /a/b -> /a/b/<fragment>, /a/<fragment>, /<fragment>
            for depth in (0..=segments.len()).rev() {
                let prefix: String = segments[..depth]
                    .iter()
                    .map(|seg| format!("/{seg}"))
                    .collect();
                urls.push(format!("{origin}{prefix}/{fragment_path}"));
            }
        }

        urls.push(fragment_path.to_string());
        urls.push(format!("./{fragment_path}"));
        Self(urls)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Candidates {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn script_directory(location: &Url, src: &str) -> Option<String> {
    let script = location.join(src).ok()?;
    if script.cannot_be_a_base() {
        return None;
    }
    let path = script.path();
    let dir = &path[..path.rfind('/').unwrap_or(0)];
    Some(format!("{}{dir}", origin_of(&script)))
}
