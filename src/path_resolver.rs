//! Path resolution
//! Normalizes an arbitrary URL/href into a root-relative storage path

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::settings::ResizerSettings;

// Greedy prefix makes this capture the last /wp-content/ segment
static WP_CONTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*(/wp-content/.*)$").expect("wp-content regex"));

/// Extract the root-relative storage path from a URL.
///
/// Fast path: everything from the uploads-directory marker onward. Fallback:
/// structural parse; cross-origin hosts get their path re-prefixed with
/// `/scheme://host` so they stay distinguishable from local paths. The
/// prefixed form is an opaque token, never a real filesystem path. Returns
/// an empty string when no path can be recovered; callers treat empty as
/// unrewritable.
pub fn extract_path(settings: &ResizerSettings, url: &str) -> String {
    if let Some(captures) = WP_CONTENT_RE.captures(url) {
        if let Some(path) = captures.get(1) {
            return path.as_str().to_string();
        }
    }

    // Root-relative references are already paths
    if url.starts_with('/') {
        return url.to_string();
    }

    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    if parsed.cannot_be_a_base() {
        return String::new();
    }

    let path = parsed.path();
    if let Some(host) = parsed.host_str() {
        let external = settings
            .site_host()
            .map_or(true, |site| !host.eq_ignore_ascii_case(site));
        if external {
            return format!("/{}://{}{}", parsed.scheme(), host, path);
        }
    }

    if path.is_empty() {
        String::new()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ResizerSettings {
        ResizerSettings::new("https://example.com", "/var/www/html")
    }

    #[test]
    fn test_uploads_fast_path() {
        let s = settings();
        assert_eq!(
            extract_path(&s, "https://example.com/wp-content/uploads/a.jpg"),
            "/wp-content/uploads/a.jpg"
        );
        assert_eq!(
            extract_path(&s, "/wp-content/uploads/a.jpg"),
            "/wp-content/uploads/a.jpg"
        );
    }

    #[test]
    fn test_last_marker_wins() {
        let s = settings();
        assert_eq!(
            extract_path(&s, "https://a.com/wp-content/x/wp-content/uploads/b.png"),
            "/wp-content/uploads/b.png"
        );
    }

    #[test]
    fn test_structural_fallback_same_origin() {
        let s = settings();
        assert_eq!(
            extract_path(&s, "https://example.com/img/a.jpg"),
            "/img/a.jpg"
        );
    }

    #[test]
    fn test_cross_origin_prefixing() {
        let s = settings();
        assert_eq!(
            extract_path(&s, "https://other.com/img/a.jpg"),
            "/https://other.com/img/a.jpg"
        );
    }

    #[test]
    fn test_unresolvable_inputs() {
        let s = settings();
        assert_eq!(extract_path(&s, "img/a.jpg"), "");
        assert_eq!(extract_path(&s, ""), "");
    }
}
