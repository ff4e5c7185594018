//! Resource classification
//! Decides whether a reference is local, already CDN-optimized, and a
//! recognized image type

use url::Url;

use crate::settings::{ResizerSettings, CDN_PATH_MARKER};

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// True when the URI resolves to the current site's own origin or storage
/// root. A URI whose host cannot be parsed is treated as not local, so it is
/// never rewritten.
pub fn is_local_resource(settings: &ResizerSettings, uri: &str) -> bool {
    if uri.starts_with('/') {
        return true;
    }
    if starts_with_ignore_case(uri, &settings.site_url) {
        return true;
    }
    if starts_with_ignore_case(uri, "data:image") {
        return true;
    }
    if is_optimized_image(uri) {
        return true;
    }
    match (Url::parse(uri), settings.site_host()) {
        (Ok(parsed), Some(site_host)) => parsed
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(site_host)),
        _ => false,
    }
}

/// True when the URL already points at the CDN transformation endpoint.
/// Plain substring test, not anchored.
pub fn is_optimized_image(image_url: &str) -> bool {
    image_url.contains(CDN_PATH_MARKER)
}

/// Valid means the URI's path ends with a dot followed by one of the
/// configured extensions. `data:image` URIs are explicitly excluded.
pub fn is_valid_image(settings: &ResizerSettings, image: &str) -> bool {
    if starts_with_ignore_case(image, "data:image") {
        return false;
    }

    // Extension check runs against the path only, not query or fragment
    let path = image
        .split(['?', '#'])
        .next()
        .unwrap_or(image);

    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    if ext.is_empty() || ext.contains('/') {
        return false;
    }
    settings.image_types.contains(&ext.to_ascii_lowercase())
}
