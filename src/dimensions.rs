//! Dimension resolution
//! Width/height discovery for a resolved path: filename suffix first, pixel
//! probe on disk as a fallback, 1x1 sentinel when nothing is determinable

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

// WordPress-style generated filename, e.g. project-9-1200x848.jpg
static SIZE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,4})x([0-9]{1,4})\.[A-Za-z]+$").expect("size regex"));

static SOURCE_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)-\d+x\d+\.([A-Za-z]+)$").expect("source strip regex"));

/// Filesystem read interface for dimension resolution. Paths are the
/// root-relative resolved paths produced by the path resolver.
pub trait FileStore {
    fn exists(&self, path: &str) -> bool;
    fn image_dimensions(&self, path: &str) -> Option<(u32, u32)>;
}

/// Disk-backed store rooted at the site's filesystem root
pub struct DiskStore {
    root: String,
}

impl DiskStore {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.root.trim_end_matches('/'), path))
    }
}

impl FileStore for DiskStore {
    fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_file()
    }

    fn image_dimensions(&self, path: &str) -> Option<(u32, u32)> {
        match image::image_dimensions(self.full_path(path)) {
            Ok(dims) => Some(dims),
            Err(e) => {
                tracing::debug!("Dimension probe failed for {}: {}", path, e);
                None
            }
        }
    }
}

/// Resolve (width, height) for a path. The filename suffix is the common
/// case and avoids touching the filesystem entirely; only originals and
/// non-conforming names fall through to the on-disk probe. Never returns a
/// zero dimension: (1, 1) is the no-evidence sentinel.
pub fn extract_sizes(store: &dyn FileStore, image_path: &str) -> (u32, u32) {
    if let Some(captures) = SIZE_SUFFIX_RE.captures(image_path) {
        let width = captures.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let height = captures.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
        if let (Some(w), Some(h)) = (width, height) {
            return (w, h);
        }
    }

    if !store.exists(image_path) {
        return (1, 1);
    }

    match store.image_dimensions(image_path) {
        Some((w, h)) if w > 0 && h > 0 => (w, h),
        _ => (1, 1),
    }
}

/// Strip a `-WxH` size suffix from the filename to recover the unscaled
/// source file. The stripped path is only used when that file actually
/// exists; otherwise the original path is returned.
pub fn source_image_path(store: &dyn FileStore, image_path: &str) -> String {
    let stripped = SOURCE_STRIP_RE.replace(image_path, "${1}.${2}");
    if stripped != image_path && store.exists(&stripped) {
        stripped.into_owned()
    } else {
        image_path.to_string()
    }
}
