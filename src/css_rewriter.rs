//! CSS rewriter
//! Scans raw text for background/background-image url() declarations and
//! swaps each inner URL in place. No stylesheet parse; surrounding syntax
//! is preserved verbatim.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::classifier::{is_local_resource, is_optimized_image, is_valid_image};
use crate::path_resolver::extract_path;
use crate::rewriter::{ImageRewriter, RewriteOutcome};

static BACKGROUND_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)background(?:-image)?\s?:?\s*url\s*\(\s*['"]?(.*?)['"]?\s*\)"#)
        .expect("background url regex")
});

impl ImageRewriter<'_> {
    /// Rewrite every local image URL inside background declarations of a
    /// text fragment. Candidates that fail classification or path
    /// resolution are skipped; the fragment comes back unchanged when no
    /// candidate survives.
    pub fn rewrite_css_urls(&mut self, text: &str) -> String {
        let mut candidates: Vec<(String, String)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for captures in BACKGROUND_URL_RE.captures_iter(text) {
            let (Some(full), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if inner.as_str().is_empty() {
                continue;
            }
            if !seen.insert(full.as_str().to_string()) {
                continue;
            }
            candidates.push((full.as_str().to_string(), inner.as_str().to_string()));
        }

        if candidates.is_empty() {
            return text.to_string();
        }

        let mut result = text.to_string();
        for (declaration, image) in &candidates {
            if !is_local_resource(self.settings, image)
                || is_optimized_image(image)
                || !is_valid_image(self.settings, image)
            {
                continue;
            }
            let image_path = extract_path(self.settings, image);
            if image_path.is_empty() {
                continue;
            }

            match self.rewrite_reference(&image_path, None, None, "regex") {
                RewriteOutcome::Rewritten(cf_url) => {
                    // swap only the inner URL, keep the declaration text as-is
                    let replacement = declaration.replace(image.as_str(), &cf_url);
                    result = result.replace(declaration.as_str(), &replacement);
                }
                RewriteOutcome::Skipped => {}
                RewriteOutcome::Failed(reason) => {
                    self.events.rewrite_error("regex", image, &reason);
                }
            }
        }

        result
    }
}
