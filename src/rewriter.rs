//! Image rewriter core
//! Builds /cdn-cgi/image/ transformation URLs from local references and
//! memoizes them for the duration of one rewrite pass

use std::collections::HashMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::classifier::{is_local_resource, is_optimized_image, is_valid_image};
use crate::dimensions::{extract_sizes, source_image_path, FileStore};
use crate::events::EventSink;
use crate::path_resolver::extract_path;
use crate::settings::ResizerSettings;

// Matches PHP urlencode(): everything but [A-Za-z0-9-_.] gets escaped, so
// the comma-joined parameter string is encoded as one unit
const URLENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Outcome of processing one candidate reference. Scanners aggregate these
/// and keep going; nothing here ever aborts a document pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Use this URL in place of the reference
    Rewritten(String),
    /// Not rewritable; leave the reference exactly as found
    Skipped,
    /// Something went wrong for this one reference; leave it as found and
    /// report through the event sink
    Failed(String),
}

/// One rewrite pass over a document. Owns the pass-scoped cache; concurrent
/// passes must each construct their own instance.
pub struct ImageRewriter<'a> {
    pub(crate) settings: &'a ResizerSettings,
    pub(crate) store: &'a dyn FileStore,
    pub(crate) events: &'a dyn EventSink,
    cache: HashMap<(String, u32, u32), String>,
    rewrites: usize,
}

impl<'a> ImageRewriter<'a> {
    pub fn new(
        settings: &'a ResizerSettings,
        store: &'a dyn FileStore,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            settings,
            store,
            events,
            cache: HashMap::new(),
            rewrites: 0,
        }
    }

    /// Number of references rewritten so far in this pass
    pub fn rewrite_count(&self) -> usize {
        self.rewrites
    }

    /// Build the CDN transformation URL for a reference. Non-rewritable
    /// inputs come back unchanged; this never errors.
    pub fn cloudflare_uri(
        &mut self,
        image_path: &str,
        width: Option<u32>,
        height: Option<u32>,
        origin: &str,
    ) -> String {
        match self.rewrite_reference(image_path, width, height, origin) {
            RewriteOutcome::Rewritten(url) => url,
            RewriteOutcome::Skipped => image_path.to_string(),
            RewriteOutcome::Failed(reason) => {
                self.events.rewrite_error(origin, image_path, &reason);
                image_path.to_string()
            }
        }
    }

    /// Attachment-URL entry point: skips already-optimized and non-image
    /// URLs, otherwise rewrites with no explicit dimensions.
    pub fn rewrite_attachment_url(&mut self, url: &str) -> String {
        if is_optimized_image(url) || !is_valid_image(self.settings, url) {
            return url.to_string();
        }
        self.cloudflare_uri(url, None, None, "attachment_url")
    }

    /// Srcset-array entry point: each (url, width) source is rewritten with
    /// its own explicit width; invalid images pass through unchanged.
    pub fn rewrite_srcset_sources(&mut self, sources: &[(String, u32)]) -> Vec<String> {
        sources
            .iter()
            .map(|(url, width)| {
                if !is_valid_image(self.settings, url) {
                    url.clone()
                } else {
                    self.cloudflare_uri(url, Some(*width), None, "srcset")
                }
            })
            .collect()
    }

    /// Classify, resolve, and build. Dimensions of zero are treated as
    /// absent throughout.
    pub(crate) fn rewrite_reference(
        &mut self,
        raw: &str,
        width: Option<u32>,
        height: Option<u32>,
        origin: &str,
    ) -> RewriteOutcome {
        if !is_local_resource(self.settings, raw) || !is_valid_image(self.settings, raw) {
            return RewriteOutcome::Skipped;
        }

        let image_path = extract_path(self.settings, raw);
        if image_path.is_empty() {
            return RewriteOutcome::Skipped;
        }

        let width = width.filter(|w| *w > 0);
        let height = height.filter(|h| *h > 0);

        let key = (image_path.clone(), width.unwrap_or(0), height.unwrap_or(0));
        if let Some(hit) = self.cache.get(&key) {
            self.rewrites += 1;
            return RewriteOutcome::Rewritten(hit.clone());
        }

        let url = self.build_url(&image_path, width, height, origin);
        if Url::parse(&url).is_err() {
            return RewriteOutcome::Failed(format!("assembled URL is not valid: {}", url));
        }

        self.cache.insert(key, url.clone());
        self.rewrites += 1;
        RewriteOutcome::Rewritten(url)
    }

    fn build_url(
        &self,
        image_path: &str,
        width: Option<u32>,
        height: Option<u32>,
        origin: &str,
    ) -> String {
        let s = self.settings;

        // Field order is fixed so output is reproducible
        let mut params: Vec<(&str, String)> = vec![
            ("ref", origin.to_string()),
            ("quality", s.quality.to_string()),
            ("format", s.format.clone()),
            ("onerror", s.onerror.clone()),
            ("metadata", s.metadata.clone()),
            ("gravity", s.gravity.clone()),
            ("fit", s.fit.clone()),
        ];

        let (mut final_width, mut final_height) = match (width, height) {
            (Some(w), Some(h)) => (Some(w), Some(h)),
            (Some(w), None) => {
                // derive height from the image's own aspect ratio
                let (natural_w, natural_h) = extract_sizes(self.store, image_path);
                let ratio = natural_w as f64 / natural_h as f64;
                let derived = (w as f64 / ratio).round() as u32;
                (Some(w), Some(derived).filter(|h| *h > 0))
            }
            _ => {
                let (natural_w, natural_h) = extract_sizes(self.store, image_path);
                (
                    Some(natural_w).filter(|w| *w > 0),
                    Some(natural_h).filter(|h| *h > 0),
                )
            }
        };

        if let Some(w) = final_width {
            if w > s.max_width {
                self.events
                    .max_size_exceeded(image_path, w, final_height, s.max_width);
                if let Some(h) = final_height {
                    let ratio = s.max_width as f64 / w as f64;
                    final_height = Some((h as f64 * ratio).round() as u32);
                }
                final_width = Some(s.max_width);
            }
        }

        if let Some(w) = final_width {
            params.push(("width", w.to_string()));
        }
        if let Some(h) = final_height {
            params.push(("height", h.to_string()));
        }

        let joined = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(",");
        let encoded = utf8_percent_encode(&joined, URLENCODE_SET);

        let source_path = source_image_path(self.store, image_path);

        format!(
            "{}/cdn-cgi/image/{}{}{}",
            s.site_url, encoded, s.site_folder, source_path
        )
    }
}
