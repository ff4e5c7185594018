//! Resizer settings
//! Immutable per-pass configuration for the rewrite engine

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

/// Path segment that marks a URL as already served through the CDN
pub const CDN_PATH_MARKER: &str = "/cdn-cgi/image/";

/// Resolved configuration for one rewrite pass. Built once, validated once,
/// then read-only for the lifetime of the pass.
#[derive(Debug, Clone)]
pub struct ResizerSettings {
    pub enabled: bool,
    /// Site base URL without trailing slash, e.g. "https://example.com"
    pub site_url: String,
    /// Optional folder prefix inserted between the CDN segment and the path
    pub site_folder: String,
    /// Filesystem root the resolved paths live under
    pub site_dir: String,
    pub fit: String,
    pub gravity: String,
    pub quality: u32,
    /// Accepted for compatibility; never serialized into the CDN URL
    pub sharpen: u32,
    pub format: String,
    pub onerror: String,
    pub metadata: String,
    pub max_width: u32,
    /// Recognized image extensions, lowercase, without leading dot
    pub image_types: HashSet<String>,
    site_host: Option<String>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("max_width must be greater than zero")]
    ZeroMaxWidth,
    #[error("image_types must not be empty while rewriting is enabled")]
    NoImageTypes,
    #[error("site_url must not be empty")]
    EmptySiteUrl,
}

fn default_image_types() -> HashSet<String> {
    ["jpg", "jpeg", "gif", "png", "webp", "svg"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl ResizerSettings {
    /// Settings with the stock defaults: quality 80, scale-down fit, auto
    /// format, 1600px max width, common raster formats plus svg.
    pub fn new(site_url: impl Into<String>, site_dir: impl Into<String>) -> Self {
        let site_url = site_url.into().trim_end_matches('/').to_string();
        let site_host = Url::parse(&site_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));

        Self {
            enabled: true,
            site_url,
            site_folder: String::new(),
            site_dir: site_dir.into(),
            fit: "scale-down".to_string(),
            gravity: String::new(),
            quality: 80,
            sharpen: 0,
            format: "auto".to_string(),
            onerror: "redirect".to_string(),
            metadata: "none".to_string(),
            max_width: 1600,
            image_types: default_image_types(),
            site_host,
        }
    }

    /// Lowercased host component of `site_url`, when it parses as a URL
    pub fn site_host(&self) -> Option<&str> {
        self.site_host.as_deref()
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_width == 0 {
            return Err(SettingsError::ZeroMaxWidth);
        }
        if self.enabled && self.image_types.is_empty() {
            return Err(SettingsError::NoImageTypes);
        }
        if self.enabled && self.site_url.is_empty() {
            return Err(SettingsError::EmptySiteUrl);
        }
        Ok(())
    }
}
