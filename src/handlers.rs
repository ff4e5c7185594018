//! API Handlers

use axum::{
    extract::{Json, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppState;
use crate::dimensions::DiskStore;
use crate::error::AppError;
use crate::events::TracingSink;
use crate::rewriter::ImageRewriter;
use crate::settings::ResizerSettings;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    auth_enabled: bool,
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        auth_enabled: state.api_key.is_some(),
    })
}

/// Rewrite request for one rendered document
#[derive(Deserialize)]
pub struct RewriteRequest {
    pub html: String,
    /// Site base URL the document belongs to
    pub url: String,
    #[serde(default)]
    pub options: RewriteOptions,
}

#[derive(Deserialize, Clone)]
pub struct RewriteOptions {
    #[serde(default = "default_true")]
    pub rewrite_html: bool,
    #[serde(default = "default_true")]
    pub rewrite_css: bool,
    #[serde(default)]
    pub site_folder: String,
    #[serde(default = "default_quality")]
    pub quality: u32,
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_fit")]
    pub fit: String,
    #[serde(default)]
    pub gravity: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_onerror")]
    pub onerror: String,
    #[serde(default = "default_metadata")]
    pub metadata: String,
    /// Extensions eligible for rewriting; empty means keep the defaults
    #[serde(default)]
    pub image_types: Vec<String>,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            rewrite_html: true,
            rewrite_css: true,
            site_folder: String::new(),
            quality: default_quality(),
            max_width: default_max_width(),
            fit: default_fit(),
            gravity: String::new(),
            format: default_format(),
            onerror: default_onerror(),
            metadata: default_metadata(),
            image_types: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_quality() -> u32 {
    80
}

fn default_max_width() -> u32 {
    1600
}

fn default_fit() -> String {
    "scale-down".to_string()
}

fn default_format() -> String {
    "auto".to_string()
}

fn default_onerror() -> String {
    "redirect".to_string()
}

fn default_metadata() -> String {
    "none".to_string()
}

impl RewriteOptions {
    /// Build validated engine settings for one pass
    fn to_settings(&self, site_url: &str, site_dir: &str) -> Result<ResizerSettings, AppError> {
        let mut settings = ResizerSettings::new(site_url, site_dir);
        settings.site_folder = self.site_folder.clone();
        settings.quality = self.quality;
        settings.max_width = self.max_width;
        settings.fit = self.fit.clone();
        settings.gravity = self.gravity.clone();
        settings.format = self.format.clone();
        settings.onerror = self.onerror.clone();
        settings.metadata = self.metadata.clone();
        if !self.image_types.is_empty() {
            settings.image_types = self
                .image_types
                .iter()
                .map(|t| t.trim_start_matches('.').to_ascii_lowercase())
                .collect();
        }
        settings.validate()?;
        Ok(settings)
    }
}

/// Rewrite response
#[derive(Serialize)]
pub struct RewriteResponse {
    pub success: bool,
    pub html: String,
    pub original_size: usize,
    pub rewritten_size: usize,
    pub images_rewritten: usize,
    pub css_urls_rewritten: usize,
    pub request_id: String,
}

fn check_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(ref key) = state.api_key else {
        tracing::error!("Security Error: No API Key configured on server");
        return Err(AppError::Internal(
            "Server misconfiguration: API_KEY must be set".to_string(),
        ));
    };

    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if auth_header != format!("Bearer {}", key) {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn rewrite_page(req: &RewriteRequest, site_dir: &str) -> Result<RewriteResponse, AppError> {
    if req.html.is_empty() {
        return Err(AppError::BadRequest("HTML is required".to_string()));
    }

    let request_id = Uuid::new_v4().to_string();
    tracing::info!(
        request_id = %request_id,
        "Rewriting: {} ({} bytes)",
        req.url,
        req.html.len()
    );

    let settings = req.options.to_settings(&req.url, site_dir)?;
    let store = DiskStore::new(site_dir);
    let sink = TracingSink;
    let mut rewriter = ImageRewriter::new(&settings, &store, &sink);

    let mut html = req.html.clone();
    let mut images_rewritten = 0;
    if req.options.rewrite_html {
        html = rewriter.rewrite_html(&html);
        images_rewritten = rewriter.rewrite_count();
    }
    let mut css_urls_rewritten = 0;
    if req.options.rewrite_css {
        html = rewriter.rewrite_css_urls(&html);
        css_urls_rewritten = rewriter.rewrite_count() - images_rewritten;
    }

    let response = RewriteResponse {
        success: true,
        original_size: req.html.len(),
        rewritten_size: html.len(),
        html,
        images_rewritten,
        css_urls_rewritten,
        request_id: request_id.clone(),
    };

    tracing::info!(
        request_id = %request_id,
        "Rewrote {} image references, {} css urls for {}",
        response.images_rewritten,
        response.css_urls_rewritten,
        req.url
    );

    Ok(response)
}

/// Single page rewrite
pub async fn rewrite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RewriteRequest>,
) -> Result<Json<RewriteResponse>, AppError> {
    check_api_key(&state, &headers)?;
    Ok(Json(rewrite_page(&req, &state.site_dir)?))
}

/// Bulk rewrite request
#[derive(Deserialize)]
pub struct BulkRewriteRequest {
    pub pages: Vec<RewriteRequest>,
}

#[derive(Serialize)]
pub struct BulkRewriteResponse {
    pub success: bool,
    pub results: Vec<RewriteResponse>,
    pub total_images_rewritten: usize,
}

/// Bulk rewrite endpoint; one bad page does not fail the batch
pub async fn rewrite_bulk(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BulkRewriteRequest>,
) -> Result<Json<BulkRewriteResponse>, AppError> {
    check_api_key(&state, &headers)?;

    let mut results = Vec::new();
    let mut total_images_rewritten = 0;

    for page in &req.pages {
        match rewrite_page(page, &state.site_dir) {
            Ok(result) => {
                total_images_rewritten += result.images_rewritten;
                results.push(result);
            }
            Err(e) => {
                tracing::warn!("Failed to rewrite {}: {}", page.url, e);
                results.push(RewriteResponse {
                    success: false,
                    html: page.html.clone(),
                    original_size: page.html.len(),
                    rewritten_size: page.html.len(),
                    images_rewritten: 0,
                    css_urls_rewritten: 0,
                    request_id: Uuid::new_v4().to_string(),
                });
            }
        }
    }

    Ok(Json(BulkRewriteResponse {
        success: true,
        results,
        total_images_rewritten,
    }))
}

/// Attachment-URL batch request
#[derive(Deserialize)]
pub struct RewriteUrlsRequest {
    pub urls: Vec<String>,
    /// Site base URL the attachments belong to
    pub url: String,
    #[serde(default)]
    pub options: RewriteOptions,
}

#[derive(Serialize)]
pub struct RewriteUrlsResponse {
    pub success: bool,
    pub urls: Vec<String>,
    pub rewritten: usize,
}

/// Rewrite a batch of bare attachment URLs
pub async fn rewrite_urls(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RewriteUrlsRequest>,
) -> Result<Json<RewriteUrlsResponse>, AppError> {
    check_api_key(&state, &headers)?;

    let settings = req.options.to_settings(&req.url, &state.site_dir)?;
    let store = DiskStore::new(&state.site_dir);
    let sink = TracingSink;
    let mut rewriter = ImageRewriter::new(&settings, &store, &sink);

    let urls: Vec<String> = req
        .urls
        .iter()
        .map(|u| rewriter.rewrite_attachment_url(u))
        .collect();

    Ok(Json(RewriteUrlsResponse {
        success: true,
        rewritten: rewriter.rewrite_count(),
        urls,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState {
            api_key: Some("secret".to_string()),
            site_dir: "/nonexistent".to_string(),
        }
    }

    fn bearer(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", format!("Bearer {}", key).parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn test_rewrite_requires_api_key() {
        let req = RewriteRequest {
            html: "<html></html>".to_string(),
            url: "https://example.com".to_string(),
            options: RewriteOptions::default(),
        };
        let result = rewrite(State(state()), HeaderMap::new(), Json(req)).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_rewrite_end_to_end() {
        let req = RewriteRequest {
            html: r#"<html><head></head><body><img src="/wp-content/uploads/a-300x200.jpg" width="300" height="200"></body></html>"#.to_string(),
            url: "https://example.com".to_string(),
            options: RewriteOptions::default(),
        };
        let result = rewrite(State(state()), bearer("secret"), Json(req))
            .await
            .expect("rewrite failed");
        assert!(result.0.success);
        assert_eq!(result.0.images_rewritten, 1);
        assert!(result.0.html.contains("/cdn-cgi/image/"));
    }

    #[tokio::test]
    async fn test_rewrite_rejects_empty_html() {
        let req = RewriteRequest {
            html: String::new(),
            url: "https://example.com".to_string(),
            options: RewriteOptions::default(),
        };
        let result = rewrite(State(state()), bearer("secret"), Json(req)).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_rewrite_rejects_invalid_options() {
        let req = RewriteRequest {
            html: "<html></html>".to_string(),
            url: "https://example.com".to_string(),
            options: RewriteOptions {
                max_width: 0,
                ..RewriteOptions::default()
            },
        };
        let result = rewrite(State(state()), bearer("secret"), Json(req)).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_rewrite_urls_endpoint() {
        let req = RewriteUrlsRequest {
            urls: vec![
                "https://example.com/wp-content/uploads/a.jpg".to_string(),
                "https://example.com/cdn-cgi/image/width=10/foo.jpg".to_string(),
            ],
            url: "https://example.com".to_string(),
            options: RewriteOptions::default(),
        };
        let result = rewrite_urls(State(state()), bearer("secret"), Json(req))
            .await
            .expect("rewrite_urls failed");
        assert!(result.0.urls[0].contains("/cdn-cgi/image/"));
        assert_eq!(
            result.0.urls[1],
            "https://example.com/cdn-cgi/image/width=10/foo.jpg"
        );
        assert_eq!(result.0.rewritten, 1);
    }
}
