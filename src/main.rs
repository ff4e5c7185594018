//! CFImage Rewriter API Server
//! Rewrites WordPress image references onto Cloudflare's /cdn-cgi/image/
//! transformation endpoint

mod classifier;
mod config;
mod css_rewriter;
mod dimensions;
mod error;
mod events;
mod handlers;
mod html_rewriter;
mod path_resolver;
mod rewriter;
mod settings;
#[cfg(test)]
mod test_rewrite;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppState;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cfimage_rewriter_api=debug,info".into()),
        ))
        .init();

    // Load config
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("Starting CFImage Rewriter API on {}", config.address());

    let state = AppState {
        api_key: config.api_key.clone(),
        site_dir: config.site_dir.clone(),
    };

    // Build router
    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/rewrite", post(handlers::rewrite))
        .route("/api/v1/rewrite/bulk", post(handlers::rewrite_bulk))
        .route("/api/v1/rewrite/urls", post(handlers::rewrite_urls))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.address())
        .await
        .expect("Failed to bind");

    tracing::info!("Server listening on http://{}", config.address());

    axum::serve(listener, app).await.expect("Server error");
}
