//! Configuration module

use std::env;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub site_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            api_key: env::var("API_KEY").ok(),
            site_dir: env::var("SITE_DIR").unwrap_or_else(|_| "/var/www/html".to_string()),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub api_key: Option<String>,
    pub site_dir: String,
}
