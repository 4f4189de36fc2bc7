//! Configuration module for the Quarry backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Base URL of the remote dump archive source
    pub archive_url: String,
    /// Directory for downloaded archives, cached content tags and extraction scratch space
    pub cache_dir: PathBuf,
    /// Timeout in seconds for each loader network call
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("QUARRY_DB_PATH")
            .unwrap_or_else(|_| "./data/quarry.sqlite".to_string())
            .into();

        let bind_addr = env::var("QUARRY_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid QUARRY_BIND_ADDR format");

        let log_level = env::var("QUARRY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let archive_url = env::var("QUARRY_ARCHIVE_URL")
            .unwrap_or_else(|_| "https://archive.org/download/stackexchange".to_string());

        let cache_dir = env::var("QUARRY_CACHE_DIR")
            .unwrap_or_else(|_| "./data/dumps".to_string())
            .into();

        let http_timeout_secs = env::var("QUARRY_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            db_path,
            bind_addr,
            log_level,
            archive_url,
            cache_dir,
            http_timeout_secs,
        }
    }
}
