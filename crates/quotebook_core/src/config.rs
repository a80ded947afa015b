//! Runtime configuration: database location and service endpoints.
//!
//! Defaults are compile-time constants; a handful of environment variables can
//! override them for development builds and tests.

use std::path::PathBuf;
use std::time::Duration;

pub const DB_FILE_NAME: &str = "quotebook.sqlite3";
pub const DEFAULT_BOOKS_API_URL: &str = "https://www.googleapis.com/books/v1/volumes";
pub const DEFAULT_OCR_URL: &str = "https://us-central1-capstone-475218.cloudfunctions.net/ocrHandler";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(20);

pub const ENV_DB_PATH: &str = "QUOTEBOOK_DB_PATH";
pub const ENV_OCR_URL: &str = "QUOTEBOOK_OCR_URL";
pub const ENV_BOOKS_API_URL: &str = "QUOTEBOOK_BOOKS_API_URL";

/// Settings shared by the store and the remote clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub ocr_endpoint: String,
    pub books_api_endpoint: String,
    pub http_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DB_FILE_NAME),
            ocr_endpoint: DEFAULT_OCR_URL.to_string(),
            books_api_endpoint: DEFAULT_BOOKS_API_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by `QUOTEBOOK_*` variables. Blank values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(url) = read(ENV_OCR_URL) {
            config.ocr_endpoint = url;
        }
        if let Some(url) = read(ENV_BOOKS_API_URL) {
            config.books_api_endpoint = url;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, DEFAULT_OCR_URL, ENV_BOOKS_API_URL, ENV_DB_PATH, ENV_OCR_URL};
    use std::path::PathBuf;

    #[test]
    fn overrides_apply_and_blank_values_are_ignored() {
        let config = CoreConfig::from_lookup(|key| match key {
            ENV_DB_PATH => Some(" /data/quotes.db ".to_string()),
            ENV_OCR_URL => Some("   ".to_string()),
            ENV_BOOKS_API_URL => Some("http://localhost:9000/volumes".to_string()),
            _ => None,
        });
        assert_eq!(config.db_path, PathBuf::from("/data/quotes.db"));
        assert_eq!(config.ocr_endpoint, DEFAULT_OCR_URL);
        assert_eq!(config.books_api_endpoint, "http://localhost:9000/volumes");
    }

    #[test]
    fn default_db_lives_in_temp_dir() {
        let config = CoreConfig::default();
        assert!(config.db_path.starts_with(std::env::temp_dir()));
    }
}
