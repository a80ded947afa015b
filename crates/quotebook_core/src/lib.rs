//! Core of the quote book app: books and quotes per user, stored in SQLite.
//! The Flutter UI reaches this crate only through `quotebook_ffi`.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::book::{
    new_record_id, normalize_text, Book, BookId, Quote, QuoteId, ValidationError,
};
pub use model::identity::{UserId, LOCAL_USER_ID};
pub use remote::metadata::{
    lookup_metadata_best_effort, BookMetadata, BookMetadataLookup, GoogleBooksLookup,
};
pub use remote::ocr::{append_ocr_text, extract_text_best_effort, HttpOcrClient, OcrClient};
pub use remote::{RemoteError, RemoteResult};
pub use repo::book_repo::{BookRepository, NewBook, RepoError, RepoResult, SqliteBookRepository};
pub use service::quote_service::{
    AddQuoteOutcome, QuoteService, QuoteServiceError, ServiceResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
