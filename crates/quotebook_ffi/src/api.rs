//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the quote book use-cases to Dart via FRB.
//! - Hold the one process-wide store handle and the signed-in user's snapshot.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - Failures come back as envelopes with a user-facing `message`.
//! - Calls are serialized through one mutex, so a second tap cannot interleave
//!   with a pending save.

use log::{error, warn};
use quotebook_core::{
    append_ocr_text, core_version as core_version_inner, init_logging as init_logging_inner,
    lookup_metadata_best_effort, ping as ping_inner, Book, CoreConfig, GoogleBooksLookup,
    HttpOcrClient, OcrClient, QuoteService, QuoteServiceError, SqliteBookRepository, UserId,
};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

const LIBRARY_UNAVAILABLE_MESSAGE: &str = "Your library could not be opened. Please restart the app.";
const LIBRARY_NOT_OPEN_MESSAGE: &str = "Your library is still loading. Please try again.";
const NO_TEXT_MESSAGE: &str = "No text detected. Try taking a clearer photo of the quote.";
const OCR_FAILED_MESSAGE: &str = "OCR processing failed. Please try again.";

static CONFIG: OnceLock<CoreConfig> = OnceLock::new();
static LIBRARY: Mutex<Option<QuoteService<SqliteBookRepository>>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory for rolling logs.
/// - Returns empty string on success, error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Pins the database file location before the library is opened.
///
/// # FFI contract
/// - `db_path`: absolute path inside the app's persistent documents directory.
/// - Must run before the first `library_open`; later calls with a different
///   path are rejected.
/// - Returns empty string on success, error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn library_configure(db_path: String) -> String {
    let db_path = db_path.trim();
    if db_path.is_empty() {
        return "db_path must not be empty".to_string();
    }

    let requested = PathBuf::from(db_path);
    let active = CONFIG.get_or_init(|| CoreConfig {
        db_path: requested.clone(),
        ..CoreConfig::from_env()
    });
    if active.db_path == requested {
        String::new()
    } else {
        warn!(
            "event=library_configure module=ffi status=rejected active_path={}",
            active.db_path.display()
        );
        format!(
            "library already configured with {}",
            active.db_path.display()
        )
    }
}

/// One quote as rendered in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteView {
    pub id: String,
    pub text: String,
}

/// One book row with its quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookView {
    pub id: String,
    pub title: String,
    pub cover_uri: Option<String>,
    pub quotes: Vec<QuoteView>,
}

/// Envelope returned by every library call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Alert text on failure, empty on success.
    pub message: String,
    /// Snapshot after the operation. On failure, the last known snapshot.
    pub books: Vec<BookView>,
    /// Id created by `library_add_quote` (the quote id).
    pub created_id: Option<String>,
}

/// Cover/title suggestion for a typed title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadataResponse {
    pub cover_url: Option<String>,
    pub display_title: Option<String>,
}

/// Result of recognizing text on a photographed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrTextResponse {
    pub ok: bool,
    /// Recognized text, `None` when nothing was detected or the call failed.
    pub text: Option<String>,
    pub message: String,
}

/// Opens the library for `user_id` (or the local bucket when `None`).
///
/// # FFI contract
/// - The database is opened on first call and reused afterwards.
/// - Calling again with another user discards the previous user's snapshot.
#[flutter_rust_bridge::frb(sync)]
pub fn library_open(user_id: Option<String>) -> LibraryResponse {
    let user = UserId::from_auth(user_id.as_deref());
    let mut guard = match LIBRARY.lock() {
        Ok(guard) => guard,
        Err(_) => return LibraryResponse::failure(LIBRARY_UNAVAILABLE_MESSAGE, &[]),
    };

    if guard.is_none() {
        let db_path = &config().db_path;
        match SqliteBookRepository::open(db_path) {
            Ok(repo) => *guard = Some(QuoteService::new(repo)),
            Err(err) => {
                error!("event=library_open module=ffi status=error error={err}");
                return LibraryResponse::failure(LIBRARY_UNAVAILABLE_MESSAGE, &[]);
            }
        }
    }

    let Some(service) = guard.as_mut() else {
        return LibraryResponse::failure(LIBRARY_UNAVAILABLE_MESSAGE, &[]);
    };
    match service.initialize(user) {
        Ok(books) => LibraryResponse::success(books, None),
        Err(err) => {
            error!("event=library_open module=ffi status=error error={err}");
            LibraryResponse::failure(err.user_message(), &[])
        }
    }
}

/// Returns the current snapshot without touching the database.
#[flutter_rust_bridge::frb(sync)]
pub fn library_books() -> LibraryResponse {
    with_library(|_| Ok(None))
}

/// Re-reads the snapshot from the database.
#[flutter_rust_bridge::frb(sync)]
pub fn library_reload() -> LibraryResponse {
    with_library(|service| service.reload().map(|_| None))
}

/// Saves a quote under `title`, joining an existing book case-insensitively.
#[flutter_rust_bridge::frb(sync)]
pub fn library_add_quote(title: String, text: String, cover_uri: Option<String>) -> LibraryResponse {
    with_library(|service| {
        service
            .add_quote(&title, &text, cover_uri.as_deref())
            .map(|outcome| Some(outcome.quote_id))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn library_remove_book(book_id: String) -> LibraryResponse {
    with_library(|service| service.remove_book(&book_id).map(|()| None))
}

#[flutter_rust_bridge::frb(sync)]
pub fn library_remove_quote(quote_id: String) -> LibraryResponse {
    with_library(|service| service.remove_quote(&quote_id).map(|()| None))
}

#[flutter_rust_bridge::frb(sync)]
pub fn library_edit_quote(quote_id: String, new_text: String) -> LibraryResponse {
    with_library(|service| service.edit_quote(&quote_id, &new_text).map(|()| None))
}

#[flutter_rust_bridge::frb(sync)]
pub fn library_edit_book_title(book_id: String, new_title: String) -> LibraryResponse {
    with_library(|service| service.edit_book_title(&book_id, &new_title).map(|()| None))
}

/// Looks up a cover and formatted title. Empty response when unavailable.
///
/// # FFI contract
/// - Blocking network call; run off the UI thread.
/// - Never fails: lookup errors degrade to an empty response.
pub fn lookup_book_metadata(title: String) -> BookMetadataResponse {
    let config = config();
    let lookup = match GoogleBooksLookup::new(config.books_api_endpoint.clone(), config.http_timeout)
    {
        Ok(lookup) => lookup,
        Err(err) => {
            warn!("event=metadata_lookup module=ffi status=error error={err}");
            return BookMetadataResponse::default();
        }
    };

    lookup_metadata_best_effort(&lookup, &title)
        .map(|metadata| BookMetadataResponse {
            cover_url: metadata.cover_url,
            display_title: metadata.display_title,
        })
        .unwrap_or_default()
}

/// Sends a photographed page to OCR.
///
/// # FFI contract
/// - Blocking network call; run off the UI thread.
/// - `ok=false` only on transport/service failure; "no text" is `ok=true`.
pub fn ocr_extract_text(image: Vec<u8>) -> OcrTextResponse {
    let config = config();
    let result = HttpOcrClient::new(config.ocr_endpoint.clone(), config.http_timeout)
        .and_then(|client| client.extract_text(&image));

    match result {
        Ok(Some(text)) => OcrTextResponse {
            ok: true,
            text: Some(text),
            message: String::new(),
        },
        Ok(None) => OcrTextResponse {
            ok: true,
            text: None,
            message: NO_TEXT_MESSAGE.to_string(),
        },
        Err(err) => {
            warn!(
                "event=ocr_extract module=ffi status=error image_bytes={} error={err}",
                image.len()
            );
            OcrTextResponse {
                ok: false,
                text: None,
                message: OCR_FAILED_MESSAGE.to_string(),
            }
        }
    }
}

/// Appends recognized text to the quote draft.
#[flutter_rust_bridge::frb(sync)]
pub fn ocr_append_text(draft: String, extracted: String) -> String {
    append_ocr_text(&draft, &extracted)
}

impl LibraryResponse {
    fn success(books: &[Book], created_id: Option<String>) -> Self {
        Self {
            ok: true,
            message: String::new(),
            books: to_book_views(books),
            created_id,
        }
    }

    fn failure(message: impl Into<String>, books: &[Book]) -> Self {
        Self {
            ok: false,
            message: message.into(),
            books: to_book_views(books),
            created_id: None,
        }
    }
}

fn config() -> &'static CoreConfig {
    CONFIG.get_or_init(CoreConfig::from_env)
}

fn with_library(
    action: impl FnOnce(
        &mut QuoteService<SqliteBookRepository>,
    ) -> Result<Option<String>, QuoteServiceError>,
) -> LibraryResponse {
    let mut guard = match LIBRARY.lock() {
        Ok(guard) => guard,
        Err(_) => return LibraryResponse::failure(LIBRARY_UNAVAILABLE_MESSAGE, &[]),
    };
    let Some(service) = guard.as_mut() else {
        return LibraryResponse::failure(LIBRARY_NOT_OPEN_MESSAGE, &[]);
    };

    match action(&mut *service) {
        Ok(created_id) => LibraryResponse::success(service.books(), created_id),
        Err(err) => {
            if !matches!(err, QuoteServiceError::Validation(_)) {
                error!("event=library_action module=ffi status=error error={err}");
            }
            LibraryResponse::failure(err.user_message(), service.books())
        }
    }
}

fn to_book_views(books: &[Book]) -> Vec<BookView> {
    books
        .iter()
        .map(|book| BookView {
            id: book.id.clone(),
            title: book.title.clone(),
            cover_uri: book.cover_uri.clone(),
            quotes: book
                .quotes
                .iter()
                .map(|quote| QuoteView {
                    id: quote.id.clone(),
                    text: quote.text.clone(),
                })
                .collect(),
        })
        .collect()
}
