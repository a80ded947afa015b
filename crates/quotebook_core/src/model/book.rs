//! Book and quote domain records.
//!
//! # Responsibility
//! - Define the snapshot shape handed to the UI (books with nested quotes).
//! - Own text normalization and write-side validation rules.
//!
//! # Invariants
//! - Ids are opaque non-empty strings; freshly generated ids sort in creation
//!   order.
//! - Stored titles and quote texts are trimmed and non-empty.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque book identifier.
pub type BookId = String;
/// Opaque quote identifier.
pub type QuoteId = String;

/// Single saved passage belonging to one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: QuoteId,
    pub book_id: BookId,
    pub text: String,
}

/// Titled collection of quotes owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub user_id: String,
    pub title: String,
    /// Local photo URI or remote cover URL; `None` when never captured.
    pub cover_uri: Option<String>,
    /// Ascending by quote id, i.e. insertion order.
    pub quotes: Vec<Quote>,
}

impl Book {
    /// Case-insensitive title comparison used by quote reconciliation.
    pub fn title_matches(&self, title: &str) -> bool {
        title_key(&self.title) == title_key(title)
    }

    /// Looks up one quote of this book by id.
    pub fn quote(&self, quote_id: &str) -> Option<&Quote> {
        self.quotes.iter().find(|quote| quote.id == quote_id)
    }
}

/// Write-side validation failures, raised before any SQL is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    EmptyBookId,
    EmptyQuoteId,
    EmptyUserId,
    EmptyTitle,
    EmptyQuoteText,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyBookId => write!(f, "book id must not be empty"),
            Self::EmptyQuoteId => write!(f, "quote id must not be empty"),
            Self::EmptyUserId => write!(f, "user id must not be empty"),
            Self::EmptyTitle => write!(f, "book title must not be empty"),
            Self::EmptyQuoteText => write!(f, "quote text must not be empty"),
        }
    }
}

impl Error for ValidationError {}

/// Generates a fresh record id.
///
/// UUID v7 carries a millisecond timestamp followed by random bits, and the
/// hyphenated form sorts lexicographically in generation order.
pub fn new_record_id() -> String {
    Uuid::now_v7().to_string()
}

/// Trims `value`, returning `None` when nothing is left.
pub fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalized key for case-insensitive title matching.
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

pub(crate) fn require_id(value: &str, err: ValidationError) -> Result<&str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(err)
    } else {
        Ok(trimmed)
    }
}

pub(crate) fn require_text(value: &str, err: ValidationError) -> Result<String, ValidationError> {
    normalize_text(value).ok_or(err)
}

#[cfg(test)]
mod tests {
    use super::{new_record_id, normalize_text, title_key, Book};

    fn book(title: &str) -> Book {
        Book {
            id: "b1".to_string(),
            user_id: "u1".to_string(),
            title: title.to_string(),
            cover_uri: None,
            quotes: Vec::new(),
        }
    }

    #[test]
    fn title_match_ignores_case_and_outer_whitespace() {
        let dune = book("Dune");
        assert!(dune.title_matches("dune"));
        assert!(dune.title_matches("  DUNE "));
        assert!(!dune.title_matches("Dune Messiah"));
    }

    #[test]
    fn title_key_lowercases_non_ascii() {
        assert_eq!(title_key("ÉMILE"), "émile");
    }

    #[test]
    fn normalize_text_rejects_whitespace_only() {
        assert_eq!(normalize_text(" \t\n"), None);
        assert_eq!(normalize_text("  keep  ").as_deref(), Some("keep"));
    }

    #[test]
    fn generated_ids_are_unique_and_ordered() {
        let ids: Vec<String> = (0..64).map(|_| new_record_id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
        assert_eq!(sorted, ids);
    }
}
