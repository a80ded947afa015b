//! Quote reconciliation service.
//!
//! # Responsibility
//! - Turn "save this quote under this title" into repository calls.
//! - Keep the in-memory snapshot of the signed-in user's books.
//!
//! # Invariants
//! - The snapshot is replaced wholesale from the store after every mutation;
//!   it is never patched in place.
//! - A title joins an existing book when it matches case-insensitively,
//!   otherwise a new book is created together with the quote in one
//!   transaction.
//! - Blank titles/quotes are rejected before any repository call.
//! - Switching user discards the previous user's snapshot.

use crate::model::book::{new_record_id, normalize_text, Book, BookId, QuoteId, ValidationError};
use crate::model::identity::UserId;
use crate::repo::book_repo::{BookRepository, NewBook, RepoError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MISSING_INPUT_MESSAGE: &str = "Please fill in both fields.";
const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong while saving. Please try again.";

pub type ServiceResult<T> = Result<T, QuoteServiceError>;

/// Service error for quote book use-cases.
#[derive(Debug)]
pub enum QuoteServiceError {
    /// Blank input; nothing was written.
    Validation(ValidationError),
    /// A mutation was attempted before [`QuoteService::initialize`].
    NotInitialized,
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl QuoteServiceError {
    /// Text suitable for a user-facing alert.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(
                ValidationError::EmptyTitle | ValidationError::EmptyQuoteText,
            ) => MISSING_INPUT_MESSAGE,
            _ => GENERIC_FAILURE_MESSAGE,
        }
    }
}

impl Display for QuoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotInitialized => write!(f, "quote service used before initialize"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QuoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotInitialized => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for QuoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for QuoteServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// What `add_quote` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddQuoteOutcome {
    pub book_id: BookId,
    pub quote_id: QuoteId,
    /// `true` when no existing title matched and a new book was created.
    pub created_book: bool,
}

/// Reconciliation service over an injected repository.
pub struct QuoteService<R: BookRepository> {
    repo: R,
    user: Option<UserId>,
    books: Vec<Book>,
}

impl<R: BookRepository> QuoteService<R> {
    /// Creates an uninitialized service. Call [`Self::initialize`] next.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            user: None,
            books: Vec::new(),
        }
    }

    /// Ensures the schema, then loads `user`'s books as the new snapshot.
    ///
    /// Also used on identity change: the previous snapshot is dropped first,
    /// so a failed load never leaves another user's books visible.
    pub fn initialize(&mut self, user: UserId) -> ServiceResult<&[Book]> {
        if self.user.as_ref().is_some_and(|current| current != &user) {
            info!("event=service_switch_user module=service status=start");
        }
        self.user = None;
        self.books.clear();

        self.repo.initialize()?;
        self.books = self.repo.list_books_with_quotes(user.as_str())?;
        info!(
            "event=service_init module=service status=ok local_user={} book_count={}",
            user.is_local(),
            self.books.len()
        );
        self.user = Some(user);
        Ok(&self.books)
    }

    /// Current snapshot, sorted by case-insensitive title.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Active user partition, `None` before initialization.
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.user.is_some()
    }

    /// Looks up one book of the snapshot by id.
    pub fn book(&self, book_id: &str) -> Option<&Book> {
        self.books.iter().find(|book| book.id == book_id)
    }

    /// Borrows the injected repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Saves `text` under the book titled `title`, creating the book if needed.
    ///
    /// # Errors
    /// - `Validation` when the trimmed title or text is empty (no write issued).
    /// - `NotInitialized` before [`Self::initialize`].
    /// - `Repo` on storage failure; the snapshot is left as it was.
    pub fn add_quote(
        &mut self,
        title: &str,
        text: &str,
        cover_uri: Option<&str>,
    ) -> ServiceResult<AddQuoteOutcome> {
        let title = normalize_text(title).ok_or(ValidationError::EmptyTitle)?;
        let text = normalize_text(text).ok_or(ValidationError::EmptyQuoteText)?;
        let user = self.require_user()?.clone();

        let quote_id = new_record_id();
        let existing_book_id = self
            .books
            .iter()
            .find(|book| book.title_matches(&title))
            .map(|book| book.id.clone());

        let outcome = match existing_book_id {
            Some(book_id) => {
                self.repo
                    .insert_quote(&quote_id, &book_id, &text)
                    .inspect_err(|err| log_failure("quote_add", err))?;
                AddQuoteOutcome {
                    book_id,
                    quote_id,
                    created_book: false,
                }
            }
            None => {
                let book_id = new_record_id();
                let book = NewBook {
                    id: &book_id,
                    user_id: user.as_str(),
                    title: &title,
                    cover_uri,
                };
                self.repo
                    .insert_book_with_quote(&book, &quote_id, &text)
                    .inspect_err(|err| log_failure("quote_add", err))?;
                AddQuoteOutcome {
                    book_id,
                    quote_id,
                    created_book: true,
                }
            }
        };

        self.reload()?;
        info!(
            "event=quote_add module=service status=ok created_book={} book_count={}",
            outcome.created_book,
            self.books.len()
        );
        Ok(outcome)
    }

    /// Deletes a book of the active user together with its quotes.
    pub fn remove_book(&mut self, book_id: &str) -> ServiceResult<()> {
        let user = self.require_user()?.clone();
        let changed = self
            .repo
            .delete_book(book_id, user.as_str())
            .inspect_err(|err| log_failure("book_remove", err))?;
        self.finish_mutation("book_remove", changed)
    }

    /// Deletes a single quote; its book and sibling quotes stay.
    pub fn remove_quote(&mut self, quote_id: &str) -> ServiceResult<()> {
        self.require_user()?;
        let changed = self
            .repo
            .delete_quote(quote_id)
            .inspect_err(|err| log_failure("quote_remove", err))?;
        self.finish_mutation("quote_remove", changed)
    }

    /// Replaces a quote's text.
    pub fn edit_quote(&mut self, quote_id: &str, new_text: &str) -> ServiceResult<()> {
        let new_text = normalize_text(new_text).ok_or(ValidationError::EmptyQuoteText)?;
        self.require_user()?;
        let changed = self
            .repo
            .update_quote(quote_id, &new_text)
            .inspect_err(|err| log_failure("quote_edit", err))?;
        self.finish_mutation("quote_edit", changed)
    }

    /// Renames a book of the active user.
    pub fn edit_book_title(&mut self, book_id: &str, new_title: &str) -> ServiceResult<()> {
        let new_title = normalize_text(new_title).ok_or(ValidationError::EmptyTitle)?;
        let user = self.require_user()?.clone();
        let changed = self
            .repo
            .update_book_title(book_id, user.as_str(), &new_title)
            .inspect_err(|err| log_failure("book_rename", err))?;
        self.finish_mutation("book_rename", changed)
    }

    /// Re-reads the active user's books and replaces the snapshot.
    pub fn reload(&mut self) -> ServiceResult<&[Book]> {
        let user = self.require_user()?.clone();
        self.books = self.repo.list_books_with_quotes(user.as_str())?;
        Ok(&self.books)
    }

    fn finish_mutation(&mut self, event: &str, changed: bool) -> ServiceResult<()> {
        self.reload()?;
        info!(
            "event={} module=service status=ok changed={} book_count={}",
            event,
            changed,
            self.books.len()
        );
        Ok(())
    }

    fn require_user(&self) -> ServiceResult<&UserId> {
        self.user.as_ref().ok_or(QuoteServiceError::NotInitialized)
    }
}

fn log_failure(event: &str, err: &RepoError) {
    let error_code = match err {
        RepoError::Validation(_) => "validation",
        RepoError::MissingBook(_) => "missing_book",
        RepoError::DuplicateBook(_) => "duplicate_book",
        _ => "repo",
    };
    warn!("event={event} module=service status=error error_code={error_code} error={err}");
}
