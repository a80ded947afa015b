//! Book/quote repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Own every SQL statement touching `books` and `quotes`.
//! - Scope book reads and book mutations by user partition.
//!
//! # Invariants
//! - Text fields are trimmed before storage; blank ids/text never reach SQL.
//! - `insert_book` is idempotent by id (`INSERT OR IGNORE`), never by title.
//! - Updates/deletes that match no row are no-ops reported as `Ok(false)`.
//! - Deleting a book cascades to its quotes through the foreign key.
//! - `list_books_with_quotes` is one LEFT JOIN pass, ordered by
//!   case-insensitive title, then book id, then quote id.

use crate::db::migrations::apply_migrations;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::book::{require_id, require_text, Book, BookId, Quote, ValidationError};
use rusqlite::{params, Connection, ErrorCode, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const BOOKS_WITH_QUOTES_SQL: &str = "SELECT
    b.id,
    b.user_id,
    b.title,
    b.cover_uri,
    q.id AS quote_id,
    q.text AS quote_text
FROM books b
LEFT JOIN quotes q ON q.book_id = b.id
WHERE b.user_id = ?1
ORDER BY LOWER(b.title) ASC, b.id ASC, q.id ASC;";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("books", &["id", "user_id", "title", "cover_uri"]),
    ("quotes", &["id", "book_id", "text"]),
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for book/quote persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// Quote insert referenced a book id that does not exist.
    MissingBook(BookId),
    /// Book-with-quote insert hit an id that is already taken.
    DuplicateBook(BookId),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingBook(book_id) => write!(f, "book not found: {book_id}"),
            Self::DuplicateBook(book_id) => write!(f, "book already exists: {book_id}"),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column missing: {table}.{column}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Insert payload for one book row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewBook<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub title: &'a str,
    pub cover_uri: Option<&'a str>,
}

/// Persistence contract consumed by [`crate::QuoteService`].
pub trait BookRepository {
    /// Ensures schema and indexes exist. Safe to call on every start.
    fn initialize(&mut self) -> RepoResult<()>;
    /// Inserts one book; returns `false` when the id already existed.
    fn insert_book(&self, book: &NewBook<'_>) -> RepoResult<bool>;
    /// Inserts one quote under an existing book.
    fn insert_quote(&self, id: &str, book_id: &str, text: &str) -> RepoResult<()>;
    /// Inserts a new book and its first quote atomically. A taken book id
    /// fails with [`RepoError::DuplicateBook`] and writes nothing.
    fn insert_book_with_quote(
        &mut self,
        book: &NewBook<'_>,
        quote_id: &str,
        text: &str,
    ) -> RepoResult<()>;
    /// Deletes one book (and its quotes) owned by `user_id`.
    fn delete_book(&self, id: &str, user_id: &str) -> RepoResult<bool>;
    fn delete_quote(&self, id: &str) -> RepoResult<bool>;
    fn update_quote(&self, id: &str, text: &str) -> RepoResult<bool>;
    fn update_book_title(&self, id: &str, user_id: &str, title: &str) -> RepoResult<bool>;
    /// Returns every book of `user_id` with its quotes attached.
    fn list_books_with_quotes(&self, user_id: &str) -> RepoResult<Vec<Book>>;
}

/// SQLite-backed repository owning the process-wide connection.
pub struct SqliteBookRepository {
    conn: Connection,
}

impl SqliteBookRepository {
    /// Wraps an already opened connection. Call [`BookRepository::initialize`]
    /// before issuing reads or writes.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens the database file and returns an initialized repository.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let mut repo = Self::new(open_db(path)?);
        repo.initialize()?;
        Ok(repo)
    }

    /// Opens a private in-memory database and returns an initialized repository.
    pub fn open_in_memory() -> RepoResult<Self> {
        let mut repo = Self::new(open_db_in_memory()?);
        repo.initialize()?;
        Ok(repo)
    }

    /// Borrows the underlying connection, mainly for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl BookRepository for SqliteBookRepository {
    fn initialize(&mut self) -> RepoResult<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        // Index DDL fails on a misshapen table, so report the shape first.
        ensure_columns(&self.conn, false)?;
        apply_migrations(&mut self.conn)?;
        ensure_columns(&self.conn, true)
    }

    fn insert_book(&self, book: &NewBook<'_>) -> RepoResult<bool> {
        insert_book_row(&self.conn, book)
    }

    fn insert_quote(&self, id: &str, book_id: &str, text: &str) -> RepoResult<()> {
        insert_quote_row(&self.conn, id, book_id, text)
    }

    fn insert_book_with_quote(
        &mut self,
        book: &NewBook<'_>,
        quote_id: &str,
        text: &str,
    ) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !insert_book_row(&tx, book)? {
            // Dropping the transaction rolls it back.
            return Err(RepoError::DuplicateBook(book.id.trim().to_string()));
        }
        insert_quote_row(&tx, quote_id, book.id, text)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_book(&self, id: &str, user_id: &str) -> RepoResult<bool> {
        let id = require_id(id, ValidationError::EmptyBookId)?;
        let user_id = require_id(user_id, ValidationError::EmptyUserId)?;
        let changed = self.conn.execute(
            "DELETE FROM books WHERE id = ?1 AND user_id = ?2;",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    fn delete_quote(&self, id: &str) -> RepoResult<bool> {
        let id = require_id(id, ValidationError::EmptyQuoteId)?;
        let changed = self
            .conn
            .execute("DELETE FROM quotes WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn update_quote(&self, id: &str, text: &str) -> RepoResult<bool> {
        let id = require_id(id, ValidationError::EmptyQuoteId)?;
        let text = require_text(text, ValidationError::EmptyQuoteText)?;
        let changed = self.conn.execute(
            "UPDATE quotes SET text = ?2 WHERE id = ?1;",
            params![id, text],
        )?;
        Ok(changed > 0)
    }

    fn update_book_title(&self, id: &str, user_id: &str, title: &str) -> RepoResult<bool> {
        let id = require_id(id, ValidationError::EmptyBookId)?;
        let user_id = require_id(user_id, ValidationError::EmptyUserId)?;
        let title = require_text(title, ValidationError::EmptyTitle)?;
        let changed = self.conn.execute(
            "UPDATE books SET title = ?3 WHERE id = ?1 AND user_id = ?2;",
            params![id, user_id, title],
        )?;
        Ok(changed > 0)
    }

    fn list_books_with_quotes(&self, user_id: &str) -> RepoResult<Vec<Book>> {
        let user_id = require_id(user_id, ValidationError::EmptyUserId)?;
        let mut stmt = self.conn.prepare(BOOKS_WITH_QUOTES_SQL)?;
        let mut rows = stmt.query([user_id])?;
        let mut books: Vec<Book> = Vec::new();

        while let Some(row) = rows.next()? {
            let book_id: String = row.get("id")?;
            // Rows arrive grouped by book because the sort key ends in b.id.
            let starts_new_book = books.last().map_or(true, |last| last.id != book_id);
            if starts_new_book {
                books.push(parse_book_row(row, book_id)?);
            }

            let quote_id: Option<String> = row.get("quote_id")?;
            let quote_text: Option<String> = row.get("quote_text")?;
            if let (Some(id), Some(text), Some(book)) = (quote_id, quote_text, books.last_mut()) {
                book.quotes.push(Quote {
                    id,
                    book_id: book.id.clone(),
                    text,
                });
            }
        }

        Ok(books)
    }
}

fn insert_book_row(conn: &Connection, book: &NewBook<'_>) -> RepoResult<bool> {
    let id = require_id(book.id, ValidationError::EmptyBookId)?;
    let user_id = require_id(book.user_id, ValidationError::EmptyUserId)?;
    let title = require_text(book.title, ValidationError::EmptyTitle)?;
    let cover_uri = book
        .cover_uri
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO books (id, user_id, title, cover_uri)
         VALUES (?1, ?2, ?3, ?4);",
        params![id, user_id, title, cover_uri],
    )?;
    Ok(inserted > 0)
}

fn insert_quote_row(conn: &Connection, id: &str, book_id: &str, text: &str) -> RepoResult<()> {
    let id = require_id(id, ValidationError::EmptyQuoteId)?;
    let book_id = require_id(book_id, ValidationError::EmptyBookId)?;
    let text = require_text(text, ValidationError::EmptyQuoteText)?;

    conn.execute(
        "INSERT INTO quotes (id, book_id, text) VALUES (?1, ?2, ?3);",
        params![id, book_id, text],
    )
    .map_err(|err| {
        if is_foreign_key_violation(&err) {
            RepoError::MissingBook(book_id.to_string())
        } else {
            RepoError::from(err)
        }
    })?;
    Ok(())
}

fn parse_book_row(row: &Row<'_>, id: String) -> RepoResult<Book> {
    Ok(Book {
        id,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        cover_uri: row.get("cover_uri")?,
        quotes: Vec::new(),
    })
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => {
            inner.code == ErrorCode::ConstraintViolation
                && inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
        }
        _ => false,
    }
}

/// Checks required columns; absent tables are an error only when `require_tables`.
fn ensure_columns(conn: &Connection, require_tables: bool) -> RepoResult<()> {
    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            if require_tables {
                return Err(RepoError::MissingRequiredTable(table));
            }
            continue;
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
