//! Clients for the cloud collaborators: book metadata lookup and OCR.
//!
//! # Responsibility
//! - Hide HTTP and JSON details behind small traits the UI layer can fake.
//! - Degrade to "no result" instead of failing the user's save flow.
//!
//! # Invariants
//! - Remote failures never touch the quote store.
//! - Logged events carry sizes and status only, never image bytes or text.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod metadata;
pub mod ocr;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure talking to a remote collaborator.
#[derive(Debug)]
pub enum RemoteError {
    /// Transport, status or body decoding failure.
    Http(reqwest::Error),
    /// Service answered but reported failure.
    Service(String),
    /// Caller passed no image bytes.
    EmptyImage,
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "remote request failed: {err}"),
            Self::Service(message) => write!(f, "remote service error: {message}"),
            Self::EmptyImage => write!(f, "image payload is empty"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}
