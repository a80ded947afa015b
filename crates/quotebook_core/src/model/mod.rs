//! Domain model for books, quotes and user identity.
//!
//! # Invariants
//! - Every book belongs to exactly one user partition.
//! - Quotes never outlive their book.

pub mod book;
pub mod identity;
