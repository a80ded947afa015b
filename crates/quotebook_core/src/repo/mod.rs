//! Repository layer: the only code that talks SQL.
//!
//! # Invariants
//! - Repository writes validate ids and text before touching SQLite.
//! - Missing rows are reported as no-ops, referential failures as
//!   [`book_repo::RepoError::MissingBook`].

pub mod book_repo;
