//! Use-case services consumed by the FFI layer.
//!
//! # Responsibility
//! - Orchestrate repository calls into user-level actions.
//! - Keep the UI decoupled from storage details.

pub mod quote_service;
