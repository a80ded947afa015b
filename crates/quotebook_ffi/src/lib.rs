//! Flutter-facing bindings for `quotebook_core`.

pub mod api;
