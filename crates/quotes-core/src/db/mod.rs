//! Local SQLite store for development and self-hosting.
//!
//! Mirrors the hosted schema and emulates its row-level policy: quotes can only
//! be updated or deleted by the user that owns them.

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::SqliteStore;
