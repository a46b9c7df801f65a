//! quotes-core - Core library for Quote Explorer
//!
//! This crate contains the shared models, query composition, store clients,
//! session handling and image rendering used by the API server and the CLI.

pub mod auth;
pub mod controller;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod render;
pub mod session;
pub mod share;
pub mod sitemap;
pub mod storage;
pub mod store;
pub mod util;

pub use error::{Error, Result, StoreFailure};
pub use models::{NewQuote, Profile, Quote, QuoteId, QuotePatch};
pub use query::{FilterMode, ListParams, PageWindow, Predicate, QuotePage, PAGE_SIZE};
