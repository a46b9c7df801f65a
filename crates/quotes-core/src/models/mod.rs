//! Data models for Quote Explorer

mod category;
mod profile;
mod quote;

pub use category::CategoryStyle;
pub use profile::{avatar_initial, Profile, ProfileUpdate};
pub use quote::{NewQuote, Quote, QuoteId, QuotePatch};
