pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod profile;
pub mod quotes;
pub mod search;
pub mod share;
