#![forbid(unsafe_code)]

//! Shared modules for the tubefetch backend.
//!
//! The crate is intentionally small; it exposes the parsing, configuration
//! and upstream-client modules so the server binary stays thin.

pub mod config;
pub mod formats;
pub mod metadata;
pub mod parse;
