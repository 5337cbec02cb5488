//! content-completer - fills in missing content titles, descriptions and categories
//!
//! This crate provides:
//! - A client for a hosted Gradio chat model driven through its queue protocol
//! - Best-effort recovery of structured fields from free-form model replies
//! - Fuzzy resolution of suggested categories against the stored vocabulary
//! - A batch completion run over a SQLite content database

pub mod category;
pub mod commands;
pub mod completer;
pub mod config;
pub mod error;
pub mod extract;
pub mod inference;
pub mod progress;
pub mod prompt;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
