// src/models/mod.rs

//! Domain models for the lookup library.
//!
//! This module contains all data structures used throughout the library,
//! organized by their primary purpose.

mod config;
mod metadata;
mod source;

// Re-export all public types
pub use config::{CacheConfig, Config, HttpConfig, LoggingConfig, SearchConfig};
pub use metadata::{BindingKind, BookMetadata};
pub use source::SourceId;
