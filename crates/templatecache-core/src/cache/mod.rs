//! Local caching module for catalog templates.
//!
//! This module provides the `TemplateCache` for storing and retrieving
//! localized template lists per `(scope, language)`. Entries are stored as
//! JSON, replaced wholesale on every write, and considered stale once older
//! than the configured TTL.
//!
//! Every record key embeds the cache format version and the asset version,
//! so bumping either silently invalidates older entries.

pub mod manager;

pub use manager::{CachedData, TemplateCache, CACHE_FORMAT_VERSION};
