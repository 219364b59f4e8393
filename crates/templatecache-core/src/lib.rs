//! templatecache-core - catalog template synchronization.
//!
//! Mediates between a slow remote template catalog and a UI that needs
//! instant, localized results:
//!
//! - `cache`: per-scope, per-language template cache with staleness
//! - `catalog`: remote catalog seam, REST client and ordered fetcher
//! - `localization`: field label overlay for the requested language
//! - `assets`: asset URL cache-buster and bounded-concurrency verifier
//! - `sync`: the stale-while-revalidate orchestrator collaborators call
//! - `scope`: identity scoping injected into the cache layer

pub mod assets;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod localization;
pub mod models;
pub mod scope;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use assets::{CacheBuster, HttpProbe, VerificationSummary};
pub use cache::TemplateCache;
pub use catalog::{CatalogError, HttpCatalog, RemoteCatalog, TemplateFetcher};
pub use config::{Config, SyncSettings};
pub use models::{Field, FieldType, Language, Template};
pub use scope::{Scope, ScopeProvider, SessionScope};
pub use sync::{SyncError, TemplateSync};
