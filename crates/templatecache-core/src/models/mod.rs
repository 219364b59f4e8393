//! Data models for catalog templates.
//!
//! This module contains the data structures shared by the cache, the
//! catalog fetcher and the localization overlay:
//!
//! - `Template`, `TemplateConfig`, `Field`: the display-ready template records
//! - `CatalogRow`, `Translation`: the wire shape returned by the remote catalog
//! - `Language`: the closed set of languages the catalog is served in

pub mod language;
pub mod template;

pub use language::Language;
pub use template::{CatalogRow, Field, FieldType, Template, TemplateConfig, Translation};
