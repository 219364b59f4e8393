//! Remote template catalog.
//!
//! This module provides the [`RemoteCatalog`] seam over the opaque catalog
//! service, the REST-backed [`HttpCatalog`], and the [`TemplateFetcher`]
//! that turns raw rows into ordered, active-only [`Template`] lists.
//!
//! An empty list is a normal answer ("reachable, nothing authored for this
//! language"). Transport and server failures are reported as [`CatalogError`].
//!
//! [`Template`]: crate::models::Template

pub mod client;
pub mod error;
pub mod fetcher;

use async_trait::async_trait;

use crate::models::{CatalogRow, Language};

pub use client::HttpCatalog;
pub use error::CatalogError;
pub use fetcher::TemplateFetcher;

/// Queryable source of catalog rows.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Active rows translated into `language`, sorted by `order_index`.
    async fn fetch_rows(&self, language: Language) -> Result<Vec<CatalogRow>, CatalogError>;
}
