use std::sync::Arc;

use tracing::debug;

use super::{CatalogError, RemoteCatalog};
use crate::models::{Language, Template};

/// Turns catalog rows into the ordered template list the UI displays.
#[derive(Clone)]
pub struct TemplateFetcher {
    catalog: Arc<dyn RemoteCatalog>,
}

impl TemplateFetcher {
    pub fn new(catalog: Arc<dyn RemoteCatalog>) -> Self {
        Self { catalog }
    }

    /// Active templates for `language`, ordered by `order_index`.
    ///
    /// Ties keep the order the catalog returned them in. An empty list means
    /// the catalog was reachable but has nothing in that language.
    pub async fn fetch(&self, language: Language) -> Result<Vec<Template>, CatalogError> {
        let rows = self.catalog.fetch_rows(language).await?;

        let mut templates: Vec<Template> = rows
            .into_iter()
            .filter(|row| row.is_active)
            .map(|row| row.into_template())
            .collect();

        // sort_by_key is stable
        templates.sort_by_key(|t| t.order_index);

        debug!(lang = %language, count = templates.len(), "Templates fetched");
        Ok(templates)
    }
}
