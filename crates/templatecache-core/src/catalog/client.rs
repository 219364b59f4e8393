//! REST client for the hosted template catalog.
//!
//! The catalog is exposed through a PostgREST-style endpoint: templates live
//! in one table and their per-language copy in a translations table joined
//! with `!inner`, so rows without a translation for the requested language
//! are never returned.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{CatalogError, RemoteCatalog};
use crate::config::Config;
use crate::models::{CatalogRow, Language, Translation};

// ============================================================================
// Constants
// ============================================================================

/// Path prefix of the REST interface on the catalog host
const REST_PATH: &str = "rest/v1";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Row as returned by the embedded-join query.
#[derive(Debug, Deserialize)]
struct RawRow {
    id: Value,
    #[serde(default)]
    category: Option<String>,
    #[serde(rename = "type")]
    template_type: String,
    icon: Option<String>,
    order_index: i64,
    #[serde(default)]
    config: Option<Value>,
    is_active: bool,
    #[serde(default)]
    translations: Vec<Translation>,
}

impl RawRow {
    fn into_row(self) -> Option<CatalogRow> {
        let id = match self.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        let translation = self.translations.into_iter().next()?;
        Some(CatalogRow {
            id,
            category: self.category.unwrap_or_default(),
            template_type: self.template_type,
            icon: self.icon,
            order_index: self.order_index,
            config: self.config,
            is_active: self.is_active,
            translation,
        })
    }
}

/// Catalog client. Clone is cheap; reqwest::Client shares its pool.
#[derive(Clone)]
pub struct HttpCatalog {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    table: String,
    translations_table: String,
}

impl HttpCatalog {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.catalog_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            table: config.catalog_table.clone(),
            translations_table: config.translations_table.clone(),
        })
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, CatalogError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(ref key) = self.api_key {
            let invalid = |_| CatalogError::InvalidResponse("API key is not a valid header value".to_string());
            headers.insert("apikey", header::HeaderValue::from_str(key).map_err(invalid)?);
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", key)).map_err(invalid)?,
            );
        }
        Ok(headers)
    }

    fn rows_url(&self) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, self.table)
    }

    fn query(&self, language: Language) -> Vec<(String, String)> {
        vec![
            (
                "select".to_string(),
                format!(
                    "id,category,type,icon,order_index,config,is_active,translations:{}!inner(language,title,description)",
                    self.translations_table
                ),
            ),
            ("is_active".to_string(), "eq.true".to_string()),
            ("translations.language".to_string(), format!("eq.{}", language.code())),
            ("order".to_string(), "order_index.asc".to_string()),
        ]
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(None) for rate limit (should retry).
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, CatalogError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(CatalogError::from_status(status, &body))
        }
    }

    async fn get_rows(&self, language: Language) -> Result<Vec<RawRow>, CatalogError> {
        let url = self.rows_url();
        let query = self.query(language);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .get(&url)
                .headers(self.auth_headers()?)
                .query(&query)
                .send()
                .await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let text = response.text().await?;
                    return serde_json::from_str(&text).map_err(|e| {
                        CatalogError::InvalidResponse(format!("Failed to parse catalog rows: {}", e))
                    });
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(CatalogError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }
}

#[async_trait]
impl RemoteCatalog for HttpCatalog {
    async fn fetch_rows(&self, language: Language) -> Result<Vec<CatalogRow>, CatalogError> {
        let raw = self.get_rows(language).await?;
        let total = raw.len();
        let rows: Vec<CatalogRow> = raw.into_iter().filter_map(RawRow::into_row).collect();
        if rows.len() != total {
            warn!(lang = %language, dropped = total - rows.len(), "Catalog rows without a translation were skipped");
        }
        debug!(lang = %language, count = rows.len(), "Catalog rows received");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_row_takes_first_translation() {
        let raw: RawRow = serde_json::from_value(json!({
            "id": 42,
            "category": "health",
            "type": "water",
            "icon": null,
            "order_index": 1,
            "config": null,
            "is_active": true,
            "translations": [{ "language": "es", "title": "Agua", "description": "Bebe agua" }]
        }))
        .unwrap();

        let row = raw.into_row().unwrap();
        assert_eq!(row.id, "42");
        assert_eq!(row.translation.language, Language::Es);
        assert_eq!(row.translation.title, "Agua");
    }

    #[test]
    fn test_raw_row_without_translation_is_skipped() {
        let raw: RawRow = serde_json::from_value(json!({
            "id": "a",
            "type": "water",
            "icon": null,
            "order_index": 1,
            "is_active": true,
            "translations": []
        }))
        .unwrap();
        assert!(raw.into_row().is_none());
    }

    #[test]
    fn test_query_filters_language_and_order() {
        let catalog = HttpCatalog::new(&Config {
            catalog_url: "https://catalog.example.com/".to_string(),
            ..Config::default()
        })
        .unwrap();

        assert_eq!(
            catalog.rows_url(),
            format!("https://catalog.example.com/rest/v1/{}", Config::default().catalog_table)
        );
        let query = catalog.query(Language::Ru);
        assert!(query.contains(&("translations.language".to_string(), "eq.ru".to_string())));
        assert!(query.contains(&("is_active".to_string(), "eq.true".to_string())));
        assert!(query.contains(&("order".to_string(), "order_index.asc".to_string())));
    }
}
