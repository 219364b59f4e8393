//! Template records as served to the UI, and the catalog rows they come from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::Language;

/// Kind of input a template field collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Market,
    Vitamins,
    Checklist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Field {
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
}

/// Structured template configuration.
///
/// Keys other than `fields` are kept as-is so an overlay pass never drops
/// content it does not understand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A display-ready catalog template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub category: String,
    #[serde(rename = "type")]
    pub template_type: String,
    pub icon: Option<String>,
    pub order_index: i64,
    pub config: Option<TemplateConfig>,
    pub is_active: bool,
    pub title: String,
    pub description: Option<String>,
    /// Language actually served, which may be a fallback.
    pub language: Language,
}

impl Template {
    /// Asset URL if one is set and non-blank.
    pub fn icon_url(&self) -> Option<&str> {
        self.icon.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    pub fn fields(&self) -> &[Field] {
        self.config.as_ref().map(|c| c.fields.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub language: Language,
    pub title: String,
    pub description: Option<String>,
}

/// Row shape returned by the remote catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub id: String,
    pub category: String,
    #[serde(rename = "type")]
    pub template_type: String,
    pub icon: Option<String>,
    pub order_index: i64,
    #[serde(default)]
    pub config: Option<Value>,
    pub is_active: bool,
    pub translation: Translation,
}

impl CatalogRow {
    pub fn into_template(self) -> Template {
        let config = self.config.and_then(|raw| {
            if raw.is_null() {
                return None;
            }
            match serde_json::from_value::<TemplateConfig>(raw) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!(template = %self.id, error = %e, "Template config did not parse, dropping it");
                    None
                }
            }
        });

        Template {
            id: self.id,
            category: self.category,
            template_type: self.template_type,
            icon: self.icon,
            order_index: self.order_index,
            config,
            is_active: self.is_active,
            title: self.translation.title,
            description: self.translation.description,
            language: self.translation.language,
        }
    }
}
