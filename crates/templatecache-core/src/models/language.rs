use std::fmt;

use serde::{Deserialize, Serialize};

/// Languages the catalog is authored in.
///
/// Codes outside this set are rejected by [`Language::parse`]; callers fall
/// back to their configured default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
    Es,
}

impl Language {
    pub const DEFAULT: Language = Language::En;

    pub const ALL: [Language; 3] = [Language::En, Language::Ru, Language::Es];

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "ru" => Some(Language::Ru),
            "es" => Some(Language::Es),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
            Language::Es => "es",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
