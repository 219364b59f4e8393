use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{Language, Template};
use crate::scope::{encode_path_component, Scope};

/// Bump when the stored record shape changes.
pub const CACHE_FORMAT_VERSION: u32 = 3;

/// Distinguishes temp files of concurrent writers to the same key.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    /// Time since the entry was stored. Clock skew clamps to zero.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.cached_at).max(Duration::zero())
    }

    pub fn age_minutes(&self) -> i64 {
        self.age().num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }
}

/// File-backed template cache, one directory per scope.
///
/// Read failures surface as a miss and write failures are logged; neither
/// is ever returned to the caller.
pub struct TemplateCache {
    cache_dir: PathBuf,
    asset_version: String,
}

impl TemplateCache {
    pub fn new(cache_dir: PathBuf, asset_version: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self {
            cache_dir,
            asset_version: asset_version.into(),
        })
    }

    pub fn asset_version(&self) -> &str {
        &self.asset_version
    }

    fn scope_dir(&self, scope: &Scope) -> PathBuf {
        self.cache_dir.join(scope.cache_key())
    }

    fn record_name(&self, language: Language) -> String {
        format!(
            "templates_v{}_{}_{}",
            CACHE_FORMAT_VERSION,
            encode_path_component(&self.asset_version),
            language.code()
        )
    }

    fn data_path(&self, scope: &Scope, language: Language) -> PathBuf {
        self.scope_dir(scope)
            .join(format!("{}.json", self.record_name(language)))
    }

    fn timestamp_path(&self, scope: &Scope, language: Language) -> PathBuf {
        self.scope_dir(scope)
            .join(format!("{}.ts", self.record_name(language)))
    }

    fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<CachedData<T>>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read cache file: {}", path.display()))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", path.display()))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, scope: &Scope, language: Language, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        fs::create_dir_all(self.scope_dir(scope))?;

        let contents = serde_json::to_string(&cached)?;
        atomic_write(&self.data_path(scope, language), contents.as_bytes())?;
        atomic_write(
            &self.timestamp_path(scope, language),
            cached.cached_at.to_rfc3339().as_bytes(),
        )?;
        Ok(())
    }

    // ===== Templates =====

    pub fn get(&self, scope: &Scope, language: Language) -> Option<CachedData<Vec<Template>>> {
        match self.load(&self.data_path(scope, language)) {
            Ok(Some(cached)) => Some(cached),
            Ok(None) => {
                debug!(scope = %scope, lang = %language, "Template cache miss");
                None
            }
            Err(e) => {
                debug!(scope = %scope, lang = %language, error = %e, "Failed to load template cache, treating as miss");
                None
            }
        }
    }

    /// Replace the entry for `(scope, language)`.
    pub fn set(&self, scope: &Scope, language: Language, templates: &[Template]) {
        match self.save(scope, language, &templates) {
            Ok(()) => debug!(scope = %scope, lang = %language, count = templates.len(), "Template cache written"),
            Err(e) => warn!(scope = %scope, lang = %language, error = %e, "Failed to write template cache"),
        }
    }

    /// Time since the entry was last refreshed.
    pub fn age(&self, scope: &Scope, language: Language) -> Option<Duration> {
        let path = self.timestamp_path(scope, language);
        let raw = fs::read_to_string(&path).ok()?;
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(at) => Some((Utc::now() - at.with_timezone(&Utc)).max(Duration::zero())),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Unparsable cache timestamp");
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, scope: &Scope, language: Language, by: Duration) {
        let at = Utc::now() - by;
        fs::write(self.timestamp_path(scope, language), at.to_rfc3339())
            .expect("write backdated timestamp");
    }

    #[cfg(test)]
    pub(crate) fn remove_timestamp(&self, scope: &Scope, language: Language) {
        fs::remove_file(self.timestamp_path(scope, language)).expect("remove timestamp");
    }

    /// Remove every language cached under `scope`.
    pub fn clear(&self, scope: &Scope) {
        match remove_dir_if_exists(&self.scope_dir(scope)) {
            Ok(()) => debug!(scope = %scope, "Template cache cleared"),
            Err(e) => warn!(scope = %scope, error = %e, "Failed to clear template cache"),
        }
    }

    /// Remove every scope.
    pub fn clear_all(&self) {
        let result = remove_dir_if_exists(&self.cache_dir)
            .and_then(|()| fs::create_dir_all(&self.cache_dir));
        match result {
            Ok(()) => debug!("Template cache cleared for all scopes"),
            Err(e) => warn!(error = %e, "Failed to clear template cache"),
        }
    }
}

fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Write to a temp file, then rename over the target.
///
/// Readers see either the previous record or the new one, never a partial file.
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
    let temp_path = path.with_extension(format!("tmp{}-{}", std::process::id(), seq));

    fs::write(&temp_path, data)?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
