//! Template synchronization under a stale-while-revalidate policy.
//!
//! [`TemplateSync`] is the single entry point collaborators use. Per call:
//!
//! - fresh cache hit: cached templates are returned, no network activity
//! - stale cache hit: cached templates are returned, and a detached refresh
//!   task updates the cache for the next call (its failures are swallowed)
//! - miss or forced: the catalog is fetched synchronously, falling back to
//!   the default language when the requested one has no rows; fetch errors
//!   reach the caller
//!
//! Concurrent calls for the same key are not serialized. Each cache write is
//! a full replacement, so racing refreshes resolve as last writer wins.
//!
//! Background tasks are never cancelled. Their handles are kept so a
//! short-lived host can [`TemplateSync::wait_background`] before its runtime
//! shuts down.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::assets::{verify_assets, AssetProbe, CacheBuster, HttpProbe, VerificationSummary};
use crate::cache::TemplateCache;
use crate::catalog::{CatalogError, TemplateFetcher};
use crate::config::SyncSettings;
use crate::localization::localize;
use crate::models::{Language, Template};
use crate::scope::{Scope, ScopeProvider};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Catalog fetch failed: {0}")]
    Catalog(#[from] CatalogError),
}

/// State shared with detached refresh and verification tasks.
struct SyncCore {
    fetcher: TemplateFetcher,
    cache: Arc<TemplateCache>,
    buster: CacheBuster,
    probe: Arc<dyn AssetProbe>,
    settings: SyncSettings,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncCore {
    /// Spawn a task whose handle is kept for [`TemplateSync::wait_background`].
    fn track<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut background = match self.background.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        background.retain(|h| !h.is_finished());
        background.push(handle);
    }

    fn take_background(&self) -> Vec<JoinHandle<()>> {
        let mut background = match self.background.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *background)
    }

    /// Bust asset URLs, then apply the overlay for the requested language.
    fn present(&self, templates: Vec<Template>, requested: Language) -> Vec<Template> {
        localize(self.buster.bust_templates(templates), requested)
    }

    /// Fetch `requested`, falling back once to the default language when the
    /// catalog has nothing in it.
    async fn fetch_fresh(&self, requested: Language) -> Result<Vec<Template>, CatalogError> {
        let mut templates = self.fetcher.fetch(requested).await?;

        let default = self.settings.default_language;
        if templates.is_empty() && requested != default {
            info!(requested = %requested, fallback = %default, "No templates for language, using fallback");
            templates = self.fetcher.fetch(default).await?;
        }
        if templates.is_empty() {
            warn!(requested = %requested, "Catalog has no templates for requested or default language");
        }

        Ok(self.present(templates, requested))
    }

    fn spawn_verification(self: &Arc<Self>, templates: Vec<Template>) {
        if !self.settings.verify_on_refresh {
            return;
        }
        let core = Arc::clone(self);
        self.track(async move {
            let summary = verify_assets(
                &templates,
                core.probe.as_ref(),
                core.settings.verify_concurrency,
                core.settings.probe_timeout,
            )
            .await;
            summary.log();
        });
    }
}

pub struct TemplateSync {
    core: Arc<SyncCore>,
    scope: Arc<dyn ScopeProvider>,
}

impl TemplateSync {
    /// Build the orchestrator and subscribe to identity changes.
    ///
    /// When the identity changes, everything cached for the previous scope
    /// is dropped; later calls are keyed by the new scope. Asset URLs are
    /// tagged with the cache's asset version.
    pub fn new(
        fetcher: TemplateFetcher,
        cache: Arc<TemplateCache>,
        scope: Arc<dyn ScopeProvider>,
        settings: SyncSettings,
    ) -> Self {
        Self::with_probe(fetcher, cache, scope, settings, Arc::new(HttpProbe::default()))
    }

    /// Same as [`TemplateSync::new`], verifying assets through `probe`.
    pub fn with_probe(
        fetcher: TemplateFetcher,
        cache: Arc<TemplateCache>,
        scope: Arc<dyn ScopeProvider>,
        settings: SyncSettings,
        probe: Arc<dyn AssetProbe>,
    ) -> Self {
        let listener_cache = Arc::clone(&cache);
        scope.on_scope_change(Box::new(move |previous: &Scope, next: &Scope| {
            debug!(from = %previous, to = %next, "Dropping templates cached for previous scope");
            listener_cache.clear(previous);
        }));

        let core = SyncCore {
            fetcher,
            buster: CacheBuster::new(cache.asset_version()),
            cache,
            probe,
            settings,
            background: Mutex::new(Vec::new()),
        };

        Self {
            core: Arc::new(core),
            scope,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.core.settings
    }

    fn resolve_language(&self, code: &str) -> Language {
        Language::parse(code).unwrap_or(self.core.settings.default_language)
    }

    /// Ordered, localized, asset-busted templates for the current scope.
    pub async fn templates(
        &self,
        language_code: &str,
        force_refresh: bool,
    ) -> Result<Vec<Template>, SyncError> {
        let language = self.resolve_language(language_code);
        let scope = self.scope.current_scope();

        if !force_refresh {
            if let Some(cached) = self.core.cache.get(&scope, language) {
                let ttl = self.core.settings.ttl;
                let stale = self
                    .core
                    .cache
                    .age(&scope, language)
                    .map_or_else(|| cached.is_stale(ttl), |age| age > ttl);
                let age = cached.age_display();
                let templates = self.core.present(cached.data, language);

                if stale {
                    info!(scope = %scope, lang = %language, age = %age, "Serving stale templates, refreshing in background");
                    self.spawn_refresh(scope, language);
                } else {
                    debug!(scope = %scope, lang = %language, count = templates.len(), "Serving cached templates");
                }
                return Ok(templates);
            }
        }

        let templates = self.core.fetch_fresh(language).await?;
        self.core.cache.set(&scope, language, &templates);
        info!(scope = %scope, lang = %language, count = templates.len(), forced = force_refresh, "Templates synced");

        self.core.spawn_verification(templates.clone());
        Ok(templates)
    }

    /// Detached refresh; its outcome is visible only through the cache.
    fn spawn_refresh(&self, scope: Scope, language: Language) {
        let core = Arc::clone(&self.core);
        let task_core = Arc::clone(&self.core);
        let provider = Arc::clone(&self.scope);

        task_core.track(async move {
            match core.fetch_fresh(language).await {
                Ok(templates) => {
                    if provider.current_scope() != scope {
                        debug!(scope = %scope, "Scope changed during refresh, discarding result");
                        return;
                    }
                    core.cache.set(&scope, language, &templates);
                    debug!(scope = %scope, lang = %language, count = templates.len(), "Background refresh stored");
                    core.spawn_verification(templates);
                }
                Err(e) => {
                    warn!(scope = %scope, lang = %language, error = %e, "Background refresh failed, keeping cached templates");
                }
            }
        });
    }

    /// Wait for every background refresh and verification started so far,
    /// including verifications those refreshes start.
    pub async fn wait_background(&self) {
        loop {
            let pending = self.core.take_background();
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Background template task did not complete");
                }
            }
        }
    }

    /// Probe every template asset with the configured worker count and timeout.
    pub async fn verify_assets(&self, templates: &[Template]) -> VerificationSummary {
        verify_assets(
            templates,
            self.core.probe.as_ref(),
            self.core.settings.verify_concurrency,
            self.core.settings.probe_timeout,
        )
        .await
    }

    pub fn clear_current_scope(&self) {
        self.core.cache.clear(&self.scope.current_scope());
    }

    /// Drop cached templates for every scope, e.g. after account deletion.
    pub fn clear_all(&self) {
        self.core.cache.clear_all();
    }
}
