//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::assets::{AssetProbe, ProbeError, ProbeResponse};
use crate::catalog::{CatalogError, RemoteCatalog};
use crate::models::{CatalogRow, Language, Template, Translation};

pub fn template(id: &str, order_index: i64) -> Template {
    Template {
        id: id.to_string(),
        category: "general".to_string(),
        template_type: "custom".to_string(),
        icon: Some(format!("https://cdn.example.com/{}.png", id)),
        order_index,
        config: None,
        is_active: true,
        title: format!("Template {}", id),
        description: None,
        language: Language::En,
    }
}

/// Catalog row with a single market field authored in Russian.
pub fn row(id: &str, order_index: i64, language: Language) -> CatalogRow {
    CatalogRow {
        id: id.to_string(),
        category: "general".to_string(),
        template_type: "shopping".to_string(),
        icon: Some(format!("https://cdn.example.com/{}.png", id)),
        order_index,
        config: Some(json!({
            "fields": [{ "key": "items", "type": "market", "label": "Что купить?" }]
        })),
        is_active: true,
        translation: Translation {
            language,
            title: format!("{} ({})", id, language),
            description: None,
        },
    }
}

#[derive(Default)]
pub struct MockCatalog {
    rows: Mutex<HashMap<Language, Vec<CatalogRow>>>,
    failure: Mutex<Option<u16>>,
    delay: Mutex<Duration>,
    calls: Mutex<Vec<Language>>,
}

impl MockCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_rows(&self, language: Language, rows: Vec<CatalogRow>) {
        self.rows.lock().unwrap().insert(language, rows);
    }

    pub fn fail_with_status(&self, status: u16) {
        *self.failure.lock().unwrap() = Some(status);
    }

    /// Make every fetch take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<Language> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteCatalog for MockCatalog {
    async fn fetch_rows(&self, language: Language) -> Result<Vec<CatalogRow>, CatalogError> {
        self.calls.lock().unwrap().push(language);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = *self.failure.lock().unwrap() {
            return Err(CatalogError::Http {
                status,
                body: "mock failure".to_string(),
            });
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&language)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
pub struct ProbeBehavior {
    head: Result<ProbeResponse, ProbeError>,
    get: Result<ProbeResponse, ProbeError>,
    head_delay: Duration,
    get_delay: Duration,
}

impl ProbeBehavior {
    fn respond(status: u16, content_type: &str) -> Self {
        let response = ProbeResponse {
            status,
            content_type: Some(content_type.to_string()),
        };
        Self {
            head: Ok(response.clone()),
            get: Ok(response),
            head_delay: Duration::ZERO,
            get_delay: Duration::ZERO,
        }
    }

    pub fn image() -> Self {
        Self::respond(200, "image/png")
    }

    pub fn status(status: u16) -> Self {
        Self::respond(status, "image/png")
    }

    pub fn content_type(content_type: &str) -> Self {
        Self::respond(200, content_type)
    }

    pub fn network(message: &str) -> Self {
        let err = ProbeError::Network(message.to_string());
        Self {
            head: Err(err.clone()),
            get: Err(err),
            head_delay: Duration::ZERO,
            get_delay: Duration::ZERO,
        }
    }

    pub fn head_unsupported(mut self) -> Self {
        self.head = Err(ProbeError::Unsupported);
        self
    }

    /// HEAD answers with `status`; GET keeps its scripted answer.
    pub fn head_fails_status(mut self, status: u16) -> Self {
        self.head = Ok(ProbeResponse {
            status,
            content_type: None,
        });
        self
    }

    /// HEAD errors out; GET keeps its scripted answer.
    pub fn head_fails_network(mut self, message: &str) -> Self {
        self.head = Err(ProbeError::Network(message.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.head_delay = delay;
        self.get_delay = delay;
        self
    }

    pub fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = delay;
        self
    }
}

/// Probe with scripted answers that records how many probes overlap.
pub struct MockProbe {
    default: ProbeBehavior,
    overrides: Mutex<HashMap<String, ProbeBehavior>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    get_calls: AtomicUsize,
    probed: Mutex<Vec<String>>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockProbe {
    pub fn new(default: ProbeBehavior) -> Self {
        Self {
            default,
            overrides: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, url: &str, behavior: ProbeBehavior) {
        self.overrides.lock().unwrap().insert(url.to_string(), behavior);
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn probed_urls(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }

    fn behavior(&self, url: &str) -> ProbeBehavior {
        self.overrides
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    async fn enter(&self, delay: Duration) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AssetProbe for MockProbe {
    async fn head(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        self.probed.lock().unwrap().push(url.to_string());
        let behavior = self.behavior(url);
        self.enter(behavior.head_delay).await;
        behavior.head
    }

    async fn get(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior(url);
        self.enter(behavior.get_delay).await;
        behavior.get
    }
}
