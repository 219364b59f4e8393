//! Bounded-concurrency verification of template assets.
//!
//! A fixed number of workers share a cursor over the templates that have an
//! asset URL. Each worker claims the next unclaimed item and probes it until
//! the cursor runs past the end. [`verify_assets`] returns only after every
//! worker has finished.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::probe::{AssetProbe, ProbeError, ProbeResponse};
use crate::models::Template;

/// Failures listed individually by [`VerificationSummary::log`].
const MAX_LOGGED_FAILURES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    MissingUrl,
    HttpError,
    NotImage,
    NetworkError,
}

/// Outcome of probing one asset URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub ok: bool,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub reason: Option<FailureReason>,
    pub error: Option<String>,
}

impl VerificationResult {
    fn from_response(response: ProbeResponse) -> Self {
        let reason = if !response.is_success() {
            Some(FailureReason::HttpError)
        } else if !response.looks_like_image() {
            Some(FailureReason::NotImage)
        } else {
            None
        };
        Self {
            ok: reason.is_none(),
            status: Some(response.status),
            content_type: response.content_type,
            reason,
            error: None,
        }
    }

    fn failure(reason: FailureReason, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: None,
            content_type: None,
            reason: Some(reason),
            error: Some(error.into()),
        }
    }
}

/// One failed asset, as listed in a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AssetFailure {
    pub id: String,
    pub title: String,
    pub url: String,
    pub reason: FailureReason,
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct VerificationSummary {
    pub total: usize,
    pub with_icon: usize,
    pub ok: usize,
    pub failed: usize,
    /// Every failed asset, uncapped.
    pub failures: Vec<AssetFailure>,
    /// Ids of templates whose asset passed.
    pub passed: Vec<String>,
}

impl VerificationSummary {
    pub fn log(&self) {
        info!(
            total = self.total,
            with_icon = self.with_icon,
            ok = self.ok,
            failed = self.failed,
            "Template asset verification finished"
        );
        for failure in self.failures.iter().take(MAX_LOGGED_FAILURES) {
            warn!(
                template = %failure.id,
                title = %failure.title,
                url = %failure.url,
                reason = ?failure.reason,
                status = ?failure.status,
                "Template asset failed verification"
            );
        }
        if self.failures.len() > MAX_LOGGED_FAILURES {
            warn!(more = self.failures.len() - MAX_LOGGED_FAILURES, "Further asset failures not shown");
        }
    }
}

/// Probe one asset URL: HEAD first, then GET if HEAD is unsupported or fails.
///
/// A timeout on either request is final and reported as a network error.
pub async fn check_asset(probe: &dyn AssetProbe, url: &str, limit: Duration) -> VerificationResult {
    let url = url.trim();
    if url.is_empty() {
        return VerificationResult::failure(FailureReason::MissingUrl, "no asset url");
    }

    match timeout(limit, probe.head(url)).await {
        Err(_) => return VerificationResult::failure(FailureReason::NetworkError, "timed out"),
        Ok(Ok(response)) if response.is_success() => {
            return VerificationResult::from_response(response);
        }
        Ok(Ok(response)) => debug!(url = url, status = response.status, "HEAD failed, retrying with GET"),
        Ok(Err(e)) => debug!(url = url, error = %e, "HEAD unavailable, retrying with GET"),
    }

    match timeout(limit, probe.get(url)).await {
        Err(_) => VerificationResult::failure(FailureReason::NetworkError, "timed out"),
        Ok(Ok(response)) => VerificationResult::from_response(response),
        Ok(Err(ProbeError::Network(message))) => {
            VerificationResult::failure(FailureReason::NetworkError, message)
        }
        Ok(Err(e @ ProbeError::Unsupported)) => {
            VerificationResult::failure(FailureReason::NetworkError, e.to_string())
        }
    }
}

/// Probe every template asset with at most `concurrency` probes in flight.
///
/// Templates without an asset URL are counted in `total` only. Templates are
/// never modified.
pub async fn verify_assets(
    templates: &[Template],
    probe: &dyn AssetProbe,
    concurrency: usize,
    limit: Duration,
) -> VerificationSummary {
    let items: Vec<(&Template, &str)> = templates
        .iter()
        .filter_map(|t| t.icon_url().map(|url| (t, url)))
        .collect();

    let mut summary = VerificationSummary {
        total: templates.len(),
        with_icon: items.len(),
        ..VerificationSummary::default()
    };
    if items.is_empty() {
        return summary;
    }

    let workers = concurrency.clamp(1, items.len());
    let cursor = AtomicUsize::new(0);
    debug!(items = items.len(), workers = workers, "Verifying template assets");

    let items_ref = &items;
    let cursor_ref = &cursor;
    let worker = move |_: usize| async move {
        let mut checked = Vec::new();
        loop {
            let index = cursor_ref.fetch_add(1, Ordering::Relaxed);
            let Some((_, url)) = items_ref.get(index) else {
                break;
            };
            checked.push((index, check_asset(probe, url, limit).await));
        }
        checked
    };

    let mut results: Vec<(usize, VerificationResult)> =
        futures::future::join_all((0..workers).map(worker))
            .await
            .into_iter()
            .flatten()
            .collect();
    results.sort_by_key(|(index, _)| *index);

    for (index, result) in results {
        let (template, url) = items[index];
        if result.ok {
            summary.ok += 1;
            summary.passed.push(template.id.clone());
        } else {
            summary.failed += 1;
            summary.failures.push(AssetFailure {
                id: template.id.clone(),
                title: template.title.clone(),
                url: url.to_string(),
                reason: result.reason.unwrap_or(FailureReason::NetworkError),
                status: result.status,
            });
        }
    }

    summary
}
