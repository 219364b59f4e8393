//! Template asset handling.
//!
//! This module provides:
//! - `CacheBuster`: tags asset URLs with the asset version so downstream
//!   image caches pick up replaced artwork
//! - `verify_assets`: a bounded worker pool that probes every template icon
//!   for reachability and an image content type
//! - `AssetProbe` / `HttpProbe`: the network seam the verifier probes through

pub mod buster;
pub mod probe;
pub mod verifier;

pub use buster::CacheBuster;
pub use probe::{AssetProbe, HttpProbe, ProbeError, ProbeResponse};
pub use verifier::{
    verify_assets, AssetFailure, FailureReason, VerificationResult, VerificationSummary,
};
