//! Performance snapshot and baseline types.

use serde::{Deserialize, Serialize};

/// A single performance observation for one page URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSnapshot {
    /// Page URL the metrics were observed on.
    pub url: String,
    /// Page load time in milliseconds.
    pub load_ms: f64,
    /// Time to first byte in milliseconds.
    pub ttfb_ms: f64,
    /// First contentful paint in milliseconds, when the page reported it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcp_ms: Option<f64>,
    /// Largest contentful paint in milliseconds, when the page reported it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lcp_ms: Option<f64>,
    /// Cumulative layout shift (unitless).
    pub cls: f64,
    /// Total transferred bytes.
    pub transfer_bytes: f64,
}

/// Aggregated baseline for one page URL.
///
/// `sample_count == 0` means no observation has been recorded yet; the first
/// snapshot establishes the baseline rather than triggering a regression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceBaseline {
    /// Number of observations folded into this baseline.
    pub sample_count: u32,
    /// Baseline page load time in milliseconds.
    pub load_ms: f64,
    /// Baseline time to first byte in milliseconds.
    pub ttfb_ms: f64,
    /// Baseline first contentful paint, when observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcp_ms: Option<f64>,
    /// Baseline largest contentful paint, when observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lcp_ms: Option<f64>,
    /// Baseline cumulative layout shift.
    pub cls: f64,
    /// Baseline transferred bytes.
    pub transfer_bytes: f64,
}
