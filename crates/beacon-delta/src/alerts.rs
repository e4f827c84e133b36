//! Performance regression detection.
//!
//! Snapshots are compared against per-URL baselines; metrics past their
//! thresholds become a pending alert that rides the next diff responses out.
//! Delivery is at-least-once: alerts stay visible until an implicit query
//! acknowledges them, and are de-duplicated by URL on the producer side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beacon_core::constants::perf;
use beacon_core::{FxHashMap, PerformanceBaseline, PerformanceSnapshot};

/// Fixed recommendation attached to every regression alert.
pub const REGRESSION_RECOMMENDATION: &str =
    "Compare recent deploys and new third-party scripts against the baseline for this page.";

/// Metric names in summary-preference order.
const METRIC_ORDER: [&str; 6] = ["load", "fcp", "lcp", "ttfb", "cls", "transfer_bytes"];

/// One regressed metric.
///
/// For `cls` the `delta_ms` field carries the absolute (unitless) delta and
/// `delta_pct` is 0 when the baseline is not positive; for `transfer_bytes`
/// it carries the byte delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub baseline: f64,
    pub current: f64,
    pub delta_ms: f64,
    pub delta_pct: f64,
}

/// A pending (or delivered) regression alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub url: String,
    pub detected_at: DateTime<Utc>,
    pub summary: String,
    pub metrics: FxHashMap<String, MetricDelta>,
    pub recommendation: String,
    /// 0 = undelivered; otherwise the delivery counter at first delivery.
    pub delivered_at: u64,
}

impl PerformanceAlert {
    /// Whether this alert should surface for a checkpoint captured at the
    /// given delivery watermark.
    pub fn pending_for(&self, watermark: u64) -> bool {
        self.delivered_at == 0 || self.delivered_at > watermark
    }
}

/// Compare a snapshot against its baseline, returning regressed metrics in
/// summary-preference order.
pub(crate) fn compute_metric_deltas(
    snapshot: &PerformanceSnapshot,
    baseline: &PerformanceBaseline,
) -> Vec<(&'static str, MetricDelta)> {
    let mut deltas = Vec::new();

    if let Some(delta) = pct_regression(baseline.load_ms, snapshot.load_ms, perf::LOAD_THRESHOLD_PCT) {
        deltas.push(("load", delta));
    }
    if let (Some(base), Some(current)) = (baseline.fcp_ms, snapshot.fcp_ms) {
        if let Some(delta) = pct_regression(base, current, perf::FCP_THRESHOLD_PCT) {
            deltas.push(("fcp", delta));
        }
    }
    if let (Some(base), Some(current)) = (baseline.lcp_ms, snapshot.lcp_ms) {
        if let Some(delta) = pct_regression(base, current, perf::LCP_THRESHOLD_PCT) {
            deltas.push(("lcp", delta));
        }
    }
    if let Some(delta) = pct_regression(baseline.ttfb_ms, snapshot.ttfb_ms, perf::TTFB_THRESHOLD_PCT) {
        deltas.push(("ttfb", delta));
    }

    let cls_delta = snapshot.cls - baseline.cls;
    if cls_delta > perf::CLS_THRESHOLD_ABS {
        deltas.push((
            "cls",
            MetricDelta {
                baseline: baseline.cls,
                current: snapshot.cls,
                delta_ms: cls_delta,
                delta_pct: if baseline.cls > 0.0 {
                    cls_delta / baseline.cls * 100.0
                } else {
                    0.0
                },
            },
        ));
    }

    if let Some(delta) = pct_regression(
        baseline.transfer_bytes,
        snapshot.transfer_bytes,
        perf::TRANSFER_THRESHOLD_PCT,
    ) {
        deltas.push(("transfer_bytes", delta));
    }

    deltas
}

fn pct_regression(baseline: f64, current: f64, threshold_pct: f64) -> Option<MetricDelta> {
    if baseline <= 0.0 {
        return None;
    }
    let delta = current - baseline;
    let pct = delta / baseline * 100.0;
    if pct <= threshold_pct {
        return None;
    }
    Some(MetricDelta {
        baseline,
        current,
        delta_ms: delta,
        delta_pct: pct,
    })
}

/// Human-readable summary, preferring the load metric.
pub(crate) fn build_summary(deltas: &[(&'static str, MetricDelta)], url: &str) -> String {
    if let Some((_, load)) = deltas.iter().find(|(name, _)| *name == "load") {
        return format!(
            "Load time regressed by {}ms ({}ms → {}ms) on {url}",
            load.delta_ms.round() as i64,
            load.baseline.round() as i64,
            load.current.round() as i64,
        );
    }
    for preferred in METRIC_ORDER {
        if let Some((name, delta)) = deltas.iter().find(|(n, _)| *n == preferred) {
            return format!("{name} regressed by {}% on {url}", delta.delta_pct.round() as i64);
        }
    }
    format!("Performance regression detected on {url}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(load: f64) -> PerformanceBaseline {
        PerformanceBaseline {
            sample_count: 2,
            load_ms: load,
            ttfb_ms: 100.0,
            fcp_ms: None,
            lcp_ms: None,
            cls: 0.02,
            transfer_bytes: 100_000.0,
        }
    }

    fn snapshot(load: f64) -> PerformanceSnapshot {
        PerformanceSnapshot {
            url: "https://app.test/p".to_string(),
            load_ms: load,
            ttfb_ms: 100.0,
            fcp_ms: None,
            lcp_ms: None,
            cls: 0.02,
            transfer_bytes: 100_000.0,
        }
    }

    #[test]
    fn test_load_regression_detected() {
        let deltas = compute_metric_deltas(&snapshot(1300.0), &baseline(1000.0));
        assert_eq!(deltas.len(), 1);
        let (name, delta) = &deltas[0];
        assert_eq!(*name, "load");
        assert_eq!(delta.baseline, 1000.0);
        assert_eq!(delta.current, 1300.0);
        assert_eq!(delta.delta_ms, 300.0);
        assert!((delta.delta_pct - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_within_threshold_is_quiet() {
        // 20% exactly is not a regression; just under stays quiet too.
        assert!(compute_metric_deltas(&snapshot(1200.0), &baseline(1000.0)).is_empty());
        assert!(compute_metric_deltas(&snapshot(1100.0), &baseline(1000.0)).is_empty());
        // Improvements are never regressions.
        assert!(compute_metric_deltas(&snapshot(500.0), &baseline(1000.0)).is_empty());
    }

    #[test]
    fn test_ttfb_threshold_is_fifty_percent() {
        let mut snap = snapshot(1000.0);
        snap.ttfb_ms = 140.0;
        assert!(compute_metric_deltas(&snap, &baseline(1000.0)).is_empty());
        snap.ttfb_ms = 160.0;
        let deltas = compute_metric_deltas(&snap, &baseline(1000.0));
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].0, "ttfb");
    }

    #[test]
    fn test_cls_absolute_delta() {
        let mut snap = snapshot(1000.0);
        snap.cls = 0.25;
        let deltas = compute_metric_deltas(&snap, &baseline(1000.0));
        assert_eq!(deltas.len(), 1);
        let (name, delta) = &deltas[0];
        assert_eq!(*name, "cls");
        assert!((delta.delta_ms - 0.23).abs() < 1e-9);
        assert!(delta.delta_pct > 0.0);

        // Zero baseline reports pct 0.
        let mut base = baseline(1000.0);
        base.cls = 0.0;
        let deltas = compute_metric_deltas(&snap, &base);
        assert_eq!(deltas[0].1.delta_pct, 0.0);
    }

    #[test]
    fn test_fcp_lcp_require_both_sides() {
        let mut snap = snapshot(1000.0);
        snap.fcp_ms = Some(900.0);
        // Baseline has no FCP: ignored.
        assert!(compute_metric_deltas(&snap, &baseline(1000.0)).is_empty());

        let mut base = baseline(1000.0);
        base.fcp_ms = Some(600.0);
        let deltas = compute_metric_deltas(&snap, &base);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].0, "fcp");
    }

    #[test]
    fn test_transfer_bytes_delta_is_bytes() {
        let mut snap = snapshot(1000.0);
        snap.transfer_bytes = 140_000.0;
        let deltas = compute_metric_deltas(&snap, &baseline(1000.0));
        assert_eq!(deltas.len(), 1);
        let (name, delta) = &deltas[0];
        assert_eq!(*name, "transfer_bytes");
        assert_eq!(delta.delta_ms, 40_000.0);
    }

    #[test]
    fn test_summary_prefers_load() {
        let deltas = compute_metric_deltas(&snapshot(1300.0), &baseline(1000.0));
        let summary = build_summary(&deltas, "https://app.test/p");
        assert!(summary.contains("300ms"), "summary was {summary}");
        assert!(summary.contains("1000ms"));
        assert!(summary.contains("https://app.test/p"));
    }

    #[test]
    fn test_summary_falls_back_to_first_metric() {
        let mut snap = snapshot(1000.0);
        snap.ttfb_ms = 200.0;
        let deltas = compute_metric_deltas(&snap, &baseline(1000.0));
        let summary = build_summary(&deltas, "https://app.test/p");
        assert!(summary.starts_with("ttfb regressed by 100%"), "summary was {summary}");
    }
}
