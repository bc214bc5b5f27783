//! Prometheus metrics
//!
//! The poll loop counts `operation_polls_total{outcome}` and
//! `operation_reauth_total` through the `metrics` facade. This binary adds
//! `operation_wait_duration_seconds{kind, outcome}` and, with
//! `--metrics-file`, writes everything in text exposition format for a
//! node_exporter textfile collector.

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Buckets span 1s to 1h so create/update/delete deadlines all land inside.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let builder = match builder.set_buckets_for_metric(
        Matcher::Full("operation_wait_duration_seconds".to_string()),
        &[1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0],
    ) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::warn!(error = %e, "failed to set histogram buckets, using summary");
            PrometheusBuilder::new()
        }
    };
    let recorder = builder.build_recorder();
    let handle = recorder.handle();
    if let Err(e) = ::metrics::set_global_recorder(recorder) {
        tracing::warn!(error = %e, "metrics recorder already installed");
    }
    handle
}

/// Record how long one tracked operation took to reach its outcome.
pub fn record_wait(kind: &'static str, outcome: &'static str, elapsed: Duration) {
    ::metrics::histogram!(
        "operation_wait_duration_seconds",
        "kind" => kind,
        "outcome" => outcome
    )
    .record(elapsed.as_secs_f64());
}
