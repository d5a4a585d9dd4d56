use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_ai_call(operation: &'static str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!("ai_requests_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("ai_request_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

pub(crate) fn record_grading(kind: &'static str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!("grading_jobs_total", "kind" => kind, "status" => outcome).increment(1);
    metrics::histogram!("grading_duration_seconds", "kind" => kind).record(elapsed.as_secs_f64());
}
