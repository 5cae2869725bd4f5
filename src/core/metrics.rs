use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    if PROM_HANDLE.get().is_none() {
        let handle = PrometheusBuilder::new().install_recorder()?;
        let _ = PROM_HANDLE.set(handle);
    }
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    describe_counter!("grades_calculated_total", "Grade records written, by assessment kind");
    describe_counter!("grading_failures_total", "Grading runs aborted, by kind and reason");
    describe_counter!("essay_evaluations_total", "External essay scoring calls, by outcome");
    describe_counter!("exam_status_updates_total", "Exam status changes persisted by the sweeper");
    describe_counter!("exam_status_sweep_failures_total", "Exam rows the sweeper failed to update");
    describe_counter!("http_requests_total", "HTTP responses, by status");
    describe_histogram!("http_request_duration_seconds", "HTTP request latency");
}
