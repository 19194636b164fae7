use std::sync::OnceLock;

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

pub(crate) fn record_ocr(outcome: &'static str, seconds: f64) {
    metrics::counter!("aems_ocr_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("aems_ocr_duration_seconds").record(seconds);
}

pub(crate) fn record_grading(outcome: &'static str, seconds: f64) {
    metrics::counter!("aems_grading_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("aems_grading_duration_seconds").record(seconds);
}
