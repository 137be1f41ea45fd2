//! Prometheus recorder and `/metrics` rendering.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus recorder and return its render handle.
///
/// Call once at startup, before any metric is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_core::metrics::HUB_PUBLISHES_TOTAL;

    #[test]
    fn local_recorder_renders_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!(HUB_PUBLISHES_TOTAL).increment(3);
        });
        assert!(handle.render().contains("hub_publishes_total 3"));
    }

    #[test]
    fn detached_handle_does_not_panic() {
        let _ = detached_handle().render();
    }
}
