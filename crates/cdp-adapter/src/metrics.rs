use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{
    core::Collector, histogram_opts, Encoder, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use serde::Serialize;
use tracing::error;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AdapterMetricsSnapshot {
    pub commands: u64,
    pub command_success: u64,
    pub command_failures: u64,
    pub command_timeouts: u64,
    pub command_latency_total_us: u64,
}

static COMMANDS: AtomicU64 = AtomicU64::new(0);
static COMMAND_SUCCESS: AtomicU64 = AtomicU64::new(0);
static COMMAND_FAILURES: AtomicU64 = AtomicU64::new(0);
static COMMAND_TIMEOUTS: AtomicU64 = AtomicU64::new(0);
static COMMAND_LATENCY_TOTAL_US: AtomicU64 = AtomicU64::new(0);

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
    static ref CDP_COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reel_cdp_commands_total", "Total CDP commands sent"),
        &["method"]
    )
    .expect("valid metric definition");
    static ref CDP_COMMAND_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reel_cdp_command_failures_total", "Total CDP command failures"),
        &["method"]
    )
    .expect("valid metric definition");
    static ref CDP_COMMAND_DURATION: HistogramVec = HistogramVec::new(
        histogram_opts!(
            "reel_cdp_command_duration_seconds",
            "CDP command latency",
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 15.0]
        ),
        &["method"]
    )
    .expect("valid metric definition");
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register cdp metric");
        }
    }
}

fn ensure_registered() {
    register(&REGISTRY, CDP_COMMANDS_TOTAL.clone());
    register(&REGISTRY, CDP_COMMAND_FAILURES_TOTAL.clone());
    register(&REGISTRY, CDP_COMMAND_DURATION.clone());
}

pub fn record_command(method: &str) {
    COMMANDS.fetch_add(1, Ordering::Relaxed);
    CDP_COMMANDS_TOTAL.with_label_values(&[method]).inc();
}

pub fn record_command_success(method: &str, duration: Duration) {
    COMMAND_SUCCESS.fetch_add(1, Ordering::Relaxed);
    let micros = duration.as_micros().min(u64::MAX as u128) as u64;
    COMMAND_LATENCY_TOTAL_US.fetch_add(micros, Ordering::Relaxed);
    CDP_COMMAND_DURATION
        .with_label_values(&[method])
        .observe(duration.as_secs_f64());
}

pub fn record_command_failure(method: &str, timed_out: bool) {
    COMMAND_FAILURES.fetch_add(1, Ordering::Relaxed);
    if timed_out {
        COMMAND_TIMEOUTS.fetch_add(1, Ordering::Relaxed);
    }
    CDP_COMMAND_FAILURES_TOTAL
        .with_label_values(&[method])
        .inc();
}

pub fn snapshot() -> AdapterMetricsSnapshot {
    AdapterMetricsSnapshot {
        commands: COMMANDS.load(Ordering::Relaxed),
        command_success: COMMAND_SUCCESS.load(Ordering::Relaxed),
        command_failures: COMMAND_FAILURES.load(Ordering::Relaxed),
        command_timeouts: COMMAND_TIMEOUTS.load(Ordering::Relaxed),
        command_latency_total_us: COMMAND_LATENCY_TOTAL_US.load(Ordering::Relaxed),
    }
}

/// Prometheus text exposition of every adapter metric.
pub fn render_text() -> String {
    ensure_registered();
    let mut buffer = Vec::new();
    if let Err(err) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        error!(?err, "failed to encode cdp metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_success_and_failure_metrics() {
        let before = snapshot();
        record_command("Page.navigate");
        record_command_success("Page.navigate", Duration::from_micros(150));
        record_command_failure("Page.navigate", true);
        let after = snapshot();
        assert!(after.commands > before.commands);
        assert!(after.command_success > before.command_success);
        assert!(after.command_failures > before.command_failures);
        assert!(after.command_timeouts > before.command_timeouts);
        assert!(after.command_latency_total_us >= before.command_latency_total_us + 150);
    }

    #[test]
    fn text_exposition_names_methods() {
        record_command("Page.printToPDF");
        let text = render_text();
        assert!(text.contains("reel_cdp_commands_total"));
        assert!(text.contains("Page.printToPDF"));
    }
}
