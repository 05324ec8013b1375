// Prometheus metrics for the execution service

use algoforge_common::types::Language;
use algoforge_engine::Outcome;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_with_registry, Encoder, HistogramVec, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref EXECUTIONS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "algoforge_executions_total",
        "Execution requests by language and outcome",
        &["language", "outcome"],
        REGISTRY
    )
    .expect("metric can be registered");

    pub static ref EXECUTION_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        "algoforge_execution_duration_seconds",
        "Wall time spent compiling and running submissions",
        &["language"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0],
        REGISTRY
    )
    .expect("metric can be registered");

    pub static ref EXECUTIONS_IN_FLIGHT: IntGauge = register_int_gauge_with_registry!(
        "algoforge_executions_in_flight",
        "Requests currently inside the execution pipeline",
        REGISTRY
    )
    .expect("metric can be registered");
}

/// Decrements the in-flight gauge when the request leaves the pipeline
pub struct InFlightGuard;

impl InFlightGuard {
    pub fn enter() -> Self {
        EXECUTIONS_IN_FLIGHT.inc();
        Self
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        EXECUTIONS_IN_FLIGHT.dec();
    }
}

pub fn record_execution(language: Language, outcome: Outcome, elapsed_ms: u64) {
    EXECUTIONS_TOTAL
        .with_label_values(&[language.as_str(), outcome.as_str()])
        .inc();
    EXECUTION_DURATION
        .with_label_values(&[language.as_str()])
        .observe(elapsed_ms as f64 / 1000.0);
}

/// Label used for every language name that does not parse
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Bounded `language` label for a raw request field. A missing name is the
/// default language.
pub fn language_label(name: Option<&str>) -> &'static str {
    match name {
        None => Language::default().as_str(),
        Some(raw) => raw
            .parse::<Language>()
            .map(|language| language.as_str())
            .unwrap_or(UNKNOWN_LANGUAGE),
    }
}

/// Requests that never reached a toolchain, e.g. rejected at admission
pub fn record_rejection(language: &'static str, reason: &'static str) {
    EXECUTIONS_TOTAL.with_label_values(&[language, reason]).inc();
}

pub fn render() -> Result<String, prometheus::Error> {
    // metrics register on first use
    lazy_static::initialize(&EXECUTIONS_TOTAL);
    lazy_static::initialize(&EXECUTION_DURATION);
    lazy_static::initialize(&EXECUTIONS_IN_FLIGHT);

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_execution() {
        record_execution(Language::Python, Outcome::Timeout, 2000);
        let text = render().unwrap();
        assert!(text.contains("algoforge_executions_total"));
        assert!(text.contains("outcome=\"timeout\""));
        assert!(text.contains("algoforge_execution_duration_seconds"));
    }

    #[test]
    fn test_language_label_is_bounded() {
        assert_eq!(language_label(None), "cpp");
        assert_eq!(language_label(Some("py")), "python");
        assert_eq!(language_label(Some("lang-1")), UNKNOWN_LANGUAGE);
        assert_eq!(language_label(Some("lang-2")), UNKNOWN_LANGUAGE);
    }

    #[test]
    fn test_in_flight_guard_balances() {
        let before = EXECUTIONS_IN_FLIGHT.get();
        {
            let _guard = InFlightGuard::enter();
            assert_eq!(EXECUTIONS_IN_FLIGHT.get(), before + 1);
        }
        assert_eq!(EXECUTIONS_IN_FLIGHT.get(), before);
    }
}
