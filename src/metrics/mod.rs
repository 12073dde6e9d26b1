use metrics::{counter, histogram, Counter, Histogram};
use once_cell::sync::Lazy;

use crate::middleware::severity::Tier;

pub struct LoggerMetrics {
    pub body_read_failures_total: Counter,
    pub captured_request_bytes: Histogram,
}

pub static LOGGER_METRICS: Lazy<LoggerMetrics> = Lazy::new(|| LoggerMetrics {
    body_read_failures_total: counter!("request_logger_body_read_failures_total"),
    captured_request_bytes: histogram!("request_logger_captured_request_bytes"),
});

pub fn record_entry(tier: Tier) {
    counter!("request_logger_entries_total", "tier" => tier.as_str()).increment(1);
}

pub fn record_body_read_failure() {
    LOGGER_METRICS.body_read_failures_total.increment(1);
}

pub fn record_captured_request(len: usize) {
    LOGGER_METRICS.captured_request_bytes.record(len as f64);
}
