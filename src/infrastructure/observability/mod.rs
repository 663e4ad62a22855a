//! Metrics and audit sinks

mod audit;
mod metrics_sink;

pub use audit::TracingAuditLog;
pub use metrics_sink::PrometheusMetricsSink;
