//! `metrics` crate implementation of [`MetricsSink`]
//!
//! Counters land in whatever recorder the binary installed (Prometheus in
//! production); without one they are no-ops.

use uuid::Uuid;

use crate::application::ports::MetricsSink;
use crate::domain::reservation::ReservationStatus;

#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetricsSink;

impl PrometheusMetricsSink {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn reservation_created(&self, tenant_id: Uuid) {
        metrics::counter!("reservations_created_total", "tenant" => tenant_id.to_string())
            .increment(1);
    }

    fn reservation_transition(&self, from: ReservationStatus, to: ReservationStatus) {
        metrics::counter!(
            "reservation_transitions_total",
            "from" => from.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
    }

    fn payment_callback(&self, outcome: &'static str) {
        metrics::counter!("payment_callbacks_total", "outcome" => outcome).increment(1);
    }
}
