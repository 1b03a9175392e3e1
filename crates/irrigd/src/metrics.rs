//! Prometheus metrics for the poller, decisions and actuations.

use prometheus::{
    register_gauge_with_registry, register_int_counter_vec_with_registry, Encoder, Gauge,
    IntCounterVec, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct IrrigMetrics {
    /// Feed polls by result (ok, failed)
    pub polls_total: IntCounterVec,
    /// Decisions by action (IRRIGATE, SKIP)
    pub decisions_total: IntCounterVec,
    /// Actuations by result (ok, failed, shed)
    pub actuations_total: IntCounterVec,
    /// Volume of the most recent decision
    pub last_volume_ml: Gauge,

    registry: Registry,
}

impl IrrigMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let polls_total = register_int_counter_vec_with_registry!(
            "irrigd_polls_total",
            "Telemetry feed polls by result",
            &["result"],
            registry
        )?;

        let decisions_total = register_int_counter_vec_with_registry!(
            "irrigd_decisions_total",
            "Irrigation decisions by action",
            &["action"],
            registry
        )?;

        let actuations_total = register_int_counter_vec_with_registry!(
            "irrigd_actuations_total",
            "Pump actuations by result",
            &["result"],
            registry
        )?;

        let last_volume_ml = register_gauge_with_registry!(
            "irrigd_last_volume_ml",
            "Recommended volume of the most recent decision",
            registry
        )?;

        Ok(Self {
            polls_total,
            decisions_total,
            actuations_total,
            last_volume_ml,
            registry,
        })
    }

    pub fn record_poll(&self, ok: bool) {
        let result = if ok { "ok" } else { "failed" };
        self.polls_total.with_label_values(&[result]).inc();
    }

    pub fn record_actuation(&self, result: &str) {
        self.actuations_total.with_label_values(&[result]).inc();
    }

    /// Render in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
