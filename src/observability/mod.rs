// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Logging setup and Prometheus counters.

use crate::config::ObservabilityConfig;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Install the global `tracing` subscriber. Safe to call more than once;
/// later calls are ignored.
pub fn init_tracing(config: &ObservabilityConfig) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(config.level())
        .with_ansi(config.ansi)
        .with_target(false)
        .try_init();
}

/// Counters for role operations, labelled by operation and outcome.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    role_operations: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let role_operations = IntCounterVec::new(
            Opts::new("role_operations_total", "Role operations by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(role_operations.clone()))?;
        Ok(Self {
            registry,
            role_operations,
        })
    }

    pub fn record(&self, operation: &str, outcome: &str) {
        self.role_operations
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn count(&self, operation: &str, outcome: &str) -> u64 {
        self.role_operations
            .with_label_values(&[operation, outcome])
            .get()
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::warn!("failed to encode metrics: {e}");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_labelled_per_outcome() {
        let metrics = Metrics::new().unwrap();
        metrics.record("grantAdmin", "success");
        metrics.record("grantAdmin", "success");
        metrics.record("grantAdmin", "permission-denied");

        assert_eq!(metrics.count("grantAdmin", "success"), 2);
        assert_eq!(metrics.count("grantAdmin", "permission-denied"), 1);
        assert_eq!(metrics.count("revokeAdmin", "success"), 0);
    }

    #[test]
    fn render_uses_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record("resetToGuest", "success");
        let text = metrics.render();
        assert!(text.contains("# TYPE role_operations_total counter"));
        assert!(text.contains(r#"operation="resetToGuest""#));
    }
}
