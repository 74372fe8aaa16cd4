// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Prometheus metrics for Cruise Control traffic
//!
//! - Requests per endpoint and outcome
//! - Task status polls per outcome

use cruise_control_types::Endpoint;
use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};

// Metric definitions are constant; a failure here is a programming error.
#[allow(clippy::expect_used)]
mod metrics_impl {
    use super::*;
    use lazy_static::lazy_static;

    lazy_static! {
        /// Registry for all client metrics
        pub static ref REGISTRY: Registry = Registry::new();

        /// Cruise Control requests by endpoint and outcome
        pub static ref REQUESTS: IntCounterVec = IntCounterVec::new(
            Opts::new(
                "cruise_control_requests_total",
                "Total Cruise Control REST requests by endpoint and outcome"
            ),
            &["endpoint", "outcome"]
        ).expect("valid metric name");

        /// User task status polls by outcome
        pub static ref TASK_POLLS: IntCounterVec = IntCounterVec::new(
            Opts::new(
                "cruise_control_task_polls_total",
                "Total user task status polls by observed outcome"
            ),
            &["outcome"]
        ).expect("valid metric name");
    }
}

pub use metrics_impl::{REGISTRY, REQUESTS, TASK_POLLS};

/// Register all metrics with the registry
///
/// Call once during startup; a second call reports `AlreadyReg`.
pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(REQUESTS.clone()))?;
    REGISTRY.register(Box::new(TASK_POLLS.clone()))?;
    Ok(())
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

pub(crate) fn record_request(endpoint: Endpoint, outcome: &str) {
    REQUESTS
        .with_label_values(&[endpoint.to_string().as_str(), outcome])
        .inc();
}

pub(crate) fn record_poll(outcome: &str) {
    TASK_POLLS.with_label_values(&[outcome]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_counter_is_labelled_by_endpoint() {
        let counter = REQUESTS.with_label_values(&["stop", "ok"]);
        let before = counter.get();
        record_request(Endpoint::Stop, "ok");
        record_request(Endpoint::Stop, "ok");
        assert_eq!(counter.get() - before, 2);
    }

    #[test]
    fn registered_metrics_are_gathered() {
        register_metrics().unwrap_or_else(|e| panic!("register failed: {e}"));
        record_poll("in_progress");
        let text = gather_metrics();
        assert!(text.contains("cruise_control_task_polls_total"));
    }
}
