// contour-server/src/telemetry.rs
// ============================================================================
// Module: Server Telemetry
// Description: Observability hooks for the HTTP resolution surface.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for request counters and
//! latency histograms. It is intentionally dependency-light so deployments
//! can plug in Prometheus or OpenTelemetry without redesign. The stderr sink
//! emits one JSON line per request for structured log collection.
//!
//! Security posture: telemetry must not leak resolved configuration values;
//! events carry route labels and timings only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for request histograms.
pub const API_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// API route classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ApiRoute {
    /// Configuration resolution.
    Resolve,
    /// Specification listing.
    ListSpecs,
    /// Specification creation.
    CreateSpec,
    /// Specification replacement.
    ReplaceSpec,
    /// Specification deletion.
    DeleteSpec,
    /// Rule composition diagnostics.
    ComposeRules,
    /// Template instantiation diagnostics.
    FromTemplate,
    /// Conditional-rule gate diagnostics.
    TestConditions,
    /// Health probe.
    Health,
}

impl ApiRoute {
    /// Returns a stable label for the route.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::ListSpecs => "list_specs",
            Self::CreateSpec => "create_spec",
            Self::ReplaceSpec => "replace_spec",
            Self::DeleteSpec => "delete_spec",
            Self::ComposeRules => "compose_rules",
            Self::FromTemplate => "from_template",
            Self::TestConditions => "test_conditions",
            Self::Health => "health",
        }
    }
}

/// Request outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ApiOutcome {
    /// 2xx response.
    Ok,
    /// 4xx response.
    ClientError,
    /// 5xx response.
    ServerError,
}

impl ApiOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
        }
    }

    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            500..=599 => Self::ServerError,
            400..=499 => Self::ClientError,
            _ => Self::Ok,
        }
    }
}

/// Request metric event payload.
#[derive(Debug, Clone)]
pub struct ApiMetricEvent {
    /// Route label.
    pub route: ApiRoute,
    /// Outcome label.
    pub outcome: ApiOutcome,
    /// Request latency.
    pub latency: Duration,
}

// ============================================================================
// SECTION: Metrics Sinks
// ============================================================================

/// Metrics sink for request events.
pub trait ApiMetrics: Send + Sync {
    /// Records one request event.
    fn record(&self, event: &ApiMetricEvent);
}

/// Metrics sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl ApiMetrics for NoopMetrics {
    fn record(&self, _event: &ApiMetricEvent) {}
}

/// Metrics sink emitting one JSON line per request to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrMetrics;

impl ApiMetrics for StderrMetrics {
    fn record(&self, event: &ApiMetricEvent) {
        let line = json!({
            "route": event.route.as_str(),
            "outcome": event.outcome.as_str(),
            "latency_ms": u64::try_from(event.latency.as_millis()).unwrap_or(u64::MAX),
        });
        eprintln!("{line}");
    }
}
