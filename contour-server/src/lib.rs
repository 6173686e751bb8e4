// contour-server/src/lib.rs
// ============================================================================
// Module: Contour Server Library
// Description: HTTP surface, configuration, and telemetry for Contour.
// Purpose: Expose the router and state assembly for embedding and tests.
// Dependencies: contour-core, axum
// ============================================================================

//! ## Overview
//! The server crate wires the resolution core to its HTTP surface: route
//! construction, request-context assembly at the edge, strict status-code
//! mapping, and a dependency-light metrics seam.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod server;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::ServerConfig;
pub use server::AppState;
pub use server::ResolveQuery;
pub use server::build_router;
pub use server::now_timestamp;
pub use telemetry::ApiMetricEvent;
pub use telemetry::ApiMetrics;
pub use telemetry::ApiOutcome;
pub use telemetry::ApiRoute;
pub use telemetry::NoopMetrics;
pub use telemetry::StderrMetrics;
