//! flare Telemetry - Observability Infrastructure
//!
//! Structured logging through `tracing`, Prometheus metrics for the request
//! surface and for every store operation.

pub mod metered;
pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metered::MeteredBackend;
pub use metrics::{metrics_handler, FlareMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, LogFormat, TelemetryConfig};
