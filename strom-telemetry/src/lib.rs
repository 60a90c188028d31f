//! # Strom Telemetry
//!
//! Log subscriber set-up and Prometheus metrics for the event core, the
//! classifier and packet I/O interfaces.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
