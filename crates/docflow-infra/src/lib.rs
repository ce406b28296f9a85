//! Docflow Infrastructure Library
//!
//! Shared infrastructure for Docflow binaries. Currently this is telemetry
//! initialisation: an env-filtered `tracing` subscriber writing human-readable
//! or JSON lines.

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat, TelemetryConfig};
