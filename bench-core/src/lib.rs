//! Shared plumbing for the benchmark endpoints.
//!
//! Every service in this workspace is the same single-route handler wrapped
//! around a different synthetic workload: read timing headers, burn some
//! work proportional to the requested rate, format one result line and push
//! it to the collector.

pub mod alu;
pub mod config;
pub mod error;
pub mod memory;
pub mod report;
pub mod request;
pub mod result;
pub mod sampling;
pub mod server;
pub mod telemetry;

pub use config::{CommonArgs, RateSource, ServiceConfig};
pub use error::{BenchError, ConfigError};
pub use request::{HeaderPolicy, WorkloadRequest};
pub use result::{LineFormat, WorkloadResult};
pub use server::{Bench, WorkOutput, Workload};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1000.0
}
