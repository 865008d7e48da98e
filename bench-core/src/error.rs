use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Failures scoped to a single request. None of them are fatal to the
/// process; the handler turns each one into a plain-text body.
#[derive(Debug, Error)]
pub enum BenchError {
    /// A required header is absent, empty or not a number.
    #[error("lack headers")]
    LackHeaders { header: &'static str },

    /// The store or the helper process failed while running the workload.
    #[error("workload failed: {0:#}")]
    Workload(#[from] anyhow::Error),

    /// The collector could not be reached or answered with a non-2xx status.
    #[error("unable to deliver result to collector {url}: {source}")]
    Delivery {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
}

/// Start-up failures. These abort the service before it binds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid collector url: {0}")]
    CollectorUrl(#[from] url::ParseError),

    #[error("failed to read CDF file {path}: {source}")]
    CdfRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CDF row {line} in {path}: {row:?}")]
    CdfRow {
        path: PathBuf,
        line: usize,
        row: String,
    },

    #[error("CDF file {0} has no data rows")]
    CdfEmpty(PathBuf),

    #[error("invalid job table: {0}")]
    JobTable(String),

    #[error("rate source `{0}` is not supported by this service")]
    UnsupportedRateSource(&'static str),
}
