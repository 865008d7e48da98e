use warp::http::HeaderMap;

use crate::error::BenchError;

pub const REQUEST_TIMESTAMP: &str = "X-Request-Timestamp";
pub const ARRIVE_TIMESTAMP: &str = "X-Arrive-Timestamp";
pub const SEQ_START_TIME: &str = "X-Seq-Start-Time";
pub const RATE: &str = "X-Rate";
pub const LAST_RATE: &str = "X-Last-Rate";

/// Inputs of one handling, taken from the inbound headers or synthesised
/// locally when the service samples its own rate.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadRequest {
    /// When the upstream router dispatched the request (ms since epoch).
    pub route_timestamp: f64,
    /// When the request reached this tier (ms since epoch).
    pub arrive_timestamp: f64,
    /// Start of the enclosing sequence. `Some(0.0)` marks an action that is
    /// not the last one of its sequence.
    pub seq_start_time: Option<f64>,
    /// Workload size. For the real-world service this is the target
    /// execution time in ms.
    pub rate: u64,
    /// Size of the previous job on the same pod, `0` when unknown.
    pub last_rate: i64,
}

/// Which inbound headers a service insists on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderPolicy {
    /// `X-Seq-Start-Time` must be present.
    pub require_seq_start: bool,
    /// `X-Rate: 0` is a valid request. Used where the rate is a time budget
    /// rather than a job size.
    pub allow_zero_rate: bool,
}

impl WorkloadRequest {
    /// Extracts the request from the inbound headers.
    ///
    /// Timestamps and the rate are mandatory; `X-Seq-Start-Time` is only
    /// mandatory when the policy asks for it. An empty header counts as a
    /// missing one.
    pub fn from_headers(headers: &HeaderMap, policy: HeaderPolicy) -> Result<Self, BenchError> {
        let route_timestamp = required_millis(headers, REQUEST_TIMESTAMP)?;
        let arrive_timestamp = required_millis(headers, ARRIVE_TIMESTAMP)?;
        let seq_start_time = if policy.require_seq_start {
            Some(required_millis(headers, SEQ_START_TIME)?)
        } else {
            optional_millis(headers, SEQ_START_TIME)
        };

        let rate = header_str(headers, RATE)
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|rate| *rate > 0 || policy.allow_zero_rate)
            .ok_or(BenchError::LackHeaders { header: RATE })?;

        Ok(Self {
            route_timestamp,
            arrive_timestamp,
            seq_start_time,
            rate,
            last_rate: last_rate(headers),
        })
    }

    /// A request whose rate was picked by the service itself.
    ///
    /// Whatever timing headers the caller did send are still honoured. A
    /// missing arrival stamp becomes `now`, and a missing routing stamp
    /// falls back to the arrival.
    pub fn with_sampled_rate(headers: &HeaderMap, rate: u64, now: f64) -> Self {
        let arrive_timestamp = optional_millis(headers, ARRIVE_TIMESTAMP).unwrap_or(now);
        Self {
            route_timestamp: optional_millis(headers, REQUEST_TIMESTAMP).unwrap_or(arrive_timestamp),
            arrive_timestamp,
            seq_start_time: optional_millis(headers, SEQ_START_TIME),
            rate,
            last_rate: last_rate(headers),
        }
    }

    /// A sampled request with no headers at all: arrival and routing
    /// collapse to `now`.
    pub fn sampled(rate: u64, now: f64) -> Self {
        Self::with_sampled_rate(&HeaderMap::new(), rate, now)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn optional_millis(headers: &HeaderMap, name: &str) -> Option<f64> {
    header_str(headers, name)
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|millis| millis.is_finite())
}

fn required_millis(headers: &HeaderMap, name: &'static str) -> Result<f64, BenchError> {
    optional_millis(headers, name).ok_or(BenchError::LackHeaders { header: name })
}

fn last_rate(headers: &HeaderMap) -> i64 {
    header_str(headers, LAST_RATE)
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(0)
}
