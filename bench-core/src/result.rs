use std::fmt;

use crate::request::WorkloadRequest;

/// Layout of the result line. The collector has seen three revisions of it
/// over time; each service speaks exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    /// `{rate} {start} {end} {duration}`
    Span,
    /// `{rate} {responseTime} {jct} {latency} {lastRate}`
    Timing,
    /// `{seqLatency} {responseTime} {memSize} {latency} {lastRate}`
    Sequence,
}

/// Timing measurements of one handled request.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadResult {
    pub rate: u64,
    pub start_exec: f64,
    pub end_exec: f64,
    /// `start_exec - arrive`
    pub response_time: f64,
    /// `end_exec - route`
    pub job_completion_time: f64,
    /// `end_exec - arrive`
    pub latency: f64,
    /// `end_exec - seq_start` for the last action of a sequence, else `0`.
    pub seq_latency: f64,
    pub mem_size: i64,
    pub last_rate: i64,
}

impl WorkloadResult {
    pub fn compute(request: &WorkloadRequest, start_exec: f64, end_exec: f64, mem_size: i64) -> Self {
        let seq_latency = match request.seq_start_time {
            Some(seq_start) if seq_start != 0.0 => end_exec - seq_start,
            _ => 0.0,
        };

        Self {
            rate: request.rate,
            start_exec,
            end_exec,
            response_time: start_exec - request.arrive_timestamp,
            job_completion_time: end_exec - request.route_timestamp,
            latency: end_exec - request.arrive_timestamp,
            seq_latency,
            mem_size,
            last_rate: request.last_rate,
        }
    }

    /// Renders the newline-terminated line sent to the collector and back to
    /// the caller.
    pub fn line(&self, format: LineFormat) -> String {
        Line { result: self, format }.to_string()
    }
}

struct Line<'a> {
    result: &'a WorkloadResult,
    format: LineFormat,
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.result;
        match self.format {
            LineFormat::Span => writeln!(
                f,
                "{} {} {} {}",
                r.rate,
                r.start_exec,
                r.end_exec,
                r.end_exec - r.start_exec
            ),
            LineFormat::Timing => writeln!(
                f,
                "{} {} {} {} {}",
                r.rate, r.response_time, r.job_completion_time, r.latency, r.last_rate
            ),
            LineFormat::Sequence => writeln!(
                f,
                "{} {} {} {} {}",
                r.seq_latency, r.response_time, r.mem_size, r.latency, r.last_rate
            ),
        }
    }
}
