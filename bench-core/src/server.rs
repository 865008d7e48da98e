use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use warp::http::HeaderMap;
use warp::{Filter, Rejection, Reply};

use crate::config::{RateSource, ServiceConfig};
use crate::error::BenchError;
use crate::now_millis;
use crate::report::Reporter;
use crate::request::{HeaderPolicy, WorkloadRequest};
use crate::result::{LineFormat, WorkloadResult};

/// Side data a workload hands back besides its elapsed time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkOutput {
    /// Memory the workload allocated, in MiB. Only the real-world service
    /// fills this in.
    pub mem_size: i64,
}

/// The synthetic unit of work a service performs for one request.
#[async_trait]
pub trait Workload: Send + Sync + 'static {
    /// Called once per request, before the workload runs, when the service
    /// samples its own size. `None` defers to the configured rate source.
    fn sample_rate(&self) -> Option<u64> {
        None
    }

    async fn run(&self, request: &WorkloadRequest) -> Result<WorkOutput, BenchError>;
}

/// One benchmark endpoint: a workload plus the measuring and reporting
/// around it.
pub struct Bench<W> {
    workload: W,
    rate_source: RateSource,
    format: LineFormat,
    policy: HeaderPolicy,
    reporter: Option<Reporter>,
}

impl<W: Workload> Bench<W> {
    pub fn new(workload: W, config: &ServiceConfig, format: LineFormat) -> Self {
        Self {
            workload,
            rate_source: config.rate_source.clone(),
            format,
            policy: HeaderPolicy::default(),
            reporter: config.collector.clone().map(Reporter::new),
        }
    }

    /// Demands `X-Seq-Start-Time` on header-driven requests.
    pub fn require_seq_start(mut self, require: bool) -> Self {
        self.policy.require_seq_start = require;
        self
    }

    /// Accepts `X-Rate: 0` on header-driven requests.
    pub fn allow_zero_rate(mut self, allow: bool) -> Self {
        self.policy.allow_zero_rate = allow;
        self
    }

    pub fn workload(&self) -> &W {
        &self.workload
    }

    fn request(&self, headers: &HeaderMap) -> Result<WorkloadRequest, BenchError> {
        if let Some(rate) = self.workload.sample_rate() {
            return Ok(WorkloadRequest::with_sampled_rate(headers, rate, now_millis()));
        }
        match &self.rate_source {
            RateSource::Header => WorkloadRequest::from_headers(headers, self.policy),
            RateSource::Weighted(table) => {
                let rate = table.choose(&mut rand::thread_rng());
                Ok(WorkloadRequest::with_sampled_rate(headers, rate, now_millis()))
            }
        }
    }

    /// Handles one request end to end and returns the response body.
    pub async fn handle(&self, headers: &HeaderMap) -> String {
        let request = match self.request(headers) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = ?e, "rejecting request");
                return e.to_string();
            }
        };

        let start_exec = now_millis();
        let output = match self.workload.run(&request).await {
            Ok(output) => output,
            Err(e) => {
                warn!(rate = request.rate, "{e}");
                return e.to_string();
            }
        };
        let end_exec = now_millis();

        let result = WorkloadResult::compute(&request, start_exec, end_exec, output.mem_size);
        let line = result.line(self.format);
        info!(
            rate = result.rate,
            response_time = result.response_time,
            latency = result.latency,
            "workload finished"
        );

        if let Some(reporter) = &self.reporter {
            if let Err(e) = reporter.deliver(&line, &request).await {
                warn!("{e}");
                return format!("{line} {e}");
            }
        }
        line
    }
}

fn with_bench<W: Workload>(bench: Arc<Bench<W>>) -> impl Filter<Extract = (Arc<Bench<W>>,), Error = Infallible> + Clone {
    warp::any().map(move || bench.clone())
}

async fn handle_request<W: Workload>(headers: HeaderMap, bench: Arc<Bench<W>>) -> Result<impl Reply, Rejection> {
    Ok(bench.handle(&headers).await)
}

/// `GET /`, the only route a benchmark service exposes.
pub fn routes<W: Workload>(bench: Arc<Bench<W>>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .and(warp::header::headers_cloned())
        .and(with_bench(bench))
        .and_then(handle_request)
        .with(warp::trace::request())
}

/// Serves `bench` on `addr` until the process is stopped.
pub async fn serve<W: Workload>(bench: Bench<W>, addr: SocketAddr) {
    info!("benchmark service listening on http://{}", addr);
    warp::serve(routes(Arc::new(bench))).run(addr).await;
}
