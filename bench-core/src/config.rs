use std::net::{IpAddr, SocketAddr};

use clap::{Args, ValueEnum};
use url::Url;

use crate::error::ConfigError;
use crate::report;
use crate::sampling::WeightedTable;

/// Where the collector sits when only its node number is known.
const COLLECTOR_SUBNET: &str = "172.18.0";
const COLLECTOR_PORT: u16 = 30001;
const COLLECTOR_PATH: &str = "/store";

/// How the workload size of a request is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RateSourceKind {
    /// Read `X-Rate` from the request.
    Header,
    /// Draw from the weighted job table (or `--task-size`).
    Weighted,
    /// Draw from the execution-time CDF.
    Cdf,
}

impl RateSourceKind {
    pub fn name(self) -> &'static str {
        match self {
            RateSourceKind::Header => "header",
            RateSourceKind::Weighted => "weighted",
            RateSourceKind::Cdf => "cdf",
        }
    }
}

/// Options shared by every benchmark service.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Address the HTTP server binds to.
    #[arg(long, env = "BENCH_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// How the workload size is chosen.
    #[arg(long, env = "RATE_SOURCE", value_enum, default_value_t = RateSourceKind::Header)]
    pub rate_source: RateSourceKind,

    /// Fixed job size for the weighted source.
    #[arg(long, env = "TASK_SIZE")]
    pub task_size: Option<u64>,

    /// Full collector URL. Takes precedence over `--node-of-activator`.
    #[arg(long, env = "COLLECTOR_URL")]
    pub collector_url: Option<String>,

    /// Last octet of the collector node on the cluster subnet.
    #[arg(long, env = "NODE_OF_ACTIVATOR")]
    pub node_of_activator: Option<String>,

    /// Address reported in `X-PodIP`. Resolved from the outbound interface
    /// when absent.
    #[arg(long, env = "POD_IP")]
    pub pod_ip: Option<IpAddr>,

    /// Forward `X-Arrive-Timestamp` along with the result.
    #[arg(long, env = "FORWARD_ARRIVE_TIMESTAMP")]
    pub forward_arrive_timestamp: bool,
}

/// Rate sourcing resolved at start-up. The CDF variant lives in the
/// real-world service because only it carries an execution-time CDF.
#[derive(Debug, Clone)]
pub enum RateSource {
    Header,
    Weighted(WeightedTable),
}

/// Where and how results are delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    pub url: Url,
    pub pod_ip: IpAddr,
    pub forward_arrive_timestamp: bool,
}

/// Immutable configuration shared by all requests.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen: SocketAddr,
    pub rate_source: RateSource,
    /// `None` disables reporting altogether.
    pub collector: Option<CollectorConfig>,
}

impl CommonArgs {
    pub fn collector_url(&self) -> Result<Option<Url>, ConfigError> {
        if let Some(raw) = &self.collector_url {
            return Ok(Some(Url::parse(raw)?));
        }
        match &self.node_of_activator {
            Some(node) => {
                let raw = format!("http://{COLLECTOR_SUBNET}.{node}:{COLLECTOR_PORT}{COLLECTOR_PATH}");
                Ok(Some(Url::parse(&raw)?))
            }
            None => Ok(None),
        }
    }

    /// Resolves the shared options. `Cdf` is rejected here; services that
    /// support it intercept it before calling this.
    pub fn into_config(self) -> Result<ServiceConfig, ConfigError> {
        let rate_source = match self.rate_source {
            RateSourceKind::Header => RateSource::Header,
            RateSourceKind::Weighted => RateSource::Weighted(match self.task_size {
                Some(size) => WeightedTable::fixed(size)?,
                None => WeightedTable::job_mix()?,
            }),
            kind @ RateSourceKind::Cdf => return Err(ConfigError::UnsupportedRateSource(kind.name())),
        };

        let collector = self.collector_url()?.map(|url| CollectorConfig {
            pod_ip: self.pod_ip.unwrap_or_else(|| report::resolve_pod_ip(&url)),
            url,
            forward_arrive_timestamp: self.forward_arrive_timestamp,
        });

        Ok(ServiceConfig {
            listen: self.listen,
            rate_source,
            collector,
        })
    }
}
