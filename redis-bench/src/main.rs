mod store;
mod workload;

use bench_core::{Bench, CommonArgs, LineFormat, RateSource};
use clap::Parser;
use tracing::info;

use crate::store::RedisConnector;
use crate::workload::CacheWorkload;

/// Cache benchmark: a burst of SET/GET round trips against Redis per request.
#[derive(Debug, Parser)]
#[command(name = "redis-bench", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, env = "REDIS_HOST", default_value = "localhost")]
    redis_host: String,

    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    redis_port: u16,

    /// Password of the benchmark store.
    #[arg(long, env = "REDIS_PASSWORD", default_value = "pmT0bVLwFr", hide_env_values = true)]
    redis_password: String,

    /// Write/read pairs per unit of rate. Ten pairs take about a millisecond
    /// on the reference cluster.
    #[arg(long, env = "KEYS_PER_RATE", default_value_t = 10)]
    keys_per_rate: u64,
}

/// Sampled sizes predate the timing headers and still use the old line.
fn line_format(rate_source: &RateSource) -> LineFormat {
    match rate_source {
        RateSource::Header => LineFormat::Timing,
        RateSource::Weighted(_) => LineFormat::Span,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bench_core::telemetry::init();
    let cli = Cli::parse();
    let connector = RedisConnector::new(&cli.redis_host, cli.redis_port, Some(&cli.redis_password))?;
    let config = cli.common.into_config()?;

    info!(
        host = %cli.redis_host,
        port = cli.redis_port,
        keys_per_rate = cli.keys_per_rate,
        "Starting the Redis benchmark service..."
    );
    let format = line_format(&config.rate_source);
    let bench = Bench::new(CacheWorkload::new(connector, cli.keys_per_rate), &config, format);
    bench_core::server::serve(bench, config.listen).await;
    Ok(())
}
