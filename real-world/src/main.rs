mod workload;

use std::path::PathBuf;

use bench_core::config::RateSourceKind;
use bench_core::sampling::Cdf;
use bench_core::{Bench, CommonArgs, LineFormat};
use clap::Parser;
use tracing::info;

use crate::workload::{MemoryAllocator, RealWorldWorkload};

/// Real-world emulation: memory footprint and execution time drawn from
/// production traces. `X-Rate` carries the target execution time in ms.
#[derive(Debug, Parser)]
#[command(name = "real-world-bench", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// CDF of memory footprints in MiB.
    #[arg(long, env = "MEM_CDF", default_value = "CDFs/memCDF.csv")]
    mem_cdf: PathBuf,

    /// CDF of execution times in ms, used with `--rate-source cdf`.
    #[arg(long, env = "EXEC_CDF", default_value = "CDFs/execTimeCDF.csv")]
    exec_cdf: PathBuf,

    /// Subtracted from every memory sample to account for the runtime's own
    /// baseline footprint.
    #[arg(long, env = "MEM_BIAS", default_value_t = 30.0)]
    mem_bias: f64,

    /// Helper binary that performs the allocation, one process per request.
    #[arg(long, env = "MEM_HELPER", default_value = "./mem-alloc")]
    mem_helper: PathBuf,

    /// Allocate inside the server process instead of spawning the helper.
    #[arg(long, env = "MEM_IN_PROCESS")]
    mem_in_process: bool,
}

impl Cli {
    fn allocator(&self) -> MemoryAllocator {
        if self.mem_in_process {
            MemoryAllocator::InProcess
        } else {
            MemoryAllocator::Helper(self.mem_helper.clone())
        }
    }

    fn workload(&mut self) -> anyhow::Result<RealWorldWorkload> {
        let workload = RealWorldWorkload::new(Cdf::from_path(&self.mem_cdf)?, self.mem_bias, self.allocator());

        if self.common.rate_source != RateSourceKind::Cdf {
            return Ok(workload);
        }
        // The workload draws its own execution time. Timing headers still apply.
        self.common.rate_source = RateSourceKind::Header;
        Ok(workload.with_exec_cdf(Cdf::from_path(&self.exec_cdf)?))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bench_core::telemetry::init();
    let mut cli = Cli::parse();
    let workload = cli.workload()?;
    let allocator = cli.allocator();
    let config = cli.common.into_config()?;

    info!(mem_cdf = %cli.mem_cdf.display(), allocator = ?allocator, "Starting the real-world benchmark service...");
    let bench = Bench::new(workload, &config, LineFormat::Sequence)
        .require_seq_start(true)
        .allow_zero_rate(true);
    bench_core::server::serve(bench, config.listen).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    fn cdf_file(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file
    }

    fn cli(mem: &tempfile::NamedTempFile, exec: &tempfile::NamedTempFile, extra: &[&str]) -> Cli {
        let mut args = vec![
            "real-world-bench".to_owned(),
            "--mem-cdf".to_owned(),
            mem.path().display().to_string(),
            "--exec-cdf".to_owned(),
            exec.path().display().to_string(),
            "--mem-in-process".to_owned(),
        ];
        args.extend(extra.iter().map(|a| a.to_string()));
        Cli::parse_from(args)
    }

    fn routes(mut cli: Cli) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let workload = cli.workload().unwrap();
        let config = cli.common.into_config().unwrap();
        let bench = Bench::new(workload, &config, LineFormat::Sequence)
            .require_seq_start(true)
            .allow_zero_rate(true);
        bench_core::server::routes(Arc::new(bench))
    }

    #[tokio::test]
    async fn sequence_line_for_last_action() {
        let mem = cdf_file(&["size,fx", "94,1.0"]);
        let exec = cdf_file(&["10,1.0"]);
        let response = warp::test::request()
            .path("/")
            .header("X-Request-Timestamp", "1000")
            .header("X-Arrive-Timestamp", "1010")
            .header("X-Seq-Start-Time", "900")
            .header("X-Rate", "5")
            .header("X-Last-Rate", "")
            .reply(&routes(cli(&mem, &exec, &[])))
            .await;

        let body = std::str::from_utf8(response.body()).unwrap();
        let fields: Vec<&str> = body.split_whitespace().collect();
        assert_eq!(fields.len(), 5);
        assert!(fields[0].parse::<f64>().unwrap() > 0.0);
        assert_eq!(fields[2], "64");
        assert_eq!(fields[4], "0");
    }

    #[tokio::test]
    async fn not_last_action_has_zero_sequence_latency() {
        let mem = cdf_file(&["40,1.0"]);
        let exec = cdf_file(&["10,1.0"]);
        let response = warp::test::request()
            .path("/")
            .header("X-Request-Timestamp", "1000")
            .header("X-Arrive-Timestamp", "1010")
            .header("X-Seq-Start-Time", "0")
            .header("X-Rate", "1")
            .header("X-Last-Rate", "1")
            .reply(&routes(cli(&mem, &exec, &[])))
            .await;

        let body = std::str::from_utf8(response.body()).unwrap();
        let fields: Vec<&str> = body.split_whitespace().collect();
        assert_eq!((fields[0], fields[2], fields[4]), ("0", "10", "1"));
    }

    #[tokio::test]
    async fn seq_start_is_required() {
        let mem = cdf_file(&["40,1.0"]);
        let exec = cdf_file(&["10,1.0"]);
        let response = warp::test::request()
            .path("/")
            .header("X-Request-Timestamp", "1000")
            .header("X-Arrive-Timestamp", "1010")
            .header("X-Rate", "1")
            .reply(&routes(cli(&mem, &exec, &[])))
            .await;
        assert_eq!(response.body(), "lack headers");
    }

    #[tokio::test]
    async fn cdf_rate_source_needs_no_headers() {
        let mem = cdf_file(&["40,1.0"]);
        let exec = cdf_file(&["3,1.0"]);
        let response = warp::test::request()
            .path("/")
            .reply(&routes(cli(&mem, &exec, &["--rate-source", "cdf"])))
            .await;

        let body = std::str::from_utf8(response.body()).unwrap();
        let fields: Vec<&str> = body.split_whitespace().collect();
        assert_eq!(fields.len(), 5);
        assert_eq!((fields[0], fields[2]), ("0", "10"));
    }

    #[tokio::test]
    async fn cdf_rate_source_keeps_caller_headers() {
        let mem = cdf_file(&["40,1.0"]);
        let exec = cdf_file(&["3,1.0"]);
        let response = warp::test::request()
            .path("/")
            .header("X-Arrive-Timestamp", "1010")
            .header("X-Seq-Start-Time", "900")
            .header("X-Last-Rate", "7")
            .reply(&routes(cli(&mem, &exec, &["--rate-source", "cdf"])))
            .await;

        let body = std::str::from_utf8(response.body()).unwrap();
        let fields: Vec<&str> = body.split_whitespace().collect();
        assert_eq!(fields.len(), 5);
        let seq_latency: f64 = fields[0].parse().unwrap();
        let response_time: f64 = fields[1].parse().unwrap();
        let latency: f64 = fields[3].parse().unwrap();
        assert!(seq_latency > 1.0e9);
        assert!(response_time > 1.0e9);
        assert!((seq_latency - latency - 110.0).abs() < 0.01);
        assert_eq!((fields[2], fields[4]), ("10", "7"));
    }

    #[tokio::test]
    async fn zero_rate_is_an_empty_budget() {
        let mem = cdf_file(&["40,1.0"]);
        let exec = cdf_file(&["10,1.0"]);
        let response = warp::test::request()
            .path("/")
            .header("X-Request-Timestamp", "1000")
            .header("X-Arrive-Timestamp", "1010")
            .header("X-Seq-Start-Time", "0")
            .header("X-Rate", "0")
            .reply(&routes(cli(&mem, &exec, &[])))
            .await;

        let body = std::str::from_utf8(response.body()).unwrap();
        let fields: Vec<&str> = body.split_whitespace().collect();
        assert_eq!(fields.len(), 5);
        assert_eq!((fields[0], fields[2], fields[4]), ("0", "10", "0"));
    }

    #[test]
    fn allocates_through_the_helper_by_default() {
        let cli = Cli::parse_from(["real-world-bench"]);
        assert_eq!(cli.allocator(), MemoryAllocator::Helper(PathBuf::from("./mem-alloc")));

        let cli = Cli::parse_from(["real-world-bench", "--mem-helper", "/opt/bench/mem-alloc"]);
        assert_eq!(cli.allocator(), MemoryAllocator::Helper(PathBuf::from("/opt/bench/mem-alloc")));

        let cli = Cli::parse_from(["real-world-bench", "--mem-in-process"]);
        assert_eq!(cli.allocator(), MemoryAllocator::InProcess);
    }

    #[test]
    fn missing_mem_cdf_is_fatal() {
        let exec = cdf_file(&["10,1.0"]);
        let mut cli = Cli::parse_from([
            "real-world-bench",
            "--mem-cdf",
            "/no/such/memCDF.csv",
            "--exec-cdf",
            exec.path().to_str().unwrap(),
        ]);
        assert!(cli.workload().is_err());
    }
}
