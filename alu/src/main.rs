// src/main.rs
use async_trait::async_trait;
use bench_core::alu;
use bench_core::{Bench, BenchError, CommonArgs, LineFormat, WorkOutput, Workload, WorkloadRequest};
use clap::Parser;
use tracing::info;

/// Arithmetic benchmark: burns `rate * 25000` loop iterations per request.
#[derive(Debug, Parser)]
#[command(name = "alu-bench", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

// --- CPU-only workload ---
// Pods get a single core each, so the loop runs on one blocking thread
// instead of being split across workers.
struct AluWorkload;

async fn run_alu(rate: u64) -> Result<alu::AluOutcome, BenchError> {
    let outcome = tokio::task::spawn_blocking(move || alu::alu(rate))
        .await
        .map_err(anyhow::Error::from)?;
    Ok(outcome)
}

#[async_trait]
impl Workload for AluWorkload {
    async fn run(&self, request: &WorkloadRequest) -> Result<WorkOutput, BenchError> {
        let outcome = run_alu(request.rate).await?;
        info!(iterations = outcome.iterations, result = outcome.last, "alu loop done");
        Ok(WorkOutput::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bench_core::telemetry::init();
    let config = Cli::parse().common.into_config()?;

    info!("Starting the ALU benchmark service...");
    let bench = Bench::new(AluWorkload, &config, LineFormat::Timing);
    bench_core::server::serve(bench, config.listen).await;
    Ok(())
}
