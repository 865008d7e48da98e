use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use async_trait::async_trait;
use bench_core::alu;
use bench_core::memory;
use bench_core::sampling::Cdf;
use bench_core::{BenchError, WorkOutput, Workload, WorkloadRequest};
use tokio::process::Command;
use tracing::debug;

/// How the sampled memory footprint is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryAllocator {
    /// Run an external helper with the size in MiB as its only argument.
    Helper(PathBuf),
    /// Allocate on a blocking thread of this process.
    InProcess,
}

impl MemoryAllocator {
    pub async fn allocate(&self, mib: u64) -> anyhow::Result<()> {
        match self {
            MemoryAllocator::Helper(path) => {
                let status = Command::new(path)
                    .arg(mib.to_string())
                    .status()
                    .await
                    .with_context(|| format!("failed to run memory helper {}", path.display()))?;
                if !status.success() {
                    bail!("memory helper {} exited with {}", path.display(), status);
                }
            }
            MemoryAllocator::InProcess => {
                tokio::task::spawn_blocking(move || memory::allocate_and_touch(mib)).await?;
            }
        }
        Ok(())
    }
}

/// Emulates a production function: allocate a memory footprint drawn from
/// the trace, then compute for whatever is left of the target execution
/// time.
pub struct RealWorldWorkload {
    mem_cdf: Cdf,
    mem_bias: f64,
    allocator: MemoryAllocator,
    exec_cdf: Option<Cdf>,
}

impl RealWorldWorkload {
    pub fn new(mem_cdf: Cdf, mem_bias: f64, allocator: MemoryAllocator) -> Self {
        Self {
            mem_cdf,
            mem_bias,
            allocator,
            exec_cdf: None,
        }
    }

    /// Draw the target execution time from `exec_cdf` instead of `X-Rate`.
    pub fn with_exec_cdf(mut self, exec_cdf: Cdf) -> Self {
        self.exec_cdf = Some(exec_cdf);
        self
    }

    fn sample_mem_size(&self) -> i64 {
        (self.mem_cdf.sample(&mut rand::thread_rng()) - self.mem_bias).round() as i64
    }
}

/// Compute time left once the allocation has eaten into the target.
pub fn alu_budget(target: Duration, spent: Duration) -> Duration {
    target.saturating_sub(spent)
}

#[async_trait]
impl Workload for RealWorldWorkload {
    fn sample_rate(&self) -> Option<u64> {
        let exec_cdf = self.exec_cdf.as_ref()?;
        let millis = exec_cdf.sample(&mut rand::thread_rng()).round();
        Some(millis.max(1.0) as u64)
    }

    async fn run(&self, request: &WorkloadRequest) -> Result<WorkOutput, BenchError> {
        let mem_size = self.sample_mem_size();

        let mem_started = Instant::now();
        self.allocator.allocate(mem_size.max(0) as u64).await?;
        let mem_elapsed = mem_started.elapsed();

        let budget = alu_budget(Duration::from_millis(request.rate), mem_elapsed);
        debug!(mem_size, ?mem_elapsed, ?budget, "memory phase done");
        if !budget.is_zero() {
            tokio::task::spawn_blocking(move || alu::alu_for(budget))
                .await
                .map_err(anyhow::Error::from)?;
        }

        Ok(WorkOutput { mem_size })
    }
}
