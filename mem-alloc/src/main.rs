// src/main.rs
//
// Helper process for the real-world benchmark: grabs N MiB, touches every
// page, then exits. The caller times the whole process run.
use anyhow::{bail, Context, Result};
use bench_core::memory;
use std::time::Instant;
use tracing::info;

fn parse_mib(arg: Option<String>) -> Result<u64> {
    let Some(raw) = arg else {
        bail!("usage: mem-alloc <MiB>");
    };
    // Negative sizes come out of a biased CDF sample; they mean "nothing".
    match raw.trim().parse::<i64>() {
        Ok(mib) => Ok(mib.max(0) as u64),
        Err(e) => Err(e).with_context(|| format!("invalid size {raw:?}")),
    }
}

fn main() -> Result<()> {
    bench_core::telemetry::init();
    let mib = parse_mib(std::env::args().nth(1))?;

    let started = Instant::now();
    let bytes = memory::allocate_and_touch(mib);
    info!(mib, bytes, elapsed = ?started.elapsed(), "memory allocated and released");
    Ok(())
}
