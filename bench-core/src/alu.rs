//! Arithmetic busy loop.
//!
//! One unit of `rate` is 25000 iterations cycling through add, subtract,
//! multiply and divide on two random operands. Nothing touches memory or
//! the network, so the cost is pure CPU.

use std::hint::black_box;
use std::time::{Duration, Instant};

use rand::Rng;

pub const ITERATIONS_PER_RATE: u64 = 25_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    /// The operation executed at iteration `i`.
    pub fn at(i: u64) -> Self {
        match i % 4 {
            0 => Op::Add,
            1 => Op::Sub,
            2 => Op::Mul,
            _ => Op::Div,
        }
    }

    pub fn apply(self, a: i64, b: i64) -> f64 {
        match self {
            Op::Add => (a + b) as f64,
            Op::Sub => (a - b) as f64,
            Op::Mul => (a * b) as f64,
            Op::Div => a as f64 / b as f64,
        }
    }
}

/// Summary of a finished loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AluOutcome {
    pub iterations: u64,
    pub last: f64,
}

pub fn iterations_for(rate: u64) -> u64 {
    rate.saturating_mul(ITERATIONS_PER_RATE)
}

/// Random operands in `10..=100`, the range the load profiles were tuned with.
pub fn operands() -> (i64, i64) {
    let mut rng = rand::thread_rng();
    (rng.gen_range(10..=100), rng.gen_range(10..=100))
}

/// Runs exactly `iterations` operations on `a` and `b`.
pub fn run(a: i64, b: i64, iterations: u64) -> AluOutcome {
    let mut last = 0.0;
    for i in 0..iterations {
        last = Op::at(i).apply(black_box(a), black_box(b));
    }
    AluOutcome {
        iterations,
        last: black_box(last),
    }
}

/// The workload sized by `rate`: `rate * 25000` iterations.
pub fn alu(rate: u64) -> AluOutcome {
    let (a, b) = operands();
    run(a, b, iterations_for(rate))
}

/// Keeps the loop running in rate-sized chunks until `budget` has elapsed.
pub fn alu_for(budget: Duration) -> AluOutcome {
    let (a, b) = operands();
    let started = Instant::now();
    let mut total = AluOutcome {
        iterations: 0,
        last: 0.0,
    };
    while started.elapsed() < budget {
        let chunk = run(a, b, ITERATIONS_PER_RATE);
        total.iterations += chunk.iterations;
        total.last = chunk.last;
    }
    total
}
