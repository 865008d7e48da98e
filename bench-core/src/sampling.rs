//! Workload sizes picked by the service itself instead of the caller.

use std::path::Path;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::error::ConfigError;

/// Job sizes of the synthetic mix and how often each one shows up.
pub const JOB_SIZES: [u64; 5] = [1, 3, 25, 250, 7500];
pub const JOB_WEIGHTS: [f64; 5] = [0.05, 0.03, 0.17, 0.33, 0.37];

/// A discrete distribution over job sizes.
#[derive(Debug, Clone)]
pub struct WeightedTable {
    sizes: Vec<u64>,
    index: WeightedIndex<f64>,
}

impl WeightedTable {
    pub fn new(entries: impl IntoIterator<Item = (u64, f64)>) -> Result<Self, ConfigError> {
        let (sizes, weights): (Vec<u64>, Vec<f64>) = entries.into_iter().unzip();
        let index = WeightedIndex::new(&weights).map_err(|e| ConfigError::JobTable(e.to_string()))?;
        Ok(Self { sizes, index })
    }

    /// The default mix: mostly long jobs with a tail of tiny ones.
    pub fn job_mix() -> Result<Self, ConfigError> {
        Self::new(JOB_SIZES.into_iter().zip(JOB_WEIGHTS))
    }

    /// Every request gets the same size.
    pub fn fixed(size: u64) -> Result<Self, ConfigError> {
        Self::new([(size, 1.0)])
    }

    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        self.sizes[self.index.sample(rng)]
    }
}

/// Empirical cumulative distribution loaded from a `value,fx` CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct Cdf {
    points: Vec<(f64, f64)>,
}

impl Cdf {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::CdfRead {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parses the CSV body. A first row that is not numeric is taken as a
    /// header; blank lines are ignored anywhere.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut points = Vec::new();
        for (idx, row) in text.lines().enumerate() {
            let row = row.trim();
            if row.is_empty() {
                continue;
            }
            match parse_row(row) {
                Some(point) => points.push(point),
                None if idx == 0 => continue,
                None => {
                    return Err(ConfigError::CdfRow {
                        path: origin.to_owned(),
                        line: idx + 1,
                        row: row.to_owned(),
                    })
                }
            }
        }
        if points.is_empty() {
            return Err(ConfigError::CdfEmpty(origin.to_owned()));
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Inverse-transform lookup: the first value whose cumulative
    /// probability reaches `u`.
    pub fn value_at(&self, u: f64) -> f64 {
        self.points
            .iter()
            .find(|(_, fx)| u <= *fx)
            .or_else(|| self.points.last())
            .map(|(value, _)| *value)
            .unwrap_or_default()
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.value_at(rng.gen::<f64>())
    }
}

fn parse_row(row: &str) -> Option<(f64, f64)> {
    let mut cols = row.split(',').map(str::trim);
    let value = cols.next()?.parse().ok()?;
    let fx = cols.next()?.parse().ok()?;
    Some((value, fx))
}
