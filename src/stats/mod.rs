//! Run statistics: loss, latency distribution and completion ordering

pub mod accumulator;
pub mod ordering;

pub use accumulator::RunAccumulator;
pub use ordering::OrderingMetrics;

use crate::models::{AttemptRecord, AttemptStatus};
use crate::types::{ConcurrencyMode, ProtocolMode};
use accumulator::round2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity of a run, carried into its summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub target: String,
    pub protocol_mode: ProtocolMode,
    pub concurrency_mode: ConcurrencyMode,
    pub connection_type: String,
}

/// Latency distribution over successful attempts, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub std_dev_ms: f64,
}

impl LatencyStats {
    /// `None` when there are no samples
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;

        Some(Self {
            mean_ms: round2(mean),
            median_ms: round2(percentile(&sorted, 50.0)),
            min_ms: round2(sorted[0]),
            max_ms: round2(sorted[sorted.len() - 1]),
            p95_ms: round2(percentile(&sorted, 95.0)),
            p99_ms: round2(percentile(&sorted, 99.0)),
            std_dev_ms: round2(standard_deviation(&sorted, mean)),
        })
    }
}

/// Linear-interpolated percentile of an ascending slice
pub fn percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let index = (percentile / 100.0) * (sorted_values.len() as f64 - 1.0);
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index {
        sorted_values[lower_index]
    } else {
        let lower_value = sorted_values[lower_index];
        let upper_value = sorted_values[upper_index];
        let weight = index - lower_index as f64;
        lower_value + weight * (upper_value - lower_value)
    }
}

/// Sample standard deviation
fn standard_deviation(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }

    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;

    variance.sqrt()
}

/// Summary of one run, derived once from the full record sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub target: String,
    pub protocol_mode: ProtocolMode,
    pub concurrency_mode: ConcurrencyMode,
    pub connection_type: String,

    /// Attempts recorded
    pub num_tests: u32,
    pub success_count: u32,
    /// Every attempt that did not end in `Success`
    pub loss_count: u32,
    /// Rounded to two decimals
    pub loss_percentage: f64,
    pub status_counts: BTreeMap<AttemptStatus, u32>,

    /// `None` when nothing succeeded
    pub latency: Option<LatencyStats>,
    /// One entry per successful attempt, in arrival order
    pub response_times_ms: Vec<f64>,

    pub total_retries: u32,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,

    /// Async runs only
    pub ordering: Option<OrderingMetrics>,
}

impl SummaryStats {
    /// Fold a finished record sequence into a summary
    pub fn from_records(
        metadata: RunMetadata,
        records: &[AttemptRecord],
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let mut accumulator = RunAccumulator::with_capacity(start_time, records.len());
        for record in records {
            accumulator.push(record.clone());
        }
        accumulator.finish(metadata, end_time).1
    }

    /// Attempts that ended in `status`
    pub fn count(&self, status: AttemptStatus) -> u32 {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    pub fn success_rate(&self) -> f64 {
        if self.num_tests == 0 {
            0.0
        } else {
            round2(self.success_count as f64 / self.num_tests as f64 * 100.0)
        }
    }
}
