//! Incremental fold of attempt records into run statistics

use super::{LatencyStats, OrderingMetrics, RunMetadata, SummaryStats};
use crate::models::{AttemptRecord, AttemptStatus};
use crate::types::ConcurrencyMode;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Records and counters for one run, in arrival order
#[derive(Debug, Clone)]
pub struct RunAccumulator {
    start_time: DateTime<Utc>,
    records: Vec<AttemptRecord>,
    status_counts: BTreeMap<AttemptStatus, u32>,
    response_times: Vec<f64>,
    total_retries: u32,
}

impl RunAccumulator {
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            records: Vec::new(),
            status_counts: BTreeMap::new(),
            response_times: Vec::new(),
            total_retries: 0,
        }
    }

    pub fn with_capacity(start_time: DateTime<Utc>, capacity: usize) -> Self {
        let mut accumulator = Self::new(start_time);
        accumulator.records.reserve(capacity);
        accumulator.response_times.reserve(capacity);
        accumulator
    }

    /// Append a finished attempt
    pub fn push(&mut self, record: AttemptRecord) {
        *self.status_counts.entry(record.status).or_insert(0) += 1;
        self.total_retries += record.retry_count;

        if record.is_success() {
            if let Some(ms) = record.elapsed_ms {
                self.response_times.push(ms);
            }
        }

        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `attempt_number` has already been recorded
    pub fn contains(&self, attempt_number: u32) -> bool {
        self.records.iter().any(|r| r.attempt_number == attempt_number)
    }

    pub fn success_count(&self) -> u32 {
        self.status_counts.get(&AttemptStatus::Success).copied().unwrap_or(0)
    }

    /// Attempt numbers in arrival order
    pub fn completion_order(&self) -> Vec<u32> {
        self.records.iter().map(|r| r.attempt_number).collect()
    }

    /// Close the run and derive its summary
    pub fn finish(self, metadata: RunMetadata, end_time: DateTime<Utc>) -> (Vec<AttemptRecord>, SummaryStats) {
        let total = self.records.len() as u32;
        let success_count = self.success_count();
        let loss_count = total - success_count;
        let loss_percentage = if total == 0 {
            0.0
        } else {
            round2(loss_count as f64 / total as f64 * 100.0)
        };

        let ordering = match metadata.concurrency_mode {
            ConcurrencyMode::Async => Some(OrderingMetrics::from_completion_order(&self.completion_order())),
            ConcurrencyMode::Sync => None,
        };

        let duration_seconds = (end_time - self.start_time)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        let stats = SummaryStats {
            target: metadata.target,
            protocol_mode: metadata.protocol_mode,
            concurrency_mode: metadata.concurrency_mode,
            connection_type: metadata.connection_type,
            num_tests: total,
            success_count,
            loss_count,
            loss_percentage,
            status_counts: self.status_counts,
            latency: LatencyStats::from_samples(&self.response_times),
            response_times_ms: self.response_times,
            total_retries: self.total_retries,
            start_time: self.start_time,
            end_time,
            duration_seconds,
            ordering,
        };

        (self.records, stats)
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProtocolMode;

    fn metadata(mode: ConcurrencyMode) -> RunMetadata {
        RunMetadata {
            target: "10.0.0.1:80".to_string(),
            protocol_mode: ProtocolMode::Http,
            concurrency_mode: mode,
            connection_type: "bench".to_string(),
        }
    }

    fn record(n: u32, status: AttemptStatus, elapsed: Option<f64>, retries: u32) -> AttemptRecord {
        AttemptRecord::new(n, Utc::now(), status, elapsed, "", retries)
    }

    #[test]
    fn test_counts_and_response_times() {
        let mut acc = RunAccumulator::new(Utc::now());
        acc.push(record(1, AttemptStatus::Success, Some(2.0), 0));
        acc.push(record(2, AttemptStatus::Timeout, None, 0));
        acc.push(record(3, AttemptStatus::Success, Some(4.0), 2));
        acc.push(record(4, AttemptStatus::ContentError, Some(3.0), 1));

        assert_eq!(acc.len(), 4);
        assert_eq!(acc.success_count(), 2);
        assert!(acc.contains(3));
        assert!(!acc.contains(5));

        let (records, stats) = acc.finish(metadata(ConcurrencyMode::Sync), Utc::now());
        assert_eq!(records.len(), 4);
        assert_eq!(stats.success_count, 2);
        assert_eq!(stats.loss_count, 2);
        assert_eq!(stats.loss_percentage, 50.0);
        assert_eq!(stats.response_times_ms, vec![2.0, 4.0]);
        assert_eq!(stats.total_retries, 3);
        assert_eq!(stats.count(AttemptStatus::ContentError), 1);
        assert!(stats.ordering.is_none());
    }

    #[test]
    fn test_async_run_gets_ordering_metrics() {
        let mut acc = RunAccumulator::new(Utc::now());
        for n in [3, 1, 2] {
            acc.push(record(n, AttemptStatus::Success, Some(1.0), 0));
        }

        let (_, stats) = acc.finish(metadata(ConcurrencyMode::Async), Utc::now());
        let ordering = stats.ordering.unwrap();
        assert_eq!(ordering.inversions, 2);
        assert_eq!(ordering.lis_disorder, 1);
    }

    #[test]
    fn test_empty_run() {
        let acc = RunAccumulator::new(Utc::now());
        assert!(acc.is_empty());

        let (_, stats) = acc.finish(metadata(ConcurrencyMode::Sync), Utc::now());
        assert_eq!(stats.loss_percentage, 0.0);
        assert!(stats.latency.is_none());
    }
}
