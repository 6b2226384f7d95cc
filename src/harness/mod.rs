//! Reliability test harness
//!
//! Drives `num_tests` request attempts against one target, classifies every
//! attempt into an [`AttemptStatus`], and folds the results into a
//! [`RunReport`]. Attempt failures never abort a run; only setup problems
//! are returned as errors.

pub mod classify;
pub mod reference;

pub use classify::{classify_error, classify_response};
pub use reference::{compare_bytes, ByteDiff, Capture, Comparison, ReferenceSlot};

use crate::{
    error::{AppError, Result},
    logging::{AttemptLogger, ErrorEventLogger},
    models::{AttemptRecord, AttemptStatus, Config},
    stats::{RunAccumulator, RunMetadata, SummaryStats},
    transport::{PortProbe, TcpPortProbe, Transport, TransportFactory},
    types::{ConcurrencyMode, ProtocolMode},
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{sync::mpsc, task::JoinHandle};

/// Run parameters the harness needs from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessSettings {
    pub host: String,
    pub port: u16,
    pub num_tests: u32,
    pub timeout: Duration,
    pub dynamic_port_check: bool,
    pub port_check_timeout: Duration,
    pub concurrency_mode: ConcurrencyMode,
    pub connection_type: String,
}

impl From<&Config> for HarnessSettings {
    fn from(config: &Config) -> Self {
        Self {
            host: config.target_address.trim().to_string(),
            port: config.effective_port(),
            num_tests: config.num_tests,
            timeout: config.timeout(),
            dynamic_port_check: config.dynamic_port_check,
            port_check_timeout: config.port_check_timeout(),
            concurrency_mode: config.concurrency_mode,
            connection_type: config.connection_type.clone(),
        }
    }
}

/// Records and summary of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Arrival order; equals dispatch order in sync mode
    pub records: Vec<AttemptRecord>,
    pub stats: SummaryStats,
    /// Size of the reference body, when one was captured
    pub reference_bytes: Option<usize>,
}

impl RunReport {
    /// Records sorted by attempt number
    pub fn records_by_attempt(&self) -> Vec<AttemptRecord> {
        let mut records = self.records.clone();
        records.sort_by_key(|r| r.attempt_number);
        records
    }

    pub fn record(&self, attempt_number: u32) -> Option<&AttemptRecord> {
        self.records.iter().find(|r| r.attempt_number == attempt_number)
    }

    /// Attempt numbers in arrival order
    pub fn completion_order(&self) -> Vec<u32> {
        self.records.iter().map(|r| r.attempt_number).collect()
    }
}

/// Packet loss tester bound to one transport
///
/// Holds no per-run state, so one tester can run repeatedly; each run gets
/// its own reference slot and accumulator.
#[derive(Clone)]
pub struct PacketLossTester {
    settings: Arc<HarnessSettings>,
    transport: Arc<dyn Transport>,
    probe: Arc<dyn PortProbe>,
    attempt_logger: Option<Arc<AttemptLogger>>,
    error_logger: Option<Arc<ErrorEventLogger>>,
}

impl PacketLossTester {
    pub fn new(settings: HarnessSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            settings: Arc::new(settings),
            transport,
            probe: Arc::new(TcpPortProbe),
            attempt_logger: None,
            error_logger: None,
        }
    }

    /// Validate the configuration and build the matching transport
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let transport = TransportFactory::create(config)?;
        Ok(Self::new(HarnessSettings::from(config), transport))
    }

    pub fn with_probe(mut self, probe: Arc<dyn PortProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_attempt_logger(mut self, logger: Arc<AttemptLogger>) -> Self {
        self.attempt_logger = Some(logger);
        self
    }

    pub fn with_error_logger(mut self, logger: Arc<ErrorEventLogger>) -> Self {
        self.error_logger = Some(logger);
        self
    }

    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    pub fn protocol(&self) -> ProtocolMode {
        self.transport.protocol()
    }

    /// Run all attempts
    ///
    /// Sync mode awaits each attempt and then sleeps `delay`; async mode
    /// spawns every attempt up front (spaced by `delay`) and records them as
    /// they finish.
    pub async fn run(&self, delay: Duration) -> Result<RunReport> {
        self.check_settings()?;

        let reference = Arc::new(ReferenceSlot::new());
        let start_time = Utc::now();
        let accumulator = match self.settings.concurrency_mode {
            ConcurrencyMode::Sync => self.run_sequential(delay, &reference, start_time).await,
            ConcurrencyMode::Async => self.run_concurrent(delay, &reference, start_time).await,
        };

        let metadata = RunMetadata {
            target: self.transport.target(),
            protocol_mode: self.transport.protocol(),
            concurrency_mode: self.settings.concurrency_mode,
            connection_type: self.settings.connection_type.clone(),
        };
        let (records, stats) = accumulator.finish(metadata, Utc::now());

        Ok(RunReport {
            records,
            stats,
            reference_bytes: reference.get().map(<[u8]>::len),
        })
    }

    /// Drive one attempt to its terminal state
    pub async fn run_single_attempt(&self, attempt_number: u32, reference: &ReferenceSlot) -> AttemptRecord {
        let timestamp = Utc::now();
        let settings = &self.settings;

        if settings.dynamic_port_check
            && !self
                .probe
                .is_port_open(&settings.host, settings.port, settings.port_check_timeout)
                .await
        {
            return AttemptRecord::new(
                attempt_number,
                timestamp,
                AttemptStatus::PortClosed,
                None,
                format!(
                    "Port {} not reachable within {} ms",
                    settings.port,
                    settings.port_check_timeout.as_millis()
                ),
                0,
            );
        }

        let started = Instant::now();
        let outcome = self.transport.send_request(attempt_number, settings.timeout).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(response) => {
                let (status, detail) = classify_response(&response, reference);
                AttemptRecord::new(attempt_number, timestamp, status, Some(elapsed_ms), detail, response.retry_count)
            }
            Err(failure) => {
                let (status, detail) = classify_error(&failure.error, elapsed_ms);
                AttemptRecord::new(attempt_number, timestamp, status, None, detail, failure.retry_count)
            }
        }
    }

    fn check_settings(&self) -> Result<()> {
        if self.settings.num_tests == 0 {
            return Err(AppError::validation("A run needs at least one attempt"));
        }
        if self.settings.timeout.is_zero() {
            return Err(AppError::validation("Attempt timeout must be greater than zero"));
        }
        if self.settings.dynamic_port_check && self.settings.port_check_timeout.is_zero() {
            return Err(AppError::validation("Port check timeout must be greater than zero"));
        }
        Ok(())
    }

    async fn run_sequential(
        &self,
        delay: Duration,
        reference: &ReferenceSlot,
        start_time: DateTime<Utc>,
    ) -> RunAccumulator {
        let total = self.settings.num_tests;
        let mut accumulator = RunAccumulator::with_capacity(start_time, total as usize);

        for attempt_number in 1..=total {
            let record = self.run_single_attempt(attempt_number, reference).await;
            self.report(&record).await;
            accumulator.push(record);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        accumulator
    }

    async fn run_concurrent(
        &self,
        delay: Duration,
        reference: &Arc<ReferenceSlot>,
        start_time: DateTime<Utc>,
    ) -> RunAccumulator {
        let total = self.settings.num_tests;
        let mut accumulator = RunAccumulator::with_capacity(start_time, total as usize);
        let (tx, mut rx) = mpsc::unbounded_channel::<AttemptRecord>();
        let mut handles: Vec<(u32, DateTime<Utc>, JoinHandle<()>)> = Vec::with_capacity(total as usize);

        for attempt_number in 1..=total {
            let tester = self.clone();
            let reference = Arc::clone(reference);
            let tx = tx.clone();

            let dispatched = Utc::now();
            let handle = tokio::spawn(async move {
                let record = tester.run_single_attempt(attempt_number, &reference).await;
                let _ = tx.send(record);
            });
            handles.push((attempt_number, dispatched, handle));

            if attempt_number < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        drop(tx);

        // Channel order is completion order
        while let Some(record) = rx.recv().await {
            self.report(&record).await;
            accumulator.push(record);
        }

        // A task that died before sending still gets a record
        let outcomes = join_all(
            handles
                .into_iter()
                .map(|(attempt_number, dispatched, handle)| async move { (attempt_number, dispatched, handle.await) }),
        )
        .await;
        for (attempt_number, dispatched, outcome) in outcomes {
            if let Err(join_error) = outcome {
                if accumulator.contains(attempt_number) {
                    continue;
                }
                let detail = format!("Attempt task failed: {}", join_error);
                if let Some(logger) = &self.error_logger {
                    logger.log_lost_attempt(attempt_number, &detail).await;
                }
                let record = AttemptRecord::new(attempt_number, dispatched, AttemptStatus::Error, None, detail, 0);
                self.report(&record).await;
                accumulator.push(record);
            }
        }

        accumulator
    }

    async fn report(&self, record: &AttemptRecord) {
        if let Some(logger) = &self.attempt_logger {
            logger.log_attempt(record).await;
        }
    }
}
