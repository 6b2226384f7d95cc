//! Attempt outcome taxonomy and per-attempt records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal state of a single attempt
///
/// The set is closed: every attempt ends in exactly one of these and never
/// transitions afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttemptStatus {
    /// Response matched the reference (or became the reference)
    Success,
    /// No response within the request timeout
    Timeout,
    /// Connection refused, reset or aborted
    ConnectionError,
    /// Response length differs from the reference
    ContentError,
    /// Same length as the reference but at least one byte differs
    CharacterMismatch,
    /// Transport answered with a non-success code
    UnexpectedResponse,
    /// Transport answered with a success code and no body
    EmptyResponse,
    /// Pre-flight port probe failed; the request was skipped
    PortClosed,
    /// UDP echo carried a different (or no) sequence number
    WrongSequence,
    /// Anything else
    Error,
}

impl AttemptStatus {
    /// Every status, in reporting order
    pub const ALL: [AttemptStatus; 10] = [
        AttemptStatus::Success,
        AttemptStatus::Timeout,
        AttemptStatus::ConnectionError,
        AttemptStatus::ContentError,
        AttemptStatus::CharacterMismatch,
        AttemptStatus::UnexpectedResponse,
        AttemptStatus::EmptyResponse,
        AttemptStatus::PortClosed,
        AttemptStatus::WrongSequence,
        AttemptStatus::Error,
    ];

    /// Label used in console lines and result rows
    pub fn label(&self) -> &'static str {
        match self {
            AttemptStatus::Success => "Success",
            AttemptStatus::Timeout => "Timeout",
            AttemptStatus::ConnectionError => "Connection Error",
            AttemptStatus::ContentError => "Content Error",
            AttemptStatus::CharacterMismatch => "Character Mismatch",
            AttemptStatus::UnexpectedResponse => "Unexpected Response",
            AttemptStatus::EmptyResponse => "Empty Response",
            AttemptStatus::PortClosed => "Port Closed",
            AttemptStatus::WrongSequence => "Wrong Sequence",
            AttemptStatus::Error => "Error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptStatus::Success)
    }

    /// Whether the attempt got any bytes back from the peer
    pub fn received_response(&self) -> bool {
        matches!(
            self,
            AttemptStatus::Success
                | AttemptStatus::ContentError
                | AttemptStatus::CharacterMismatch
                | AttemptStatus::UnexpectedResponse
                | AttemptStatus::EmptyResponse
                | AttemptStatus::WrongSequence
        )
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row per attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based position in dispatch order
    pub attempt_number: u32,

    /// Wall-clock time the attempt was dispatched
    pub timestamp: DateTime<Utc>,

    /// Terminal state
    pub status: AttemptStatus,

    /// Round-trip time, absent when nothing came back
    pub elapsed_ms: Option<f64>,

    /// Diagnostic text (error message, byte counts, mismatch positions)
    pub detail: String,

    /// Transport-level retries consumed before the terminal state
    pub retry_count: u32,
}

impl AttemptRecord {
    /// Column order for downstream writers
    pub const COLUMNS: [&'static str; 6] = [
        "Attempt",
        "Timestamp",
        "Status",
        "Response Time (ms)",
        "Detail",
        "Retries",
    ];

    pub fn new(
        attempt_number: u32,
        timestamp: DateTime<Utc>,
        status: AttemptStatus,
        elapsed_ms: Option<f64>,
        detail: impl Into<String>,
        retry_count: u32,
    ) -> Self {
        Self {
            attempt_number,
            timestamp,
            status,
            elapsed_ms,
            detail: detail.into(),
            retry_count,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Field values in `COLUMNS` order
    pub fn row(&self) -> Vec<String> {
        vec![
            self.attempt_number.to_string(),
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            self.status.label().to_string(),
            self.elapsed_ms.map(|ms| format!("{:.2}", ms)).unwrap_or_default(),
            self.detail.clone(),
            self.retry_count.to_string(),
        ]
    }
}
