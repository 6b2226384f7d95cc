//! Write-once reference response and byte comparison

use std::sync::OnceLock;

/// First successful response body of a run
///
/// Capture is atomic: when several attempts race, exactly one body is
/// stored and it is never replaced.
#[derive(Debug, Default)]
pub struct ReferenceSlot {
    body: OnceLock<Vec<u8>>,
}

/// Result of offering a body to the slot
#[derive(Debug, PartialEq, Eq)]
pub enum Capture<'a> {
    /// This body became the reference
    Captured,
    /// A reference already existed
    Existing(&'a [u8]),
}

impl ReferenceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `body` unless a reference already exists
    pub fn capture(&self, body: &[u8]) -> Capture<'_> {
        let mut captured = false;
        let stored = self.body.get_or_init(|| {
            captured = true;
            body.to_vec()
        });

        if captured {
            Capture::Captured
        } else {
            Capture::Existing(stored)
        }
    }

    pub fn get(&self) -> Option<&[u8]> {
        self.body.get().map(Vec::as_slice)
    }

    pub fn is_set(&self) -> bool {
        self.body.get().is_some()
    }
}

/// Outcome of comparing a response against the reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Identical,
    /// Lengths differ; bytes were not compared
    LengthMismatch { expected: usize, actual: usize },
    /// Same length; `positions` holds the first few differing offsets
    ByteMismatch {
        positions: Vec<ByteDiff>,
        total: usize,
    },
}

/// One differing byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteDiff {
    pub position: usize,
    pub expected: u8,
    pub actual: u8,
}

impl ByteDiff {
    fn render_byte(byte: u8) -> String {
        if byte.is_ascii_graphic() || byte == b' ' {
            (byte as char).to_string()
        } else {
            format!("0x{:02X}", byte)
        }
    }
}

impl std::fmt::Display for ByteDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pos {}: {} != {}",
            self.position,
            Self::render_byte(self.expected),
            Self::render_byte(self.actual)
        )
    }
}

/// Compare `actual` against `reference`, listing at most `max_reported` differences
pub fn compare_bytes(reference: &[u8], actual: &[u8], max_reported: usize) -> Comparison {
    if reference.len() != actual.len() {
        return Comparison::LengthMismatch {
            expected: reference.len(),
            actual: actual.len(),
        };
    }

    let mut positions = Vec::new();
    let mut total = 0;

    for (position, (&expected, &got)) in reference.iter().zip(actual).enumerate() {
        if expected != got {
            total += 1;
            if positions.len() < max_reported {
                positions.push(ByteDiff {
                    position,
                    expected,
                    actual: got,
                });
            }
        }
    }

    if total == 0 {
        Comparison::Identical
    } else {
        Comparison::ByteMismatch { positions, total }
    }
}
