//! Mapping transport outcomes onto the attempt taxonomy

use super::reference::{compare_bytes, Capture, Comparison, ReferenceSlot};
use crate::{
    error::AppError,
    models::AttemptStatus,
    transport::{ResponseCode, TransportResponse},
};

const PREVIEW_CHARS: usize = 100;

/// Classify a received response, capturing it as the reference if first
pub fn classify_response(response: &TransportResponse, reference: &ReferenceSlot) -> (AttemptStatus, String) {
    let size = response.body.len();

    if !response.code.is_success() {
        return (
            AttemptStatus::UnexpectedResponse,
            format!("{} | {} bytes", response.code, size),
        );
    }

    if let ResponseCode::Datagram { expected, echoed } = response.code {
        if !response.code.sequence_matches() {
            let received = match echoed {
                Some(seq) => format!("SEQ:{}", seq),
                None => "no sequence header".to_string(),
            };
            return (
                AttemptStatus::WrongSequence,
                format!("Expected SEQ:{} | Received {} | {}", expected, received, preview(&response.body)),
            );
        }
    }

    if response.body.is_empty() {
        return (AttemptStatus::EmptyResponse, format!("{} | No data received", response.code));
    }

    let stored = match reference.capture(&response.body) {
        Capture::Captured => {
            return (
                AttemptStatus::Success,
                format!("{} | {} bytes | Reference captured", response.code, size),
            );
        }
        Capture::Existing(stored) => stored,
    };

    match compare_bytes(stored, &response.body, crate::defaults::MAX_REPORTED_MISMATCHES) {
        Comparison::Identical => (AttemptStatus::Success, format!("{} | {} bytes", response.code, size)),
        Comparison::LengthMismatch { expected, actual } => (
            AttemptStatus::ContentError,
            format!("Length mismatch: expected {} bytes, got {}", expected, actual),
        ),
        Comparison::ByteMismatch { positions, total } => {
            let listed: Vec<String> = positions.iter().map(ToString::to_string).collect();
            (
                AttemptStatus::CharacterMismatch,
                format!("{} byte(s) differ | {}", total, listed.join(", ")),
            )
        }
    }
}

/// Classify a transport failure; `elapsed_ms` is how long the attempt waited
pub fn classify_error(error: &AppError, elapsed_ms: f64) -> (AttemptStatus, String) {
    match error {
        AppError::Timeout(_) => (
            AttemptStatus::Timeout,
            format!("Timed out after {:.2} ms", elapsed_ms),
        ),
        AppError::Connection(message) => (
            AttemptStatus::ConnectionError,
            format!("{} after {:.2} ms", message, elapsed_ms),
        ),
        other => (AttemptStatus::Error, other.to_string()),
    }
}

fn preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() > PREVIEW_CHARS {
        let truncated: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", truncated)
    } else {
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, body: &[u8]) -> TransportResponse {
        TransportResponse::new(ResponseCode::Http(status), body.to_vec())
    }

    #[test]
    fn test_first_success_captures_reference() {
        let slot = ReferenceSlot::new();
        let (status, detail) = classify_response(&http(200, b"ABCD"), &slot);

        assert_eq!(status, AttemptStatus::Success);
        assert!(detail.contains("Reference captured"));
        assert_eq!(slot.get(), Some(&b"ABCD"[..]));
    }

    #[test]
    fn test_identical_body_is_success() {
        let slot = ReferenceSlot::new();
        slot.capture(b"ABCD");

        for _ in 0..3 {
            let (status, _) = classify_response(&http(200, b"ABCD"), &slot);
            assert_eq!(status, AttemptStatus::Success);
        }
    }

    #[test]
    fn test_character_mismatch_detail() {
        let slot = ReferenceSlot::new();
        slot.capture(b"ABCD");

        let (status, detail) = classify_response(&http(200, b"ABXD"), &slot);
        assert_eq!(status, AttemptStatus::CharacterMismatch);
        assert_eq!(detail, "1 byte(s) differ | Pos 2: C != X");
    }

    #[test]
    fn test_short_body_is_content_error() {
        let slot = ReferenceSlot::new();
        slot.capture(b"ABCD");

        let (status, detail) = classify_response(&http(200, b"ABC"), &slot);
        assert_eq!(status, AttemptStatus::ContentError);
        assert_eq!(detail, "Length mismatch: expected 4 bytes, got 3");
    }

    #[test]
    fn test_non_200_is_unexpected_and_not_captured() {
        let slot = ReferenceSlot::new();
        let (status, detail) = classify_response(&http(503, b"busy"), &slot);

        assert_eq!(status, AttemptStatus::UnexpectedResponse);
        assert_eq!(detail, "HTTP 503 | 4 bytes");
        assert!(!slot.is_set());
    }

    #[test]
    fn test_empty_body() {
        let slot = ReferenceSlot::new();
        let (status, _) = classify_response(&http(200, b""), &slot);

        assert_eq!(status, AttemptStatus::EmptyResponse);
        assert!(!slot.is_set());
    }

    #[test]
    fn test_wrong_sequence_precedes_comparison() {
        let slot = ReferenceSlot::new();
        let response = TransportResponse::new(
            ResponseCode::Datagram {
                expected: 5,
                echoed: Some(4),
            },
            b"payload".to_vec(),
        );

        let (status, detail) = classify_response(&response, &slot);
        assert_eq!(status, AttemptStatus::WrongSequence);
        assert!(detail.starts_with("Expected SEQ:5 | Received SEQ:4"));
        assert!(!slot.is_set());
    }

    #[test]
    fn test_error_classification() {
        let (status, detail) = classify_error(&AppError::timeout("deadline"), 2000.0);
        assert_eq!(status, AttemptStatus::Timeout);
        assert_eq!(detail, "Timed out after 2000.00 ms");

        let (status, detail) = classify_error(&AppError::connection("Connection refused"), 0.5);
        assert_eq!(status, AttemptStatus::ConnectionError);
        assert!(detail.starts_with("Connection refused"));

        let (status, detail) = classify_error(&AppError::parse("bad header"), 1.0);
        assert_eq!(status, AttemptStatus::Error);
        assert!(detail.contains("bad header"));
    }

    #[test]
    fn test_preview_truncates() {
        let long = vec![b'a'; 150];
        let text = preview(&long);
        assert_eq!(text.len(), PREVIEW_CHARS + 3);
        assert!(text.ends_with("..."));
    }
}
