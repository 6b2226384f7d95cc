//! Test payloads and the UDP sequence header

const PATTERN: &[u8] = b"PLT-TEST-PAYLOAD 0123456789 ABCDEFGHIJKLMNOPQRSTUVWXYZ abcdefghijklmnopqrstuvwxyz !#$%&()*+,-./:;<=>?@[]^_{}~ ";

/// Deterministic printable payload of exactly `size` bytes
pub fn test_payload(size: usize) -> Vec<u8> {
    PATTERN.iter().copied().cycle().take(size).collect()
}

/// `SEQ:<n>|` prefix followed by the payload
pub fn encode_sequenced(sequence: u32, payload: &[u8]) -> Vec<u8> {
    let header = format!("SEQ:{}|", sequence);
    let mut datagram = Vec::with_capacity(header.len() + payload.len());
    datagram.extend_from_slice(header.as_bytes());
    datagram.extend_from_slice(payload);
    datagram
}

/// Split a datagram into its echoed sequence number and payload
///
/// Returns `(None, datagram)` when the datagram does not start with a
/// well-formed `SEQ:<n>|` header.
pub fn decode_sequenced(datagram: &[u8]) -> (Option<u32>, &[u8]) {
    let Some(rest) = datagram.strip_prefix(b"SEQ:") else {
        return (None, datagram);
    };

    let Some(bar) = rest.iter().position(|&b| b == b'|') else {
        return (None, datagram);
    };

    let sequence = std::str::from_utf8(&rest[..bar])
        .ok()
        .and_then(|digits| digits.parse::<u32>().ok());

    match sequence {
        Some(seq) => (Some(seq), &rest[bar + 1..]),
        None => (None, datagram),
    }
}
