//! General helper utilities.

use crate::errors::DecodeError;
use crate::signature::SignatureKind;

/// Hex-encode bytes with a `0x` prefix, lower-case.
pub fn encode_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex text, tolerating surrounding whitespace and an optional `0x`.
///
/// Odd-length or non-hex input is rejected rather than silently truncated.
pub fn decode_hex(source: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = source.trim();
    let hex_str = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    hex::decode(hex_str).map_err(|_| DecodeError::InvalidHex(truncate(hex_str, 40)))
}

/// Normalise a user-supplied selector or topic: lower-case, `0x` prefix,
/// and the exact width for its kind (4 bytes / 32 bytes).
pub fn normalize_signature(kind: SignatureKind, source: &str) -> Option<String> {
    let bytes = decode_hex(source).ok()?;
    if bytes.len() != kind.hash_len() {
        return None;
    }
    Some(encode_prefixed(&bytes))
}

/// Shorten long text for error messages.
pub fn truncate(text: &str, max: usize) -> String {
    if text.len() > max {
        let cut = text
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= max)
            .last()
            .unwrap_or(0);
        format!("{}...", &text[..cut])
    } else {
        text.to_string()
    }
}
