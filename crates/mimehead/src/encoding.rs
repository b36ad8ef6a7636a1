//! Transfer encoding primitives.
//!
//! Base64 and Quoted-Printable at the byte level, plus the RFC 2047 "Q"
//! variant used inside encoded-words.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;

/// Decoder accepting missing padding and stray trailing bits, as found in
/// real-world encoded-words.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encodes data as Base64, unfolded.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// Whitespace is skipped and padding is optional.
///
/// # Errors
///
/// Returns an error if the input contains characters outside the alphabet.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT.decode(cleaned).map_err(Into::into)
}

/// Maximum line length for Quoted-Printable encoding.
const MAX_LINE_LENGTH: usize = 76;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Encodes bytes as Quoted-Printable (RFC 2045), inserting soft line breaks
/// so no encoded line exceeds 76 characters.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + data.len() / 8);
    let mut column = 0;
    for (i, &byte) in data.iter().enumerate() {
        // trailing whitespace must be escaped
        let literal =
            matches!(byte, b'!'..=b'<' | b'>'..=b'~') || (byte == b' ' && i + 1 < data.len());
        let width = if literal { 1 } else { 3 };
        if column + width > MAX_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            column = 0;
        }
        if literal {
            out.push(char::from(byte));
        } else {
            push_escape(&mut out, byte);
        }
        column += width;
    }
    out
}

fn push_escape(out: &mut String, byte: u8) {
    out.push('=');
    out.push(char::from(HEX[usize::from(byte >> 4)]));
    out.push(char::from(HEX[usize::from(byte & 0x0F)]));
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        i += 1;
        if byte != b'=' {
            result.push(byte);
            continue;
        }

        // Soft line break
        match data.get(i) {
            Some(b'\r') if data.get(i + 1) == Some(&b'\n') => {
                i += 2;
                continue;
            }
            Some(b'\n') => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let escaped = data
            .get(i..i + 2)
            .and_then(hex_pair)
            .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".to_string()))?;
        result.push(escaped);
        i += 2;
    }

    Ok(result)
}

/// Bytes that the RFC 2047 "Q" encoding must escape, indexed by ASCII value.
///
/// Everything outside `A-Z a-z 0-9 ! * + - /` and space is forced; bytes with
/// the high bit set are always escaped.
pub const Q_FORCE_ENCODE: [bool; 128] = {
    let mut table = [true; 128];
    let safe = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!*+-/ ";
    let mut i = 0;
    while i < safe.len() {
        table[safe[i] as usize] = false;
        i += 1;
    }
    table
};

/// Returns true if `byte` must be escaped in Q-encoded text.
#[must_use]
pub const fn q_must_escape(byte: u8) -> bool {
    byte >= 0x80 || Q_FORCE_ENCODE[byte as usize]
}

/// Encodes bytes with the RFC 2047 "Q" encoding: unfolded, forced bytes as
/// `=XX`, space as `_`.
#[must_use]
pub fn encode_q(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() * 3);
    for &byte in data {
        if byte == b' ' {
            result.push('_');
        } else if q_must_escape(byte) {
            push_escape(&mut result, byte);
        } else {
            result.push(char::from(byte));
        }
    }
    result
}

/// Decodes RFC 2047 "Q" text.
///
/// `_` becomes a space. Malformed `=` escapes are kept literally.
#[must_use]
pub fn decode_q(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'_' => result.push(b' '),
            b'=' => {
                let escaped = data.get(i + 1..i + 3).and_then(hex_pair);
                result.push(escaped.unwrap_or(b'='));
                if escaped.is_some() {
                    i += 2;
                }
            }
            other => result.push(other),
        }
        i += 1;
    }
    result
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let hi = char::from(*pair.first()?).to_digit(16)?;
    let lo = char::from(*pair.get(1)?).to_digit(16)?;
    u8::try_from((hi << 4) | lo).ok()
}
