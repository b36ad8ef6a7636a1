//! A single header field.
//!
//! An [`InternetHeader`] keeps the complete raw line (name, colon, value,
//! folding and trailing CRLF) so that an untouched header is written back
//! byte for byte. Decoded views are computed on demand.

use crate::charset::{self, Charset};
use crate::config::HeaderConfig;
use crate::decode::decode_value;
use crate::encoded_word;
use crate::error::{Error, Result};
use crate::escape::escape;
use crate::header_info::HeaderInfo;
use std::fmt;
use std::sync::LazyLock;

/// Configuration used by the entry points that take none.
pub static DEFAULT_CONFIG: LazyLock<HeaderConfig> = LazyLock::new(HeaderConfig::default);

/// Charset used to read raw header bytes when the caller names none.
pub const DEFAULT_CHARSET: Charset = Charset::ISO_8859_1;

/// One header field with its raw wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternetHeader {
    name: String,
    info: HeaderInfo,
    content: Vec<u8>,
    value_start: usize,
}

impl InternetHeader {
    /// Parses a raw header line, folding included.
    ///
    /// The line is split at the first `:`; a line without one becomes a
    /// header with an empty value. Nothing is rejected.
    #[must_use]
    pub fn from_line(line: &[u8]) -> Self {
        Self::from_line_with(line, &DEFAULT_CONFIG)
    }

    /// Like [`InternetHeader::from_line`] with explicit configuration.
    ///
    /// A `Subject` line carrying raw 8-bit bytes is run through the
    /// configured charset detector and, on a trusted match other than the
    /// default charset, rewritten as an encoded-word.
    #[must_use]
    pub fn from_line_with(line: &[u8], config: &HeaderConfig) -> Self {
        let colon = line.iter().position(|&b| b == b':');
        let name_end = colon.unwrap_or(line.len());
        let value_start = colon.map_or(line.len(), |colon| {
            line[colon + 1..]
                .iter()
                .position(|&b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
                .map_or(line.len(), |offset| colon + 1 + offset)
        });

        let name = DEFAULT_CHARSET.decode(&line[..name_end]).trim().to_string();
        let mut content = line.to_vec();
        terminate(&mut content);
        let value_start = value_start.min(content.len());

        let mut header = Self {
            info: HeaderInfo::of(&name),
            name,
            content,
            value_start,
        };
        if header.name.eq_ignore_ascii_case("subject") {
            header.detect_subject_charset(config);
        }
        header
    }

    /// Creates a header from a name and an already-encoded value.
    ///
    /// The value is stored verbatim as `{name}: {value}` followed by CRLF;
    /// known names take their canonical casing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeaderName`] for an empty name or one holding
    /// characters not allowed in a field name.
    pub fn new(name: &str, value: &str) -> Result<Self> {
        Self::from_raw(name, value.as_bytes())
    }

    /// Creates a header from a name and raw value bytes, copied verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeaderName`] if the name is not a valid field
    /// name.
    pub fn from_raw(name: &str, value: &[u8]) -> Result<Self> {
        validate_name(name)?;
        let info = HeaderInfo::of(name);
        let mut header = Self {
            name: info.name.unwrap_or(name).to_string(),
            info,
            content: Vec::new(),
            value_start: 0,
        };
        header.set_raw_value(value);
        Ok(header)
    }

    /// Creates a header whose value is escaped first: non-ASCII text becomes
    /// RFC 2047 encoded-words in `charset` (UTF-8 when `charset` cannot hold
    /// the value).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeaderName`] if the name is not a valid field
    /// name.
    pub fn with_charset(name: &str, value: &str, charset: Option<Charset>) -> Result<Self> {
        Self::new(name, &escape(value, charset, false))
    }

    /// Field name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Placement rules for this field.
    #[must_use]
    pub const fn info(&self) -> HeaderInfo {
        self.info
    }

    /// The complete raw line, ending in CRLF.
    #[must_use]
    pub fn raw_header(&self) -> &[u8] {
        &self.content
    }

    /// Raw value bytes without the trailing line break.
    #[must_use]
    pub fn raw_value(&self) -> &[u8] {
        let mut end = self.content.len();
        while end > self.value_start && matches!(self.content[end - 1], b'\r' | b'\n') {
            end -= 1;
        }
        &self.content[self.value_start..end]
    }

    /// The fully decoded value: unfolded, with encoded-words expanded.
    ///
    /// Raw bytes outside encoded-words are read as `charset`, ISO-8859-1 by
    /// default.
    #[must_use]
    pub fn value(&self, charset: Option<Charset>) -> String {
        decode_value(self.raw_value(), charset.unwrap_or(DEFAULT_CHARSET))
    }

    /// The value as stored, only converted to text: no unfolding, no
    /// encoded-word decoding.
    #[must_use]
    pub fn encoded_value(&self, charset: Option<Charset>) -> String {
        charset
            .unwrap_or(DEFAULT_CHARSET)
            .decode(self.raw_value())
            .into_owned()
    }

    /// Replaces the value with an already-encoded string.
    pub fn set_value(&mut self, value: &str) {
        self.set_raw_value(value.as_bytes());
    }

    /// Replaces the value with raw bytes, rebuilding the whole line.
    pub fn set_raw_value(&mut self, value: &[u8]) {
        let mut content = Vec::with_capacity(self.name.len() + value.len() + 4);
        content.extend_from_slice(self.name.as_bytes());
        content.extend_from_slice(b": ");
        content.extend_from_slice(value);
        content.extend_from_slice(b"\r\n");
        self.value_start = self.name.len() + 2;
        self.content = content;
    }

    fn detect_subject_charset(&mut self, config: &HeaderConfig) {
        let Some(detector) = config.subject_detector() else {
            return;
        };
        let raw = &self.content[self.value_start..];
        let nonprintable = raw
            .iter()
            .any(|&b| !(0x20..=0x7E).contains(&b) && !matches!(b, b'\t' | b'\r' | b'\n'));
        if !nonprintable {
            return;
        }

        let Some(detected) = charset::trusted_match(detector, raw, config.min_detect_confidence)
        else {
            return;
        };
        if detected == config.default_charset {
            return;
        }
        let text = detected.decode(raw);
        let encoded = encoded_word::encode_with(text.trim(), Some(detected), config.fatal_handler);
        tracing::debug!(charset = %detected, "re-encoded raw 8-bit subject");
        self.set_value(&encoded);
    }
}

impl fmt::Display for InternetHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded_value(None))
    }
}

/// Makes sure `content` ends in exactly one CRLF.
fn terminate(content: &mut Vec<u8>) {
    while matches!(content.last(), Some(b'\r' | b'\n')) {
        content.pop();
    }
    content.extend_from_slice(b"\r\n");
}

/// Field names are printable ASCII without `:` (RFC 5322 section 2.2).
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(|b| (0x21..=0x7E).contains(&b) && b != b':') {
        return Err(Error::InvalidHeaderName(name.to_string()));
    }
    Ok(())
}
