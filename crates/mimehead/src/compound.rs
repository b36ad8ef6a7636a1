//! Structured header values: a primary token followed by parameters.
//!
//! `Content-Type` and `Content-Disposition` are the usual suspects; any
//! header with the same shape can be handled through [`CompoundValue`].

use crate::charset::Charset;
use crate::config::HeaderConfig;
use crate::decode::unfold;
use crate::error::Result;
use crate::header::InternetHeader;
use crate::params::{MimeParams, ParamEncoding};
use crate::{content_disposition, content_type};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Canonicalizes the primary value of a structured header.
pub type Normalizer = fn(&str) -> String;

static NORMALIZERS: LazyLock<HashMap<&'static str, Normalizer>> = LazyLock::new(|| {
    HashMap::from([
        ("content-type", content_type::normalize as Normalizer),
        ("content-disposition", content_disposition::normalize as Normalizer),
    ])
});

/// Returns the primary-value normalizer for header `name`, if it has one.
#[must_use]
pub fn normalizer_for(name: &str) -> Option<Normalizer> {
    NORMALIZERS.get(name.to_ascii_lowercase().as_str()).copied()
}

/// A primary value plus an ordered parameter map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompoundValue {
    primary: String,
    params: MimeParams,
}

impl CompoundValue {
    /// Creates a value with no parameters.
    #[must_use]
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            params: MimeParams::new(),
        }
    }

    /// Parses an unfolded value as-is, without normalizing the primary.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let split = primary_end(value);
        Self {
            primary: strip_comments(&value[..split]).trim().to_string(),
            params: MimeParams::parse(&value[split..]),
        }
    }

    /// Parses a value of header `name`, normalizing the primary when the
    /// header has a normalizer.
    #[must_use]
    pub fn parse_for(name: &str, value: &str) -> Self {
        let mut parsed = Self::parse(value);
        if let Some(normalize) = normalizer_for(name) {
            parsed.primary = normalize(&parsed.primary);
        }
        parsed
    }

    /// Parses the value of `header`; raw 8-bit bytes are read as `charset`.
    #[must_use]
    pub fn from_header(header: &InternetHeader, charset: Option<Charset>) -> Self {
        Self::parse_for(header.name(), &unfold(&header.encoded_value(charset)))
    }

    /// The primary value.
    #[must_use]
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Replaces the primary value verbatim.
    pub fn set_primary(&mut self, primary: impl Into<String>) {
        self.primary = primary.into();
    }

    /// Returns parameter `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// The parameters.
    #[must_use]
    pub const fn params(&self) -> &MimeParams {
        &self.params
    }

    /// Mutable access to the parameters.
    pub const fn params_mut(&mut self) -> &mut MimeParams {
        &mut self.params
    }

    /// Serializes the value, without line folding.
    #[must_use]
    pub fn to_header_value(&self, encoding: ParamEncoding) -> String {
        let mut value = self.primary.clone();
        value.push_str(&self.params.to_header_string(encoding));
        value
    }

    /// Builds a header named `name` carrying this value.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid header name.
    pub fn to_header(&self, name: &str, encoding: ParamEncoding) -> Result<InternetHeader> {
        InternetHeader::new(name, &self.to_header_value(encoding))
    }

    /// Like [`CompoundValue::to_header`], using the configured parameter
    /// encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid header name.
    pub fn to_header_with(&self, name: &str, config: &HeaderConfig) -> Result<InternetHeader> {
        self.to_header(name, config.param_encoding)
    }
}

impl fmt::Display for CompoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value(ParamEncoding::default()))
    }
}

/// Offset of the first `;` outside quotes, or the end of `value`.
fn primary_end(value: &str) -> usize {
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => return i,
            _ => {}
        }
    }
    value.len()
}

/// Drops RFC 5322 comments, nested ones included.
fn strip_comments(value: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generic() {
        let value = CompoundValue::parse("Form-Data ; name=\"field\"");
        assert_eq!(value.primary(), "Form-Data");
        assert_eq!(value.param("name"), Some("field"));
    }

    #[test]
    fn test_quoted_semicolon_stays_in_primary() {
        let value = CompoundValue::parse("\"a;b\"; x=1");
        assert_eq!(value.primary(), "\"a;b\"");
        assert_eq!(value.param("x"), Some("1"));
    }

    #[test]
    fn test_comments_are_dropped() {
        let value = CompoundValue::parse("text/plain (plain (nested) text); charset=us-ascii");
        assert_eq!(value.primary(), "text/plain");
    }

    #[test]
    fn test_normalizer_dispatch() {
        assert!(normalizer_for("Content-Type").is_some());
        assert!(normalizer_for("CONTENT-DISPOSITION").is_some());
        assert!(normalizer_for("X-Custom").is_none());

        let value = CompoundValue::parse_for("content-disposition", "weird-value");
        assert_eq!(value.primary(), "attachment");
        let value = CompoundValue::parse_for("X-Custom", "weird-value");
        assert_eq!(value.primary(), "weird-value");
    }

    #[test]
    fn test_from_header_unfolds() {
        let header =
            InternetHeader::from_line(b"Content-Type: TEXT/HTML;\r\n\tcharset=\"utf-8\"\r\n");
        let value = CompoundValue::from_header(&header, None);
        assert_eq!(value.primary(), "text/html");
        assert_eq!(value.param("charset"), Some("utf-8"));
    }

    #[test]
    fn test_to_header() {
        let mut value = CompoundValue::new("attachment");
        value.params_mut().set("filename", "report.pdf");
        let header = value
            .to_header("Content-Disposition", ParamEncoding::Rfc2231)
            .unwrap();
        assert_eq!(
            header.raw_header(),
            b"Content-Disposition: attachment; filename=report.pdf\r\n"
        );
        assert_eq!(value.to_string(), "attachment; filename=report.pdf");
    }

    #[test]
    fn test_to_header_with_config() {
        let mut value = CompoundValue::new("attachment");
        value.params_mut().set("filename", "é.txt");

        let header = value
            .to_header_with("Content-Disposition", &HeaderConfig::default())
            .unwrap();
        assert_eq!(
            header.encoded_value(None),
            "attachment; filename*=utf-8''%C3%A9.txt"
        );

        let config = HeaderConfig::builder()
            .param_encoding(ParamEncoding::Rfc2047)
            .build();
        let header = value.to_header_with("Content-Disposition", &config).unwrap();
        assert!(header.encoded_value(None).starts_with("attachment; filename=\"=?utf-8?"));
        assert_eq!(
            CompoundValue::from_header(&header, None).param("filename"),
            Some("é.txt")
        );
    }
}
