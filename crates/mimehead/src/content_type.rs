//! MIME content type handling.

use crate::charset::Charset;
use crate::compound::CompoundValue;
use crate::decode::unfold;
use crate::error::Result;
use crate::header::InternetHeader;
use crate::params::{MimeParams, ParamEncoding, is_token_char};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Content type assumed when a header is missing or unusable (RFC 2045
/// section 5.2).
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// A `Content-Type` value: lowercase `type/subtype` plus parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContentType {
    value: CompoundValue,
}

impl ContentType {
    /// Creates a content type from `type/subtype`; anything malformed
    /// becomes `text/plain`.
    #[must_use]
    pub fn new(base_type: &str) -> Self {
        Self {
            value: CompoundValue::new(normalize(base_type)),
        }
    }

    /// `text/plain; charset=utf-8`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text/plain").with_parameter("charset", "utf-8")
    }

    /// `multipart/mixed` with the given boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart/mixed").with_parameter("boundary", boundary)
    }

    /// Adds or replaces a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.value.params_mut().set(key, value);
        self
    }

    /// Parses a header value, falling back to `text/plain`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self::parse_with_default(value, DEFAULT_CONTENT_TYPE)
    }

    /// Parses a header value, falling back to `default` when the primary
    /// value is missing or malformed.
    ///
    /// Inside a `multipart/digest` the default is `message/rfc822`.
    #[must_use]
    pub fn parse_with_default(value: &str, default: &str) -> Self {
        let mut value = CompoundValue::parse(value);
        let primary = normalize_with(value.primary(), default);
        value.set_primary(primary);
        Self { value }
    }

    /// Parses the value of a `Content-Type` header.
    #[must_use]
    pub fn from_header(header: &InternetHeader, charset: Option<Charset>) -> Self {
        Self::parse(&unfold(&header.encoded_value(charset)))
    }

    /// `type/subtype`, lowercase.
    #[must_use]
    pub fn base_type(&self) -> &str {
        self.value.primary()
    }

    /// The part before the `/`.
    #[must_use]
    pub fn main_type(&self) -> &str {
        self.base_type()
            .split_once('/')
            .map_or(self.base_type(), |(main, _)| main)
    }

    /// The part after the `/`.
    #[must_use]
    pub fn sub_type(&self) -> &str {
        self.base_type()
            .split_once('/')
            .map_or("", |(_, sub)| sub)
    }

    /// Replaces `type/subtype`; malformed input becomes `text/plain`.
    pub fn set_base_type(&mut self, base_type: &str) {
        self.value.set_primary(normalize(base_type));
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.value.param("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.value.param("boundary")
    }

    /// Returns parameter `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.value.param(name)
    }

    /// The parameters.
    #[must_use]
    pub const fn params(&self) -> &MimeParams {
        self.value.params()
    }

    /// Mutable access to the parameters.
    pub const fn params_mut(&mut self) -> &mut MimeParams {
        self.value.params_mut()
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type() == "multipart"
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type() == "text"
    }

    /// Serializes the value, without line folding.
    #[must_use]
    pub fn to_header_value(&self, encoding: ParamEncoding) -> String {
        self.value.to_header_value(encoding)
    }

    /// Builds a `Content-Type` header.
    ///
    /// # Errors
    ///
    /// Propagates header construction errors.
    pub fn to_header(&self, encoding: ParamEncoding) -> Result<InternetHeader> {
        self.value.to_header("Content-Type", encoding)
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_TYPE)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

/// Normalizes a `Content-Type` primary value, defaulting to `text/plain`.
#[must_use]
pub fn normalize(primary: &str) -> String {
    normalize_with(primary, DEFAULT_CONTENT_TYPE)
}

fn normalize_with(primary: &str, default: &str) -> String {
    let lower = primary.trim().to_ascii_lowercase();
    let valid = lower.split_once('/').is_some_and(|(main, sub)| {
        let main = main.trim();
        let sub = sub.trim();
        !main.is_empty()
            && !sub.is_empty()
            && main.chars().all(is_token_char)
            && sub.chars().all(is_token_char)
    });
    if valid {
        return lower.chars().filter(|c| !c.is_whitespace()).collect();
    }
    if !lower.is_empty() {
        tracing::debug!(content_type = %lower, default, "malformed content type");
    }
    default.to_string()
}
