//! `Content-Disposition` values (RFC 2183).

use crate::charset::Charset;
use crate::compound::CompoundValue;
use crate::decode::unfold;
use crate::error::Result;
use crate::header::InternetHeader;
use crate::params::{MimeParams, ParamEncoding};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The two dispositions mail clients act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DispositionType {
    /// Displayed as part of the message.
    Inline,
    /// Offered as a separate file.
    #[default]
    Attachment,
}

impl DispositionType {
    /// Lowercase wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }

    /// Reads a disposition token; anything but `inline` is an attachment.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        if token.trim().eq_ignore_ascii_case("inline") {
            Self::Inline
        } else {
            Self::Attachment
        }
    }
}

/// A `Content-Disposition` value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContentDisposition {
    value: CompoundValue,
}

impl ContentDisposition {
    /// Creates a disposition without parameters.
    #[must_use]
    pub fn new(disposition: DispositionType) -> Self {
        Self {
            value: CompoundValue::new(disposition.as_str()),
        }
    }

    /// Parses a header value; unknown or missing dispositions become
    /// `attachment`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut value = CompoundValue::parse(value);
        let primary = normalize(value.primary());
        value.set_primary(primary);
        Self { value }
    }

    /// Parses the value of a `Content-Disposition` header.
    #[must_use]
    pub fn from_header(header: &InternetHeader, charset: Option<Charset>) -> Self {
        Self::parse(&unfold(&header.encoded_value(charset)))
    }

    /// Adds or replaces a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.value.params_mut().set(key, value);
        self
    }

    /// The disposition.
    #[must_use]
    pub fn disposition(&self) -> DispositionType {
        DispositionType::from_token(self.value.primary())
    }

    /// Changes the disposition, keeping the parameters.
    pub fn set_disposition(&mut self, disposition: DispositionType) {
        self.value.set_primary(disposition.as_str());
    }

    /// Returns true for `inline`.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.disposition() == DispositionType::Inline
    }

    /// Returns true for `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.disposition() == DispositionType::Attachment
    }

    /// The decoded `filename` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.value.param("filename")
    }

    /// Sets the `filename` parameter.
    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.value.params_mut().set("filename", filename);
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

    /// Serializes the value, without line folding.
    #[must_use]
    pub fn to_header_value(&self, encoding: ParamEncoding) -> String {
        self.value.to_header_value(encoding)
    }

    /// Builds a `Content-Disposition` header.
    ///
    /// # Errors
    ///
    /// Propagates header construction errors.
    pub fn to_header(&self, encoding: ParamEncoding) -> Result<InternetHeader> {
        self.value.to_header("Content-Disposition", encoding)
    }
}

impl Default for ContentDisposition {
    fn default() -> Self {
        Self::new(DispositionType::Attachment)
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

/// Normalizes a `Content-Disposition` primary value to `inline` or
/// `attachment`.
#[must_use]
pub fn normalize(primary: &str) -> String {
    DispositionType::from_token(primary).as_str().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_weird_value_is_attachment() {
        let cd = ContentDisposition::parse("weird-value");
        assert!(cd.is_attachment());
        assert_eq!(cd.to_string(), "attachment");
        assert_eq!(ContentDisposition::parse("").disposition(), DispositionType::Attachment);
    }

    #[test]
    fn test_inline_any_case() {
        let cd = ContentDisposition::parse(" INLINE ; filename=logo.png");
        assert!(cd.is_inline());
        assert_eq!(cd.filename(), Some("logo.png"));
        assert_eq!(cd.to_string(), "inline; filename=logo.png");
    }

    #[test]
    fn test_rfc2231_filename() {
        let header = InternetHeader::from_line(
            b"Content-Disposition: attachment;\r\n filename*0*=utf-8''%E2%82%AC; filename*1=\" rates.xls\"\r\n",
        );
        let cd = ContentDisposition::from_header(&header, None);
        assert_eq!(cd.filename(), Some("€ rates.xls"));
    }

    #[test]
    fn test_extended_filename_beats_plain() {
        let cd = ContentDisposition::parse(
            "attachment; filename=\"resume.pdf\"; filename*=utf-8''r%C3%A9sum%C3%A9.pdf",
        );
        assert_eq!(cd.filename(), Some("résumé.pdf"));
        assert_eq!(cd.params().len(), 1);
    }

    #[test]
    fn test_encoded_word_filename() {
        let cd = ContentDisposition::parse("attachment; filename=\"=?iso-8859-1?Q?caf=E9.txt?=\"");
        assert_eq!(cd.filename(), Some("café.txt"));
    }

    #[test]
    fn test_build_and_serialize() {
        let mut cd = ContentDisposition::default();
        cd.set_filename("résumé.pdf");
        assert_eq!(
            cd.to_header_value(ParamEncoding::Rfc2231),
            "attachment; filename*=utf-8''r%C3%A9sum%C3%A9.pdf"
        );
        assert_eq!(
            cd.to_header_value(ParamEncoding::Rfc2047),
            "attachment; filename=\"=?utf-8?B?csOpc3Vtw6kucGRm?=\""
        );

        cd.set_disposition(DispositionType::Inline);
        let header = cd.to_header(ParamEncoding::Rfc2231).unwrap();
        assert_eq!(header.name(), "Content-Disposition");
        assert!(ContentDisposition::from_header(&header, None).is_inline());
    }
}
