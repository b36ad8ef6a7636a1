//! Header parsing configuration.

use crate::charset::{ChardetngDetector, Charset, CharsetDetector};
use crate::encoded_word::{FatalHandler, halt};
use crate::params::ParamEncoding;
use std::sync::Arc;

/// Default cap on a single header line, folded continuations included.
pub const MAX_HEADER_LENGTH: usize = 65_536;

/// Header parsing and encoding configuration.
#[derive(Debug, Clone)]
pub struct HeaderConfig {
    /// Re-encode `Subject` lines carrying raw 8-bit bytes in a detected
    /// charset.
    pub handle_nonprintable_subject: bool,
    /// Detector matches must exceed this confidence (0-100).
    pub min_detect_confidence: u8,
    /// Charset raw subject bytes are assumed to be in; a detection result
    /// equal to it leaves the line untouched.
    pub default_charset: Charset,
    /// Longest header line kept when reading a message; the rest is dropped.
    pub max_header_length: usize,
    /// How non-ASCII parameter values are serialized.
    pub param_encoding: ParamEncoding,
    /// Charset detector; `None` disables detection.
    pub detector: Option<Arc<dyn CharsetDetector>>,
    /// Called when output can no longer be produced correctly.
    pub fatal_handler: FatalHandler,
}

impl HeaderConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> HeaderConfigBuilder {
        HeaderConfigBuilder::new()
    }

    /// Returns the detector, if subject detection is enabled.
    #[must_use]
    pub fn subject_detector(&self) -> Option<&dyn CharsetDetector> {
        if self.handle_nonprintable_subject {
            self.detector.as_deref()
        } else {
            None
        }
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        HeaderConfigBuilder::new().build()
    }
}

/// Builder for [`HeaderConfig`].
#[derive(Debug, Clone)]
pub struct HeaderConfigBuilder {
    handle_nonprintable_subject: bool,
    min_detect_confidence: u8,
    default_charset: Charset,
    max_header_length: usize,
    param_encoding: ParamEncoding,
    detector: Option<Arc<dyn CharsetDetector>>,
    fatal_handler: FatalHandler,
}

impl HeaderConfigBuilder {
    /// Creates a builder holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handle_nonprintable_subject: true,
            min_detect_confidence: 50,
            default_charset: Charset::ISO_8859_1,
            max_header_length: MAX_HEADER_LENGTH,
            param_encoding: ParamEncoding::Rfc2231,
            detector: Some(Arc::new(ChardetngDetector)),
            fatal_handler: halt,
        }
    }

    /// Enables or disables subject charset detection.
    #[must_use]
    pub const fn handle_nonprintable_subject(mut self, enabled: bool) -> Self {
        self.handle_nonprintable_subject = enabled;
        self
    }

    /// Sets the detection confidence threshold.
    #[must_use]
    pub const fn min_detect_confidence(mut self, confidence: u8) -> Self {
        self.min_detect_confidence = confidence;
        self
    }

    /// Sets the charset for raw bytes.
    #[must_use]
    pub const fn default_charset(mut self, charset: Charset) -> Self {
        self.default_charset = charset;
        self
    }

    /// Sets the header line length cap.
    #[must_use]
    pub const fn max_header_length(mut self, length: usize) -> Self {
        self.max_header_length = length;
        self
    }

    /// Sets the parameter encoding policy.
    #[must_use]
    pub const fn param_encoding(mut self, encoding: ParamEncoding) -> Self {
        self.param_encoding = encoding;
        self
    }

    /// Replaces the charset detector.
    #[must_use]
    pub fn detector(mut self, detector: Option<Arc<dyn CharsetDetector>>) -> Self {
        self.detector = detector;
        self
    }

    /// Sets the fatal handler.
    #[must_use]
    pub const fn fatal_handler(mut self, handler: FatalHandler) -> Self {
        self.fatal_handler = handler;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> HeaderConfig {
        HeaderConfig {
            handle_nonprintable_subject: self.handle_nonprintable_subject,
            min_detect_confidence: self.min_detect_confidence,
            default_charset: self.default_charset,
            max_header_length: self.max_header_length,
            param_encoding: self.param_encoding,
            detector: self.detector,
            fatal_handler: self.fatal_handler,
        }
    }
}

impl Default for HeaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
