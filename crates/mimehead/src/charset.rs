//! Charset capability.
//!
//! Wraps `encoding_rs` with two additions mail needs: a real ISO-8859-1
//! (WHATWG maps that label to windows-1252) and US-ASCII. Also hosts the
//! charset detection seam used by the legacy subject heuristic.

use crate::error::{Error, Result};
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// A character set usable for header bytes and encoded-words.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset(Kind);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Latin1,
    Ascii,
    Utf8,
    Other(&'static Encoding),
}

const LATIN1_ALIASES: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso_8859-1",
    "iso_8859-1:1987",
    "8859-1",
    "latin1",
    "latin-1",
    "l1",
    "iso-ir-100",
    "cp819",
    "ibm819",
    "csisolatin1",
];

const ASCII_ALIASES: &[&str] = &[
    "us-ascii",
    "ascii",
    "us",
    "ansi_x3.4-1968",
    "ansi_x3.4-1986",
    "iso646-us",
    "iso_646.irv:1991",
    "iso-ir-6",
    "cp367",
    "ibm367",
    "csascii",
];

impl Charset {
    /// ISO-8859-1, mapping every byte to the code point of the same value.
    pub const ISO_8859_1: Self = Self(Kind::Latin1);
    /// US-ASCII.
    pub const US_ASCII: Self = Self(Kind::Ascii);
    /// UTF-8.
    pub const UTF_8: Self = Self(Kind::Utf8);

    /// Resolves a charset name or alias.
    ///
    /// Surrounding whitespace and quotes are ignored, as is case.
    #[must_use]
    pub fn for_name(label: &str) -> Option<Self> {
        let label = label.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        if label.is_empty() {
            return None;
        }
        let lower = label.to_ascii_lowercase();
        if LATIN1_ALIASES.contains(&lower.as_str()) {
            return Some(Self::ISO_8859_1);
        }
        if ASCII_ALIASES.contains(&lower.as_str()) {
            return Some(Self::US_ASCII);
        }
        if lower == "utf8" {
            return Some(Self::UTF_8);
        }
        Encoding::for_label_no_replacement(lower.as_bytes()).map(Self::from_encoding)
    }

    /// Wraps an `encoding_rs` encoding.
    #[must_use]
    pub fn from_encoding(encoding: &'static Encoding) -> Self {
        if encoding == encoding_rs::UTF_8 {
            Self::UTF_8
        } else {
            Self(Kind::Other(encoding))
        }
    }

    /// Returns the canonical name of the charset.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self.0 {
            Kind::Latin1 => "ISO-8859-1",
            Kind::Ascii => "US-ASCII",
            Kind::Utf8 => "UTF-8",
            Kind::Other(encoding) => encoding.name(),
        }
    }

    /// Returns true if every character of `value` has a representation here.
    #[must_use]
    pub fn can_encode(self, value: &str) -> bool {
        self.encode(value).is_some()
    }

    /// Picks the charset used to encode `value`.
    ///
    /// The requested charset wins when it can represent the whole string;
    /// otherwise UTF-8, which always can.
    #[must_use]
    pub fn best_for(value: &str, requested: Option<Self>) -> Self {
        requested
            .filter(|charset| charset.can_encode(value))
            .unwrap_or(Self::UTF_8)
    }

    /// Encodes `value`, or returns `None` if some character is unmappable.
    #[must_use]
    pub fn encode(self, value: &str) -> Option<Cow<'_, [u8]>> {
        match self.0 {
            Kind::Utf8 => Some(Cow::Borrowed(value.as_bytes())),
            Kind::Ascii => value.is_ascii().then_some(Cow::Borrowed(value.as_bytes())),
            Kind::Latin1 => {
                if value.is_ascii() {
                    return Some(Cow::Borrowed(value.as_bytes()));
                }
                value
                    .chars()
                    .map(|c| u8::try_from(c).ok())
                    .collect::<Option<Vec<u8>>>()
                    .map(Cow::Owned)
            }
            Kind::Other(encoding) => {
                // UTF-16 and friends have no encoder; encoding_rs hands back UTF-8
                let (bytes, used, had_errors) = encoding.encode(value);
                (used == encoding && !had_errors).then_some(bytes)
            }
        }
    }

    /// Encodes `value`, substituting `?` (or the encoder's own replacement)
    /// for unmappable characters.
    #[must_use]
    pub fn encode_lossy(self, value: &str) -> Cow<'_, [u8]> {
        if let Some(bytes) = self.encode(value) {
            return bytes;
        }
        match self.0 {
            Kind::Latin1 => Cow::Owned(
                value
                    .chars()
                    .map(|c| u8::try_from(c).unwrap_or(b'?'))
                    .collect(),
            ),
            Kind::Ascii => Cow::Owned(
                value
                    .chars()
                    .map(|c| u8::try_from(c).ok().filter(u8::is_ascii).unwrap_or(b'?'))
                    .collect(),
            ),
            Kind::Utf8 => Cow::Borrowed(value.as_bytes()),
            Kind::Other(encoding) => encoding.encode(value).0,
        }
    }

    /// Decodes bytes, replacing malformed sequences.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Cow<'_, str> {
        match self.0 {
            Kind::Latin1 => encoding_rs::mem::decode_latin1(bytes),
            Kind::Ascii if bytes.is_ascii() => String::from_utf8_lossy(bytes),
            // mislabelled 8-bit data is far more often windows-1252 than garbage
            Kind::Ascii => encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0,
            Kind::Utf8 => String::from_utf8_lossy(bytes),
            Kind::Other(encoding) => encoding.decode_without_bom_handling(bytes).0,
        }
    }

    /// Decodes bytes, returning `None` on any malformed sequence.
    #[must_use]
    pub fn decode_strict(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        match self.0 {
            Kind::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes)),
            Kind::Ascii => bytes.is_ascii().then(|| String::from_utf8_lossy(bytes)),
            Kind::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            Kind::Other(encoding) => {
                encoding.decode_without_bom_handling_and_without_replacement(bytes)
            }
        }
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::for_name(s).ok_or_else(|| Error::UnknownCharset(s.to_string()))
    }
}

/// One candidate produced by a [`CharsetDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharsetMatch {
    /// Guessed charset.
    pub charset: Charset,
    /// Confidence on a 0-100 scale.
    pub confidence: u8,
}

/// Guesses the charset of unlabelled bytes.
pub trait CharsetDetector: fmt::Debug + Send + Sync {
    /// Returns candidates ordered by descending confidence.
    fn detect(&self, bytes: &[u8]) -> Vec<CharsetMatch>;
}

/// Returns the first candidate whose confidence exceeds `min_confidence`.
///
/// Candidates are ordered, so the scan stops at the first one that is not
/// trusted.
pub fn trusted_match(
    detector: &dyn CharsetDetector,
    bytes: &[u8],
    min_confidence: u8,
) -> Option<Charset> {
    detector
        .detect(bytes)
        .into_iter()
        .take_while(|candidate| candidate.confidence > min_confidence)
        .map(|candidate| candidate.charset)
        .next()
}

/// Detector backed by `chardetng`.
///
/// `chardetng` yields a single guess; an unambiguous guess is reported with
/// confidence 100, a marginal one with 50. Pure ASCII carries no signal and
/// is reported as US-ASCII with confidence 0. `chardetng` never names
/// ISO-8859-1, so a windows-1252 guess without any byte in 0x80-0x9F is
/// reported as ISO-8859-1.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChardetngDetector;

impl CharsetDetector for ChardetngDetector {
    fn detect(&self, bytes: &[u8]) -> Vec<CharsetMatch> {
        if bytes.is_ascii() {
            return vec![CharsetMatch {
                charset: Charset::US_ASCII,
                confidence: 0,
            }];
        }
        let mut detector = chardetng::EncodingDetector::new();
        detector.feed(bytes, true);
        let (encoding, confident) = detector.guess_assess(None, true);
        let charset = if encoding == encoding_rs::WINDOWS_1252
            && !bytes.iter().any(|b| (0x80..=0x9F).contains(b))
        {
            Charset::ISO_8859_1
        } else {
            Charset::from_encoding(encoding)
        };
        vec![CharsetMatch {
            charset,
            confidence: if confident { 100 } else { 50 },
        }]
    }
}
