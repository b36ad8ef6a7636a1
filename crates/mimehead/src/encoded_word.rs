//! RFC 2047 encoded-word codec.
//!
//! Format: `=?charset?encoding?encoded-text?=`

use crate::byte_builder::ByteBuilder;
use crate::charset::Charset;
use crate::encoding::{decode_base64, decode_q, encode_base64, encode_q, q_must_escape};

/// Called when the process can no longer guarantee correct output.
///
/// The only trigger is allocation failure while building an encoded-word.
/// Production code halts; tests may substitute a panicking handler.
pub type FatalHandler = fn(&str) -> !;

/// Default [`FatalHandler`]: logs and aborts the process.
pub fn halt(reason: &str) -> ! {
    tracing::error!(reason, "fatal error in header encoding, halting");
    std::process::abort()
}

/// Sub-encoding of an encoded-word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordEncoding {
    /// Quoted-Printable variant.
    Q,
    /// Base64.
    B,
}

impl WordEncoding {
    /// Parses the single-letter encoding tag, in either case.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'Q' | b'q' => Some(Self::Q),
            b'B' | b'b' => Some(Self::B),
            _ => None,
        }
    }

    /// Returns the upper-case tag.
    #[must_use]
    pub const fn tag(self) -> char {
        match self {
            Self::Q => 'Q',
            Self::B => 'B',
        }
    }

    /// Picks the encoding for `content`: Base64 once more than a third of the
    /// bytes would need escaping under Q.
    #[must_use]
    pub fn choose(content: &[u8]) -> Self {
        let forced = content.iter().filter(|&&b| q_must_escape(b)).count();
        if forced > content.len() / 3 {
            Self::B
        } else {
            Self::Q
        }
    }
}

/// Encodes `value` as a single unfolded encoded-word.
///
/// `requested` is used when it can represent the whole string, UTF-8
/// otherwise.
#[must_use]
pub fn encode(value: &str, requested: Option<Charset>) -> String {
    encode_with(value, requested, halt)
}

/// Like [`encode`], with an explicit fatal handler.
#[must_use]
pub fn encode_with(value: &str, requested: Option<Charset>, on_fatal: FatalHandler) -> String {
    let mut charset = Charset::best_for(value, requested);
    let content = charset.encode(value).unwrap_or_else(|| {
        tracing::warn!(charset = %charset, "charset cannot encode value, using ISO-8859-1");
        charset = Charset::ISO_8859_1;
        charset.encode_lossy(value)
    });

    let name = charset.name().to_ascii_lowercase();
    let encoding = WordEncoding::choose(&content);
    let text_capacity = match encoding {
        WordEncoding::Q => content.len() * 3,
        WordEncoding::B => content.len().div_ceil(3) * 4,
    };

    let mut word = String::new();
    if word.try_reserve(name.len() + text_capacity + 7).is_err() {
        on_fatal("out of memory while building an encoded-word");
    }
    word.push_str("=?");
    word.push_str(&name);
    word.push('?');
    word.push(encoding.tag());
    word.push('?');
    match encoding {
        WordEncoding::Q => word.push_str(&encode_q(&content)),
        WordEncoding::B => word.push_str(&encode_base64(&content)),
    }
    word.push_str("?=");
    word
}

/// Decodes one complete encoded-word to its bytes and charset.
///
/// Returns `None` for anything that is not exactly
/// `=?charset[*lang]?Q|B?text?=` with a known charset and decodable text;
/// callers then keep the word as literal text.
#[must_use]
pub fn decode(word: &[u8]) -> Option<ByteBuilder> {
    if word.len() < 9 || !word.starts_with(b"=?") || !word.ends_with(b"?=") {
        return None;
    }
    let inner = &word[2..word.len() - 2];

    let sep = inner.iter().position(|&b| b == b'?')?;
    let mut label = &inner[..sep];
    // RFC 2231 language suffix: charset*lang
    if let Some(star) = label.iter().position(|&b| b == b'*') {
        label = &label[..star];
    }

    let rest = &inner[sep + 1..];
    if rest.len() < 2 || rest[1] != b'?' {
        return None;
    }
    let encoding = WordEncoding::from_tag(rest[0])?;
    let text = &rest[2..];
    if text.contains(&b'?') {
        return None;
    }
    if text.is_empty() {
        return Some(ByteBuilder::with_capacity(0, Charset::UTF_8));
    }

    let Some(charset) = std::str::from_utf8(label).ok().and_then(Charset::for_name) else {
        tracing::debug!(label = %String::from_utf8_lossy(label), "unknown encoded-word charset");
        return None;
    };

    let bytes = match encoding {
        WordEncoding::B => decode_base64(text)
            .inspect_err(|e| tracing::debug!(error = %e, "bad base64 in encoded-word"))
            .ok()?,
        WordEncoding::Q => decode_q(text),
    };
    if bytes.is_empty() {
        return None;
    }
    Some(ByteBuilder::from_bytes(&bytes, charset))
}

/// Decodes one encoded-word straight to text.
#[must_use]
pub fn decode_to_string(word: &str) -> Option<String> {
    decode(word.as_bytes()).map(|bytes| bytes.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn panic_on_fatal(reason: &str) -> ! {
        panic!("{reason}")
    }

    #[test]
    fn test_encode_chooses_q_for_mostly_ascii() {
        let word = encode("Café au lait", Some(Charset::ISO_8859_1));
        assert_eq!(word, "=?iso-8859-1?Q?Caf=E9_au_lait?=");
    }

    #[test]
    fn test_encode_chooses_b_for_mostly_escaped() {
        let word = encode("日本語", Some(Charset::UTF_8));
        assert_eq!(word, "=?utf-8?B?5pel5pys6Kqe?=");
    }

    #[test]
    fn test_encode_falls_back_to_utf8() {
        let word = encode("Ωmega", Some(Charset::ISO_8859_1));
        assert!(word.starts_with("=?utf-8?"));
        assert_eq!(decode_to_string(&word).unwrap(), "Ωmega");
    }

    #[test]
    fn test_encode_with_custom_fatal_handler() {
        let word = encode_with("hello world", None, panic_on_fatal);
        assert_eq!(word, "=?utf-8?Q?hello_world?=");
    }

    #[test]
    fn test_decode_q_and_b() {
        assert_eq!(decode_to_string("=?iso-8859-1?Q?Caf=E9?=").unwrap(), "Café");
        assert_eq!(decode_to_string("=?UTF-8?b?SMOpbGxv?=").unwrap(), "Héllo");
        assert_eq!(decode_to_string("=?utf-8?q?a_b?=").unwrap(), "a b");
    }

    #[test]
    fn test_decode_language_suffix() {
        assert_eq!(decode_to_string("=?utf-8*en?Q?hi?=").unwrap(), "hi");
    }

    #[test]
    fn test_decode_charset_attached() {
        let decoded = decode(b"=?iso-8859-1?Q?Caf=E9?=").unwrap();
        assert_eq!(decoded.charset(), Charset::ISO_8859_1);
        assert_eq!(decoded.as_bytes(), b"Caf\xE9");
    }

    #[test]
    fn test_decode_empty_text() {
        let decoded = decode(b"=?iso-8859-1?Q??=").unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.charset(), Charset::UTF_8);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode(b"=?utf-8?Q?").is_none());
        assert!(decode(b"=?utf-8?X?abc?=").is_none());
        assert!(decode(b"=?utf-8?QQ?abc?=").is_none());
        assert!(decode(b"=?utf-8?Q?a?b?=").is_none());
        assert!(decode(b"=?no-such-charset?Q?abc?=").is_none());
        assert!(decode(b"=?utf-8?B?****?=").is_none());
        assert!(decode(b"plain text here").is_none());
    }

    proptest! {
        #[test]
        fn prop_round_trip_utf8(s in "\\PC*") {
            let word = encode(&s, Some(Charset::UTF_8));
            prop_assert_eq!(decode_to_string(&word).unwrap(), s);
        }

        #[test]
        fn prop_round_trip_latin1(s in "[ -~\u{a0}-\u{ff}]*") {
            let word = encode(&s, Some(Charset::ISO_8859_1));
            prop_assert!(word.starts_with("=?iso-8859-1?"));
            prop_assert_eq!(decode_to_string(&word).unwrap(), s);
        }
    }
}
