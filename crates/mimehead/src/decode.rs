//! Header value decoding: unfolding plus RFC 2047 encoded-word expansion.

use crate::charset::Charset;
use crate::encoded_word;
use crate::lexer::{self, FieldElement};

/// Removes folding line breaks (every CR and LF) from a header value.
///
/// The whitespace that followed each break is kept, so the result is the
/// RFC 5322 unfolded form.
#[must_use]
pub fn unfold(folded: &str) -> String {
    folded.chars().filter(|&c| c != '\r' && c != '\n').collect()
}

/// Byte-level [`unfold`].
#[must_use]
pub fn unfold_bytes(folded: &[u8]) -> Vec<u8> {
    folded
        .iter()
        .copied()
        .filter(|&b| b != b'\r' && b != b'\n')
        .collect()
}

/// Returns true if the value needs the lexer: any non-ASCII or control byte,
/// or a possible encoded-word start.
fn needs_lexing(value: &[u8]) -> bool {
    value.iter().enumerate().any(|(i, &b)| {
        b >= 0x7F || b.is_ascii_control() || (b == b'=' && value.get(i + 1) == Some(&b'?'))
    })
}

/// Decodes a raw header value into its logical text.
///
/// Bytes outside encoded-words are interpreted in `charset`. Nothing here
/// fails: a value the lexer rejects is returned unfolded, and an encoded-word
/// that does not decode is kept as written.
#[must_use]
pub fn decode_value(value: &[u8], charset: Charset) -> String {
    if !needs_lexing(value) {
        return unfold(&charset.decode(value));
    }
    let Some(fields) = lexer::tokenize(value) else {
        tracing::debug!("header value not lexable, using unfolded text");
        return unfold(&charset.decode(value));
    };

    let mut text = String::with_capacity(value.len());
    let mut pending: Option<PendingWord> = None;
    let mut prev_was_word = false;

    for field in &fields {
        match field {
            FieldElement::Text(raw) | FieldElement::Whitespace(raw) => {
                if let Some(word) = pending.take() {
                    word.flush(&mut text);
                }
                text.push_str(&charset.decode(raw));
                prev_was_word = false;
            }
            FieldElement::EncodedWord {
                charset: label,
                encoding,
                text: encoded,
            } => {
                pending = Some(match pending.take() {
                    Some(mut run) if prev_was_word && run.continues(label, encoding) => {
                        if run.ends_with_padding() {
                            match run.encoding_tag() {
                                // a padded B chunk is complete on its own
                                Some(b'B') => run.flush(&mut text),
                                // an '=' split across Q words is illegal; keep it verbatim
                                _ => text.push_str(&run.literal()),
                            }
                            PendingWord::new(label, encoding, encoded)
                        } else {
                            run.text.extend_from_slice(encoded);
                            run
                        }
                    }
                    Some(run) => {
                        run.flush(&mut text);
                        PendingWord::new(label, encoding, encoded)
                    }
                    None => PendingWord::new(label, encoding, encoded),
                });
                prev_was_word = true;
            }
        }
    }
    if let Some(word) = pending {
        word.flush(&mut text);
    }
    text
}

/// Encoded text accumulated across adjacent compatible words.
struct PendingWord {
    charset: Vec<u8>,
    encoding: Vec<u8>,
    text: Vec<u8>,
}

impl PendingWord {
    fn new(charset: &[u8], encoding: &[u8], text: &[u8]) -> Self {
        Self {
            charset: charset.to_vec(),
            encoding: encoding.to_vec(),
            text: text.to_vec(),
        }
    }

    fn continues(&self, charset: &[u8], encoding: &[u8]) -> bool {
        self.charset.eq_ignore_ascii_case(charset) && self.encoding.eq_ignore_ascii_case(encoding)
    }

    const fn encoding_tag(&self) -> Option<u8> {
        match self.encoding.as_slice() {
            [tag] if tag.eq_ignore_ascii_case(&b'b') => Some(b'B'),
            [tag] if tag.eq_ignore_ascii_case(&b'q') => Some(b'Q'),
            _ => None,
        }
    }

    fn ends_with_padding(&self) -> bool {
        self.encoding_tag().is_some() && self.text.last() == Some(&b'=')
    }

    /// Rebuilds the `=?charset?encoding?text?=` form.
    fn wrapped(&self) -> Vec<u8> {
        let mut word =
            Vec::with_capacity(self.charset.len() + self.encoding.len() + self.text.len() + 6);
        word.extend_from_slice(b"=?");
        word.extend_from_slice(&self.charset);
        word.push(b'?');
        word.extend_from_slice(&self.encoding);
        word.push(b'?');
        word.extend_from_slice(&self.text);
        word.extend_from_slice(b"?=");
        word
    }

    fn literal(&self) -> String {
        String::from_utf8_lossy(&self.wrapped()).into_owned()
    }

    fn flush(self, out: &mut String) {
        let word = self.wrapped();
        let Some(decoded) = encoded_word::decode(&word) else {
            tracing::debug!(word = %String::from_utf8_lossy(&word), "undecodable encoded-word kept verbatim");
            out.push_str(&String::from_utf8_lossy(&word));
            return;
        };
        out.push_str(&decoded.to_string());
    }
}

/// Decodes a UTF-8 header value string.
#[must_use]
pub fn decode_str(value: &str) -> String {
    decode_value(value.as_bytes(), Charset::UTF_8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_ascii_fast_path() {
        assert_eq!(decode_str("hello world"), "hello world");
        assert_eq!(decode_str("folded\r\n value"), "folded value");
    }

    #[test]
    fn test_unfold_bytes() {
        assert_eq!(unfold_bytes(b"a\r\n b\n\tc\r"), b"a b\tc");
    }

    #[test]
    fn test_single_word() {
        assert_eq!(
            decode_value(b"=?iso-8859-1?Q?Caf=E9?=", Charset::ISO_8859_1),
            "Café"
        );
    }

    #[test]
    fn test_adjacent_words_merge() {
        assert_eq!(decode_str("=?utf-8?Q?foo?= =?utf-8?Q?bar?="), "foobar");
        assert_eq!(decode_str("=?utf-8?Q?foo?= plain =?utf-8?Q?bar?="), "foo plain bar");
    }

    #[test]
    fn test_folded_words_merge() {
        assert_eq!(
            decode_str("=?utf-8?B?SGVs?=\r\n =?utf-8?B?bG8=?="),
            "Hello"
        );
    }

    #[test]
    fn test_labels_merge_case_insensitively() {
        assert_eq!(decode_str("=?UTF-8?b?SGVs?= =?utf-8?B?bG8=?="), "Hello");
        assert_eq!(decode_str("=?UTF-8?q?caf=C3?= =?utf-8?Q?=A9?="), "café");
    }

    #[test]
    fn test_padded_middle_chunk_ends_base64_run() {
        assert_eq!(
            decode_str("=?utf-8?B?SGk=?= =?utf-8?B?VGhl?= =?utf-8?B?cmU=?="),
            "HiThere"
        );
        // SGVs + bG8= decode together, then V29y starts a new run
        assert_eq!(
            decode_str("=?utf-8?B?SGVs?= =?utf-8?B?bG8=?= =?utf-8?B?V29y?="),
            "HelloWor"
        );
    }

    #[test]
    fn test_multibyte_split_across_q_words() {
        // é is C3 A9 in UTF-8; the two halves only decode together
        assert_eq!(decode_str("=?utf-8?Q?caf=C3?= =?utf-8?Q?=A9?="), "café");
    }

    #[test]
    fn test_padded_base64_chunks_decode_separately() {
        assert_eq!(
            decode_str("=?utf-8?B?SGk=?= =?utf-8?B?VGhlcmU=?="),
            "HiThere"
        );
    }

    #[test]
    fn test_q_escape_split_across_words_is_kept_literally() {
        assert_eq!(
            decode_str("=?utf-8?Q?ab=?= =?utf-8?Q?41?="),
            "=?utf-8?Q?ab=?=41"
        );
    }

    #[test]
    fn test_charset_change_flushes() {
        assert_eq!(
            decode_str("=?iso-8859-1?Q?caf=E9?= =?utf-8?Q?_cr=C3=A8me?="),
            "café crème"
        );
    }

    #[test]
    fn test_undecodable_word_kept() {
        assert_eq!(
            decode_str("Re: =?x-unknown?Q?abc?= there"),
            "Re: =?x-unknown?Q?abc?= there"
        );
    }

    #[test]
    fn test_malformed_falls_back_to_unfold() {
        assert_eq!(decode_str("costs =? money\r\n today"), "costs =? money today");
        assert_eq!(decode_str("a =?b?c"), "a =?b?c");
    }

    #[test]
    fn test_unclosed_word_at_end_decodes() {
        assert_eq!(decode_str("subject =?utf-8?Q?abc?"), "subject abc");
    }

    #[test]
    fn test_raw_8bit_in_caller_charset() {
        assert_eq!(decode_value(b"Caf\xE9", Charset::ISO_8859_1), "Café");
        assert_eq!(decode_value("Café".as_bytes(), Charset::UTF_8), "Café");
    }

    #[test]
    fn test_comment_text_passes_through() {
        assert_eq!(
            decode_str("=?utf-8?Q?J=C3=B6rg?= (the =?utf-8?Q?boss?=)"),
            "Jörg (the boss)"
        );
    }

    proptest! {
        #[test]
        fn prop_unfold_idempotent(s in "[a-z \t\r\n]*") {
            let once = unfold(&s);
            prop_assert_eq!(&unfold(&once), &once);
            prop_assert!(!once.contains('\r') && !once.contains('\n'));
        }

        #[test]
        fn prop_ascii_without_words_is_unchanged(s in "[ -<>-~]*") {
            prop_assert_eq!(decode_str(&s), s);
        }
    }
}
