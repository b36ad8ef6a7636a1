//! Header value lexer.
//!
//! Splits a raw (possibly folded) header value into plain text, linear
//! whitespace and encoded-word segments. The lexer is deliberately lenient
//! about real-world breakage but refuses input it cannot segment reliably,
//! in which case callers fall back to treating the value as literal text.

use std::mem;

/// One segment of a header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldElement {
    /// Literal text, including RFC 5322 comments and quoted strings.
    Text(Vec<u8>),
    /// A run of spaces and tabs.
    Whitespace(Vec<u8>),
    /// The parts of an `=?charset?encoding?text?=` word.
    EncodedWord {
        /// Charset label as written, possibly with a `*language` suffix.
        charset: Vec<u8>,
        /// Encoding tag as written, normally `Q` or `B`.
        encoding: Vec<u8>,
        /// Encoded text.
        text: Vec<u8>,
    },
}

impl FieldElement {
    const fn empty_word() -> Self {
        Self::EncodedWord {
            charset: Vec::new(),
            encoding: Vec::new(),
            text: Vec::new(),
        }
    }

    /// Returns the literal bytes, or the encoded text of a word.
    #[must_use]
    pub fn text(&self) -> &[u8] {
        match self {
            Self::Text(text) | Self::Whitespace(text) | Self::EncodedWord { text, .. } => text,
        }
    }

    /// Returns true for encoded-word segments.
    #[must_use]
    pub const fn is_encoded_word(&self) -> bool {
        matches!(self, Self::EncodedWord { .. })
    }

    fn body_mut(&mut self) -> &mut Vec<u8> {
        match self {
            Self::Text(text) | Self::Whitespace(text) | Self::EncodedWord { text, .. } => text,
        }
    }
}

/// Which field of an encoded-word the next bytes belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordPart {
    Undefined,
    Charset,
    Encoding,
    Text,
}

impl WordPart {
    const fn next(self) -> Self {
        match self {
            Self::Undefined => Self::Charset,
            Self::Charset => Self::Encoding,
            Self::Encoding => Self::Text,
            Self::Text => Self::Undefined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    Whitespace,
    EncodedWord,
}

/// Charsets whose encoded-words are tolerated with raw whitespace inside.
///
/// Broken mailers emit `=?utf-8?Q?two words?=`; for these charsets the space
/// is kept as part of the text instead of failing the whole value.
#[must_use]
pub fn allows_raw_whitespace(charset: &[u8]) -> bool {
    [&b"iso-8859-1"[..], b"us-ascii", b"utf-8"]
        .iter()
        .any(|safe| charset.eq_ignore_ascii_case(safe))
}

const fn is_wsp(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Ordered segment list enforcing the append rules.
#[derive(Debug, Default)]
struct Fields(Vec<FieldElement>);

impl Fields {
    fn push(&mut self, element: FieldElement) {
        if !element.is_encoded_word() && element.text().is_empty() {
            return;
        }
        // whitespace between two encoded-words is not part of the value
        let len = self.0.len();
        if element.is_encoded_word()
            && len >= 2
            && matches!(self.0[len - 1], FieldElement::Whitespace(_))
            && self.0[len - 2].is_encoded_word()
        {
            self.0.pop();
        }
        self.0.push(element);
    }
}

/// Header value lexer.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    state: State,
    part: WordPart,
    current: FieldElement,
    fields: Fields,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over a raw header value.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            state: State::Text,
            part: WordPart::Undefined,
            current: FieldElement::Text(Vec::new()),
            fields: Fields(Vec::new()),
        }
    }

    /// Runs the lexer to completion.
    ///
    /// Returns `None` when the value holds an `=?` that cannot start an
    /// encoded-word, or raw whitespace inside a word of an untolerated
    /// charset.
    #[must_use]
    pub fn tokenize(mut self) -> Option<Vec<FieldElement>> {
        while self.pos < self.input.len() {
            let b = self.input[self.pos];
            // folding line breaks carry no content
            if b != b'\r' && b != b'\n' {
                match self.state {
                    State::Text => self.text_byte(b)?,
                    State::Whitespace => self.whitespace_byte(b)?,
                    State::EncodedWord => self.word_byte(b)?,
                }
            }
            self.pos += 1;
        }
        let last = mem::replace(&mut self.current, FieldElement::Text(Vec::new()));
        self.fields.push(last);
        Some(self.fields.0)
    }

    fn text_byte(&mut self, b: u8) -> Option<()> {
        if is_wsp(b) {
            self.switch(State::Whitespace, FieldElement::Whitespace(vec![b]));
        } else if self.at_word_start() {
            self.enter_word()?;
        } else {
            self.current.body_mut().push(b);
        }
        Some(())
    }

    fn whitespace_byte(&mut self, b: u8) -> Option<()> {
        if is_wsp(b) {
            self.current.body_mut().push(b);
        } else if self.at_word_start() {
            self.enter_word()?;
        } else {
            self.switch(State::Text, FieldElement::Text(vec![b]));
        }
        Some(())
    }

    fn word_byte(&mut self, b: u8) -> Option<()> {
        if is_wsp(b)
            && let FieldElement::EncodedWord { charset, .. } = &self.current
            && !allows_raw_whitespace(charset)
        {
            tracing::debug!(
                charset = %String::from_utf8_lossy(charset),
                "whitespace inside encoded-word"
            );
            return None;
        }
        if self.part == WordPart::Text && b == b'?' && self.peek(1) == Some(b'=') {
            self.pos += 1;
            self.part = WordPart::Undefined;
            self.switch(State::Text, FieldElement::Text(Vec::new()));
            return Some(());
        }
        if b == b'?' {
            self.part = self.part.next();
            return Some(());
        }

        let part = self.part;
        let FieldElement::EncodedWord { charset, encoding, text } = &mut self.current else {
            return None;
        };
        match part {
            WordPart::Charset => charset.push(b),
            WordPart::Encoding => encoding.push(b),
            WordPart::Undefined | WordPart::Text => text.push(b),
        }
        Some(())
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn at_word_start(&self) -> bool {
        self.input[self.pos] == b'=' && self.peek(1) == Some(b'?')
    }

    /// Opens an encoded-word at `=?` if three more `?` follow somewhere in
    /// the rest of the value.
    fn enter_word(&mut self) -> Option<()> {
        let delimiters = self.input[self.pos + 2..]
            .iter()
            .filter(|&&c| c == b'?')
            .take(3)
            .count();
        if delimiters < 3 {
            tracing::debug!(position = self.pos, "unterminated encoded-word");
            return None;
        }
        // the '?' after '=' is consumed by the word itself and opens the charset
        self.switch(State::EncodedWord, FieldElement::empty_word());
        Some(())
    }

    fn switch(&mut self, state: State, next: FieldElement) {
        let done = mem::replace(&mut self.current, next);
        self.fields.push(done);
        self.state = state;
    }
}

/// Tokenizes a header value.
#[must_use]
pub fn tokenize(value: &[u8]) -> Option<Vec<FieldElement>> {
    Lexer::new(value).tokenize()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn word(charset: &str, encoding: &str, text: &str) -> FieldElement {
        FieldElement::EncodedWord {
            charset: charset.as_bytes().to_vec(),
            encoding: encoding.as_bytes().to_vec(),
            text: text.as_bytes().to_vec(),
        }
    }

    fn text(s: &str) -> FieldElement {
        FieldElement::Text(s.as_bytes().to_vec())
    }

    fn wsp(s: &str) -> FieldElement {
        FieldElement::Whitespace(s.as_bytes().to_vec())
    }

    #[test]
    fn test_plain_text_and_whitespace() {
        let tokens = tokenize(b"hello  world\r\n\tagain").unwrap();
        assert_eq!(
            tokens,
            vec![text("hello"), wsp("  "), text("world"), wsp("\t"), text("again")]
        );
    }

    #[test]
    fn test_single_word() {
        let tokens = tokenize(b"=?iso-8859-1?Q?Caf=E9?=").unwrap();
        assert_eq!(tokens, vec![word("iso-8859-1", "Q", "Caf=E9")]);
    }

    #[test]
    fn test_whitespace_between_words_is_dropped() {
        let tokens = tokenize(b"=?utf-8?Q?foo?= \r\n =?utf-8?Q?bar?=").unwrap();
        assert_eq!(tokens, vec![word("utf-8", "Q", "foo"), word("utf-8", "Q", "bar")]);
    }

    #[test]
    fn test_whitespace_before_text_is_kept() {
        let tokens = tokenize(b"=?utf-8?Q?foo?= plain =?utf-8?Q?bar?=").unwrap();
        assert_eq!(
            tokens,
            vec![
                word("utf-8", "Q", "foo"),
                wsp(" "),
                text("plain"),
                wsp(" "),
                word("utf-8", "Q", "bar"),
            ]
        );
    }

    #[test]
    fn test_word_glued_to_text() {
        let tokens = tokenize(b"Re:=?utf-8?B?SGk=?=!").unwrap();
        assert_eq!(tokens, vec![text("Re:"), word("utf-8", "B", "SGk="), text("!")]);
    }

    #[test]
    fn test_empty_word_is_kept() {
        let tokens = tokenize(b"=?utf-8?Q??=").unwrap();
        assert_eq!(tokens, vec![word("utf-8", "Q", "")]);
    }

    #[test]
    fn test_unterminated_word_is_an_error() {
        assert!(tokenize(b"price =? no").is_none());
        assert!(tokenize(b"=?utf-8?Q").is_none());
        assert!(tokenize(b"a=?").is_none());
    }

    #[test]
    fn test_raw_space_in_word() {
        let tokens = tokenize(b"=?utf-8?Q?two words?=").unwrap();
        assert_eq!(tokens, vec![word("utf-8", "Q", "two words")]);

        assert!(tokenize(b"=?koi8-r?Q?two words?=").is_none());
    }

    #[test]
    fn test_word_running_to_end_of_value() {
        let tokens = tokenize(b"subject =?utf-8?Q?abc?").unwrap();
        assert_eq!(tokens, vec![text("subject"), wsp(" "), word("utf-8", "Q", "abc")]);
    }

    #[test]
    fn test_allows_raw_whitespace() {
        assert!(allows_raw_whitespace(b"UTF-8"));
        assert!(allows_raw_whitespace(b"US-ASCII"));
        assert!(!allows_raw_whitespace(b"iso-2022-jp"));
    }
}
