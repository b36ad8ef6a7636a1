//! MIME parameter lists (`; name=value` tails of structured headers).
//!
//! Parsing accepts RFC 2045 tokens and quoted strings, RFC 2231 extended
//! values (`name*=charset'lang'%XX`) and continuations (`name*0*=`,
//! `name*1=`), and RFC 2047 encoded-words inside quoted strings.
//! Serialization picks the lightest form that carries the value.

use crate::charset::Charset;
use crate::decode::decode_str;
use crate::encoded_word;
use std::fmt::Write as _;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Longest serialized parameter segment before continuations kick in.
const MAX_SEGMENT: usize = 64;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// How non-ASCII parameter values are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParamEncoding {
    /// RFC 2231 `name*=utf-8''...` with continuations.
    #[default]
    Rfc2231,
    /// A quoted RFC 2047 encoded-word, as many older mailers expect.
    Rfc2047,
}

/// RFC 2045 `tspecials`.
const fn is_tspecial(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?' | '='
    )
}

/// Characters allowed in an RFC 2045 token.
#[must_use]
pub const fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !is_tspecial(c)
}

/// RFC 2231 `attribute-char`: a token char that needs no percent-escape.
const fn is_attr_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}

/// Insertion-ordered parameter map with case-insensitive names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MimeParams {
    params: Vec<(String, String)>,
}

impl MimeParams {
    /// Creates an empty parameter map.
    #[must_use]
    pub const fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Returns the decoded value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns true if `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets `name`, replacing an existing value in place or appending.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self
            .params
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            slot.1 = value;
        } else {
            self.params.push((name, value));
        }
    }

    /// Removes `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self
            .params
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.params.remove(index).1)
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parses a parameter list such as `; charset=utf-8; name="a b"`.
    ///
    /// Malformed pieces are skipped. Only `name*N` sections are joined into
    /// one value. When a name shows up more than once, an RFC 2231 form
    /// (`name*=` or a section run) beats a plain `name=`; otherwise the first
    /// occurrence wins.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut groups: Vec<Occurrences> = Vec::new();
        for segment in RawParams::new(input) {
            match groups
                .iter_mut()
                .find(|group| group.base.eq_ignore_ascii_case(&segment.base))
            {
                Some(group) => group.add(segment),
                None => groups.push(Occurrences::from(segment)),
            }
        }

        Self {
            params: groups.into_iter().map(Occurrences::resolve).collect(),
        }
    }

    /// Serializes as `; name=value` pairs.
    #[must_use]
    pub fn to_header_string(&self, encoding: ParamEncoding) -> String {
        let mut out = String::new();
        for (name, value) in &self.params {
            write_param(&mut out, name, value, encoding);
        }
        out
    }
}

/// One `name[*n][*]=value` piece as written.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    base: String,
    section: Option<u32>,
    extended: bool,
    quoted: bool,
    value: String,
}

impl Segment {
    fn new(name: &str, value: String, quoted: bool) -> Self {
        let (rest, extended) = name
            .strip_suffix('*')
            .map_or((name, false), |rest| (rest, true));
        let (base, section) = rest
            .rsplit_once('*')
            .and_then(|(base, n)| n.parse::<u32>().ok().map(|n| (base, Some(n))))
            .unwrap_or((rest, None));
        Self {
            base: base.to_string(),
            section,
            extended,
            quoted,
            value,
        }
    }
}

/// Every segment seen for one parameter name.
#[derive(Debug)]
struct Occurrences {
    base: String,
    plain: Option<Segment>,
    extended: Option<Segment>,
    sections: Vec<Segment>,
}

impl From<Segment> for Occurrences {
    fn from(segment: Segment) -> Self {
        let mut group = Self {
            base: segment.base.clone(),
            plain: None,
            extended: None,
            sections: Vec::new(),
        };
        group.add(segment);
        group
    }
}

impl Occurrences {
    fn add(&mut self, segment: Segment) {
        match segment.section {
            Some(n) if self.sections.iter().any(|s| s.section == Some(n)) => {
                tracing::debug!(name = %segment.base, section = n, "duplicate parameter section dropped");
            }
            Some(_) => self.sections.push(segment),
            None if segment.extended => {
                self.extended.get_or_insert(segment);
            }
            None => {
                self.plain.get_or_insert(segment);
            }
        }
    }

    /// The name as first written, with its chosen value.
    fn resolve(self) -> (String, String) {
        let value = match self.extended {
            Some(extended) => assemble(vec![extended]),
            None if self.sections.is_empty() => assemble(self.plain.into_iter().collect()),
            None => assemble(self.sections),
        };
        (self.base, value)
    }
}

/// Iterator over the raw segments of a parameter list.
struct RawParams<'a> {
    rest: &'a str,
}

impl<'a> RawParams<'a> {
    const fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let end = self.rest.find(|c| !pred(c)).unwrap_or(self.rest.len());
        let (taken, rest) = self.rest.split_at(end);
        self.rest = rest;
        taken
    }

    /// Reads a quoted string after the opening quote; an unterminated one
    /// runs to the end of the input.
    fn quoted(&mut self) -> String {
        let mut value = String::new();
        let mut chars = self.rest.char_indices();
        let mut end = self.rest.len();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    end = i + 1;
                    break;
                }
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        value.push(escaped);
                    }
                }
                _ => value.push(c),
            }
        }
        self.rest = &self.rest[end..];
        value
    }
}

impl Iterator for RawParams<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        loop {
            self.take_while(|c| c == ';' || c.is_whitespace());
            if self.rest.is_empty() {
                return None;
            }
            let name = self.take_while(|c| c != '=' && c != ';').trim();
            if !self.rest.starts_with('=') || name.is_empty() {
                // valueless attribute or a stray '='
                self.take_while(|c| c != ';');
                continue;
            }
            self.rest = &self.rest[1..];
            self.take_while(char::is_whitespace);

            let quoted = self.rest.starts_with('"');
            let value = if quoted {
                self.rest = &self.rest[1..];
                self.quoted()
            } else {
                self.take_while(|c| c != ';').trim_end().to_string()
            };
            // junk between a closing quote and the next ';'
            self.take_while(|c| c != ';');
            return Some(Segment::new(name, value, quoted));
        }
    }
}

/// Joins the segments of one parameter into its decoded value.
///
/// `segments` is either a single unsectioned segment or a run of distinct
/// `*N` sections.
fn assemble(mut segments: Vec<Segment>) -> String {
    segments.sort_by_key(|segment| segment.section.unwrap_or(0));

    let mut charset = None;
    let mut pending: Vec<u8> = Vec::new();
    let mut value = String::new();
    for segment in &segments {
        if !segment.extended {
            flush_percent(&mut pending, charset, &mut value);
            if segment.quoted && segment.value.contains("=?") {
                value.push_str(&decode_str(&segment.value));
            } else {
                value.push_str(&segment.value);
            }
            continue;
        }

        let mut encoded = segment.value.as_str();
        if segment.section.is_none_or(|n| n == 0) {
            // charset'language'value
            let mut parts = encoded.splitn(3, '\'');
            if let (Some(label), Some(_lang), Some(text)) = (parts.next(), parts.next(), parts.next())
            {
                charset = Charset::for_name(label);
                if charset.is_none() && !label.is_empty() {
                    tracing::debug!(charset = label, "unknown parameter charset");
                }
                encoded = text;
            }
        }
        percent_decode_into(encoded.as_bytes(), &mut pending);
    }
    flush_percent(&mut pending, charset, &mut value);
    value
}

fn percent_decode_into(encoded: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < encoded.len() {
        let b = encoded[i];
        let hex = encoded
            .get(i + 1..i + 3)
            .and_then(|pair| std::str::from_utf8(pair).ok())
            .and_then(|pair| u8::from_str_radix(pair, 16).ok());
        match (b, hex) {
            (b'%', Some(byte)) => {
                out.push(byte);
                i += 3;
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }
}

fn flush_percent(pending: &mut Vec<u8>, charset: Option<Charset>, out: &mut String) {
    if pending.is_empty() {
        return;
    }
    let text = charset.map_or_else(
        || String::from_utf8_lossy(pending),
        |charset| charset.decode(pending),
    );
    out.push_str(&text);
    pending.clear();
}

fn write_param(out: &mut String, name: &str, value: &str, encoding: ParamEncoding) {
    let is_token = !value.is_empty() && value.chars().all(is_token_char);
    if is_token && value.len() <= MAX_SEGMENT {
        let _ = write!(out, "; {name}={value}");
    } else if value.chars().all(|c| c == ' ' || c == '\t' || c.is_ascii_graphic()) {
        write_quoted(out, name, value);
    } else {
        match encoding {
            ParamEncoding::Rfc2231 => write_extended(out, name, value),
            ParamEncoding::Rfc2047 => {
                let word = encoded_word::encode(value, Some(Charset::UTF_8));
                let _ = write!(out, "; {name}=\"{word}\"");
            }
        }
    }
}

/// Quoted form, split into `name*N="..."` continuations when long.
fn write_quoted(out: &mut String, name: &str, value: &str) {
    let chunks = chunk_chars(value, MAX_SEGMENT);
    if chunks.len() == 1 {
        let _ = write!(out, "; {name}={}", crate::escape::quote(value));
        return;
    }
    for (i, chunk) in chunks.iter().enumerate() {
        let _ = write!(out, "; {name}*{i}={}", crate::escape::quote(chunk));
    }
}

/// RFC 2231 extended form in UTF-8, split into `name*N*=` continuations
/// when long.
fn write_extended(out: &mut String, name: &str, value: &str) {
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::from("utf-8''");
    for b in value.bytes() {
        let width = if is_attr_char(b) { 1 } else { 3 };
        if current.len() + width > MAX_SEGMENT && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }
        if is_attr_char(b) {
            current.push(char::from(b));
        } else {
            current.push('%');
            current.push(char::from(HEX[usize::from(b >> 4)]));
            current.push(char::from(HEX[usize::from(b & 0x0F)]));
        }
    }
    pieces.push(current);

    if pieces.len() == 1 {
        let _ = write!(out, "; {name}*={}", pieces[0]);
        return;
    }
    for (i, piece) in pieces.iter().enumerate() {
        let _ = write!(out, "; {name}*{i}*={piece}");
    }
}

fn chunk_chars(value: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for (i, _) in value.char_indices() {
        if i - start >= max {
            chunks.push(&value[start..i]);
            start = i;
        }
    }
    chunks.push(&value[start..]);
    chunks
}
