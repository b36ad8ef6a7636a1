//! Ordered header blocks.
//!
//! An [`InternetHeaders`] block keeps records in wire order. Records added
//! through [`InternetHeaders::add_header`] are placed by their
//! [`HeaderInfo`](crate::header_info::HeaderInfo): trace fields on top, unique fields replaced in place and
//! everything else slotted by canonical position while the block is still
//! in canonical order.

use crate::byte_builder::ByteBuilder;
use crate::charset::Charset;
use crate::config::HeaderConfig;
use crate::error::{Error, Result};
use crate::header::{DEFAULT_CHARSET, DEFAULT_CONFIG, InternetHeader};
use std::fmt;
use std::io;

/// Ordered collection of header records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternetHeaders {
    headers: Vec<InternetHeader>,
    ordered: bool,
}

impl InternetHeaders {
    /// Creates an empty, ordered block.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            headers: Vec::new(),
            ordered: true,
        }
    }

    /// Reads a header block from the start of a message.
    ///
    /// Returns the block and the offset where the body starts (just past the
    /// blank line, or the end of input).
    #[must_use]
    pub fn parse(message: &[u8]) -> (Self, usize) {
        Self::parse_with(message, &DEFAULT_CONFIG)
    }

    /// Like [`InternetHeaders::parse`] with explicit configuration.
    ///
    /// CRLF, bare LF and bare CR all end a line and are stored as CRLF. A
    /// line starting with a space or tab continues the previous header.
    /// Headers longer than the configured limit are truncated.
    #[must_use]
    pub fn parse_with(message: &[u8], config: &HeaderConfig) -> (Self, usize) {
        let mut block = Self::new();
        let mut current = ByteBuilder::with_capacity(256, DEFAULT_CHARSET);
        let mut truncated = false;
        let mut pos = 0;

        while pos < message.len() {
            let rest = &message[pos..];
            let end = rest
                .iter()
                .position(|&b| b == b'\r' || b == b'\n')
                .unwrap_or(rest.len());
            let line = &rest[..end];
            let terminator = match &rest[end..] {
                [b'\r', b'\n', ..] => 2,
                [] => 0,
                _ => 1,
            };
            pos += end + terminator;

            if line.is_empty() {
                block.flush_line(&mut current, config);
                return (block, pos);
            }

            let continuation = matches!(line[0], b' ' | b'\t') && !current.is_empty();
            if !continuation {
                block.flush_line(&mut current, config);
                truncated = false;
            } else if !truncated {
                current.append_bytes(b"\r\n");
            }
            if truncated {
                continue;
            }

            let room = config.max_header_length.saturating_sub(current.len());
            if line.len() > room {
                tracing::warn!(
                    limit = config.max_header_length,
                    "header line too long, truncating"
                );
                current.append_bytes(&line[..room]);
                truncated = true;
            } else {
                current.append_bytes(line);
            }
        }

        block.flush_line(&mut current, config);
        (block, message.len())
    }

    fn flush_line(&mut self, line: &mut ByteBuilder, config: &HeaderConfig) {
        if line.is_empty() {
            return;
        }
        line.append_bytes(b"\r\n");
        self.append_header(InternetHeader::from_line_with(line.as_bytes(), config));
        line.reset();
    }

    /// Returns true while every record has been kept in canonical position
    /// order.
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Number of records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if the block holds no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterates over the records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, InternetHeader> {
        self.headers.iter()
    }

    /// Returns the first record named `name`.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&InternetHeader> {
        self.headers.iter().find(|h| h.name().eq_ignore_ascii_case(name))
    }

    /// Returns every record named `name`, in order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&InternetHeader> {
        self.headers
            .iter()
            .filter(|h| h.name().eq_ignore_ascii_case(name))
            .collect()
    }

    /// Returns true if a record named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Decoded value of the first record named `name`.
    #[must_use]
    pub fn value(&self, name: &str, charset: Option<Charset>) -> Option<String> {
        self.get_header(name).map(|h| h.value(charset))
    }

    /// Adds a record at its canonical place.
    pub fn add_header(&mut self, header: InternetHeader) {
        let info = header.info();

        if info.unique && self.replace_all(&header) {
            return;
        }

        let index = if info.first {
            0
        } else if info.prepend {
            self.headers
                .iter()
                .position(|h| h.info().position >= info.position)
                .unwrap_or(self.headers.len())
        } else if self.ordered {
            self.ordered_slot(&header)
        } else {
            self.headers
                .iter()
                .rposition(|h| h.name().eq_ignore_ascii_case(header.name()))
                .map_or(self.headers.len(), |i| i + 1)
        };
        self.headers.insert(index, header);
    }

    /// Finds the insertion point for `header` by scanning from the back.
    fn ordered_slot(&self, header: &InternetHeader) -> usize {
        let position = header.info().position;
        let mut after_peers = None;
        for (i, existing) in self.headers.iter().enumerate().rev() {
            let existing_position = existing.info().position;
            if existing_position > position {
                continue;
            }
            if existing_position == position {
                if existing.name().eq_ignore_ascii_case(header.name()) {
                    return i + 1;
                }
                after_peers.get_or_insert(i + 1);
                continue;
            }
            return after_peers.unwrap_or(i + 1);
        }
        after_peers.unwrap_or(0)
    }

    /// Puts `header` in place of the first record with its name and drops
    /// the others. Returns false if there was none.
    fn replace_all(&mut self, header: &InternetHeader) -> bool {
        let Some(first) = self
            .headers
            .iter()
            .position(|h| h.name().eq_ignore_ascii_case(header.name()))
        else {
            return false;
        };
        self.headers[first] = header.clone();
        let mut index = 0;
        self.headers.retain(|h| {
            let keep = index <= first || !h.name().eq_ignore_ascii_case(header.name());
            index += 1;
            keep
        });
        true
    }

    /// Appends a record at the end, as read off the wire.
    pub fn append_header(&mut self, header: InternetHeader) {
        if self
            .headers
            .last()
            .is_some_and(|last| header.info().position < last.info().position)
        {
            self.ordered = false;
        }
        self.headers.push(header);
    }

    /// Replaces every record named `name` with `header`, or removes them all
    /// when `header` is `None`. Without an existing record the header is
    /// added at its canonical place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NameMismatch`] if `header` has a different name.
    pub fn set_header(&mut self, name: &str, header: Option<InternetHeader>) -> Result<()> {
        match header {
            None => {
                self.remove_header(name);
            }
            Some(header) => {
                if !header.name().eq_ignore_ascii_case(name) {
                    return Err(Error::NameMismatch {
                        expected: name.to_string(),
                        actual: header.name().to_string(),
                    });
                }
                if !self.replace_all(&header) {
                    self.add_header(header);
                }
            }
        }
        Ok(())
    }

    /// Removes every record named `name`, returning how many were removed.
    pub fn remove_header(&mut self, name: &str) -> usize {
        let before = self.headers.len();
        self.headers.retain(|h| !h.name().eq_ignore_ascii_case(name));
        before - self.headers.len()
    }

    /// Adds `name: value` at its canonical place; the value is stored as is.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid header name.
    pub fn add(&mut self, name: &str, value: &str) -> Result<()> {
        self.add_header(InternetHeader::new(name, value)?);
        Ok(())
    }

    /// Sets `name: value`, replacing existing records.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid header name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let header = InternetHeader::new(name, value)?;
        let name = header.name().to_string();
        self.set_header(&name, Some(header))
    }

    /// Serializes the block: every raw record followed by the blank line.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let size = self.headers.iter().map(|h| h.raw_header().len()).sum::<usize>() + 2;
        let mut out = Vec::with_capacity(size);
        for header in &self.headers {
            out.extend_from_slice(header.raw_header());
        }
        out.extend_from_slice(b"\r\n");
        out
    }

    /// Writes [`InternetHeaders::to_bytes`] to `writer`.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        for header in &self.headers {
            writer.write_all(header.raw_header())?;
        }
        writer.write_all(b"\r\n")
    }
}

impl Default for InternetHeaders {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a InternetHeaders {
    type Item = &'a InternetHeader;
    type IntoIter = std::slice::Iter<'a, InternetHeader>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}

impl fmt::Display for InternetHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&DEFAULT_CHARSET.decode(&self.to_bytes()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn header(name: &str, value: &str) -> InternetHeader {
        InternetHeader::new(name, value).unwrap()
    }

    fn names(block: &InternetHeaders) -> Vec<&str> {
        block.iter().map(InternetHeader::name).collect()
    }

    #[test]
    fn test_unique_replaced_in_place() {
        let mut block = InternetHeaders::new();
        block.add_header(header("Subject", "one"));
        block.add_header(header("From", "a@b"));
        block.add_header(header("Date", "today"));
        block.add_header(header("Subject", "two"));

        assert_eq!(names(&block), vec!["Date", "From", "Subject"]);
        assert_eq!(block.value("subject", None).unwrap(), "two");
    }

    #[test]
    fn test_received_prepends() {
        let mut block = InternetHeaders::new();
        block.add_header(header("From", "a@b"));
        block.add_header(header("Received", "r1"));
        block.add_header(header("Received", "r2"));
        block.add_header(header("Return-Path", "<a@b>"));

        let values: Vec<_> = block.iter().map(|h| h.encoded_value(None)).collect();
        assert_eq!(values, vec!["<a@b>", "r2", "r1", "a@b"]);
    }

    #[test]
    fn test_first_goes_to_top() {
        let mut block = InternetHeaders::new();
        block.add_header(header("Received", "r1"));
        block.add_header(header("Resent-From", "x@y"));
        assert_eq!(names(&block), vec!["Resent-From", "Received"]);
    }

    #[test]
    fn test_ordered_insert_after_same_name() {
        let mut block = InternetHeaders::new();
        block.add_header(header("To", "a"));
        block.add_header(header("Subject", "s"));
        block.add_header(header("To", "b"));
        block.add_header(header("Cc", "c"));

        let values: Vec<_> = block.iter().map(|h| h.encoded_value(None)).collect();
        assert_eq!(values, vec!["a", "b", "c", "s"]);
    }

    #[test]
    fn test_unknown_headers_sort_before_trailers() {
        let mut block = InternetHeaders::new();
        block.add_header(header("Status", "RO"));
        block.add_header(header("Content-Length", "10"));
        block.add_header(header("X-Mailer", "m"));
        block.add_header(header("X-Spam", "no"));
        block.add_header(header("Subject", "s"));

        assert_eq!(
            names(&block),
            vec!["Subject", "X-Mailer", "X-Spam", "Content-Length", "Status"]
        );
    }

    #[test]
    fn test_unordered_block_groups_by_name() {
        let (mut block, _) =
            InternetHeaders::parse(b"Subject: s\r\nX-A: 1\r\nFrom: f\r\nX-B: 2\r\n\r\n");
        assert!(!block.is_ordered());

        block.add_header(header("X-A", "3"));
        block.add_header(header("To", "t"));
        assert_eq!(names(&block), vec!["Subject", "X-A", "X-A", "From", "X-B", "To"]);
    }

    #[test]
    fn test_append_tracks_order() {
        let mut block = InternetHeaders::new();
        block.append_header(header("From", "f"));
        block.append_header(header("Subject", "s"));
        assert!(block.is_ordered());
        block.append_header(header("Date", "d"));
        assert!(!block.is_ordered());
    }

    #[test]
    fn test_set_header() {
        let (mut block, _) =
            InternetHeaders::parse(b"X-Tag: 1\r\nSubject: s\r\nX-Tag: 2\r\nX-Tag: 3\r\n\r\n");

        block.set_header("x-tag", Some(header("X-Tag", "new"))).unwrap();
        assert_eq!(names(&block), vec!["X-Tag", "Subject"]);
        assert_eq!(block.value("X-Tag", None).unwrap(), "new");

        block.set_header("X-Tag", None).unwrap();
        assert_eq!(names(&block), vec!["Subject"]);

        block.set_header("To", Some(header("To", "t"))).unwrap();
        assert!(block.contains("to"));
    }

    #[test]
    fn test_set_header_name_mismatch() {
        let mut block = InternetHeaders::new();
        let err = block
            .set_header("Subject", Some(header("From", "f")))
            .unwrap_err();
        assert!(matches!(err, Error::NameMismatch { .. }));
        assert!(block.is_empty());
    }

    #[test]
    fn test_add_set_remove() {
        let mut block = InternetHeaders::new();
        block.add("to", "a@b").unwrap();
        block.add("To", "c@d").unwrap();
        assert_eq!(block.get_all("TO").len(), 2);

        block.set("To", "e@f").unwrap();
        assert_eq!(block.get_all("to").len(), 1);
        assert_eq!(block.get_header("to").unwrap().encoded_value(None), "e@f");

        assert_eq!(block.remove_header("To"), 1);
        assert_eq!(block.remove_header("To"), 0);
        assert!(block.add("Bad Name", "x").is_err());
    }

    #[test]
    fn test_serialization() {
        let mut block = InternetHeaders::new();
        block.add("To", "a@b.com").unwrap();
        assert_eq!(block.to_bytes(), b"To: a@b.com\r\n\r\n");
        assert_eq!(block.to_string(), "To: a@b.com\r\n\r\n");

        let mut written = Vec::new();
        block.write_to(&mut written).unwrap();
        assert_eq!(written, block.to_bytes());

        assert_eq!(InternetHeaders::new().to_bytes(), b"\r\n");
    }

    #[test]
    fn test_parse_returns_body_offset() {
        let message = b"From: a@b\r\nSubject: hi\r\n\r\nbody text";
        let (block, offset) = InternetHeaders::parse(message);
        assert_eq!(block.len(), 2);
        assert_eq!(&message[offset..], b"body text");
        assert_eq!(block.to_bytes(), b"From: a@b\r\nSubject: hi\r\n\r\n");
    }

    #[test]
    fn test_parse_line_endings() {
        let message = b"From: a@b\nSubject: hi\r\nTo: c@d\r\rbody";
        let (block, offset) = InternetHeaders::parse(message);
        assert_eq!(block.to_bytes(), b"From: a@b\r\nSubject: hi\r\nTo: c@d\r\n\r\n");
        assert_eq!(&message[offset..], b"body");
    }

    #[test]
    fn test_parse_folding() {
        let message = b"Subject: a\n very\r\n\tlong subject\r\nTo: x\r\n\r\n";
        let (block, _) = InternetHeaders::parse(message);
        let subject = block.get_header("subject").unwrap();
        assert_eq!(subject.raw_header(), b"Subject: a\r\n very\r\n\tlong subject\r\n");
        assert_eq!(subject.value(None), "a very\tlong subject");
    }

    #[test]
    fn test_parse_without_blank_line() {
        let message = b"From: a@b\r\nSubject: hi";
        let (block, offset) = InternetHeaders::parse(message);
        assert_eq!(offset, message.len());
        assert_eq!(block.to_bytes(), b"From: a@b\r\nSubject: hi\r\n\r\n");
    }

    #[test]
    fn test_parse_truncates_long_headers() {
        let config = HeaderConfig::builder().max_header_length(16).build();
        let message = b"X-Long: 0123456789abcdef\r\n more\r\nTo: a\r\n\r\n";
        let (block, _) = InternetHeaders::parse_with(message, &config);
        assert_eq!(block.len(), 2);
        assert_eq!(
            block.get_header("x-long").unwrap().raw_header(),
            b"X-Long: 01234567\r\n"
        );
        assert_eq!(block.value("to", None).unwrap(), "a");
    }

    #[test]
    fn test_parse_empty_input() {
        let (block, offset) = InternetHeaders::parse(b"");
        assert!(block.is_empty());
        assert_eq!(offset, 0);

        let (block, offset) = InternetHeaders::parse(b"\r\nbody");
        assert!(block.is_empty());
        assert_eq!(offset, 2);
    }
}
