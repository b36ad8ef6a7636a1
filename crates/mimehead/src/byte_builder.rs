//! Growable byte buffer with an attached charset.
//!
//! Used as scratch space while reading header lines off the wire and as the
//! carrier for decoded encoded-word bytes, which only become text once their
//! charset is applied.

use crate::charset::Charset;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Byte accumulator that knows how to turn its content into text.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteBuilder {
    buf: BytesMut,
    charset: Charset,
}

impl ByteBuilder {
    /// Creates an empty builder decoding as ISO-8859-1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0, Charset::ISO_8859_1)
    }

    /// Creates an empty builder with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize, charset: Charset) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            charset,
        }
    }

    /// Wraps existing bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8], charset: Charset) -> Self {
        Self {
            buf: BytesMut::from(bytes),
            charset,
        }
    }

    /// Returns the charset used by [`ByteBuilder::to_string`] and
    /// [`ByteBuilder::append_str`].
    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// Replaces the attached charset; the bytes are untouched.
    pub const fn set_charset(&mut self, charset: Charset) {
        self.charset = charset;
    }

    /// Appends one byte.
    pub fn append(&mut self, b: u8) -> &mut Self {
        self.buf.put_u8(b);
        self
    }

    /// Appends a byte slice.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Appends a character encoded in the builder's charset.
    pub fn append_char(&mut self, c: char) -> &mut Self {
        let mut utf8 = [0u8; 4];
        self.append_str(c.encode_utf8(&mut utf8))
    }

    /// Appends a string encoded in the builder's charset.
    ///
    /// Characters the charset cannot represent are replaced.
    pub fn append_str(&mut self, s: &str) -> &mut Self {
        let encoded = self.charset.encode_lossy(s);
        self.buf.extend_from_slice(&encoded);
        self
    }

    /// Appends the raw content of another builder.
    pub fn append_builder(&mut self, other: &Self) -> &mut Self {
        self.buf.extend_from_slice(&other.buf);
        self
    }

    /// Removes the last byte, if any.
    pub fn pop(&mut self) -> &mut Self {
        let len = self.buf.len();
        if len > 0 {
            self.buf.truncate(len - 1);
        }
        self
    }

    /// Returns the byte at `index`.
    #[must_use]
    pub fn byte_at(&self, index: usize) -> Option<u8> {
        self.buf.get(index).copied()
    }

    /// Returns the position of the first `b` at or after `from`.
    #[must_use]
    pub fn index_of(&self, b: u8, from: usize) -> Option<usize> {
        self.buf
            .get(from..)?
            .iter()
            .position(|&c| c == b)
            .map(|i| i + from)
    }

    /// Returns true if the content begins with `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.buf.starts_with(prefix)
    }

    /// Returns true if the last byte is `b`.
    #[must_use]
    pub fn ends_with(&self, b: u8) -> bool {
        self.buf.last() == Some(&b)
    }

    /// Returns the number of bytes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drops all content, keeping the allocation.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Borrows the content.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Copies the content out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Converts into an immutable byte handle.
    #[must_use]
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for ByteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ByteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.charset.decode(&self.buf))
    }
}

impl fmt::Debug for ByteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuilder")
            .field("charset", &self.charset)
            .field("content", &String::from_utf8_lossy(&self.buf))
            .finish()
    }
}
