//! Static descriptors for well-known header fields.
//!
//! Each known field carries its canonical casing, a sort position used when
//! inserting into an ordered block, and flags controlling uniqueness and
//! placement. Names not in the table share [`HeaderInfo::DEFAULT`], which
//! sorts after every known field except `Content-Length` and `Status`.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Placement rules for one header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    /// Canonical casing; `None` for [`HeaderInfo::DEFAULT`].
    pub name: Option<&'static str>,
    /// Sort position within an ordered block.
    pub position: u8,
    /// At most one instance may exist in a block.
    pub unique: bool,
    /// New instances go above existing headers (trace fields).
    pub prepend: bool,
    /// New instances go to the very top of the block.
    pub first: bool,
}

impl HeaderInfo {
    /// Descriptor shared by all unknown field names.
    pub const DEFAULT: Self = Self::new(None, 30);

    const fn new(name: Option<&'static str>, position: u8) -> Self {
        Self {
            name,
            position,
            unique: false,
            prepend: false,
            first: false,
        }
    }

    const fn known(name: &'static str, position: u8) -> Self {
        Self::new(Some(name), position)
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    const fn prepend(mut self) -> Self {
        self.prepend = true;
        self
    }

    const fn first(mut self) -> Self {
        self.first = true;
        self
    }

    /// Looks up the descriptor for `name`, case-insensitively.
    #[must_use]
    pub fn of(name: &str) -> Self {
        LOOKUP
            .get(name.to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(Self::DEFAULT)
    }

    /// Returns the canonical casing of `name` when it is a known field.
    #[must_use]
    pub fn canonical_name(name: &str) -> &str {
        Self::of(name).name.unwrap_or(name)
    }
}

/// Known fields, in canonical order.
pub const KNOWN_HEADERS: &[HeaderInfo] = &[
    HeaderInfo::known("Return-Path", 1).prepend(),
    HeaderInfo::known("Received", 2).prepend(),
    HeaderInfo::known("Resent-Date", 3).first(),
    HeaderInfo::known("Resent-From", 3).first(),
    HeaderInfo::known("Resent-Sender", 3).first(),
    HeaderInfo::known("Resent-To", 3).first(),
    HeaderInfo::known("Resent-Cc", 3).first(),
    HeaderInfo::known("Resent-Bcc", 3).first(),
    HeaderInfo::known("Resent-Message-ID", 3).first(),
    HeaderInfo::known("Date", 4).unique(),
    HeaderInfo::known("From", 5),
    HeaderInfo::known("Sender", 6).unique(),
    HeaderInfo::known("Reply-To", 7).unique(),
    HeaderInfo::known("To", 8),
    HeaderInfo::known("Cc", 9),
    HeaderInfo::known("Bcc", 10),
    HeaderInfo::known("Message-ID", 11).unique(),
    HeaderInfo::known("In-Reply-To", 12).unique(),
    HeaderInfo::known("References", 13).unique(),
    HeaderInfo::known("Subject", 14).unique(),
    HeaderInfo::known("Comments", 15).unique(),
    HeaderInfo::known("Keywords", 16).unique(),
    HeaderInfo::known("Errors-To", 17).unique(),
    HeaderInfo::known("MIME-Version", 18).unique(),
    HeaderInfo::known("Content-Type", 19).unique(),
    HeaderInfo::known("Content-Disposition", 20).unique(),
    HeaderInfo::known("Content-Transfer-Encoding", 21).unique(),
    HeaderInfo::known("Content-Length", 49).unique(),
    HeaderInfo::known("Status", 50).unique(),
];

static LOOKUP: LazyLock<HashMap<String, HeaderInfo>> = LazyLock::new(|| {
    KNOWN_HEADERS
        .iter()
        .filter_map(|info| info.name.map(|name| (name.to_ascii_lowercase(), *info)))
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let info = HeaderInfo::of("content-TYPE");
        assert_eq!(info.name, Some("Content-Type"));
        assert_eq!(info.position, 19);
        assert!(info.unique);
    }

    #[test]
    fn test_unknown_is_default() {
        let info = HeaderInfo::of("X-Mailer");
        assert_eq!(info, HeaderInfo::DEFAULT);
        assert_eq!(info.position, 30);
        assert!(!info.unique && !info.prepend && !info.first);
    }

    #[test]
    fn test_flags() {
        assert!(HeaderInfo::of("received").prepend);
        assert!(HeaderInfo::of("Return-Path").prepend);
        assert!(HeaderInfo::of("resent-message-id").first);
        assert!(!HeaderInfo::of("To").unique);
        assert!(HeaderInfo::of("Status").unique);
    }

    #[test]
    fn test_default_sorts_before_trailers() {
        assert!(HeaderInfo::of("Content-Transfer-Encoding").position < HeaderInfo::DEFAULT.position);
        assert!(HeaderInfo::DEFAULT.position < HeaderInfo::of("Content-Length").position);
        assert!(HeaderInfo::of("Content-Length").position < HeaderInfo::of("Status").position);
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(HeaderInfo::canonical_name("message-id"), "Message-ID");
        assert_eq!(HeaderInfo::canonical_name("x-custom"), "x-custom");
    }
}
