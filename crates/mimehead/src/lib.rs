//! # mimehead
//!
//! Header parsing and encoding for RFC 5322 / MIME mail.
//!
//! ## Features
//!
//! - **Wire-exact headers**: untouched records serialize byte for byte,
//!   folding and all
//! - **Canonical ordering**: trace fields on top, singletons replaced in
//!   place, everything else slotted by field
//! - **RFC 2047**: tolerant encoded-word decoding (broken mailers included)
//!   and minimal encoding of non-ASCII values
//! - **Structured values**: `Content-Type` / `Content-Disposition` with
//!   RFC 2231 parameters and continuations
//!
//! ## Quick Start
//!
//! ### Reading a header block
//!
//! ```
//! use mimehead::InternetHeaders;
//!
//! let message = b"Subject: =?iso-8859-1?Q?Caf=E9?=\r\nTo: a@b.com\r\n\r\nbody";
//! let (headers, body) = InternetHeaders::parse(message);
//!
//! assert_eq!(headers.value("subject", None).as_deref(), Some("Café"));
//! assert_eq!(&message[body..], b"body");
//! ```
//!
//! ### Building one
//!
//! ```
//! use mimehead::{InternetHeader, InternetHeaders};
//!
//! let mut headers = InternetHeaders::new();
//! headers.add("Subject", "hello")?;
//! headers.add("From", "a@b.com")?;
//! headers.add_header(InternetHeader::with_charset("Comments", "Grüße", None)?);
//!
//! assert_eq!(headers.iter().next().map(|h| h.name()), Some("From"));
//! # Ok::<(), mimehead::Error>(())
//! ```
//!
//! ### Structured values
//!
//! ```
//! use mimehead::{ContentDisposition, ContentType};
//!
//! let ct = ContentType::parse("Multipart/Mixed; boundary=\"=_b\"");
//! assert!(ct.is_multipart());
//! assert_eq!(ct.boundary(), Some("=_b"));
//!
//! let cd = ContentDisposition::parse("attachment; filename*=utf-8''%E2%82%AC.txt");
//! assert_eq!(cd.filename(), Some("€.txt"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod byte_builder;
mod compound;
mod config;
mod content_disposition;
mod content_type;
mod error;
mod header;
mod header_info;
mod headers;
mod params;

pub mod charset;
pub mod decode;
pub mod encoded_word;
pub mod encoding;
pub mod escape;
pub mod lexer;

pub use byte_builder::ByteBuilder;
pub use charset::{ChardetngDetector, Charset, CharsetDetector, CharsetMatch};
pub use compound::{CompoundValue, Normalizer, normalizer_for};
pub use config::{HeaderConfig, HeaderConfigBuilder, MAX_HEADER_LENGTH};
pub use content_disposition::{ContentDisposition, DispositionType};
pub use content_type::{ContentType, DEFAULT_CONTENT_TYPE};
pub use encoded_word::{FatalHandler, WordEncoding};
pub use error::{Error, Result};
pub use header::{DEFAULT_CHARSET, InternetHeader};
pub use header_info::HeaderInfo;
pub use headers::InternetHeaders;
pub use params::{MimeParams, ParamEncoding};
