//! Incremental `multipart/form-data` parser that spools file parts to disk.
//!
//! The body is consumed chunk by chunk without being buffered as a whole:
//! field values are collected in memory, file parts are appended to temp
//! files. The parsed [`Form`] lists both, and the temp files are removed a
//! short delay after the session ends, see [`Options`].
//!
//! CRLF, LF and CR line endings are all accepted, the one in use is
//! detected from the first boundary line.
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use futures_util::stream;
//! use http::{header, HeaderMap, HeaderValue};
//!
//! use form_spool::{parse, Error, Options};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Error> {
//! let body = "--XYZ\r\n\
//!     Content-Disposition: form-data; name=\"text\"\r\n\
//!     \r\n\
//!     hello\r\n\
//!     --XYZ--\r\n";
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(
//!     header::CONTENT_TYPE,
//!     HeaderValue::from_static("multipart/form-data; boundary=XYZ"),
//! );
//! headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
//!
//! let chunks = stream::iter([Ok::<_, std::io::Error>(Bytes::from_static(body.as_bytes()))]);
//! let form = parse(&headers, chunks, &Options::default()).await?;
//!
//! assert_eq!(form.field("text"), Some("hello"));
//! assert!(form.files.is_empty());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

mod cleanup;
mod error;
mod form;
mod options;
mod parser;
mod part;
mod state;
mod stream;
mod utils;

pub use error::Error;

pub use form::{FileInfo, Form};

pub use options::Options;

pub use parser::Parser;

pub use state::Flag;

pub use stream::{parse, parse_request};

pub use utils::Integrity;

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
