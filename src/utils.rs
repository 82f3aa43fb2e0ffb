use http::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use memchr::memmem;

use crate::{Error, Result};

pub(crate) const DASHES: [u8; 2] = [b'-', b'-']; // `--`
pub(crate) const CRLF: [u8; 2] = [b'\r', b'\n']; // `\r\n`
pub(crate) const LF: [u8; 1] = [b'\n']; // `\n`
pub(crate) const CR: [u8; 1] = [b'\r']; // `\r`

/// Line terminators in the order they are tried.
const EOLS: [&[u8]; 3] = [&CRLF, &LF, &CR];

const NAME: &[u8; 4] = b"name";
const FILE_NAME: &[u8; 8] = b"filename";

/// Boundary and declared length of a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integrity {
    /// The boundary token, without the leading `--`.
    pub boundary: String,
    /// The declared `Content-Length`.
    pub length: u64,
}

impl Integrity {
    /// Extracts the boundary from `Content-Type` and the declared `Content-Length`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingBoundaryOrLength`] if either one is missing or unusable.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or(Error::MissingBoundaryOrLength)?;

        let boundary = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<mime::Mime>().ok())
            .and_then(|m| {
                m.get_param(mime::BOUNDARY)
                    .map(|b| b.as_str().trim_matches('"').to_owned())
            })
            .filter(|b| !b.is_empty())
            .ok_or(Error::MissingBoundaryOrLength)?;

        Ok(Self { boundary, length })
    }
}

/// Picks the line terminator that follows the delimiter `--boundary`.
///
/// Falls back to `\r\n` when none of them matches.
pub(crate) fn sniff_eol(buf: &[u8], delimiter: &[u8]) -> &'static [u8] {
    let mut needle = Vec::with_capacity(delimiter.len() + 2);
    for eol in EOLS {
        needle.clear();
        needle.extend_from_slice(delimiter);
        needle.extend_from_slice(eol);
        if memmem::find(buf, &needle).is_some() {
            return eol;
        }
    }
    &CRLF
}

/// Reads one complete line starting at `from`.
///
/// Returns the line without its terminator and the offset just past it.
pub(crate) fn read_line<'a>(buf: &'a [u8], from: usize, eol: &[u8]) -> Option<(&'a [u8], usize)> {
    let rest = buf.get(from..)?;
    memmem::find(rest, eol).map(|n| (&rest[..n], from + n + eol.len()))
}

/// Matches the `name` and `filename` attributes of a `Content-Disposition` line.
pub(crate) fn parse_content_disposition(line: &[u8]) -> (Option<String>, Option<String>) {
    (
        disposition_param(line, NAME),
        disposition_param(line, FILE_NAME),
    )
}

fn disposition_param(line: &[u8], key: &[u8]) -> Option<String> {
    for n in memmem::find_iter(line, key) {
        // `name` must not match the tail of `filename`
        if n > 0 && !matches!(line[n - 1], b';' | b' ' | b'\t') {
            continue;
        }

        let Some(rest) = line[n + key.len()..].strip_prefix(b"=") else {
            continue;
        };

        let value = match rest.strip_prefix(b"\"") {
            Some(quoted) => &quoted[..memchr::memchr(b'"', quoted)?],
            None => {
                let end = rest
                    .iter()
                    .position(|b| matches!(b, b';' | b' ' | b'\t'))
                    .unwrap_or(rest.len());
                &rest[..end]
            }
        };

        return Some(String::from_utf8_lossy(value).into_owned()).filter(|v| !v.is_empty());
    }

    None
}

/// Reads the value of a `Content-Type` header line.
pub(crate) fn parse_content_type(line: &[u8]) -> Option<String> {
    let (name, value) = std::str::from_utf8(line).ok()?.split_once(':')?;

    if !name.trim().eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
        return None;
    }

    Some(value.trim().to_owned()).filter(|v| !v.is_empty())
}
