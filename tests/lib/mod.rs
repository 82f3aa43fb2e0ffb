#![allow(dead_code)]

mod limited;
pub use limited::Limited;

use std::path::{Path, PathBuf};

use http::{header, HeaderMap, HeaderValue};

pub fn tracing_init() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // From env var: `RUST_LOG`
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

pub fn headers(boundary: &str, length: usize) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}")).unwrap(),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers
}

pub enum Part<'a> {
    Field(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: Option<&'a str>,
        data: &'a [u8],
    },
}

/// Builds a multipart body with the given line terminator.
pub fn body(boundary: &str, eol: &str, parts: &[Part<'_>]) -> Vec<u8> {
    let mut buf = Vec::new();

    for part in parts {
        buf.extend_from_slice(format!("--{boundary}{eol}").as_bytes());
        match part {
            Part::Field(name, value) => {
                buf.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"{eol}{eol}{value}{eol}")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                buf.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"{eol}"
                    )
                    .as_bytes(),
                );
                if let Some(content_type) = content_type {
                    buf.extend_from_slice(format!("Content-Type: {content_type}{eol}").as_bytes());
                }
                buf.extend_from_slice(eol.as_bytes());
                buf.extend_from_slice(data);
                buf.extend_from_slice(eol.as_bytes());
            }
        }
    }

    buf.extend_from_slice(format!("--{boundary}--{eol}").as_bytes());
    buf
}

/// Lists the files in `dir`.
pub fn spooled(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(Result::ok).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}
