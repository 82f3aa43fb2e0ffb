use std::error::Error as StdError;

use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use http::{HeaderMap, Request};
use tracing::{debug, trace};

use crate::{Error, Form, Integrity, Options, Parser, Result};

/// Parses a `multipart/form-data` body delivered as a stream of chunks.
///
/// The declared `Content-Length` is checked against `max_payload` of
/// [`Options`] before the first chunk is read. Dropping the
/// returned future cancels the parse and removes whatever was spooled.
///
/// # Errors
///
/// [`Error::MissingBoundaryOrLength`], [`Error::PayloadTooLarge`], any
/// parse error, or the error of `body` wrapped in [`Error::BoxError`].
pub async fn parse<S, B, E>(headers: &HeaderMap, mut body: S, options: &Options) -> Result<Form>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: Into<Bytes>,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    let integrity = Integrity::from_headers(headers)?;

    if let Some(max) = options.checked_payload(integrity.length) {
        debug!("declared length {} is over {}", integrity.length, max);
        return Err(Error::PayloadTooLarge(max));
    }

    tokio::fs::create_dir_all(options.temp_path()).await?;

    let mut parser = Parser::new(&integrity.boundary, options.clone());

    trace!("polling data from stream");

    while let Some(chunk) = body.next().await {
        let chunk: Bytes = chunk.map_err(|e| Error::BoxError(e.into()))?.into();
        parser.write(&chunk).await?;
    }

    let form = parser.end().await?;
    parser.terminate();

    Ok(form)
}

/// Parses the body of a `multipart/form-data` request.
///
/// # Errors
///
/// See [`parse`].
pub async fn parse_request<S, B, E>(req: Request<S>, options: &Options) -> Result<Form>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: Into<Bytes>,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    parse(&parts.headers, body, options).await
}
