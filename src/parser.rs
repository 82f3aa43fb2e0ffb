use std::{fmt, mem, path::PathBuf};

use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, trace};

use crate::{
    cleanup,
    part::Part,
    utils::{read_line, sniff_eol, DASHES},
    Error, Flag, Form, Options, Result,
};

/// One parse session over one multipart body.
///
/// Chunks are pushed with [`Parser::write`], then [`Parser::end`] assembles
/// the [`Form`]. File parts are spooled under the configured temp directory
/// and removed `cleanup_delay` after the session is terminated, which
/// happens on [`Parser::terminate`], on any error and on drop.
pub struct Parser {
    /// `--boundary`
    delimiter: Bytes,
    /// `eol` + `--boundary`, set together with `eol`
    separator: Bytes,
    eol: Option<&'static [u8]>,
    parts: Vec<Part>,
    spooled: Vec<PathBuf>,
    length: u64,
    ended: bool,
    failed: bool,
    terminated: bool,
    temp_dir: PathBuf,
    options: Options,
    rng: StdRng,
}

impl Parser {
    /// Creates new Parser for `boundary`, without the leading `--`.
    #[must_use]
    pub fn new(boundary: &str, options: Options) -> Self {
        let mut delimiter = BytesMut::with_capacity(DASHES.len() + boundary.len());
        delimiter.extend_from_slice(&DASHES);
        delimiter.extend_from_slice(boundary.as_bytes());

        Self {
            delimiter: delimiter.freeze(),
            separator: Bytes::new(),
            eol: None,
            parts: vec![Part::new(BytesMut::new())],
            spooled: Vec::new(),
            length: 0,
            ended: false,
            failed: false,
            terminated: false,
            temp_dir: options.temp_path(),
            options,
            rng: StdRng::from_entropy(),
        }
    }

    /// Gets the number of bytes received so far.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.length
    }

    /// Gets the detected line terminator.
    #[must_use]
    pub fn eol(&self) -> Option<&'static [u8]> {
        self.eol
    }

    /// Gets the state of the current part.
    #[must_use]
    pub fn flag(&self) -> Option<Flag> {
        self.parts.last().map(|p| p.flag)
    }

    /// Gets the boundary.
    #[must_use]
    pub fn boundary(&self) -> &[u8] {
        &self.delimiter[DASHES.len()..]
    }

    /// Feeds the next chunk of the body.
    ///
    /// # Errors
    ///
    /// Any parse error, the session is terminated before it is returned.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        if self.ended || self.failed || self.terminated {
            return Err(Error::InvalidState);
        }

        self.length += chunk.len() as u64;
        trace!("received {} bytes, {} total", chunk.len(), self.length);

        if let Some(max) = self.options.checked_payload(self.length) {
            return Err(self.fail(Error::PayloadTooLarge(max)));
        }

        match self.parts.last_mut() {
            Some(part) => part.buffer.extend_from_slice(chunk),
            None => return Err(self.fail(Error::InvalidState)),
        }

        match self.process().await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Marks the end of the body and assembles the form.
    ///
    /// The spooled files stay in place until the session is terminated
    /// and the cleanup delay has elapsed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidMetadata`] if no boundary was found or the last
    /// part headers are incomplete.
    pub async fn end(&mut self) -> Result<Form> {
        if self.ended || self.failed || self.terminated {
            return Err(Error::InvalidState);
        }

        self.ended = true;

        match self.finish().await {
            Ok(form) => Ok(form),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Closes open sinks and schedules removal of the spooled files.
    ///
    /// Idempotent, also run on drop.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        for part in &mut self.parts {
            part.close_now();
        }
        self.parts.clear();

        debug!(
            "session terminated, {} bytes, {} spooled files",
            self.length,
            self.spooled.len()
        );

        cleanup::schedule(mem::take(&mut self.spooled), self.options.delay());
    }

    fn fail(&mut self, e: Error) -> Error {
        if !self.failed {
            self.failed = true;
            debug!("parse failed: {}", e);
        }
        self.terminate();
        e
    }

    async fn finish(&mut self) -> Result<Form> {
        self.process().await?;

        // the boundary never showed up
        if matches!(
            self.parts.first().map(|p| p.flag),
            None | Some(Flag::Start | Flag::StartBoundary)
        ) {
            return Err(Error::InvalidMetadata);
        }

        if self.parts.last().is_some_and(|p| p.flag != Flag::End) {
            if let Some(mut part) = self.parts.pop() {
                trace!("discarding trailing part {:?}", part);
                part.close().await?;
            }
        }

        let parts = mem::take(&mut self.parts);
        Ok(Form::assemble(parts.into_iter().filter_map(Part::into_entry)))
    }

    /// Runs the machine until it needs more input.
    async fn process(&mut self) -> Result<()> {
        loop {
            let flag = self.parts.last().ok_or(Error::InvalidState)?.flag;

            let next = match flag {
                Flag::Start => Some(Flag::StartBoundary),
                Flag::StartBoundary => self.start_boundary()?,
                Flag::HeaderFieldStart => self.header_field_start()?,
                Flag::PartDataStart => {
                    let part = self.parts.last_mut().ok_or(Error::InvalidState)?;
                    if let Some(path) = part.open().await? {
                        self.spooled.push(path);
                    }
                    Some(Flag::PartData)
                }
                Flag::PartData => self.part_data().await?,
                Flag::End => {
                    self.next_part()?;
                    continue;
                }
                Flag::Epilogue => {
                    let part = self.parts.last_mut().ok_or(Error::InvalidState)?;
                    part.buffer.clear();
                    None
                }
            };

            match next {
                Some(next) => {
                    trace!("{:?} -> {:?}", flag, next);
                    self.parts.last_mut().ok_or(Error::InvalidState)?.flag = next;
                }
                None => return Ok(()),
            }
        }
    }

    fn start_boundary(&mut self) -> Result<Option<Flag>> {
        let ended = self.ended;
        let delimiter = self.delimiter.clone();
        let part = self.parts.last_mut().ok_or(Error::InvalidState)?;

        let Some(n) = memmem::find(&part.buffer, &delimiter) else {
            // preamble, keep only what could be the head of a split boundary
            let keep = delimiter.len() - 1;
            if part.buffer.len() > keep {
                let skip = part.buffer.len() - keep;
                part.buffer.advance(skip);
            }
            return Ok(None);
        };

        let rest = &part.buffer[n + delimiter.len()..];

        if rest.len() < DASHES.len() && !ended {
            return Ok(None);
        }

        if rest.starts_with(&DASHES) || rest.is_empty() {
            debug!("closing boundary");
            part.buffer.clear();
            return Ok(Some(Flag::Epilogue));
        }

        let eol = match self.eol {
            Some(eol) => eol,
            None => {
                let eol = sniff_eol(&part.buffer, &delimiter);
                trace!("line terminator {:?}", String::from_utf8_lossy(eol));
                let mut separator = BytesMut::with_capacity(eol.len() + delimiter.len());
                separator.extend_from_slice(eol);
                separator.extend_from_slice(&delimiter);
                self.separator = separator.freeze();
                self.eol = Some(eol);
                eol
            }
        };

        if !part.buffer[n + delimiter.len()..].starts_with(eol) {
            return Err(Error::InvalidMetadata);
        }

        part.buffer.advance(n + delimiter.len() + eol.len());

        Ok(Some(Flag::HeaderFieldStart))
    }

    fn header_field_start(&mut self) -> Result<Option<Flag>> {
        if let Some(max) = self.options.checked_parts(self.parts.len()) {
            return Err(Error::PartsTooMany(max));
        }

        let ended = self.ended;
        let eol = self.eol.ok_or(Error::InvalidState)?;
        let part = self.parts.last_mut().ok_or(Error::InvalidState)?;
        let buf = &part.buffer[..];

        // while incomplete, everything buffered belongs to the header section
        let oversized = self.options.checked_header_size(buf.len());
        let incomplete = || match (ended, oversized) {
            (true, _) => Err(Error::InvalidMetadata),
            (false, Some(max)) => Err(Error::HeadersTooLarge(max)),
            (false, None) => Ok(None),
        };

        let start = if buf.starts_with(eol) { eol.len() } else { 0 };

        let Some((disposition, next)) = read_line(buf, start, eol) else {
            return incomplete();
        };
        let Some((second, mut next)) = read_line(buf, next, eol) else {
            return incomplete();
        };

        // an empty second line is the separator of a part without `Content-Type`
        let content_type = if second.is_empty() {
            None
        } else {
            match buf.get(next..) {
                Some(rest) if rest.starts_with(eol) => next += eol.len(),
                Some(rest) if rest.len() < eol.len() && !ended => return incomplete(),
                _ => {}
            }
            Some(second.to_vec())
        };
        let disposition = disposition.to_vec();

        part.classify(
            &disposition,
            content_type.as_deref(),
            &self.temp_dir,
            &mut self.rng,
        )?;
        part.buffer.advance(next);

        Ok(Some(Flag::PartDataStart))
    }

    async fn part_data(&mut self) -> Result<Option<Flag>> {
        let eol = self.eol.ok_or(Error::InvalidState)?;
        let separator = self.separator.clone();
        let part = self.parts.last_mut().ok_or(Error::InvalidState)?;

        match memmem::find(&part.buffer, &separator) {
            Some(n) => {
                part.flush(n).await?;
                part.buffer.advance(eol.len());
                part.close().await?;
                Ok(Some(Flag::End))
            }
            None => {
                // a boundary may be split across chunks, keep room for it and `--`
                let margin = separator.len() + DASHES.len();
                let n = part.buffer.len().saturating_sub(margin);
                if n > 0 {
                    part.flush(n).await?;
                }
                Ok(None)
            }
        }
    }

    fn next_part(&mut self) -> Result<()> {
        let part = self.parts.last_mut().ok_or(Error::InvalidState)?;
        let rest = part.buffer.split();
        self.parts.push(Part::new(rest));
        Ok(())
    }
}

impl Drop for Parser {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("boundary", &String::from_utf8_lossy(self.boundary()))
            .field("eol", &self.eol.map(String::from_utf8_lossy))
            .field("parts", &self.parts)
            .field("length", &self.length)
            .field("ended", &self.ended)
            .field("failed", &self.failed)
            .field("terminated", &self.terminated)
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}
