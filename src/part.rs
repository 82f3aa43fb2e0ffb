use std::{
    fmt, mem,
    path::{Path, PathBuf},
};

use bytes::BytesMut;
use rand::{distributions::Alphanumeric, rngs::StdRng, Rng};
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::{debug, trace};

use crate::{
    form::{Entry, FileInfo},
    state::Flag,
    utils::{parse_content_disposition, parse_content_type},
    Error, Result,
};

const TEMP_NAME_LEN: usize = 32;

/// Append handle of a file part.
pub(crate) enum Sink {
    Unopened,
    Open(File),
    Closed,
}

/// What a part turned out to be.
pub(crate) enum Kind {
    Pending,
    File {
        name: String,
        filename: String,
        path: PathBuf,
        sink: Sink,
    },
    Parameter {
        name: String,
        data: BytesMut,
    },
}

/// One segment of the multipart body.
pub(crate) struct Part {
    pub(crate) kind: Kind,
    pub(crate) content_type: Option<String>,
    pub(crate) size: u64,
    pub(crate) flag: Flag,
    pub(crate) buffer: BytesMut,
}

impl Part {
    /// Creates a pending part seeded with leftover bytes.
    pub(crate) fn new(buffer: BytesMut) -> Self {
        Self {
            kind: Kind::Pending,
            content_type: None,
            size: 0,
            flag: Flag::Start,
            buffer,
        }
    }

    /// Classifies the part from its `Content-Disposition` and `Content-Type` lines.
    pub(crate) fn classify(
        &mut self,
        disposition: &[u8],
        content_type: Option<&[u8]>,
        temp_dir: &Path,
        rng: &mut StdRng,
    ) -> Result<()> {
        if !matches!(self.kind, Kind::Pending) {
            return Err(Error::InvalidState);
        }

        let content_type = content_type.and_then(parse_content_type);

        self.kind = match parse_content_disposition(disposition) {
            (Some(name), Some(filename)) => {
                let path = temp_dir.join(temp_name(rng));
                debug!("file part {} {:?} -> {}", name, filename, path.display());
                self.content_type = content_type;
                Kind::File {
                    name,
                    filename,
                    path,
                    sink: Sink::Unopened,
                }
            }
            (Some(name), None) => {
                debug!("parameter part {}", name);
                self.content_type = content_type;
                Kind::Parameter {
                    name,
                    data: BytesMut::new(),
                }
            }
            (None, _) => return Err(Error::InvalidMetadata),
        };

        Ok(())
    }

    /// Opens the append sink of a file part, once, creating the temp
    /// directory if absent.
    ///
    /// Returns the path when a file was created.
    pub(crate) async fn open(&mut self) -> Result<Option<PathBuf>> {
        if let Kind::File { path, sink, .. } = &mut self.kind {
            if let Sink::Unopened = sink {
                if let Some(dir) = path.parent() {
                    tokio::fs::create_dir_all(dir).await?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path.as_path())
                    .await?;
                *sink = Sink::Open(file);
                return Ok(Some(path.clone()));
            }
        }
        Ok(None)
    }

    /// Moves the first `n` buffered bytes into the sink.
    pub(crate) async fn flush(&mut self, n: usize) -> Result<()> {
        if n > self.buffer.len() {
            return Err(Error::CouldNotFlushBuffer);
        }

        match &mut self.kind {
            Kind::File {
                sink: Sink::Open(file),
                ..
            } => {
                let buf = self.buffer.split_to(n);
                file.write_all(&buf).await?;
            }
            Kind::Parameter { data, .. } => {
                let buf = self.buffer.split_to(n);
                data.extend_from_slice(&buf);
            }
            _ => return Err(Error::CouldNotFlushBuffer),
        }

        self.size += n as u64;
        trace!("flushed {} bytes, {} total", n, self.size);

        Ok(())
    }

    /// Flushes and closes an open file sink.
    pub(crate) async fn close(&mut self) -> Result<()> {
        if let Kind::File { sink, .. } = &mut self.kind {
            if let Sink::Open(mut file) = mem::replace(sink, Sink::Closed) {
                file.flush().await?;
            }
        }
        Ok(())
    }

    /// Drops an open file sink without waiting for pending writes.
    pub(crate) fn close_now(&mut self) {
        if let Kind::File { sink, .. } = &mut self.kind {
            if let Sink::Open(file) = mem::replace(sink, Sink::Closed) {
                drop(file);
            }
        }
    }

    /// Reshapes a finished part for the result, dropping its transient state.
    pub(crate) fn into_entry(self) -> Option<Entry> {
        let size = self.size;
        let content_type = self.content_type;

        match self.kind {
            Kind::Pending => None,
            Kind::File {
                name,
                filename,
                path,
                ..
            } => Some(Entry::File(FileInfo {
                name: filename,
                field: name,
                path,
                content_type,
                size,
            })),
            Kind::Parameter { name, data } => Some(Entry::Field(
                name,
                String::from_utf8_lossy(&data).into_owned(),
            )),
        }
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, name) = match &self.kind {
            Kind::Pending => ("pending", None),
            Kind::File { name, .. } => ("file", Some(name)),
            Kind::Parameter { name, .. } => ("parameter", Some(name)),
        };

        f.debug_struct("Part")
            .field("kind", &kind)
            .field("name", &name)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .field("flag", &self.flag)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

fn temp_name(rng: &mut StdRng) -> String {
    (0..TEMP_NAME_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn classify_file() {
        let mut part = Part::new(BytesMut::new());
        part.classify(
            br#"Content-Disposition: form-data; name="file"; filename="a.txt""#,
            Some(&b"Content-Type: text/plain"[..]),
            Path::new("/tmp/spool"),
            &mut rng(),
        )
        .unwrap();

        assert_eq!(part.content_type.as_deref(), Some("text/plain"));
        match &part.kind {
            Kind::File {
                name,
                filename,
                path,
                ..
            } => {
                assert_eq!(name, "file");
                assert_eq!(filename, "a.txt");
                assert!(path.starts_with("/tmp/spool"));
                assert_eq!(
                    path.file_name().unwrap().len(),
                    TEMP_NAME_LEN,
                );
            }
            _ => panic!("expected a file part"),
        }
    }

    #[test]
    fn classify_parameter() {
        let mut part = Part::new(BytesMut::new());
        part.classify(
            br#"Content-Disposition: form-data; name="text""#,
            None,
            Path::new("/tmp"),
            &mut rng(),
        )
        .unwrap();

        assert!(part.content_type.is_none());
        assert!(matches!(&part.kind, Kind::Parameter { name, .. } if name == "text"));
    }

    #[test]
    fn classify_without_name() {
        let mut part = Part::new(BytesMut::new());
        let res = part.classify(
            br#"Content-Disposition: form-data; filename="a.txt""#,
            Some(&b"Content-Type: text/plain"[..]),
            Path::new("/tmp"),
            &mut rng(),
        );
        assert!(matches!(res, Err(Error::InvalidMetadata)));

        let res = part.classify(b"Content-Disposition: form-data", None, Path::new("/tmp"), &mut rng());
        assert!(matches!(res, Err(Error::InvalidMetadata)));
    }

    #[test]
    fn temp_names_differ() {
        let mut rng = rng();
        assert_ne!(temp_name(&mut rng), temp_name(&mut rng));
    }

    #[tokio::test]
    async fn flush_before_classify() {
        let mut part = Part::new(BytesMut::from(&b"abc"[..]));
        assert!(matches!(part.flush(1).await, Err(Error::CouldNotFlushBuffer)));
        assert_eq!(part.size, 0);
        assert_eq!(part.buffer.len(), 3);
    }

    #[tokio::test]
    async fn flush_parameter() {
        let mut part = Part::new(BytesMut::from(&b"hello world"[..]));
        part.classify(
            br#"Content-Disposition: form-data; name="text""#,
            None,
            Path::new("/tmp"),
            &mut rng(),
        )
        .unwrap();

        part.flush(5).await.unwrap();
        assert_eq!(part.size, 5);
        assert_eq!(&part.buffer[..], b" world");
        assert!(matches!(part.flush(100).await, Err(Error::CouldNotFlushBuffer)));

        match part.into_entry() {
            Some(Entry::Field(name, value)) => {
                assert_eq!(name, "text");
                assert_eq!(value, "hello");
            }
            _ => panic!("expected a field"),
        }
    }

    #[tokio::test]
    async fn flush_closed_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut part = Part::new(BytesMut::from(&b"0123456789"[..]));
        part.classify(
            br#"Content-Disposition: form-data; name="f"; filename="x.bin""#,
            Some(&b"Content-Type: application/octet-stream"[..]),
            dir.path(),
            &mut rng(),
        )
        .unwrap();

        let path = part.open().await.unwrap().unwrap();
        assert!(part.open().await.unwrap().is_none());

        part.flush(4).await.unwrap();
        part.close().await.unwrap();
        assert!(matches!(part.flush(1).await, Err(Error::CouldNotFlushBuffer)));

        assert_eq!(std::fs::read(&path).unwrap(), b"0123");
        match part.into_entry() {
            Some(Entry::File(info)) => {
                assert_eq!(info.name, "x.bin");
                assert_eq!(info.field, "f");
                assert_eq!(info.size, 4);
                assert_eq!(info.path, path);
            }
            _ => panic!("expected a file"),
        }
    }

    #[tokio::test]
    async fn open_creates_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut part = Part::new(BytesMut::new());
        part.classify(
            br#"Content-Disposition: form-data; name="f"; filename="x.bin""#,
            None,
            &nested,
            &mut rng(),
        )
        .unwrap();

        let path = part.open().await.unwrap().unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }
}
