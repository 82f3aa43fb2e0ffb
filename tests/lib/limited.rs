use std::{
    fmt, io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_util::stream::Stream;
use rand::Rng;

pub const LIMITED: usize = 8 * 1024;

/// Yields a body in chunks of at most `limit` bytes.
pub struct Limited {
    body: Bytes,
    limit: usize,
    length: u64,
}

impl Limited {
    pub fn new(body: impl Into<Bytes>, limit: usize) -> Self {
        tracing::info!("Limited stream by {}", limit);

        Self {
            body: body.into(),
            limit,
            length: 0,
        }
    }

    pub fn random(body: impl Into<Bytes>) -> Self {
        Self::new(body, rand::thread_rng().gen_range(1..LIMITED))
    }

    pub fn random_with(body: impl Into<Bytes>, max: usize) -> Self {
        Self::new(body, rand::thread_rng().gen_range(1..max))
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl fmt::Debug for Limited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Limited")
            .field("limit", &self.limit)
            .field("length", &self.length)
            .field("remaining", &self.body.len())
            .finish()
    }
}

impl Stream for Limited {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.body.is_empty() {
            return Poll::Ready(None);
        }

        let n = self.limit.min(self.body.len());
        let chunk = self.body.split_to(n);
        self.length += n as u64;

        Poll::Ready(Some(Ok(chunk)))
    }
}
