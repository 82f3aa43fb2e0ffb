use thiserror::Error;

/// Form-spool Error
#[derive(Debug, Error)]
pub enum Error {
    /// IO Error
    #[error(transparent)]
    Stream(#[from] std::io::Error),

    /// Box Error
    #[error(transparent)]
    BoxError(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// Content-Type has no boundary or Content-Length is missing
    #[error("missing boundary or content length")]
    MissingBoundaryOrLength,

    /// Payload too large
    #[error("payload is too large, limit to `{0}`")]
    PayloadTooLarge(u64),

    /// Part headers are malformed or incomplete
    #[error("invalid part metadata")]
    InvalidMetadata,

    /// Tried to write into a sink that is not writable
    #[error("could not flush buffer")]
    CouldNotFlushBuffer,

    /// The state machine reached an unreachable state
    #[error("invalid parser state")]
    InvalidState,

    /// Parts too many
    #[error("parts is too many, limit to `{0}`")]
    PartsTooMany(usize),

    /// Header section of a part too large
    #[error("part headers are too large, limit to `{0}`")]
    HeadersTooLarge(usize),
}
