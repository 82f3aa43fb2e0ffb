/// Steps of the per-part state machine.
///
/// A part walks `Start` → `StartBoundary` → `HeaderFieldStart` →
/// `PartDataStart` → `PartData` → `End`, then a fresh part starts over.
/// `Epilogue` is only entered after the closing `--boundary--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Entry
    Start,
    /// Looking for the boundary
    StartBoundary,
    /// Reading the part headers
    HeaderFieldStart,
    /// Opening the sink
    PartDataStart,
    /// Streaming payload bytes into the sink
    PartData,
    /// The part is complete
    End,
    /// The closing boundary was seen, trailing bytes are ignored
    Epilogue,
}
