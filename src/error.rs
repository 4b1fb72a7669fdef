use crate::base::VInt64;

/// Error types for this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error, from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zero first byte, or a reserved unknown-length marker where one isn't allowed.
    #[error("invalid variable-length integer encoding")]
    InvalidVint,

    /// Attempted to read past the end of the buffer.
    #[error("attempted to read past the end of the buffer")]
    OutOfBounds,

    /// Attempted to read past the end of the buffer during element body decoding.
    #[error("element body over decode, ID: {0}")]
    OverDecode(VInt64),

    /// Not all bytes were consumed in an element body.
    #[error("short read: not all bytes were consumed")]
    ShortRead,

    /// Not all bytes were consumed in an element body during element body decoding.
    #[error("element body under decode, ID: {0}")]
    UnderDecode(VInt64),

    /// Element body size is unknown where this core requires a known size.
    #[error("element body size is unknown, ID: {0}")]
    ElementBodySizeUnknown(VInt64),

    /// Not an EBML stream, DocType isn't "webm", or DocTypeReadVersion exceeds what this
    /// implementation supports.
    #[error("invalid EBML/WebM header")]
    InvalidHeader,

    /// Premature end of buffer while reading a VINT, element header, or payload.
    #[error("truncated input")]
    Truncated,

    /// A required child is missing (e.g. a Cluster with no Timecode, a TrackEntry with no
    /// TrackType), a child appears more than once where only one is permitted, or children
    /// appear out of the permitted order.
    #[error("invalid element structure, ID: {0}")]
    InvalidStructure(VInt64),

    /// Frame iteration was requested on a Segment with no Tracks element.
    #[error("segment has no Tracks element")]
    MissingTracks,

    /// Two TrackEntry records share a TrackNumber.
    #[error("duplicate track number: {0}")]
    DuplicateTrackNumber(u64),

    /// A caller-supplied codec_id is not in the Codec Registry. Only raised by the muxer; the
    /// parser never raises this.
    #[error("unsupported codec id: {0}")]
    UnsupportedCodec(String),

    /// Lacing byte count inconsistent with payload size.
    #[error("invalid lacing data")]
    InvalidLacing,

    /// A block's absolute timestamp would be negative (strict mode).
    #[error("negative timestamp")]
    NegativeTimestamp,

    /// The muxer received a frame with a timestamp strictly less than the previous one written
    /// to the same track.
    #[error("out-of-order frame on track {track}: {timestamp_ns}ns < last {last_ns}ns")]
    OutOfOrderFrame {
        /// Track number the frame was written to.
        track: u64,
        /// Timestamp of the rejected frame, in nanoseconds.
        timestamp_ns: u64,
        /// Timestamp of the last frame accepted on this track, in nanoseconds.
        last_ns: u64,
    },

    /// The muxer's actual element size exceeds the reserved back-patch width. Indicates a bug
    /// in the cluster boundary policy; never surfaced by a correct implementation.
    #[error("size field overflow for reserved width {reserved} bytes, needed {actual}")]
    SizeFieldOverflow {
        /// Width reserved at emission time, in bytes.
        reserved: usize,
        /// Bytes actually needed to encode the size.
        actual: usize,
    },

    /// Empty payload, zero dimensions, or an unknown track handle.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
