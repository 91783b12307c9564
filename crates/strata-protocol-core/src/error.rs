use crate::codec::CodecError;
use crate::mode::{Direction, NetworkMode};
use thiserror::Error;

/// Fatal framing errors. Once one occurs the byte alignment of the stream can no
/// longer be trusted and the connection must be torn down.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed length prefix")]
    MalformedLength,
    #[error("frame length {0} exceeds limit {1}")]
    Oversized(usize, usize),
    #[error("declared uncompressed length {declared} but got {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("compressed frame below threshold: {0} < {1}")]
    BelowThreshold(usize, i32),
    #[error("decompression failed: {0}")]
    Decompress(#[source] std::io::Error),
    #[error("compression failed: {0}")]
    Compress(#[source] std::io::Error),
    #[error("bad frame contents: {0}")]
    Codec(#[from] CodecError),
}

/// Recoverable decode errors. The offending packet or chunk is dropped and the
/// relay carries on.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown packet 0x{id:02X} for {direction:?} {mode:?}")]
    UnknownPacket {
        direction: Direction,
        mode: NetworkMode,
        id: i32,
    },
    #[error("cannot encode {0} in this mode")]
    Unencodable(&'static str),
    #[error("truncated packet: {0}")]
    Codec(#[from] CodecError),
    #[error("bad NBT: {0}")]
    Nbt(String),
    #[error("palette index {index} out of range for palette of {len}")]
    PaletteIndex { index: u32, len: usize },
    #[error("bit width {0} out of range")]
    BitWidth(u8),
    #[error("packed array has {actual} words, expected {expected} for {bits} bits x {volume}")]
    PackedLength {
        bits: u8,
        volume: usize,
        expected: usize,
        actual: usize,
    },
    #[error("duplicate section {0}")]
    DuplicateSection(i32),
    #[error("{0}")]
    Malformed(String),
}
