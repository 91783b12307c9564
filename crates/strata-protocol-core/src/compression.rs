use crate::codec::{read_length, write_varint};
use crate::error::FrameError;
use bytes::BytesMut;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read as _, Write as _};

/// Upper bound on a declared uncompressed length (2^23, as vanilla enforces).
pub const MAX_UNCOMPRESSED_LENGTH: usize = 8_388_608;

/// Per-packet zlib framing, disabled until the server announces a threshold.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompressionCodec {
    threshold: Option<i32>,
}

impl CompressionCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A negative threshold disables compression, as in the set-compression packet.
    pub fn enable(&mut self, threshold: i32) {
        self.threshold = if threshold >= 0 { Some(threshold) } else { None };
    }

    pub fn reset(&mut self) {
        self.threshold = None;
    }

    pub fn threshold(&self) -> Option<i32> {
        self.threshold
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold.is_some()
    }

    /// Turn a frame body (everything after the outer length) into `id + payload`.
    pub fn decode(&self, mut body: BytesMut) -> Result<BytesMut, FrameError> {
        let Some(threshold) = self.threshold else {
            return Ok(body);
        };
        let declared = read_length(&mut body)?;
        if declared == 0 {
            return Ok(body);
        }
        if declared > MAX_UNCOMPRESSED_LENGTH {
            return Err(FrameError::Oversized(declared, MAX_UNCOMPRESSED_LENGTH));
        }
        if (declared as i64) < threshold as i64 {
            return Err(FrameError::BelowThreshold(declared, threshold));
        }
        let mut decompressed = Vec::with_capacity(declared);
        let mut decoder = ZlibDecoder::new(&body[..]).take(declared as u64 + 1);
        decoder
            .read_to_end(&mut decompressed)
            .map_err(FrameError::Decompress)?;
        if decompressed.len() != declared {
            return Err(FrameError::LengthMismatch {
                declared,
                actual: decompressed.len(),
            });
        }
        Ok(BytesMut::from(&decompressed[..]))
    }

    /// Turn `id + payload` into a frame body, compressing at or above the threshold.
    pub fn encode(&self, packet: &[u8]) -> Result<BytesMut, FrameError> {
        let mut body = BytesMut::with_capacity(packet.len() + 5);
        match self.threshold {
            None => body.extend_from_slice(packet),
            Some(threshold) if packet.len() as i64 >= threshold as i64 => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(packet).map_err(FrameError::Compress)?;
                let compressed = encoder.finish().map_err(FrameError::Compress)?;
                write_varint(&mut body, packet.len() as i32);
                body.extend_from_slice(&compressed);
            }
            Some(_) => {
                write_varint(&mut body, 0);
                body.extend_from_slice(packet);
            }
        }
        Ok(body)
    }
}
