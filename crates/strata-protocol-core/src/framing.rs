use crate::cipher::CipherStream;
use crate::codec::{read_varint, write_varint};
use crate::compression::CompressionCodec;
use crate::error::FrameError;
use bytes::{Bytes, BytesMut};
use tracing::trace;

/// Largest frame a three-byte VarInt length can describe (2^21 - 1).
pub const MAX_FRAME_LENGTH: usize = 2_097_151;

/// One length-delimited packet.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: i32,
    /// Packet body after the id, decompressed.
    pub body: BytesMut,
    /// The plaintext frame exactly as it arrived, length prefix included.
    /// Forwarding this avoids recompressing packets the proxy does not touch.
    pub raw: Bytes,
}

impl Frame {
    /// `id + body` as the compression layer sees it.
    pub fn packet_bytes(&self) -> BytesMut {
        packet_bytes(self.id, &self.body)
    }
}

/// `id + payload` for a packet that is about to be framed.
pub fn packet_bytes(id: i32, payload: &[u8]) -> BytesMut {
    let mut packet = BytesMut::with_capacity(payload.len() + 5);
    write_varint(&mut packet, id);
    packet.extend_from_slice(payload);
    packet
}

/// Accumulates bytes from one socket and cuts them into frames.
///
/// Bytes are decrypted lazily at parse time, so a cipher installed between two
/// frames that are already buffered only applies to the bytes after the boundary.
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: BytesMut,
    /// Leading bytes of `buf` already run through the cipher. Always 0 while
    /// the cipher is off.
    decrypted: usize,
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            decrypted: 0,
        }
    }

    /// Append raw bytes exactly as read from the socket.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop anything buffered, e.g. after a framing error.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.decrypted = 0;
    }

    /// Cut the next complete frame, if one is buffered.
    pub fn next_frame(
        &mut self,
        cipher: &mut CipherStream,
        compression: &CompressionCodec,
    ) -> Result<Option<Frame>, FrameError> {
        if cipher.is_enabled() && self.decrypted < self.buf.len() {
            let start = self.decrypted;
            cipher.decrypt(&mut self.buf[start..]);
            self.decrypted = self.buf.len();
        }

        let Some((length, prefix)) = peek_length(&self.buf)? else {
            return Ok(None);
        };
        if self.buf.len() < prefix + length {
            return Ok(None);
        }

        let raw = self.buf.split_to(prefix + length).freeze();
        if cipher.is_enabled() {
            self.decrypted -= prefix + length;
        } else {
            self.decrypted = 0;
        }

        let mut packet = compression.decode(BytesMut::from(&raw[prefix..]))?;
        let id = read_varint(&mut packet)?;
        trace!("Read frame id=0x{:02X} len={}", id, packet.len());

        Ok(Some(Frame {
            id,
            body: packet,
            raw,
        }))
    }
}

/// Parse the VarInt length prefix without consuming it.
/// Returns `(length, prefix_bytes)`, or `None` if the prefix is incomplete.
fn peek_length(buf: &[u8]) -> Result<Option<(usize, usize)>, FrameError> {
    let mut length: usize = 0;
    for (i, byte) in buf.iter().take(3).enumerate() {
        length |= ((byte & 0x7F) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            if length == 0 {
                return Err(FrameError::MalformedLength);
            }
            return Ok(Some((length, i + 1)));
        }
    }
    if buf.len() >= 3 {
        return Err(FrameError::MalformedLength);
    }
    Ok(None)
}

/// Build a plaintext wire frame from `id + payload`.
pub fn encode_frame(packet: &[u8], compression: &CompressionCodec) -> Result<BytesMut, FrameError> {
    let body = compression.encode(packet)?;
    if body.len() > MAX_FRAME_LENGTH {
        return Err(FrameError::Oversized(body.len(), MAX_FRAME_LENGTH));
    }
    let mut frame = BytesMut::with_capacity(body.len() + 3);
    write_varint(&mut frame, body.len() as i32);
    frame.extend_from_slice(&body);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: [u8; 16] = [7u8; 16];

    fn frame(id: i32, payload: &[u8], compression: &CompressionCodec) -> BytesMut {
        encode_frame(&packet_bytes(id, payload), compression).unwrap()
    }

    #[test]
    fn test_split_across_reads() {
        let compression = CompressionCodec::new();
        let mut cipher = CipherStream::new();
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&frame(0x00, b"first", &compression));
        wire.extend_from_slice(&frame(0x21, &[9u8; 300], &compression));

        for split in [1, 2, 7, wire.len() - 1] {
            let mut reader = FrameReader::new();
            reader.push(&wire[..split]);
            let mut frames = Vec::new();
            while let Some(f) = reader.next_frame(&mut cipher, &compression).unwrap() {
                frames.push(f);
            }
            reader.push(&wire[split..]);
            while let Some(f) = reader.next_frame(&mut cipher, &compression).unwrap() {
                frames.push(f);
            }
            assert_eq!(frames.len(), 2, "split at {}", split);
            assert_eq!(frames[0].id, 0x00);
            assert_eq!(&frames[0].body[..], b"first");
            assert_eq!(frames[1].id, 0x21);
            assert_eq!(frames[1].body.len(), 300);
            assert_eq!(reader.buffered(), 0);
        }
    }

    #[test]
    fn test_raw_is_forwardable() {
        let mut compression = CompressionCodec::new();
        compression.enable(64);
        let mut cipher = CipherStream::new();
        let wire = frame(0x22, &[1u8; 500], &compression);
        let mut reader = FrameReader::new();
        reader.push(&wire);
        let f = reader.next_frame(&mut cipher, &compression).unwrap().unwrap();
        assert_eq!(&f.raw[..], &wire[..]);
        assert_eq!(f.body.len(), 500);
    }

    #[test]
    fn test_cipher_enabled_between_buffered_frames() {
        let compression = CompressionCodec::new();
        let mut plain_first = frame(0x01, b"encryption response", &compression);
        let mut second = frame(0x05, b"after the switch", &compression);

        let mut sender = CipherStream::new();
        sender.enable(&SECRET);
        sender.encrypt(&mut second);

        let mut reader = FrameReader::new();
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&plain_first.split());
        wire.extend_from_slice(&second);
        reader.push(&wire);

        let mut cipher = CipherStream::new();
        let first = reader.next_frame(&mut cipher, &compression).unwrap().unwrap();
        assert_eq!(first.id, 0x01);

        cipher.enable(&SECRET);
        let next = reader.next_frame(&mut cipher, &compression).unwrap().unwrap();
        assert_eq!(next.id, 0x05);
        assert_eq!(&next.body[..], b"after the switch");
    }

    #[test]
    fn test_encrypted_stream_in_pieces() {
        let compression = CompressionCodec::new();
        let mut sender = CipherStream::new();
        sender.enable(&SECRET);
        let mut wire = frame(0x10, &[3u8; 40], &compression);
        wire.extend_from_slice(&frame(0x11, &[4u8; 3], &compression));
        sender.encrypt(&mut wire);

        let mut cipher = CipherStream::new();
        cipher.enable(&SECRET);
        let mut reader = FrameReader::new();
        let mut ids = Vec::new();
        for piece in wire.chunks(5) {
            reader.push(piece);
            while let Some(f) = reader.next_frame(&mut cipher, &compression).unwrap() {
                ids.push(f.id);
            }
        }
        assert_eq!(ids, vec![0x10, 0x11]);
    }

    #[test]
    fn test_malformed_length() {
        let compression = CompressionCodec::new();
        let mut cipher = CipherStream::new();
        let mut reader = FrameReader::new();
        reader.push(&[0xFF, 0xFF, 0xFF, 0x01]);
        assert!(matches!(
            reader.next_frame(&mut cipher, &compression),
            Err(FrameError::MalformedLength)
        ));

        let mut reader = FrameReader::new();
        reader.push(&[0x00]);
        assert!(reader.next_frame(&mut cipher, &compression).is_err());
    }

    #[test]
    fn test_corrupt_compressed_frame() {
        let mut compression = CompressionCodec::new();
        compression.enable(0);
        let mut cipher = CipherStream::new();
        let mut body = BytesMut::new();
        write_varint(&mut body, 100);
        body.extend_from_slice(&[0xAB; 20]);
        let mut wire = BytesMut::new();
        write_varint(&mut wire, body.len() as i32);
        wire.extend_from_slice(&body);

        let mut reader = FrameReader::new();
        reader.push(&wire);
        assert!(reader.next_frame(&mut cipher, &compression).is_err());
    }
}
