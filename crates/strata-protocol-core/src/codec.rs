//! Primitive wire types shared by every packet codec.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("variable-length integer wider than {0} bits")]
    VarIntTooBig(u32),
    #[error("unexpected end of packet")]
    NotEnoughData,
    #[error("string of {0} bytes exceeds limit of {1} characters")]
    StringTooLong(usize, usize),
    #[error("negative length {0}")]
    NegativeLength(i32),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Low seven bits per byte, continuation in the high bit, least significant
/// group first. Fails once more than `bits` bits would be consumed.
fn read_var(buf: &mut BytesMut, bits: u32) -> CodecResult<u64> {
    let mut value = 0u64;
    for shift in (0..bits).step_by(7) {
        let byte = read_u8(buf)?;
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::VarIntTooBig(bits))
}

fn write_var(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8(value as u8 | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

pub fn read_varint(buf: &mut BytesMut) -> CodecResult<i32> {
    read_var(buf, 32).map(|v| v as u32 as i32)
}

/// Negative values always take five bytes.
pub fn write_varint(buf: &mut BytesMut, value: i32) {
    write_var(buf, u64::from(value as u32));
}

pub fn read_varlong(buf: &mut BytesMut) -> CodecResult<i64> {
    read_var(buf, 64).map(|v| v as i64)
}

pub fn write_varlong(buf: &mut BytesMut, value: i64) {
    write_var(buf, value as u64);
}

/// A VarInt used as a count or byte length.
pub fn read_length(buf: &mut BytesMut) -> CodecResult<usize> {
    match read_varint(buf)? {
        len if len < 0 => Err(CodecError::NegativeLength(len)),
        len => Ok(len as usize),
    }
}

/// Length-prefixed UTF-8. `max_chars` bounds the character count, so up to
/// four bytes per character are accepted.
pub fn read_string(buf: &mut BytesMut, max_chars: usize) -> CodecResult<String> {
    let len = read_length(buf)?;
    if len > max_chars.saturating_mul(4) {
        return Err(CodecError::StringTooLong(len, max_chars));
    }
    let bytes = take(buf, len)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn write_string(buf: &mut BytesMut, s: &str) {
    write_byte_array(buf, s.as_bytes());
}

pub fn read_byte_array(buf: &mut BytesMut) -> CodecResult<Vec<u8>> {
    let len = read_length(buf)?;
    Ok(take(buf, len)?.to_vec())
}

pub fn write_byte_array(buf: &mut BytesMut, data: &[u8]) {
    write_varint(buf, data.len() as i32);
    buf.put_slice(data);
}

/// `count` big-endian longs with no length prefix.
pub fn read_long_array(buf: &mut BytesMut, count: usize) -> CodecResult<Vec<i64>> {
    ensure(buf, count.saturating_mul(8))?;
    Ok((0..count).map(|_| buf.get_i64()).collect())
}

/// A BitSet as sent since 1.17: long count, then the longs.
pub fn read_bitset(buf: &mut BytesMut) -> CodecResult<Vec<i64>> {
    let count = read_length(buf)?;
    read_long_array(buf, count)
}

/// Bits past the end of the set read as clear.
pub fn bitset_get(bits: &[i64], index: usize) -> bool {
    match bits.get(index / 64) {
        Some(&word) => (word as u64) & (1 << (index % 64)) != 0,
        None => false,
    }
}

pub fn ensure(buf: &BytesMut, len: usize) -> CodecResult<()> {
    if buf.remaining() >= len {
        Ok(())
    } else {
        Err(CodecError::NotEnoughData)
    }
}

fn take(buf: &mut BytesMut, len: usize) -> CodecResult<BytesMut> {
    ensure(buf, len)?;
    Ok(buf.split_to(len))
}

pub fn read_bool(buf: &mut BytesMut) -> CodecResult<bool> {
    read_u8(buf).map(|b| b != 0)
}

macro_rules! fixed_width {
    ($($name:ident: $ty:ty => $get:ident;)*) => {
        $(
            pub fn $name(buf: &mut BytesMut) -> CodecResult<$ty> {
                ensure(buf, std::mem::size_of::<$ty>())?;
                Ok(buf.$get())
            }
        )*
    };
}

fixed_width! {
    read_u8: u8 => get_u8;
    read_i16: i16 => get_i16;
    read_u16: u16 => get_u16;
    read_i32: i32 => get_i32;
    read_i64: i64 => get_i64;
    read_f32: f32 => get_f32;
    read_f64: f64 => get_f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_wire_form() {
        let cases = vec![
            (0, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (255, vec![0xFF, 0x01]),
            (25565, vec![0xDD, 0xC7, 0x01]),
            (2097151, vec![0xFF, 0xFF, 0x7F]),
            (-1, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];

        for (value, expected_bytes) in cases {
            let mut buf = BytesMut::new();
            write_varint(&mut buf, value);
            assert_eq!(
                buf.to_vec(),
                expected_bytes,
                "write_varint({}) failed",
                value
            );

            let mut buf = BytesMut::from(&expected_bytes[..]);
            let result = read_varint(&mut buf).unwrap();
            assert_eq!(result, value, "read_varint for {} failed", value);
        }
    }

    #[test]
    fn test_overlong_varint_rejected() {
        let mut buf = BytesMut::from(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01][..]);
        assert!(matches!(read_varint(&mut buf), Err(CodecError::VarIntTooBig(32))));
        let mut buf = BytesMut::new();
        write_varint(&mut buf, -5);
        assert!(matches!(read_length(&mut buf), Err(CodecError::NegativeLength(-5))));
    }

    #[test]
    fn test_varlong_roundtrip() {
        for value in [0i64, 1, 300, -1, i64::MAX, i64::MIN, 0x1234_5678_9ABC] {
            let mut buf = BytesMut::new();
            write_varlong(&mut buf, value);
            assert_eq!(read_varlong(&mut buf).unwrap(), value);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_string_roundtrip() {
        let test_str = "mc.example.net";
        let mut buf = BytesMut::new();
        write_string(&mut buf, test_str);
        let result = read_string(&mut buf, 255).unwrap();
        assert_eq!(result, test_str);
    }

    #[test]
    fn test_truncated_reads() {
        let mut buf = BytesMut::from(&[0x80][..]);
        assert!(matches!(read_varint(&mut buf), Err(CodecError::NotEnoughData)));
        let mut buf = BytesMut::from(&[0, 0, 0][..]);
        assert!(matches!(read_i32(&mut buf), Err(CodecError::NotEnoughData)));
        let mut buf = BytesMut::new();
        write_varint(&mut buf, 10);
        buf.put_slice(b"abc");
        assert!(read_byte_array(&mut buf).is_err());
    }

    #[test]
    fn test_bitset() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, 2);
        buf.put_i64(0b1010);
        buf.put_i64(1);
        let bits = read_bitset(&mut buf).unwrap();
        assert!(!bitset_get(&bits, 0));
        assert!(bitset_get(&bits, 1));
        assert!(bitset_get(&bits, 3));
        assert!(bitset_get(&bits, 64));
        assert!(!bitset_get(&bits, 200));
    }
}
