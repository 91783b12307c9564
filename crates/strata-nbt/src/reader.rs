use crate::nbt::*;
use bytes::Buf;
use thiserror::Error;

/// Compounds nested deeper than this are rejected, as the vanilla reader does.
const MAX_DEPTH: usize = 512;

#[derive(Debug, Error)]
pub enum NbtError {
    #[error("unexpected end of NBT data")]
    UnexpectedEnd,
    #[error("invalid tag type {0}")]
    InvalidTag(u8),
    #[error("negative length {0}")]
    NegativeLength(i32),
    #[error("NBT nested too deeply")]
    TooDeep,
}

pub type NbtResult<T> = Result<T, NbtError>;

/// Read a named root tag (file format and network format before 1.20.2).
/// Returns the root name and value. A lone TAG_END yields an empty compound.
pub fn read_named_root<B: Buf>(buf: &mut B) -> NbtResult<(String, NbtValue)> {
    let tag = read_u8(buf)?;
    if tag == TAG_END {
        return Ok((String::new(), NbtValue::Compound(Vec::new())));
    }
    let name = read_string(buf)?;
    let value = read_payload(buf, tag, 0)?;
    Ok((name, value))
}

fn read_payload<B: Buf>(buf: &mut B, tag: u8, depth: usize) -> NbtResult<NbtValue> {
    if depth > MAX_DEPTH {
        return Err(NbtError::TooDeep);
    }
    Ok(match tag {
        TAG_BYTE => {
            need(buf, 1)?;
            NbtValue::Byte(buf.get_i8())
        }
        TAG_SHORT => {
            need(buf, 2)?;
            NbtValue::Short(buf.get_i16())
        }
        TAG_INT => {
            need(buf, 4)?;
            NbtValue::Int(buf.get_i32())
        }
        TAG_LONG => {
            need(buf, 8)?;
            NbtValue::Long(buf.get_i64())
        }
        TAG_FLOAT => {
            need(buf, 4)?;
            NbtValue::Float(buf.get_f32())
        }
        TAG_DOUBLE => {
            need(buf, 8)?;
            NbtValue::Double(buf.get_f64())
        }
        TAG_BYTE_ARRAY => {
            let len = read_len(buf)?;
            need(buf, len)?;
            NbtValue::ByteArray((0..len).map(|_| buf.get_i8()).collect())
        }
        TAG_STRING => NbtValue::String(read_string(buf)?),
        TAG_LIST => {
            let item_tag = read_u8(buf)?;
            let len = read_len(buf)?;
            let mut items = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                items.push(read_payload(buf, item_tag, depth + 1)?);
            }
            NbtValue::List(items)
        }
        TAG_COMPOUND => {
            let mut entries = Vec::new();
            loop {
                let child = read_u8(buf)?;
                if child == TAG_END {
                    break;
                }
                let name = read_string(buf)?;
                let value = read_payload(buf, child, depth + 1)?;
                entries.push((name, value));
            }
            NbtValue::Compound(entries)
        }
        TAG_INT_ARRAY => {
            let len = read_len(buf)?;
            need(buf, len * 4)?;
            NbtValue::IntArray((0..len).map(|_| buf.get_i32()).collect())
        }
        TAG_LONG_ARRAY => {
            let len = read_len(buf)?;
            need(buf, len * 8)?;
            NbtValue::LongArray((0..len).map(|_| buf.get_i64()).collect())
        }
        other => return Err(NbtError::InvalidTag(other)),
    })
}

fn need<B: Buf>(buf: &B, n: usize) -> NbtResult<()> {
    if buf.remaining() < n {
        Err(NbtError::UnexpectedEnd)
    } else {
        Ok(())
    }
}

fn read_u8<B: Buf>(buf: &mut B) -> NbtResult<u8> {
    need(buf, 1)?;
    Ok(buf.get_u8())
}

fn read_len<B: Buf>(buf: &mut B) -> NbtResult<usize> {
    need(buf, 4)?;
    let len = buf.get_i32();
    if len < 0 {
        return Err(NbtError::NegativeLength(len));
    }
    Ok(len as usize)
}

fn read_string<B: Buf>(buf: &mut B) -> NbtResult<String> {
    need(buf, 2)?;
    let len = buf.get_u16() as usize;
    need(buf, len)?;
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    // Modified UTF-8 only differs from UTF-8 for NUL and surrogate pairs.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
