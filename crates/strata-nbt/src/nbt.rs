use bytes::{BufMut, BytesMut};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

pub const TAG_END: u8 = 0;
pub const TAG_BYTE: u8 = 1;
pub const TAG_SHORT: u8 = 2;
pub const TAG_INT: u8 = 3;
pub const TAG_LONG: u8 = 4;
pub const TAG_FLOAT: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_BYTE_ARRAY: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_LIST: u8 = 9;
pub const TAG_COMPOUND: u8 = 10;
pub const TAG_INT_ARRAY: u8 = 11;
pub const TAG_LONG_ARRAY: u8 = 12;

/// An NBT value. Compounds keep insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum NbtValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<NbtValue>),
    Compound(Vec<(String, NbtValue)>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl NbtValue {
    pub fn tag_id(&self) -> u8 {
        match self {
            NbtValue::Byte(_) => TAG_BYTE,
            NbtValue::Short(_) => TAG_SHORT,
            NbtValue::Int(_) => TAG_INT,
            NbtValue::Long(_) => TAG_LONG,
            NbtValue::Float(_) => TAG_FLOAT,
            NbtValue::Double(_) => TAG_DOUBLE,
            NbtValue::ByteArray(_) => TAG_BYTE_ARRAY,
            NbtValue::String(_) => TAG_STRING,
            NbtValue::List(_) => TAG_LIST,
            NbtValue::Compound(_) => TAG_COMPOUND,
            NbtValue::IntArray(_) => TAG_INT_ARRAY,
            NbtValue::LongArray(_) => TAG_LONG_ARRAY,
        }
    }

    /// Look up a child of a compound by name.
    pub fn get(&self, key: &str) -> Option<&NbtValue> {
        match self {
            NbtValue::Compound(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut NbtValue> {
        match self {
            NbtValue::Compound(entries) => {
                entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Insert or replace a compound child. No-op on non-compounds.
    pub fn insert(&mut self, key: impl Into<String>, value: NbtValue) {
        if let NbtValue::Compound(entries) = self {
            let key = key.into();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, slot)) => *slot = value,
                None => entries.push((key, value)),
            }
        }
    }

    pub fn as_byte(&self) -> Option<i8> {
        match self {
            NbtValue::Byte(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integral tag widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NbtValue::Byte(v) => Some(*v as i64),
            NbtValue::Short(v) => Some(*v as i64),
            NbtValue::Int(v) => Some(*v as i64),
            NbtValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().map(|v| v as i32)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NbtValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[NbtValue]> {
        match self {
            NbtValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<NbtValue>> {
        match self {
            NbtValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&[(String, NbtValue)]> {
        match self {
            NbtValue::Compound(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_long_array(&self) -> Option<&[i64]> {
        match self {
            NbtValue::LongArray(v) => Some(v),
            _ => None,
        }
    }

    /// Named root tag, as stored in files and sent by every protocol up to 1.20.1.
    pub fn write_root_named(&self, name: &str, buf: &mut BytesMut) {
        put_tag_header(self.tag_id(), name, buf);
        self.write_payload(buf);
    }

    /// The value without its tag id or name.
    pub fn write_payload(&self, buf: &mut BytesMut) {
        match self {
            NbtValue::Byte(v) => buf.put_i8(*v),
            NbtValue::Short(v) => buf.put_i16(*v),
            NbtValue::Int(v) => buf.put_i32(*v),
            NbtValue::Long(v) => buf.put_i64(*v),
            NbtValue::Float(v) => buf.put_f32(*v),
            NbtValue::Double(v) => buf.put_f64(*v),
            NbtValue::String(v) => put_string(v, buf),
            NbtValue::ByteArray(v) => put_array(v, buf, |b, buf| buf.put_i8(b)),
            NbtValue::IntArray(v) => put_array(v, buf, |i, buf| buf.put_i32(i)),
            NbtValue::LongArray(v) => put_array(v, buf, |l, buf| buf.put_i64(l)),
            NbtValue::List(items) => {
                // An empty list has no element type; vanilla writes TAG_END.
                let element = items.first().map_or(TAG_END, NbtValue::tag_id);
                buf.put_u8(element);
                buf.put_i32(items.len() as i32);
                for item in items {
                    item.write_payload(buf);
                }
            }
            NbtValue::Compound(entries) => {
                for (name, value) in entries {
                    put_tag_header(value.tag_id(), name, buf);
                    value.write_payload(buf);
                }
                buf.put_u8(TAG_END);
            }
        }
    }

    /// Named root, gzip-compressed, as used by `level.dat`.
    pub fn to_gzip_file_bytes(&self, name: &str) -> std::io::Result<Vec<u8>> {
        let mut raw = BytesMut::new();
        self.write_root_named(name, &mut raw);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        encoder.finish()
    }
}

/// Modified UTF-8 is only different from UTF-8 for NUL and supplementary
/// characters, neither of which occur in the names the proxy writes.
fn put_string(s: &str, buf: &mut BytesMut) {
    buf.put_u16(s.len() as u16);
    buf.put_slice(s.as_bytes());
}

fn put_tag_header(tag: u8, name: &str, buf: &mut BytesMut) {
    buf.put_u8(tag);
    put_string(name, buf);
}

fn put_array<T: Copy>(values: &[T], buf: &mut BytesMut, put: impl Fn(T, &mut BytesMut)) {
    buf.put_i32(values.len() as i32);
    for &value in values {
        put(value, buf);
    }
}

/// Build a compound from `key => value` pairs, keeping their order.
#[macro_export]
macro_rules! nbt_compound {
    ($($key:expr => $val:expr),* $(,)?) => {
        $crate::NbtValue::Compound(vec![
            $(($key.into(), $val)),*
        ])
    };
}

/// Build a list tag. Elements must share one tag type.
#[macro_export]
macro_rules! nbt_list {
    ($($val:expr),* $(,)?) => {
        $crate::NbtValue::List(vec![$($val),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_root_layout() {
        let nbt = nbt_compound! { "xPos" => NbtValue::Int(-2) };
        let mut buf = BytesMut::new();
        nbt.write_root_named("", &mut buf);
        assert_eq!(
            &buf[..],
            &[TAG_COMPOUND, 0, 0, TAG_INT, 0, 4, b'x', b'P', b'o', b's', 0xFF, 0xFF, 0xFF, 0xFE, TAG_END]
        );
    }

    #[test]
    fn test_array_and_empty_list_payloads() {
        let mut buf = BytesMut::new();
        NbtValue::LongArray(vec![1, 2, 3]).write_payload(&mut buf);
        assert_eq!(buf.len(), 4 + 3 * 8);

        let mut buf = BytesMut::new();
        NbtValue::List(Vec::new()).write_payload(&mut buf);
        assert_eq!(&buf[..], &[TAG_END, 0, 0, 0, 0]);
    }

    #[test]
    fn test_compound_accessors() {
        let mut nbt = nbt_compound! {
            "xPos" => NbtValue::Int(3),
            "Status" => NbtValue::String("full".into()),
        };
        assert_eq!(nbt.get("xPos").and_then(|v| v.as_i32()), Some(3));
        assert_eq!(nbt.get("Status").and_then(|v| v.as_str()), Some("full"));
        nbt.insert("xPos", NbtValue::Int(7));
        nbt.insert("zPos", NbtValue::Int(-1));
        assert_eq!(nbt.get("xPos").and_then(|v| v.as_i32()), Some(7));
        assert_eq!(nbt.as_compound().map(|c| c.len()), Some(3));
    }
}
