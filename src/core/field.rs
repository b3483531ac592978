//! # Field Kinds
//!
//! The closed set of values a packet payload can carry.
//!
//! Payloads are purely positional: nothing inside the payload says what a
//! field is. A message schema is therefore just an ordered list of
//! [`FieldKind`]s known to the handler for a given type tag.
//!
//! ## Encoding
//! - Integers and floats: little-endian, fixed width (1/2/4/8 bytes)
//! - Strings: raw UTF-8 bytes followed by a single `0x00` terminator
//!
//! Fixed-width decodes that do not have enough bytes return `None` and consume
//! nothing. String decodes that find no terminator return an empty string and
//! consume nothing.

use bytes::{BufMut, BytesMut};
use std::fmt;

use crate::error::{ProtocolError, Result};

/// Terminator written after every string field
pub const STRING_TERMINATOR: u8 = 0;

/// Kind of a single payload field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Str,
}

impl FieldKind {
    /// Encoded width in bytes, `None` for variable-width strings
    pub const fn width(self) -> Option<usize> {
        match self {
            FieldKind::U8 | FieldKind::I8 => Some(1),
            FieldKind::U16 | FieldKind::I16 => Some(2),
            FieldKind::U32 | FieldKind::I32 | FieldKind::F32 => Some(4),
            FieldKind::U64 | FieldKind::I64 | FieldKind::F64 => Some(8),
            FieldKind::Str => None,
        }
    }

    /// Decode one field of this kind from the front of `src`.
    ///
    /// Returns the value and the number of bytes it occupied, or `None` when a
    /// fixed-width field does not fit in `src`.
    pub fn decode(self, src: &[u8]) -> Option<(Value, usize)> {
        match self {
            FieldKind::U8 => u8::decode(src).map(|(v, n)| (Value::U8(v), n)),
            FieldKind::I8 => i8::decode(src).map(|(v, n)| (Value::I8(v), n)),
            FieldKind::U16 => u16::decode(src).map(|(v, n)| (Value::U16(v), n)),
            FieldKind::I16 => i16::decode(src).map(|(v, n)| (Value::I16(v), n)),
            FieldKind::U32 => u32::decode(src).map(|(v, n)| (Value::U32(v), n)),
            FieldKind::I32 => i32::decode(src).map(|(v, n)| (Value::I32(v), n)),
            FieldKind::U64 => u64::decode(src).map(|(v, n)| (Value::U64(v), n)),
            FieldKind::I64 => i64::decode(src).map(|(v, n)| (Value::I64(v), n)),
            FieldKind::F32 => f32::decode(src).map(|(v, n)| (Value::F32(v), n)),
            FieldKind::F64 => f64::decode(src).map(|(v, n)| (Value::F64(v), n)),
            FieldKind::Str => String::decode(src).map(|(v, n)| (Value::Str(v), n)),
        }
    }
}

/// A single typed payload value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
}

impl Value {
    /// The kind this value encodes as
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::U8(_) => FieldKind::U8,
            Value::I8(_) => FieldKind::I8,
            Value::U16(_) => FieldKind::U16,
            Value::I16(_) => FieldKind::I16,
            Value::U32(_) => FieldKind::U32,
            Value::I32(_) => FieldKind::I32,
            Value::U64(_) => FieldKind::U64,
            Value::I64(_) => FieldKind::I64,
            Value::F32(_) => FieldKind::F32,
            Value::F64(_) => FieldKind::F64,
            Value::Str(_) => FieldKind::Str,
        }
    }

    /// Number of bytes this value occupies on the wire
    pub fn encoded_len(&self) -> usize {
        match self {
            Value::Str(s) => s.encoded_len(),
            other => other.kind().width().unwrap_or_default(),
        }
    }

    /// Append the wire encoding of this value to `dst`
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Value::U8(v) => v.encode(dst),
            Value::I8(v) => v.encode(dst),
            Value::U16(v) => v.encode(dst),
            Value::I16(v) => v.encode(dst),
            Value::U32(v) => v.encode(dst),
            Value::I32(v) => v.encode(dst),
            Value::U64(v) => v.encode(dst),
            Value::I64(v) => v.encode(dst),
            Value::F32(v) => v.encode(dst),
            Value::F64(v) => v.encode(dst),
            Value::Str(v) => v.encode(dst),
        }
    }

    /// Borrow the string contents if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// A Rust type with a fixed wire representation inside a packet payload
pub trait Field: Sized {
    /// Kind tag for this type
    const KIND: FieldKind;

    /// Number of bytes `self` occupies on the wire
    fn encoded_len(&self) -> usize;

    /// Append the wire encoding of `self` to `dst`
    fn encode(&self, dst: &mut BytesMut) -> Result<()>;

    /// Decode from the front of `src`, returning the value and bytes consumed
    fn decode(src: &[u8]) -> Option<(Self, usize)>;

    /// Convert into the dynamic [`Value`] representation
    fn into_value(self) -> Value;
}

macro_rules! numeric_field {
    ($ty:ty, $kind:ident, $put:ident) => {
        impl Field for $ty {
            const KIND: FieldKind = FieldKind::$kind;

            #[inline]
            fn encoded_len(&self) -> usize {
                std::mem::size_of::<$ty>()
            }

            #[inline]
            fn encode(&self, dst: &mut BytesMut) -> Result<()> {
                dst.$put(*self);
                Ok(())
            }

            #[inline]
            fn decode(src: &[u8]) -> Option<(Self, usize)> {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                let bytes: [u8; WIDTH] = src.get(..WIDTH)?.try_into().ok()?;
                Some((<$ty>::from_le_bytes(bytes), WIDTH))
            }

            fn into_value(self) -> Value {
                Value::$kind(self)
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$kind(v)
            }
        }
    };
}

numeric_field!(u8, U8, put_u8);
numeric_field!(i8, I8, put_i8);
numeric_field!(u16, U16, put_u16_le);
numeric_field!(i16, I16, put_i16_le);
numeric_field!(u32, U32, put_u32_le);
numeric_field!(i32, I32, put_i32_le);
numeric_field!(u64, U64, put_u64_le);
numeric_field!(i64, I64, put_i64_le);
numeric_field!(f32, F32, put_f32_le);
numeric_field!(f64, F64, put_f64_le);

impl Field for String {
    const KIND: FieldKind = FieldKind::Str;

    fn encoded_len(&self) -> usize {
        self.len() + 1
    }

    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        encode_str(self, dst)
    }

    fn decode(src: &[u8]) -> Option<(Self, usize)> {
        // No terminator anywhere: empty string, no forward progress
        match src.iter().position(|&b| b == STRING_TERMINATOR) {
            Some(end) => Some((String::from_utf8_lossy(&src[..end]).into_owned(), end + 1)),
            None => Some((String::new(), 0)),
        }
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

/// Encode a string field, rejecting embedded terminators
pub(crate) fn encode_str(s: &str, dst: &mut BytesMut) -> Result<()> {
    if s.as_bytes().contains(&STRING_TERMINATOR) {
        return Err(ProtocolError::InvalidField(format!(
            "string field contains a NUL byte: {s:?}"
        )));
    }
    dst.reserve(s.len() + 1);
    dst.put_slice(s.as_bytes());
    dst.put_u8(STRING_TERMINATOR);
    Ok(())
}

/// Build a `Vec<Value>` from heterogeneous field values.
///
/// ```rust
/// use packet_server::values;
/// use packet_server::core::field::Value;
///
/// let fields = values![1u8, 604800i32, "Liplay"];
/// assert_eq!(fields[2], Value::Str("Liplay".into()));
/// ```
#[macro_export]
macro_rules! values {
    () => { ::std::vec::Vec::<$crate::core::field::Value>::new() };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::core::field::Value::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn widths_match_encoded_lengths() {
        let samples = values![1u8, -1i8, 2u16, -2i16, 3u32, -3i32, 4u64, -4i64, 1.5f32, 2.5f64];
        for value in samples {
            let mut buf = BytesMut::new();
            value.encode(&mut buf).unwrap();
            assert_eq!(Some(buf.len()), value.kind().width());
            assert_eq!(buf.len(), value.encoded_len());
        }
    }

    #[test]
    fn little_endian_layout() {
        let mut buf = BytesMut::new();
        0x0703u16.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x03, 0x07]);

        let (v, n) = u16::decode(&[3, 7]).unwrap();
        assert_eq!((v, n), (1795, 2));
    }

    #[test]
    fn short_input_does_not_decode() {
        assert!(u32::decode(&[1, 2, 3]).is_none());
        assert!(FieldKind::F64.decode(&[0; 7]).is_none());
    }

    #[test]
    fn string_without_terminator_is_empty_and_consumes_nothing() {
        assert_eq!(String::decode(b"abc"), Some((String::new(), 0)));
        assert_eq!(String::decode(b""), Some((String::new(), 0)));
    }

    #[test]
    fn string_stops_at_first_terminator() {
        let (s, n) = String::decode(b"kal\0a\0").unwrap();
        assert_eq!(s, "kal");
        assert_eq!(n, 4);
    }

    #[test]
    fn string_with_nul_is_rejected() {
        let mut buf = BytesMut::new();
        let err = "a\0b".to_string().encode(&mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn invalid_utf8_decodes_lossily() {
        let (s, n) = String::decode(&[0xFF, b'x', 0]).unwrap();
        assert_eq!(s, "\u{FFFD}x");
        assert_eq!(n, 3);
    }
}
