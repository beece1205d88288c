//! Fixed-width primitive codec: little-endian byte order throughout,
//! signed integers bit-cast through the unsigned width of the same size
//! (not varint-encoded — only `Char`, `Integer`, and `Text`/`Bytes` length
//! prefixes use the varint codec). Schema conformance is `CoderState`'s
//! job; these functions only move bytes.

use crate::error::DecodeError;
use std::io::{Read, Write};

macro_rules! le_bytes_codec {
    ($($enc:ident/$dec:ident: $t:ty,)*) => {$(
        pub fn $enc(n: $t, w: &mut impl Write) -> std::io::Result<()> {
            w.write_all(&n.to_le_bytes())
        }

        pub fn $dec(r: &mut impl Read) -> Result<$t, DecodeError> {
            let mut buf = [0u8; std::mem::size_of::<$t>()];
            r.read_exact(&mut buf).map_err(|_| DecodeError::UnexpectedEof)?;
            Ok(<$t>::from_le_bytes(buf))
        }
    )*};
}

le_bytes_codec!(
    encode_w16/decode_w16: u16,
    encode_w32/decode_w32: u32,
    encode_w64/decode_w64: u64,
    encode_f32/decode_f32: f32,
    encode_f64/decode_f64: f64,
);

macro_rules! bitcast_le_codec {
    ($($enc:ident/$dec:ident: $t:ty as $u:ty,)*) => {$(
        pub fn $enc(n: $t, w: &mut impl Write) -> std::io::Result<()> {
            w.write_all(&(n as $u).to_le_bytes())
        }

        pub fn $dec(r: &mut impl Read) -> Result<$t, DecodeError> {
            let mut buf = [0u8; std::mem::size_of::<$u>()];
            r.read_exact(&mut buf).map_err(|_| DecodeError::UnexpectedEof)?;
            Ok(<$u>::from_le_bytes(buf) as $t)
        }
    )*};
}

bitcast_le_codec!(
    encode_i16/decode_i16: i16 as u16,
    encode_i32/decode_i32: i32 as u32,
    encode_i64/decode_i64: i64 as u64,
);

pub fn encode_w8(n: u8, w: &mut impl Write) -> std::io::Result<()> {
    w.write_all(&[n])
}

pub fn decode_w8(r: &mut impl Read) -> Result<u8, DecodeError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf).map_err(|_| DecodeError::UnexpectedEof)?;
    Ok(buf[0])
}

pub fn encode_i8(n: i8, w: &mut impl Write) -> std::io::Result<()> {
    w.write_all(&[n as u8])
}

pub fn decode_i8(r: &mut impl Read) -> Result<i8, DecodeError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf).map_err(|_| DecodeError::UnexpectedEof)?;
    Ok(buf[0] as i8)
}

pub fn encode_bool(b: bool, w: &mut impl Write) -> std::io::Result<()> {
    w.write_all(&[if b { 1 } else { 0 }])
}

pub fn decode_bool(r: &mut impl Read) -> Result<bool, DecodeError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf).map_err(|_| DecodeError::UnexpectedEof)?;
    match buf[0] {
        0 => Ok(false),
        _ => Ok(true),
    }
}

pub fn encode_char(c: char, w: &mut impl Write) -> std::io::Result<()> {
    crate::varint::encode_varint_u128(c as u32 as u128, w)
}

pub fn decode_char(r: &mut impl Read) -> Result<char, DecodeError> {
    let n = crate::varint::decode_varint_u128(r)?;
    let n = u32::try_from(n).map_err(|_| DecodeError::VarintOverflow)?;
    char::from_u32(n).ok_or(DecodeError::InvalidChar { value: n })
}

/// The `Integer` leaf: an unbounded non-negative varint, widened to
/// `u128` in memory.
pub fn encode_integer(n: u128, w: &mut impl Write) -> std::io::Result<()> {
    crate::varint::encode_varint_u128(n, w)
}

pub fn decode_integer(r: &mut impl Read) -> Result<u128, DecodeError> {
    crate::varint::decode_varint_u128(r)
}

pub fn encode_text(s: &str, w: &mut impl Write) -> std::io::Result<()> {
    crate::varint::encode_varint_u128(s.len() as u128, w)?;
    w.write_all(s.as_bytes())
}

pub fn decode_text(r: &mut impl Read) -> Result<String, DecodeError> {
    let len = crate::varint::decode_varint_u128(r)?;
    let len = usize::try_from(len).map_err(|_| DecodeError::VarintOverflow)?;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(|_| DecodeError::UnexpectedEof)?;
    String::from_utf8(buf).map_err(|_| DecodeError::InvalidUtf8)
}

pub fn encode_bytes(b: &[u8], w: &mut impl Write) -> std::io::Result<()> {
    crate::varint::encode_varint_u128(b.len() as u128, w)?;
    w.write_all(b)
}

pub fn decode_bytes(r: &mut impl Read) -> Result<Vec<u8>, DecodeError> {
    let len = crate::varint::decode_varint_u128(r)?;
    let len = usize::try_from(len).map_err(|_| DecodeError::VarintOverflow)?;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(|_| DecodeError::UnexpectedEof)?;
    Ok(buf)
}

pub fn encode_utctime(t: time::OffsetDateTime, w: &mut impl Write) -> std::io::Result<()> {
    let secs = t.unix_timestamp() as f64 + (t.nanosecond() as f64 / 1_000_000_000.0);
    w.write_all(&secs.to_le_bytes())
}

pub fn decode_utctime(r: &mut impl Read) -> Result<time::OffsetDateTime, DecodeError> {
    let secs = decode_f64(r)?;
    let nanos = (secs * 1_000_000_000.0).round() as i128;
    time::OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|_| DecodeError::SchemaMismatch { need: "utctime", got: "out-of-range seconds" })
}
