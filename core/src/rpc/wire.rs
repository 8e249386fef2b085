// core/src/rpc/wire.rs
//! Fixed-width little-endian framing primitives.
//!
//! Every multi-byte integer on the socket is little-endian. Strings and byte
//! blobs are prefixed with an `i32` length, string arrays with an `i32` count.
//! Reads either return the whole value or fail; a partial value is never
//! handed back to the caller.

use crate::error::TransportError;
use std::io::{ErrorKind, Read, Write};

/// Upper bound for any length prefix read from the daemon (10 MiB).
pub const MAX_FRAME_LEN: usize = 10 * 1024 * 1024;

/// Fills `buf` completely or reports how far the stream got before closing.
fn fill<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<(), TransportError> {
    let mut received = 0;
    while received < buf.len() {
        match reader.read(&mut buf[received..]) {
            Ok(0) if received == 0 => return Err(TransportError::Eof),
            Ok(0) => {
                return Err(TransportError::Truncated {
                    expected: buf.len(),
                    received,
                })
            }
            Ok(n) => received += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::Io(e)),
        }
    }
    Ok(())
}

pub fn read_i16<R: Read + ?Sized>(reader: &mut R) -> Result<i16, TransportError> {
    let mut buf = [0u8; 2];
    fill(reader, &mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

pub fn read_i32<R: Read + ?Sized>(reader: &mut R) -> Result<i32, TransportError> {
    let mut buf = [0u8; 4];
    fill(reader, &mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub fn read_i64<R: Read + ?Sized>(reader: &mut R) -> Result<i64, TransportError> {
    let mut buf = [0u8; 8];
    fill(reader, &mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

/// Reads an `i32` length (or count) prefix and validates it before anything
/// is allocated for it.
pub fn read_length<R: Read + ?Sized>(reader: &mut R) -> Result<usize, TransportError> {
    let len = read_i32(reader)?;
    if len < 0 {
        return Err(TransportError::NegativeLength(len));
    }
    let len = len as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(len));
    }
    Ok(len)
}

/// Reads exactly `len` raw bytes.
pub fn read_exact_vec<R: Read + ?Sized>(
    reader: &mut R,
    len: usize,
) -> Result<Vec<u8>, TransportError> {
    let mut buf = vec![0u8; len];
    fill(reader, &mut buf)?;
    Ok(buf)
}

pub fn read_bytes<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let len = read_length(reader)?;
    read_exact_vec(reader, len)
}

pub fn read_string<R: Read + ?Sized>(reader: &mut R) -> Result<String, TransportError> {
    let raw = read_bytes(reader)?;
    String::from_utf8(raw).map_err(|e| TransportError::InvalidUtf8(e.utf8_error()))
}

pub fn read_string_array<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<String>, TransportError> {
    let count = read_length(reader)?;
    // Each element needs at least its own 4-byte prefix, so a bogus count
    // cannot make us reserve more than the frame cap.
    let mut items = Vec::with_capacity(count.min(MAX_FRAME_LEN / 4));
    for _ in 0..count {
        items.push(read_string(reader)?);
    }
    Ok(items)
}

pub fn write_i16<W: Write + ?Sized>(writer: &mut W, value: i16) -> Result<(), TransportError> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub fn write_i32<W: Write + ?Sized>(writer: &mut W, value: i32) -> Result<(), TransportError> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub fn write_i64<W: Write + ?Sized>(writer: &mut W, value: i64) -> Result<(), TransportError> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn length_prefix(len: usize) -> Result<i32, TransportError> {
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(len));
    }
    Ok(len as i32)
}

pub fn write_bytes<W: Write + ?Sized>(writer: &mut W, data: &[u8]) -> Result<(), TransportError> {
    write_i32(writer, length_prefix(data.len())?)?;
    writer.write_all(data)?;
    Ok(())
}

pub fn write_string<W: Write + ?Sized>(writer: &mut W, value: &str) -> Result<(), TransportError> {
    write_bytes(writer, value.as_bytes())
}

pub fn write_string_array<W: Write + ?Sized, S: AsRef<str>>(
    writer: &mut W,
    values: &[S],
) -> Result<(), TransportError> {
    write_i32(writer, length_prefix(values.len())?)?;
    for value in values {
        write_string(writer, value.as_ref())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn scalars_are_little_endian() {
        let mut out = Vec::new();
        write_i16(&mut out, 0x0102).unwrap();
        write_i32(&mut out, 0x0304_0506).unwrap();
        write_i64(&mut out, -2).unwrap();
        assert_eq!(&out[..2], &[0x02, 0x01]);
        assert_eq!(&out[2..6], &[0x06, 0x05, 0x04, 0x03]);
        assert_eq!(&out[6..], &[0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);

        let mut cursor = Cursor::new(out);
        assert_eq!(read_i16(&mut cursor).unwrap(), 0x0102);
        assert_eq!(read_i32(&mut cursor).unwrap(), 0x0304_0506);
        assert_eq!(read_i64(&mut cursor).unwrap(), -2);
    }

    #[test]
    fn values_survive_a_round_trip() {
        let mut out = Vec::new();
        write_string(&mut out, "ALLOW").unwrap();
        write_string(&mut out, "").unwrap();
        write_string(&mut out, "/data/media/0/ünïcode").unwrap();
        write_bytes(&mut out, &[0, 159, 146, 150]).unwrap();
        write_i32(&mut out, i32::MIN).unwrap();
        write_i64(&mut out, i64::MAX).unwrap();
        write_string_array(&mut out, &["system", "cache", "data"]).unwrap();

        let mut cursor = Cursor::new(out);
        assert_eq!(read_string(&mut cursor).unwrap(), "ALLOW");
        assert_eq!(read_string(&mut cursor).unwrap(), "");
        assert_eq!(read_string(&mut cursor).unwrap(), "/data/media/0/ünïcode");
        assert_eq!(read_bytes(&mut cursor).unwrap(), vec![0, 159, 146, 150]);
        assert_eq!(read_i32(&mut cursor).unwrap(), i32::MIN);
        assert_eq!(read_i64(&mut cursor).unwrap(), i64::MAX);
        assert_eq!(
            read_string_array(&mut cursor).unwrap(),
            vec!["system", "cache", "data"]
        );
    }

    #[test]
    fn string_has_no_terminator() {
        let mut out = Vec::new();
        write_string(&mut out, "OK").unwrap();
        assert_eq!(out, vec![2, 0, 0, 0, b'O', b'K']);
    }

    #[test]
    fn negative_length_is_rejected() {
        let negative = || Cursor::new((-1i32).to_le_bytes().to_vec());
        assert!(matches!(
            read_bytes(&mut negative()),
            Err(TransportError::NegativeLength(-1))
        ));
        assert!(matches!(
            read_string(&mut negative()),
            Err(TransportError::NegativeLength(-1))
        ));
        assert!(matches!(
            read_string_array(&mut negative()),
            Err(TransportError::NegativeLength(-1))
        ));
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut cursor = Cursor::new(i32::MAX.to_le_bytes().to_vec());
        assert!(matches!(
            read_bytes(&mut cursor),
            Err(TransportError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn empty_stream_is_eof() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(matches!(read_i32(&mut cursor), Err(TransportError::Eof)));
    }

    #[test]
    fn short_stream_is_truncated() {
        let mut data = 10i32.to_le_bytes().to_vec();
        data.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(data);
        match read_string(&mut cursor) {
            Err(TransportError::Truncated { expected: 10, received: 3 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut out = Vec::new();
        write_bytes(&mut out, &[0xff, 0xfe]).unwrap();
        assert!(matches!(
            read_string(&mut Cursor::new(out)),
            Err(TransportError::InvalidUtf8(_))
        ));
    }
}
