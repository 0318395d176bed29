//! BER-style variable-length integers.
//!
//! Each byte carries 7 bits of payload, most significant group first. The
//! high bit (0x80) is set on every byte except the last. Zero is a single
//! `0x00` byte and a full 32-bit value takes five bytes.

use std::io::{self, Write};

use crate::{BinaryReader, Error, Result};

/// Maximum number of bytes a 32-bit value occupies.
pub const MAX_BER_SIZE: usize = 5;

/// Number of bytes [`ber_encode`] writes for `value`.
#[inline]
pub const fn ber_size(value: u32) -> usize {
    let mut size = 1;
    let mut rest = value >> 7;
    while rest != 0 {
        size += 1;
        rest >>= 7;
    }
    size
}

/// Decode one varint from `reader`.
///
/// The format itself places no limit on the number of continuation bytes;
/// anything that does not fit in 32 bits is rejected as [`Error::BerOverflow`].
pub fn ber_decode(reader: &mut BinaryReader<'_>) -> Result<u32> {
    let start = reader.position();
    let mut value: u64 = 0;
    loop {
        let byte = reader.read_u8()?;
        value = (value << 7) | u64::from(byte & 0x7F);
        if value > u64::from(u32::MAX) {
            return Err(Error::BerOverflow { offset: start });
        }
        if byte & 0x80 == 0 {
            return Ok(value as u32);
        }
    }
}

/// Encode `value` into `writer`.
pub fn ber_encode<W: Write + ?Sized>(writer: &mut W, value: u32) -> io::Result<()> {
    let size = ber_size(value);
    let mut buf = [0u8; MAX_BER_SIZE];
    for (i, byte) in buf.iter_mut().take(size).enumerate() {
        let shift = 7 * (size - 1 - i);
        *byte = ((value >> shift) & 0x7F) as u8;
        if i + 1 < size {
            *byte |= 0x80;
        }
    }
    writer.write_all(&buf[..size])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        ber_encode(&mut out, value).unwrap();
        out
    }

    #[test]
    fn test_ber_size() {
        assert_eq!(ber_size(0), 1);
        assert_eq!(ber_size(0x7F), 1);
        assert_eq!(ber_size(0x80), 2);
        assert_eq!(ber_size(0x81), 2);
        assert_eq!(ber_size(0x3FFF), 2);
        assert_eq!(ber_size(0x4000), 3);
        assert_eq!(ber_size(u32::MAX), 5);
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(127), vec![0x7F]);
        assert_eq!(encode(128), vec![0x81, 0x00]);
        assert_eq!(encode(0x1FFFFF), vec![0xFF, 0xFF, 0x7F]);
        assert_eq!(encode(u32::MAX), vec![0x8F, 0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_roundtrip_and_size() {
        for value in [0, 1, 127, 128, 300, 0x3FFF, 0x4000, 0x1FFFFF, 0x0FFF_FFFF, u32::MAX] {
            let bytes = encode(value);
            assert_eq!(bytes.len(), ber_size(value), "size of {value:#x}");

            let mut reader = BinaryReader::new(&bytes);
            assert_eq!(ber_decode(&mut reader).unwrap(), value);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn test_negative_i32_uses_five_bytes() {
        let bytes = encode(-1i32 as u32);
        assert_eq!(bytes.len(), 5);
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.read_ber_i32().unwrap(), -1);
    }

    #[test]
    fn test_overflow_rejected() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        let mut reader = BinaryReader::new(&data);
        assert!(matches!(
            ber_decode(&mut reader),
            Err(Error::BerOverflow { offset: 0 })
        ));
    }

    #[test]
    fn test_truncated_varint() {
        let data = [0x81];
        let mut reader = BinaryReader::new(&data);
        assert!(matches!(
            ber_decode(&mut reader),
            Err(Error::TruncatedStream { .. })
        ));
    }
}
