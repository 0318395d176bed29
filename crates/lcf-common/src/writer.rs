//! Write-side counterpart of [`BinaryReader`](crate::BinaryReader).

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::{ber, string, Result};

/// Extension trait for writing LCF primitives to any [`Write`].
pub trait WriteLcfExt: Write {
    /// Write a BER varint.
    fn write_ber(&mut self, value: u32) -> io::Result<()> {
        ber::ber_encode(self, value)
    }

    /// Write a signed 32-bit integer as a BER varint of its bit pattern.
    fn write_ber_i32(&mut self, value: i32) -> io::Result<()> {
        ber::ber_encode(self, value as u32)
    }

    /// Write a little-endian i16.
    fn write_i16_le(&mut self, value: i16) -> io::Result<()> {
        self.write_i16::<LittleEndian>(value)
    }

    /// Write a little-endian i32.
    fn write_i32_le(&mut self, value: i32) -> io::Result<()> {
        self.write_i32::<LittleEndian>(value)
    }

    /// Write a little-endian f64.
    fn write_f64_le(&mut self, value: f64) -> io::Result<()> {
        self.write_f64::<LittleEndian>(value)
    }

    /// Write a BER-prefixed codepage string.
    fn write_lcf_string(&mut self, text: &str) -> Result<()> {
        string::write_string(self, text)
    }

    /// Write a codepage string with no prefix.
    fn write_lcf_string_without_size(&mut self, text: &str) -> Result<()> {
        string::write_string_without_size(self, text)
    }
}

impl<W: Write + ?Sized> WriteLcfExt for W {}
