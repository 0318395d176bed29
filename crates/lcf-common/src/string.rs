//! Codepage-transcoded strings.
//!
//! Strings are stored either with a BER byte-length prefix, or bare inside a
//! chunk whose length already bounds them. Lengths always count encoded
//! bytes, never characters.

use std::io::Write;

use crate::{ber, codepage, BinaryReader, Result};

/// Read `length` raw bytes and transcode them to UTF-8.
pub fn read_string(reader: &mut BinaryReader<'_>, length: usize) -> Result<String> {
    let bytes = reader.read_bytes(length)?;
    Ok(codepage::decode(bytes)?.into_owned())
}

/// Read a BER length followed by that many bytes.
pub fn read_prefixed_string(reader: &mut BinaryReader<'_>) -> Result<String> {
    let length = reader.read_ber()? as usize;
    read_string(reader, length)
}

/// Write a BER length prefix and the encoded bytes of `text`.
pub fn write_string<W: Write + ?Sized>(writer: &mut W, text: &str) -> Result<()> {
    let bytes = codepage::encode(text)?;
    ber::ber_encode(writer, bytes.len() as u32)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Write the encoded bytes of `text` with no length prefix.
pub fn write_string_without_size<W: Write + ?Sized>(writer: &mut W, text: &str) -> Result<()> {
    let bytes = codepage::encode(text)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Number of bytes `text` occupies once encoded, excluding any prefix.
pub fn writing_string_size(text: &str) -> Result<usize> {
    if text.is_ascii() {
        return Ok(text.len());
    }
    Ok(codepage::encode(text)?.len())
}
