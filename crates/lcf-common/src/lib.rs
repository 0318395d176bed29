//! Common utilities for LCF.
//!
//! This crate provides the leaf codec used across all LCF crates:
//!
//! - [`BinaryReader`] - Bounds-checked binary reading from byte slices
//! - [`ber`] - Variable-length 7-bit group integers ("BER" in LCF parlance)
//! - [`codepage`] - Process-wide legacy codepage used for on-disk strings
//! - [`string`] - Reading and writing codepage-transcoded strings

mod error;
mod reader;
mod writer;

pub mod ber;
pub mod codepage;
pub mod string;

pub use ber::{ber_decode, ber_encode, ber_size};
pub use codepage::{codepage, set_codepage, set_encoding};
pub use error::{Error, Result};
pub use reader::BinaryReader;
pub use writer::WriteLcfExt;
pub use string::{
    read_prefixed_string, read_string, write_string, write_string_without_size,
    writing_string_size,
};

/// Re-export the encoding type so callers can name codepages directly.
pub use encoding_rs::Encoding;
