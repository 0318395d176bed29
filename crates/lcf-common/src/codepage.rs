//! Process-wide legacy codepage.
//!
//! LCF files store text in the single/double-byte codepage of the system the
//! game was authored on. Japanese games use CP932, which is the default. The
//! same encoding drives both decoding and encoding, so swapping it is one
//! atomic store. Changing it while a file is being parsed gives mixed results.

use std::borrow::Cow;

use encoding_rs::{Encoding, SHIFT_JIS_INIT};
use parking_lot::{const_rwlock, RwLock};

use crate::{Error, Result};

static CODEPAGE: RwLock<&'static Encoding> = const_rwlock(&SHIFT_JIS_INIT);

/// The encoding currently used for on-disk strings.
#[inline]
pub fn codepage() -> &'static Encoding {
    *CODEPAGE.read()
}

/// Replace the process-wide encoding.
pub fn set_encoding(encoding: &'static Encoding) {
    *CODEPAGE.write() = encoding;
}

/// Replace the process-wide encoding by label.
///
/// Accepts Windows codepage numbers (`"932"`, `"1252"`, `"cp1251"`) as well
/// as any WHATWG encoding label (`"shift_jis"`, `"gbk"`).
pub fn set_codepage(label: &str) -> Result<&'static Encoding> {
    let encoding = encoding_for_label(label)?;
    set_encoding(encoding);
    Ok(encoding)
}

/// Look up an encoding without installing it.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    let trimmed = label.trim();
    let numeric = trimmed
        .strip_prefix("cp")
        .or_else(|| trimmed.strip_prefix("CP"))
        .unwrap_or(trimmed);

    let by_number = match numeric {
        "874" => Some(encoding_rs::WINDOWS_874),
        "932" => Some(encoding_rs::SHIFT_JIS),
        "936" => Some(encoding_rs::GBK),
        "949" => Some(encoding_rs::EUC_KR),
        "950" => Some(encoding_rs::BIG5),
        "1250" => Some(encoding_rs::WINDOWS_1250),
        "1251" => Some(encoding_rs::WINDOWS_1251),
        "1252" => Some(encoding_rs::WINDOWS_1252),
        "1253" => Some(encoding_rs::WINDOWS_1253),
        "1254" => Some(encoding_rs::WINDOWS_1254),
        "1255" => Some(encoding_rs::WINDOWS_1255),
        "1256" => Some(encoding_rs::WINDOWS_1256),
        "1257" => Some(encoding_rs::WINDOWS_1257),
        "1258" => Some(encoding_rs::WINDOWS_1258),
        _ => None,
    };

    by_number
        .or_else(|| Encoding::for_label(trimmed.as_bytes()))
        .ok_or_else(|| Error::UnknownCodepage(label.to_string()))
}

/// Decode on-disk bytes to UTF-8.
pub fn decode(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let encoding = codepage();
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| Error::Encoding {
            encoding: encoding.name(),
            message: format!("invalid byte sequence in {:02x?}", bytes),
        })
}

/// Encode UTF-8 text to on-disk bytes.
pub fn encode(text: &str) -> Result<Cow<'_, [u8]>> {
    let encoding = codepage();
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(Error::Encoding {
            encoding: encoding.name(),
            message: format!("{:?} is not representable", text),
        });
    }
    Ok(bytes)
}
