//! Builders for synthetic LCF fixtures.

use lcf_common::{ber_encode, write_string};

use crate::Value;

pub(crate) fn parse(text: &str) -> Value {
    Value::from(serde_json::from_str::<serde_json::Value>(text).unwrap())
}

pub(crate) fn ber(value: u32) -> Vec<u8> {
    let mut out = Vec::new();
    ber_encode(&mut out, value).unwrap();
    out
}

pub(crate) fn lcf_string(text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    write_string(&mut out, text).unwrap();
    out
}

/// `[BER index][BER len][payload]`
pub(crate) fn chunk(index: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = ber(index);
    out.extend(ber(payload.len() as u32));
    out.extend_from_slice(payload);
    out
}

/// Chunks followed by the 0 terminator.
pub(crate) fn record(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out: Vec<u8> = chunks.concat();
    out.push(0x00);
    out
}

/// Row count, then each row index and record.
pub(crate) fn table(rows: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = ber(rows.len() as u32);
    for (index, row) in rows {
        out.extend(ber(*index));
        out.extend_from_slice(row);
    }
    out
}

/// Signature followed by raw root blobs.
pub(crate) fn file_bytes(signature: &str, roots: &[Vec<u8>]) -> Vec<u8> {
    let mut out = lcf_string(signature);
    for root in roots {
        out.extend_from_slice(root);
    }
    out
}
