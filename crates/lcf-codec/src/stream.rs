//! Shared, immutable byte buffer backing every lazy view.

use std::fmt;
use std::sync::Arc;

use lcf_common::BinaryReader;

use crate::Result;

/// Reference-counted handle to the bytes of an LCF file.
///
/// Elements, arrays and files all hold a clone of the same handle plus their
/// own offset. The buffer never changes after construction, so views cannot
/// observe a moved or mutated buffer, and every decode works from its own
/// reader instead of a shared cursor.
#[derive(Clone)]
pub struct Stream {
    data: Arc<[u8]>,
}

impl Stream {
    /// Wrap a buffer.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    /// Total length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole buffer.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// A reader over the whole buffer, positioned at `offset`.
    #[inline]
    pub fn reader_at(&self, offset: usize) -> BinaryReader<'_> {
        BinaryReader::new_at(&self.data, offset)
    }

    /// A reader positioned at `offset` that cannot read past `offset + len`.
    ///
    /// Positions reported by the reader stay absolute.
    pub fn range_reader(&self, offset: usize, len: usize) -> Result<BinaryReader<'_>> {
        let end = offset.checked_add(len).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => Ok(BinaryReader::new_at(&self.data[..end], offset)),
            None => Err(lcf_common::Error::TruncatedStream {
                needed: len,
                available: self.data.len().saturating_sub(offset),
            }
            .into()),
        }
    }

    /// Whether two handles share the same buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &Stream) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").field("len", &self.data.len()).finish()
    }
}

impl From<Vec<u8>> for Stream {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}
