//! Sparse indexed tables.
//!
//! On disk a table is a row count followed by that many indexed records:
//!
//! ```text
//! [BER count] ([BER index][Array1d])*count
//! ```

use std::fmt;

use lcf_common::BinaryReader;

use crate::{Array1d, Error, Result, Schema, Stream};

/// A parsed table of records.
///
/// Row indices are non-decreasing. Several rows may share an index.
#[derive(Clone)]
pub struct Array2d<'s> {
    schema: Schema<'s>,
    rows: Vec<Array1d<'s>>,
    offset: usize,
    len: usize,
}

impl<'s> Array2d<'s> {
    /// Parse a table starting at the reader's position.
    pub(crate) fn read(
        schema: Schema<'s>,
        stream: &Stream,
        reader: &mut BinaryReader<'_>,
    ) -> Result<Self> {
        let base = reader.position();
        let count = reader.read_ber()? as usize;

        // Each row needs at least its index byte. The last row may end at the
        // range boundary without a terminator.
        if count > reader.remaining() {
            return Err(lcf_common::Error::TruncatedStream {
                needed: count,
                available: reader.remaining(),
            }
            .into());
        }

        let mut rows = Vec::with_capacity(count);
        let mut previous = 0u32;
        for _ in 0..count {
            let at = reader.position();
            let index = reader.read_ber()?;
            if index < previous {
                return Err(Error::CorruptOrdering {
                    offset: at,
                    previous,
                    index,
                });
            }
            previous = index;
            rows.push(Array1d::read(schema, stream, reader)?.with_index(index));
        }

        Ok(Self {
            schema,
            rows,
            offset: base,
            len: reader.position() - base,
        })
    }

    /// A table with no rows.
    pub fn empty(schema: Schema<'s>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            offset: 0,
            len: 0,
        }
    }

    /// The row schema.
    #[inline]
    pub fn schema(&self) -> Schema<'s> {
        self.schema
    }

    /// Absolute offset of the row count.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes consumed.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len
    }

    /// Number of rows, counting duplicates.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first row with `index`.
    pub fn get(&self, index: u32) -> Option<&Array1d<'s>> {
        self.get_all(index).first()
    }

    /// Every row with `index`, in file order.
    pub fn get_all(&self, index: u32) -> &[Array1d<'s>] {
        let start = self.rows.partition_point(|row| row.index() < index);
        let end = self.rows.partition_point(|row| row.index() <= index);
        &self.rows[start..end]
    }

    /// Rows in file order.
    pub fn iter(&self) -> std::slice::Iter<'_, Array1d<'s>> {
        self.rows.iter()
    }
}

impl<'a, 's> IntoIterator for &'a Array2d<'s> {
    type Item = &'a Array1d<'s>;
    type IntoIter = std::slice::Iter<'a, Array1d<'s>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl fmt::Debug for Array2d<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array2d")
            .field("schema", &self.schema.label())
            .field("rows", &self.rows.len())
            .field("len", &self.len)
            .finish()
    }
}
