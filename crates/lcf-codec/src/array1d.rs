//! Sparse indexed records.
//!
//! On disk a record is a run of chunks terminated by index 0:
//!
//! ```text
//! ([BER index][BER len][len bytes])* [BER 0]
//! ```

use std::fmt;

use lcf_common::BinaryReader;

use crate::schema::{find_schema, has_default, FieldKey};
use crate::{Element, Error, Result, Schema, Stream};

/// A parsed record: chunk index to lazy [`Element`].
#[derive(Clone)]
pub struct Array1d<'s> {
    schema: Schema<'s>,
    entries: Vec<(u32, Element<'s>)>,
    /// Row index when owned by a table.
    row: Option<u32>,
    offset: usize,
    len: usize,
}

impl<'s> Array1d<'s> {
    /// Parse a record starting at the reader's position.
    ///
    /// Stops at index 0 or at the end of the reader's range. Indices must be
    /// strictly ascending.
    pub(crate) fn read(
        schema: Schema<'s>,
        stream: &Stream,
        reader: &mut BinaryReader<'_>,
    ) -> Result<Self> {
        let base = reader.position();
        let mut entries = Vec::new();
        let mut previous = 0u32;

        while !reader.is_empty() {
            let at = reader.position();
            let index = reader.read_ber()?;
            if index == 0 {
                break;
            }
            if index <= previous {
                return Err(Error::CorruptOrdering {
                    offset: at,
                    previous,
                    index,
                });
            }
            previous = index;

            let len = reader.read_ber()? as usize;
            let offset = reader.position();
            reader.skip(len)?;

            let field = find_schema(schema, index);
            entries.push((index, Element::new(field, stream.clone(), offset, len)));
        }

        Ok(Self {
            schema,
            entries,
            row: None,
            offset: base,
            len: reader.position() - base,
        })
    }

    /// A record with no chunks; every field reads as its default.
    pub fn empty(schema: Schema<'s>) -> Self {
        Self {
            schema,
            entries: Vec::new(),
            row: None,
            offset: 0,
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn with_index(mut self, index: u32) -> Self {
        self.row = Some(index);
        self
    }

    /// The record schema.
    #[inline]
    pub fn schema(&self) -> Schema<'s> {
        self.schema
    }

    /// Whether this record is a row of an [`Array2d`](crate::Array2d).
    #[inline]
    pub fn is_a2d(&self) -> bool {
        self.row.is_some()
    }

    /// Row index within the owning table, 0 for standalone records.
    ///
    /// Tables may use index 0 too; [`Array1d::is_a2d`] tells the two apart.
    #[inline]
    pub fn index(&self) -> u32 {
        self.row.unwrap_or(0)
    }

    /// Absolute offset of the first chunk.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes consumed, including the terminator.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len
    }

    /// Number of chunks present in the binary.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no chunks are present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the binary contains a chunk for `key`.
    pub fn contains<'k>(&self, key: impl Into<FieldKey<'k>>) -> bool {
        self.resolve_index(key.into())
            .map(|index| self.position(index).is_some())
            .unwrap_or(false)
    }

    /// Look up a field, falling back to its schema default.
    ///
    /// Returns `None` if the chunk is missing and the schema declares no
    /// default for it.
    pub fn get<'k>(&self, key: impl Into<FieldKey<'k>>) -> Option<Element<'s>> {
        let key = key.into();
        let index = self.resolve_index(key)?;
        if let Some(pos) = self.position(index) {
            return Some(self.entries[pos].1.clone());
        }

        find_schema(self.schema, index)
            .filter(|field| has_default(*field))
            .map(Element::absent)
    }

    /// Like [`Array1d::get`], but a missing field is an error.
    pub fn field<'k>(&self, key: impl Into<FieldKey<'k>>) -> Result<Element<'s>> {
        let key = key.into();
        self.get(key)
            .ok_or_else(|| Error::MissingField(format!("{}.{}", self.schema.label(), key)))
    }

    /// Present chunks in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Element<'s>)> + '_ {
        self.entries.iter().map(|(index, element)| (*index, element))
    }

    fn resolve_index(&self, key: FieldKey<'_>) -> Option<u32> {
        match key {
            FieldKey::Index(index) => Some(index),
            FieldKey::Name(name) => find_schema(self.schema, name).and_then(|field| field.index()),
        }
    }

    fn position(&self, index: u32) -> Option<usize> {
        self.entries.binary_search_by_key(&index, |(i, _)| *i).ok()
    }
}

impl fmt::Debug for Array1d<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array1d")
            .field("schema", &self.schema.label())
            .field("row", &self.row)
            .field("chunks", &self.entries.len())
            .field("len", &self.len)
            .finish()
    }
}
