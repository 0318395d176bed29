//! Lazy, schema-typed view of one chunk.
//!
//! An [`Element`] records where a chunk lives in the stream and which schema
//! node describes it. Nothing is decoded until one of the typed getters is
//! called, and every getter checks that the decoder consumed exactly the
//! chunk's declared length.

use std::fmt;
use std::io::{self, Write};
use std::marker::PhantomData;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use lcf_common::BinaryReader;

use crate::schema::{actual_schema, resolve_type};
use crate::{Array1d, Array2d, DataType, Error, Event, MapTree, Result, Schema, Stream, Value};

/// A chunk bound to its schema node.
///
/// Elements without a stream are *absent*: the binary omitted the chunk and
/// the value comes from the schema default. Elements without a schema are
/// *opaque*: the chunk index is unknown to the schema and only its raw bytes
/// are available.
#[derive(Clone)]
pub struct Element<'s> {
    schema: Option<Schema<'s>>,
    stream: Option<Stream>,
    offset: usize,
    len: usize,
}

impl<'s> Element<'s> {
    #[inline]
    pub(crate) fn new(schema: Option<Schema<'s>>, stream: Stream, offset: usize, len: usize) -> Self {
        Self {
            schema,
            stream: Some(stream),
            offset,
            len,
        }
    }

    /// An element with no data, decoding to the schema default.
    #[inline]
    pub fn absent(schema: Schema<'s>) -> Self {
        Self {
            schema: Some(schema),
            stream: None,
            offset: 0,
            len: 0,
        }
    }

    /// An element spanning the whole stream.
    pub fn from_stream(schema: Schema<'s>, stream: Stream) -> Self {
        let len = stream.len();
        Self::new(Some(schema), stream, 0, len)
    }

    /// The schema node, or `None` for opaque chunks.
    #[inline]
    pub fn schema(&self) -> Option<Schema<'s>> {
        self.schema
    }

    /// The backing stream, or `None` for absent elements.
    #[inline]
    pub fn stream(&self) -> Option<&Stream> {
        self.stream.as_ref()
    }

    /// Absolute offset of the chunk payload.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Declared payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the value comes from the schema default.
    #[inline]
    pub fn is_absent(&self) -> bool {
        self.stream.is_none()
    }

    /// Whether the chunk index is unknown to the schema.
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.schema.is_none()
    }

    /// Field name, or a placeholder for opaque chunks.
    pub fn label(&self) -> &'s str {
        self.schema.map(|s| s.label()).unwrap_or("<opaque>")
    }

    /// The resolved base type.
    pub fn data_type(&self) -> Result<DataType> {
        Ok(self.resolve()?.0)
    }

    /// Decode as an integer.
    pub fn i(&self) -> Result<i32> {
        self.expect(DataType::Integer)?;
        match &self.stream {
            Some(stream) => self.decode(stream, |r| Ok(r.read_ber_i32()?)),
            None => {
                let default = self.default()?;
                default
                    .as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .ok_or_else(|| Error::type_mismatch(DataType::Integer, default.kind()))
            }
        }
    }

    /// Decode as a bool.
    pub fn b(&self) -> Result<bool> {
        self.expect(DataType::Bool)?;
        match &self.stream {
            Some(stream) => self.decode(stream, |r| Ok(r.read_ber()? != 0)),
            None => {
                let default = self.default()?;
                default
                    .as_bool()
                    .ok_or_else(|| Error::type_mismatch(DataType::Bool, default.kind()))
            }
        }
    }

    /// Decode as a double.
    pub fn d(&self) -> Result<f64> {
        self.expect(DataType::Float)?;
        match &self.stream {
            Some(stream) => self.decode(stream, |r| Ok(r.read_f64()?)),
            None => {
                let default = self.default()?;
                default
                    .as_f64()
                    .ok_or_else(|| Error::type_mismatch(DataType::Float, default.kind()))
            }
        }
    }

    /// Decode as a string filling the chunk.
    pub fn s(&self) -> Result<String> {
        self.expect(DataType::String)?;
        match &self.stream {
            Some(stream) => self.decode(stream, |r| Ok(r.read_string(r.remaining())?)),
            None => {
                let default = self.default()?;
                default
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::type_mismatch(DataType::String, default.kind()))
            }
        }
    }

    /// Decode as an event command list.
    pub fn e(&self) -> Result<Event> {
        self.expect(DataType::Event)?;
        let stream = self.require_stream()?;
        self.decode(stream, Event::read)
    }

    /// View as an `i8` array.
    pub fn i8a(&self) -> Result<IntArray<i8>> {
        self.int_array()
    }

    /// View as an `i16` array.
    pub fn i16a(&self) -> Result<IntArray<i16>> {
        self.int_array()
    }

    /// View as an `i32` array.
    pub fn i32a(&self) -> Result<IntArray<i32>> {
        self.int_array()
    }

    /// Decode a sequence of BER integers filling the chunk.
    pub fn ber_array(&self) -> Result<Vec<i32>> {
        self.expect(DataType::BerArray)?;
        let stream = self.require_stream()?;
        self.decode(stream, |r| {
            let mut values = Vec::new();
            while !r.is_empty() {
                values.push(r.read_ber_i32()?);
            }
            Ok(values)
        })
    }

    /// Decode a map tree block.
    pub fn map_tree(&self) -> Result<MapTree> {
        self.expect(DataType::MapTree)?;
        let stream = self.require_stream()?;
        self.decode(stream, MapTree::read)
    }

    /// Parse as a record. Absent elements give an empty record.
    pub fn a1d(&self) -> Result<Array1d<'s>> {
        let schema = self.composite_schema(DataType::Array1d)?;
        match &self.stream {
            Some(stream) => self.decode(stream, |r| Array1d::read(schema, stream, r)),
            None => Ok(Array1d::empty(schema)),
        }
    }

    /// Parse as a table. Absent elements give an empty table.
    pub fn a2d(&self) -> Result<Array2d<'s>> {
        let schema = self.composite_schema(DataType::Array2d)?;
        match &self.stream {
            Some(stream) => self.decode(stream, |r| Array2d::read(schema, stream, r)),
            None => Ok(Array2d::empty(schema)),
        }
    }

    /// The raw payload bytes, for any element with data.
    pub fn bytes(&self) -> Result<&[u8]> {
        let stream = self.require_stream()?;
        stream
            .bytes()
            .get(self.offset..self.offset + self.len)
            .ok_or_else(|| {
                lcf_common::Error::TruncatedStream {
                    needed: self.len,
                    available: stream.len().saturating_sub(self.offset),
                }
                .into()
            })
    }

    fn resolve(&self) -> Result<(DataType, Schema<'s>)> {
        match self.schema {
            Some(schema) => resolve_type(schema),
            None => Err(Error::type_mismatch("schema field", "opaque chunk")),
        }
    }

    fn expect(&self, expected: DataType) -> Result<Schema<'s>> {
        let (data_type, resolved) = self.resolve()?;
        if data_type != expected {
            return Err(Error::type_mismatch(expected, data_type));
        }
        Ok(resolved)
    }

    fn composite_schema(&self, expected: DataType) -> Result<Schema<'s>> {
        match self.schema {
            Some(schema) => actual_schema(schema, expected),
            None => Err(Error::type_mismatch(expected, "opaque chunk")),
        }
    }

    fn default(&self) -> Result<&'s Value> {
        self.schema
            .and_then(|schema| schema.default_value())
            .ok_or_else(|| Error::MissingValue(self.label().to_string()))
    }

    fn require_stream(&self) -> Result<&Stream> {
        self.stream
            .as_ref()
            .ok_or_else(|| Error::MissingValue(self.label().to_string()))
    }

    /// Run `f` over the chunk and check it consumed the whole payload.
    fn decode<T>(
        &self,
        stream: &Stream,
        f: impl FnOnce(&mut BinaryReader<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut reader = stream.range_reader(self.offset, self.len)?;
        let value = f(&mut reader)?;
        let consumed = reader.position() - self.offset;
        if consumed != self.len {
            return Err(Error::ChunkLength {
                offset: self.offset,
                expected: self.len,
                consumed,
            });
        }
        Ok(value)
    }

    fn int_array<T: ArrayItem>(&self) -> Result<IntArray<T>> {
        self.expect(T::DATA_TYPE)?;
        let stream = self.require_stream()?;
        if self.len % T::WIDTH != 0 {
            return Err(Error::ChunkLength {
                offset: self.offset,
                expected: self.len,
                consumed: self.len - self.len % T::WIDTH,
            });
        }
        // Validate the range once so element reads cannot fail later.
        stream.range_reader(self.offset, self.len)?;
        Ok(IntArray {
            stream: stream.clone(),
            offset: self.offset,
            count: self.len / T::WIDTH,
            _marker: PhantomData,
        })
    }
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("field", &self.label())
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("absent", &self.is_absent())
            .finish()
    }
}

/// Integer types stored in fixed-width array chunks.
pub trait ArrayItem: Copy + Into<i64> + TryFrom<i64> {
    /// Width in bytes.
    const WIDTH: usize;
    /// The matching schema type.
    const DATA_TYPE: DataType;

    /// Decode from exactly [`Self::WIDTH`] little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encode as little-endian bytes.
    fn write_le<W: Write + ?Sized>(self, writer: &mut W) -> io::Result<()>;
}

impl ArrayItem for i8 {
    const WIDTH: usize = 1;
    const DATA_TYPE: DataType = DataType::Int8Array;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    #[inline]
    fn write_le<W: Write + ?Sized>(self, writer: &mut W) -> io::Result<()> {
        writer.write_i8(self)
    }
}

impl ArrayItem for i16 {
    const WIDTH: usize = 2;
    const DATA_TYPE: DataType = DataType::Int16Array;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_i16(bytes)
    }

    #[inline]
    fn write_le<W: Write + ?Sized>(self, writer: &mut W) -> io::Result<()> {
        writer.write_i16::<LittleEndian>(self)
    }
}

impl ArrayItem for i32 {
    const WIDTH: usize = 4;
    const DATA_TYPE: DataType = DataType::Int32Array;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        LittleEndian::read_i32(bytes)
    }

    #[inline]
    fn write_le<W: Write + ?Sized>(self, writer: &mut W) -> io::Result<()> {
        writer.write_i32::<LittleEndian>(self)
    }
}

/// Lazily indexed fixed-width integer array.
///
/// Items are decoded on access; nothing is copied out of the stream.
#[derive(Clone)]
pub struct IntArray<T> {
    stream: Stream,
    offset: usize,
    count: usize,
    _marker: PhantomData<T>,
}

impl<T: ArrayItem> IntArray<T> {
    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the array is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Item at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.count {
            return None;
        }
        let start = self.offset + index * T::WIDTH;
        self.stream.bytes().get(start..start + T::WIDTH).map(T::read_le)
    }

    /// Iterate over all items.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.count).filter_map(move |i| self.get(i))
    }

    /// Copy every item out.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: ArrayItem + fmt::Debug> fmt::Debug for IntArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ber, parse};

    fn element<'s>(doc: &'s Value, bytes: Vec<u8>) -> Element<'s> {
        Element::from_stream(Schema::new(doc), Stream::new(bytes))
    }

    #[test]
    fn test_scalars() {
        let int = parse(r#"{"type": "integer"}"#);
        assert_eq!(element(&int, ber(300)).i().unwrap(), 300);
        assert_eq!(element(&int, ber(-1i32 as u32)).i().unwrap(), -1);

        let flag = parse(r#"{"type": "bool"}"#);
        assert!(element(&flag, vec![0x01]).b().unwrap());
        assert!(!element(&flag, vec![0x00]).b().unwrap());

        let float = parse(r#"{"type": "float"}"#);
        assert_eq!(element(&float, 0.5f64.to_le_bytes().to_vec()).d().unwrap(), 0.5);

        let string = parse(r#"{"type": "string"}"#);
        assert_eq!(element(&string, b"1234".to_vec()).s().unwrap(), "1234");
        assert_eq!(element(&string, Vec::new()).s().unwrap(), "");
    }

    #[test]
    fn test_alias_dispatch() {
        let field = parse(r#"{"type": "MapId", "value": 0}"#);
        let el = element(&field, vec![0x07]);
        assert_eq!(el.data_type().unwrap(), DataType::Integer);
        assert_eq!(el.i().unwrap(), 7);
    }

    #[test]
    fn test_type_mismatch() {
        let string = parse(r#"{"type": "string"}"#);
        let el = element(&string, b"ab".to_vec());
        assert!(matches!(el.i(), Err(Error::TypeMismatch { .. })));
        assert!(matches!(el.a1d(), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_chunk_length_checked() {
        // One BER integer followed by a stray byte.
        let int = parse(r#"{"type": "integer"}"#);
        let el = element(&int, vec![0x05, 0x00]);
        assert!(matches!(
            el.i(),
            Err(Error::ChunkLength {
                expected: 2,
                consumed: 1,
                ..
            })
        ));

        let float = parse(r#"{"type": "float"}"#);
        assert!(element(&float, vec![0; 4]).d().is_err());
    }

    #[test]
    fn test_absent_defaults() {
        let int = parse(r#"{"type": "integer", "value": 42}"#);
        assert_eq!(Element::absent(Schema::new(&int)).i().unwrap(), 42);

        let string = parse(r#"{"type": "string", "value": "(OFF)"}"#);
        assert_eq!(Element::absent(Schema::new(&string)).s().unwrap(), "(OFF)");

        let no_default = parse(r#"{"name": "hp", "type": "integer"}"#);
        assert!(matches!(
            Element::absent(Schema::new(&no_default)).i(),
            Err(Error::MissingValue(name)) if name == "hp"
        ));

        let wrong_kind = parse(r#"{"type": "integer", "value": "three"}"#);
        assert!(matches!(
            Element::absent(Schema::new(&wrong_kind)).i(),
            Err(Error::TypeMismatch { .. })
        ));

        let record = parse(r#"{"type": "array1d", "value": []}"#);
        let empty = Element::absent(Schema::new(&record)).a1d().unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_int_arrays() {
        let i16s = parse(r#"{"type": "int16array"}"#);
        let el = element(&i16s, vec![0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80]);
        let array = el.i16a().unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array.get(1), Some(-1));
        assert_eq!(array.get(3), None);
        assert_eq!(array.to_vec(), vec![1, -1, i16::MIN]);

        // Odd length cannot hold whole i16 items.
        let odd = element(&i16s, vec![0x01, 0x00, 0x02]);
        assert!(matches!(odd.i16a(), Err(Error::ChunkLength { .. })));

        let i8s = parse(r#"{"type": "int8array"}"#);
        assert_eq!(element(&i8s, vec![0x01, 0xFE]).i8a().unwrap().to_vec(), vec![1, -2]);

        let i32s = parse(r#"{"type": "int32array"}"#);
        let array = element(&i32s, vec![0x10, 0x00, 0x00, 0x00]).i32a().unwrap();
        assert_eq!(array.to_vec(), vec![16]);
        assert!(element(&i32s, vec![0x10, 0x00, 0x00, 0x00]).i16a().is_err());
    }

    #[test]
    fn test_ber_array_and_map_tree() {
        let bers = parse(r#"{"type": "ber_array"}"#);
        let mut bytes = ber(1);
        bytes.extend(ber(200));
        bytes.extend(ber(0));
        assert_eq!(element(&bers, bytes).ber_array().unwrap(), vec![1, 200, 0]);

        let tree = parse(r#"{"type": "map_tree"}"#);
        let decoded = element(&tree, vec![0x02, 0x05, 0x07, 0x03]).map_tree().unwrap();
        assert_eq!(decoded.nodes, vec![5, 7]);
        assert_eq!(decoded.active_node, 3);
    }

    #[test]
    fn test_bytes() {
        let string = parse(r#"{"type": "string"}"#);
        let stream = Stream::new(b"xxabcdyy".to_vec());
        let el = Element::new(Some(Schema::new(&string)), stream, 2, 4);
        assert_eq!(el.bytes().unwrap(), b"abcd");
        assert_eq!(el.s().unwrap(), "abcd");
        assert!(Element::absent(Schema::new(&string)).bytes().is_err());
    }
}
