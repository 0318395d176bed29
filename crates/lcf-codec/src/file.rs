//! Top-level LCF file container.
//!
//! A file is a length-prefixed signature string followed by one blob per
//! root slot of the matching schema document. Roots carry no length prefix
//! unless their slot is marked `sized`; otherwise the extent of each root is
//! found by parsing it once up front.

use std::path::Path;
use std::sync::Arc;

use lcf_common::BinaryReader;

use crate::schema::{actual_schema, get_schema, resolve_type, FieldKey};
use crate::{Array1d, Array2d, DataType, Element, Error, MapTree, Result, Schema, Stream};

/// An opened LCF file.
///
/// Header problems (unreadable signature, unknown file kind) do not fail
/// construction: the file is returned with [`LcfFile::valid`] false and a
/// message in [`LcfFile::error`]. Corruption inside a root is an error.
pub struct LcfFile {
    signature: String,
    schema: Option<Schema<'static>>,
    stream: Stream,
    roots: Vec<Element<'static>>,
    error: Option<String>,
    trailing: usize,
}

impl LcfFile {
    /// Read and parse a file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "opening lcf file");
        Self::from_bytes(data)
    }

    /// Parse a file held in memory.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let stream = Stream::new(data);
        let mut reader = stream.reader_at(0);

        let signature = match reader.read_prefixed_string() {
            Ok(signature) => signature,
            Err(e) => {
                let message = format!("failed to read signature: {}", e);
                tracing::warn!(error = %e, "unreadable lcf header");
                return Ok(Self::invalid(stream, String::new(), message));
            }
        };

        let schema = match get_schema(&signature).filter(|schema| schema.signature().is_some()) {
            Some(schema) => schema,
            None => {
                let message = format!("unknown signature '{}'", signature);
                tracing::warn!(%signature, "no schema for lcf signature");
                return Ok(Self::invalid(stream, signature, message));
            }
        };

        let roots = read_roots(schema, &stream, &mut reader)?;

        let trailing = reader.remaining();
        if trailing > 0 {
            tracing::warn!(%signature, trailing, "unparsed data after last root");
        }

        Ok(Self {
            signature,
            schema: Some(schema),
            stream,
            roots,
            error: None,
            trailing,
        })
    }

    fn invalid(stream: Stream, signature: String, message: String) -> Self {
        Self {
            signature,
            schema: None,
            stream,
            roots: Vec::new(),
            error: Some(message),
            trailing: 0,
        }
    }

    /// Whether the header was read and a schema matched it.
    #[inline]
    pub fn valid(&self) -> bool {
        self.error.is_none()
    }

    /// Why the file is invalid, or an empty string.
    #[inline]
    pub fn error(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }

    /// The file signature.
    #[inline]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The matched schema document.
    #[inline]
    pub fn schema(&self) -> Option<Schema<'static>> {
        self.schema
    }

    /// The backing stream.
    #[inline]
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// Root elements in slot order.
    #[inline]
    pub fn roots(&self) -> &[Element<'static>] {
        &self.roots
    }

    /// Root element `index`.
    #[inline]
    pub fn root(&self, index: usize) -> Option<&Element<'static>> {
        self.roots.get(index)
    }

    /// Bytes after the last root that no slot accounted for.
    #[inline]
    pub fn trailing_bytes(&self) -> usize {
        self.trailing
    }

    /// The first root parsed as a record.
    pub fn record(&self) -> Result<Array1d<'static>> {
        self.root(0)
            .ok_or_else(|| Error::MissingField(format!("{} root #0", self.signature)))?
            .a1d()
    }

    /// Look up a field of the first root.
    pub fn get<'k>(&self, key: impl Into<FieldKey<'k>>) -> Result<Option<Element<'static>>> {
        Ok(self.record()?.get(key))
    }

    /// Like [`LcfFile::get`], but a missing field is an error.
    pub fn field<'k>(&self, key: impl Into<FieldKey<'k>>) -> Result<Element<'static>> {
        self.record()?.field(key)
    }
}

impl std::fmt::Debug for LcfFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LcfFile")
            .field("signature", &self.signature)
            .field("valid", &self.valid())
            .field("roots", &self.roots)
            .field("trailing", &self.trailing)
            .finish()
    }
}

/// Wrap one element around each root slot of `schema`.
fn read_roots<'s>(
    schema: Schema<'s>,
    stream: &Stream,
    reader: &mut BinaryReader<'_>,
) -> Result<Vec<Element<'s>>> {
    let mut roots = Vec::new();
    for slot in schema.roots() {
        let element = if slot.is_sized() {
            let len = reader.read_ber()? as usize;
            let offset = reader.position();
            reader.skip(len)?;
            Element::new(Some(slot), stream.clone(), offset, len)
        } else {
            let offset = reader.position();
            measure_root(slot, stream, reader)?;
            Element::new(Some(slot), stream.clone(), offset, reader.position() - offset)
        };
        tracing::debug!(
            root = slot.label(),
            offset = element.offset(),
            len = element.len(),
            "measured root"
        );
        roots.push(element);
    }
    Ok(roots)
}

/// Advance `reader` past one root by parsing it.
fn measure_root(slot: Schema<'_>, stream: &Stream, reader: &mut BinaryReader<'_>) -> Result<()> {
    let (data_type, _) = resolve_type(slot)?;
    match data_type {
        DataType::Array1d => {
            Array1d::read(actual_schema(slot, data_type)?, stream, reader)?;
        }
        DataType::Array2d => {
            Array2d::read(actual_schema(slot, data_type)?, stream, reader)?;
        }
        DataType::MapTree => {
            MapTree::read(reader)?;
        }
        DataType::Integer | DataType::Bool => {
            reader.read_ber()?;
        }
        DataType::Float => {
            reader.read_f64()?;
        }
        other => return Err(Error::UnsupportedRoot(other.name().to_string())),
    }
    Ok(())
}
