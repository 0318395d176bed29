//! Schema documents and the process-wide registry.
//!
//! A schema is a [`Value`] tree read by convention. Nodes are objects with
//! these keys:
//!
//! - `type`: a [`DataType`] name or the name of another document
//! - `name`: the field name
//! - `index`: the chunk index within an `array1d`
//! - `value`: child nodes, a literal default, or a document name
//!
//! Top-level documents carry a `signature` (file kinds) or a `name` (record
//! types), and file kinds list their `root` slots.
//!
//! The documents are compiled into the binary and parsed once on first use.

use std::fmt;
use std::hash::BuildHasherDefault;
use std::sync::OnceLock;

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;

use crate::{DataType, Error, Result, Value};

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Schema documents compiled into the binary.
const EMBEDDED: &[(&str, &str)] = &[
    ("common.json", include_str!("../schemas/common.json")),
    ("database.json", include_str!("../schemas/database.json")),
    ("map_tree.json", include_str!("../schemas/map_tree.json")),
    ("map_unit.json", include_str!("../schemas/map_unit.json")),
    ("save_data.json", include_str!("../schemas/save_data.json")),
];

static REGISTRY: OnceLock<FxHashMap<String, Value>> = OnceLock::new();

/// A view of one schema node.
#[derive(Clone, Copy)]
pub struct Schema<'s> {
    node: &'s Value,
}

impl<'s> Schema<'s> {
    /// Interpret a value as a schema node.
    #[inline]
    pub fn new(node: &'s Value) -> Self {
        Self { node }
    }

    /// The underlying value.
    #[inline]
    pub fn node(&self) -> &'s Value {
        self.node
    }

    /// The declared `type` string (empty if missing).
    #[inline]
    pub fn type_name(&self) -> &'s str {
        self.node.get("type").and_then(Value::as_str).unwrap_or("")
    }

    /// The field or document name.
    #[inline]
    pub fn name(&self) -> Option<&'s str> {
        self.node.get("name").and_then(Value::as_str)
    }

    /// The document signature.
    #[inline]
    pub fn signature(&self) -> Option<&'s str> {
        self.node.get("signature").and_then(Value::as_str)
    }

    /// The chunk index of a field.
    #[inline]
    pub fn index(&self) -> Option<u32> {
        self.node
            .get("index")
            .and_then(Value::as_i64)
            .and_then(|i| u32::try_from(i).ok())
    }

    /// The raw `value` entry.
    #[inline]
    pub fn value(&self) -> Option<&'s Value> {
        self.node.get("value")
    }

    /// Whether a root slot carries an explicit BER length prefix.
    #[inline]
    pub fn is_sized(&self) -> bool {
        self.node.get("sized").and_then(Value::as_bool).unwrap_or(false)
    }

    /// The sibling field whose size this field records.
    ///
    /// Size fields are named `_<field>_size`, or name their target with an
    /// explicit `size_of` key. Their value is rebuilt on save.
    pub fn size_of(&self) -> Option<&'s str> {
        if let Some(target) = self.node.get("size_of").and_then(Value::as_str) {
            return Some(target);
        }
        self.name()?
            .strip_prefix('_')?
            .strip_suffix("_size")
            .filter(|target| !target.is_empty())
    }

    /// Child nodes listed in `value`.
    pub fn fields(&self) -> impl Iterator<Item = Schema<'s>> + 's {
        self.value()
            .and_then(Value::as_array)
            .unwrap_or_default()
            .iter()
            .map(Schema::new)
    }

    /// Root slots of a file-level document.
    pub fn roots(&self) -> impl Iterator<Item = Schema<'s>> + 's {
        self.node
            .get("root")
            .and_then(Value::as_array)
            .unwrap_or_default()
            .iter()
            .map(Schema::new)
    }

    /// The literal default, if the node declares one.
    #[inline]
    pub fn default_value(&self) -> Option<&'s Value> {
        if has_default(*self) {
            self.value()
        } else {
            None
        }
    }

    /// Best human-readable label for error messages.
    pub fn label(&self) -> &'s str {
        self.name()
            .or_else(|| self.signature())
            .unwrap_or_else(|| self.type_name())
    }
}

impl fmt::Debug for Schema<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("label", &self.label())
            .field("type", &self.type_name())
            .field("index", &self.index())
            .finish()
    }
}

/// Key used to look up a field in a record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey<'k> {
    /// Chunk index.
    Index(u32),
    /// Field name.
    Name(&'k str),
}

impl From<u32> for FieldKey<'_> {
    fn from(index: u32) -> Self {
        FieldKey::Index(index)
    }
}

impl<'k> From<&'k str> for FieldKey<'k> {
    fn from(name: &'k str) -> Self {
        FieldKey::Name(name)
    }
}

impl<'k> From<&'k String> for FieldKey<'k> {
    fn from(name: &'k String) -> Self {
        FieldKey::Name(name)
    }
}

impl fmt::Display for FieldKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Index(index) => write!(f, "#{}", index),
            FieldKey::Name(name) => f.write_str(name),
        }
    }
}

fn registry() -> &'static FxHashMap<String, Value> {
    REGISTRY.get_or_init(load_embedded)
}

fn load_embedded() -> FxHashMap<String, Value> {
    let mut documents = FxHashMap::default();

    for (file, text) in EMBEDDED {
        let parsed: serde_json::Value = match serde_json::from_str(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(file, error = %e, "failed to parse embedded schema");
                continue;
            }
        };

        let docs = match Value::from(parsed) {
            Value::Array(docs) => docs,
            doc @ Value::Object(_) => vec![doc],
            other => {
                tracing::error!(file, kind = other.kind(), "embedded schema is not an object or array");
                continue;
            }
        };

        for doc in docs {
            let key = {
                let schema = Schema::new(&doc);
                schema.signature().or_else(|| schema.name()).map(str::to_string)
            };
            match key {
                Some(key) => {
                    if documents.insert(key.clone(), doc).is_some() {
                        tracing::error!(file, key, "duplicate schema document");
                    }
                }
                None => tracing::error!(file, "schema document has neither signature nor name"),
            }
        }
    }

    tracing::trace!(documents = documents.len(), "schema registry loaded");
    documents
}

/// Look up a schema document by signature or name.
pub fn get_schema(name: &str) -> Option<Schema<'static>> {
    registry().get(name).map(Schema::new)
}

/// Signatures of every file-level document, sorted.
pub fn signatures() -> Vec<&'static str> {
    let mut signatures: Vec<_> = registry()
        .values()
        .filter_map(|doc| Schema::new(doc).signature())
        .collect();
    signatures.sort_unstable();
    signatures
}

/// Keys of every registered document, sorted.
pub fn document_names() -> Vec<&'static str> {
    let mut names: Vec<_> = registry().keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

/// Find a field of `schema` by index or name.
pub fn find_schema<'s, 'k>(schema: Schema<'s>, key: impl Into<FieldKey<'k>>) -> Option<Schema<'s>> {
    let key = key.into();
    schema.fields().find(|field| match key {
        FieldKey::Index(index) => field.index() == Some(index),
        FieldKey::Name(name) => field.name() == Some(name),
    })
}

/// Resolve a node's `type` to a base [`DataType`].
///
/// Base types resolve to the node itself. Any other type string names a
/// document whose own type must be a base type; the document is returned as
/// the effective schema. Only one level of aliasing is followed.
pub fn resolve_type<'s>(schema: Schema<'s>) -> Result<(DataType, Schema<'s>)> {
    let type_name = schema.type_name();
    if let Some(data_type) = DataType::from_name(type_name) {
        return Ok((data_type, schema));
    }

    let target = get_schema(type_name).ok_or_else(|| Error::SchemaNotFound(type_name.to_string()))?;
    match DataType::from_name(target.type_name()) {
        Some(data_type) => Ok((data_type, target)),
        None => Err(Error::InvalidSchema(format!(
            "alias '{}' resolves to non-base type '{}'",
            type_name,
            target.type_name()
        ))),
    }
}

/// Resolve the schema that actually describes a composite's fields.
///
/// If the resolved node lists its fields inline it is returned as is.
/// Otherwise its `value` names another document, which is looked up once.
pub fn actual_schema<'s>(schema: Schema<'s>, expected: DataType) -> Result<Schema<'s>> {
    let (data_type, resolved) = resolve_type(schema)?;
    if data_type != expected {
        return Err(Error::type_mismatch(expected, data_type));
    }

    match resolved.value() {
        None | Some(Value::Array(_)) => Ok(resolved),
        Some(Value::String(name)) => {
            let target = get_schema(name).ok_or_else(|| Error::SchemaNotFound(name.clone()))?;
            if target.type_name() != expected.name() {
                return Err(Error::type_mismatch(expected, target.type_name()));
            }
            Ok(target)
        }
        Some(other) => Err(Error::InvalidSchema(format!(
            "{} '{}' has a {} value",
            expected,
            resolved.label(),
            other.kind()
        ))),
    }
}

/// Whether a node declares a literal default.
///
/// Composite types never have scalar defaults, even when their `value` is
/// a document name.
pub fn has_default(schema: Schema<'_>) -> bool {
    match schema.value() {
        None | Some(Value::Array(_)) => false,
        Some(_) => !matches!(schema.type_name(), "array1d" | "array2d"),
    }
}
