//! LCF data types.

use std::fmt;

/// Data types recognized in a schema node's `type` field.
///
/// Any other type string is a named alias resolved through the schema
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// BER-encoded signed 32-bit integer.
    Integer,
    /// BER-encoded integer, non-zero is true.
    Bool,
    /// 8-byte little-endian IEEE-754 double.
    Float,
    /// Codepage string filling the whole chunk.
    String,
    /// Sequence of event commands filling the whole chunk.
    Event,
    /// Little-endian `i8` array.
    Int8Array,
    /// Little-endian `i16` array.
    Int16Array,
    /// Little-endian `i32` array.
    Int32Array,
    /// Sequence of BER integers filling the whole chunk.
    BerArray,
    /// BER count, node ids, then the active node id.
    MapTree,
    /// Sparse indexed record.
    Array1d,
    /// Sparse indexed table of records.
    Array2d,
}

impl DataType {
    /// Every recognized type, in declaration order.
    pub const ALL: [DataType; 12] = [
        DataType::Integer,
        DataType::Bool,
        DataType::Float,
        DataType::String,
        DataType::Event,
        DataType::Int8Array,
        DataType::Int16Array,
        DataType::Int32Array,
        DataType::BerArray,
        DataType::MapTree,
        DataType::Array1d,
        DataType::Array2d,
    ];

    /// Parse from a schema `type` string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "integer" => Some(Self::Integer),
            "bool" => Some(Self::Bool),
            "float" => Some(Self::Float),
            "string" => Some(Self::String),
            "event" => Some(Self::Event),
            "int8array" => Some(Self::Int8Array),
            "int16array" => Some(Self::Int16Array),
            "int32array" => Some(Self::Int32Array),
            "ber_array" => Some(Self::BerArray),
            "map_tree" => Some(Self::MapTree),
            "array1d" => Some(Self::Array1d),
            "array2d" => Some(Self::Array2d),
            _ => None,
        }
    }

    /// The schema `type` string for this type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::String => "string",
            Self::Event => "event",
            Self::Int8Array => "int8array",
            Self::Int16Array => "int16array",
            Self::Int32Array => "int32array",
            Self::BerArray => "ber_array",
            Self::MapTree => "map_tree",
            Self::Array1d => "array1d",
            Self::Array2d => "array2d",
        }
    }

    /// Whether this type nests other schema nodes.
    #[inline]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Array1d | Self::Array2d)
    }

    /// Element width in bytes for fixed-width array types.
    pub fn element_width(&self) -> Option<usize> {
        match self {
            Self::Int8Array => Some(1),
            Self::Int16Array => Some(2),
            Self::Int32Array => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
