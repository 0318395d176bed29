//! Serialization of value trees back into LCF binary.
//!
//! Every chunk is written as `[BER index][BER size][payload]`, so the size of
//! a payload must be known before it is written. [`calculate_size`] computes
//! that size exactly, and the writer checks each payload against it.
//!
//! Internal `_`-prefixed fields never come from the value tree. Size fields
//! (`_<field>_size`) are recomputed from the field they describe, and any
//! other internal field is left out.

use std::borrow::Cow;
use std::io::{self, Write};

use lcf_common::{ber_size, writing_string_size, WriteLcfExt};

use crate::export::REST_KEY;
use crate::schema::{actual_schema, find_schema, get_schema, resolve_type};
use crate::value::parse_non_finite;
use crate::{ArrayItem, DataType, Error, Event, EventCommand, MapTree, Result, Schema, Value};

/// Byte count `save_element` writes for `value` under `schema`.
pub fn calculate_size(value: &Value, schema: Schema<'_>) -> Result<usize> {
    let (data_type, _) = resolve_type(schema)?;
    let field = schema.label();

    Ok(match data_type {
        DataType::Integer => ber_size(int_value(value, field)? as u32),
        DataType::Bool => ber_size(bool_value(value, field)? as u32),
        DataType::Float => 8,
        DataType::String => writing_string_size(str_value(value, field)?)?,
        DataType::Event => event_value(value, field)?.byte_size()?,
        DataType::Int8Array => int_array_size::<i8>(value, field)?,
        DataType::Int16Array => int_array_size::<i16>(value, field)?,
        DataType::Int32Array => int_array_size::<i32>(value, field)?,
        DataType::BerArray => ber_array_value(value, field)?
            .iter()
            .map(|&v| ber_size(v as u32))
            .sum(),
        DataType::MapTree => map_tree_value(value, field)?.byte_size(),
        DataType::Array1d => array1d_size(value, actual_schema(schema, data_type)?)?,
        DataType::Array2d => array2d_size(value, actual_schema(schema, data_type)?)?,
    })
}

/// Write `value` as the payload of a chunk typed by `schema`.
pub fn save_element<W: Write>(value: &Value, schema: Schema<'_>, writer: &mut W) -> Result<()> {
    write_element(value, schema, &mut CountingWriter::new(writer))
}

/// Write a record: its chunks in index order and the 0 terminator.
///
/// `schema` is the record schema itself, as returned by
/// [`actual_schema`](crate::schema::actual_schema).
pub fn save_array1d<W: Write>(value: &Value, schema: Schema<'_>, writer: &mut W) -> Result<()> {
    write_array1d(value, schema, &mut CountingWriter::new(writer))
}

/// Write a table: the row count, then each row index and record.
pub fn save_array2d<W: Write>(value: &Value, schema: Schema<'_>, writer: &mut W) -> Result<()> {
    write_array2d(value, schema, &mut CountingWriter::new(writer))
}

/// Write a whole file from a `{"signature": .., "root": [..]}` tree.
pub fn save_lcf<W: Write>(value: &Value, writer: &mut W) -> Result<()> {
    let signature = value
        .get("signature")
        .ok_or_else(|| Error::MissingField("signature".to_string()))?;
    let signature = str_value(signature, "signature")?;
    let schema = get_schema(signature)
        .filter(|schema| schema.signature().is_some())
        .ok_or_else(|| Error::SchemaNotFound(signature.to_string()))?;

    let mut out = CountingWriter::new(writer);
    write_file(value, signature, schema, &mut out)?;
    tracing::debug!(signature, bytes = out.written(), "saved lcf file");
    Ok(())
}

/// [`save_lcf`] into a new buffer.
pub fn to_bytes(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    save_lcf(value, &mut out)?;
    Ok(out)
}

/// Tracks how many bytes have gone through a writer.
struct CountingWriter<'w> {
    inner: &'w mut dyn Write,
    written: usize,
}

impl<'w> CountingWriter<'w> {
    fn new(inner: &'w mut dyn Write) -> Self {
        Self { inner, written: 0 }
    }

    #[inline]
    fn written(&self) -> usize {
        self.written
    }
}

impl Write for CountingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn write_file(
    value: &Value,
    signature: &str,
    schema: Schema<'_>,
    out: &mut CountingWriter<'_>,
) -> Result<()> {
    let roots = value
        .get("root")
        .ok_or_else(|| Error::MissingField("root".to_string()))?;
    let roots = roots.as_array().ok_or_else(|| Error::InvalidValue {
        field: "root".to_string(),
        expected: "array",
        actual: roots.kind(),
    })?;

    let slots: Vec<_> = schema.roots().collect();
    if roots.len() != slots.len() {
        return Err(Error::InvalidValue {
            field: "root".to_string(),
            expected: "one value per root slot",
            actual: "array of a different length",
        });
    }

    out.write_lcf_string(signature)?;
    for (slot, root) in slots.into_iter().zip(roots) {
        if slot.is_sized() {
            let size = calculate_size(root, slot)?;
            out.write_ber(size as u32)?;
            write_checked(root, slot, size, out)?;
        } else {
            write_element(root, slot, out)?;
        }
    }
    Ok(())
}

/// Write a payload and check it matches the size already announced.
fn write_checked(value: &Value, schema: Schema<'_>, size: usize, out: &mut CountingWriter<'_>) -> Result<()> {
    let base = out.written();
    write_element(value, schema, out)?;
    let actual = out.written() - base;
    if actual != size {
        return Err(Error::SizeMismatch {
            field: schema.label().to_string(),
            expected: size,
            actual,
        });
    }
    Ok(())
}

fn write_element(value: &Value, schema: Schema<'_>, out: &mut CountingWriter<'_>) -> Result<()> {
    let (data_type, _) = resolve_type(schema)?;
    let field = schema.label();

    match data_type {
        DataType::Integer => out.write_ber_i32(int_value(value, field)?)?,
        DataType::Bool => out.write_ber(bool_value(value, field)? as u32)?,
        DataType::Float => out.write_f64_le(float_value(value, field)?)?,
        DataType::String => out.write_lcf_string_without_size(str_value(value, field)?)?,
        DataType::Event => event_value(value, field)?.write(out)?,
        DataType::Int8Array => write_int_array::<i8>(value, field, out)?,
        DataType::Int16Array => write_int_array::<i16>(value, field, out)?,
        DataType::Int32Array => write_int_array::<i32>(value, field, out)?,
        DataType::BerArray => {
            for v in ber_array_value(value, field)? {
                out.write_ber_i32(v)?;
            }
        }
        DataType::MapTree => map_tree_value(value, field)?.write(out)?,
        DataType::Array1d => write_array1d(value, actual_schema(schema, data_type)?, out)?,
        DataType::Array2d => write_array2d(value, actual_schema(schema, data_type)?, out)?,
    }
    Ok(())
}

/// One chunk of a record about to be written.
struct Chunk<'v, 's> {
    index: u32,
    value: Cow<'v, Value>,
    /// `None` for chunks the schema does not know; their value is raw bytes.
    schema: Option<Schema<'s>>,
}

impl Chunk<'_, '_> {
    fn payload_size(&self) -> Result<usize> {
        match self.schema {
            Some(schema) => calculate_size(&self.value, schema),
            None => Ok(opaque_bytes(&self.value, self.index)?.len()),
        }
    }

    fn write(&self, out: &mut CountingWriter<'_>) -> Result<()> {
        match self.schema {
            Some(schema) => write_element(&self.value, schema, out),
            None => {
                out.write_all(&opaque_bytes(&self.value, self.index)?)?;
                Ok(())
            }
        }
    }
}

/// Resolve the entries of a record object into chunks sorted by index.
///
/// Internal (`_`-prefixed) keys and values equal to their schema default are
/// left out. Size fields are then added for every field present.
fn array1d_chunks<'v, 's>(value: &'v Value, schema: Schema<'s>) -> Result<Vec<Chunk<'v, 's>>> {
    let map = value.as_object().ok_or_else(|| Error::InvalidValue {
        field: schema.label().to_string(),
        expected: "object",
        actual: value.kind(),
    })?;

    let mut chunks = Vec::with_capacity(map.len());
    for (key, item) in map {
        if key.starts_with('_') {
            continue;
        }

        let (index, field) = match find_schema(schema, key.as_str()) {
            Some(field) => {
                let index = field.index().ok_or_else(|| {
                    Error::InvalidSchema(format!("{}.{} has no index", schema.label(), key))
                })?;
                (index, Some(field))
            }
            None => match key.parse::<u32>() {
                Ok(index) if index != 0 => {
                    let field = find_schema(schema, index);
                    if field.and_then(|f| f.name()).is_some_and(|name| name.starts_with('_')) {
                        continue;
                    }
                    (index, field)
                }
                _ => {
                    return Err(Error::UnknownField {
                        schema: schema.label().to_string(),
                        field: key.clone(),
                    })
                }
            },
        };

        if field.and_then(|f| f.default_value()).is_some_and(|default| default == item) {
            continue;
        }
        chunks.push(Chunk {
            index,
            value: Cow::Borrowed(item),
            schema: field,
        });
    }

    let mut sizes = Vec::new();
    for field in schema.fields() {
        let (Some(target), Some(index)) = (field.size_of(), field.index()) else {
            continue;
        };
        let described = chunks
            .iter()
            .find(|chunk| chunk.schema.and_then(|s| s.name()) == Some(target));
        if let Some(described) = described {
            sizes.push(Chunk {
                index,
                value: Cow::Owned(size_field_value(described)?),
                schema: Some(field),
            });
        }
    }
    chunks.extend(sizes);

    chunks.sort_by_key(|chunk| chunk.index);
    if let Some(pair) = chunks.windows(2).find(|pair| pair[0].index == pair[1].index) {
        return Err(Error::InvalidValue {
            field: format!("{}#{}", schema.label(), pair[0].index),
            expected: "one entry per field",
            actual: "duplicate entries",
        });
    }
    Ok(chunks)
}

/// What a size field records about `chunk`: the item count of fixed-width
/// arrays, the payload length in bytes for everything else.
fn size_field_value(chunk: &Chunk<'_, '_>) -> Result<Value> {
    let payload = chunk.payload_size()?;
    let size = match chunk.schema {
        Some(schema) => match resolve_type(schema)?.0.element_width() {
            Some(width) => payload / width,
            None => payload,
        },
        None => payload,
    };
    Ok(Value::from(size as i64))
}

fn array1d_size(value: &Value, schema: Schema<'_>) -> Result<usize> {
    let mut size = ber_size(0);
    for chunk in array1d_chunks(value, schema)? {
        let payload = chunk.payload_size()?;
        size += ber_size(chunk.index) + ber_size(payload as u32) + payload;
    }
    Ok(size)
}

fn write_array1d(value: &Value, schema: Schema<'_>, out: &mut CountingWriter<'_>) -> Result<()> {
    for chunk in array1d_chunks(value, schema)? {
        let size = chunk.payload_size()?;
        out.write_ber(chunk.index)?;
        out.write_ber(size as u32)?;

        let base = out.written();
        chunk.write(out)?;
        let actual = out.written() - base;
        if actual != size {
            return Err(Error::SizeMismatch {
                field: chunk
                    .schema
                    .map(|field| field.label().to_string())
                    .unwrap_or_else(|| chunk.index.to_string()),
                expected: size,
                actual,
            });
        }
    }
    out.write_ber(0)?;
    Ok(())
}

/// Flatten a table object into `(index, row)` pairs sorted by index.
///
/// Extra rows under `_rest` follow their primary row.
fn array2d_rows<'v>(value: &'v Value, schema: Schema<'_>) -> Result<Vec<(u32, &'v Value)>> {
    let map = value.as_object().ok_or_else(|| Error::InvalidValue {
        field: schema.label().to_string(),
        expected: "object",
        actual: value.kind(),
    })?;

    let mut rows = Vec::with_capacity(map.len());
    for (key, row) in map {
        let index = key.parse::<u32>().map_err(|_| Error::UnknownField {
            schema: schema.label().to_string(),
            field: key.clone(),
        })?;
        rows.push((index, row));

        if let Some(rest) = row.get(REST_KEY) {
            let rest = rest.as_array().ok_or_else(|| Error::InvalidValue {
                field: format!("{}.{}", key, REST_KEY),
                expected: "array",
                actual: rest.kind(),
            })?;
            rows.extend(rest.iter().map(|extra| (index, extra)));
        }
    }

    // Stable, so duplicates keep their order.
    rows.sort_by_key(|(index, _)| *index);
    Ok(rows)
}

fn array2d_size(value: &Value, schema: Schema<'_>) -> Result<usize> {
    let rows = array2d_rows(value, schema)?;
    let mut size = ber_size(rows.len() as u32);
    for (index, row) in rows {
        size += ber_size(index) + array1d_size(row, schema)?;
    }
    Ok(size)
}

fn write_array2d(value: &Value, schema: Schema<'_>, out: &mut CountingWriter<'_>) -> Result<()> {
    let rows = array2d_rows(value, schema)?;
    out.write_ber(rows.len() as u32)?;
    for (index, row) in rows {
        out.write_ber(index)?;
        write_array1d(row, schema, out)?;
    }
    Ok(())
}

fn invalid(field: &str, expected: &'static str, value: &Value) -> Error {
    Error::InvalidValue {
        field: field.to_string(),
        expected,
        actual: value.kind(),
    }
}

fn int_value(value: &Value, field: &str) -> Result<i32> {
    let v = value.as_i64().ok_or_else(|| invalid(field, "integer", value))?;
    i32::try_from(v).map_err(|_| Error::ValueOutOfRange {
        field: field.to_string(),
        value: v,
    })
}

fn u32_value(value: &Value, field: &str) -> Result<u32> {
    let v = value.as_i64().ok_or_else(|| invalid(field, "integer", value))?;
    u32::try_from(v).map_err(|_| Error::ValueOutOfRange {
        field: field.to_string(),
        value: v,
    })
}

fn bool_value(value: &Value, field: &str) -> Result<bool> {
    value.as_bool().ok_or_else(|| invalid(field, "bool", value))
}

fn float_value(value: &Value, field: &str) -> Result<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(parse_non_finite))
        .ok_or_else(|| invalid(field, "number", value))
}

fn str_value<'v>(value: &'v Value, field: &str) -> Result<&'v str> {
    value.as_str().ok_or_else(|| invalid(field, "string", value))
}

fn array_value<'v>(value: &'v Value, field: &str) -> Result<&'v [Value]> {
    value.as_array().ok_or_else(|| invalid(field, "array", value))
}

fn int_array_values<T: ArrayItem>(value: &Value, field: &str) -> Result<Vec<T>> {
    array_value(value, field)?
        .iter()
        .map(|item| {
            let v = item.as_i64().ok_or_else(|| invalid(field, "integer", item))?;
            T::try_from(v).map_err(|_| Error::ValueOutOfRange {
                field: field.to_string(),
                value: v,
            })
        })
        .collect()
}

fn int_array_size<T: ArrayItem>(value: &Value, field: &str) -> Result<usize> {
    Ok(int_array_values::<T>(value, field)?.len() * T::WIDTH)
}

fn write_int_array<T: ArrayItem>(value: &Value, field: &str, out: &mut CountingWriter<'_>) -> Result<()> {
    for item in int_array_values::<T>(value, field)? {
        item.write_le(out)?;
    }
    Ok(())
}

fn ber_array_value(value: &Value, field: &str) -> Result<Vec<i32>> {
    array_value(value, field)?
        .iter()
        .map(|item| int_value(item, field))
        .collect()
}

fn map_tree_value(value: &Value, field: &str) -> Result<MapTree> {
    let nodes = value
        .get("nodes")
        .ok_or_else(|| Error::MissingField(format!("{}.nodes", field)))?;
    let nodes = array_value(nodes, field)?
        .iter()
        .map(|node| u32_value(node, field))
        .collect::<Result<Vec<_>>>()?;
    let active_node = value
        .get("active_node")
        .ok_or_else(|| Error::MissingField(format!("{}.active_node", field)))?;

    Ok(MapTree {
        nodes,
        active_node: u32_value(active_node, field)?,
    })
}

fn event_value(value: &Value, field: &str) -> Result<Event> {
    let commands = array_value(value, field)?
        .iter()
        .map(|command| command_value(command, field))
        .collect::<Result<Vec<_>>>()?;
    Ok(Event { commands })
}

fn command_value(value: &Value, field: &str) -> Result<EventCommand> {
    if !value.is_object() {
        return Err(invalid(field, "event command object", value));
    }
    let code = value
        .get("code")
        .ok_or_else(|| Error::MissingField(format!("{}.code", field)))?;

    Ok(EventCommand {
        code: u32_value(code, field)?,
        nest: value.get("nest").map(|v| u32_value(v, field)).transpose()?.unwrap_or(0),
        string: value
            .get("str")
            .map(|v| str_value(v, field))
            .transpose()?
            .unwrap_or("")
            .to_string(),
        args: match value.get("args") {
            Some(args) => array_value(args, field)?
                .iter()
                .map(|arg| int_value(arg, field))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        },
    })
}

fn opaque_bytes(value: &Value, index: u32) -> Result<Vec<u8>> {
    let field = index.to_string();
    array_value(value, &field)?
        .iter()
        .map(|item| {
            let v = item.as_i64().ok_or_else(|| invalid(&field, "byte", item))?;
            u8::try_from(v).map_err(|_| Error::ValueOutOfRange {
                field: field.clone(),
                value: v,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::to_json;
    use crate::test_support::{ber, chunk, file_bytes, parse, record, table};
    use crate::{Element, LcfFile, Stream};

    fn record_schema() -> Value {
        parse(
            r#"{"name": "Actor", "type": "array2d", "value": [
                {"index": 1, "name": "name", "type": "string", "value": ""},
                {"index": 2, "name": "level", "type": "integer", "value": 1},
                {"index": 3, "name": "rate", "type": "float", "value": 0.0},
                {"index": 4, "name": "guard", "type": "bool", "value": false},
                {"index": 5, "name": "_params_size", "type": "integer", "value": 0},
                {"index": 6, "name": "params", "type": "int16array"},
                {"index": 7, "name": "flags", "type": "int8array"},
                {"index": 8, "name": "vars", "type": "int32array"},
                {"index": 9, "name": "route", "type": "ber_array"},
                {"index": 10, "name": "commands", "type": "event"},
                {"index": 11, "name": "music", "type": "Music"},
                {"index": 12, "name": "map", "type": "MapId", "value": 0}
            ]}"#,
        )
    }

    fn sample_rows() -> Value {
        parse(
            r#"{
                "1": {
                    "name": "アレックス",
                    "level": 12,
                    "rate": 1.5,
                    "guard": true,
                    "params": [100, -20, 300],
                    "flags": [1, 0, -1],
                    "vars": [70000, -70000],
                    "route": [1, 200, 0],
                    "commands": [
                        {"code": 10110, "nest": 0, "str": "やあ", "args": []},
                        {"code": 10, "nest": 0, "str": "", "args": [1, -1]}
                    ],
                    "music": {"name": "Town", "volume": 80},
                    "map": 3,
                    "33": [222, 173],
                    "_rest": [{"name": "Twin"}]
                },
                "0": {"name": "Zero"}
            }"#,
        )
    }

    #[test]
    fn test_size_matches_written() {
        let doc = record_schema();
        let schema = Schema::new(&doc);
        let value = sample_rows();

        let size = calculate_size(&value, schema).unwrap();
        let mut out = Vec::new();
        save_element(&value, schema, &mut out).unwrap();
        assert_eq!(out.len(), size);

        for (_, row) in value.as_object().unwrap() {
            for field in schema.fields() {
                let Some(item) = row.get(field.name().unwrap()) else {
                    continue;
                };
                let mut out = Vec::new();
                save_element(item, field, &mut out).unwrap();
                assert_eq!(out.len(), calculate_size(item, field).unwrap(), "{}", field.label());
            }
        }
    }

    #[test]
    fn test_table_round_trip() {
        let doc = record_schema();
        let schema = Schema::new(&doc);
        let value = sample_rows();

        let mut out = Vec::new();
        save_element(&value, schema, &mut out).unwrap();
        let decoded = to_json(&Element::from_stream(schema, Stream::new(out))).unwrap();

        let row = decoded.get("1").unwrap();
        assert_eq!(row.get("name").and_then(Value::as_str), Some("アレックス"));
        assert_eq!(row.get("rate"), Some(&Value::Float(1.5)));
        assert_eq!(row.get("33"), Some(&parse("[222, 173]")));
        assert_eq!(
            row.get("music"),
            Some(&parse(
                r#"{"name": "Town", "volume": 80, "fadein": 0, "tempo": 100, "balance": 50}"#
            ))
        );
        assert_eq!(
            row.get(REST_KEY),
            Some(&parse(
                r#"[{"name": "Twin", "level": 1, "rate": 0.0, "guard": false, "map": 0}]"#
            ))
        );
        assert_eq!(decoded.get("0").and_then(|r| r.get("name")), Some(&Value::from("Zero")));

        // Rows are written in index order.
        let keys: Vec<&str> = decoded.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["0", "1"]);
    }

    #[test]
    fn test_defaults_not_written() {
        let doc = parse(
            r#"{"type": "array1d", "value": [
                {"index": 1, "name": "name", "type": "string", "value": "(OFF)"},
                {"index": 3, "name": "volume", "type": "integer", "value": 100}
            ]}"#,
        );
        let schema = Schema::new(&doc);

        let value = parse(r#"{"name": "(OFF)", "volume": 100}"#);
        let mut out = Vec::new();
        save_array1d(&value, schema, &mut out).unwrap();
        assert_eq!(out, vec![0x00]);

        let value = parse(r#"{"name": "(OFF)", "volume": 90.0}"#);
        let mut out = Vec::new();
        save_array1d(&value, schema, &mut out).unwrap();
        assert_eq!(out, [chunk(3, &ber(90)), vec![0x00]].concat());
    }

    #[test]
    fn test_size_fields_rebuilt() {
        let doc = parse(
            r#"{"type": "array1d", "value": [
                {"index": 1, "name": "_commands_size", "type": "integer", "value": 0},
                {"index": 2, "name": "commands", "type": "event"},
                {"index": 3, "name": "_params_size", "type": "integer", "value": 0},
                {"index": 4, "name": "params", "type": "int16array"},
                {"index": 5, "name": "_route_size", "type": "integer", "value": 0},
                {"index": 6, "name": "route", "type": "ber_array"},
                {"index": 7, "name": "_ids_count", "type": "integer", "value": 0, "size_of": "ids"},
                {"index": 8, "name": "ids", "type": "int32array"}
            ]}"#,
        );
        let schema = Schema::new(&doc);
        // Stale sizes in the tree are ignored, by name or by index.
        let value = parse(
            r#"{
                "commands": [{"code": 10, "nest": 0, "str": "", "args": []}],
                "params": [1, 2, 3],
                "route": [200],
                "_params_size": 99,
                "5": 42
            }"#,
        );

        let mut out = Vec::new();
        save_array1d(&value, schema, &mut out).unwrap();
        let expected = record(&[
            chunk(1, &ber(4)),
            chunk(2, &[0x0A, 0x00, 0x00, 0x00]),
            chunk(3, &ber(3)),
            chunk(4, &[0x01, 0x00, 0x02, 0x00, 0x03, 0x00]),
            chunk(5, &ber(2)),
            chunk(6, &ber(200)),
        ]);
        assert_eq!(out, expected);
        assert_eq!(calculate_size(&value, schema).unwrap(), expected.len());

        // Size fields stay out of the decoded tree.
        let decoded = to_json(&Element::from_stream(schema, Stream::new(out))).unwrap();
        assert_eq!(
            decoded,
            parse(
                r#"{
                    "commands": [{"code": 10, "nest": 0, "str": "", "args": []}],
                    "params": [1, 2, 3],
                    "route": [200]
                }"#
            )
        );
    }

    #[test]
    fn test_non_finite_float_round_trip() {
        let doc = parse(
            r#"{"type": "array1d", "value": [
                {"index": 1, "name": "timestamp", "type": "float", "value": 0.0},
                {"index": 2, "name": "limit", "type": "float", "value": 0.0}
            ]}"#,
        );
        let schema = Schema::new(&doc);
        let odd_nan = f64::from_bits(0x7ff8_0000_0000_0001);
        let original = record(&[
            chunk(1, &odd_nan.to_le_bytes()),
            chunk(2, &f64::INFINITY.to_le_bytes()),
        ]);

        let json = to_json(&Element::from_stream(schema, Stream::new(original.clone()))).unwrap();
        let mut saved = Vec::new();
        save_element(&json, schema, &mut saved).unwrap();
        assert_eq!(saved, original);

        let again = to_json(&Element::from_stream(schema, Stream::new(saved))).unwrap();
        assert_eq!(again, json);

        // Through JSON text as well.
        let text = serde_json::Value::from(&json).to_string();
        assert!(text.contains("NaN:0x7ff8000000000001"));
        let reparsed = parse(&text);
        let mut saved = Vec::new();
        save_element(&reparsed, schema, &mut saved).unwrap();
        assert_eq!(saved, original);
    }

    #[test]
    fn test_known_layout() {
        let doc = parse(
            r#"{"type": "array2d", "value": [
                {"index": 1, "name": "name", "type": "string", "value": ""}
            ]}"#,
        );
        let value = parse(r#"{"2": {"name": "b"}, "1": {"name": "a"}}"#);
        let mut out = Vec::new();
        save_array2d(&value, Schema::new(&doc), &mut out).unwrap();

        let expected = table(&[
            (1, record(&[chunk(1, b"a")])),
            (2, record(&[chunk(1, b"b")])),
        ]);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_rejects_bad_values() {
        let doc = record_schema();
        let schema = Schema::new(&doc);

        let unknown = parse(r#"{"1": {"nickname": "x"}}"#);
        assert!(matches!(
            calculate_size(&unknown, schema),
            Err(Error::UnknownField { .. })
        ));

        let wrong_kind = parse(r#"{"1": {"level": "high"}}"#);
        assert!(matches!(
            calculate_size(&wrong_kind, schema),
            Err(Error::InvalidValue { expected: "integer", .. })
        ));

        let too_big = parse(r#"{"1": {"level": 3000000000}}"#);
        assert!(matches!(
            calculate_size(&too_big, schema),
            Err(Error::ValueOutOfRange { value: 3000000000, .. })
        ));

        let narrow = parse(r#"{"1": {"params": [40000]}}"#);
        assert!(matches!(
            calculate_size(&narrow, schema),
            Err(Error::ValueOutOfRange { .. })
        ));

        let bad_row = parse(r#"{"first": {}}"#);
        assert!(matches!(
            calculate_size(&bad_row, schema),
            Err(Error::UnknownField { .. })
        ));

        let duplicate = parse(r#"{"1": {"level": 2, "2": 3}}"#);
        assert!(matches!(
            calculate_size(&duplicate, schema),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_save_lcf_errors() {
        assert!(matches!(
            to_bytes(&parse(r#"{"signature": "Nope", "root": []}"#)),
            Err(Error::SchemaNotFound(_))
        ));
        assert!(matches!(
            to_bytes(&parse(r#"{"root": []}"#)),
            Err(Error::MissingField(_))
        ));
        assert!(matches!(
            to_bytes(&parse(r#"{"signature": "LcfMapUnit", "root": []}"#)),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let maps = table(&[
            (0, record(&[chunk(1, b"Game")])),
            (
                1,
                record(&[
                    chunk(1, b"Town"),
                    chunk(2, &ber(0)),
                    chunk(12, &record(&[chunk(1, b"Theme"), chunk(3, &ber(70))])),
                    chunk(41, &table(&[(1, record(&[chunk(1, &ber(4))]))])),
                    chunk(51, &[1, 0, 0, 0, 2, 0, 0, 0]),
                ]),
            ),
        ]);
        let tree = vec![0x02, 0x00, 0x01, 0x01];
        let start = record(&[chunk(1, &ber(1)), chunk(2, &ber(9))]);
        let original = file_bytes("LcfMapTree", &[maps, tree, start]);

        let file = LcfFile::from_bytes(original.clone()).unwrap();
        let json = to_json(&file).unwrap();

        let saved = to_bytes(&json).unwrap();
        let reopened = LcfFile::from_bytes(saved.clone()).unwrap();
        assert_eq!(to_json(&reopened).unwrap(), json);

        // The parent_map chunk held its default, so it is dropped on save.
        assert_eq!(saved.len(), original.len() - chunk(2, &ber(0)).len());
    }

    #[test]
    fn test_sized_root_written_with_prefix() {
        let doc = parse(
            r#"{"signature": "Custom", "type": "file", "root": [
                {"name": "title", "type": "string", "sized": true},
                {"name": "data", "type": "array1d", "value": [
                    {"index": 1, "name": "count", "type": "integer", "value": 0}
                ]}
            ]}"#,
        );
        let value = parse(r#"{"signature": "Custom", "root": ["Hello", {"count": 7}]}"#);

        let mut buffer = Vec::new();
        let mut out = CountingWriter::new(&mut buffer);
        write_file(&value, "Custom", Schema::new(&doc), &mut out).unwrap();
        let written = out.written();

        let mut expected = crate::test_support::lcf_string("Custom");
        expected.extend(ber(5));
        expected.extend(b"Hello");
        expected.extend(record(&[chunk(1, &ber(7))]));
        assert_eq!(buffer, expected);
        assert_eq!(written, expected.len());
    }
}
