//! Conversion of lazy views into owned [`Value`] trees.
//!
//! Records become objects keyed by field name, tables become objects keyed
//! by decimal row index. Fields whose names start with `_` are internal and
//! never appear in the output. Chunks the schema does not know are kept under
//! their decimal index as an array of byte values.

use indexmap::map::Entry;

use crate::{
    Array1d, Array2d, ArrayItem, DataType, Element, Event, EventCommand, IntArray, LcfFile, Map,
    MapTree, Result, Value,
};

/// Key holding extra table rows that share an index.
pub const REST_KEY: &str = "_rest";

/// Types that can be materialized into a [`Value`].
pub trait ToValue {
    /// Decode everything reachable from `self` into an owned tree.
    fn to_value(&self) -> Result<Value>;
}

/// Decode `item` into an owned value tree.
pub fn to_json<T: ToValue + ?Sized>(item: &T) -> Result<Value> {
    item.to_value()
}

fn bytes_value(bytes: &[u8]) -> Value {
    Value::Array(bytes.iter().map(|&b| Value::Int(b.into())).collect())
}

impl ToValue for Element<'_> {
    fn to_value(&self) -> Result<Value> {
        if self.is_opaque() {
            return Ok(bytes_value(self.bytes()?));
        }

        Ok(match self.data_type()? {
            DataType::Integer => self.i()?.into(),
            DataType::Bool => self.b()?.into(),
            DataType::Float => self.d()?.into(),
            DataType::String => self.s()?.into(),
            DataType::Event => self.e()?.to_value()?,
            DataType::Int8Array => self.i8a()?.to_value()?,
            DataType::Int16Array => self.i16a()?.to_value()?,
            DataType::Int32Array => self.i32a()?.to_value()?,
            DataType::BerArray => Value::Array(self.ber_array()?.into_iter().map(Value::from).collect()),
            DataType::MapTree => self.map_tree()?.to_value()?,
            DataType::Array1d => self.a1d()?.to_value()?,
            DataType::Array2d => self.a2d()?.to_value()?,
        })
    }
}

impl ToValue for Array1d<'_> {
    fn to_value(&self) -> Result<Value> {
        let mut map = Map::with_capacity(self.len());

        for (index, element) in self.iter() {
            match element.schema().and_then(|field| field.name()) {
                Some(name) if name.starts_with('_') => {}
                Some(name) => {
                    map.insert(name.to_string(), element.to_value()?);
                }
                None => {
                    map.insert(index.to_string(), element.to_value()?);
                }
            }
        }

        // Fields the binary omitted still appear with their defaults.
        for field in self.schema().fields() {
            let (Some(name), Some(default)) = (field.name(), field.default_value()) else {
                continue;
            };
            if !name.starts_with('_') && !map.contains_key(name) {
                map.insert(name.to_string(), default.clone());
            }
        }

        Ok(Value::Object(map))
    }
}

impl ToValue for Array2d<'_> {
    fn to_value(&self) -> Result<Value> {
        let mut map = Map::with_capacity(self.len());

        for row in self {
            let value = row.to_value()?;
            match map.entry(row.index().to_string()) {
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
                Entry::Occupied(mut entry) => {
                    if let Some(first) = entry.get_mut().as_object_mut() {
                        let rest = first
                            .entry(REST_KEY.to_string())
                            .or_insert_with(|| Value::Array(Vec::new()));
                        if let Value::Array(rest) = rest {
                            rest.push(value);
                        }
                    }
                }
            }
        }

        Ok(Value::Object(map))
    }
}

impl ToValue for EventCommand {
    fn to_value(&self) -> Result<Value> {
        let mut map = Map::with_capacity(4);
        map.insert("code".to_string(), self.code.into());
        map.insert("nest".to_string(), self.nest.into());
        map.insert("str".to_string(), self.string.as_str().into());
        map.insert(
            "args".to_string(),
            Value::Array(self.args.iter().map(|&arg| arg.into()).collect()),
        );
        Ok(Value::Object(map))
    }
}

impl ToValue for Event {
    fn to_value(&self) -> Result<Value> {
        self.iter()
            .map(EventCommand::to_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

impl ToValue for MapTree {
    fn to_value(&self) -> Result<Value> {
        let mut map = Map::with_capacity(2);
        map.insert(
            "nodes".to_string(),
            Value::Array(self.nodes.iter().map(|&node| node.into()).collect()),
        );
        map.insert("active_node".to_string(), self.active_node.into());
        Ok(Value::Object(map))
    }
}

impl<T: ArrayItem> ToValue for IntArray<T> {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Array(self.iter().map(|v| Value::Int(v.into())).collect()))
    }
}

impl ToValue for LcfFile {
    fn to_value(&self) -> Result<Value> {
        if !self.valid() {
            return Err(crate::Error::SchemaNotFound(self.error().to_string()));
        }

        let roots = self
            .roots()
            .iter()
            .map(Element::to_value)
            .collect::<Result<Vec<_>>>()?;

        let mut map = Map::with_capacity(2);
        map.insert("signature".to_string(), self.signature().into());
        map.insert("root".to_string(), Value::Array(roots));
        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ber, chunk, file_bytes, parse, record, table};
    use crate::{Schema, Stream};

    #[test]
    fn test_string_chunk_scenario() {
        let doc = parse(
            r#"{"type": "array1d", "value": [
                {"index": 1, "name": "field_name", "type": "string"}
            ]}"#,
        );
        let bytes = vec![0x01, 0x04, b'1', b'2', b'3', b'4', 0x00];
        let element = Element::from_stream(Schema::new(&doc), Stream::new(bytes));

        let record = element.a1d().unwrap();
        assert_eq!(record.byte_len(), 7);
        assert_eq!(to_json(&record).unwrap(), parse(r#"{"field_name": "1234"}"#));
    }

    #[test]
    fn test_map_tree_scenario() {
        let doc = parse(r#"{"type": "map_tree"}"#);
        let element = Element::from_stream(Schema::new(&doc), Stream::new(vec![0x02, 0x05, 0x07, 0x03]));
        assert_eq!(
            to_json(&element).unwrap(),
            parse(r#"{"nodes": [5, 7], "active_node": 3}"#)
        );
    }

    #[test]
    fn test_record_output() {
        let doc = parse(
            r#"{"type": "array1d", "value": [
                {"index": 1, "name": "name", "type": "string", "value": ""},
                {"index": 2, "name": "_name_size", "type": "integer", "value": 0},
                {"index": 3, "name": "level", "type": "integer", "value": 1},
                {"index": 4, "name": "hp", "type": "integer"},
                {"index": 5, "name": "stats", "type": "int16array"}
            ]}"#,
        );
        let bytes = record(&[
            chunk(1, b"Alex"),
            chunk(2, &ber(4)),
            chunk(5, &[0x0A, 0x00, 0xFF, 0xFF]),
            chunk(7, &[0x01, 0x02]),
        ]);
        let element = Element::from_stream(Schema::new(&doc), Stream::new(bytes));
        let value = to_json(&element).unwrap();

        let expected = parse(r#"{"name": "Alex", "stats": [10, -1], "7": [1, 2], "level": 1}"#);
        assert_eq!(value, expected);

        // Present fields in index order, then synthesized defaults.
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "stats", "7", "level"]);
    }

    #[test]
    fn test_duplicate_rows_go_to_rest() {
        let doc = parse(
            r#"{"type": "array2d", "value": [
                {"index": 1, "name": "name", "type": "string", "value": ""}
            ]}"#,
        );
        let bytes = table(&[
            (1, record(&[chunk(1, b"a")])),
            (1, record(&[chunk(1, b"b")])),
            (1, record(&[])),
            (2, record(&[chunk(1, b"c")])),
        ]);
        let element = Element::from_stream(Schema::new(&doc), Stream::new(bytes));
        assert_eq!(
            to_json(&element).unwrap(),
            parse(
                r#"{
                    "1": {"name": "a", "_rest": [{"name": "b"}, {"name": ""}]},
                    "2": {"name": "c"}
                }"#
            )
        );
    }

    #[test]
    fn test_event_output() {
        let doc = parse(r#"{"type": "event"}"#);
        let mut bytes = ber(10110);
        bytes.extend([0x00, 0x02, b'H', b'i', 0x00]);
        bytes.extend([0x0A, 0x01, 0x00, 0x02, 0x05, 0x7F]);
        let element = Element::from_stream(Schema::new(&doc), Stream::new(bytes));
        assert_eq!(
            to_json(&element).unwrap(),
            parse(
                r#"[
                    {"code": 10110, "nest": 0, "str": "Hi", "args": []},
                    {"code": 10, "nest": 1, "str": "", "args": [5, 127]}
                ]"#
            )
        );
    }

    #[test]
    fn test_file_output() {
        let map = record(&[chunk(2, &ber(40)), chunk(3, &ber(30))]);
        let file = LcfFile::from_bytes(file_bytes("LcfMapUnit", &[map])).unwrap();
        let value = to_json(&file).unwrap();

        assert_eq!(value.get("signature").and_then(Value::as_str), Some("LcfMapUnit"));
        let root = &value.get("root").and_then(Value::as_array).unwrap()[0];
        assert_eq!(root.get("width"), Some(&Value::Int(40)));
        assert_eq!(root.get("height"), Some(&Value::Int(30)));
        assert_eq!(root.get("chipset_id"), Some(&Value::Int(1)));
        assert!(root.get("lower_layer").is_none());
        assert!(root.get("events").is_none());
    }

    #[test]
    fn test_invalid_file_has_no_json() {
        let file = LcfFile::from_bytes(crate::test_support::lcf_string("Bogus")).unwrap();
        assert!(to_json(&file).is_err());
    }
}
