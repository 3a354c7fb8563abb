//! Serde integration for parsed message values.
//!
//! Parsed [`Value`]s and [`MessageValue`]s implement `Serialize`, so a
//! text-format document can be handed straight to any serde sink:
//!
//! ```rust,ignore
//! let pool = prototext::schema::load(schema_text)?;
//! let mut msg = pool.new_message("demo.Person").unwrap();
//! prototext::text::parse(&pool, input, &mut msg, &Default::default())?;
//! let json = serde_json::to_string(&msg)?;
//! ```
//!
//! Deserializing back into a `MessageValue` would need descriptor context
//! and is not provided.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::value::{MapKey, MessageValue, Value};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Uint(v) => serializer.serialize_u64(*v),
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::Bytes(v) => serializer.serialize_bytes(v),
            Value::Message(m) => m.serialize(serializer),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for MessageValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for MapKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MapKey::Int(v) => serializer.serialize_i64(*v),
            MapKey::Uint(v) => serializer.serialize_u64(*v),
            MapKey::Bool(v) => serializer.serialize_bool(*v),
            MapKey::Str(v) => serializer.serialize_str(v),
        }
    }
}
