use std::collections::HashMap;

use crate::value::MessageValue;

/// The scalar wire types of the protocol-buffer type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarType {
    /// Map a schema type name to a scalar type, if it names one.
    pub fn from_name(name: &str) -> Option<ScalarType> {
        match name {
            "double" => Some(ScalarType::Double),
            "float" => Some(ScalarType::Float),
            "int32" => Some(ScalarType::Int32),
            "int64" => Some(ScalarType::Int64),
            "uint32" => Some(ScalarType::Uint32),
            "uint64" => Some(ScalarType::Uint64),
            "sint32" => Some(ScalarType::Sint32),
            "sint64" => Some(ScalarType::Sint64),
            "fixed32" => Some(ScalarType::Fixed32),
            "fixed64" => Some(ScalarType::Fixed64),
            "sfixed32" => Some(ScalarType::Sfixed32),
            "sfixed64" => Some(ScalarType::Sfixed64),
            "bool" => Some(ScalarType::Bool),
            "string" => Some(ScalarType::String),
            "bytes" => Some(ScalarType::Bytes),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Double => "double",
            ScalarType::Float => "float",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Sint32 => "sint32",
            ScalarType::Sint64 => "sint64",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Bool => "bool",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
        }
    }

    /// Map keys must be integral, bool, or string.
    pub fn valid_map_key(&self) -> bool {
        !matches!(
            self,
            ScalarType::Double | ScalarType::Float | ScalarType::Bytes
        )
    }
}

/// The resolved type of a field: a scalar, or an index into the pool's
/// message or enum lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarType),
    Message(usize),
    Enum(usize),
}

/// Key and value types of a map field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapTypes {
    pub key: ScalarType,
    pub value: FieldType,
}

/// A field definition within a message.
#[derive(Debug, Clone)]
pub struct Field {
    /// Field name as declared in the schema.
    pub name: String,
    /// camelCase form of the declared name, precomputed for lookup.
    pub camel_name: String,
    /// Field number (unique within the message).
    pub number: i32,
    /// The resolved base type of this field.
    pub field_type: FieldType,
    /// Whether this field admits an ordered sequence of values.
    pub repeated: bool,
    /// For map fields: the key and value types. `None` otherwise.
    pub map: Option<MapTypes>,
}

impl Field {
    pub fn is_map(&self) -> bool {
        self.map.is_some()
    }
}

/// A message type in the schema.
#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    /// Fully-qualified name (package and enclosing messages, dot-separated).
    pub full_name: String,
    /// Fields sorted by number in ascending order.
    pub fields: Vec<Field>,
}

impl MessageDescriptor {
    /// Find a field by number via binary search over the sorted list.
    pub fn field_by_number(&self, number: i32) -> Option<&Field> {
        self.fields
            .binary_search_by_key(&number, |f| f.number)
            .ok()
            .map(|idx| &self.fields[idx])
    }

    /// Find a field by the camelCase form of its declared name.
    pub fn field_by_camel_name(&self, camel: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.camel_name == camel)
    }

    /// Find a field by its declared name.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The last dotted component of the full name.
    pub fn simple_name(&self) -> &str {
        match self.full_name.rfind('.') {
            Some(pos) => &self.full_name[pos + 1..],
            None => &self.full_name,
        }
    }
}

/// An enum type in the schema.
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    pub full_name: String,
    /// (name, number) pairs in declaration order.
    pub values: Vec<(String, i32)>,
}

impl EnumDescriptor {
    pub fn value_by_name(&self, name: &str) -> Option<i32> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn value_by_number(&self, number: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| *v == number)
            .map(|(n, _)| n.as_str())
    }

    pub fn simple_name(&self) -> &str {
        match self.full_name.rfind('.') {
            Some(pos) => &self.full_name[pos + 1..],
            None => &self.full_name,
        }
    }
}

/// A field declared outside its container message, registered in the pool
/// under its dotted fully-qualified name.
#[derive(Debug, Clone)]
pub struct Extension {
    pub field: Field,
    /// Index of the extended message in `DescriptorPool::messages`.
    pub extendee: usize,
}

/// The top-level descriptor container, holding all messages, enums, and
/// extensions of a loaded schema.
#[derive(Debug, Clone, Default)]
pub struct DescriptorPool {
    /// All messages, sorted by full name.
    pub messages: Vec<MessageDescriptor>,
    /// Map from fully-qualified message name to index in `messages`.
    pub messages_by_name: HashMap<String, usize>,
    /// All enums, sorted by full name.
    pub enums: Vec<EnumDescriptor>,
    /// Map from fully-qualified enum name to index in `enums`.
    pub enums_by_name: HashMap<String, usize>,
    /// Extensions by fully-qualified dotted name.
    pub extensions: HashMap<String, Extension>,
}

impl DescriptorPool {
    pub fn new() -> Self {
        DescriptorPool::default()
    }

    /// Get a message descriptor by fully-qualified name.
    pub fn message_by_name(&self, name: &str) -> Option<&MessageDescriptor> {
        self.messages_by_name
            .get(name)
            .map(|&idx| &self.messages[idx])
    }

    /// Get a message index by fully-qualified name.
    pub fn message_index(&self, name: &str) -> Option<usize> {
        self.messages_by_name.get(name).copied()
    }

    /// Get an enum descriptor by fully-qualified name.
    pub fn enum_by_name(&self, name: &str) -> Option<&EnumDescriptor> {
        self.enums_by_name.get(name).map(|&idx| &self.enums[idx])
    }

    /// Look up an extension by its dotted fully-qualified name.
    pub fn extension_by_name(&self, name: &str) -> Option<&Extension> {
        self.extensions.get(name)
    }

    /// Construct an empty message value of the named type.
    pub fn new_message(&self, full_name: &str) -> Option<MessageValue> {
        self.message_index(full_name).map(MessageValue::new)
    }
}

/// Convert a declared field name to camelCase: underscores drop and the
/// next ASCII lowercase letter uppercases.
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next && c.is_ascii_lowercase() {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
            upper_next = false;
        }
    }
    out
}
