use std::collections::HashMap;

use crate::descriptor::{camel_case, DescriptorPool, Field, FieldType, MapTypes, MessageDescriptor, ScalarType};
use crate::error::ParseError;
use crate::value::{MapKey, MessageValue, Value};

use super::tokenizer::Tokenizer;
use super::ParseOptions;

/// Recursive-descent consumer of the token stream. Locates schema fields and
/// deposits typed values onto the target message: scalars overwrite, messages
/// merge, repeated and map fields accumulate.
pub(super) struct Merger<'a> {
    pool: &'a DescriptorPool,
    options: &'a ParseOptions,
}

impl<'a> Merger<'a> {
    pub fn new(pool: &'a DescriptorPool, options: &'a ParseOptions) -> Self {
        Merger { pool, options }
    }

    pub fn merge_text(
        &self,
        tok: &mut Tokenizer,
        target: &mut MessageValue,
    ) -> Result<(), ParseError> {
        while !tok.at_end() {
            self.merge_field(tok, target)?;
        }
        Ok(())
    }

    /// Parse one `name: value` (or `name { ... }`) unit into the target.
    fn merge_field(
        &self,
        tok: &mut Tokenizer,
        target: &mut MessageValue,
    ) -> Result<(), ParseError> {
        let descriptor = &self.pool.messages[target.type_index];

        if tok.try_consume("[") {
            // Extension form: [a.b.c]
            let name = self.consume_extension_name(tok)?;
            match self.pool.extension_by_name(&name) {
                None => {
                    if !self.options.allow_unknown_extension {
                        return Err(tok.parse_error_previous_token(format!(
                            "Extension \"{}\" not found.",
                            name
                        )));
                    }
                    self.skip_field_contents(tok)?;
                    if !tok.try_consume(";") {
                        tok.try_consume(",");
                    }
                    return Ok(());
                }
                Some(ext) => {
                    if ext.extendee != target.type_index {
                        return Err(tok.parse_error_previous_token(format!(
                            "Extension \"{}\" does not extend message type \"{}\".",
                            name, descriptor.full_name
                        )));
                    }
                    self.merge_field_value(tok, target, &ext.field)?;
                }
            }
        } else {
            let name = tok.consume_identifier_or_number()?;
            match self.find_field(descriptor, &name) {
                Some(field) => self.merge_field_value(tok, target, field)?,
                None => {
                    if !self.options.allow_unknown_field {
                        return Err(tok.parse_error_previous_token(format!(
                            "Message type \"{}\" has no field named \"{}\".",
                            descriptor.full_name, name
                        )));
                    }
                    self.skip_field_contents(tok)?;
                    if !tok.try_consume(";") {
                        tok.try_consume(",");
                    }
                    return Ok(());
                }
            }
        }

        tok.try_consume(",");
        Ok(())
    }

    fn consume_extension_name(&self, tok: &mut Tokenizer) -> Result<String, ParseError> {
        let mut name = tok.consume_identifier()?;
        while tok.try_consume(".") {
            name.push('.');
            name.push_str(&tok.consume_identifier()?);
        }
        tok.consume("]")?;
        Ok(name)
    }

    /// Resolve a plain field name against the descriptor: numeric tag when
    /// `allow_field_number` is set, then the camelCase form, then the
    /// lowercase group-style fallback.
    fn find_field<'d>(
        &'d self,
        descriptor: &'d MessageDescriptor,
        name: &str,
    ) -> Option<&'d Field> {
        if self.options.allow_field_number && name.chars().all(|c| c.is_ascii_digit()) {
            return name
                .parse::<i32>()
                .ok()
                .and_then(|number| descriptor.field_by_number(number));
        }

        if let Some(field) = descriptor.field_by_camel_name(&camel_case(name)) {
            return Some(field);
        }

        // Group-style names: the declared field name is the lowercased type
        // name, accepted only when the sub-type's simple name matches the
        // token as written.
        let field = descriptor.field_by_camel_name(&name.to_ascii_lowercase())?;
        let simple = match field.field_type {
            FieldType::Message(idx) => self.pool.messages[idx].simple_name(),
            FieldType::Enum(idx) => self.pool.enums[idx].simple_name(),
            FieldType::Scalar(_) => return None,
        };
        (simple == name).then_some(field)
    }

    fn merge_field_value(
        &self,
        tok: &mut Tokenizer,
        target: &mut MessageValue,
        field: &Field,
    ) -> Result<(), ParseError> {
        if let Some(types) = field.map {
            return self.merge_map_field(tok, target, field, types);
        }
        if let FieldType::Message(msg_idx) = field.field_type {
            return self.merge_message_field(tok, target, field, msg_idx);
        }

        // Scalar and enum fields require the colon.
        tok.consume(":")?;
        if field.repeated && tok.try_consume("[") {
            // An empty list leaves the field absent.
            if tok.try_consume("]") {
                return Ok(());
            }
            loop {
                let value = self.parse_singular_value(tok, field)?;
                append(target, &field.name, value);
                if !tok.try_consume(",") {
                    return tok.consume("]");
                }
            }
        }

        let value = self.parse_singular_value(tok, field)?;
        if field.repeated {
            append(target, &field.name, value);
        } else {
            target.fields.insert(field.name.clone(), value);
        }
        Ok(())
    }

    fn parse_singular_value(
        &self,
        tok: &mut Tokenizer,
        field: &Field,
    ) -> Result<Value, ParseError> {
        match field.field_type {
            FieldType::Scalar(scalar) => self.parse_scalar_value(tok, scalar),
            FieldType::Enum(idx) => self.parse_enum_value(tok, idx),
            // Message fields never reach here; they take the delimiter path.
            FieldType::Message(idx) => {
                let mut sub = MessageValue::new(idx);
                self.parse_message_body(tok, &mut sub)?;
                Ok(Value::Message(sub))
            }
        }
    }

    fn parse_scalar_value(
        &self,
        tok: &mut Tokenizer,
        scalar: ScalarType,
    ) -> Result<Value, ParseError> {
        Ok(match scalar {
            ScalarType::Double | ScalarType::Float => Value::Double(tok.consume_float()?),
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
                Value::Int(tok.consume_int32()? as i64)
            }
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
                Value::Int(tok.consume_int64()?)
            }
            ScalarType::Uint32 | ScalarType::Fixed32 => {
                Value::Uint(tok.consume_uint32()? as u64)
            }
            ScalarType::Uint64 | ScalarType::Fixed64 => Value::Uint(tok.consume_uint64()?),
            ScalarType::Bool => Value::Bool(tok.consume_bool()?),
            ScalarType::String => Value::Str(tok.consume_string()?),
            ScalarType::Bytes => Value::Bytes(tok.consume_byte_string()?),
        })
    }

    /// A numeric-looking token is an enum number (any base, open-enum
    /// semantics); an identifier must name a declared value.
    fn parse_enum_value(&self, tok: &mut Tokenizer, idx: usize) -> Result<Value, ParseError> {
        let descriptor = &self.pool.enums[idx];
        let numeric = matches!(
            tok.current().chars().next(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+'
        );
        if numeric {
            let number = tok.consume_int32()?;
            return Ok(Value::Int(number as i64));
        }
        let name = tok.consume_identifier()?;
        match descriptor.value_by_name(&name) {
            Some(number) => Ok(Value::Int(number as i64)),
            None => Err(tok.parse_error_previous_token(format!(
                "Enum type \"{}\" has no value named {}.",
                descriptor.full_name, name
            ))),
        }
    }

    fn merge_message_field(
        &self,
        tok: &mut Tokenizer,
        target: &mut MessageValue,
        field: &Field,
        msg_idx: usize,
    ) -> Result<(), ParseError> {
        tok.try_consume(":");

        if field.repeated {
            if tok.try_consume("[") {
                if tok.try_consume("]") {
                    return Ok(());
                }
                loop {
                    let mut sub = MessageValue::new(msg_idx);
                    self.parse_message_body(tok, &mut sub)?;
                    append(target, &field.name, Value::Message(sub));
                    if !tok.try_consume(",") {
                        return tok.consume("]");
                    }
                }
            }
            let mut sub = MessageValue::new(msg_idx);
            self.parse_message_body(tok, &mut sub)?;
            append(target, &field.name, Value::Message(sub));
            return Ok(());
        }

        // Singular message fields merge into any existing sub-message.
        let slot = target
            .fields
            .entry(field.name.clone())
            .or_insert_with(|| Value::Message(MessageValue::new(msg_idx)));
        if !matches!(slot, Value::Message(_)) {
            *slot = Value::Message(MessageValue::new(msg_idx));
        }
        if let Value::Message(sub) = slot {
            self.parse_message_body(tok, sub)?;
        }
        Ok(())
    }

    /// Parse a `{...}` or `<...>` body (opening and closing must match),
    /// merging fields into `msg` until the closing delimiter.
    fn parse_message_body(
        &self,
        tok: &mut Tokenizer,
        msg: &mut MessageValue,
    ) -> Result<(), ParseError> {
        let end = if tok.try_consume("<") {
            ">"
        } else {
            tok.consume("{")?;
            "}"
        };
        while !tok.try_consume(end) {
            if tok.at_end() {
                return Err(tok.parse_error(format!("Expected \"{}\".", end)));
            }
            self.merge_field(tok, msg)?;
        }
        Ok(())
    }

    fn merge_map_field(
        &self,
        tok: &mut Tokenizer,
        target: &mut MessageValue,
        field: &Field,
        types: MapTypes,
    ) -> Result<(), ParseError> {
        tok.try_consume(":");

        if tok.try_consume("[") {
            if tok.try_consume("]") {
                return Ok(());
            }
            loop {
                self.parse_map_entry(tok, target, field, types)?;
                if !tok.try_consume(",") {
                    return tok.consume("]");
                }
            }
        }
        self.parse_map_entry(tok, target, field, types)
    }

    /// One `{ key: ... value: ... }` entry in either order, optionally
    /// comma-terminated. An empty body inserts nothing; a partial body
    /// defaults the missing side.
    fn parse_map_entry(
        &self,
        tok: &mut Tokenizer,
        target: &mut MessageValue,
        field: &Field,
        types: MapTypes,
    ) -> Result<(), ParseError> {
        let end = if tok.try_consume("<") {
            ">"
        } else {
            tok.consume("{")?;
            "}"
        };

        let mut key: Option<MapKey> = None;
        let mut value: Option<Value> = None;
        while !tok.try_consume(end) {
            if tok.at_end() {
                return Err(tok.parse_error(format!("Expected \"{}\".", end)));
            }
            if tok.try_consume("key") {
                tok.consume(":")?;
                key = Some(self.parse_map_key(tok, types.key)?);
            } else if tok.try_consume("value") {
                value = Some(match types.value {
                    FieldType::Message(idx) => {
                        tok.try_consume(":");
                        let mut sub = MessageValue::new(idx);
                        self.parse_message_body(tok, &mut sub)?;
                        Value::Message(sub)
                    }
                    FieldType::Enum(idx) => {
                        tok.consume(":")?;
                        self.parse_enum_value(tok, idx)?
                    }
                    FieldType::Scalar(scalar) => {
                        tok.consume(":")?;
                        self.parse_scalar_value(tok, scalar)?
                    }
                });
            } else {
                return Err(tok.parse_error(format!(
                    "Unexpected field in map entry: {}.",
                    tok.current()
                )));
            }
            tok.try_consume(",");
        }

        if key.is_none() && value.is_none() {
            return Ok(());
        }
        let key = key.unwrap_or_else(|| default_map_key(types.key));
        let value = value.unwrap_or_else(|| default_value(types.value));

        let entry = target
            .fields
            .entry(field.name.clone())
            .or_insert_with(|| Value::Map(HashMap::new()));
        if !matches!(entry, Value::Map(_)) {
            *entry = Value::Map(HashMap::new());
        }
        if let Value::Map(map) = entry {
            map.insert(key, value);
        }
        Ok(())
    }

    fn parse_map_key(
        &self,
        tok: &mut Tokenizer,
        scalar: ScalarType,
    ) -> Result<MapKey, ParseError> {
        Ok(match scalar {
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
                MapKey::Int(tok.consume_int32()? as i64)
            }
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
                MapKey::Int(tok.consume_int64()?)
            }
            ScalarType::Uint32 | ScalarType::Fixed32 => {
                MapKey::Uint(tok.consume_uint32()? as u64)
            }
            ScalarType::Uint64 | ScalarType::Fixed64 => MapKey::Uint(tok.consume_uint64()?),
            ScalarType::Bool => MapKey::Bool(tok.consume_bool()?),
            ScalarType::String => MapKey::Str(tok.consume_string()?),
            // Pools built by the schema loader never carry these key types.
            other => {
                return Err(tok.parse_error(format!("Unknown scalar type: {}.", other.name())));
            }
        })
    }

    /// Skip the value of an unknown field: either a colon followed by a
    /// scalar, a list, or a message body; or a bare message body.
    fn skip_field_contents(&self, tok: &mut Tokenizer) -> Result<(), ParseError> {
        if tok.try_consume(":") {
            if tok.looking_at("[") {
                self.skip_list(tok)
            } else if tok.looking_at("{") || tok.looking_at("<") {
                self.skip_message_body(tok)
            } else {
                self.skip_scalar(tok)
            }
        } else {
            self.skip_message_body(tok)
        }
    }

    fn skip_scalar(&self, tok: &mut Tokenizer) -> Result<(), ParseError> {
        if !tok.try_consume_any_scalar() {
            return Err(tok.parse_error(format!("Invalid field value: {}", tok.current())));
        }
        Ok(())
    }

    fn skip_list(&self, tok: &mut Tokenizer) -> Result<(), ParseError> {
        tok.consume("[")?;
        if tok.try_consume("]") {
            return Ok(());
        }
        loop {
            if tok.looking_at("{") || tok.looking_at("<") {
                self.skip_message_body(tok)?;
            } else {
                self.skip_scalar(tok)?;
            }
            if !tok.try_consume(",") {
                return tok.consume("]");
            }
        }
    }

    fn skip_message_body(&self, tok: &mut Tokenizer) -> Result<(), ParseError> {
        let end = if tok.try_consume("<") {
            ">"
        } else {
            tok.consume("{")?;
            "}"
        };
        while !tok.try_consume(end) {
            if tok.at_end() {
                return Err(tok.parse_error(format!("Expected \"{}\".", end)));
            }
            self.skip_field(tok)?;
        }
        Ok(())
    }

    /// Skip a whole unknown field: name (plain or bracketed), contents, and
    /// the optional `;` or `,` separator.
    fn skip_field(&self, tok: &mut Tokenizer) -> Result<(), ParseError> {
        if tok.try_consume("[") {
            tok.consume_identifier()?;
            while tok.try_consume(".") {
                tok.consume_identifier()?;
            }
            tok.consume("]")?;
        } else {
            tok.consume_identifier_or_number()?;
        }
        self.skip_field_contents(tok)?;
        if !tok.try_consume(";") {
            tok.try_consume(",");
        }
        Ok(())
    }
}

/// Append to an ordered sequence, created on first write.
fn append(target: &mut MessageValue, name: &str, value: Value) {
    let entry = target
        .fields
        .entry(name.to_string())
        .or_insert_with(|| Value::List(Vec::new()));
    if !matches!(entry, Value::List(_)) {
        *entry = Value::List(Vec::new());
    }
    if let Value::List(items) = entry {
        items.push(value);
    }
}

fn default_map_key(scalar: ScalarType) -> MapKey {
    match scalar {
        ScalarType::Bool => MapKey::Bool(false),
        ScalarType::String => MapKey::Str(String::new()),
        ScalarType::Uint32 | ScalarType::Uint64 | ScalarType::Fixed32 | ScalarType::Fixed64 => {
            MapKey::Uint(0)
        }
        _ => MapKey::Int(0),
    }
}

fn default_value(field_type: FieldType) -> Value {
    match field_type {
        FieldType::Scalar(scalar) => match scalar {
            ScalarType::Double | ScalarType::Float => Value::Double(0.0),
            ScalarType::Bool => Value::Bool(false),
            ScalarType::String => Value::Str(String::new()),
            ScalarType::Bytes => Value::Bytes(Vec::new()),
            ScalarType::Uint32
            | ScalarType::Uint64
            | ScalarType::Fixed32
            | ScalarType::Fixed64 => Value::Uint(0),
            _ => Value::Int(0),
        },
        FieldType::Enum(_) => Value::Int(0),
        FieldType::Message(idx) => Value::Message(MessageValue::new(idx)),
    }
}
