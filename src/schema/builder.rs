use std::collections::HashMap;

use super::ast::*;
use crate::descriptor::*;
use crate::error::SchemaError;

/// Build a `DescriptorPool` from a parsed AST.
pub fn build_pool(file: AstFile) -> Result<DescriptorPool, SchemaError> {
    let package = file.package.clone().unwrap_or_default();

    // Phase 1: Collect all definitions, flattening nested types under
    // dot-separated names prefixed by the package.
    let mut raw_messages: HashMap<String, Vec<RawField>> = HashMap::new();
    let mut raw_enums: HashMap<String, Vec<(String, i32)>> = HashMap::new();
    let mut raw_extends: Vec<RawExtend> = Vec::new();

    for item in &file.items {
        match item {
            AstItem::Message(m) => {
                collect_message(&package, m, &mut raw_messages, &mut raw_enums, &mut raw_extends)?;
            }
            AstItem::Enum(e) => {
                collect_enum(&package, e, &raw_messages, &mut raw_enums)?;
            }
            AstItem::Extend(x) => {
                raw_extends.push(RawExtend {
                    extendee: x.extendee.clone(),
                    scope: package.clone(),
                    fields: x.fields.iter().map(RawField::from_ast).collect(),
                });
            }
        }
    }

    // Phase 2: Sort names for stable indices and build name -> index maps.
    let mut message_names: Vec<String> = raw_messages.keys().cloned().collect();
    message_names.sort();
    let mut enum_names: Vec<String> = raw_enums.keys().cloned().collect();
    enum_names.sort();

    let mut messages_by_name: HashMap<String, usize> = HashMap::new();
    for (idx, name) in message_names.iter().enumerate() {
        messages_by_name.insert(name.clone(), idx);
    }
    let mut enums_by_name: HashMap<String, usize> = HashMap::new();
    for (idx, name) in enum_names.iter().enumerate() {
        enums_by_name.insert(name.clone(), idx);
    }

    // Phase 3: Resolve type references and build descriptors.
    let mut messages: Vec<MessageDescriptor> = Vec::new();
    for full_name in &message_names {
        let raw_fields = &raw_messages[full_name];
        let mut fields = Vec::with_capacity(raw_fields.len());
        for rf in raw_fields {
            fields.push(build_field(
                full_name,
                rf,
                &messages_by_name,
                &enums_by_name,
            )?);
        }
        fields.sort_by_key(|f| f.number);
        messages.push(MessageDescriptor {
            full_name: full_name.clone(),
            fields,
        });
    }

    let enums: Vec<EnumDescriptor> = enum_names
        .iter()
        .map(|full_name| EnumDescriptor {
            full_name: full_name.clone(),
            values: raw_enums[full_name].clone(),
        })
        .collect();

    // Phase 4: Resolve extensions.
    let mut extensions: HashMap<String, Extension> = HashMap::new();
    for rx in &raw_extends {
        let extendee = match resolve_named(&rx.scope, &rx.extendee, &messages_by_name) {
            Some(idx) => idx,
            None => {
                return Err(SchemaError::UndefinedType {
                    type_name: rx.extendee.clone(),
                    referenced_by: format!("extend block in '{}'", rx.scope),
                });
            }
        };
        for rf in &rx.fields {
            let field = build_field(&rx.scope, rf, &messages_by_name, &enums_by_name)?;
            let full_name = if rx.scope.is_empty() {
                field.name.clone()
            } else {
                format!("{}.{}", rx.scope, field.name)
            };
            if extensions.contains_key(&full_name) {
                return Err(SchemaError::DuplicateExtension { name: full_name });
            }
            extensions.insert(full_name, Extension { field, extendee });
        }
    }

    Ok(DescriptorPool {
        messages,
        messages_by_name,
        enums,
        enums_by_name,
        extensions,
    })
}

// Internal helper types

struct RawField {
    name: String,
    number: i32,
    repeated: bool,
    type_name: String,
    /// For map fields: the declared key type name.
    map_key: Option<String>,
}

impl RawField {
    fn from_ast(f: &AstField) -> RawField {
        RawField {
            name: f.name.clone(),
            number: f.number,
            repeated: f.repeated,
            type_name: f.type_name.clone(),
            map_key: None,
        }
    }

    fn from_map(m: &AstMap) -> RawField {
        RawField {
            name: m.name.clone(),
            number: m.number,
            repeated: false,
            type_name: m.value_type.clone(),
            map_key: Some(m.key_type.clone()),
        }
    }
}

struct RawExtend {
    extendee: String,
    /// Dotted name of the scope the extend block was declared in.
    scope: String,
    fields: Vec<RawField>,
}

/// Recursively collect message definitions, flattening nested types with
/// dot-separated names.
fn collect_message(
    scope: &str,
    msg: &AstMessage,
    out_messages: &mut HashMap<String, Vec<RawField>>,
    out_enums: &mut HashMap<String, Vec<(String, i32)>>,
    out_extends: &mut Vec<RawExtend>,
) -> Result<(), SchemaError> {
    let full_name = join_scope(scope, &msg.name);
    if out_messages.contains_key(&full_name) || out_enums.contains_key(&full_name) {
        return Err(SchemaError::DuplicateType { name: full_name });
    }

    let mut fields: Vec<RawField> = Vec::new();
    let mut numbers: HashMap<i32, ()> = HashMap::new();
    let mut names: HashMap<String, ()> = HashMap::new();

    for member in &msg.members {
        let raw = match member {
            AstMember::Field(f) => RawField::from_ast(f),
            AstMember::Map(m) => RawField::from_map(m),
            AstMember::Nested(nested) => {
                collect_message(&full_name, nested, out_messages, out_enums, out_extends)?;
                continue;
            }
            AstMember::Enum(e) => {
                collect_enum(&full_name, e, out_messages, out_enums)?;
                continue;
            }
            AstMember::Extend(x) => {
                out_extends.push(RawExtend {
                    extendee: x.extendee.clone(),
                    scope: full_name.clone(),
                    fields: x.fields.iter().map(RawField::from_ast).collect(),
                });
                continue;
            }
        };

        if numbers.insert(raw.number, ()).is_some() {
            return Err(SchemaError::DuplicateNumber {
                message_name: full_name,
                number: raw.number,
            });
        }
        if names.insert(raw.name.clone(), ()).is_some() {
            return Err(SchemaError::DuplicateField {
                message_name: full_name,
                field_name: raw.name,
            });
        }
        fields.push(raw);
    }

    out_messages.insert(full_name, fields);
    Ok(())
}

fn collect_enum(
    scope: &str,
    e: &AstEnum,
    messages: &HashMap<String, Vec<RawField>>,
    out_enums: &mut HashMap<String, Vec<(String, i32)>>,
) -> Result<(), SchemaError> {
    let full_name = join_scope(scope, &e.name);
    if out_enums.contains_key(&full_name) || messages.contains_key(&full_name) {
        return Err(SchemaError::DuplicateType { name: full_name });
    }
    out_enums.insert(full_name, e.values.clone());
    Ok(())
}

fn join_scope(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

fn build_field(
    scope: &str,
    rf: &RawField,
    messages_by_name: &HashMap<String, usize>,
    enums_by_name: &HashMap<String, usize>,
) -> Result<Field, SchemaError> {
    let field_type = resolve_field_type(scope, &rf.type_name, messages_by_name, enums_by_name)
        .ok_or_else(|| SchemaError::UndefinedType {
            type_name: rf.type_name.clone(),
            referenced_by: scope.to_string(),
        })?;

    let map = match &rf.map_key {
        Some(key_name) => {
            let key = ScalarType::from_name(key_name).filter(|k| k.valid_map_key()).ok_or_else(
                || SchemaError::InvalidMapKey {
                    message_name: scope.to_string(),
                    field_name: rf.name.clone(),
                    key_type: key_name.clone(),
                },
            )?;
            Some(MapTypes {
                key,
                value: field_type,
            })
        }
        None => None,
    };

    Ok(Field {
        camel_name: camel_case(&rf.name),
        name: rf.name.clone(),
        number: rf.number,
        field_type,
        repeated: rf.repeated,
        map,
    })
}

/// Resolve a type name to a FieldType: scalars first, then message/enum
/// lookup relative to the declaring scope, walking up the parent chain.
fn resolve_field_type(
    scope: &str,
    type_name: &str,
    messages_by_name: &HashMap<String, usize>,
    enums_by_name: &HashMap<String, usize>,
) -> Option<FieldType> {
    if let Some(scalar) = ScalarType::from_name(type_name) {
        return Some(FieldType::Scalar(scalar));
    }

    // Absolute reference
    if let Some(stripped) = type_name.strip_prefix('.') {
        return lookup_named(stripped, messages_by_name, enums_by_name);
    }

    // Walk up the scope chain: scope.name, parent.name, ..., name
    let mut prefix = scope.to_string();
    loop {
        let candidate = join_scope(&prefix, type_name);
        if let Some(ft) = lookup_named(&candidate, messages_by_name, enums_by_name) {
            return Some(ft);
        }
        match prefix.rfind('.') {
            Some(pos) => prefix.truncate(pos),
            None => break,
        }
    }
    lookup_named(type_name, messages_by_name, enums_by_name)
}

fn lookup_named(
    name: &str,
    messages_by_name: &HashMap<String, usize>,
    enums_by_name: &HashMap<String, usize>,
) -> Option<FieldType> {
    if let Some(&idx) = messages_by_name.get(name) {
        return Some(FieldType::Message(idx));
    }
    enums_by_name.get(name).map(|&idx| FieldType::Enum(idx))
}

/// Resolve a message reference (extension extendee) by scope chain.
fn resolve_named(
    scope: &str,
    name: &str,
    messages_by_name: &HashMap<String, usize>,
) -> Option<usize> {
    if let Some(stripped) = name.strip_prefix('.') {
        return messages_by_name.get(stripped).copied();
    }
    let mut prefix = scope.to_string();
    loop {
        let candidate = join_scope(&prefix, name);
        if let Some(&idx) = messages_by_name.get(&candidate) {
            return Some(idx);
        }
        match prefix.rfind('.') {
            Some(pos) => prefix.truncate(pos),
            None => break,
        }
    }
    messages_by_name.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::grammar::parse_file;

    fn load(text: &str) -> DescriptorPool {
        build_pool(parse_file(text).unwrap()).unwrap()
    }

    #[test]
    fn test_build_simple_schema() {
        let pool = load(
            r#"
            package demo;
            message Person {
                optional string name = 1;
                optional int32 age = 2;
                optional bool marital = 3;
            }
            "#,
        );
        let person = pool.message_by_name("demo.Person").unwrap();
        assert_eq!(person.fields.len(), 3);
        assert_eq!(person.fields[0].name, "name");
        assert_eq!(
            person.fields[0].field_type,
            FieldType::Scalar(ScalarType::String)
        );
        assert_eq!(person.fields[1].number, 2);
    }

    #[test]
    fn test_build_nested_type() {
        let pool = load(
            r#"
            message Person {
                message PhoneNumber {
                    optional string number = 1;
                    optional int32 kind = 2;
                }
                repeated PhoneNumber phone = 1;
            }
            "#,
        );
        assert!(pool.message_by_name("Person").is_some());
        assert!(pool.message_by_name("Person.PhoneNumber").is_some());
        let person = pool.message_by_name("Person").unwrap();
        let phone = person.field_by_name("phone").unwrap();
        assert!(phone.repeated);
        assert!(matches!(phone.field_type, FieldType::Message(_)));
    }

    #[test]
    fn test_build_enum_reference() {
        let pool = load(
            r#"
            enum Color { RED = 0; GREEN = 1; BLUE = 2; }
            message Pixel { optional Color color = 1; }
            "#,
        );
        let color = pool.enum_by_name("Color").unwrap();
        assert_eq!(color.value_by_name("GREEN"), Some(1));
        assert_eq!(color.value_by_number(2), Some("BLUE"));
        let pixel = pool.message_by_name("Pixel").unwrap();
        assert!(matches!(
            pixel.field_by_name("color").unwrap().field_type,
            FieldType::Enum(_)
        ));
    }

    #[test]
    fn test_build_map_field() {
        let pool = load("message M { map<string, int64> counts = 1; }");
        let m = pool.message_by_name("M").unwrap();
        let counts = m.field_by_name("counts").unwrap();
        let map = counts.map.unwrap();
        assert_eq!(map.key, ScalarType::String);
        assert_eq!(map.value, FieldType::Scalar(ScalarType::Int64));
    }

    #[test]
    fn test_invalid_map_key() {
        let ast = parse_file("message M { map<double, int32> bad = 1; }").unwrap();
        assert!(matches!(
            build_pool(ast),
            Err(SchemaError::InvalidMapKey { .. })
        ));
    }

    #[test]
    fn test_duplicate_number_error() {
        let ast = parse_file("message M { optional int32 a = 1; optional int32 b = 1; }").unwrap();
        assert!(matches!(
            build_pool(ast),
            Err(SchemaError::DuplicateNumber { .. })
        ));
    }

    #[test]
    fn test_build_extension() {
        let pool = load(
            r#"
            package demo;
            message Base { optional int32 id = 1; }
            extend Base { optional string note = 100; }
            "#,
        );
        let ext = pool.extension_by_name("demo.note").unwrap();
        assert_eq!(ext.field.number, 100);
        assert_eq!(ext.extendee, pool.message_index("demo.Base").unwrap());
    }

    #[test]
    fn test_camel_names_precomputed() {
        let pool = load("message M { optional string display_name = 1; }");
        let m = pool.message_by_name("M").unwrap();
        assert!(m.field_by_camel_name("displayName").is_some());
        assert!(m.field_by_camel_name("display_name").is_none());
    }
}
