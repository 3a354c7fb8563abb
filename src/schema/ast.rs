//! AST node types for parsed protobuf schema text.

/// A parsed schema file.
#[derive(Debug, Clone)]
pub struct AstFile {
    pub package: Option<String>,
    pub items: Vec<AstItem>,
}

/// A top-level item: a message, an enum, or an extend block.
#[derive(Debug, Clone)]
pub enum AstItem {
    Message(AstMessage),
    Enum(AstEnum),
    Extend(AstExtend),
}

/// A message definition.
#[derive(Debug, Clone)]
pub struct AstMessage {
    pub name: String,
    pub members: Vec<AstMember>,
    pub line: usize,
}

/// A member of a message body.
#[derive(Debug, Clone)]
pub enum AstMember {
    Field(AstField),
    Map(AstMap),
    Nested(AstMessage),
    Enum(AstEnum),
    Extend(AstExtend),
}

/// A normal (non-map) field definition.
#[derive(Debug, Clone)]
pub struct AstField {
    pub repeated: bool,
    /// Type reference as written, possibly dotted; a leading `.` marks an
    /// absolute reference.
    pub type_name: String,
    pub name: String,
    pub number: i32,
    pub line: usize,
}

/// A `map<K, V>` field definition.
#[derive(Debug, Clone)]
pub struct AstMap {
    pub key_type: String,
    pub value_type: String,
    pub name: String,
    pub number: i32,
    pub line: usize,
}

/// An enum definition.
#[derive(Debug, Clone)]
pub struct AstEnum {
    pub name: String,
    /// (name, number) pairs in declaration order.
    pub values: Vec<(String, i32)>,
    pub line: usize,
}

/// An `extend` block: fields declared outside their container message.
#[derive(Debug, Clone)]
pub struct AstExtend {
    pub extendee: String,
    pub fields: Vec<AstField>,
    pub line: usize,
}
