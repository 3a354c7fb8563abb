/// Error raised while parsing text-format input.
///
/// A single kind covers every failure: the tokenizer and the merger both
/// report through it, carrying the 1-based line and column the problem was
/// detected at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{line}:{column} : {message}")]
pub struct ParseError {
    pub message: String,
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column of the offending token.
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        ParseError {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Errors from the schema text loader.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("duplicate field number {number} in message '{message_name}'")]
    DuplicateNumber { message_name: String, number: i32 },

    #[error("duplicate field '{field_name}' in message '{message_name}'")]
    DuplicateField {
        message_name: String,
        field_name: String,
    },

    #[error("undefined type '{type_name}' referenced by '{referenced_by}'")]
    UndefinedType {
        type_name: String,
        referenced_by: String,
    },

    #[error("invalid map key type '{key_type}' for field '{field_name}' in '{message_name}'")]
    InvalidMapKey {
        message_name: String,
        field_name: String,
        key_type: String,
    },

    #[error("redefined type '{name}'")]
    DuplicateType { name: String },

    #[error("redefined extension '{name}'")]
    DuplicateExtension { name: String },
}

/// Top-level error type that wraps all sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Result type alias for prototext operations.
pub type Result<T> = std::result::Result<T, Error>;
