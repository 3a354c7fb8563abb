pub mod ast;
pub mod builder;
pub mod grammar;
pub mod lexer;

use crate::descriptor::DescriptorPool;
use crate::error::SchemaError;

/// Load protobuf schema text into a `DescriptorPool`.
///
/// This is the main entry point for the schema module.
pub fn load(schema_text: &str) -> Result<DescriptorPool, SchemaError> {
    let file = grammar::parse_file(schema_text)?;
    builder::build_pool(file)
}
