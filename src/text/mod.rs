//! The text-format parser: a tokenizer over the input lines and a
//! recursive-descent merger that deposits typed values onto a target
//! message under the direction of its descriptor.

mod merge;
pub mod tokenizer;

pub use tokenizer::Tokenizer;

use crate::descriptor::DescriptorPool;
use crate::error::ParseError;
use crate::value::MessageValue;

/// Configuration options for the text-format parser.
///
/// # Default
///
/// All options default to `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Whether unknown `[a.b.c]`-named extension fields are skipped instead
    /// of raising an error.
    pub allow_unknown_extension: bool,

    /// Whether a bare integer field name looks the field up by its numeric
    /// tag.
    pub allow_field_number: bool,

    /// Whether unknown field names have their contents skipped instead of
    /// raising an error.
    pub allow_unknown_field: bool,
}

/// Merge text-format input into `message`.
///
/// The message's descriptor (via its `type_index` into `pool`) drives field
/// resolution; on return the same message reflects all parsed fields.
/// Scalars overwrite, sub-messages merge, repeated and map fields
/// accumulate. The first error terminates parsing; fields deposited before
/// the error remain on the target.
///
/// # Example
///
/// ```
/// use prototext::{schema, text};
///
/// let pool = schema::load(r#"
///     message Person {
///         optional string name = 1;
///         optional int32 age = 2;
///     }
/// "#).unwrap();
///
/// let mut person = pool.new_message("Person").unwrap();
/// text::parse(&pool, "name: \"Alice\" age: 30", &mut person,
///             &text::ParseOptions::default()).unwrap();
/// assert_eq!(person.get("name").unwrap().as_str(), Some("Alice"));
/// assert_eq!(person.get("age").unwrap().as_int(), Some(30));
/// ```
pub fn parse(
    pool: &DescriptorPool,
    text: &str,
    message: &mut MessageValue,
    options: &ParseOptions,
) -> Result<(), ParseError> {
    let mut tok = Tokenizer::new(text);
    let merger = merge::Merger::new(pool, options);
    merger.merge_text(&mut tok, message)
}
