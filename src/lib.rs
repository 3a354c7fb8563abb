//! Prototext: a schema-driven parser for the protocol-buffer text format.
//!
//! The text format is the human-readable encoding of protocol-buffer
//! messages. This crate tokenizes a text document and merges its fields
//! onto a caller-supplied, schema-typed message value: scalars overwrite,
//! sub-messages merge, repeated and map fields accumulate.
//!
//! # Quick Start
//!
//! ```rust
//! use prototext::{schema, text};
//!
//! let pool = schema::load(r#"
//!     message Person {
//!         optional string name = 1;
//!         optional int32 age = 2;
//!         repeated string hobbies = 3;
//!     }
//! "#).unwrap();
//!
//! let mut person = pool.new_message("Person").unwrap();
//! text::parse(&pool, r#"
//!     name: "Alice"
//!     age: 30
//!     hobbies: "chess"
//!     hobbies: ["go", "shogi"]
//! "#, &mut person, &text::ParseOptions::default()).unwrap();
//!
//! assert_eq!(person.get("name").unwrap().as_str(), Some("Alice"));
//! assert_eq!(person.get("hobbies").unwrap().as_list().unwrap().len(), 3);
//! ```

pub mod descriptor;
pub mod error;
pub mod schema;
pub mod text;
pub mod value;

#[cfg(feature = "serde")]
pub mod serde;

pub use descriptor::DescriptorPool;
pub use error::{Error, ParseError, SchemaError};
pub use text::{parse, ParseOptions};
pub use value::{MapKey, MessageValue, Value};
