//! flatware-compiler
//!
//! The FlatBuffers schema front-end:
//!  1) A tokenizer + parser for `.fbs` IDL files,
//!  2) A semantic analyzer (namespace resolution, struct cycles, enum
//!     ordering and bounds, alignment computation, default handling),
//!  3) The validated IR consumed by downstream code generators,
//!  4) Error types (`SchemaError`).
//!
//! The analyzer performs no I/O. Included files are loaded by the caller
//! and handed over as a [analyzer::SchemaTree].

pub mod analyzer;
pub mod error;
pub mod ir;
pub mod parser;
pub mod tokenizer;
pub mod types;
pub mod utils;

pub use analyzer::{analyze_schema, SchemaTree};
pub use error::SchemaError;
pub use ir::ValidatedSchema;
pub use parser::parse_schema;
pub use tokenizer::tokenize_schema;
