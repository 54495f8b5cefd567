//! flatware
//!
//! The user-facing facade over the flatware workspace:
//!
//! - the wire-format runtime (re-exported from `flatware-buffer`): a
//!   bottom-up [Builder] and the lazy [Table]/[Vector] readers,
//! - the schema front-end (re-exported from `flatware-compiler`):
//!   tokenizer, parser, and semantic analyzer,
//! - convenience helpers gluing the two together.

pub use flatware_buffer::{
    check_file_identifier, required, Builder, Offset, Position, Read, ReadError, Scalar,
    StructWriter, Table, UnionWrite, Vector, VectorIter,
};
pub use flatware_compiler::{
    analyze_schema, parse_schema, tokenize_schema, SchemaError, SchemaTree, ValidatedSchema,
};

pub mod buffer {
    pub use flatware_buffer::*;
}

pub mod compiler {
    pub use flatware_compiler::*;
}

/// Compiles a self-contained schema (no includes) into the validated IR.
pub fn compile_schema(text: &str) -> Result<ValidatedSchema, SchemaError> {
    let tokens = tokenize_schema(text)?;
    let schema = parse_schema(&tokens)?;
    analyze_schema(&SchemaTree::new(schema))
}

/// Renders a validated schema as pretty-printed JSON, the hand-off format
/// for downstream code generators.
pub fn ir_to_json(schema: &ValidatedSchema) -> String {
    serde_json::to_string_pretty(schema).unwrap()
}
