//! Zero-copy runtime for the FlatBuffers wire format.
//!
//! The format lets readers access fields straight out of a byte buffer,
//! without a parse step and without allocating. This crate provides the two
//! halves of that contract: [Builder] assembles a buffer bottom-up
//! (children first, vtables deduplicated, every object aligned), and
//! [Table]/[Vector]/[Position] navigate a finished buffer lazily, chasing
//! offsets on demand and validating bounds as they go.
//!
//! ```
//! use flatware_buffer::{Builder, Table};
//!
//! let mut builder = Builder::new();
//! let name = builder.create_string("orc");
//! builder.start_table(2);
//! builder.push_offset_slot(0, name);
//! builder.push_slot::<i16>(1, 150, 100);
//! let root = builder.end_table();
//! let bytes = builder.finish(root, None);
//!
//! let monster = Table::root(&bytes).unwrap();
//! assert_eq!(monster.string_field(0).unwrap(), Some("orc"));
//! assert_eq!(monster.scalar_field::<i16>(1, 100).unwrap(), 150);
//! ```
//!
//! Typed bindings for a concrete schema are thin wrappers over these
//! navigators: a generated (or hand-written) table type holds a [Table] and
//! maps field names to slot indexes.

pub mod builder;
pub mod error;
pub mod read;
pub mod scalar;

pub use builder::{Builder, Offset, StructWriter, UnionWrite};
pub use error::ReadError;
pub use read::{check_file_identifier, required, Position, Read, Table, Vector, VectorIter};
pub use scalar::Scalar;

/// Width of an unsigned forward offset to a child object.
pub const SIZE_UOFFSET: usize = 4;
/// Width of the signed offset from a table to its vtable.
pub const SIZE_SOFFSET: usize = 4;
/// Width of a vtable entry.
pub const SIZE_VOFFSET: usize = 2;
/// Length of the optional file identifier after the root offset.
pub const FILE_IDENTIFIER_LEN: usize = 4;
/// Positions are signed 32-bit on the wire, so a buffer may not grow past
/// this many bytes; the builder treats exceeding it as an overflow.
pub const MAX_BUFFER_SIZE: usize = i32::MAX as usize;
