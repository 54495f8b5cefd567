//! The validated intermediate representation produced by the semantic
//! analyzer. Everything here has been checked: references resolve, enum
//! values are ordered and in range, struct layouts are computed, table
//! defaults are members of their types. Downstream code generators consume
//! this IR as-is.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// A dotted namespace path. The root namespace is the empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Namespace(pub Vec<String>);

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// A declaration's fully qualified name: namespace plus identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedName {
    pub namespace: Namespace,
    pub ident:     String,
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.namespace.0.is_empty() {
            write!(f, "{}", self.ident)
        } else {
            write!(f, "{}.{}", self.namespace, self.ident)
        }
    }
}

/// The integral types an enum may use as its underlying representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntType {
    pub fn size(self) -> usize {
        match self {
            IntType::I8 | IntType::U8 => 1,
            IntType::I16 | IntType::U16 => 2,
            IntType::I32 | IntType::U32 => 4,
            IntType::I64 | IntType::U64 => 8,
        }
    }

    pub fn bounds(self) -> (i128, i128) {
        match self {
            IntType::I8 => (i8::MIN as i128, i8::MAX as i128),
            IntType::I16 => (i16::MIN as i128, i16::MAX as i128),
            IntType::I32 => (i32::MIN as i128, i32::MAX as i128),
            IntType::I64 => (i64::MIN as i128, i64::MAX as i128),
            IntType::U8 => (0, u8::MAX as i128),
            IntType::U16 => (0, u16::MAX as i128),
            IntType::U32 => (0, u32::MAX as i128),
            IntType::U64 => (0, u64::MAX as i128),
        }
    }

    pub fn fits(self, value: i128) -> bool {
        let (min, max) = self.bounds();
        min <= value && value <= max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FloatType {
    F32,
    F64,
}

impl FloatType {
    pub fn size(self) -> usize {
        match self {
            FloatType::F32 => 4,
            FloatType::F64 => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDecl {
    pub name:       QualifiedName,
    pub underlying: IntType,
    pub members:    Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub ident: String,
    pub value: i128,
}

impl EnumDecl {
    pub fn member_with_value(&self, value: i128) -> Option<&EnumMember> {
        self.members.iter().find(|member| member.value == value)
    }

    pub fn member_named(&self, ident: &str) -> Option<&EnumMember> {
        self.members.iter().find(|member| member.ident == ident)
    }
}

/// A fixed-size inline record. `alignment` is a power of two in `[1, 16]`,
/// at least the natural alignment of the fields; `size` is the padded byte
/// size, a multiple of `alignment`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructDecl {
    pub name:      QualifiedName,
    pub alignment: usize,
    pub size:      usize,
    pub fields:    Vec<StructField>,
}

/// One struct field with its byte offset and the padding that follows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructField {
    pub ident:   String,
    pub offset:  usize,
    pub padding: usize,
    pub type_:   StructFieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StructFieldType {
    Bool,
    Int(IntType),
    Float(FloatType),
    Enum(QualifiedName),
    Struct(QualifiedName),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDecl {
    pub name:   QualifiedName,
    pub fields: Vec<TableField>,
}

/// One table field. `slot` is the field's first vtable slot; union fields
/// (and vectors of unions) occupy this slot for the type tag and the next
/// one for the value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableField {
    pub ident:      String,
    pub slot:       u16,
    pub type_:      TableFieldType,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableFieldType {
    Bool { default: bool },
    Int { type_: IntType, default: i128 },
    Float { type_: FloatType, default: f64 },
    Str { required: bool },
    Enum { name: QualifiedName, underlying: IntType, default: i128 },
    Struct { name: QualifiedName, required: bool },
    Table { name: QualifiedName, required: bool },
    Union { name: QualifiedName, required: bool },
    Vector { element: VectorElement, required: bool },
}

impl TableFieldType {
    /// How many vtable slots a field of this type occupies.
    pub fn slot_count(&self) -> u16 {
        match self {
            TableFieldType::Union { .. } => 2,
            TableFieldType::Vector { element: VectorElement::Union(_), .. } => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VectorElement {
    Bool,
    Int(IntType),
    Float(FloatType),
    Str,
    Enum(QualifiedName),
    Struct(QualifiedName),
    Table(QualifiedName),
    Union(QualifiedName),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionDecl {
    pub name:    QualifiedName,
    pub members: Vec<UnionMember>,
}

/// One union arm. Wire type tags are `index + 1`; tag 0 is the implicit
/// `NONE` variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionMember {
    pub ident: String,
    pub table: QualifiedName,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootInfo {
    pub table:           QualifiedName,
    pub file_identifier: Option<String>,
}

/// Points into the declaration lists of a [ValidatedSchema].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeclRef {
    Enum(usize),
    Struct(usize),
    Table(usize),
    Union(usize),
}

/// The analyzer's output: every declaration validated, plus a symbol table
/// from dotted qualified names to declarations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedSchema {
    pub enums:   Vec<EnumDecl>,
    pub structs: Vec<StructDecl>,
    pub tables:  Vec<TableDecl>,
    pub unions:  Vec<UnionDecl>,
    pub root:    Option<RootInfo>,
    pub symbols: HashMap<String, DeclRef>,
}

impl ValidatedSchema {
    pub fn lookup(&self, qualified_name: &str) -> Option<DeclRef> {
        self.symbols.get(qualified_name).copied()
    }

    pub fn enum_named(&self, qualified_name: &str) -> Option<&EnumDecl> {
        match self.lookup(qualified_name)? {
            DeclRef::Enum(index) => self.enums.get(index),
            _ => None,
        }
    }

    pub fn struct_named(&self, qualified_name: &str) -> Option<&StructDecl> {
        match self.lookup(qualified_name)? {
            DeclRef::Struct(index) => self.structs.get(index),
            _ => None,
        }
    }

    pub fn table_named(&self, qualified_name: &str) -> Option<&TableDecl> {
        match self.lookup(qualified_name)? {
            DeclRef::Table(index) => self.tables.get(index),
            _ => None,
        }
    }

    pub fn union_named(&self, qualified_name: &str) -> Option<&UnionDecl> {
        match self.lookup(qualified_name)? {
            DeclRef::Union(index) => self.unions.get(index),
            _ => None,
        }
    }
}
