//! The raw syntax tree produced by the parser. Nothing here is validated:
//! type references are bare identifier paths, defaults are untyped literals,
//! metadata is an uninterpreted attribute list. The semantic analyzer turns
//! this into the IR of [crate::ir].

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub includes: Vec<IncludeDecl>,
    pub decls:    Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncludeDecl {
    pub path:   String,
    pub line:   usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Decl {
    Namespace(NamespaceDecl),
    Table(TableDef),
    Struct(StructDef),
    Enum(EnumDef),
    Union(UnionDef),
    RootType(RootTypeDecl),
    FileIdentifier(FileIdentifierDecl),
    Attribute(AttributeDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceDecl {
    pub parts:  Vec<String>,
    pub line:   usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDef {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub metadata: Metadata,
    pub fields:   Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructDef {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub metadata: Metadata,
    pub fields:   Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub type_:    TypeRef,
    pub default:  Option<Literal>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDef {
    pub name:       String,
    pub line:       usize,
    pub column:     usize,
    pub underlying: TypeRef,
    pub metadata:   Metadata,
    pub members:    Vec<EnumMemberDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMemberDef {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub value:  Option<i128>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionDef {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub metadata: Metadata,
    pub members:  Vec<QualifiedRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootTypeDecl {
    pub type_:  QualifiedRef,
    pub line:   usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileIdentifierDecl {
    pub value:  String,
    pub line:   usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDecl {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
}

/// A possibly dot-qualified reference to a declared type, as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedRef {
    pub parts: Vec<String>,
}

impl fmt::Display for QualifiedRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeRef {
    Bool,
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Str,
    Vector(Box<TypeRef>),
    Named(QualifiedRef),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Int(i128),
    Float(f64),
    Bool(bool),
    Ref(String),
    Str(String),
}

/// The `(name: value, ...)` attribute list attached to declarations and
/// fields. Order is preserved; lookups are by name.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Metadata {
    pub entries: Vec<MetadataEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataEntry {
    pub name:  String,
    pub value: Option<Literal>,
}

impl Metadata {
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn value_of(&self, name: &str) -> Option<&Literal> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.value.as_ref())
    }
}
