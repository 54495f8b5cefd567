//! Semantic analysis: turns a tree of parsed schemas into the validated IR.
//!
//! The analyzer performs no I/O; loading included files and assembling the
//! [SchemaTree] is the caller's job. Analysis runs in passes: enums first
//! (they depend on nothing), then structs (memoized, with cycle detection),
//! then unions, then tables, then the root declaration. Every error message
//! is prefixed with the qualified context it was found in, formatted as
//! `[Namespace.Decl.field]: message`.

use std::collections::HashMap;

use crate::{
    error::SchemaError,
    ir::{
        DeclRef, EnumDecl, EnumMember, FloatType, IntType, Namespace, QualifiedName, RootInfo,
        StructDecl, StructField, StructFieldType, TableDecl, TableField, TableFieldType, UnionDecl,
        UnionMember, ValidatedSchema, VectorElement,
    },
    types::{
        Decl, EnumDef, FieldDef, FileIdentifierDecl, Literal, QualifiedRef, RootTypeDecl, Schema,
        StructDef, TableDef, TypeRef, UnionDef,
    },
    utils::quote,
};

/// A rose tree of parsed schemas: the main file at the root, its includes
/// (and theirs, recursively) as children.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaTree {
    pub schema:   Schema,
    pub includes: Vec<SchemaTree>,
}

impl SchemaTree {
    pub fn new(schema: Schema) -> SchemaTree {
        SchemaTree {
            schema,
            includes: Vec::new(),
        }
    }

    pub fn with_includes(schema: Schema, includes: Vec<SchemaTree>) -> SchemaTree {
        SchemaTree { schema, includes }
    }
}

/// Validates every declaration in the tree and produces the IR.
pub fn analyze_schema(tree: &SchemaTree) -> Result<ValidatedSchema, SchemaError> {
    let mut analyzer = Analyzer::default();
    analyzer.flatten(tree)?;
    analyzer.run()
}

#[derive(Copy, Clone)]
enum RawDecl<'a> {
    Enum(&'a EnumDef),
    Struct(&'a StructDef),
    Table(&'a TableDef),
    Union(&'a UnionDef),
}

#[derive(Clone)]
struct Entry<'a> {
    decl: RawDecl<'a>,
}

enum StructState {
    InProgress,
    Done(usize),
}

#[derive(Default)]
struct Analyzer<'a> {
    registry: HashMap<QualifiedName, Entry<'a>>,
    order:    Vec<QualifiedName>,
    roots:    Vec<(Namespace, &'a RootTypeDecl)>,
    file_identifiers: Vec<&'a FileIdentifierDecl>,
    context:  Vec<String>,

    enums:        Vec<EnumDecl>,
    enum_index:   HashMap<QualifiedName, usize>,
    structs:      Vec<StructDecl>,
    struct_state: HashMap<QualifiedName, StructState>,
    struct_stack: Vec<QualifiedName>,
    tables:       Vec<TableDecl>,
    unions:       Vec<UnionDecl>,
}

// `alignment` is always a power of two here.
fn round_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

fn int_type(type_: &TypeRef) -> Option<IntType> {
    match type_ {
        TypeRef::Byte => Some(IntType::I8),
        TypeRef::UByte => Some(IntType::U8),
        TypeRef::Short => Some(IntType::I16),
        TypeRef::UShort => Some(IntType::U16),
        TypeRef::Int => Some(IntType::I32),
        TypeRef::UInt => Some(IntType::U32),
        TypeRef::Long => Some(IntType::I64),
        TypeRef::ULong => Some(IntType::U64),
        _ => None,
    }
}

impl<'a> Analyzer<'a> {
    /// Pairs every declaration in the tree with its effective namespace:
    /// the one set by the most recent `namespace` directive in its file.
    fn flatten(&mut self, tree: &'a SchemaTree) -> Result<(), SchemaError> {
        let mut namespace = Namespace::default();
        for decl in &tree.schema.decls {
            match decl {
                Decl::Namespace(directive) => {
                    namespace = Namespace(directive.parts.clone());
                }
                Decl::Enum(def) => {
                    self.register(&namespace, &def.name, RawDecl::Enum(def))?;
                }
                Decl::Struct(def) => {
                    self.register(&namespace, &def.name, RawDecl::Struct(def))?;
                }
                Decl::Table(def) => {
                    self.register(&namespace, &def.name, RawDecl::Table(def))?;
                }
                Decl::Union(def) => {
                    self.register(&namespace, &def.name, RawDecl::Union(def))?;
                }
                Decl::RootType(root) => {
                    self.roots.push((namespace.clone(), root));
                }
                Decl::FileIdentifier(identifier) => {
                    self.file_identifiers.push(identifier);
                }
                // User-declared attributes are passed through untouched.
                Decl::Attribute(_) => {}
            }
        }
        for include in &tree.includes {
            self.flatten(include)?;
        }
        Ok(())
    }

    fn register(&mut self, namespace: &Namespace, name: &str, decl: RawDecl<'a>) -> Result<(), SchemaError> {
        let qualified = QualifiedName {
            namespace: namespace.clone(),
            ident:     name.to_owned(),
        };
        if self.registry.contains_key(&qualified) {
            self.context = vec![qualified.to_string()];
            return Err(self.err("declared more than once"));
        }
        self.order.push(qualified.clone());
        self.registry.insert(qualified, Entry { decl });
        Ok(())
    }

    fn err(&self, message: impl AsRef<str>) -> SchemaError {
        SchemaError::Validation(format!("[{}]: {}", self.context.join("."), message.as_ref()))
    }

    /// Resolves a possibly-qualified reference seen inside `current` by
    /// walking the namespace hierarchy upwards: the innermost candidate
    /// namespace wins, the root namespace is tried last.
    fn resolve(&self, current: &Namespace, reference: &QualifiedRef) -> Result<(QualifiedName, RawDecl<'a>), SchemaError> {
        let (namespace_parts, ident) = reference.parts.split_at(reference.parts.len() - 1);
        let mut checked = Vec::new();
        for prefix_len in (0..=current.0.len()).rev() {
            let mut candidate = current.0[..prefix_len].to_vec();
            candidate.extend(namespace_parts.iter().cloned());
            let qualified = QualifiedName {
                namespace: Namespace(candidate),
                ident:     ident[0].clone(),
            };
            if let Some(entry) = self.registry.get(&qualified) {
                return Ok((qualified, entry.decl));
            }
            checked.push(format!("'{}'", qualified.namespace));
        }
        Err(self.err(format!(
            "type '{}' does not exist (checked in these namespaces: {})",
            reference,
            checked.join(", ")
        )))
    }

    fn run(mut self) -> Result<ValidatedSchema, SchemaError> {
        let order = self.order.clone();

        for qualified in &order {
            let decl = self.registry[qualified].decl;
            if let RawDecl::Enum(def) = decl {
                let validated = self.validate_enum(qualified, def)?;
                self.enum_index.insert(qualified.clone(), self.enums.len());
                self.enums.push(validated);
            }
        }
        for qualified in &order {
            let decl = self.registry[qualified].decl;
            if let RawDecl::Struct(def) = decl {
                self.validated_struct(qualified, def)?;
            }
        }
        for qualified in &order {
            let decl = self.registry[qualified].decl;
            if let RawDecl::Union(def) = decl {
                let validated = self.validate_union(qualified, def)?;
                self.unions.push(validated);
            }
        }
        for qualified in &order {
            let decl = self.registry[qualified].decl;
            if let RawDecl::Table(def) = decl {
                let validated = self.validate_table(qualified, def)?;
                self.tables.push(validated);
            }
        }
        let root = self.validate_root()?;

        let mut symbols = HashMap::new();
        for (index, decl) in self.enums.iter().enumerate() {
            symbols.insert(decl.name.to_string(), DeclRef::Enum(index));
        }
        for (index, decl) in self.structs.iter().enumerate() {
            symbols.insert(decl.name.to_string(), DeclRef::Struct(index));
        }
        for (index, decl) in self.tables.iter().enumerate() {
            symbols.insert(decl.name.to_string(), DeclRef::Table(index));
        }
        for (index, decl) in self.unions.iter().enumerate() {
            symbols.insert(decl.name.to_string(), DeclRef::Union(index));
        }

        Ok(ValidatedSchema {
            enums:   self.enums,
            structs: self.structs,
            tables:  self.tables,
            unions:  self.unions,
            root,
            symbols,
        })
    }

    fn validate_enum(&mut self, qualified: &QualifiedName, def: &'a EnumDef) -> Result<EnumDecl, SchemaError> {
        self.context = vec![qualified.to_string()];
        if def.metadata.contains("bit_flags") {
            return Err(self.err("`bit_flags` are not supported yet"));
        }
        let underlying = match int_type(&def.underlying) {
            Some(underlying) => underlying,
            None => return Err(self.err("underlying enum type must be integral")),
        };
        if def.members.is_empty() {
            return Err(self.err("enums must have at least one member"));
        }

        let mut members: Vec<EnumMember> = Vec::with_capacity(def.members.len());
        let mut previous: Option<i128> = None;
        for member in &def.members {
            self.context = vec![qualified.to_string(), member.name.clone()];
            if members.iter().any(|existing| existing.ident == member.name) {
                return Err(self.err("declared more than once"));
            }
            // Missing values continue from the previous member, starting
            // at 0.
            let value = match member.value {
                Some(value) => value,
                None => previous.map_or(0, |previous| previous + 1),
            };
            if let Some(previous) = previous {
                if value <= previous {
                    return Err(self.err("enum values must be specified in ascending order"));
                }
            }
            if !underlying.fits(value) {
                let (min, max) = underlying.bounds();
                return Err(self.err(format!("enum value does not fit [{}; {}]", min, max)));
            }
            members.push(EnumMember {
                ident: member.name.clone(),
                value,
            });
            previous = Some(value);
        }

        Ok(EnumDecl {
            name: qualified.clone(),
            underlying,
            members,
        })
    }

    /// Validates a struct once and memoizes the result. A lookup that finds
    /// the struct already in progress has followed a reference cycle.
    fn validated_struct(&mut self, qualified: &QualifiedName, def: &'a StructDef) -> Result<usize, SchemaError> {
        match self.struct_state.get(qualified) {
            Some(StructState::Done(index)) => return Ok(*index),
            Some(StructState::InProgress) => {
                let start = self
                    .struct_stack
                    .iter()
                    .position(|name| name == qualified)
                    .unwrap_or(0);
                let mut chain: Vec<&str> = self.struct_stack[start..]
                    .iter()
                    .map(|name| name.ident.as_str())
                    .collect();
                chain.push(qualified.ident.as_str());
                return Err(self.err(format!(
                    "cyclic dependency detected [{}] - structs cannot contain themselves, directly or indirectly",
                    chain.join(" -> ")
                )));
            }
            None => {}
        }

        self.struct_state.insert(qualified.clone(), StructState::InProgress);
        self.struct_stack.push(qualified.clone());
        let validated = self.validate_struct(qualified, def)?;
        self.struct_stack.pop();

        let index = self.structs.len();
        self.structs.push(validated);
        self.struct_state.insert(qualified.clone(), StructState::Done(index));
        Ok(index)
    }

    fn validate_struct(&mut self, qualified: &QualifiedName, def: &'a StructDef) -> Result<StructDecl, SchemaError> {
        self.context = vec![qualified.to_string()];
        if def.fields.is_empty() {
            return Err(self.err("structs must have at least one field"));
        }

        let mut resolved: Vec<(String, StructFieldType, usize, usize)> = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            self.context = vec![qualified.to_string(), field.name.clone()];
            if resolved.iter().any(|(ident, ..)| ident == &field.name) {
                return Err(self.err("declared more than once"));
            }
            if field.metadata.contains("deprecated") {
                return Err(self.err("can't deprecate fields in a struct"));
            }
            if field.default.is_some() {
                return Err(self.err("struct fields may not have default values"));
            }

            let (type_, size, align) = match &field.type_ {
                TypeRef::Bool => (StructFieldType::Bool, 1, 1),
                TypeRef::Float => (StructFieldType::Float(FloatType::F32), 4, 4),
                TypeRef::Double => (StructFieldType::Float(FloatType::F64), 8, 8),
                TypeRef::Str | TypeRef::Vector(_) => {
                    return Err(self.err(
                        "struct fields may only be integers, floating point, bool, enums, or other structs",
                    ));
                }
                TypeRef::Named(reference) => {
                    let (target, decl) = self.resolve(&qualified.namespace, reference)?;
                    match decl {
                        RawDecl::Enum(_) => {
                            let underlying = self.enums[self.enum_index[&target]].underlying;
                            let size = underlying.size();
                            (StructFieldType::Enum(target), size, size)
                        }
                        RawDecl::Struct(nested) => {
                            let index = self.validated_struct(&target, nested)?;
                            self.context = vec![qualified.to_string(), field.name.clone()];
                            let nested = &self.structs[index];
                            (StructFieldType::Struct(target), nested.size, nested.alignment)
                        }
                        RawDecl::Table(_) | RawDecl::Union(_) => {
                            return Err(self.err(
                                "struct fields may only be integers, floating point, bool, enums, or other structs",
                            ));
                        }
                    }
                }
                integral => {
                    // All remaining cases are the integral scalars.
                    let underlying = int_type(integral).expect("non-integral scalar unhandled");
                    let size = underlying.size();
                    (StructFieldType::Int(underlying), size, size)
                }
            };
            resolved.push((field.name.clone(), type_, size, align));
        }

        self.context = vec![qualified.to_string()];
        let natural = resolved.iter().map(|(_, _, _, align)| *align).max().unwrap_or(1);
        let alignment = match def.metadata.value_of("force_align") {
            Some(Literal::Int(value)) => {
                let value = *value;
                if value <= 0 || (value & (value - 1)) != 0 {
                    return Err(self.err("force_align must be a power of two"));
                }
                let value = value as usize;
                if value < natural {
                    return Err(self.err(format!(
                        "force_align cannot be smaller than the struct's natural alignment ({})",
                        natural
                    )));
                }
                if value > 16 {
                    return Err(self.err("force_align cannot be larger than 16"));
                }
                value
            }
            Some(_) => return Err(self.err("force_align must be an integer")),
            None if def.metadata.contains("force_align") => {
                return Err(self.err("force_align must be an integer"));
            }
            None => natural,
        };

        // Lay the fields out: each at its naturally aligned offset, the
        // whole record padded to the struct alignment.
        let mut offsets = Vec::with_capacity(resolved.len());
        let mut offset = 0;
        for (_, _, size, align) in &resolved {
            offset = round_up(offset, *align);
            offsets.push(offset);
            offset += size;
        }
        let size = round_up(offset, alignment);

        let mut fields = Vec::with_capacity(resolved.len());
        for (index, (ident, type_, field_size, _)) in resolved.into_iter().enumerate() {
            let end = offsets[index] + field_size;
            let next = offsets.get(index + 1).copied().unwrap_or(size);
            fields.push(StructField {
                ident,
                offset: offsets[index],
                padding: next - end,
                type_,
            });
        }

        Ok(StructDecl {
            name: qualified.clone(),
            alignment,
            size,
            fields,
        })
    }

    fn validate_union(&mut self, qualified: &QualifiedName, def: &'a UnionDef) -> Result<UnionDecl, SchemaError> {
        self.context = vec![qualified.to_string()];
        if def.members.is_empty() {
            return Err(self.err("unions must have at least one member"));
        }
        let mut members: Vec<UnionMember> = Vec::with_capacity(def.members.len());
        for reference in &def.members {
            self.context = vec![qualified.to_string(), reference.to_string()];
            let (target, decl) = self.resolve(&qualified.namespace, reference)?;
            match decl {
                RawDecl::Table(_) => {}
                _ => return Err(self.err("union members may only be tables")),
            }
            if members.iter().any(|member| member.ident == target.ident) {
                return Err(self.err("declared more than once"));
            }
            members.push(UnionMember {
                ident: target.ident.clone(),
                table: target,
            });
        }
        Ok(UnionDecl {
            name: qualified.clone(),
            members,
        })
    }

    fn validate_table(&mut self, qualified: &QualifiedName, def: &'a TableDef) -> Result<TableDecl, SchemaError> {
        self.context = vec![qualified.to_string()];

        let mut built: Vec<(&'a FieldDef, TableFieldType)> = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            self.context = vec![qualified.to_string(), field.name.clone()];
            if built.iter().any(|(existing, _)| existing.name == field.name) {
                return Err(self.err("declared more than once"));
            }
            let type_ = self.table_field_type(qualified, field)?;
            built.push((field, type_));
        }

        let with_ids = def.fields.iter().filter(|field| field.metadata.contains("id")).count();
        let slots: Vec<u16> = if with_ids == 0 {
            let mut slots = Vec::with_capacity(built.len());
            let mut next = 0u16;
            for (_, type_) in &built {
                slots.push(next);
                next += type_.slot_count();
            }
            slots
        } else if with_ids == built.len() {
            self.assign_slots_from_ids(qualified, &built)?
        } else {
            self.context = vec![qualified.to_string()];
            return Err(self.err("either all fields or no fields must have an 'id' attribute"));
        };

        let fields = built
            .into_iter()
            .zip(slots)
            .map(|((field, type_), slot)| TableField {
                ident:      field.name.clone(),
                slot,
                type_,
                deprecated: field.metadata.contains("deprecated"),
            })
            .collect();

        Ok(TableDecl {
            name: qualified.clone(),
            fields,
        })
    }

    /// Explicit ids must cover the slot space exactly. An id names a
    /// field's last slot, so a union field (two slots) must leave a gap of
    /// one after its predecessor.
    fn assign_slots_from_ids(&mut self, qualified: &QualifiedName, built: &[(&'a FieldDef, TableFieldType)]) -> Result<Vec<u16>, SchemaError> {
        let mut ids = Vec::with_capacity(built.len());
        for (field, type_) in built {
            self.context = vec![qualified.to_string(), field.name.clone()];
            let id = match field.metadata.value_of("id") {
                Some(Literal::Int(id)) if *id >= 0 => *id as u16,
                _ => return Err(self.err("the 'id' attribute must be a non-negative integer")),
            };
            ids.push((id, type_.slot_count()));
        }

        let mut by_id: Vec<(usize, u16, u16)> = ids
            .iter()
            .enumerate()
            .map(|(index, (id, slot_count))| (index, *id, *slot_count))
            .collect();
        by_id.sort_by_key(|(_, id, _)| *id);

        let mut slots = vec![0u16; built.len()];
        let mut next = 0u16;
        for (index, id, slot_count) in by_id {
            let expected = next + slot_count - 1;
            if id != expected {
                self.context = vec![qualified.to_string(), built[index].0.name.clone()];
                return Err(self.err(format!("expected id {}, but found id {}", expected, id)));
            }
            slots[index] = next;
            next += slot_count;
        }
        Ok(slots)
    }

    fn table_field_type(&mut self, qualified: &QualifiedName, field: &'a FieldDef) -> Result<TableFieldType, SchemaError> {
        let required = field.metadata.contains("required");
        let scalar_required_err =
            "only non-scalar fields (strings, vectors, unions, structs, tables) may be 'required'";
        let non_scalar_default_err =
            "default values are only supported for scalar fields (integers, floating point, bool, enums)";

        match &field.type_ {
            TypeRef::Bool => {
                if required {
                    return Err(self.err(scalar_required_err));
                }
                let default = match &field.default {
                    None => false,
                    Some(Literal::Bool(value)) => *value,
                    Some(_) => return Err(self.err("default value must be a boolean")),
                };
                Ok(TableFieldType::Bool { default })
            }
            TypeRef::Float | TypeRef::Double => {
                if required {
                    return Err(self.err(scalar_required_err));
                }
                let type_ = if field.type_ == TypeRef::Float {
                    FloatType::F32
                } else {
                    FloatType::F64
                };
                let default = match &field.default {
                    None => 0.0,
                    Some(Literal::Float(value)) => *value,
                    Some(Literal::Int(value)) => *value as f64,
                    Some(_) => return Err(self.err("default value must be a number")),
                };
                Ok(TableFieldType::Float { type_, default })
            }
            TypeRef::Str => {
                if field.default.is_some() {
                    return Err(self.err(non_scalar_default_err));
                }
                Ok(TableFieldType::Str { required })
            }
            TypeRef::Vector(element) => {
                if field.default.is_some() {
                    return Err(self.err(non_scalar_default_err));
                }
                let element = self.vector_element(qualified, element)?;
                Ok(TableFieldType::Vector { element, required })
            }
            TypeRef::Named(reference) => {
                let (target, decl) = self.resolve(&qualified.namespace, reference)?;
                match decl {
                    RawDecl::Enum(_) => {
                        if required {
                            return Err(self.err(scalar_required_err));
                        }
                        let underlying = self.enums[self.enum_index[&target]].underlying;
                        let default = self.enum_default(&target, field)?;
                        Ok(TableFieldType::Enum {
                            name: target,
                            underlying,
                            default,
                        })
                    }
                    RawDecl::Struct(_) => {
                        if field.default.is_some() {
                            return Err(self.err(non_scalar_default_err));
                        }
                        Ok(TableFieldType::Struct { name: target, required })
                    }
                    RawDecl::Table(_) => {
                        if field.default.is_some() {
                            return Err(self.err(non_scalar_default_err));
                        }
                        Ok(TableFieldType::Table { name: target, required })
                    }
                    RawDecl::Union(_) => {
                        if field.default.is_some() {
                            return Err(self.err(non_scalar_default_err));
                        }
                        Ok(TableFieldType::Union { name: target, required })
                    }
                }
            }
            integral => {
                if required {
                    return Err(self.err(scalar_required_err));
                }
                let type_ = int_type(integral).expect("non-integral scalar unhandled");
                let default = match &field.default {
                    None => 0,
                    Some(Literal::Int(value)) => {
                        if !type_.fits(*value) {
                            let (min, max) = type_.bounds();
                            return Err(self.err(format!("default value does not fit [{}; {}]", min, max)));
                        }
                        *value
                    }
                    Some(_) => return Err(self.err("default value must be an integer")),
                };
                Ok(TableFieldType::Int { type_, default })
            }
        }
    }

    fn vector_element(&mut self, qualified: &QualifiedName, element: &TypeRef) -> Result<VectorElement, SchemaError> {
        match element {
            TypeRef::Bool => Ok(VectorElement::Bool),
            TypeRef::Float => Ok(VectorElement::Float(FloatType::F32)),
            TypeRef::Double => Ok(VectorElement::Float(FloatType::F64)),
            TypeRef::Str => Ok(VectorElement::Str),
            TypeRef::Vector(_) => Err(self.err("nested vectors are not supported")),
            TypeRef::Named(reference) => {
                let (target, decl) = self.resolve(&qualified.namespace, reference)?;
                Ok(match decl {
                    RawDecl::Enum(_) => VectorElement::Enum(target),
                    RawDecl::Struct(_) => VectorElement::Struct(target),
                    RawDecl::Table(_) => VectorElement::Table(target),
                    RawDecl::Union(_) => VectorElement::Union(target),
                })
            }
            integral => Ok(VectorElement::Int(
                int_type(integral).expect("non-integral scalar unhandled"),
            )),
        }
    }

    /// The wire default of an enum field: the declared member named (or
    /// valued) by the explicit default, or the 0 member when none is given.
    fn enum_default(&self, target: &QualifiedName, field: &'a FieldDef) -> Result<i128, SchemaError> {
        let decl = &self.enums[self.enum_index[target]];
        match &field.default {
            None => decl.member_with_value(0).map(|member| member.value).ok_or_else(|| {
                self.err(format!(
                    "enum {} has no member with value 0; an explicit default is required",
                    quote(&target.ident)
                ))
            }),
            Some(Literal::Ref(name)) => decl.member_named(name).map(|member| member.value).ok_or_else(|| {
                self.err(format!(
                    "default value {} is not a member of enum {}",
                    quote(name),
                    quote(&target.ident)
                ))
            }),
            Some(Literal::Int(value)) => decl.member_with_value(*value).map(|member| member.value).ok_or_else(|| {
                self.err(format!(
                    "default value {} is not a member of enum {}",
                    value,
                    quote(&target.ident)
                ))
            }),
            Some(_) => Err(self.err("enum default values must be an integer or a member name")),
        }
    }

    fn validate_root(&mut self) -> Result<Option<RootInfo>, SchemaError> {
        if self.roots.len() > 1 {
            self.context = vec!["root_type".to_owned()];
            return Err(self.err("declared more than once"));
        }
        let (namespace, root) = match self.roots.first() {
            Some((namespace, root)) => (namespace.clone(), *root),
            None => {
                if !self.file_identifiers.is_empty() {
                    self.context = vec!["file_identifier".to_owned()];
                    return Err(self.err("file_identifier requires a root_type"));
                }
                return Ok(None);
            }
        };

        self.context = vec!["root_type".to_owned()];
        let (target, decl) = self.resolve(&namespace, &root.type_)?;
        match decl {
            RawDecl::Table(_) => {}
            _ => return Err(self.err("root type must be a table")),
        }

        let file_identifier = match self.file_identifiers.as_slice() {
            [] => None,
            [identifier] => {
                self.context = vec!["file_identifier".to_owned()];
                if identifier.value.len() != 4 || !identifier.value.is_ascii() {
                    return Err(self.err("file_identifier must be exactly 4 ASCII characters"));
                }
                Some(identifier.value.clone())
            }
            _ => {
                self.context = vec!["file_identifier".to_owned()];
                return Err(self.err("declared more than once"));
            }
        };

        Ok(Some(RootInfo {
            table: target,
            file_identifier,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema;
    use crate::tokenizer::tokenize_schema;

    fn analyze(text: &str) -> Result<ValidatedSchema, SchemaError> {
        let tokens = tokenize_schema(text).expect("tokenize_schema failed");
        let schema = parse_schema(&tokens).expect("parse_schema failed");
        analyze_schema(&SchemaTree::new(schema))
    }

    fn validation_message(result: Result<ValidatedSchema, SchemaError>) -> String {
        match result {
            Err(SchemaError::Validation(message)) => message,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn enum_values_are_auto_assigned() {
        let schema = analyze("enum Color : byte { Red, Green, Blue }").unwrap();
        let colors = &schema.enums[0];
        assert_eq!(colors.underlying, IntType::I8);
        let values: Vec<i128> = colors.members.iter().map(|member| member.value).collect();
        assert_eq!(values, [0, 1, 2]);
    }

    #[test]
    fn enum_values_continue_after_explicit_ones() {
        let schema = analyze("enum E : short { A = 5, B, C = 10, D }").unwrap();
        let values: Vec<i128> = schema.enums[0].members.iter().map(|member| member.value).collect();
        assert_eq!(values, [5, 6, 10, 11]);
    }

    #[test]
    fn enum_values_must_ascend() {
        let message = validation_message(analyze("enum E : byte { A = 3, B = 2 }"));
        assert_eq!(message, "[E.B]: enum values must be specified in ascending order");
    }

    #[test]
    fn enum_values_must_fit_the_underlying_type() {
        let message = validation_message(analyze("enum E : byte { A = 200 }"));
        assert_eq!(message, "[E.A]: enum value does not fit [-128; 127]");
    }

    #[test]
    fn enum_bit_flags_are_rejected() {
        let message = validation_message(analyze("enum E : ubyte (bit_flags) { A }"));
        assert_eq!(message, "[E]: `bit_flags` are not supported yet");
    }

    #[test]
    fn enum_underlying_type_must_be_integral() {
        let message = validation_message(analyze("enum E : float { A }"));
        assert_eq!(message, "[E]: underlying enum type must be integral");
    }

    #[test]
    fn cyclic_structs_are_rejected() {
        let message = validation_message(analyze("struct A { b: B; } struct B { a: A; }"));
        assert_eq!(
            message,
            "[B.a]: cyclic dependency detected [A -> B -> A] - structs cannot contain themselves, directly or indirectly"
        );
    }

    #[test]
    fn self_referencing_struct_is_rejected() {
        let message = validation_message(analyze("struct A { a: A; }"));
        assert!(message.contains("cyclic dependency detected [A -> A]"));
    }

    #[test]
    fn struct_layout_is_computed() {
        let schema = analyze(
            "struct Align1 { x: int; } \
             struct Align2 { x: Align1; y: long; z: float; }",
        )
        .unwrap();
        let align2 = schema.struct_named("Align2").unwrap();
        assert_eq!(align2.alignment, 8);
        assert_eq!(align2.size, 24);
        let offsets: Vec<usize> = align2.fields.iter().map(|field| field.offset).collect();
        assert_eq!(offsets, [0, 8, 16]);
        let paddings: Vec<usize> = align2.fields.iter().map(|field| field.padding).collect();
        assert_eq!(paddings, [4, 0, 4]);
    }

    #[test]
    fn force_align_widens_a_struct() {
        let schema = analyze("struct V (force_align: 16) { x: float; y: float; z: float; }").unwrap();
        assert_eq!(schema.structs[0].alignment, 16);
        assert_eq!(schema.structs[0].size, 16);
    }

    #[test]
    fn force_align_below_natural_alignment_is_rejected() {
        let message = validation_message(analyze("struct S (force_align: 2) { x: long; }"));
        assert_eq!(
            message,
            "[S]: force_align cannot be smaller than the struct's natural alignment (8)"
        );
    }

    #[test]
    fn force_align_must_be_a_power_of_two() {
        let message = validation_message(analyze("struct S (force_align: 6) { x: int; }"));
        assert_eq!(message, "[S]: force_align must be a power of two");
    }

    #[test]
    fn strings_are_rejected_in_structs() {
        let message = validation_message(analyze("struct S { x: string; }"));
        assert_eq!(
            message,
            "[S.x]: struct fields may only be integers, floating point, bool, enums, or other structs"
        );
    }

    #[test]
    fn deprecated_struct_fields_are_rejected() {
        let message = validation_message(analyze("struct S { x: int (deprecated); }"));
        assert_eq!(message, "[S.x]: can't deprecate fields in a struct");
    }

    #[test]
    fn unknown_types_report_the_namespaces_checked() {
        let message = validation_message(analyze(
            "namespace Game.Deep; table T { x: Missing; }",
        ));
        assert_eq!(
            message,
            "[Game.Deep.T.x]: type 'Missing' does not exist (checked in these namespaces: 'Game.Deep', 'Game', '')"
        );
    }

    #[test]
    fn references_walk_the_namespace_hierarchy_up() {
        let schema = analyze(
            "namespace Game; table Item { x: int; } \
             namespace Game.Deep; table Chest { loot: Item; }",
        )
        .unwrap();
        let chest = schema.table_named("Game.Deep.Chest").unwrap();
        match &chest.fields[0].type_ {
            TableFieldType::Table { name, .. } => assert_eq!(name.to_string(), "Game.Item"),
            other => panic!("expected a table field, got {:?}", other),
        }
    }

    #[test]
    fn inner_namespaces_shadow_outer_ones() {
        let schema = analyze(
            "namespace Game; table Item { x: int; } \
             namespace Game.Deep; table Item { y: int; } table Chest { loot: Item; }",
        )
        .unwrap();
        let chest = schema.table_named("Game.Deep.Chest").unwrap();
        match &chest.fields[0].type_ {
            TableFieldType::Table { name, .. } => assert_eq!(name.to_string(), "Game.Deep.Item"),
            other => panic!("expected a table field, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let message = validation_message(analyze("table T { x: int; } table T { y: int; }"));
        assert_eq!(message, "[T]: declared more than once");
    }

    #[test]
    fn required_is_rejected_on_scalars() {
        let message = validation_message(analyze("table T { x: int (required); }"));
        assert_eq!(
            message,
            "[T.x]: only non-scalar fields (strings, vectors, unions, structs, tables) may be 'required'"
        );
    }

    #[test]
    fn scalar_defaults_are_checked_against_their_type() {
        let message = validation_message(analyze("table T { x: byte = 1000; }"));
        assert_eq!(message, "[T.x]: default value does not fit [-128; 127]");
    }

    #[test]
    fn enum_defaults_must_name_a_member() {
        let schema = "enum Color : byte { Red, Green, Blue } table T { c: Color = Blue; }";
        let validated = analyze(schema).unwrap();
        match &validated.tables[0].fields[0].type_ {
            TableFieldType::Enum { default, .. } => assert_eq!(*default, 2),
            other => panic!("expected an enum field, got {:?}", other),
        }

        let message = validation_message(analyze(
            "enum Color : byte { Red, Green, Blue } table T { c: Color = Purple; }",
        ));
        assert_eq!(message, "[T.c]: default value \"Purple\" is not a member of enum \"Color\"");
    }

    #[test]
    fn enums_without_a_zero_member_need_an_explicit_default() {
        let message = validation_message(analyze(
            "enum Color : byte { Red = 1 } table T { c: Color; }",
        ));
        assert_eq!(
            message,
            "[T.c]: enum \"Color\" has no member with value 0; an explicit default is required"
        );
    }

    #[test]
    fn union_members_must_be_tables() {
        let message = validation_message(analyze(
            "struct S { x: int; } union U { S }",
        ));
        assert_eq!(message, "[U.S]: union members may only be tables");
    }

    #[test]
    fn union_fields_take_two_slots() {
        let schema = analyze(
            "table Sword { x: int; } table Axe { x: int; } union Weapon { Sword, Axe } \
             table Hero { weapon: Weapon; hp: int; }",
        )
        .unwrap();
        let hero = schema.table_named("Hero").unwrap();
        assert_eq!(hero.fields[0].slot, 0);
        assert_eq!(hero.fields[0].type_.slot_count(), 2);
        assert_eq!(hero.fields[1].slot, 2);
    }

    #[test]
    fn explicit_ids_must_cover_the_slot_space() {
        let schema = analyze(
            "table Sword { x: int; } union Weapon { Sword } \
             table Hero { weapon: Weapon (id: 1); hp: int (id: 2); }",
        )
        .unwrap();
        let hero = schema.table_named("Hero").unwrap();
        assert_eq!(hero.fields[0].slot, 0);
        assert_eq!(hero.fields[1].slot, 2);

        let message = validation_message(analyze(
            "table T { x: int (id: 1); y: int (id: 2); }",
        ));
        assert_eq!(message, "[T.x]: expected id 0, but found id 1");
    }

    #[test]
    fn partial_ids_are_rejected() {
        let message = validation_message(analyze("table T { x: int (id: 0); y: int; }"));
        assert_eq!(message, "[T]: either all fields or no fields must have an 'id' attribute");
    }

    #[test]
    fn nested_vectors_are_rejected() {
        let message = validation_message(analyze("table T { x: [[int]]; }"));
        assert_eq!(message, "[T.x]: nested vectors are not supported");
    }

    #[test]
    fn root_type_must_be_a_table() {
        let message = validation_message(analyze("struct S { x: int; } root_type S;"));
        assert_eq!(message, "[root_type]: root type must be a table");
    }

    #[test]
    fn file_identifier_must_be_four_characters() {
        let message = validation_message(analyze(
            "table T { x: int; } root_type T; file_identifier \"TOOLONG\";",
        ));
        assert_eq!(message, "[file_identifier]: file_identifier must be exactly 4 ASCII characters");
    }

    #[test]
    fn root_info_is_collected() {
        let schema = analyze(
            "namespace Game; table Monster { hp: int; } root_type Monster; file_identifier \"MONS\";",
        )
        .unwrap();
        let root = schema.root.unwrap();
        assert_eq!(root.table.to_string(), "Game.Monster");
        assert_eq!(root.file_identifier.as_deref(), Some("MONS"));
    }

    #[test]
    fn includes_contribute_declarations() {
        let tokens = tokenize_schema("include \"items.fbs\"; table Hero { sword: Item; }").unwrap();
        let main = parse_schema(&tokens).unwrap();
        let tokens = tokenize_schema("table Item { power: int; }").unwrap();
        let included = parse_schema(&tokens).unwrap();

        let tree = SchemaTree::with_includes(main, vec![SchemaTree::new(included)]);
        let schema = analyze_schema(&tree).unwrap();
        assert!(schema.table_named("Item").is_some());
        assert!(schema.table_named("Hero").is_some());
    }
}
