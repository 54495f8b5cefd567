use crate::{
    error::SchemaError,
    tokenizer::Token,
    types::{
        AttributeDecl, Decl, EnumDef, EnumMemberDef, FieldDef, FileIdentifierDecl, IncludeDecl,
        Literal, Metadata, MetadataEntry, NamespaceDecl, QualifiedRef, RootTypeDecl, Schema,
        StructDef, TableDef, TypeRef, UnionDef,
    },
    utils::{parse_error, quote},
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER:      Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref INTEGER:         Regex = Regex::new(r"^-?\d+$").unwrap();
    static ref FLOAT:           Regex = Regex::new(r"^-?\d+\.\d+(?:[eE][-+]?\d+)?$").unwrap();
    static ref STRING_LITERAL:  Regex = Regex::new(r#"^"[^"\n]*"$"#).unwrap();
    static ref EQUALS:          Regex = Regex::new(r"^=$").unwrap();
    static ref COLON:           Regex = Regex::new(r"^:$").unwrap();
    static ref SEMICOLON:       Regex = Regex::new(r"^;$").unwrap();
    static ref COMMA:           Regex = Regex::new(r"^,$").unwrap();
    static ref DOT:             Regex = Regex::new(r"^\.$").unwrap();
    static ref LEFT_BRACE:      Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:     Regex = Regex::new(r"^\}$").unwrap();
    static ref LEFT_PAREN:      Regex = Regex::new(r"^\($").unwrap();
    static ref RIGHT_PAREN:     Regex = Regex::new(r"^\)$").unwrap();
    static ref LEFT_BRACKET:    Regex = Regex::new(r"^\[$").unwrap();
    static ref RIGHT_BRACKET:   Regex = Regex::new(r"^\]$").unwrap();
    static ref INCLUDE_KEYWORD: Regex = Regex::new(r"^include$").unwrap();
    static ref NAMESPACE_KEYWORD: Regex = Regex::new(r"^namespace$").unwrap();
    static ref TABLE_KEYWORD:   Regex = Regex::new(r"^table$").unwrap();
    static ref STRUCT_KEYWORD:  Regex = Regex::new(r"^struct$").unwrap();
    static ref ENUM_KEYWORD:    Regex = Regex::new(r"^enum$").unwrap();
    static ref UNION_KEYWORD:   Regex = Regex::new(r"^union$").unwrap();
    static ref ROOT_TYPE_KEYWORD: Regex = Regex::new(r"^root_type$").unwrap();
    static ref FILE_IDENTIFIER_KEYWORD: Regex = Regex::new(r"^file_identifier$").unwrap();
    static ref ATTRIBUTE_KEYWORD: Regex = Regex::new(r"^attribute$").unwrap();
    static ref EOF:             Regex = Regex::new(r"^$").unwrap();
}

fn current_token<'a>(tokens: &'a [Token], index: usize) -> &'a Token {
    // The tokenizer always appends an EOF token, so clamping to the last
    // token keeps us inside the stream on malformed input.
    tokens.get(index).unwrap_or_else(|| &tokens[tokens.len() - 1])
}

fn eat(tokens: &[Token], index: &mut usize, test: &Regex) -> bool {
    if test.is_match(&current_token(tokens, *index).text) {
        *index += 1;
        true
    } else {
        false
    }
}

fn expect(tokens: &[Token], index: &mut usize, test: &Regex, expected: &str) -> Result<(), SchemaError> {
    if !eat(tokens, index, test) {
        let tok = current_token(tokens, *index);
        return Err(parse_error(
            &format!("Expected {} but found {}", expected, quote(&tok.text)),
            tok.line,
            tok.column,
        ));
    }
    Ok(())
}

fn unexpected_token(tokens: &[Token], index: usize) -> SchemaError {
    let tok = current_token(tokens, index);
    parse_error(
        &format!("Unexpected token {}", quote(&tok.text)),
        tok.line,
        tok.column,
    )
}

fn parse_integer(tok: &Token) -> Result<i128, SchemaError> {
    tok.text.parse::<i128>().map_err(|_| {
        parse_error(
            &format!("Invalid integer {}", quote(&tok.text)),
            tok.line,
            tok.column,
        )
    })
}

fn parse_qualified_ref(tokens: &[Token], index: &mut usize) -> Result<QualifiedRef, SchemaError> {
    let mut parts = Vec::new();
    let first = current_token(tokens, *index).clone();
    expect(tokens, index, &IDENTIFIER, "identifier")?;
    parts.push(first.text);
    while eat(tokens, index, &DOT) {
        let part = current_token(tokens, *index).clone();
        expect(tokens, index, &IDENTIFIER, "identifier")?;
        parts.push(part.text);
    }
    Ok(QualifiedRef { parts })
}

fn parse_type(tokens: &[Token], index: &mut usize) -> Result<TypeRef, SchemaError> {
    if eat(tokens, index, &LEFT_BRACKET) {
        let element = parse_type(tokens, index)?;
        expect(tokens, index, &RIGHT_BRACKET, "\"]\"")?;
        return Ok(TypeRef::Vector(Box::new(element)));
    }
    let reference = parse_qualified_ref(tokens, index)?;
    if reference.parts.len() == 1 {
        let scalar = match reference.parts[0].as_str() {
            "bool" => Some(TypeRef::Bool),
            "byte" | "int8" => Some(TypeRef::Byte),
            "ubyte" | "uint8" => Some(TypeRef::UByte),
            "short" | "int16" => Some(TypeRef::Short),
            "ushort" | "uint16" => Some(TypeRef::UShort),
            "int" | "int32" => Some(TypeRef::Int),
            "uint" | "uint32" => Some(TypeRef::UInt),
            "long" | "int64" => Some(TypeRef::Long),
            "ulong" | "uint64" => Some(TypeRef::ULong),
            "float" | "float32" => Some(TypeRef::Float),
            "double" | "float64" => Some(TypeRef::Double),
            "string" => Some(TypeRef::Str),
            _ => None,
        };
        if let Some(scalar) = scalar {
            return Ok(scalar);
        }
    }
    Ok(TypeRef::Named(reference))
}

fn parse_literal(tokens: &[Token], index: &mut usize) -> Result<Literal, SchemaError> {
    let tok = current_token(tokens, *index).clone();
    if eat(tokens, index, &FLOAT) {
        return tok.text.parse::<f64>().map(Literal::Float).map_err(|_| {
            parse_error(
                &format!("Invalid number {}", quote(&tok.text)),
                tok.line,
                tok.column,
            )
        });
    }
    if eat(tokens, index, &INTEGER) {
        return Ok(Literal::Int(parse_integer(&tok)?));
    }
    if eat(tokens, index, &STRING_LITERAL) {
        return Ok(Literal::Str(tok.text[1..tok.text.len() - 1].to_string()));
    }
    if eat(tokens, index, &IDENTIFIER) {
        return Ok(match tok.text.as_str() {
            "true" => Literal::Bool(true),
            "false" => Literal::Bool(false),
            _ => Literal::Ref(tok.text),
        });
    }
    Err(unexpected_token(tokens, *index))
}

fn parse_metadata(tokens: &[Token], index: &mut usize) -> Result<Metadata, SchemaError> {
    let mut metadata = Metadata::default();
    if !eat(tokens, index, &LEFT_PAREN) {
        return Ok(metadata);
    }
    loop {
        if eat(tokens, index, &RIGHT_PAREN) {
            break;
        }
        let name_tok = current_token(tokens, *index).clone();
        expect(tokens, index, &IDENTIFIER, "identifier")?;
        let value = if eat(tokens, index, &COLON) {
            Some(parse_literal(tokens, index)?)
        } else {
            None
        };
        metadata.entries.push(MetadataEntry {
            name: name_tok.text,
            value,
        });
        if eat(tokens, index, &COMMA) {
            continue;
        }
        expect(tokens, index, &RIGHT_PAREN, "\")\"")?;
        break;
    }
    Ok(metadata)
}

fn parse_fields(tokens: &[Token], index: &mut usize) -> Result<Vec<FieldDef>, SchemaError> {
    expect(tokens, index, &LEFT_BRACE, "\"{\"")?;
    let mut fields = Vec::new();
    while !eat(tokens, index, &RIGHT_BRACE) {
        let name_tok = current_token(tokens, *index).clone();
        expect(tokens, index, &IDENTIFIER, "identifier")?;
        expect(tokens, index, &COLON, "\":\"")?;
        let type_ = parse_type(tokens, index)?;
        let default = if eat(tokens, index, &EQUALS) {
            Some(parse_literal(tokens, index)?)
        } else {
            None
        };
        let metadata = parse_metadata(tokens, index)?;
        expect(tokens, index, &SEMICOLON, "\";\"")?;
        fields.push(FieldDef {
            name:   name_tok.text,
            line:   name_tok.line,
            column: name_tok.column,
            type_,
            default,
            metadata,
        });
    }
    Ok(fields)
}

fn parse_enum_members(tokens: &[Token], index: &mut usize) -> Result<Vec<EnumMemberDef>, SchemaError> {
    expect(tokens, index, &LEFT_BRACE, "\"{\"")?;
    let mut members = Vec::new();
    loop {
        if eat(tokens, index, &RIGHT_BRACE) {
            break;
        }
        let name_tok = current_token(tokens, *index).clone();
        expect(tokens, index, &IDENTIFIER, "identifier")?;
        let value = if eat(tokens, index, &EQUALS) {
            let value_tok = current_token(tokens, *index).clone();
            expect(tokens, index, &INTEGER, "integer")?;
            Some(parse_integer(&value_tok)?)
        } else {
            None
        };
        members.push(EnumMemberDef {
            name:   name_tok.text,
            line:   name_tok.line,
            column: name_tok.column,
            value,
        });
        if eat(tokens, index, &COMMA) {
            continue;
        }
        expect(tokens, index, &RIGHT_BRACE, "\"}\"")?;
        break;
    }
    Ok(members)
}

fn parse_union_members(tokens: &[Token], index: &mut usize) -> Result<Vec<QualifiedRef>, SchemaError> {
    expect(tokens, index, &LEFT_BRACE, "\"{\"")?;
    let mut members = Vec::new();
    loop {
        if eat(tokens, index, &RIGHT_BRACE) {
            break;
        }
        members.push(parse_qualified_ref(tokens, index)?);
        if eat(tokens, index, &COMMA) {
            continue;
        }
        expect(tokens, index, &RIGHT_BRACE, "\"}\"")?;
        break;
    }
    Ok(members)
}

/// Parses a token stream into the raw syntax tree of one schema file.
pub fn parse_schema(tokens: &[Token]) -> Result<Schema, SchemaError> {
    let mut includes = Vec::new();
    let mut decls = Vec::new();
    let mut index = 0;

    while index < tokens.len() && !eat(tokens, &mut index, &EOF) {
        let keyword_tok = current_token(tokens, index).clone();

        if eat(tokens, &mut index, &INCLUDE_KEYWORD) {
            let path_tok = current_token(tokens, index).clone();
            expect(tokens, &mut index, &STRING_LITERAL, "file name")?;
            expect(tokens, &mut index, &SEMICOLON, "\";\"")?;
            includes.push(IncludeDecl {
                path:   path_tok.text[1..path_tok.text.len() - 1].to_string(),
                line:   path_tok.line,
                column: path_tok.column,
            });
        } else if eat(tokens, &mut index, &NAMESPACE_KEYWORD) {
            let reference = parse_qualified_ref(tokens, &mut index)?;
            expect(tokens, &mut index, &SEMICOLON, "\";\"")?;
            decls.push(Decl::Namespace(NamespaceDecl {
                parts:  reference.parts,
                line:   keyword_tok.line,
                column: keyword_tok.column,
            }));
        } else if eat(tokens, &mut index, &TABLE_KEYWORD) {
            let name_tok = current_token(tokens, index).clone();
            expect(tokens, &mut index, &IDENTIFIER, "identifier")?;
            let metadata = parse_metadata(tokens, &mut index)?;
            let fields = parse_fields(tokens, &mut index)?;
            decls.push(Decl::Table(TableDef {
                name:   name_tok.text,
                line:   name_tok.line,
                column: name_tok.column,
                metadata,
                fields,
            }));
        } else if eat(tokens, &mut index, &STRUCT_KEYWORD) {
            let name_tok = current_token(tokens, index).clone();
            expect(tokens, &mut index, &IDENTIFIER, "identifier")?;
            let metadata = parse_metadata(tokens, &mut index)?;
            let fields = parse_fields(tokens, &mut index)?;
            decls.push(Decl::Struct(StructDef {
                name:   name_tok.text,
                line:   name_tok.line,
                column: name_tok.column,
                metadata,
                fields,
            }));
        } else if eat(tokens, &mut index, &ENUM_KEYWORD) {
            let name_tok = current_token(tokens, index).clone();
            expect(tokens, &mut index, &IDENTIFIER, "identifier")?;
            expect(tokens, &mut index, &COLON, "\":\"")?;
            let underlying = parse_type(tokens, &mut index)?;
            let metadata = parse_metadata(tokens, &mut index)?;
            let members = parse_enum_members(tokens, &mut index)?;
            decls.push(Decl::Enum(EnumDef {
                name:   name_tok.text,
                line:   name_tok.line,
                column: name_tok.column,
                underlying,
                metadata,
                members,
            }));
        } else if eat(tokens, &mut index, &UNION_KEYWORD) {
            let name_tok = current_token(tokens, index).clone();
            expect(tokens, &mut index, &IDENTIFIER, "identifier")?;
            let metadata = parse_metadata(tokens, &mut index)?;
            let members = parse_union_members(tokens, &mut index)?;
            decls.push(Decl::Union(UnionDef {
                name:   name_tok.text,
                line:   name_tok.line,
                column: name_tok.column,
                metadata,
                members,
            }));
        } else if eat(tokens, &mut index, &ROOT_TYPE_KEYWORD) {
            let reference = parse_qualified_ref(tokens, &mut index)?;
            expect(tokens, &mut index, &SEMICOLON, "\";\"")?;
            decls.push(Decl::RootType(RootTypeDecl {
                type_:  reference,
                line:   keyword_tok.line,
                column: keyword_tok.column,
            }));
        } else if eat(tokens, &mut index, &FILE_IDENTIFIER_KEYWORD) {
            let value_tok = current_token(tokens, index).clone();
            expect(tokens, &mut index, &STRING_LITERAL, "string")?;
            expect(tokens, &mut index, &SEMICOLON, "\";\"")?;
            decls.push(Decl::FileIdentifier(FileIdentifierDecl {
                value:  value_tok.text[1..value_tok.text.len() - 1].to_string(),
                line:   value_tok.line,
                column: value_tok.column,
            }));
        } else if eat(tokens, &mut index, &ATTRIBUTE_KEYWORD) {
            let name_tok = current_token(tokens, index).clone();
            if !eat(tokens, &mut index, &STRING_LITERAL) {
                expect(tokens, &mut index, &IDENTIFIER, "attribute name")?;
            }
            expect(tokens, &mut index, &SEMICOLON, "\";\"")?;
            let name = name_tok.text.trim_matches('"').to_string();
            decls.push(Decl::Attribute(AttributeDecl {
                name,
                line:   name_tok.line,
                column: name_tok.column,
            }));
        } else {
            return Err(unexpected_token(tokens, index));
        }
    }

    Ok(Schema { includes, decls })
}
