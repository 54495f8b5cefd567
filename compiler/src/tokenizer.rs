use crate::error::SchemaError;
use crate::utils::{parse_error, quote};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(
        r#"(-?\b\d+\.\d+(?:[eE][-+]?\d+)?\b|-?\b\d+\b|"[^"\n]*"|//[^\n]*|[{}()\[\]:;,=.]|\b[A-Za-z_][A-Za-z0-9_]*\b|\s+)"#
    )
    .unwrap();
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"^(//[^\n]*|\s+)$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

/// Splits schema text into tokens, skipping whitespace and `//` comments.
/// The returned stream always ends with an empty end-of-file token.
pub fn tokenize_schema(text: &str) -> Result<Vec<Token>, SchemaError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let end = mat.end();
        let part = mat.as_str();

        if start > last_end {
            // There is some unexpected text
            let unexpected = &text[last_end..start];
            return Err(parse_error(
                &format!("Syntax error {}", quote(unexpected)),
                line,
                column,
            ));
        }

        if !WHITESPACE_REGEX.is_match(part) {
            tokens.push(Token {
                text: part.to_string(),
                line,
                column,
            });
        }

        // Update line and column
        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.len() + 1;
            }
        } else {
            column += part.len();
        }

        last_end = end;
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(parse_error(
            &format!("Syntax error {}", quote(unexpected)),
            line,
            column,
        ));
    }

    // Add end-of-file token
    tokens.push(Token {
        text: "".to_string(),
        line,
        column,
    });

    Ok(tokens)
}
