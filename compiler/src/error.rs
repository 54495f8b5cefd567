use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    Parse {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("{0}")]
    Validation(String),
}
