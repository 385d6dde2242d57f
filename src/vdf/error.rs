//! Errors raised while reading or writing key-value trees.

use std::fmt;

use thiserror::Error;

/// Where in the input a parse error was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// 1-based line number (text encoding)
    Line(usize),

    /// 0-based byte offset (binary encoding, or invalid UTF-8 in text)
    Offset(usize),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Line(line) => write!(f, "line {}", line),
            Position::Offset(offset) => write!(f, "byte {}", offset),
        }
    }
}

/// Errors that can occur in the tree codec
#[derive(Debug, Error)]
pub enum VdfError {
    #[error("Parse error at {position}: {message} (near `{context}`)")]
    Parse {
        position: Position,
        message: String,
        context: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Root node must be an interior node to be written")]
    InvalidRoot,

    #[error("Key or value contains an embedded NUL and cannot be written: {0:?}")]
    EmbeddedNul(String),

    #[error("Tree holds non-UTF-8 bytes (output byte {0}) and cannot be returned as a string")]
    NotUtf8(usize),
}

impl VdfError {
    /// Build a parse error
    pub fn parse(position: Position, message: impl Into<String>, context: impl Into<String>) -> Self {
        VdfError::Parse {
            position,
            message: message.into(),
            context: context.into(),
        }
    }

    /// Whether this error came from malformed input rather than I/O
    pub fn is_parse(&self) -> bool {
        matches!(self, VdfError::Parse { .. })
    }
}
