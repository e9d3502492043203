//! PDF Parser Module
//!
//! Lexing and parsing of the PDF file structure: header, indirect objects,
//! classic cross-reference tables, cross-reference streams and object
//! streams. The whole file is held in memory; every parser works over a
//! byte slice and reports errors with the byte offset they occurred at.

pub mod filters;
pub mod header;
pub mod lexer;
pub mod object_stream;
pub mod objects;
pub mod reader;
#[cfg(test)]
pub(crate) mod test_helpers;
pub mod xref;
pub mod xref_stream;

pub use self::header::PdfVersion;
pub use self::lexer::{Lexer, Token};
pub use self::objects::ObjectParser;
pub use self::reader::{FileReader, ReaderInfo};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid PDF header")]
    InvalidHeader,

    #[error("startxref keyword not found")]
    MissingStartXRef,

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid xref at position {position}: {message}")]
    InvalidXRef { position: usize, message: String },

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("Stream decode error: {0}")]
    StreamDecodeError(String),

    #[error("Encryption not supported")]
    EncryptionNotSupported,

    #[error("Inline image starting at position {position} has no EI terminator")]
    UnterminatedInlineImage { position: usize },

    #[error("Truncated or corrupt data at position {position}: {message}")]
    TruncatedOrCorrupt { position: usize, message: String },
}

impl ParseError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        ParseError::SyntaxError {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn xref(position: usize, message: impl Into<String>) -> Self {
        ParseError::InvalidXRef {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn corrupt(position: usize, message: impl Into<String>) -> Self {
        ParseError::TruncatedOrCorrupt {
            position,
            message: message.into(),
        }
    }
}

/// Tunables for reading files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum number of xref sections followed through `Prev`/`XRefStm`.
    pub max_xref_chain: usize,
    /// Upper bound on inline image bodies while hunting for `EI`.
    pub max_inline_image_bytes: usize,
    /// Recover from a missing or wrong stream `Length` by scanning for `endstream`.
    pub lenient_stream_length: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_xref_chain: 1024,
            max_inline_image_bytes: 16 * 1024 * 1024,
            lenient_stream_length: true,
        }
    }
}

impl ParseOptions {
    /// Options that reject any structural damage.
    pub fn strict() -> Self {
        Self {
            lenient_stream_length: false,
            ..Self::default()
        }
    }

    /// Options for damaged real-world files.
    pub fn lenient() -> Self {
        Self {
            max_xref_chain: 4096,
            max_inline_image_bytes: 64 * 1024 * 1024,
            lenient_stream_length: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_positions_in_display() {
        let err = ParseError::syntax(42, "bad token");
        assert_eq!(err.to_string(), "Syntax error at position 42: bad token");

        let err = ParseError::UnterminatedInlineImage { position: 7 };
        assert!(err.to_string().contains("position 7"));
    }

    #[test]
    fn test_options_presets() {
        assert!(ParseOptions::default().lenient_stream_length);
        assert!(!ParseOptions::strict().lenient_stream_length);
        assert!(ParseOptions::lenient().max_xref_chain > ParseOptions::default().max_xref_chain);
    }
}
