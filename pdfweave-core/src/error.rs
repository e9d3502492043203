use std::path::PathBuf;

use thiserror::Error;

use crate::content::ContentError;
use crate::parser::ParseError;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(ParseError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid PDF structure: {0}")]
    InvalidStructure(String),

    #[error("Invalid object reference: {0} {1} R")]
    InvalidObjectReference(u32, u16),

    #[error("Compression error: {0}")]
    CompressionError(String),
}

impl From<ParseError> for PdfError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Io(io) => PdfError::Io(io),
            ParseError::EncryptionNotSupported => {
                PdfError::UnsupportedFeature("encrypted documents".to_string())
            }
            other => PdfError::Parse(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_pdf_error_display() {
        let error = PdfError::InvalidStructure("test message".to_string());
        assert_eq!(error.to_string(), "Invalid PDF structure: test message");
    }

    #[test]
    fn test_pdf_error_from_io_error() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let pdf_error = PdfError::from(io_error);

        match pdf_error {
            PdfError::Io(ref err) => assert_eq!(err.kind(), ErrorKind::NotFound),
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_encryption_maps_to_unsupported() {
        let err = PdfError::from(ParseError::EncryptionNotSupported);
        assert!(matches!(err, PdfError::UnsupportedFeature(_)));
    }

    #[test]
    fn test_parse_io_is_unwrapped() {
        let err = PdfError::from(ParseError::Io(IoError::new(ErrorKind::UnexpectedEof, "eof")));
        match err {
            PdfError::Io(io) => assert_eq!(io.kind(), ErrorKind::UnexpectedEof),
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_error_chain_display() {
        let errors = [
            (
                "Invalid object reference: 999 0 R",
                PdfError::InvalidObjectReference(999, 0),
            ),
            (
                "Unsupported feature: linearized writing",
                PdfError::UnsupportedFeature("linearized writing".to_string()),
            ),
            (
                "File not found: /nope/out.pdf",
                PdfError::FileNotFound(PathBuf::from("/nope/out.pdf")),
            ),
            (
                "Parse error: Invalid PDF header",
                PdfError::Parse(ParseError::InvalidHeader),
            ),
        ];

        for (expected, error) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PdfError>();
    }
}
