//! # pdfweave
//!
//! PDF object graph engine in pure Rust: reads the file structure, exposes
//! the indirect objects as a mutable graph and writes changes back, either
//! as a full rewrite or as an incremental update. A content stream
//! interpreter walks page drawing operators while tracking the graphics
//! state.
//!
//! ## Features
//!
//! - **Cross-reference resolution**: classic tables, cross-reference streams,
//!   hybrid files and object streams, following `Prev` chains
//! - **Lazy objects**: indirect objects are parsed the first time they are
//!   used and cached afterwards
//! - **Saving**: standard rewrite or incremental append, with plain or
//!   compressed cross-reference data
//! - **Content streams**: parse into a tree of operations, paths, text
//!   blocks and marked content, edit it and flush it back
//! - **Graphics state**: CTM, text matrices, colors, fonts and line style
//!   through nested `q`/`Q` blocks and Form XObjects
//!
//! ## Quick Start
//!
//! ```rust
//! use pdfweave::content::ContentScanner;
//! use pdfweave::document::Page;
//! use pdfweave::geometry::PageFormat;
//! use pdfweave::{Contents, File, Result, WriterConfig};
//!
//! # fn main() -> Result<()> {
//! let mut file = File::new();
//! let page = file
//!     .document()
//!     .pages()?
//!     .add(Page::create(PageFormat::A4.to_rectangle()))?;
//!
//! let contents = Contents::parse(b"q 2 0 0 2 0 0 cm 0 0 10 10 re f Q")?;
//! page.set_contents(file.objects_mut(), &contents)?;
//!
//! let context = page.content_context(file.objects_mut())?;
//! let mut scanner: ContentScanner<'_> = context.scanner();
//! scanner.move_end()?;
//!
//! let bytes = file.to_bytes(&WriterConfig::default())?;
//! assert!(bytes.starts_with(b"%PDF-1.4"));
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod document;
pub mod error;
pub mod file;
pub mod geometry;
pub mod objects;
pub mod parser;
pub mod writer;
pub mod xref;

pub use content::{ContentError, ContentObject, ContentScanner, Contents, GraphicsState, Operation};
pub use document::{Document, Page, Pages, ResourceKind, Resources};
pub use error::{PdfError, Result};
pub use file::File;
pub use objects::{Dictionary, Object, ObjectId, PdfString, Stream, StringMode};
pub use parser::{ParseError, ParseOptions, PdfVersion};
pub use writer::{SerializationMode, WriterConfig, XRefMode};
pub use xref::{Cloner, IndirectObject, IndirectObjects, Usage, XRefEntry};

/// Current version of pdfweave
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_version_is_written() {
        let mut file = File::new();
        let bytes = file.to_bytes(&WriterConfig::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4\n"));
    }
}
