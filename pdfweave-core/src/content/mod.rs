//! Content stream interpretation.
//!
//! Content is parsed into a tree of [`ContentObject`]s where paths, text
//! blocks, `q`/`Q` sections and marked content become composites. A
//! [`ContentScanner`] walks that tree while tracking the [`GraphicsState`],
//! descending into composites and Form XObjects.

mod contents;
mod objects;
pub mod operation;
mod parser;
mod scanner;
mod state;

use thiserror::Error;

use crate::parser::ParseError;

pub use contents::Contents;
pub use objects::{CompositeKind, CompositeObject, ContentObject, InlineImage};
pub use operation::Operation;
pub use parser::ContentParser;
pub use scanner::{ContentScanner, ScanHandler};
pub use state::{
    Color, FontState, GraphicsState, LineCap, LineDashPattern, LineJoin, TextRenderingMode,
};

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("operand {index} of '{operator}' is not a {expected}")]
    MalformedOperand {
        operator: String,
        index: usize,
        expected: &'static str,
    },

    #[error("content parse error: {0}")]
    Parse(#[from] ParseError),
}
