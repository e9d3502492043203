//! Cross-reference registry: xref entries, indirect objects and the
//! per-file table that owns them.

mod cloner;
mod entry;
mod indirect;
mod registry;

pub use cloner::Cloner;
pub use entry::{Usage, XRefEntry, GENERATION_UNREUSABLE};
pub use indirect::IndirectObject;
pub use registry::{FileId, IndirectObjects};
