//! PDF object model: the primitive value union, dictionaries and streams.
//!
//! A [`Object::Reference`] is only an address. Resolving it needs the owning
//! [`crate::xref::IndirectObjects`] registry.

mod dictionary;
mod primitive;
mod stream;

pub use dictionary::Dictionary;
pub use primitive::{Object, ObjectId, PdfString, StringMode};
pub use stream::Stream;
