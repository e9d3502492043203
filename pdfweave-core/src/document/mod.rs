//! Typed views over the object graph: catalog, page tree, pages and
//! resources.
//!
//! Views hold object ids, not data. Every read goes through the registry,
//! so a view never goes stale when objects are edited.

mod page;
mod pages;
mod resources;

pub use page::{ContentContext, Page};
pub use pages::Pages;
pub use resources::{FormXObject, ResourceKind, Resources};

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::PdfVersion;
use crate::xref::IndirectObjects;

/// The document catalog of a file (`Trailer[Root]`).
pub struct Document<'f> {
    objects: &'f mut IndirectObjects,
    trailer: &'f mut Dictionary,
    header_version: PdfVersion,
}

impl<'f> Document<'f> {
    pub(crate) fn new(
        objects: &'f mut IndirectObjects,
        trailer: &'f mut Dictionary,
        header_version: PdfVersion,
    ) -> Self {
        Self {
            objects,
            trailer,
            header_version,
        }
    }

    /// The catalog object.
    pub fn base_object(&self) -> Result<ObjectId> {
        self.trailer
            .get_reference("Root")
            .ok_or_else(|| PdfError::InvalidStructure("trailer has no Root reference".to_string()))
    }

    pub fn catalog(&mut self) -> Result<Dictionary> {
        let root = self.base_object()?;
        match self.objects.get_data(root)? {
            Object::Dictionary(dict) => Ok(dict),
            other => Err(PdfError::InvalidStructure(format!(
                "catalog {root} is a {}",
                other.type_name()
            ))),
        }
    }

    pub fn pages(&mut self) -> Result<Pages<'_>> {
        let root = self
            .catalog()?
            .get_reference("Pages")
            .ok_or_else(|| PdfError::InvalidStructure("catalog has no Pages reference".to_string()))?;
        Ok(Pages::new(self.objects, root))
    }

    /// Document information dictionary, resolved, if there is one.
    pub fn information(&mut self) -> Result<Option<Dictionary>> {
        match self.trailer.get("Info") {
            Some(info) => Ok(self.objects.resolve_dictionary(info)?.cloned()),
            None => Ok(None),
        }
    }

    /// Mutable information dictionary, created and registered if missing.
    pub fn information_mut(&mut self) -> Result<&mut Dictionary> {
        let existing = match self.trailer.get_reference("Info") {
            Some(id) => matches!(self.objects.get_data(id)?, Object::Dictionary(_)).then_some(id),
            None => None,
        };
        let id = match existing {
            Some(id) => id,
            None => {
                // A direct Info dictionary is moved into its own object.
                let info = match self.trailer.remove("Info") {
                    Some(Object::Dictionary(direct)) => direct,
                    _ => Dictionary::new(),
                };
                let id = self.objects.add(info);
                self.trailer.set("Info", id);
                id
            }
        };
        self.objects
            .get_mut(id.number())?
            .and_then(|object| object.data_mut().as_dict_mut())
            .ok_or(PdfError::InvalidObjectReference(id.number(), id.generation()))
    }

    /// Header version, raised by the catalog's `Version` entry if later.
    pub fn version(&mut self) -> Result<PdfVersion> {
        let catalog_version = self
            .catalog()?
            .get_name("Version")
            .and_then(|name| name.parse::<PdfVersion>().ok());
        Ok(match catalog_version {
            Some(version) => version.max(self.header_version),
            None => self.header_version,
        })
    }
}
