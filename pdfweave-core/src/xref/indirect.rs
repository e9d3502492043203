use crate::objects::{Object, ObjectId};
use crate::xref::XRefEntry;

/// An indirect object owned by a registry: its xref entry plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    entry: XRefEntry,
    data: Object,
    connected: bool,
}

impl IndirectObject {
    pub fn new(entry: XRefEntry, data: Object) -> Self {
        Self {
            entry,
            data,
            connected: true,
        }
    }

    /// Freed slot for `number`; its generation marks it unreusable.
    pub fn free(number: u32) -> Self {
        Self::new(XRefEntry::unreusable(number), Object::Null)
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::new(self.entry.number, self.entry.generation)
    }

    pub fn number(&self) -> u32 {
        self.entry.number
    }

    pub fn generation(&self) -> u16 {
        self.entry.generation
    }

    pub fn entry(&self) -> &XRefEntry {
        &self.entry
    }

    pub(crate) fn entry_mut(&mut self) -> &mut XRefEntry {
        &mut self.entry
    }

    pub fn data(&self) -> &Object {
        &self.data
    }

    /// Mutable payload.
    ///
    /// # Panics
    ///
    /// Panics if the object was replaced in its registry and is no longer
    /// part of the file.
    pub fn data_mut(&mut self) -> &mut Object {
        assert!(
            self.connected,
            "indirect object {} was disconnected from its file",
            self.id()
        );
        &mut self.data
    }

    pub fn into_data(self) -> Object {
        self.data
    }

    pub fn is_in_use(&self) -> bool {
        self.entry.is_in_use()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn disconnect(&mut self) {
        self.connected = false;
    }
}
