//! The indirect-object registry of one file.

use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::FileReader;
use crate::xref::{Cloner, IndirectObject, XRefEntry, GENERATION_UNREUSABLE};

static NULL: Object = Object::Null;

/// Reference chains longer than this resolve to null.
const MAX_REFERENCE_CHAIN: usize = 32;

/// Identity of one registry; used to bind cloners and key imports.
///
/// Identity is the token allocation itself. Every clone keeps it alive, so
/// an id held in a cloner or an import key is never reused by a later file.
#[derive(Clone)]
pub struct FileId(Arc<()>);

impl FileId {
    fn new() -> Self {
        FileId(Arc::new(()))
    }
}

impl PartialEq for FileId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for FileId {}

impl Hash for FileId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl std::fmt::Debug for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FileId({:p})", Arc::as_ptr(&self.0))
    }
}

/// Maps object numbers to indirect objects.
///
/// Objects from the source file are woken lazily on first access and then
/// cached. Objects added or replaced in memory live in the modified map,
/// which the incremental writer serializes.
#[derive(Debug)]
pub struct IndirectObjects {
    file_id: FileId,
    reader: Option<FileReader>,
    xref_entries: BTreeMap<u32, XRefEntry>,
    modified: BTreeMap<u32, IndirectObject>,
    woken: HashMap<u32, IndirectObject>,
    last_number: u32,
    external_map: HashMap<(FileId, u32), ObjectId>,
}

impl Default for IndirectObjects {
    fn default() -> Self {
        Self::new()
    }
}

impl IndirectObjects {
    /// Empty registry for a new file. Number 0 is the free-list head.
    pub fn new() -> Self {
        Self {
            file_id: FileId::new(),
            reader: None,
            xref_entries: BTreeMap::new(),
            modified: BTreeMap::new(),
            woken: HashMap::new(),
            last_number: 0,
            external_map: HashMap::new(),
        }
    }

    /// Registry backed by a parsed file.
    pub fn from_reader(reader: FileReader, xref_entries: BTreeMap<u32, XRefEntry>) -> Self {
        let last_number = xref_entries.keys().next_back().copied().unwrap_or(0);
        Self {
            reader: Some(reader),
            xref_entries,
            last_number,
            ..Self::new()
        }
    }

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    pub fn reader(&self) -> Option<&FileReader> {
        self.reader.as_ref()
    }

    /// Cloner that imports foreign objects into this registry.
    pub fn cloner(&self) -> Cloner {
        Cloner::new(self.file_id.clone())
    }

    /// Highest object number handed out or read from the file.
    pub fn last_number(&self) -> u32 {
        self.last_number
    }

    /// Number of xref slots, object 0 included.
    pub fn len(&self) -> usize {
        self.last_number as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.last_number == 0
    }

    /// Registers `data` under the next object number.
    pub fn add(&mut self, data: impl Into<Object>) -> ObjectId {
        self.last_number += 1;
        let number = self.last_number;
        let object = IndirectObject::new(XRefEntry::fresh(number), data.into());
        let id = object.id();
        self.modified.insert(number, object);
        tracing::debug!(number, "object added");
        id
    }

    /// Looks up object `number`, waking it from the file if needed.
    ///
    /// Numbers past [`Self::last_number`] resolve to `None`. A number with no
    /// xref entry yields a free placeholder.
    pub fn get(&mut self, number: u32) -> Result<Option<&IndirectObject>> {
        if !self.wake(number)? {
            return Ok(None);
        }
        Ok(self.peek(number))
    }

    /// Mutable lookup. The object is moved to the modified set.
    pub fn get_mut(&mut self, number: u32) -> Result<Option<&mut IndirectObject>> {
        if !self.wake(number)? {
            return Ok(None);
        }
        if let Some(object) = self.woken.remove(&number) {
            self.modified.insert(number, object);
        }
        Ok(self.modified.get_mut(&number))
    }

    /// Object already in memory, without touching the file.
    pub fn peek(&self, number: u32) -> Option<&IndirectObject> {
        self.modified
            .get(&number)
            .or_else(|| self.woken.get(&number))
    }

    /// Ensures `number` is in memory. Returns `false` when out of range.
    fn wake(&mut self, number: u32) -> Result<bool> {
        if number > self.last_number {
            return Ok(false);
        }
        if self.modified.contains_key(&number) || self.woken.contains_key(&number) {
            return Ok(true);
        }

        let entry = match self.xref_entries.get(&number) {
            Some(entry) => *entry,
            None => {
                let generation = if number == 0 { GENERATION_UNREUSABLE } else { 0 };
                let entry = XRefEntry::free(number, generation, 0);
                if number != 0 {
                    tracing::warn!(number, "no xref entry, using a free placeholder");
                }
                self.xref_entries.insert(number, entry);
                entry
            }
        };
        let data = match (&mut self.reader, entry.is_in_use()) {
            (Some(reader), true) => reader.load_object(&entry)?,
            _ => Object::Null,
        };
        tracing::debug!(number, usage = ?entry.usage, "object woken");
        self.woken.insert(number, IndirectObject::new(entry, data));
        Ok(true)
    }

    /// Current entry for `number`, in memory or from the file.
    pub fn entry(&self, number: u32) -> Option<XRefEntry> {
        self.peek(number)
            .map(|object| *object.entry())
            .or_else(|| self.xref_entries.get(&number).copied())
    }

    /// Entries as read from the file, before any change.
    pub fn original_entries(&self) -> &BTreeMap<u32, XRefEntry> {
        &self.xref_entries
    }

    /// Replaces the object stored under `object.number()`.
    ///
    /// The previous in-memory instance, if any, is returned disconnected.
    pub fn update(&mut self, object: IndirectObject) -> Option<IndirectObject> {
        let number = object.number();
        self.last_number = self.last_number.max(number);
        let woken = self.woken.remove(&number);
        let previous = self.modified.insert(number, object).or(woken);
        previous.map(|mut prev| {
            prev.disconnect();
            prev
        })
    }

    /// Frees `number`. The number is never handed out again.
    pub fn remove(&mut self, number: u32) -> Result<Option<IndirectObject>> {
        let in_use = match self.get(number)? {
            Some(object) => object.is_in_use(),
            None => false,
        };
        if !in_use {
            return Ok(None);
        }
        tracing::debug!(number, "object removed");
        Ok(self.update(IndirectObject::free(number)))
    }

    /// Objects added or changed in memory, in object-number order.
    pub fn modified(&self) -> impl Iterator<Item = &IndirectObject> {
        self.modified.values()
    }

    pub fn is_modified(&self, number: u32) -> bool {
        self.modified.contains_key(&number)
    }

    pub(crate) fn modified_mut(&mut self) -> impl Iterator<Item = &mut IndirectObject> {
        self.modified.values_mut()
    }

    /// Follows references until a direct value. Dangling references resolve
    /// to null.
    pub fn resolve<'a>(&'a mut self, object: &'a Object) -> Result<&'a Object> {
        let mut id = match object {
            Object::Reference(id) => *id,
            _ => return Ok(object),
        };
        for _ in 0..MAX_REFERENCE_CHAIN {
            if !self.wake(id.number())? {
                tracing::warn!(reference = %id, "dangling reference");
                return Ok(&NULL);
            }
            match self.peek(id.number()).map(IndirectObject::data) {
                Some(Object::Reference(next)) => id = *next,
                _ => break,
            }
        }
        Ok(self
            .peek(id.number())
            .map(IndirectObject::data)
            .unwrap_or(&NULL))
    }

    /// Resolves `object` and returns it if it is a dictionary (or stream).
    pub fn resolve_dictionary<'a>(&'a mut self, object: &'a Object) -> Result<Option<&'a Dictionary>> {
        Ok(self.resolve(object)?.as_dict())
    }

    /// Resolved copy of the value behind `id`.
    pub fn get_data(&mut self, id: ObjectId) -> Result<Object> {
        let object = Object::Reference(id);
        Ok(self.resolve(&object)?.clone())
    }

    /// Imports object `id` from `source`, deep-cloning through `cloner`.
    ///
    /// Repeated imports of one foreign object give the same local id. The
    /// placeholder is registered before cloning so reference cycles resolve
    /// to it.
    ///
    /// # Panics
    ///
    /// Panics if `cloner` belongs to another registry.
    pub fn import_external(
        &mut self,
        source: &mut IndirectObjects,
        id: ObjectId,
        cloner: &Cloner,
    ) -> Result<Option<ObjectId>> {
        assert_eq!(
            cloner.target(),
            &self.file_id,
            "cloner is bound to a different file"
        );
        let key = (source.file_id.clone(), id.number());
        if let Some(local) = self.external_map.get(&key) {
            return Ok(Some(*local));
        }

        let data = match source.get(id.number())? {
            Some(object) if object.is_in_use() => object.data().clone(),
            _ => return Ok(None),
        };

        let local = self.add(Object::Null);
        self.external_map.insert(key, local);
        let cloned = cloner.clone_value(self, source, &data)?;
        if let Some(object) = self.modified.get_mut(&local.number()) {
            *object.data_mut() = cloned;
        }
        Ok(Some(local))
    }
}
