use std::collections::HashSet;

use crate::error::Result;
use crate::objects::{Dictionary, Object, Stream};
use crate::xref::{FileId, IndirectObjects};

/// Deep-clones values from a foreign registry into the one it is bound to.
///
/// Direct values are copied, containers are cloned element by element and
/// nested references are imported through
/// [`IndirectObjects::import_external`].
#[derive(Debug, Clone)]
pub struct Cloner {
    target: FileId,
    excluded_keys: HashSet<String>,
}

impl Cloner {
    pub(crate) fn new(target: FileId) -> Self {
        Self {
            target,
            excluded_keys: HashSet::new(),
        }
    }

    pub fn target(&self) -> &FileId {
        &self.target
    }

    /// Dictionary key to drop while cloning, e.g. `Parent` when importing
    /// pages without their source page tree.
    pub fn exclude_key(mut self, key: impl Into<String>) -> Self {
        self.excluded_keys.insert(key.into());
        self
    }

    /// Clones `value` from `source` into `target`.
    pub fn clone_value(
        &self,
        target: &mut IndirectObjects,
        source: &mut IndirectObjects,
        value: &Object,
    ) -> Result<Object> {
        Ok(match value {
            Object::Reference(id) => match target.import_external(source, *id, self)? {
                Some(local) => Object::Reference(local),
                None => Object::Null,
            },
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.clone_value(target, source, item))
                    .collect::<Result<_>>()?,
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.clone_dictionary(target, source, dict)?),
            Object::Stream(stream) => {
                let dict = self.clone_dictionary(target, source, stream.dictionary())?;
                Object::Stream(Stream::with_dictionary(dict, stream.data().to_vec()))
            }
            direct => direct.clone(),
        })
    }

    fn clone_dictionary(
        &self,
        target: &mut IndirectObjects,
        source: &mut IndirectObjects,
        dict: &Dictionary,
    ) -> Result<Dictionary> {
        let mut cloned = Dictionary::with_capacity(dict.len());
        for (key, value) in dict.iter() {
            if self.excluded_keys.contains(key) {
                continue;
            }
            cloned.set(key.clone(), self.clone_value(target, source, value)?);
        }
        Ok(cloned)
    }
}
