//! Named resources of a page or form (ISO 32000-1 Section 7.8.3).

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::content::Contents;
use crate::error::Result;
use crate::geometry::{Matrix, Rectangle};
use crate::objects::{Object, ObjectId};
use crate::xref::IndirectObjects;

/// Resource categories of a resource dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ExtGState,
    ColorSpace,
    Pattern,
    Shading,
    XObject,
    Font,
    Properties,
}

const KIND_KEYS: [(ResourceKind, &str); 7] = [
    (ResourceKind::ExtGState, "ExtGState"),
    (ResourceKind::ColorSpace, "ColorSpace"),
    (ResourceKind::Pattern, "Pattern"),
    (ResourceKind::Shading, "Shading"),
    (ResourceKind::XObject, "XObject"),
    (ResourceKind::Font, "Font"),
    (ResourceKind::Properties, "Properties"),
];

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::ExtGState,
        ResourceKind::ColorSpace,
        ResourceKind::Pattern,
        ResourceKind::Shading,
        ResourceKind::XObject,
        ResourceKind::Font,
        ResourceKind::Properties,
    ];

    /// Key of this category in a resource dictionary.
    pub fn key(self) -> &'static str {
        KIND_KEYS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or("", |(_, key)| key)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        KIND_KEYS
            .iter()
            .find(|(_, name)| *name == key)
            .map(|(kind, _)| *kind)
    }
}

/// A Form XObject ready for scanning.
#[derive(Debug, Clone, PartialEq)]
pub struct FormXObject {
    pub id: Option<ObjectId>,
    /// Form space to user space.
    pub matrix: Matrix,
    pub bbox: Option<Rectangle>,
    /// The form's own resources; the painting context's apply when absent.
    pub resources: Option<Box<Resources>>,
    pub contents: Contents,
}

/// Resolved resource dictionary.
///
/// Every entry is stored resolved. Form XObjects are additionally loaded
/// with their parsed content and nested resources, since scanning has no
/// access to the registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resources {
    entries: HashMap<ResourceKind, IndexMap<String, Object>>,
    forms: HashMap<String, Rc<FormXObject>>,
}

impl Resources {
    /// Loads the resource dictionary `value` (direct or a reference).
    /// Anything that is not a dictionary gives empty resources.
    pub fn load(objects: &mut IndirectObjects, value: &Object) -> Result<Self> {
        ResourceLoader {
            objects,
            visiting: HashSet::new(),
            loaded: HashMap::new(),
        }
        .load(value)
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&Object> {
        self.entries.get(&kind).and_then(|entries| entries.get(name))
    }

    /// Form XObject registered under `name`.
    pub fn form(&self, name: &str) -> Option<&FormXObject> {
        self.forms.get(name).map(Rc::as_ref)
    }

    pub fn names(&self, kind: ResourceKind) -> impl Iterator<Item = &str> {
        self.entries
            .get(&kind)
            .into_iter()
            .flat_map(|entries| entries.keys().map(String::as_str))
    }

    pub fn insert(&mut self, kind: ResourceKind, name: impl Into<String>, value: Object) {
        self.entries.entry(kind).or_default().insert(name.into(), value);
    }

    pub fn insert_form(&mut self, name: impl Into<String>, form: FormXObject) {
        self.forms.insert(name.into(), Rc::new(form));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(IndexMap::is_empty) && self.forms.is_empty()
    }
}

struct ResourceLoader<'a> {
    objects: &'a mut IndirectObjects,
    /// Forms on the current loading path.
    visiting: HashSet<ObjectId>,
    /// Forms already loaded, shared between every place that names them.
    loaded: HashMap<ObjectId, Rc<FormXObject>>,
}

impl ResourceLoader<'_> {
    fn load(&mut self, value: &Object) -> Result<Resources> {
        let Some(dictionary) = self.objects.resolve_dictionary(value)?.cloned() else {
            return Ok(Resources::default());
        };

        let mut resources = Resources::default();
        for kind in ResourceKind::ALL {
            let Some(category) = dictionary.get(kind.key()) else {
                continue;
            };
            let Some(category) = self.objects.resolve_dictionary(category)?.cloned() else {
                tracing::warn!(category = kind.key(), "resource category is not a dictionary");
                continue;
            };

            let mut entries = IndexMap::with_capacity(category.len());
            for (name, value) in category.iter() {
                let resolved = self.objects.resolve(value)?.clone();
                if kind == ResourceKind::XObject && is_form(&resolved) {
                    if let Some(form) = self.load_form(value.as_reference(), &resolved)? {
                        resources.forms.insert(name.clone(), form);
                    }
                }
                entries.insert(name.clone(), resolved);
            }
            resources.entries.insert(kind, entries);
        }
        Ok(resources)
    }

    fn load_form(&mut self, id: Option<ObjectId>, value: &Object) -> Result<Option<Rc<FormXObject>>> {
        if let Some(id) = id {
            if let Some(form) = self.loaded.get(&id) {
                return Ok(Some(Rc::clone(form)));
            }
            if !self.visiting.insert(id) {
                tracing::warn!(form = %id, "form XObject paints itself, not following");
                return Ok(None);
            }
        }
        let Some(stream) = value.as_stream() else {
            return Ok(None);
        };
        let dictionary = stream.dictionary();

        let matrix = dictionary
            .get("Matrix")
            .and_then(Object::as_array)
            .and_then(|values| Matrix::from_array(values))
            .unwrap_or(Matrix::IDENTITY);
        let bbox = dictionary
            .get("BBox")
            .and_then(Object::as_array)
            .and_then(|values| Rectangle::from_array(values));
        let resources = match dictionary.get("Resources") {
            Some(value) => Some(Box::new(self.load(value)?)),
            None => None,
        };
        let contents = match stream.decoded() {
            Ok(data) => Contents::parse(&data).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "form XObject content does not parse, treating as empty");
                Contents::default()
            }),
            Err(err) => {
                tracing::warn!(error = %err, "form XObject stream does not decode, treating as empty");
                Contents::default()
            }
        };

        let form = Rc::new(FormXObject {
            id,
            matrix,
            bbox,
            resources,
            contents,
        });
        if let Some(id) = id {
            self.visiting.remove(&id);
            self.loaded.insert(id, Rc::clone(&form));
        }
        Ok(Some(form))
    }
}

fn is_form(value: &Object) -> bool {
    value
        .as_stream()
        .is_some_and(|stream| stream.dictionary().get_name("Subtype") == Some("Form"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Dictionary, Stream};

    fn form_stream(content: &[u8], resources: Option<Object>) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XObject"));
        dict.set("Subtype", Object::name("Form"));
        dict.set("BBox", Object::Array(vec![0.into(), 0.into(), 10.into(), 10.into()]));
        dict.set("Matrix", Object::Array(vec![1.into(), 0.into(), 0.into(), 1.into(), 5.into(), 5.into()]));
        if let Some(resources) = resources {
            dict.set("Resources", resources);
        }
        Stream::with_dictionary(dict, content.to_vec())
    }

    #[test]
    fn test_kind_keys() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(ResourceKind::XObject.key(), "XObject");
        assert_eq!(ResourceKind::from_key("ProcSet"), None);
    }

    #[test]
    fn test_entries_are_resolved() {
        let mut objects = IndirectObjects::new();
        let mut gs = Dictionary::new();
        gs.set("LW", 3);
        let gs = objects.add(gs);

        let mut ext = Dictionary::new();
        ext.set("GS0", gs);
        let mut dict = Dictionary::new();
        dict.set("ExtGState", ext);
        dict.set("ProcSet", Object::Array(vec![Object::name("PDF")]));
        let resources_id = objects.add(dict);

        let resources = Resources::load(&mut objects, &Object::Reference(resources_id)).unwrap();
        let gs0 = resources.get(ResourceKind::ExtGState, "GS0").unwrap();
        assert_eq!(gs0.as_dict().unwrap().get_integer("LW"), Some(3));
        assert_eq!(resources.names(ResourceKind::ExtGState).collect::<Vec<_>>(), vec!["GS0"]);
        assert!(resources.get(ResourceKind::Font, "F1").is_none());
    }

    #[test]
    fn test_forms_are_loaded_with_contents() {
        let mut objects = IndirectObjects::new();
        let form = objects.add(form_stream(b"0 0 m 10 10 l S", None));
        let mut xobjects = Dictionary::new();
        xobjects.set("Fm0", form);
        let mut dict = Dictionary::new();
        dict.set("XObject", xobjects);

        let resources = Resources::load(&mut objects, &Object::Dictionary(dict)).unwrap();
        let loaded = resources.form("Fm0").unwrap();
        assert_eq!(loaded.id, Some(form));
        assert_eq!(loaded.matrix, Matrix::translate(5.0, 5.0));
        assert_eq!(loaded.bbox.unwrap().width(), 10.0);
        assert_eq!(loaded.contents.len(), 1);
        assert!(loaded.resources.is_none());
    }

    #[test]
    fn test_self_painting_form_terminates() {
        let mut objects = IndirectObjects::new();
        // Resources dictionary number 1, form number 2 using it.
        let resources_id = objects.add(Object::Null);
        let form = objects.add(form_stream(b"/Fm0 Do", Some(Object::Reference(resources_id))));
        let mut xobjects = Dictionary::new();
        xobjects.set("Fm0", form);
        let mut dict = Dictionary::new();
        dict.set("XObject", xobjects);
        if let Some(object) = objects.get_mut(resources_id.number()).unwrap() {
            *object.data_mut() = Object::Dictionary(dict);
        }

        let resources = Resources::load(&mut objects, &Object::Reference(resources_id)).unwrap();
        let outer = resources.form("Fm0").unwrap();
        let inner = outer.resources.as_ref().unwrap();
        // The nested entry is still there, but not followed as a form.
        assert!(inner.get(ResourceKind::XObject, "Fm0").is_some());
        assert!(inner.form("Fm0").is_none());
    }
}
