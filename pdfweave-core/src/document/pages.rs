//! The page tree (ISO 32000-1 Section 7.7.3).

use std::collections::HashSet;

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::xref::IndirectObjects;

use super::page::Page;

/// Page tree rooted at the catalog's `Pages` node.
pub struct Pages<'f> {
    objects: &'f mut IndirectObjects,
    root: ObjectId,
}

impl<'f> Pages<'f> {
    pub fn new(objects: &'f mut IndirectObjects, root: ObjectId) -> Self {
        Self { objects, root }
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// `Count` of the root node.
    pub fn count(&mut self) -> Result<usize> {
        let root = node(self.objects, self.root)?;
        let count = match root.get("Count") {
            Some(value) => self.objects.resolve(value)?.as_integer().unwrap_or(0),
            None => {
                tracing::warn!(root = %self.root, "page tree root has no Count, counting leaves");
                return Ok(self.ids()?.len());
            }
        };
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Leaf pages in document order.
    pub fn ids(&mut self) -> Result<Vec<ObjectId>> {
        let mut pages = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                tracing::warn!(node = %id, "page tree node visited twice, skipping");
                continue;
            }
            let dict = node(self.objects, id)?;
            match dict.get("Kids") {
                Some(kids) => {
                    let kids = self.objects.resolve(kids)?.as_array().cloned().unwrap_or_default();
                    stack.extend(kids.iter().rev().filter_map(Object::as_reference));
                }
                None if id != self.root => pages.push(id),
                None => {}
            }
        }
        Ok(pages)
    }

    pub fn get(&mut self, index: usize) -> Result<Option<Page>> {
        Ok(self.ids()?.get(index).copied().map(Page::new))
    }

    /// Appends `page` (see [`Page::create`]) to the root node.
    pub fn add(&mut self, page: Dictionary) -> Result<Page> {
        self.add_to(self.root, page)
    }

    /// Appends `page` to the intermediate node `parent` and increments
    /// `Count` on `parent` and every ancestor up to the root.
    pub fn add_to(&mut self, parent: ObjectId, mut page: Dictionary) -> Result<Page> {
        page.set("Type", Object::name("Page"));
        page.set("Parent", parent);
        let id = self.objects.add(page);

        match node(self.objects, parent)?.get_reference("Kids") {
            Some(kids_id) => {
                let kids = self
                    .objects
                    .get_mut(kids_id.number())?
                    .and_then(|object| object.data_mut().as_array_mut())
                    .ok_or_else(|| {
                        PdfError::InvalidStructure(format!("Kids of page tree node {parent} is not an array"))
                    })?;
                kids.push(Object::Reference(id));
            }
            None => edit_node(self.objects, parent, |node| match node.get_mut("Kids").and_then(Object::as_array_mut) {
                Some(kids) => kids.push(Object::Reference(id)),
                None => node.set("Kids", Object::Array(vec![Object::Reference(id)])),
            })?,
        }

        let mut seen = HashSet::new();
        let mut current = Some(parent);
        while let Some(node_id) = current {
            if !seen.insert(node_id) {
                tracing::warn!(node = %node_id, "page tree parent chain loops");
                break;
            }
            let count = match node(self.objects, node_id)?.get("Count") {
                Some(value) => self.objects.resolve(value)?.as_integer().unwrap_or(0),
                None => 0,
            };
            edit_node(self.objects, node_id, |node| node.set("Count", count + 1))?;
            current = node(self.objects, node_id)?.get_reference("Parent");
        }
        tracing::debug!(page = %id, parent = %parent, "page added");
        Ok(Page::new(id))
    }
}

fn node(objects: &mut IndirectObjects, id: ObjectId) -> Result<Dictionary> {
    match objects.get_data(id)? {
        Object::Dictionary(dict) => Ok(dict),
        other => Err(PdfError::InvalidStructure(format!(
            "page tree node {id} is a {}",
            other.type_name()
        ))),
    }
}

fn edit_node(objects: &mut IndirectObjects, id: ObjectId, edit: impl FnOnce(&mut Dictionary)) -> Result<()> {
    let dict = objects
        .get_mut(id.number())?
        .and_then(|object| object.data_mut().as_dict_mut())
        .ok_or(PdfError::InvalidObjectReference(id.number(), id.generation()))?;
    edit(dict);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageFormat;

    fn pages_node(objects: &mut IndirectObjects, parent: Option<ObjectId>) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Pages"));
        dict.set("Kids", Object::Array(Vec::new()));
        dict.set("Count", 0);
        if let Some(parent) = parent {
            dict.set("Parent", parent);
        }
        objects.add(dict)
    }

    fn link_kid(objects: &mut IndirectObjects, parent: ObjectId, kid: ObjectId) {
        edit_node(objects, parent, |node| {
            node.get_mut("Kids").and_then(Object::as_array_mut).unwrap().push(kid.into());
        })
        .unwrap();
    }

    #[test]
    fn test_add_to_root() {
        let mut objects = IndirectObjects::new();
        let root = pages_node(&mut objects, None);
        let mut pages = Pages::new(&mut objects, root);

        assert_eq!(pages.count().unwrap(), 0);
        let first = pages.add(Page::create(PageFormat::A4.to_rectangle())).unwrap();
        let second = pages.add(Page::create(PageFormat::A5.to_rectangle())).unwrap();
        assert_eq!(pages.count().unwrap(), 2);
        assert_eq!(pages.ids().unwrap(), vec![first.id(), second.id()]);
        assert_eq!(pages.get(1).unwrap(), Some(second));
        assert_eq!(pages.get(2).unwrap(), None);
    }

    #[test]
    fn test_count_increments_every_ancestor() {
        let mut objects = IndirectObjects::new();
        let root = pages_node(&mut objects, None);
        let middle = pages_node(&mut objects, Some(root));
        let leaf_parent = pages_node(&mut objects, Some(middle));
        link_kid(&mut objects, root, middle);
        link_kid(&mut objects, middle, leaf_parent);

        let mut pages = Pages::new(&mut objects, root);
        let page = pages.add_to(leaf_parent, Page::create(PageFormat::A4.to_rectangle())).unwrap();
        pages.add(Page::create(PageFormat::A4.to_rectangle())).unwrap();

        assert_eq!(pages.count().unwrap(), 2);
        assert_eq!(pages.get(0).unwrap(), Some(page));
        for (id, expected) in [(root, 2), (middle, 1), (leaf_parent, 1)] {
            assert_eq!(node(&mut objects, id).unwrap().get_integer("Count"), Some(expected));
        }
    }

    #[test]
    fn test_missing_count_counts_leaves() {
        let mut objects = IndirectObjects::new();
        let root = pages_node(&mut objects, None);
        let mut pages = Pages::new(&mut objects, root);
        pages.add(Page::create(PageFormat::A4.to_rectangle())).unwrap();
        edit_node(pages.objects, root, |node| {
            node.remove("Count");
        })
        .unwrap();
        assert_eq!(pages.count().unwrap(), 1);
    }

    #[test]
    fn test_add_to_node_with_indirect_kids() {
        let mut objects = IndirectObjects::new();
        let existing = objects.add(Object::Null);
        let kids = objects.add(Object::Array(vec![existing.into()]));
        let root = pages_node(&mut objects, None);
        edit_node(&mut objects, root, |node| {
            node.set("Kids", kids);
            node.set("Count", 1);
        })
        .unwrap();
        fill_page(&mut objects, existing, Page::create(PageFormat::A4.to_rectangle()));

        let mut pages = Pages::new(&mut objects, root);
        let added = pages.add(Page::create(PageFormat::A5.to_rectangle())).unwrap();
        assert_eq!(pages.ids().unwrap(), vec![existing, added.id()]);
        assert_eq!(pages.count().unwrap(), 2);
        assert_eq!(node(&mut objects, root).unwrap().get_reference("Kids"), Some(kids));
    }

    fn fill_page(objects: &mut IndirectObjects, id: ObjectId, mut dict: Dictionary) {
        dict.set("Type", Object::name("Page"));
        *objects.get_mut(id.number()).unwrap().unwrap().data_mut() = Object::Dictionary(dict);
    }
}
