//! Page objects (ISO 32000-1 Section 7.7.3.3).

use std::collections::HashSet;

use crate::content::{ContentScanner, Contents};
use crate::error::{PdfError, Result};
use crate::geometry::{PageFormat, Rectangle, Rotation};
use crate::objects::{Dictionary, Object, ObjectId, Stream};
use crate::xref::IndirectObjects;

use super::resources::Resources;

/// Inheritable attributes are looked up through at most this many parents.
const MAX_INHERITANCE_DEPTH: usize = 64;

/// A page of the page tree, identified by its object.
///
/// All lookups go through the registry passed in, the way every other view
/// over the object graph does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    id: ObjectId,
}

impl Page {
    pub fn new(id: ObjectId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// New page dictionary with the given media box, empty resources and
    /// no content. Register it with `Pages::add`.
    pub fn create(size: Rectangle) -> Dictionary {
        let mut page = Dictionary::new();
        page.set("Type", Object::name("Page"));
        page.set("MediaBox", size.to_object());
        page.set("Resources", Dictionary::new());
        page
    }

    pub fn dictionary(&self, objects: &mut IndirectObjects) -> Result<Dictionary> {
        let data = objects.get_data(self.id)?;
        match data {
            Object::Dictionary(dict) => Ok(dict),
            other => Err(PdfError::InvalidStructure(format!(
                "page {} is a {}, not a dictionary",
                self.id,
                other.type_name()
            ))),
        }
    }

    /// Attribute of the page or, failing that, of the nearest ancestor that
    /// has it. Returned resolved.
    pub fn inherited(&self, objects: &mut IndirectObjects, key: &str) -> Result<Option<Object>> {
        let mut node = self.dictionary(objects)?;
        let mut seen = HashSet::from([self.id]);
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Some(value) = node.get(key) {
                return Ok(Some(objects.resolve(value)?.clone()));
            }
            let Some(parent) = node.get_reference("Parent") else {
                return Ok(None);
            };
            if !seen.insert(parent) {
                tracing::warn!(page = %self.id, "page tree parent chain loops");
                return Ok(None);
            }
            node = match objects.get_data(parent)? {
                Object::Dictionary(dict) => dict,
                _ => return Ok(None),
            };
        }
        Ok(None)
    }

    /// Media box, inherited; A4 when the tree has none.
    pub fn media_box(&self, objects: &mut IndirectObjects) -> Result<Rectangle> {
        let media_box = self
            .inherited(objects, "MediaBox")?
            .as_ref()
            .and_then(Object::as_array)
            .and_then(|values| Rectangle::from_array(values));
        Ok(media_box.unwrap_or_else(|| {
            tracing::debug!(page = %self.id, "no MediaBox, using A4");
            PageFormat::default().to_rectangle()
        }))
    }

    pub fn rotation(&self, objects: &mut IndirectObjects) -> Result<Rotation> {
        let degrees = self
            .inherited(objects, "Rotate")?
            .and_then(|value| value.as_integer())
            .unwrap_or(0);
        Ok(Rotation::from_degrees(degrees))
    }

    pub fn resources(&self, objects: &mut IndirectObjects) -> Result<Resources> {
        match self.inherited(objects, "Resources")? {
            Some(value) => Resources::load(objects, &value),
            None => Ok(Resources::default()),
        }
    }

    /// Decoded content: a single stream or the concatenation of an array of
    /// streams, separated by a newline.
    pub fn content_bytes(&self, objects: &mut IndirectObjects) -> Result<Vec<u8>> {
        let page = self.dictionary(objects)?;
        let streams = match page.get("Contents") {
            None => return Ok(Vec::new()),
            Some(value) => match objects.resolve(value)?.clone() {
                Object::Array(parts) => parts,
                single => vec![single],
            },
        };

        let mut data = Vec::new();
        for part in &streams {
            match objects.resolve(part)? {
                Object::Stream(stream) => {
                    if !data.is_empty() {
                        data.push(b'\n');
                    }
                    data.extend_from_slice(&stream.decoded()?);
                }
                Object::Null => {}
                other => tracing::warn!(page = %self.id, found = other.type_name(), "content entry is not a stream"),
            }
        }
        Ok(data)
    }

    pub fn contents(&self, objects: &mut IndirectObjects) -> Result<Contents> {
        let data = self.content_bytes(objects)?;
        Ok(Contents::parse(&data)?)
    }

    /// Writes `contents` back as the page's single content stream.
    ///
    /// A page with one indirect content stream keeps it; otherwise a new
    /// stream is registered and `Contents` points at it.
    pub fn set_contents(&self, objects: &mut IndirectObjects, contents: &Contents) -> Result<()> {
        let data = contents.to_bytes();
        let compress = cfg!(feature = "compression");
        let page = self.dictionary(objects)?;

        if let Some(id) = page.get_reference("Contents") {
            if let Some(object) = objects.get_mut(id.number())? {
                if let Object::Stream(stream) = object.data_mut() {
                    stream.set_decoded_data(data, compress)?;
                    return Ok(());
                }
            }
        }

        let mut stream = Stream::new(Vec::new());
        stream.set_decoded_data(data, compress)?;
        let stream_id = objects.add(stream);
        self.dictionary_mut(objects, |page| page.set("Contents", stream_id))
    }

    fn dictionary_mut(&self, objects: &mut IndirectObjects, edit: impl FnOnce(&mut Dictionary)) -> Result<()> {
        let id = self.id;
        let page = objects
            .get_mut(id.number())?
            .and_then(|object| object.data_mut().as_dict_mut())
            .ok_or(PdfError::InvalidObjectReference(id.number(), id.generation()))?;
        edit(page);
        Ok(())
    }

    /// Everything needed to scan this page without the registry.
    pub fn content_context(&self, objects: &mut IndirectObjects) -> Result<ContentContext> {
        Ok(ContentContext {
            contents: self.contents(objects)?,
            resources: self.resources(objects)?,
            media_box: self.media_box(objects)?,
            rotation: self.rotation(objects)?,
        })
    }
}

/// Contents of a page together with its resources and geometry.
#[derive(Debug, Clone)]
pub struct ContentContext {
    pub contents: Contents,
    pub resources: Resources,
    pub media_box: Rectangle,
    pub rotation: Rotation,
}

impl ContentContext {
    /// Scanner in user space.
    pub fn scanner(&self) -> ContentScanner<'_> {
        ContentScanner::new(self.contents.clone(), &self.resources)
    }

    /// Scanner whose initial CTM maps the page onto a `width` x `height`
    /// canvas.
    pub fn scanner_for_canvas(&self, width: f64, height: f64) -> ContentScanner<'_> {
        self.scanner()
            .with_device(self.media_box, self.rotation, (width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pages node with one page that inherits from it.
    fn tree(objects: &mut IndirectObjects, page: Dictionary) -> Page {
        let pages_id = objects.add(Object::Null);
        let mut page = page;
        page.set("Parent", pages_id);
        let page_id = objects.add(page);

        let mut pages = Dictionary::new();
        pages.set("Type", Object::name("Pages"));
        pages.set("Kids", Object::Array(vec![page_id.into()]));
        pages.set("Count", 1);
        pages.set("Rotate", 90);
        pages.set("MediaBox", PageFormat::Letter.to_rectangle().to_object());
        if let Some(object) = objects.get_mut(pages_id.number()).unwrap() {
            *object.data_mut() = Object::Dictionary(pages);
        }
        Page::new(page_id)
    }

    #[test]
    fn test_inherited_attributes() {
        let mut objects = IndirectObjects::new();
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Page"));
        let page = tree(&mut objects, dict);

        assert_eq!(page.rotation(&mut objects).unwrap(), Rotation::Right);
        assert_eq!(page.media_box(&mut objects).unwrap(), PageFormat::Letter.to_rectangle());
        assert!(page.resources(&mut objects).unwrap().is_empty());
    }

    #[test]
    fn test_page_value_wins_over_parent() {
        let mut objects = IndirectObjects::new();
        let page = tree(&mut objects, Page::create(PageFormat::A5.to_rectangle()));
        assert_eq!(page.media_box(&mut objects).unwrap(), PageFormat::A5.to_rectangle());
    }

    #[test]
    fn test_missing_media_box_defaults_to_a4() {
        let mut objects = IndirectObjects::new();
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Page"));
        let page = Page::new(objects.add(dict));
        assert_eq!(page.media_box(&mut objects).unwrap(), PageFormat::A4.to_rectangle());
        assert_eq!(page.rotation(&mut objects).unwrap(), Rotation::Up);
    }

    #[test]
    fn test_contents_are_concatenated() {
        let mut objects = IndirectObjects::new();
        let first = objects.add(Stream::new(b"q 1 0 0 1 5 5 cm".to_vec()));
        let second = objects.add(Stream::new(b"Q".to_vec()));
        let mut dict = Page::create(PageFormat::A4.to_rectangle());
        dict.set("Contents", Object::Array(vec![first.into(), second.into()]));
        let page = Page::new(objects.add(dict));

        assert_eq!(page.content_bytes(&mut objects).unwrap(), b"q 1 0 0 1 5 5 cm\nQ");
        let contents = page.contents(&mut objects).unwrap();
        assert_eq!(contents.len(), 1);
    }

    #[test]
    fn test_set_contents_replaces_array_with_one_stream() {
        let mut objects = IndirectObjects::new();
        let first = objects.add(Stream::new(b"0 g".to_vec()));
        let mut dict = Page::create(PageFormat::A4.to_rectangle());
        dict.set("Contents", Object::Array(vec![first.into()]));
        let page = Page::new(objects.add(dict));

        let mut contents = page.contents(&mut objects).unwrap();
        contents.push(crate::content::Operation::new("w", vec![Object::Integer(2)]));
        page.set_contents(&mut objects, &contents).unwrap();

        let reference = page.dictionary(&mut objects).unwrap().get_reference("Contents").unwrap();
        assert_ne!(reference, first);
        assert_eq!(page.content_bytes(&mut objects).unwrap(), b"0 g\n2 w\n");

        // A second write reuses the stream.
        page.set_contents(&mut objects, &Contents::default()).unwrap();
        assert_eq!(page.dictionary(&mut objects).unwrap().get_reference("Contents"), Some(reference));
        assert!(page.content_bytes(&mut objects).unwrap().is_empty());
    }

    #[test]
    fn test_content_context_scans_on_canvas() {
        let mut objects = IndirectObjects::new();
        let mut dict = Page::create(Rectangle::from_position_and_size(0.0, 0.0, 100.0, 100.0));
        let stream = objects.add(Stream::new(b"3 w".to_vec()));
        dict.set("Contents", stream);
        let page = Page::new(objects.add(dict));

        let context = page.content_context(&mut objects).unwrap();
        let mut scanner = context.scanner_for_canvas(200.0, 200.0);
        scanner.move_end().unwrap();
        assert_eq!(scanner.state().line_width, 3.0);
        assert_eq!(scanner.state().ctm.a, 2.0);
        assert_eq!(scanner.state().ctm.d, -2.0);
    }
}
