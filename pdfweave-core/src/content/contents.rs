use crate::parser::{ParseOptions, ParseResult};

use super::objects::ContentObject;
use super::parser::ContentParser;

/// Parsed content of a page or form.
///
/// Edits stay in memory until [`Contents::to_bytes`] is written back with
/// `Page::set_contents`; nothing is synchronized automatically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contents {
    objects: Vec<ContentObject>,
}

impl Contents {
    pub fn new(objects: Vec<ContentObject>) -> Self {
        Self { objects }
    }

    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        Self::parse_with_options(data, &ParseOptions::default())
    }

    pub fn parse_with_options(data: &[u8], options: &ParseOptions) -> ParseResult<Self> {
        let objects = ContentParser::new(data, options).parse_content_objects()?;
        tracing::debug!(objects = objects.len(), bytes = data.len(), "content parsed");
        Ok(Self { objects })
    }

    pub fn objects(&self) -> &[ContentObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut Vec<ContentObject> {
        &mut self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn push(&mut self, object: impl Into<ContentObject>) {
        self.objects.push(object.into());
    }

    pub fn insert(&mut self, index: usize, object: impl Into<ContentObject>) {
        self.objects.insert(index, object.into());
    }

    pub fn remove(&mut self, index: usize) -> Option<ContentObject> {
        (index < self.objects.len()).then(|| self.objects.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentObject> {
        self.objects.iter()
    }

    /// Serializes the objects back into content stream syntax.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for object in &self.objects {
            object.write_to(&mut out);
        }
        out
    }
}
