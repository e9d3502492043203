//! The content object tree.

use crate::objects::{Dictionary, Object};
use crate::writer::write_object_value;

use super::operation::operators::*;
use super::operation::Operation;

/// Inline image: abbreviated header plus raw sample bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub header: Dictionary,
    pub data: Vec<u8>,
}

impl InlineImage {
    /// Header value by full or abbreviated key (`Width` or `W`).
    pub fn get(&self, key: &str, abbreviation: &str) -> Option<&Object> {
        self.header.get(key).or_else(|| self.header.get(abbreviation))
    }

    pub fn width(&self) -> Option<i64> {
        self.get("Width", "W").and_then(Object::as_integer)
    }

    pub fn height(&self) -> Option<i64> {
        self.get("Height", "H").and_then(Object::as_integer)
    }
}

/// What a composite object groups.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositeKind {
    /// Path construction operators followed by painting/clipping.
    Path,
    /// `BT` ... `ET`
    Text,
    /// `q` ... `Q`
    LocalGraphicsState,
    /// `BMC`/`BDC` ... `EMC`; holds the opening operation.
    MarkedContent(Operation),
    /// `BI` ... `ID` ... `EI`
    InlineImage(InlineImage),
    /// `Do`; the resource name is resolved at scan time.
    XObject(Operation),
    /// `sh`; the resource name is resolved at scan time.
    Shading(Operation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeObject {
    pub kind: CompositeKind,
    pub objects: Vec<ContentObject>,
}

impl CompositeObject {
    pub fn new(kind: CompositeKind, objects: Vec<ContentObject>) -> Self {
        Self { kind, objects }
    }

    /// Resource name of an `XObject` or `Shading` composite.
    pub fn resource_name(&self) -> Option<&str> {
        match &self.kind {
            CompositeKind::XObject(op) | CompositeKind::Shading(op) => {
                op.operands.first().and_then(Object::as_name)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentObject {
    Operation(Operation),
    Composite(CompositeObject),
}

impl ContentObject {
    pub fn as_operation(&self) -> Option<&Operation> {
        match self {
            ContentObject::Operation(op) => Some(op),
            ContentObject::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeObject> {
        match self {
            ContentObject::Composite(composite) => Some(composite),
            ContentObject::Operation(_) => None,
        }
    }

    pub fn as_composite_mut(&mut self) -> Option<&mut CompositeObject> {
        match self {
            ContentObject::Composite(composite) => Some(composite),
            ContentObject::Operation(_) => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, ContentObject::Composite(_))
    }

    /// Appends the content stream syntax for this object.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            ContentObject::Operation(op) => write_operation(out, op),
            ContentObject::Composite(composite) => {
                let (open, close) = match &composite.kind {
                    CompositeKind::Path => (None, None),
                    CompositeKind::Text => (Some(Operation::new(BEGIN_TEXT, vec![])), Some(END_TEXT)),
                    CompositeKind::LocalGraphicsState => {
                        (Some(Operation::new(SAVE_STATE, vec![])), Some(RESTORE_STATE))
                    }
                    CompositeKind::MarkedContent(op) => (Some(op.clone()), Some(END_MARKED_CONTENT)),
                    CompositeKind::XObject(op) | CompositeKind::Shading(op) => (Some(op.clone()), None),
                    CompositeKind::InlineImage(image) => {
                        write_inline_image(out, image);
                        return;
                    }
                };
                if let Some(open) = open {
                    write_operation(out, &open);
                }
                for child in &composite.objects {
                    child.write_to(out);
                }
                if let Some(close) = close {
                    out.extend_from_slice(close.as_bytes());
                    out.push(b'\n');
                }
            }
        }
    }
}

impl From<Operation> for ContentObject {
    fn from(op: Operation) -> Self {
        ContentObject::Operation(op)
    }
}

impl From<CompositeObject> for ContentObject {
    fn from(composite: CompositeObject) -> Self {
        ContentObject::Composite(composite)
    }
}

fn write_operation(out: &mut Vec<u8>, op: &Operation) {
    for operand in &op.operands {
        write_object_value(out, operand);
        out.push(b' ');
    }
    out.extend_from_slice(op.operator.as_bytes());
    out.push(b'\n');
}

fn write_inline_image(out: &mut Vec<u8>, image: &InlineImage) {
    out.extend_from_slice(BEGIN_INLINE_IMAGE.as_bytes());
    for (key, value) in image.header.iter() {
        out.push(b' ');
        write_object_value(out, &Object::name(key.as_str()));
        out.push(b' ');
        write_object_value(out, value);
    }
    out.push(b' ');
    out.extend_from_slice(BEGIN_INLINE_IMAGE_DATA.as_bytes());
    out.push(b' ');
    out.extend_from_slice(&image.data);
    out.push(b'\n');
    out.extend_from_slice(END_INLINE_IMAGE.as_bytes());
    out.push(b'\n');
}
