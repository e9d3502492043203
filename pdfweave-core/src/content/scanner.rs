//! Content scanner: walks a content object tree while tracking the
//! graphics state of each nesting level.

use crate::document::{FormXObject, ResourceKind, Resources};
use crate::geometry::{Matrix, Rectangle, Rotation};
use crate::objects::Object;

use super::contents::Contents;
use super::objects::{CompositeKind, ContentObject, InlineImage};
use super::operation::Operation;
use super::state::GraphicsState;
use super::ContentError;

/// Callbacks driven by [`ContentScanner::render`].
///
/// Every callback receives the state in effect *before* the object is
/// applied.
#[allow(unused_variables)]
pub trait ScanHandler {
    fn operation(&mut self, op: &Operation, state: &GraphicsState) {}

    fn begin_composite(&mut self, kind: &CompositeKind, state: &GraphicsState) {}

    /// Called with the state at the end of the composite's children.
    fn end_composite(&mut self, kind: &CompositeKind, state: &GraphicsState) {}

    /// `Do` with the resolved XObject, if the name is known. Forms are
    /// scanned afterwards as a child level.
    fn xobject(&mut self, name: &str, xobject: Option<&Object>, state: &GraphicsState) {}

    fn inline_image(&mut self, image: &InlineImage, state: &GraphicsState) {}

    fn shading(&mut self, name: &str, shading: Option<&Object>, state: &GraphicsState) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Root,
    /// Children of a composite in the parent's list.
    Composite,
    /// Content of a Form XObject; edits are not written back.
    Form,
}

/// One level of a content scan.
///
/// A level is positioned before its first object (`index == -1`), on an
/// object, or after its last one (`index == len`). The state always
/// reflects every object before the current one. Composite objects are
/// scanned through a child level whose initial state is a clone of this
/// level's state.
pub struct ContentScanner<'r> {
    objects: Vec<ContentObject>,
    index: isize,
    state: GraphicsState,
    initial_state: GraphicsState,
    resources: &'r Resources,
    child: Option<Box<ContentScanner<'r>>>,
    origin: Origin,
    dirty: bool,
}

impl<'r> ContentScanner<'r> {
    pub fn new(contents: Contents, resources: &'r Resources) -> Self {
        Self::with_state(contents, resources, GraphicsState::default())
    }

    pub fn with_state(contents: Contents, resources: &'r Resources, state: GraphicsState) -> Self {
        Self::level(contents.objects().to_vec(), resources, state, Origin::Root)
    }

    fn level(
        objects: Vec<ContentObject>,
        resources: &'r Resources,
        state: GraphicsState,
        origin: Origin,
    ) -> Self {
        Self {
            objects,
            index: -1,
            initial_state: state.clone(),
            state,
            resources,
            child: None,
            origin,
            dirty: false,
        }
    }

    /// Scanner over a form's content. The form matrix is applied after
    /// the parent CTM; the form's own resources take over when present.
    pub fn for_form(form: &'r FormXObject, parent_state: &GraphicsState, parent_resources: &'r Resources) -> Self {
        let mut state = parent_state.clone();
        state.ctm = form.matrix.concat(&parent_state.ctm);
        let resources = form.resources.as_deref().unwrap_or(parent_resources);
        Self::level(form.contents.objects().to_vec(), resources, state, Origin::Form)
    }

    /// Runs `on_start` on the initial state before scanning begins.
    pub fn with_on_start(mut self, on_start: impl FnOnce(&mut GraphicsState)) -> Self {
        on_start(&mut self.initial_state);
        self.reset();
        self
    }

    /// Device-dependent scan: the initial CTM maps `content_box` onto a
    /// `canvas` (width, height) with a top-left origin, honoring `rotation`.
    pub fn with_device(self, content_box: Rectangle, rotation: Rotation, canvas: (f64, f64)) -> Self {
        let (width, height) = canvas;
        let (sx, sy) = if rotation.is_sideways() {
            (height / content_box.width(), width / content_box.height())
        } else {
            (width / content_box.width(), height / content_box.height())
        };
        let ctm = Matrix::translate(-content_box.lower_left.x, -content_box.lower_left.y)
            .concat(&Matrix::scale(sx, sy))
            .concat(&rotation.device_matrix(width, height));
        tracing::debug!(?rotation, width, height, "device scan");
        self.with_on_start(|state| state.ctm = ctm)
    }

    pub fn state(&self) -> &GraphicsState {
        &self.state
    }

    pub fn resources(&self) -> &'r Resources {
        self.resources
    }

    pub fn index(&self) -> isize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn current(&self) -> Option<&ContentObject> {
        usize::try_from(self.index)
            .ok()
            .and_then(|index| self.objects.get(index))
    }

    /// Back to before the first object with the initial state.
    fn reset(&mut self) {
        self.close_child();
        self.index = -1;
        self.state = self.initial_state.clone();
    }

    /// Positions on the first object. Returns `false` if there is none.
    pub fn move_first(&mut self) -> Result<bool, ContentError> {
        self.reset();
        self.move_next()
    }

    /// Applies the current object and advances. Returns `false` once past
    /// the last object.
    pub fn move_next(&mut self) -> Result<bool, ContentError> {
        let len = self.objects.len() as isize;
        if self.index >= len {
            return Ok(false);
        }
        if self.index >= 0 {
            self.apply_current()?;
        }
        self.index += 1;
        Ok(self.index < len)
    }

    /// Moves to `index`, replaying from the start when moving backwards.
    pub fn move_to(&mut self, index: usize) -> Result<bool, ContentError> {
        let target = index as isize;
        if target < self.index {
            self.reset();
        }
        while self.index < target {
            if !self.move_next()? {
                break;
            }
        }
        Ok(self.index == target)
    }

    /// Applies every remaining object.
    pub fn move_end(&mut self) -> Result<(), ContentError> {
        while self.move_next()? {}
        Ok(())
    }

    fn apply_current(&mut self) -> Result<(), ContentError> {
        let Ok(index) = usize::try_from(self.index) else {
            return Ok(());
        };
        // Local state blocks, forms and shadings leave the state untouched.
        let inherits = match self.objects.get(index) {
            None => return Ok(()),
            Some(ContentObject::Operation(op)) => return self.state.apply(op, Some(self.resources)),
            Some(ContentObject::Composite(composite)) => matches!(
                composite.kind,
                CompositeKind::Path
                    | CompositeKind::Text
                    | CompositeKind::MarkedContent(_)
                    | CompositeKind::InlineImage(_)
            ),
        };
        if let Some(child) = self.child_level() {
            child.move_end()?;
        }
        if let Some(child) = self.close_child() {
            if inherits {
                self.state = child.state;
            }
        }
        Ok(())
    }

    /// Child level for the current composite, opened on first access.
    pub fn child_level(&mut self) -> Option<&mut ContentScanner<'r>> {
        if self.child.is_none() {
            self.child = self.open_child().map(Box::new);
        }
        self.child.as_deref_mut()
    }

    fn open_child(&self) -> Option<ContentScanner<'r>> {
        let ContentObject::Composite(composite) = self.current()? else {
            return None;
        };
        let mut state = self.state.clone();
        match &composite.kind {
            CompositeKind::XObject(_) => {
                let name = composite.resource_name()?;
                let resources: &'r Resources = self.resources;
                match resources.form(name) {
                    Some(form) => Some(ContentScanner::for_form(form, &state, resources)),
                    None => Some(Self::level(composite.objects.clone(), self.resources, state, Origin::Composite)),
                }
            }
            kind => {
                if matches!(kind, CompositeKind::Text) {
                    state.begin_text();
                }
                Some(Self::level(composite.objects.clone(), self.resources, state, Origin::Composite))
            }
        }
    }

    /// Closes the child level, writing its edits back into the current
    /// composite.
    fn close_child(&mut self) -> Option<Box<ContentScanner<'r>>> {
        let mut child = self.child.take()?;
        child.close_child();
        if child.dirty && child.origin == Origin::Composite {
            let index = self.index;
            if let Some(ContentObject::Composite(composite)) =
                usize::try_from(index).ok().and_then(|i| self.objects.get_mut(i))
            {
                composite.objects = std::mem::take(&mut child.objects);
                self.dirty = true;
            }
        }
        Some(child)
    }

    /// Replaces the current object. The child level is rebuilt on next
    /// access since the new object may not be a composite.
    pub fn set_current(&mut self, object: impl Into<ContentObject>) -> Option<ContentObject> {
        self.close_child();
        let index = usize::try_from(self.index).ok()?;
        let slot = self.objects.get_mut(index)?;
        self.dirty = true;
        Some(std::mem::replace(slot, object.into()))
    }

    /// Inserts before the current object, which becomes the new one.
    pub fn insert(&mut self, object: impl Into<ContentObject>) {
        self.close_child();
        let index = self.index.clamp(0, self.objects.len() as isize) as usize;
        self.objects.insert(index, object.into());
        self.index = index as isize;
        self.dirty = true;
    }

    /// Removes the current object; the next one becomes current.
    pub fn remove(&mut self) -> Option<ContentObject> {
        self.close_child();
        let index = usize::try_from(self.index).ok()?;
        if index >= self.objects.len() {
            return None;
        }
        self.dirty = true;
        Some(self.objects.remove(index))
    }

    /// Whether objects of this level (or a closed child) were edited.
    pub fn is_modified(&self) -> bool {
        self.dirty
    }

    /// Objects of this level including edits made through child levels.
    pub fn into_contents(mut self) -> Contents {
        self.close_child();
        Contents::new(self.objects)
    }

    /// Scans from the start, reporting every object to `handler`.
    pub fn render(&mut self, handler: &mut dyn ScanHandler) -> Result<(), ContentError> {
        self.reset();
        while self.move_next()? {
            self.render_current(handler)?;
        }
        Ok(())
    }

    fn render_current(&mut self, handler: &mut dyn ScanHandler) -> Result<(), ContentError> {
        let Some(current) = self.current() else {
            return Ok(());
        };
        let composite = match current {
            ContentObject::Operation(op) => {
                handler.operation(op, &self.state);
                return Ok(());
            }
            ContentObject::Composite(composite) => composite,
        };

        handler.begin_composite(&composite.kind, &self.state);
        match &composite.kind {
            CompositeKind::XObject(_) => {
                let name = composite.resource_name().unwrap_or_default();
                let xobject = self.resources.get(ResourceKind::XObject, name);
                if xobject.is_none() {
                    tracing::warn!(name, "XObject not found in resources");
                }
                handler.xobject(name, xobject, &self.state);
            }
            CompositeKind::Shading(_) => {
                let name = composite.resource_name().unwrap_or_default();
                handler.shading(name, self.resources.get(ResourceKind::Shading, name), &self.state);
            }
            CompositeKind::InlineImage(image) => handler.inline_image(image, &self.state),
            _ => {}
        }

        let kind = composite.kind.clone();
        let end_state = match self.child_level() {
            Some(child) => {
                child.render(handler)?;
                child.state.clone()
            }
            None => self.state.clone(),
        };
        handler.end_composite(&kind, &end_state);
        Ok(())
    }
}
