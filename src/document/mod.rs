// Typed SVG element tree consumed by the renderer
mod elements;
mod values;

pub use self::elements::*;
pub use self::values::*;

use crate::error::{RenderError, Result};
use rustc_hash::FxHashMap;
use slab::Slab;
use std::ops::Index;

/// Index of an element in its [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Presentation attributes. `None` means "not specified on this element": inherited
/// properties then come from the nearest ancestor that sets them.
#[derive(Debug, Clone, Default)]
pub struct Presentation {
    // Inherited
    pub fill: Option<PaintServer>,
    pub fill_opacity: Option<f32>,
    pub fill_rule: Option<FillRule>,
    pub stroke: Option<PaintServer>,
    pub stroke_width: Option<Length>,
    pub stroke_opacity: Option<f32>,
    pub stroke_linecap: Option<LineCap>,
    pub stroke_linejoin: Option<LineJoin>,
    pub stroke_miterlimit: Option<f32>,
    pub stroke_dasharray: Option<Vec<Length>>,
    pub stroke_dashoffset: Option<Length>,
    pub clip_rule: Option<FillRule>,
    pub color: Option<Rgba>,
    pub visibility: Option<Visibility>,
    pub marker_start: Option<String>,
    pub marker_mid: Option<String>,
    pub marker_end: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<Length>,
    pub text_anchor: Option<TextAnchor>,
    pub shape_rendering: Option<ShapeRendering>,

    // Not inherited
    pub opacity: Option<f32>,
    pub display: Option<Display>,
    pub overflow: Option<Overflow>,
    pub clip: Option<ClipOffsets>,
    pub transform: TransformList,
    pub clip_path: Option<String>,
    pub mask: Option<String>,
    pub filter: Option<String>,
}

/// Conditional processing attributes; `None` means the attribute is absent
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    pub required_features: Option<Vec<String>>,
    pub required_extensions: Option<Vec<String>>,
    pub system_language: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: Option<String>,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub kind: ElementKind,
    pub style: Presentation,
    pub conditions: Conditions,
}

impl Element {
    fn new(kind: ElementKind, parent: Option<ElementId>) -> Self {
        Self {
            id: None,
            parent,
            children: Vec::new(),
            kind,
            style: Presentation::default(),
            conditions: Conditions::default(),
        }
    }
}

/// Arena of elements addressed by [`ElementId`], with an `id` attribute index
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Slab<Element>,
    ids: FxHashMap<String, ElementId>,
    root: Option<ElementId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the root element, replacing any previous root
    pub fn create_root(&mut self, kind: ElementKind) -> ElementId {
        let id = ElementId(self.nodes.insert(Element::new(kind, None)));
        self.root = Some(id);
        id
    }

    /// Append a new element as the last child of `parent`
    pub fn append(&mut self, parent: ElementId, kind: ElementKind) -> ElementId {
        let id = ElementId(self.nodes.insert(Element::new(kind, Some(parent))));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.nodes.get(id.0)
    }

    pub fn element_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.nodes[id.0]
    }

    pub fn style_mut(&mut self, id: ElementId) -> &mut Presentation {
        &mut self.nodes[id.0].style
    }

    pub fn kind(&self, id: ElementId) -> &ElementKind {
        &self.nodes[id.0].kind
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.nodes[id.0].parent
    }

    /// Set the `id` attribute, registering it for reference lookup
    pub fn set_id(&mut self, element: ElementId, name: impl Into<String>) {
        let name = name.into();
        if let Some(old) = self.nodes[element.0].id.take() {
            self.ids.remove(&old);
        }
        self.ids.insert(name.clone(), element);
        self.nodes[element.0].id = Some(name);
    }

    /// Look up an element by `id`, accepting both `name` and `#name` / `url(#name)`
    pub fn lookup(&self, reference: &str) -> Option<ElementId> {
        let reference = reference.trim();
        let reference = reference
            .strip_prefix("url(")
            .and_then(|r| r.strip_suffix(')'))
            .unwrap_or(reference)
            .trim();
        let name = reference.strip_prefix('#').unwrap_or(reference);
        self.ids.get(name).copied()
    }

    /// Like [`Document::lookup`], failing with [`RenderError::UnknownReference`]
    pub fn require(&self, reference: &str) -> Result<ElementId> {
        self.lookup(reference)
            .ok_or_else(|| RenderError::UnknownReference(reference.to_string()))
    }

    /// Iterate over `id` and then each of its ancestors
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(Some(id), move |current| self.nodes[current.0].parent)
    }

    /// First value set on `id` or any ancestor for an inherited property
    pub fn inherited<T>(&self, id: ElementId, get: impl Fn(&Presentation) -> Option<T>) -> Option<T> {
        self.ancestors(id).find_map(|ancestor| get(&self.nodes[ancestor.0].style))
    }

    /// Nearest ancestor (excluding `id`) that is an `<svg>` fragment
    pub fn nearest_viewport(&self, id: ElementId) -> Option<ElementId> {
        self.ancestors(id)
            .skip(1)
            .find(|ancestor| matches!(self.nodes[ancestor.0].kind, ElementKind::Svg(_)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Index<ElementId> for Document {
    type Output = Element;

    fn index(&self, index: ElementId) -> &Self::Output {
        &self.nodes[index.0]
    }
}
