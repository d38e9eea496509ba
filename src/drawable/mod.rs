// Drawable tree: one renderable node per source element
mod draw;
mod factory;

pub use self::draw::record_picture;
pub use self::factory::{DrawableFactory, ReferenceChain};

use crate::disposal::ResourceScope;
use crate::document::{ElementId, TextAnchor};
use bitflags::bitflags;
use skia_safe::{Font, Image, Matrix, Paint, Path, Point, Rect};
use slab::Slab;
use std::ops::{Index, IndexMut};

/// Index of a drawable in its [`DrawableTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableId(pub(crate) usize);

impl DrawableId {
    pub fn index(&self) -> usize {
        self.0
    }
}

bitflags! {
    /// Attributes skipped while post-processing or drawing a drawable
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct IgnoreAttributes: u8 {
        const CLIP      = 0b00001;
        const CLIP_PATH = 0b00010;
        const MASK      = 0b00100;
        const OPACITY   = 0b01000;
        const FILTER    = 0b10000;
        const ALL = Self::CLIP.bits() | Self::CLIP_PATH.bits() | Self::MASK.bits()
            | Self::OPACITY.bits() | Self::FILTER.bits();
    }
}

/// What kind of element produced a container drawable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Fragment,
    Group,
    Switch,
    Anchor,
    Use,
    Symbol,
    Mask,
    Marker,
    Pattern,
}

pub enum DrawableKind {
    Container {
        kind: ContainerKind,
        children: Vec<DrawableId>,
    },
    Shape {
        path: Path,
        markers: Vec<DrawableId>,
    },
    Image {
        image: Image,
        src: Rect,
        dst: Rect,
    },
    Text {
        text: String,
        font: Font,
        origin: Point,
        anchor: TextAnchor,
    },
}

impl DrawableKind {
    pub fn children(&self) -> &[DrawableId] {
        match self {
            DrawableKind::Container { children, .. } => children,
            _ => &[],
        }
    }
}

/// Mask sub-drawable and the paints compositing it onto the masked content
pub struct MaskLayer {
    pub drawable: DrawableId,
    /// Isolating layer around the masked content
    pub layer_paint: Paint,
    /// Luminance-to-alpha dst-in layer the mask content is drawn into
    pub dst_in_paint: Paint,
    pub region: Rect,
}

pub struct FilterLayer {
    pub paint: Paint,
    pub region: Rect,
}

pub struct Drawable {
    pub element: ElementId,
    pub parent: Option<DrawableId>,
    pub kind: DrawableKind,
    pub is_drawable: bool,
    pub is_antialias: bool,
    /// Bounds in local coordinates, before `transform`
    pub geometry_bounds: Rect,
    /// `geometry_bounds` mapped through `transform`, axis aligned
    pub transformed_bounds: Rect,
    pub transform: Matrix,
    /// Viewport clip applied before `transform`
    pub overflow: Option<Rect>,
    /// `clip` property rectangle, applied after `transform`
    pub clip: Option<Rect>,
    pub clip_path: Option<Path>,
    pub mask: Option<MaskLayer>,
    pub opacity: Option<Paint>,
    pub filter: Option<FilterLayer>,
    pub fill: Option<Paint>,
    pub stroke: Option<Paint>,
    pub resources: ResourceScope,
}

impl Drawable {
    pub fn new(element: ElementId, parent: Option<DrawableId>, kind: DrawableKind) -> Self {
        Self {
            element,
            parent,
            kind,
            is_drawable: true,
            is_antialias: true,
            geometry_bounds: Rect::new_empty(),
            transformed_bounds: Rect::new_empty(),
            transform: Matrix::new_identity(),
            overflow: None,
            clip: None,
            clip_path: None,
            mask: None,
            opacity: None,
            filter: None,
            fill: None,
            stroke: None,
            resources: ResourceScope::new(),
        }
    }

    pub fn children(&self) -> &[DrawableId] {
        self.kind.children()
    }

    /// Recompute `transformed_bounds` from `geometry_bounds` and `transform`
    pub fn update_transformed_bounds(&mut self) {
        self.transformed_bounds = if self.geometry_bounds.is_empty() {
            Rect::new_empty()
        } else {
            self.transform.map_rect(self.geometry_bounds).0
        };
    }
}

/// Arena of drawables addressed by [`DrawableId`]
#[derive(Default)]
pub struct DrawableTree {
    nodes: Slab<Drawable>,
    root: Option<DrawableId>,
}

impl DrawableTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, drawable: Drawable) -> DrawableId {
        DrawableId(self.nodes.insert(drawable))
    }

    pub fn root(&self) -> Option<DrawableId> {
        self.root
    }

    pub fn set_root(&mut self, root: Option<DrawableId>) {
        self.root = root;
    }

    pub fn get(&self, id: DrawableId) -> Option<&Drawable> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: DrawableId) -> Option<&mut Drawable> {
        self.nodes.get_mut(id.0)
    }

    pub fn contains(&self, id: DrawableId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First drawable built for `element`
    pub fn find(&self, element: ElementId) -> Option<DrawableId> {
        self.nodes
            .iter()
            .filter(|(_, drawable)| drawable.element == element)
            .map(|(index, _)| DrawableId(index))
            .min()
    }

    /// Every drawable owned by `id`: children plus marker and mask sub-drawables
    pub fn owned(&self, id: DrawableId) -> Vec<DrawableId> {
        let drawable = &self[id];
        let mut owned: Vec<DrawableId> = drawable.children().to_vec();
        if let DrawableKind::Shape { markers, .. } = &drawable.kind {
            owned.extend(markers.iter().copied());
        }
        if let Some(mask) = &drawable.mask {
            owned.push(mask.drawable);
        }
        owned
    }

    /// Release `id` and everything it owns, children before parents. Returns the
    /// number of native resources released.
    pub fn dispose_subtree(&mut self, id: DrawableId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        let mut released = 0;
        for child in self.owned(id) {
            released += self.dispose_subtree(child);
        }
        let mut drawable = self.nodes.remove(id.0);
        released += drawable.resources.dispose();

        if let Some(parent) = drawable.parent.and_then(|parent| self.nodes.get_mut(parent.0)) {
            if let DrawableKind::Container { children, .. } = &mut parent.kind {
                children.retain(|child| *child != id);
            }
            if let DrawableKind::Shape { markers, .. } = &mut parent.kind {
                markers.retain(|marker| *marker != id);
            }
            if parent.mask.as_ref().is_some_and(|mask| mask.drawable == id) {
                parent.mask = None;
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
        tracing::trace!("disposed drawable {} ({} resources)", id.0, released);
        released
    }

    /// Release the whole tree
    pub fn dispose(&mut self) -> usize {
        let released = match self.root {
            Some(root) => self.dispose_subtree(root),
            None => 0,
        };
        // Detached sub-trees built for paint servers
        let leftovers: Vec<usize> = self.nodes.iter().map(|(index, _)| index).collect();
        let leftover_released: usize = leftovers
            .into_iter()
            .map(|index| self.dispose_subtree(DrawableId(index)))
            .sum();
        released + leftover_released
    }
}

impl Index<DrawableId> for DrawableTree {
    type Output = Drawable;

    fn index(&self, index: DrawableId) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl IndexMut<DrawableId> for DrawableTree {
    fn index_mut(&mut self, index: DrawableId) -> &mut Self::Output {
        &mut self.nodes[index.0]
    }
}
