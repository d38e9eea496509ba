// Build and post-process passes turning document elements into drawables

use super::{
    ContainerKind, Drawable, DrawableId, DrawableKind, DrawableTree, FilterLayer, IgnoreAttributes,
};
use crate::assets::AssetLoader;
use crate::clip;
use crate::config::RenderConfig;
use crate::document::{
    Display, Document, ElementId, ElementKind, Fragment, ImageElement, Length, Symbol, TextElement,
    Use, ViewBox, Visibility, PreserveAspectRatio,
};
use crate::filter::{FilterEvaluator, FilterResolution, FilterSource};
use crate::font::FontCache;
use crate::geometry;
use crate::marker;
use crate::paint::{self, PaintChannel};
use crate::units::{UnitAxis, UnitResolver, fit_rect, view_box_transform};
use skia_safe::{Matrix, Paint, Path, Point, Rect};
use smallvec::SmallVec;

/// Stack of elements currently being instantiated through references (`use`,
/// patterns, markers, masks). Entering an element already on the stack is a cycle.
#[derive(Debug, Default)]
pub struct ReferenceChain {
    stack: SmallVec<[ElementId; 8]>,
}

impl ReferenceChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `element`, returning `false` (and pushing nothing) if it is already on the chain
    pub fn enter(&mut self, element: ElementId) -> bool {
        if self.stack.contains(&element) {
            return false;
        }
        self.stack.push(element);
        true
    }

    pub fn leave(&mut self, element: ElementId) {
        if let Some(position) = self.stack.iter().rposition(|id| *id == element) {
            self.stack.remove(position);
        }
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.stack.contains(&element)
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Creates drawables for document elements
pub struct DrawableFactory<'a> {
    units: UnitResolver<'a>,
    loader: &'a dyn AssetLoader,
    fonts: FontCache,
}

impl<'a> DrawableFactory<'a> {
    pub fn new(document: &'a Document, config: &'a RenderConfig, loader: &'a dyn AssetLoader) -> Self {
        Self {
            units: UnitResolver::new(document, config),
            loader,
            fonts: FontCache::new(),
        }
    }

    pub fn units(&self) -> &UnitResolver<'a> {
        &self.units
    }

    pub fn loader(&self) -> &'a dyn AssetLoader {
        self.loader
    }

    fn document(&self) -> &'a Document {
        self.units.document()
    }

    /// Build the drawable for `element` and its subtree. Definitions and unknown
    /// kinds yield `None`. `owner_bounds` overrides the viewport size of an `svg`
    /// instantiated through `use`.
    pub fn create(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        owner_bounds: Option<Rect>,
        parent: Option<DrawableId>,
        ignore: IgnoreAttributes,
        refs: &mut ReferenceChain,
    ) -> Option<DrawableId> {
        let id = match self.document().kind(element) {
            ElementKind::Svg(fragment) => {
                self.create_fragment(tree, element, fragment, owner_bounds, parent, ignore, refs)
            }
            ElementKind::Group => self.create_group(tree, element, ContainerKind::Group, parent, ignore, refs),
            ElementKind::Anchor { .. } => {
                self.create_group(tree, element, ContainerKind::Anchor, parent, ignore, refs)
            }
            ElementKind::Switch => self.create_switch(tree, element, parent, ignore, refs),
            ElementKind::Use(use_element) => {
                self.create_use(tree, element, use_element, parent, ignore, refs)
            }
            ElementKind::Circle { .. }
            | ElementKind::Ellipse { .. }
            | ElementKind::Rect(_)
            | ElementKind::Line { .. }
            | ElementKind::Polyline { .. }
            | ElementKind::Polygon { .. }
            | ElementKind::Path { .. } => self.create_shape(tree, element, parent, refs)?,
            ElementKind::Image(image) => self.create_image(tree, element, image, parent)?,
            ElementKind::Text(text) => self.create_text(tree, element, text, parent, refs),
            ElementKind::Symbol(_)
            | ElementKind::Defs
            | ElementKind::LinearGradient(_)
            | ElementKind::RadialGradient(_)
            | ElementKind::Stop(_)
            | ElementKind::Pattern(_)
            | ElementKind::ClipPath(_)
            | ElementKind::Mask(_)
            | ElementKind::Marker(_)
            | ElementKind::Filter(_)
            | ElementKind::FilterPrimitive(_)
            | ElementKind::LightSource(_)
            | ElementKind::TransferFunction(_)
            | ElementKind::MergeNode { .. }
            | ElementKind::Unknown(_) => return None,
        };
        self.apply_common(tree, id, ignore);
        Some(id)
    }

    /// Build a container bound to `element` holding drawables for its children.
    /// Used for pattern tiles, mask content and marker content.
    pub fn create_content(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        kind: ContainerKind,
        parent: Option<DrawableId>,
        transform: Matrix,
        refs: &mut ReferenceChain,
    ) -> Option<DrawableId> {
        let id = tree.insert(Drawable::new(
            element,
            parent,
            DrawableKind::Container { kind, children: Vec::new() },
        ));
        tree[id].transform = transform;
        self.build_children(tree, element, id, IgnoreAttributes::empty(), refs);
        let drawable = &mut tree[id];
        drawable.update_transformed_bounds();
        if drawable.children().is_empty() {
            tree.dispose_subtree(id);
            return None;
        }
        Some(id)
    }

    fn insert_container(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        kind: ContainerKind,
        parent: Option<DrawableId>,
    ) -> DrawableId {
        tree.insert(Drawable::new(
            element,
            parent,
            DrawableKind::Container { kind, children: Vec::new() },
        ))
    }

    fn build_children(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        id: DrawableId,
        ignore: IgnoreAttributes,
        refs: &mut ReferenceChain,
    ) {
        let built: Vec<DrawableId> = self
            .document()
            .children(element)
            .iter()
            .filter_map(|child| self.create(tree, *child, None, Some(id), ignore, refs))
            .collect();
        if let DrawableKind::Container { children, .. } = &mut tree[id].kind {
            *children = built;
        }
        tree[id].geometry_bounds = union_children_bounds(tree, id);
    }

    fn create_group(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        kind: ContainerKind,
        parent: Option<DrawableId>,
        ignore: IgnoreAttributes,
        refs: &mut ReferenceChain,
    ) -> DrawableId {
        let id = self.insert_container(tree, element, kind, parent);
        self.build_children(tree, element, id, ignore, refs);
        id
    }

    /// Only the first child that passes its conditional tests is built
    fn create_switch(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        parent: Option<DrawableId>,
        ignore: IgnoreAttributes,
        refs: &mut ReferenceChain,
    ) -> DrawableId {
        let document = self.document();
        let id = self.insert_container(tree, element, ContainerKind::Switch, parent);
        let chosen = document
            .children(element)
            .iter()
            .copied()
            .find(|child| document.kind(*child).is_renderable() && self.conditions_pass(*child));
        let built: Vec<DrawableId> = chosen
            .and_then(|child| self.create(tree, child, None, Some(id), ignore, refs))
            .into_iter()
            .collect();
        if let DrawableKind::Container { children, .. } = &mut tree[id].kind {
            *children = built;
        }
        tree[id].geometry_bounds = union_children_bounds(tree, id);
        id
    }

    #[allow(clippy::too_many_arguments)]
    fn create_fragment(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        fragment: &Fragment,
        owner_bounds: Option<Rect>,
        parent: Option<DrawableId>,
        ignore: IgnoreAttributes,
        refs: &mut ReferenceChain,
    ) -> DrawableId {
        let units = &self.units;
        let x = units.to_device(fragment.x, UnitAxis::Horizontal, element, None);
        let y = units.to_device(fragment.y, UnitAxis::Vertical, element, None);
        let (width, height) = match owner_bounds {
            Some(bounds) => (bounds.width(), bounds.height()),
            None => (
                units.to_device(fragment.width, UnitAxis::Horizontal, element, None),
                units.to_device(fragment.height, UnitAxis::Vertical, element, None),
            ),
        };

        let id = self.insert_container(tree, element, ContainerKind::Fragment, parent);
        let viewport = Rect::from_xywh(x, y, width, height);
        self.establish_viewport(tree, id, element, viewport, fragment.view_box, &fragment.aspect, ignore);
        if width <= 0.0 || height <= 0.0 {
            tracing::debug!("svg element {} has an empty viewport", element.index());
            tree[id].is_drawable = false;
            return id;
        }
        self.build_children(tree, element, id, ignore, refs);
        id
    }

    /// Viewport mapping shared by `svg` and `symbol`: position, viewBox transform,
    /// overflow clip and the `clip` property
    #[allow(clippy::too_many_arguments)]
    fn establish_viewport(
        &self,
        tree: &mut DrawableTree,
        id: DrawableId,
        element: ElementId,
        viewport: Rect,
        view_box: Option<ViewBox>,
        aspect: &PreserveAspectRatio,
        ignore: IgnoreAttributes,
    ) {
        let style = &self.document()[element].style;
        let mut local = Matrix::translate((viewport.left, viewport.top));
        if let Some(view_box) = view_box.filter(ViewBox::is_valid) {
            local.pre_concat(&view_box_transform(&view_box, aspect, viewport.width(), viewport.height()));
        }

        let drawable = &mut tree[id];
        if !ignore.contains(IgnoreAttributes::CLIP) {
            if style.overflow.unwrap_or_default().clips() {
                drawable.overflow = Some(viewport);
            }
            if let Some(offsets) = style.clip {
                let clip = Rect::from_ltrb(
                    viewport.left + offsets.left.unwrap_or(0.0),
                    viewport.top + offsets.top.unwrap_or(0.0),
                    viewport.right - offsets.right.unwrap_or(0.0),
                    viewport.bottom - offsets.bottom.unwrap_or(0.0),
                );
                // Clip is applied after `local`, so bring it into content space
                drawable.clip = local.invert().map(|inverse| inverse.map_rect(clip).0);
            }
        }
        drawable.transform = local;
    }

    fn create_use(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        use_element: &Use,
        parent: Option<DrawableId>,
        ignore: IgnoreAttributes,
        refs: &mut ReferenceChain,
    ) -> DrawableId {
        let document = self.document();
        let units = &self.units;
        let id = self.insert_container(tree, element, ContainerKind::Use, parent);
        let x = units.to_device(use_element.x, UnitAxis::Horizontal, element, None);
        let y = units.to_device(use_element.y, UnitAxis::Vertical, element, None);
        tree[id].transform = Matrix::translate((x, y));

        let target = match document.require(&use_element.href) {
            Ok(target) => target,
            Err(error) => {
                tracing::warn!("use: {}", error);
                tree[id].is_drawable = false;
                return id;
            }
        };
        if document.ancestors(element).any(|ancestor| ancestor == target) || !refs.enter(target) {
            tracing::trace!("use reference cycle through {}", use_element.href);
            tree[id].is_drawable = false;
            return id;
        }

        let width = use_element.width.map(|w| units.to_device(w, UnitAxis::Horizontal, element, None));
        let height = use_element.height.map(|h| units.to_device(h, UnitAxis::Vertical, element, None));

        let child = match document.kind(target) {
            ElementKind::Symbol(symbol) => {
                let width = width.unwrap_or_else(|| units.to_device(Length::percent(100.0), UnitAxis::Horizontal, element, None));
                let height = height.unwrap_or_else(|| units.to_device(Length::percent(100.0), UnitAxis::Vertical, element, None));
                Some(self.create_symbol(tree, target, symbol, Rect::from_wh(width, height), id, ignore, refs))
            }
            ElementKind::Svg(_) if width.is_some() || height.is_some() => {
                let (default_width, default_height) = units.viewport_size(target);
                let bounds = Rect::from_wh(width.unwrap_or(default_width), height.unwrap_or(default_height));
                self.create(tree, target, Some(bounds), Some(id), ignore, refs)
            }
            _ => self.create(tree, target, None, Some(id), ignore, refs),
        };
        refs.leave(target);

        if let DrawableKind::Container { children, .. } = &mut tree[id].kind {
            children.extend(child);
        }
        tree[id].geometry_bounds = union_children_bounds(tree, id);
        id
    }

    #[allow(clippy::too_many_arguments)]
    fn create_symbol(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        symbol: &Symbol,
        viewport: Rect,
        parent: DrawableId,
        ignore: IgnoreAttributes,
        refs: &mut ReferenceChain,
    ) -> DrawableId {
        let id = self.insert_container(tree, element, ContainerKind::Symbol, Some(parent));
        self.establish_viewport(tree, id, element, viewport, symbol.view_box, &symbol.aspect, ignore);
        self.build_children(tree, element, id, ignore, refs);
        self.apply_common(tree, id, ignore);
        id
    }

    fn create_shape(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        parent: Option<DrawableId>,
        refs: &mut ReferenceChain,
    ) -> Option<DrawableId> {
        let geometry = match geometry::element_geometry(&self.units, element) {
            Ok(geometry) => geometry,
            Err(error) => {
                tracing::warn!("skipping <{}>: {}", self.document().kind(element).tag_name(), error);
                return None;
            }
        };

        let Some(geometry) = geometry else {
            tracing::debug!("<{}> {} has empty geometry", self.document().kind(element).tag_name(), element.index());
            let mut drawable = Drawable::new(element, parent, DrawableKind::Shape { path: Path::new(), markers: Vec::new() });
            drawable.is_drawable = false;
            return Some(tree.insert(drawable));
        };

        let bounds = geometry.bounds();
        let fill = paint::fill_channel(self, refs, element, bounds);
        let stroke = paint::stroke_channel(self, refs, element, bounds);
        let is_drawable = paint::channels_drawable(&fill, &stroke);
        if !is_drawable {
            tracing::debug!("<{}> {} has no usable paint", self.document().kind(element).tag_name(), element.index());
        }

        let mut drawable = Drawable::new(
            element,
            parent,
            DrawableKind::Shape { path: geometry.path.clone(), markers: Vec::new() },
        );
        drawable.resources.add(geometry.path);
        drawable.fill = drawable.resources.add_opt(fill.paint());
        drawable.stroke = drawable.resources.add_opt(stroke.paint());
        drawable.is_drawable = is_drawable;
        drawable.geometry_bounds = bounds;
        let id = tree.insert(drawable);

        if let (true, Some(outline)) = (is_drawable, geometry.outline.as_ref()) {
            let stroke_width = paint::stroke_width(&self.units, element);
            let markers = marker::build_markers(self, tree, id, outline, stroke_width, refs);
            if let DrawableKind::Shape { markers: slot, .. } = &mut tree[id].kind {
                *slot = markers;
            }
        }
        Some(id)
    }

    fn create_image(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        image_element: &ImageElement,
        parent: Option<DrawableId>,
    ) -> Option<DrawableId> {
        let image = match self.loader.load_image(&image_element.href) {
            Ok(image) => image,
            Err(error) => {
                tracing::warn!("skipping <image>: {}", error);
                return None;
            }
        };
        let units = &self.units;
        let (image_width, image_height) = (image.width() as f32, image.height() as f32);
        let viewport = Rect::from_xywh(
            units.to_device(image_element.x, UnitAxis::Horizontal, element, None),
            units.to_device(image_element.y, UnitAxis::Vertical, element, None),
            image_element
                .width
                .map(|w| units.to_device(w, UnitAxis::Horizontal, element, None))
                .unwrap_or(image_width),
            image_element
                .height
                .map(|h| units.to_device(h, UnitAxis::Vertical, element, None))
                .unwrap_or(image_height),
        );

        let src = Rect::from_wh(image_width, image_height);
        let dst = if image_element.aspect.align == crate::document::Align::None {
            viewport
        } else {
            fit_rect(image_width, image_height, &viewport, &image_element.aspect)
        };

        let mut drawable = Drawable::new(
            element,
            parent,
            DrawableKind::Image { image: image.clone(), src, dst },
        );
        drawable.resources.add(image);
        drawable.is_drawable = viewport.width() > 0.0 && viewport.height() > 0.0 && !src.is_empty();
        if image_element.aspect.slice {
            drawable.clip = Some(viewport);
            drawable.geometry_bounds = viewport;
        } else {
            drawable.geometry_bounds = dst;
        }
        let mut paint = Paint::default();
        paint.set_anti_alias(paint::is_antialias(units, element));
        drawable.fill = Some(drawable.resources.add(paint));
        Some(tree.insert(drawable))
    }

    fn create_text(
        &self,
        tree: &mut DrawableTree,
        element: ElementId,
        text: &TextElement,
        parent: Option<DrawableId>,
        refs: &mut ReferenceChain,
    ) -> DrawableId {
        let document = self.document();
        let units = &self.units;
        let family = document
            .inherited(element, |s| s.font_family.clone())
            .unwrap_or_else(|| units.config().default_font_family.clone());
        let font = self.fonts.font(&family, units.font_size(element));
        let anchor = document.inherited(element, |s| s.text_anchor).unwrap_or_default();
        let origin = Point::new(
            units.to_device(text.x, UnitAxis::Horizontal, element, None),
            units.to_device(text.y, UnitAxis::Vertical, element, None),
        );
        let content = text.content.split_whitespace().collect::<Vec<_>>().join(" ");

        let (advance, ink) = font.measure_str(&content, None);
        let shift = match anchor {
            crate::document::TextAnchor::Start => 0.0,
            crate::document::TextAnchor::Middle => -advance / 2.0,
            crate::document::TextAnchor::End => -advance,
        };
        let bounds = ink.with_offset((origin.x + shift, origin.y));

        let fill = paint::fill_channel(self, refs, element, bounds);
        let stroke = paint::stroke_channel(self, refs, element, bounds);
        let is_drawable = !content.is_empty() && paint::channels_drawable(&fill, &stroke);

        let mut drawable = Drawable::new(
            element,
            parent,
            DrawableKind::Text { text: content, font, origin, anchor },
        );
        drawable.fill = drawable.resources.add_opt(fill.paint());
        drawable.stroke = drawable.resources.add_opt(stroke.paint());
        drawable.is_drawable = is_drawable;
        drawable.geometry_bounds = bounds;
        tree.insert(drawable)
    }

    /// Attributes every drawable shares: transform, display, visibility,
    /// conditional processing and antialiasing
    fn apply_common(&self, tree: &mut DrawableTree, id: DrawableId, ignore: IgnoreAttributes) {
        let document = self.document();
        let element = tree[id].element;
        let style = &document[element].style;
        let is_leaf = !matches!(tree[id].kind, DrawableKind::Container { .. });

        let mut transform = style.transform.to_matrix();
        transform.pre_concat(&tree[id].transform);

        let hidden = is_leaf
            && matches!(
                document.inherited(element, |s| s.visibility),
                Some(Visibility::Hidden | Visibility::Collapse)
            );
        let displayed = style.display != Some(Display::None);
        let conditions = self.conditions_pass(element);
        if !displayed || hidden || !conditions {
            tracing::debug!(
                "<{}> {} not rendered (display: {}, hidden: {}, conditions: {})",
                document.kind(element).tag_name(),
                element.index(),
                displayed,
                hidden,
                conditions
            );
        }

        let drawable = &mut tree[id];
        drawable.transform = transform;
        drawable.is_drawable &= displayed && !hidden && conditions;
        drawable.is_antialias = paint::is_antialias(&self.units, element);
        if ignore.contains(IgnoreAttributes::CLIP) {
            drawable.overflow = None;
            drawable.clip = None;
        }
        if !drawable.is_drawable {
            drawable.geometry_bounds = Rect::new_empty();
        }
        drawable.update_transformed_bounds();
    }

    /// requiredFeatures, requiredExtensions and systemLanguage
    pub fn conditions_pass(&self, element: ElementId) -> bool {
        let config = self.units.config();
        let conditions = &self.document()[element].conditions;
        let features = conditions
            .required_features
            .as_ref()
            .is_none_or(|list| !list.is_empty() && list.iter().all(|f| config.has_feature(f)));
        let extensions = conditions
            .required_extensions
            .as_ref()
            .is_none_or(|list| !list.is_empty() && list.iter().all(|e| config.has_extension(e)));
        let language = conditions
            .system_language
            .as_ref()
            .is_none_or(|list| list.iter().any(|l| config.accepts_language(l)));
        features && extensions && language
    }

    /// Resolve clip-path, mask, opacity and filter once the whole tree exists.
    /// Children are processed before the drawable's own filter.
    pub fn post_process(
        &self,
        tree: &mut DrawableTree,
        id: DrawableId,
        ignore: IgnoreAttributes,
        refs: &mut ReferenceChain,
    ) {
        let Some(drawable) = tree.get(id) else {
            return;
        };
        if !drawable.is_drawable {
            return;
        }
        let element = drawable.element;
        let bounds = drawable.geometry_bounds;
        let style = &self.document()[element].style;

        if !ignore.contains(IgnoreAttributes::CLIP_PATH) {
            if let Some(reference) = &style.clip_path {
                let path = clip::resolve_clip_path(&self.units, reference, bounds);
                let drawable = &mut tree[id];
                drawable.clip_path = drawable.resources.add_opt(path);
            }
        }

        if !ignore.contains(IgnoreAttributes::MASK) {
            if let Some(reference) = &style.mask {
                let mask = clip::build_mask(self, tree, id, reference, bounds, refs);
                tree[id].mask = mask;
            }
        }

        if !ignore.contains(IgnoreAttributes::OPACITY) {
            let opacity = style.opacity.unwrap_or(1.0).clamp(0.0, 1.0);
            if opacity < 1.0 {
                let mut paint = Paint::default();
                paint.set_alpha_f(opacity);
                let drawable = &mut tree[id];
                drawable.opacity = Some(drawable.resources.add(paint));
            }
        }

        let mut children = tree[id].children().to_vec();
        if let DrawableKind::Shape { markers, .. } = &tree[id].kind {
            children.extend(markers.iter().copied());
        }
        for child in children {
            self.post_process(tree, child, ignore, refs);
        }

        // Children may have been dropped by an invalid filter
        let mut bounds = bounds;
        if matches!(tree[id].kind, DrawableKind::Container { .. }) {
            bounds = union_children_bounds(tree, id);
            let drawable = &mut tree[id];
            drawable.geometry_bounds = bounds;
            drawable.update_transformed_bounds();
        }

        if !ignore.contains(IgnoreAttributes::FILTER) {
            if let Some(reference) = &style.filter {
                let source = FilterSource::new(tree, id);
                let resolution = FilterEvaluator::new(self).evaluate(element, reference, bounds, &source, refs);
                match resolution {
                    FilterResolution::Absent => {}
                    FilterResolution::Applied { paint, region } => {
                        let drawable = &mut tree[id];
                        let paint = drawable.resources.add(paint);
                        drawable.filter = Some(FilterLayer { paint, region });
                    }
                    FilterResolution::Invalid => {
                        tracing::warn!("filter {} is invalid; <{}> not rendered", reference, self.document().kind(element).tag_name());
                        let drawable = &mut tree[id];
                        drawable.is_drawable = false;
                        drawable.geometry_bounds = Rect::new_empty();
                        drawable.transformed_bounds = Rect::new_empty();
                    }
                }
            }
        }
    }
}

/// Union of the transformed bounds of drawable children
pub(crate) fn union_children_bounds(tree: &DrawableTree, id: DrawableId) -> Rect {
    tree[id]
        .children()
        .iter()
        .map(|child| &tree[*child])
        .filter(|child| child.is_drawable && !child.transformed_bounds.is_empty())
        .fold(Rect::new_empty(), |mut bounds, child| {
            bounds.join(child.transformed_bounds);
            bounds
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LocalAssetLoader;
    use crate::document::{
        Conditions, PaintServer, RectShape, Rgba, Transform,
    };

    fn build(doc: &Document) -> DrawableTree {
        let config = RenderConfig::default();
        let factory = DrawableFactory::new(doc, &config, &LocalAssetLoader);
        let mut tree = DrawableTree::new();
        let mut refs = ReferenceChain::new();
        let root = factory.create(&mut tree, doc.root().unwrap(), None, None, IgnoreAttributes::empty(), &mut refs);
        tree.set_root(root);
        factory.post_process(&mut tree, root.unwrap(), IgnoreAttributes::empty(), &mut refs);
        assert!(refs.is_empty());
        tree
    }

    fn svg(doc: &mut Document) -> ElementId {
        doc.create_root(ElementKind::Svg(Fragment {
            width: Length::px(200.0),
            height: Length::px(200.0),
            ..Fragment::default()
        }))
    }

    fn circle(doc: &mut Document, parent: ElementId, cx: f32, cy: f32, r: f32) -> ElementId {
        doc.append(
            parent,
            ElementKind::Circle { cx: Length::number(cx), cy: Length::number(cy), r: Length::number(r) },
        )
    }

    #[test]
    fn circle_with_fill_is_drawable_with_bounds() {
        let mut doc = Document::new();
        let root = svg(&mut doc);
        let c = circle(&mut doc, root, 50.0, 50.0, 40.0);
        doc.style_mut(c).fill = Some(PaintServer::Color(Rgba::rgb(255, 0, 0)));

        let tree = build(&doc);
        let id = tree.find(c).unwrap();
        let drawable = &tree[id];
        assert!(drawable.is_drawable);
        assert_eq!(drawable.transformed_bounds, Rect::from_xywh(10.0, 10.0, 80.0, 80.0));
        assert_eq!(drawable.fill.as_ref().map(|p| p.color()), Some(skia_safe::Color::RED));
        assert!(drawable.stroke.is_none());
    }

    #[test]
    fn empty_rect_is_not_drawable() {
        let mut doc = Document::new();
        let root = svg(&mut doc);
        let rect = doc.append(
            root,
            ElementKind::Rect(RectShape { width: Length::ZERO, height: Length::number(10.0), ..RectShape::default() }),
        );
        let tree = build(&doc);
        let drawable = &tree[tree.find(rect).unwrap()];
        assert!(!drawable.is_drawable);
        assert!(drawable.transformed_bounds.is_empty());
    }

    #[test]
    fn group_bounds_union_translated_children() {
        let mut doc = Document::new();
        let root = svg(&mut doc);
        let group = doc.append(root, ElementKind::Group);
        circle(&mut doc, group, 10.0, 10.0, 10.0);
        let moved = circle(&mut doc, group, 10.0, 10.0, 10.0);
        doc.style_mut(moved).transform = Transform::Translate { x: 50.0, y: 0.0 }.into();

        let tree = build(&doc);
        let drawable = &tree[tree.find(group).unwrap()];
        assert_eq!(drawable.geometry_bounds, Rect::from_ltrb(0.0, 0.0, 70.0, 20.0));
    }

    #[test]
    fn invalid_filter_drops_child_from_group_bounds() {
        let mut doc = Document::new();
        let root = svg(&mut doc);
        let empty_filter = doc.append(root, ElementKind::Filter(crate::document::Filter::default()));
        doc.set_id(empty_filter, "nothing");
        let group = doc.append(root, ElementKind::Group);
        doc.style_mut(group).transform = Transform::Translate { x: 5.0, y: 0.0 }.into();
        for x in [0.0, 100.0] {
            let square = doc.append(
                group,
                ElementKind::Rect(RectShape {
                    x: Length::number(x),
                    width: Length::number(10.0),
                    height: Length::number(10.0),
                    ..RectShape::default()
                }),
            );
            if x > 0.0 {
                doc.style_mut(square).filter = Some("url(#nothing)".into());
            }
        }

        let tree = build(&doc);
        let drawable = &tree[tree.find(group).unwrap()];
        assert_eq!(drawable.geometry_bounds, Rect::from_xywh(0.0, 0.0, 10.0, 10.0));
        assert_eq!(drawable.transformed_bounds, Rect::from_xywh(5.0, 0.0, 10.0, 10.0));
        let root_bounds = tree[tree.root().unwrap()].geometry_bounds;
        assert_eq!(root_bounds, Rect::from_xywh(5.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn use_of_missing_element_is_not_drawable() {
        let mut doc = Document::new();
        let root = svg(&mut doc);
        let use_element = doc.append(
            root,
            ElementKind::Use(Use { href: "#missing".to_string(), ..Use::default() }),
        );
        let tree = build(&doc);
        let drawable = &tree[tree.find(use_element).unwrap()];
        assert!(!drawable.is_drawable);
        assert!(drawable.geometry_bounds.is_empty());
    }

    #[test]
    fn use_instantiates_target_with_offset() {
        let mut doc = Document::new();
        let root = svg(&mut doc);
        let defs = doc.append(root, ElementKind::Defs);
        let c = circle(&mut doc, defs, 10.0, 10.0, 10.0);
        doc.set_id(c, "dot");
        let use_element = doc.append(
            root,
            ElementKind::Use(Use { href: "#dot".to_string(), x: Length::number(100.0), ..Use::default() }),
        );
        let tree = build(&doc);
        let drawable = &tree[tree.find(use_element).unwrap()];
        assert!(drawable.is_drawable);
        assert_eq!(drawable.transformed_bounds, Rect::from_xywh(100.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn self_referencing_use_terminates() {
        let mut doc = Document::new();
        let root = svg(&mut doc);
        let group = doc.append(root, ElementKind::Group);
        doc.set_id(group, "loop");
        let use_element = doc.append(group, ElementKind::Use(Use { href: "#loop".to_string(), ..Use::default() }));
        let tree = build(&doc);
        assert!(!tree[tree.find(use_element).unwrap()].is_drawable);
    }

    #[test]
    fn switch_builds_first_passing_child_only() {
        let mut doc = Document::new();
        let root = svg(&mut doc);
        let switch = doc.append(root, ElementKind::Switch);
        let french = circle(&mut doc, switch, 5.0, 5.0, 5.0);
        doc.element_mut(french).conditions = Conditions {
            system_language: Some(vec!["fr".to_string()]),
            ..Conditions::default()
        };
        let fallback = circle(&mut doc, switch, 5.0, 5.0, 5.0);
        circle(&mut doc, switch, 5.0, 5.0, 5.0);

        let tree = build(&doc);
        let switch_drawable = &tree[tree.find(switch).unwrap()];
        assert_eq!(switch_drawable.children().len(), 1);
        assert_eq!(tree[switch_drawable.children()[0]].element, fallback);
    }

    #[test]
    fn display_none_and_hidden_are_not_drawable() {
        let mut doc = Document::new();
        let root = svg(&mut doc);
        let group = doc.append(root, ElementKind::Group);
        doc.style_mut(group).display = Some(Display::None);
        let hidden = circle(&mut doc, root, 5.0, 5.0, 5.0);
        doc.style_mut(hidden).visibility = Some(Visibility::Hidden);

        let tree = build(&doc);
        assert!(!tree[tree.find(group).unwrap()].is_drawable);
        assert!(!tree[tree.find(hidden).unwrap()].is_drawable);
        assert!(tree[tree.root().unwrap()].geometry_bounds.is_empty());
    }

    #[test]
    fn definitions_are_not_built() {
        let mut doc = Document::new();
        let root = svg(&mut doc);
        let defs = doc.append(root, ElementKind::Defs);
        circle(&mut doc, defs, 5.0, 5.0, 5.0);
        doc.append(root, ElementKind::Unknown("foreignObject".to_string()));
        let tree = build(&doc);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn stroke_only_shape_with_failed_fill_is_drawable() {
        let mut doc = Document::new();
        let root = svg(&mut doc);
        let c = circle(&mut doc, root, 5.0, 5.0, 5.0);
        doc.style_mut(c).fill = Some(PaintServer::reference("#missing"));
        doc.style_mut(c).stroke = Some(PaintServer::Color(Rgba::BLACK));
        let tree = build(&doc);
        let drawable = &tree[tree.find(c).unwrap()];
        assert!(drawable.is_drawable);
        assert!(drawable.fill.is_none());
        assert!(drawable.stroke.is_some());
    }

    #[test]
    fn reference_chain_detects_reentry() {
        let mut refs = ReferenceChain::new();
        assert!(refs.enter(ElementId(1)));
        assert!(!refs.enter(ElementId(1)));
        assert!(refs.contains(ElementId(1)));
        refs.leave(ElementId(1));
        assert!(refs.is_empty());
    }
}
