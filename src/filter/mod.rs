// Filter graph evaluation: an ordered list of primitives composed into one Skia image filter
pub mod lighting;
mod primitives;
pub mod transfer;

use crate::document::{
    ColorValue, Document, ElementId, ElementKind, Filter, FilterPrimitive, Length, Rgba, Units,
};
use crate::drawable::{DrawableFactory, DrawableId, DrawableTree, ReferenceChain};
use crate::units::UnitAxis;
use rustc_hash::{FxHashMap, FxHashSet};
use skia_safe::{color_filters, image_filters, shaders, Color, ImageFilter, Paint, Picture, Rect};

/// Outcome of resolving an element's `filter` reference
pub enum FilterResolution {
    /// The reference does not name a filter; the element renders unfiltered
    Absent,
    Applied { paint: Paint, region: Rect },
    /// The filter produced nothing; the element is not rendered
    Invalid,
}

/// Buffers a filter can read besides the layer content, materialized on demand
pub struct FilterSource<'t> {
    tree: &'t DrawableTree,
    id: DrawableId,
}

impl<'t> FilterSource<'t> {
    pub fn new(tree: &'t DrawableTree, id: DrawableId) -> Self {
        Self { tree, id }
    }

    pub fn fill_paint(&self) -> Option<&'t Paint> {
        self.tree.get(self.id).and_then(|drawable| drawable.fill.as_ref())
    }

    pub fn stroke_paint(&self) -> Option<&'t Paint> {
        self.tree.get(self.id).and_then(|drawable| drawable.stroke.as_ref())
    }

    /// Everything drawn before the filtered drawable, clipped to `region`
    pub fn background(&self, region: Rect) -> Option<Picture> {
        self.tree.record_background(self.id, region)
    }
}

/// Intermediate value of the graph. `Source` is the layer content itself,
/// which Skia feeds to a filter whose input is `None`.
#[derive(Clone)]
pub(crate) enum FilterNode {
    Source,
    Filter(ImageFilter),
}

impl FilterNode {
    pub(crate) fn input(&self) -> Option<ImageFilter> {
        match self {
            FilterNode::Source => None,
            FilterNode::Filter(filter) => Some(filter.clone()),
        }
    }
}

/// A primitive's output and the subregion it covers
#[derive(Clone)]
pub(crate) struct FilterResult {
    pub node: FilterNode,
    pub region: Rect,
}

impl FilterResult {
    fn new(filter: Option<ImageFilter>, region: Rect) -> Option<Self> {
        filter.map(|filter| Self { node: FilterNode::Filter(filter), region })
    }
}

const SOURCE_GRAPHIC: &str = "SourceGraphic";
const SOURCE_ALPHA: &str = "SourceAlpha";
const BACKGROUND_IMAGE: &str = "BackgroundImage";
const BACKGROUND_ALPHA: &str = "BackgroundAlpha";
const FILL_PAINT: &str = "FillPaint";
const STROKE_PAINT: &str = "StrokePaint";

/// Coordinate system of primitive attributes. In objectBoundingBox mode
/// positions and lengths are fractions of the target bounds.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PrimitiveSpace {
    bounds: Rect,
    bounding_box: bool,
}

impl PrimitiveSpace {
    pub fn x(&self, value: f32) -> f32 {
        if self.bounding_box {
            self.bounds.left + value * self.bounds.width()
        } else {
            value
        }
    }

    pub fn y(&self, value: f32) -> f32 {
        if self.bounding_box {
            self.bounds.top + value * self.bounds.height()
        } else {
            value
        }
    }

    pub fn dx(&self, value: f32) -> f32 {
        if self.bounding_box {
            value * self.bounds.width()
        } else {
            value
        }
    }

    pub fn dy(&self, value: f32) -> f32 {
        if self.bounding_box {
            value * self.bounds.height()
        } else {
            value
        }
    }

    /// Non-directional length, scaled by the normalized diagonal
    pub fn length(&self, value: f32) -> f32 {
        if self.bounding_box {
            let (w, h) = (self.bounds.width(), self.bounds.height());
            value * ((w * w + h * h) / 2.0).sqrt()
        } else {
            value
        }
    }
}

/// Filter elements reached from `start` through `href`
pub fn filter_chain(document: &Document, start: ElementId) -> Vec<ElementId> {
    let mut chain = Vec::new();
    let mut visited = FxHashSet::default();
    let mut current = Some(start);
    while let Some(id) = current {
        let ElementKind::Filter(filter) = document.kind(id) else {
            break;
        };
        if !visited.insert(id) {
            tracing::trace!("filter href cycle at element {}", id.index());
            break;
        }
        chain.push(id);
        current = filter.href.as_deref().and_then(|href| document.lookup(href));
    }
    chain
}

fn first<T>(document: &Document, chain: &[ElementId], get: impl Fn(&Filter) -> Option<T>) -> Option<T> {
    chain.iter().find_map(|id| match document.kind(*id) {
        ElementKind::Filter(filter) => get(filter),
        _ => None,
    })
}

/// Resolve a color that may be `currentColor` against `element`
pub(crate) fn resolve_color(document: &Document, element: ElementId, value: ColorValue, opacity: f32) -> Color {
    match value {
        ColorValue::Rgba(color) => color.to_skia(opacity),
        ColorValue::CurrentColor => document
            .inherited(element, |s| s.color)
            .unwrap_or(Rgba::BLACK)
            .to_skia(opacity),
    }
}

pub struct FilterEvaluator<'f, 'a> {
    factory: &'f DrawableFactory<'a>,
}

impl<'f, 'a> FilterEvaluator<'f, 'a> {
    pub fn new(factory: &'f DrawableFactory<'a>) -> Self {
        Self { factory }
    }

    /// Compose the filter named by `reference` for `element`, whose local bounds are `bounds`
    pub fn evaluate(
        &self,
        element: ElementId,
        reference: &str,
        bounds: Rect,
        source: &FilterSource,
        refs: &mut ReferenceChain,
    ) -> FilterResolution {
        let document = self.factory.units().document();
        let filter = match document.require(reference) {
            Ok(filter) => filter,
            Err(error) => {
                tracing::warn!("filter: {}", error);
                return FilterResolution::Absent;
            }
        };
        if !matches!(document.kind(filter), ElementKind::Filter(_)) {
            tracing::warn!("filter reference {} is not a <filter>", reference);
            return FilterResolution::Absent;
        }
        if !refs.enter(filter) {
            tracing::trace!("filter {} is part of a reference cycle", reference);
            return FilterResolution::Absent;
        }
        let resolution = self.evaluate_chain(element, filter, bounds, source, refs);
        refs.leave(filter);
        resolution
    }

    fn evaluate_chain(
        &self,
        element: ElementId,
        filter: ElementId,
        bounds: Rect,
        source: &FilterSource,
        refs: &mut ReferenceChain,
    ) -> FilterResolution {
        let units = self.factory.units();
        let document = units.document();
        let chain = filter_chain(document, filter);

        let filter_units = first(document, &chain, |f| f.filter_units).unwrap_or(Units::ObjectBoundingBox);
        let primitive_units = first(document, &chain, |f| f.primitive_units).unwrap_or(Units::UserSpaceOnUse);
        let bounding_box = filter_units == Units::ObjectBoundingBox;
        if bounding_box && (bounds.width() <= 0.0 || bounds.height() <= 0.0) {
            tracing::debug!("objectBoundingBox filter on an element without area");
            return FilterResolution::Invalid;
        }

        let resolve = |value: Option<Length>, default: f32, axis: UnitAxis, is_position: bool| {
            let value = value.unwrap_or(Length::percent(default));
            units.to_units(value, axis, element, bounds, bounding_box, is_position)
        };
        let region = Rect::from_xywh(
            resolve(first(document, &chain, |f| f.x), -10.0, UnitAxis::Horizontal, true),
            resolve(first(document, &chain, |f| f.y), -10.0, UnitAxis::Vertical, true),
            resolve(first(document, &chain, |f| f.width), 120.0, UnitAxis::Horizontal, false),
            resolve(first(document, &chain, |f| f.height), 120.0, UnitAxis::Vertical, false),
        );
        if !(region.width() > 0.0) || !(region.height() > 0.0) {
            tracing::debug!("filter {} has an empty region", filter.index());
            return FilterResolution::Invalid;
        }

        let primitives: Vec<ElementId> = chain
            .iter()
            .map(|id| {
                document
                    .children(*id)
                    .iter()
                    .copied()
                    .filter(|child| matches!(document.kind(*child), ElementKind::FilterPrimitive(_)))
                    .collect::<Vec<_>>()
            })
            .find(|primitives| !primitives.is_empty())
            .unwrap_or_default();

        let mut evaluation = Evaluation {
            factory: self.factory,
            element,
            region,
            space: PrimitiveSpace {
                bounds,
                bounding_box: primitive_units == Units::ObjectBoundingBox,
            },
            source,
            results: FxHashMap::default(),
            previous: None,
        };
        for (index, primitive) in primitives.iter().enumerate() {
            let ElementKind::FilterPrimitive(attributes) = document.kind(*primitive) else {
                continue;
            };
            let subregion = evaluation.subregion(attributes);
            match primitives::apply(&mut evaluation, *primitive, attributes, subregion, index == 0, refs) {
                Some(result) => {
                    if !attributes.result.is_empty() {
                        evaluation.results.insert(attributes.result.clone(), result.clone());
                    }
                    evaluation.previous = Some(result);
                }
                None => {
                    tracing::warn!("<{}> produced no result", attributes.kind.tag_name());
                }
            }
        }

        let Some(result) = evaluation.previous else {
            tracing::debug!("filter {} has no usable primitives", filter.index());
            return FilterResolution::Invalid;
        };
        let mut paint = Paint::default();
        paint.set_image_filter(result.node.input());
        FilterResolution::Applied { paint, region }
    }
}

/// State shared by the primitives of one filter evaluation
pub(crate) struct Evaluation<'e, 'f, 'a> {
    pub factory: &'f DrawableFactory<'a>,
    /// The filtered element
    pub element: ElementId,
    pub region: Rect,
    pub space: PrimitiveSpace,
    source: &'e FilterSource<'e>,
    results: FxHashMap<String, FilterResult>,
    previous: Option<FilterResult>,
}

impl<'a> Evaluation<'_, '_, 'a> {
    pub fn document(&self) -> &'a Document {
        self.factory.units().document()
    }

    /// Primitive subregion: x/y/width/height in primitive units, each
    /// defaulting to the filter region
    fn subregion(&self, primitive: &FilterPrimitive) -> Rect {
        let units = self.factory.units();
        let space = self.space;
        let resolve = |value: Option<Length>, default: f32, axis: UnitAxis, is_position: bool| match value {
            Some(value) => {
                units.to_units(value, axis, self.element, space.bounds, space.bounding_box, is_position)
            }
            None => default,
        };
        Rect::from_xywh(
            resolve(primitive.x, self.region.left, UnitAxis::Horizontal, true),
            resolve(primitive.y, self.region.top, UnitAxis::Vertical, true),
            resolve(primitive.width, self.region.width(), UnitAxis::Horizontal, false),
            resolve(primitive.height, self.region.height(), UnitAxis::Vertical, false),
        )
    }

    /// Output of the previous primitive, or the source graphic for the first one
    pub fn previous(&self) -> FilterResult {
        self.previous.clone().unwrap_or_else(|| self.source_graphic())
    }

    fn source_graphic(&self) -> FilterResult {
        FilterResult { node: FilterNode::Source, region: self.region }
    }

    /// Look up an input by key. Well-known buffers are built on first use and
    /// cached in the result table; unknown names fall back to the previous result.
    pub fn get_input(&mut self, key: &str, is_first: bool) -> FilterResult {
        if key.is_empty() {
            return if is_first { self.source_graphic() } else { self.previous() };
        }
        if let Some(result) = self.results.get(key) {
            return result.clone();
        }
        let materialized = match key {
            SOURCE_GRAPHIC => Some(self.source_graphic()),
            SOURCE_ALPHA => Some(self.alpha_of(self.source_graphic())),
            BACKGROUND_IMAGE => Some(self.background()),
            BACKGROUND_ALPHA => {
                let background = self.get_input(BACKGROUND_IMAGE, is_first);
                Some(self.alpha_of(background))
            }
            FILL_PAINT => Some(self.paint_buffer(self.source.fill_paint())),
            STROKE_PAINT => Some(self.paint_buffer(self.source.stroke_paint())),
            _ => None,
        };
        match materialized {
            Some(result) => {
                self.results.insert(key.to_string(), result.clone());
                result
            }
            None => {
                tracing::debug!("filter input {} not found, using previous result", key);
                if is_first { self.source_graphic() } else { self.previous() }
            }
        }
    }

    fn alpha_of(&self, input: FilterResult) -> FilterResult {
        let filter = image_filters::color_filter(
            color_filters::matrix_row_major(&transfer::ALPHA_ONLY, None),
            input.node.input(),
            None,
        );
        FilterResult::new(filter, input.region).unwrap_or_else(|| self.transparent(input.region))
    }

    fn background(&self) -> FilterResult {
        let region = self.region;
        self.source
            .background(region)
            .and_then(|picture| FilterResult::new(image_filters::picture(picture, Some(&region)), region))
            .unwrap_or_else(|| self.transparent(region))
    }

    fn paint_buffer(&self, paint: Option<&Paint>) -> FilterResult {
        let Some(paint) = paint else {
            return self.transparent(self.region);
        };
        let shader = paint.shader().unwrap_or_else(|| shaders::color(paint.color()));
        FilterResult::new(image_filters::shader(shader, self.region), self.region)
            .unwrap_or_else(|| self.transparent(self.region))
    }

    /// Transparent black over `region`
    pub fn transparent(&self, region: Rect) -> FilterResult {
        let filter = image_filters::shader(shaders::color(Color::TRANSPARENT), region);
        match filter {
            Some(filter) => FilterResult { node: FilterNode::Filter(filter), region },
            None => FilterResult { node: FilterNode::Source, region },
        }
    }
}
