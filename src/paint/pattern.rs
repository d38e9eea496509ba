// Pattern tiles recorded into repeating picture shaders

use super::{solid_paint, ServerResolution};
use crate::document::{Document, ElementId, ElementKind, Length, Pattern, Units};
use crate::drawable::{ContainerKind, DrawableFactory, DrawableTree, IgnoreAttributes, ReferenceChain};
use crate::units::{UnitAxis, view_box_transform};
use rustc_hash::FxHashSet;
use skia_safe::{Color, FilterMode, Matrix, Paint, Rect, TileMode};

/// Pattern elements reached from `start` through `href`
pub fn pattern_chain(document: &Document, start: ElementId) -> Vec<ElementId> {
    let mut chain = Vec::new();
    let mut visited = FxHashSet::default();
    let mut current = Some(start);
    while let Some(id) = current {
        let ElementKind::Pattern(pattern) = document.kind(id) else {
            break;
        };
        if !visited.insert(id) {
            tracing::trace!("pattern href cycle at element {}", id.index());
            break;
        }
        chain.push(id);
        current = pattern.href.as_deref().and_then(|href| document.lookup(href));
    }
    chain
}

/// First value set along the chain
fn first<T>(document: &Document, chain: &[ElementId], get: impl Fn(&Pattern) -> Option<T>) -> Option<T> {
    chain.iter().find_map(|id| match document.kind(*id) {
        ElementKind::Pattern(pattern) => get(pattern),
        _ => None,
    })
}

pub fn resolve(
    factory: &DrawableFactory,
    refs: &mut ReferenceChain,
    element: ElementId,
    pattern: ElementId,
    opacity: f32,
    bounds: Rect,
) -> ServerResolution {
    if !refs.enter(pattern) {
        tracing::trace!("pattern {} references itself", pattern.index());
        return ServerResolution::Unresolvable;
    }
    let resolution = resolve_tile(factory, refs, element, pattern, opacity, bounds);
    refs.leave(pattern);
    resolution
}

fn resolve_tile(
    factory: &DrawableFactory,
    refs: &mut ReferenceChain,
    element: ElementId,
    pattern: ElementId,
    opacity: f32,
    bounds: Rect,
) -> ServerResolution {
    let units = factory.units();
    let document = units.document();
    let chain = pattern_chain(document, pattern);
    let attr = |get: fn(&Pattern) -> Option<Length>| first(document, &chain, get);

    let tile_units: Units = first(document, &chain, |p| p.units).unwrap_or(Units::ObjectBoundingBox);
    let content_units: Units = first(document, &chain, |p| p.content_units).unwrap_or(Units::UserSpaceOnUse);
    let bounding_box = tile_units == Units::ObjectBoundingBox;
    if bounding_box && (bounds.width() <= 0.0 || bounds.height() <= 0.0) {
        return ServerResolution::Unresolvable;
    }

    let resolve_length = |value: Option<Length>, axis: UnitAxis, is_position: bool| {
        let value = value.unwrap_or(Length::ZERO);
        units.to_units(value, axis, element, bounds, bounding_box, is_position)
    };
    let tile = Rect::from_xywh(
        resolve_length(attr(|p| p.x), UnitAxis::Horizontal, true),
        resolve_length(attr(|p| p.y), UnitAxis::Vertical, true),
        resolve_length(attr(|p| p.width), UnitAxis::Horizontal, false),
        resolve_length(attr(|p| p.height), UnitAxis::Vertical, false),
    );
    if !(tile.width() > 0.0) || !(tile.height() > 0.0) {
        tracing::debug!("pattern {} has an empty tile", pattern.index());
        return nothing();
    }

    let Some(content_source) = chain.iter().copied().find(|id| !document.children(*id).is_empty()) else {
        tracing::debug!("pattern {} has no content", pattern.index());
        return nothing();
    };

    let content_matrix = match first(document, &chain, |p| p.view_box).filter(|view_box| view_box.is_valid()) {
        Some(view_box) => {
            let aspect = first(document, &chain, |p| p.aspect).unwrap_or_default();
            view_box_transform(&view_box, &aspect, tile.width(), tile.height())
        }
        None if content_units == Units::ObjectBoundingBox => Matrix::scale((bounds.width(), bounds.height())),
        None => Matrix::new_identity(),
    };

    let mut tree = DrawableTree::new();
    let Some(content) =
        factory.create_content(&mut tree, content_source, ContainerKind::Pattern, None, content_matrix, refs)
    else {
        return nothing();
    };
    factory.post_process(&mut tree, content, IgnoreAttributes::empty(), refs);

    let tile_rect = Rect::from_wh(tile.width(), tile.height());
    let picture = crate::drawable::record_picture(tile_rect, |canvas| {
        let _ = tree.draw(canvas, content, IgnoreAttributes::empty(), None);
    });
    tree.dispose();
    let Some(picture) = picture else {
        return ServerResolution::Unresolvable;
    };

    let mut local_matrix = first(document, &chain, |p| p.transform.clone())
        .map(|list| list.to_matrix())
        .unwrap_or_else(Matrix::new_identity);
    local_matrix.pre_translate((tile.left, tile.top));

    let shader = picture.to_shader(
        (TileMode::Repeat, TileMode::Repeat),
        FilterMode::Linear,
        &local_matrix,
        &tile_rect,
    );
    let mut paint = Paint::default();
    paint.set_shader(shader);
    paint.set_alpha_f(opacity.clamp(0.0, 1.0));
    ServerResolution::Resolved(paint)
}

/// A pattern that paints nothing still resolves; the fallback is not used
fn nothing() -> ServerResolution {
    ServerResolution::Resolved(solid_paint(Color::TRANSPARENT))
}
