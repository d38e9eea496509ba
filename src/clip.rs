// clip-path geometry and mask layers

use crate::document::{ElementId, ElementKind, Length, Units, Visibility, Display};
use crate::drawable::{ContainerKind, DrawableFactory, DrawableId, DrawableTree, IgnoreAttributes, MaskLayer, ReferenceChain};
use crate::filter::transfer::LUMINANCE_TO_ALPHA;
use crate::geometry;
use crate::units::{UnitAxis, UnitResolver, bounding_box_matrix};
use rustc_hash::FxHashSet;
use skia_safe::{color_filters, BlendMode, Matrix, Paint, Path, PathOp, Rect};

/// A clipPath referenced while it is already being resolved
#[derive(Debug)]
struct ClipCycle;

/// Resolve the clip path referenced by `reference` for an element with local
/// `bounds`. Missing references and reference cycles both mean "no clip".
pub fn resolve_clip_path(units: &UnitResolver, reference: &str, bounds: Rect) -> Option<Path> {
    let mut visited = FxHashSet::default();
    match clip_path_geometry(units, reference, bounds, &mut visited) {
        Ok(path) => path,
        Err(ClipCycle) => {
            tracing::trace!("clip-path {} is part of a reference cycle", reference);
            None
        }
    }
}

fn clip_path_geometry(
    units: &UnitResolver,
    reference: &str,
    bounds: Rect,
    visited: &mut FxHashSet<ElementId>,
) -> Result<Option<Path>, ClipCycle> {
    let document = units.document();
    let clip = match document.require(reference) {
        Ok(clip) => clip,
        Err(error) => {
            tracing::warn!("clip-path: {}", error);
            return Ok(None);
        }
    };
    let ElementKind::ClipPath(clip_path) = document.kind(clip) else {
        tracing::warn!("clip-path reference {} is not a <clipPath>", reference);
        return Ok(None);
    };
    if !visited.insert(clip) {
        return Err(ClipCycle);
    }

    let mut union = Path::new();
    for child in document.children(clip) {
        if let Some(path) = child_geometry(units, *child, visited)? {
            union = union.op(&path, PathOp::Union).unwrap_or(union);
        }
    }

    if let Some(own) = &document[clip].style.clip_path {
        if let Some(own_path) = clip_path_geometry(units, own, bounds, visited)? {
            union = union.op(&own_path, PathOp::Intersect).unwrap_or_else(Path::new);
        }
    }

    if clip_path.units == Some(Units::ObjectBoundingBox) {
        union = union.with_transform(&bounding_box_matrix(&bounds));
    }
    let transform = &document[clip].style.transform;
    if !transform.is_empty() {
        union = union.with_transform(&transform.to_matrix());
    }

    visited.remove(&clip);
    Ok(Some(union))
}

/// Geometry one clipPath child contributes, in the clipPath's coordinate system
fn child_geometry(
    units: &UnitResolver,
    child: ElementId,
    visited: &mut FxHashSet<ElementId>,
) -> Result<Option<Path>, ClipCycle> {
    let document = units.document();
    let style = &document[child].style;
    if style.display == Some(Display::None)
        || matches!(document.inherited(child, |s| s.visibility), Some(Visibility::Hidden | Visibility::Collapse))
    {
        return Ok(None);
    }

    let path = match document.kind(child) {
        ElementKind::Use(use_element) => {
            let Some(target) = document.lookup(&use_element.href) else {
                return Ok(None);
            };
            if !visited.insert(target) {
                return Err(ClipCycle);
            }
            let target_path = child_geometry(units, target, visited)?;
            visited.remove(&target);
            let x = units.to_device(use_element.x, UnitAxis::Horizontal, child, None);
            let y = units.to_device(use_element.y, UnitAxis::Vertical, child, None);
            target_path.map(|path| path.with_transform(&Matrix::translate((x, y))))
        }
        kind if kind.is_renderable() => match geometry::element_geometry(units, child) {
            Ok(Some(geometry)) => {
                let mut path = geometry.path;
                let rule = document.inherited(child, |s| s.clip_rule).unwrap_or_default();
                path.set_fill_type(geometry::fill_type(rule));
                Some(path)
            }
            Ok(None) => None,
            Err(error) => {
                tracing::warn!("ignoring clipPath child: {}", error);
                None
            }
        },
        _ => None,
    };
    let Some(mut path) = path else {
        return Ok(None);
    };

    if let Some(reference) = &style.clip_path {
        let child_bounds = path.compute_tight_bounds();
        if let Some(own) = clip_path_geometry(units, reference, child_bounds, visited)? {
            path = path.op(&own, PathOp::Intersect).unwrap_or_else(Path::new);
        }
    }
    if !style.transform.is_empty() {
        path = path.with_transform(&style.transform.to_matrix());
    }
    Ok(Some(path))
}

/// Build the mask referenced by `reference` for `owner`, whose local bounds are
/// `bounds`. The mask content becomes a sub-drawable owned by `owner`.
pub fn build_mask(
    factory: &DrawableFactory,
    tree: &mut DrawableTree,
    owner: DrawableId,
    reference: &str,
    bounds: Rect,
    refs: &mut ReferenceChain,
) -> Option<MaskLayer> {
    let document = factory.units().document();
    let mask = match document.require(reference) {
        Ok(mask) => mask,
        Err(error) => {
            tracing::warn!("mask: {}", error);
            return None;
        }
    };
    if !matches!(document.kind(mask), ElementKind::Mask(_)) {
        tracing::warn!("mask reference {} is not a <mask>", reference);
        return None;
    }
    if !refs.enter(mask) {
        tracing::trace!("mask {} is part of a reference cycle", reference);
        return None;
    }
    let layer = build_mask_layer(factory, tree, owner, mask, bounds, refs);
    refs.leave(mask);
    layer
}

fn build_mask_layer(
    factory: &DrawableFactory,
    tree: &mut DrawableTree,
    owner: DrawableId,
    mask: ElementId,
    bounds: Rect,
    refs: &mut ReferenceChain,
) -> Option<MaskLayer> {
    let units = factory.units();
    let ElementKind::Mask(attributes) = units.document().kind(mask) else {
        return None;
    };
    let bounding_box = attributes.units.unwrap_or(Units::ObjectBoundingBox) == Units::ObjectBoundingBox;
    if bounding_box && (bounds.width() <= 0.0 || bounds.height() <= 0.0) {
        tracing::debug!("objectBoundingBox mask on an element without area");
        return None;
    }

    let owner_element = tree[owner].element;
    let resolve = |length: Option<Length>, default: f32, axis: UnitAxis, is_position: bool| {
        let length = length.unwrap_or(Length::percent(default));
        if bounding_box {
            units.to_units(length, axis, mask, bounds, true, is_position)
        } else {
            units.to_device(length, axis, owner_element, None)
        }
    };
    let region = Rect::from_xywh(
        resolve(attributes.x, -10.0, UnitAxis::Horizontal, true),
        resolve(attributes.y, -10.0, UnitAxis::Vertical, true),
        resolve(attributes.width, 120.0, UnitAxis::Horizontal, false),
        resolve(attributes.height, 120.0, UnitAxis::Vertical, false),
    );
    if region.is_empty() {
        return None;
    }

    let content_matrix = if attributes.content_units == Some(Units::ObjectBoundingBox) {
        bounding_box_matrix(&bounds)
    } else {
        Matrix::new_identity()
    };
    let content = factory.create_content(tree, mask, ContainerKind::Mask, Some(owner), content_matrix, refs)?;
    tree[content].overflow = Some(region);
    factory.post_process(tree, content, IgnoreAttributes::empty(), refs);

    let layer_paint = Paint::default();
    let mut dst_in_paint = Paint::default();
    dst_in_paint.set_blend_mode(BlendMode::DstIn);
    dst_in_paint.set_color_filter(color_filters::matrix_row_major(&LUMINANCE_TO_ALPHA, None));

    let scope = &mut tree[owner].resources;
    Some(MaskLayer {
        drawable: content,
        layer_paint: scope.add(layer_paint),
        dst_in_paint: scope.add(dst_in_paint),
        region,
    })
}
