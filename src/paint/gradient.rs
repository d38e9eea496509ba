// Linear and radial gradient shaders

use super::{ServerResolution, solid_paint};
use crate::document::{
    Document, ElementId, ElementKind, GradientAttributes, Length, LengthUnit, Rgba, SpreadMethod,
    Units, ColorValue,
};
use crate::units::{UnitAxis, UnitResolver, bounding_box_matrix};
use rustc_hash::FxHashSet;
use skia_safe::{Color, Matrix, Paint, Point, Rect, Shader, TileMode};

/// Gradient elements reached from `start` through `href`, starting with `start`.
/// Stops at the first missing, non-gradient or repeated link.
pub fn gradient_chain(document: &Document, start: ElementId) -> Vec<ElementId> {
    let mut chain = Vec::new();
    let mut visited = FxHashSet::default();
    let mut current = Some(start);
    while let Some(id) = current {
        if !document.kind(id).is_gradient() {
            break;
        }
        if !visited.insert(id) {
            tracing::trace!("gradient href cycle at element {}", id.index());
            break;
        }
        chain.push(id);
        current = common(document.kind(id))
            .and_then(|attrs| attrs.href.as_deref())
            .and_then(|href| document.lookup(href));
    }
    chain
}

fn common(kind: &ElementKind) -> Option<&GradientAttributes> {
    match kind {
        ElementKind::LinearGradient(gradient) => Some(&gradient.common),
        ElementKind::RadialGradient(gradient) => Some(&gradient.common),
        _ => None,
    }
}

/// First value set along the chain
fn first<T>(document: &Document, chain: &[ElementId], get: impl Fn(&ElementKind) -> Option<T>) -> Option<T> {
    chain.iter().find_map(|id| get(document.kind(*id)))
}

/// Resolve the gradient `gradient` painting `element` with `bounds`
pub fn resolve(
    units: &UnitResolver,
    element: ElementId,
    gradient: ElementId,
    opacity: f32,
    bounds: Rect,
) -> ServerResolution {
    let document = units.document();
    let chain = gradient_chain(document, gradient);
    if chain.is_empty() {
        return ServerResolution::Unresolvable;
    }

    let gradient_units = first(document, &chain, |k| common(k).and_then(|c| c.units))
        .unwrap_or(Units::ObjectBoundingBox);
    let spread = first(document, &chain, |k| common(k).and_then(|c| c.spread)).unwrap_or_default();
    let gradient_transform = first(document, &chain, |k| common(k).and_then(|c| c.transform.clone()))
        .map(|list| list.to_matrix())
        .unwrap_or_else(Matrix::new_identity);

    let bounding_box = gradient_units == Units::ObjectBoundingBox;
    if bounding_box && (bounds.width() <= 0.0 || bounds.height() <= 0.0) {
        tracing::debug!("objectBoundingBox gradient on an element without area");
        return ServerResolution::Unresolvable;
    }

    let stops = collect_stops(units, &chain, opacity, bounds);
    match stops.as_slice() {
        [] => return ServerResolution::Resolved(solid_paint(Rgba::WHITE.to_skia(0.0))),
        [(_, color)] => return ServerResolution::Resolved(solid_paint(*color)),
        _ => {}
    }
    let offsets: Vec<f32> = stops.iter().map(|(offset, _)| *offset).collect();
    let colors: Vec<Color> = stops.iter().map(|(_, color)| *color).collect();

    let local_matrix = if bounding_box {
        let mut matrix = bounding_box_matrix(&bounds);
        matrix.pre_concat(&gradient_transform);
        matrix
    } else {
        gradient_transform
    };
    let tile_mode = tile_mode(spread);

    let coordinate = |length: Length, axis: UnitAxis| -> f32 {
        if bounding_box {
            length.fraction()
        } else {
            units.to_device(length, axis, element, None)
        }
    };

    let shader = match document.kind(gradient) {
        ElementKind::LinearGradient(_) => {
            let get = |pick: fn(&crate::document::LinearGradient) -> Option<Length>| {
                first(document, &chain, |kind| match kind {
                    ElementKind::LinearGradient(linear) => pick(linear),
                    _ => None,
                })
            };
            let x1 = coordinate(get(|g| g.x1).unwrap_or(Length::percent(0.0)), UnitAxis::Horizontal);
            let y1 = coordinate(get(|g| g.y1).unwrap_or(Length::percent(0.0)), UnitAxis::Vertical);
            let x2 = coordinate(get(|g| g.x2).unwrap_or(Length::percent(100.0)), UnitAxis::Horizontal);
            let y2 = coordinate(get(|g| g.y2).unwrap_or(Length::percent(0.0)), UnitAxis::Vertical);
            Shader::linear_gradient(
                (Point::new(x1, y1), Point::new(x2, y2)),
                colors.as_slice(),
                offsets.as_slice(),
                tile_mode,
                None,
                &local_matrix,
            )
        }
        ElementKind::RadialGradient(_) => {
            let get = |pick: fn(&crate::document::RadialGradient) -> Option<Length>| {
                first(document, &chain, |kind| match kind {
                    ElementKind::RadialGradient(radial) => pick(radial),
                    _ => None,
                })
            };
            let cx = get(|g| g.cx).unwrap_or(Length::percent(50.0));
            let cy = get(|g| g.cy).unwrap_or(Length::percent(50.0));
            let r = coordinate(get(|g| g.r).unwrap_or(Length::percent(50.0)), UnitAxis::Other);
            let fx = coordinate(get(|g| g.fx).unwrap_or(cx), UnitAxis::Horizontal);
            let fy = coordinate(get(|g| g.fy).unwrap_or(cy), UnitAxis::Vertical);
            let (cx, cy) = (coordinate(cx, UnitAxis::Horizontal), coordinate(cy, UnitAxis::Vertical));
            if r <= 0.0 {
                let last = colors.last().copied().unwrap_or(Color::TRANSPARENT);
                return ServerResolution::Resolved(solid_paint(last));
            }
            Shader::two_point_conical_gradient(
                Point::new(fx, fy),
                0.0,
                Point::new(cx, cy),
                r,
                colors.as_slice(),
                offsets.as_slice(),
                tile_mode,
                None,
                &local_matrix,
            )
        }
        _ => None,
    };

    match shader {
        Some(shader) => {
            let mut paint = Paint::default();
            paint.set_shader(shader);
            ServerResolution::Resolved(paint)
        }
        None => {
            tracing::warn!("failed to create gradient shader for element {}", gradient.index());
            ServerResolution::Unresolvable
        }
    }
}

fn tile_mode(spread: SpreadMethod) -> TileMode {
    match spread {
        SpreadMethod::Pad => TileMode::Clamp,
        SpreadMethod::Reflect => TileMode::Mirror,
        SpreadMethod::Repeat => TileMode::Repeat,
    }
}

/// Normalized `(offset, color)` stops from the first chain member that has any
fn collect_stops(units: &UnitResolver, chain: &[ElementId], opacity: f32, bounds: Rect) -> Vec<(f32, Color)> {
    let document = units.document();
    let stops_of = |id: &ElementId| -> Vec<ElementId> {
        document
            .children(*id)
            .iter()
            .copied()
            .filter(|child| matches!(document.kind(*child), ElementKind::Stop(_)))
            .collect()
    };
    let Some(stops) = chain.iter().map(stops_of).find(|stops| !stops.is_empty()) else {
        return Vec::new();
    };

    let mut running_max = 0.0f32;
    stops
        .into_iter()
        .filter_map(|id| match document.kind(id) {
            ElementKind::Stop(stop) => Some((id, stop)),
            _ => None,
        })
        .map(|(id, stop)| {
            let offset = match stop.offset.unit {
                LengthUnit::None => stop.offset.value,
                LengthUnit::Percent => stop.offset.value / 100.0,
                _ if bounds.width() > 0.0 => {
                    units.to_device(stop.offset, UnitAxis::Horizontal, id, None) / bounds.width()
                }
                _ => 0.0,
            };
            let offset = offset.clamp(0.0, 1.0).max(running_max);
            running_max = offset;

            let color = match stop.color {
                ColorValue::Rgba(color) => color,
                ColorValue::CurrentColor => document.inherited(id, |s| s.color).unwrap_or(Rgba::BLACK),
            };
            (offset, color.to_skia(stop.opacity * opacity))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::document::{Fragment, LinearGradient, RadialGradient, Stop};

    fn document_with_gradient(offsets: &[Length]) -> (Document, ElementId, ElementId) {
        let mut doc = Document::new();
        let root = doc.create_root(ElementKind::Svg(Fragment::default()));
        let gradient = doc.append(root, ElementKind::LinearGradient(LinearGradient::default()));
        doc.set_id(gradient, "g");
        for offset in offsets {
            doc.append(gradient, ElementKind::Stop(Stop { offset: *offset, ..Stop::default() }));
        }
        let rect = doc.append(root, ElementKind::Group);
        (doc, gradient, rect)
    }

    #[test]
    fn offsets_are_monotonic_and_clamped() {
        let (doc, gradient, _) = document_with_gradient(&[
            Length::number(0.5),
            Length::percent(20.0),
            Length::number(1.5),
        ]);
        let config = RenderConfig::default();
        let units = UnitResolver::new(&doc, &config);
        let stops = collect_stops(&units, &[gradient], 1.0, Rect::from_wh(10.0, 10.0));
        let offsets: Vec<f32> = stops.iter().map(|(o, _)| *o).collect();
        assert_eq!(offsets, vec![0.5, 0.5, 1.0]);
    }

    #[test]
    fn bounding_box_gradient_without_width_is_unresolvable() {
        let (doc, gradient, rect) = document_with_gradient(&[Length::ZERO, Length::number(1.0)]);
        let config = RenderConfig::default();
        let units = UnitResolver::new(&doc, &config);
        let resolution = resolve(&units, rect, gradient, 1.0, Rect::from_xywh(0.0, 0.0, 0.0, 10.0));
        assert!(matches!(resolution, ServerResolution::Unresolvable));
        let resolution = resolve(&units, rect, gradient, 1.0, Rect::from_wh(10.0, 10.0));
        assert!(matches!(resolution, ServerResolution::Resolved(paint) if paint.shader().is_some()));
    }

    #[test]
    fn single_stop_is_flat_color_and_no_stop_is_transparent() {
        let (doc, gradient, rect) = document_with_gradient(&[Length::ZERO]);
        let config = RenderConfig::default();
        let units = UnitResolver::new(&doc, &config);
        let ServerResolution::Resolved(paint) = resolve(&units, rect, gradient, 0.5, Rect::from_wh(4.0, 4.0)) else {
            panic!("expected a flat paint");
        };
        assert!(paint.shader().is_none());
        assert_eq!(paint.color(), Color::from_argb(128, 0, 0, 0));

        let (doc, gradient, rect) = document_with_gradient(&[]);
        let units = UnitResolver::new(&doc, &config);
        let ServerResolution::Resolved(paint) = resolve(&units, rect, gradient, 1.0, Rect::from_wh(4.0, 4.0)) else {
            panic!("expected a flat paint");
        };
        assert_eq!(paint.color(), Color::from_argb(0, 255, 255, 255));
    }

    #[test]
    fn chain_inherits_stops_and_stops_at_cycles() {
        let mut doc = Document::new();
        let root = doc.create_root(ElementKind::Svg(Fragment::default()));
        let base = doc.append(root, ElementKind::LinearGradient(LinearGradient::default()));
        doc.set_id(base, "base");
        doc.append(base, ElementKind::Stop(Stop::default()));
        let mut radial = RadialGradient::default();
        radial.common.href = Some("#base".to_string());
        let derived = doc.append(root, ElementKind::RadialGradient(radial));
        doc.set_id(derived, "derived");
        if let ElementKind::LinearGradient(linear) = &mut doc.element_mut(base).kind {
            linear.common.href = Some("#derived".to_string());
        }

        assert_eq!(gradient_chain(&doc, derived), vec![derived, base]);
        let config = RenderConfig::default();
        let units = UnitResolver::new(&doc, &config);
        assert_eq!(collect_stops(&units, &gradient_chain(&doc, derived), 1.0, Rect::from_wh(1.0, 1.0)).len(), 1);
    }
}
