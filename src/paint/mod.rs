// Fill and stroke paint resolution
pub mod gradient;
pub mod pattern;

use crate::document::{ElementId, ElementKind, LineCap, LineJoin, PaintServer, Rgba, ShapeRendering};
use crate::drawable::{DrawableFactory, ReferenceChain};
use crate::units::{UnitAxis, UnitResolver};
use skia_safe::{paint, Color, Paint, PathEffect, Rect};

/// Outcome of resolving a referenced paint server
pub enum ServerResolution {
    Resolved(Paint),
    Unresolvable,
}

/// State of one paint channel (fill or stroke) of a shape
pub enum PaintChannel {
    /// `none`, or a stroke with no width
    NotRequested,
    Resolved(Paint),
    /// A paint server was requested but could not be resolved
    Failed,
}

impl PaintChannel {
    pub fn paint(self) -> Option<Paint> {
        match self {
            PaintChannel::Resolved(paint) => Some(paint),
            _ => None,
        }
    }
}

/// Whether a shape with these channels produces any output
pub fn channels_drawable(fill: &PaintChannel, stroke: &PaintChannel) -> bool {
    use PaintChannel::*;
    !matches!(
        (fill, stroke),
        (Resolved(_), Failed) | (Failed, Failed) | (Failed, NotRequested) | (NotRequested, Failed)
    )
}

pub(crate) fn solid_paint(color: Color) -> Paint {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint
}

/// Resolve `server` into a paint for `element`. References that cannot be resolved
/// use their fallback; `None` means nothing should be painted.
pub fn resolve(
    factory: &DrawableFactory,
    refs: &mut ReferenceChain,
    element: ElementId,
    server: &PaintServer,
    opacity: f32,
    bounds: Rect,
    for_stroke: bool,
) -> Option<Paint> {
    let document = factory.units().document();
    let mut paint = match server {
        PaintServer::None => return None,
        PaintServer::Color(color) => solid_paint(color.to_skia(opacity)),
        PaintServer::CurrentColor => {
            let color = document.inherited(element, |s| s.color).unwrap_or(Rgba::BLACK);
            solid_paint(color.to_skia(opacity))
        }
        PaintServer::Reference { href, fallback } => {
            match resolve_reference(factory, refs, element, href, opacity, bounds) {
                ServerResolution::Resolved(paint) => paint,
                ServerResolution::Unresolvable => {
                    let fallback = fallback.as_deref()?;
                    tracing::debug!("paint server {} unresolvable, using fallback", href);
                    return resolve(factory, refs, element, fallback, opacity, bounds, for_stroke);
                }
            }
        }
    };

    paint.set_anti_alias(is_antialias(factory.units(), element));
    if for_stroke {
        apply_stroke(factory.units(), element, &mut paint);
    } else {
        paint.set_style(paint::Style::Fill);
    }
    Some(paint)
}

/// Resolve a `url(#id)` paint server reference
pub fn resolve_reference(
    factory: &DrawableFactory,
    refs: &mut ReferenceChain,
    element: ElementId,
    href: &str,
    opacity: f32,
    bounds: Rect,
) -> ServerResolution {
    let document = factory.units().document();
    let target = match document.require(href) {
        Ok(target) => target,
        Err(error) => {
            tracing::warn!("paint server: {}", error);
            return ServerResolution::Unresolvable;
        }
    };
    match document.kind(target) {
        ElementKind::LinearGradient(_) | ElementKind::RadialGradient(_) => {
            gradient::resolve(factory.units(), element, target, opacity, bounds)
        }
        ElementKind::Pattern(_) => pattern::resolve(factory, refs, element, target, opacity, bounds),
        other => {
            tracing::warn!("{} is a <{}>, not a paint server", href, other.tag_name());
            ServerResolution::Unresolvable
        }
    }
}

pub fn fill_channel(
    factory: &DrawableFactory,
    refs: &mut ReferenceChain,
    element: ElementId,
    bounds: Rect,
) -> PaintChannel {
    let document = factory.units().document();
    let server = document
        .inherited(element, |s| s.fill.clone())
        .unwrap_or(PaintServer::Color(Rgba::BLACK));
    if server == PaintServer::None {
        return PaintChannel::NotRequested;
    }
    let opacity = document.inherited(element, |s| s.fill_opacity).unwrap_or(1.0);
    match resolve(factory, refs, element, &server, opacity, bounds, false) {
        Some(paint) => PaintChannel::Resolved(paint),
        None => PaintChannel::Failed,
    }
}

pub fn stroke_channel(
    factory: &DrawableFactory,
    refs: &mut ReferenceChain,
    element: ElementId,
    bounds: Rect,
) -> PaintChannel {
    let document = factory.units().document();
    let server = document.inherited(element, |s| s.stroke.clone()).unwrap_or(PaintServer::None);
    if server == PaintServer::None || stroke_width(factory.units(), element) <= 0.0 {
        return PaintChannel::NotRequested;
    }
    let opacity = document.inherited(element, |s| s.stroke_opacity).unwrap_or(1.0);
    match resolve(factory, refs, element, &server, opacity, bounds, true) {
        Some(paint) => PaintChannel::Resolved(paint),
        None => PaintChannel::Failed,
    }
}

pub fn stroke_width(units: &UnitResolver, element: ElementId) -> f32 {
    let width = units
        .document()
        .inherited(element, |s| s.stroke_width)
        .unwrap_or(crate::document::Length::number(1.0));
    units.to_device(width, UnitAxis::Other, element, None)
}

/// `shape-rendering` mapped to antialiasing
pub fn is_antialias(units: &UnitResolver, element: ElementId) -> bool {
    match units.document().inherited(element, |s| s.shape_rendering) {
        Some(ShapeRendering::OptimizeSpeed | ShapeRendering::CrispEdges) => false,
        Some(ShapeRendering::GeometricPrecision) => true,
        Some(ShapeRendering::Auto) | None => units.config().antialias,
    }
}

/// Configure `paint` as a stroke: width, caps, joins, miter limit and dashes
pub fn apply_stroke(units: &UnitResolver, element: ElementId, paint: &mut Paint) {
    let document = units.document();
    paint.set_style(paint::Style::Stroke);
    paint.set_stroke_width(stroke_width(units, element));
    paint.set_stroke_cap(match document.inherited(element, |s| s.stroke_linecap).unwrap_or_default() {
        LineCap::Butt => paint::Cap::Butt,
        LineCap::Round => paint::Cap::Round,
        LineCap::Square => paint::Cap::Square,
    });
    paint.set_stroke_join(match document.inherited(element, |s| s.stroke_linejoin).unwrap_or_default() {
        LineJoin::Miter => paint::Join::Miter,
        LineJoin::Round => paint::Join::Round,
        LineJoin::Bevel => paint::Join::Bevel,
    });
    paint.set_stroke_miter(document.inherited(element, |s| s.stroke_miterlimit).unwrap_or(4.0).max(1.0));

    if let Some(dash) = dash_effect(units, element) {
        paint.set_path_effect(dash);
    }
}

/// Dash effect from `stroke-dasharray` / `stroke-dashoffset`
fn dash_effect(units: &UnitResolver, element: ElementId) -> Option<PathEffect> {
    let document = units.document();
    let array = document.inherited(element, |s| s.stroke_dasharray.clone())?;
    let mut intervals: Vec<f32> = array
        .iter()
        .map(|length| units.to_device(*length, UnitAxis::Other, element, None))
        .collect();
    if intervals.is_empty() || intervals.iter().any(|v| *v < 0.0) || intervals.iter().sum::<f32>() <= 0.0 {
        return None;
    }
    if intervals.len() % 2 == 1 {
        intervals.extend_from_within(..);
    }
    let offset = document
        .inherited(element, |s| s.stroke_dashoffset)
        .map(|length| units.to_device(length, UnitAxis::Other, element, None))
        .unwrap_or(0.0);
    PathEffect::dash(&intervals, offset)
}
