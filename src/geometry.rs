// Shape geometry builders

use crate::document::{ElementId, ElementKind, FillRule, PathSegment};
use crate::error::{RenderError, Result};
use crate::units::{UnitAxis, UnitResolver};
use kurbo::{BezPath, PathEl, SvgArc, Vec2};
use skia_safe::{Path, PathFillType, Rect};

/// Resolved geometry of a shape element
#[derive(Debug, Clone)]
pub struct Geometry {
    pub path: Path,
    /// Segment outline kept for marker placement (paths, lines and polylines only)
    pub outline: Option<Outline>,
}

/// Outline of a shape as written, for marker placement
#[derive(Debug, Clone, Default)]
pub struct Outline {
    pub path: BezPath,
    /// Sorted indices of elements ending inside one source segment, such as all
    /// but the last cubic approximating an arc
    pub inner_ends: Vec<usize>,
}

impl Outline {
    /// Whether element `index` ends a segment of the source data
    pub fn ends_segment(&self, index: usize) -> bool {
        self.inner_ends.binary_search(&index).is_err()
    }
}

impl From<BezPath> for Outline {
    fn from(path: BezPath) -> Self {
        Self { path, inner_ends: Vec::new() }
    }
}

impl Geometry {
    fn from_path(path: Path) -> Self {
        Self { path, outline: None }
    }

    fn from_outline(outline: impl Into<Outline>) -> Self {
        let outline = outline.into();
        Self {
            path: to_skia_path(&outline.path),
            outline: Some(outline),
        }
    }

    pub fn bounds(&self) -> Rect {
        self.path.compute_tight_bounds()
    }
}

/// Build the geometry of a shape element. `Ok(None)` means the shape is empty or
/// degenerate; `Err` means the data is malformed.
pub fn element_geometry(units: &UnitResolver, element: ElementId) -> Result<Option<Geometry>> {
    let document = units.document();
    let tolerance = units.config().curve_tolerance;
    let x = |length| units.to_device(length, UnitAxis::Horizontal, element, None);
    let y = |length| units.to_device(length, UnitAxis::Vertical, element, None);
    let other = |length| units.to_device(length, UnitAxis::Other, element, None);

    let geometry = match &document[element].kind {
        ElementKind::Circle { cx, cy, r } => circle(x(*cx), y(*cy), other(*r)).map(Geometry::from_path),
        ElementKind::Ellipse { cx, cy, rx, ry } => {
            ellipse(x(*cx), y(*cy), x(*rx), y(*ry)).map(Geometry::from_path)
        }
        ElementKind::Rect(shape) => rect(
            x(shape.x),
            y(shape.y),
            x(shape.width),
            y(shape.height),
            shape.rx.map(x),
            shape.ry.map(y),
        )
        .map(Geometry::from_path),
        ElementKind::Line { x1, y1, x2, y2 } => {
            Some(Geometry::from_outline(line(x(*x1), y(*y1), x(*x2), y(*y2))))
        }
        ElementKind::Polyline { points } => polyline(points, false)?.map(Geometry::from_outline),
        ElementKind::Polygon { points } => polyline(points, true)?.map(Geometry::from_outline),
        ElementKind::Path { segments } => path_data(segments, tolerance)?.map(Geometry::from_outline),
        _ => None,
    };

    Ok(geometry.map(|mut geometry| {
        let rule = document
            .inherited(element, |s| s.fill_rule)
            .unwrap_or_default();
        geometry.path.set_fill_type(fill_type(rule));
        geometry
    }))
}

pub fn fill_type(rule: FillRule) -> PathFillType {
    match rule {
        FillRule::NonZero => PathFillType::Winding,
        FillRule::EvenOdd => PathFillType::EvenOdd,
    }
}

pub fn circle(cx: f32, cy: f32, r: f32) -> Option<Path> {
    if !(r > 0.0) || !cx.is_finite() || !cy.is_finite() {
        return None;
    }
    let mut path = Path::new();
    path.add_circle((cx, cy), r, None);
    Some(path)
}

pub fn ellipse(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Path> {
    if !(rx > 0.0) || !(ry > 0.0) {
        return None;
    }
    let mut path = Path::new();
    path.add_oval(Rect::from_ltrb(cx - rx, cy - ry, cx + rx, cy + ry), None);
    Some(path)
}

/// Rectangle with optional rounded corners. A missing radius takes the value of the
/// other one; both are clamped to half the rectangle's size.
pub fn rect(x: f32, y: f32, width: f32, height: f32, rx: Option<f32>, ry: Option<f32>) -> Option<Path> {
    if !(width > 0.0) || !(height > 0.0) {
        return None;
    }
    let rx = rx.filter(|r| *r >= 0.0);
    let ry = ry.filter(|r| *r >= 0.0);
    let (rx, ry) = match (rx, ry) {
        (Some(rx), Some(ry)) => (rx, ry),
        (Some(r), None) | (None, Some(r)) => (r, r),
        (None, None) => (0.0, 0.0),
    };
    let rx = rx.min(width / 2.0);
    let ry = ry.min(height / 2.0);

    let bounds = Rect::from_xywh(x, y, width, height);
    let mut path = Path::new();
    if rx > 0.0 && ry > 0.0 {
        path.add_round_rect(bounds, (rx, ry), None);
    } else {
        path.add_rect(bounds, None);
    }
    Some(path)
}

pub fn line(x1: f32, y1: f32, x2: f32, y2: f32) -> BezPath {
    let mut outline = BezPath::new();
    outline.move_to((x1 as f64, y1 as f64));
    outline.line_to((x2 as f64, y2 as f64));
    outline
}

pub fn polyline(points: &[(f32, f32)], close: bool) -> Result<Option<BezPath>> {
    if points.len() < 2 {
        return Ok(None);
    }
    if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(RenderError::NonFiniteCoordinate(if close { "polygon" } else { "polyline" }));
    }
    let mut outline = BezPath::new();
    outline.move_to((points[0].0 as f64, points[0].1 as f64));
    for (x, y) in &points[1..] {
        outline.line_to((*x as f64, *y as f64));
    }
    if close {
        outline.close_path();
    }
    Ok(Some(outline))
}

/// Build an outline from absolute path segments
pub fn path_data(segments: &[PathSegment], tolerance: f64) -> Result<Option<Outline>> {
    let Some(first) = segments.first() else {
        return Ok(None);
    };
    if !matches!(first, PathSegment::MoveTo { .. }) {
        return Err(RenderError::MissingMoveTo);
    }

    let mut outline = BezPath::new();
    let mut inner_ends = Vec::new();
    let mut current = kurbo::Point::ZERO;
    let mut subpath_start = kurbo::Point::ZERO;
    let mut has_drawing = false;

    for segment in segments {
        if !segment_is_finite(segment) {
            return Err(RenderError::NonFiniteCoordinate("path"));
        }
        match *segment {
            PathSegment::MoveTo { x, y } => {
                current = point(x, y);
                subpath_start = current;
                outline.move_to(current);
            }
            PathSegment::LineTo { x, y } => {
                current = point(x, y);
                outline.line_to(current);
                has_drawing = true;
            }
            PathSegment::CubicTo { x1, y1, x2, y2, x, y } => {
                current = point(x, y);
                outline.curve_to(point(x1, y1), point(x2, y2), current);
                has_drawing = true;
            }
            PathSegment::QuadTo { x1, y1, x, y } => {
                current = point(x, y);
                outline.quad_to(point(x1, y1), current);
                has_drawing = true;
            }
            PathSegment::ArcTo { rx, ry, x_axis_rotation, large_arc, sweep, x, y } => {
                let to = point(x, y);
                let arc = SvgArc {
                    from: current,
                    to,
                    radii: Vec2::new(rx.abs() as f64, ry.abs() as f64),
                    x_rotation: (x_axis_rotation as f64).to_radians(),
                    large_arc,
                    sweep,
                };
                match kurbo::Arc::from_svg_arc(&arc) {
                    Some(arc) if !arc_is_degenerate(&arc) => {
                        for element in arc.append_iter(tolerance) {
                            outline.push(element);
                            inner_ends.push(outline.elements().len() - 1);
                        }
                        inner_ends.pop();
                    }
                    _ => outline.line_to(to),
                }
                current = to;
                has_drawing = true;
            }
            PathSegment::ClosePath => {
                outline.close_path();
                current = subpath_start;
            }
        }
    }

    Ok(has_drawing.then_some(Outline { path: outline, inner_ends }))
}

fn arc_is_degenerate(arc: &kurbo::Arc) -> bool {
    arc.radii.x == 0.0 || arc.radii.y == 0.0
}

fn point(x: f32, y: f32) -> kurbo::Point {
    kurbo::Point::new(x as f64, y as f64)
}

fn segment_is_finite(segment: &PathSegment) -> bool {
    let values: &[f32] = match segment {
        PathSegment::MoveTo { x, y } | PathSegment::LineTo { x, y } => &[*x, *y],
        PathSegment::CubicTo { x1, y1, x2, y2, x, y } => &[*x1, *y1, *x2, *y2, *x, *y],
        PathSegment::QuadTo { x1, y1, x, y } => &[*x1, *y1, *x, *y],
        PathSegment::ArcTo { rx, ry, x_axis_rotation, x, y, .. } => &[*rx, *ry, *x_axis_rotation, *x, *y],
        PathSegment::ClosePath => &[],
    };
    values.iter().all(|v| v.is_finite())
}

/// Convert a kurbo outline into a Skia path
pub fn to_skia_path(outline: &BezPath) -> Path {
    let mut path = Path::new();
    for element in outline.elements() {
        match *element {
            PathEl::MoveTo(p) => {
                path.move_to((p.x as f32, p.y as f32));
            }
            PathEl::LineTo(p) => {
                path.line_to((p.x as f32, p.y as f32));
            }
            PathEl::QuadTo(p1, p2) => {
                path.quad_to((p1.x as f32, p1.y as f32), (p2.x as f32, p2.y as f32));
            }
            PathEl::CurveTo(p1, p2, p3) => {
                path.cubic_to(
                    (p1.x as f32, p1.y as f32),
                    (p2.x as f32, p2.y as f32),
                    (p3.x as f32, p3.y as f32),
                );
            }
            PathEl::ClosePath => {
                path.close();
            }
        }
    }
    path
}
