// Marker placement along shape outlines

use crate::document::{ElementId, ElementKind, Marker, MarkerOrient, MarkerUnits};
use crate::drawable::{ContainerKind, DrawableFactory, DrawableId, DrawableTree, ReferenceChain};
use crate::geometry::Outline;
use crate::units::{UnitAxis, view_box_transform};
use kurbo::{PathEl, QuadBez};
use skia_safe::{Matrix, Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    /// First point of a subpath
    Start,
    Line,
    /// Control or end point of a cubic segment
    Bezier,
    /// Point of a curve piece ending inside a source segment; never carries a marker
    Inner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerPosition {
    Start,
    Mid,
    End,
}

/// Where one marker instance goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: MarkerPosition,
    pub anchor: Point,
    /// Path direction at the anchor, in degrees
    pub angle: f32,
}

fn point(p: kurbo::Point) -> Point {
    Point::new(p.x as f32, p.y as f32)
}

/// Flatten `outline` into its vertices. Quadratic segments are raised to cubics
/// so every curve contributes three points; a close adds a line back to the
/// subpath start.
pub fn vertices(outline: &Outline) -> Vec<(Point, VertexKind)> {
    let mut vertices = Vec::new();
    let mut start = kurbo::Point::ZERO;
    let mut last = kurbo::Point::ZERO;
    for (index, element) in outline.path.elements().iter().enumerate() {
        match *element {
            PathEl::CurveTo(p1, p2, p3) if !outline.ends_segment(index) => {
                vertices.extend([p1, p2, p3].map(|p| (point(p), VertexKind::Inner)));
                last = p3;
            }
            PathEl::MoveTo(p) => {
                vertices.push((point(p), VertexKind::Start));
                start = p;
                last = p;
            }
            PathEl::LineTo(p) => {
                vertices.push((point(p), VertexKind::Line));
                last = p;
            }
            PathEl::QuadTo(p1, p2) => {
                let cubic = QuadBez::new(last, p1, p2).raise();
                vertices.extend([cubic.p1, cubic.p2, cubic.p3].map(|p| (point(p), VertexKind::Bezier)));
                last = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                vertices.extend([p1, p2, p3].map(|p| (point(p), VertexKind::Bezier)));
                last = p3;
            }
            PathEl::ClosePath => {
                vertices.push((point(start), VertexKind::Line));
                last = start;
            }
        }
    }
    vertices
}

fn direction(from: Point, to: Point) -> Option<Point> {
    let delta = to - from;
    let length = delta.length();
    (length > f32::EPSILON).then(|| Point::new(delta.x / length, delta.y / length))
}

fn degrees(direction: Point) -> f32 {
    direction.y.atan2(direction.x).to_degrees()
}

/// Direction arriving at `index`, skipping coincident points
fn incoming(points: &[Point], index: usize) -> Option<Point> {
    points[..index].iter().rev().find_map(|previous| direction(*previous, points[index]))
}

/// Direction leaving `index`, skipping coincident points
fn outgoing(points: &[Point], index: usize) -> Option<Point> {
    points[index + 1..].iter().find_map(|next| direction(points[index], *next))
}

/// Bisector of the incoming and outgoing directions
fn bisector(incoming: Option<Point>, outgoing: Option<Point>) -> f32 {
    match (incoming, outgoing) {
        (Some(a), Some(b)) => {
            let sum = a + b;
            if sum.length() <= f32::EPSILON {
                degrees(a)
            } else {
                degrees(sum)
            }
        }
        (Some(a), None) | (None, Some(a)) => degrees(a),
        (None, None) => 0.0,
    }
}

/// Anchor points and path directions for start, mid and end markers. Inside a
/// run of cubic segments only the end point of each segment is a vertex.
pub fn placements(vertices: &[(Point, VertexKind)]) -> Vec<Placement> {
    let points: Vec<Point> = vertices.iter().map(|(p, _)| *p).collect();
    let Some(last) = points.len().checked_sub(1) else {
        return Vec::new();
    };

    let mut placements = vec![Placement {
        position: MarkerPosition::Start,
        anchor: points[0],
        angle: outgoing(&points, 0).map(degrees).unwrap_or(0.0),
    }];

    let mut bezier_index = 0;
    for (index, (anchor, kind)) in vertices.iter().enumerate().take(last).skip(1) {
        match kind {
            VertexKind::Inner => continue,
            VertexKind::Bezier => {
                bezier_index += 1;
                if bezier_index % 3 != 0 {
                    continue;
                }
            }
            VertexKind::Start | VertexKind::Line => bezier_index = 0,
        }
        placements.push(Placement {
            position: MarkerPosition::Mid,
            anchor: *anchor,
            angle: bisector(incoming(&points, index), outgoing(&points, index)),
        });
    }

    if last > 0 {
        placements.push(Placement {
            position: MarkerPosition::End,
            anchor: points[last],
            angle: incoming(&points, last).map(degrees).unwrap_or(0.0),
        });
    }
    placements
}

/// Instantiate the start, mid and end markers of `shape` along `outline`
pub fn build_markers(
    factory: &DrawableFactory,
    tree: &mut DrawableTree,
    shape: DrawableId,
    outline: &Outline,
    stroke_width: f32,
    refs: &mut ReferenceChain,
) -> Vec<DrawableId> {
    let document = factory.units().document();
    let element = tree[shape].element;
    let lookup = |get: fn(&crate::document::Presentation) -> Option<String>| {
        document.inherited(element, get).and_then(|reference| {
            let marker = document.lookup(&reference);
            if marker.is_none() {
                tracing::warn!("marker reference {} not found", reference);
            }
            marker.filter(|id| matches!(document.kind(*id), ElementKind::Marker(_)))
        })
    };
    let start = lookup(|s| s.marker_start.clone());
    let mid = lookup(|s| s.marker_mid.clone());
    let end = lookup(|s| s.marker_end.clone());
    if start.is_none() && mid.is_none() && end.is_none() {
        return Vec::new();
    }

    let mut markers = Vec::new();
    for placement in placements(&vertices(outline)) {
        let marker = match placement.position {
            MarkerPosition::Start => start,
            MarkerPosition::Mid => mid,
            MarkerPosition::End => end,
        };
        let Some(marker) = marker else {
            continue;
        };
        if !refs.enter(marker) {
            tracing::trace!("marker {} references itself", marker.index());
            continue;
        }
        markers.extend(instantiate(factory, tree, shape, marker, &placement, stroke_width, refs));
        refs.leave(marker);
    }
    markers
}

fn instantiate(
    factory: &DrawableFactory,
    tree: &mut DrawableTree,
    shape: DrawableId,
    marker: ElementId,
    placement: &Placement,
    stroke_width: f32,
    refs: &mut ReferenceChain,
) -> Option<DrawableId> {
    let units = factory.units();
    let document = units.document();
    let ElementKind::Marker(attributes) = document.kind(marker) else {
        return None;
    };
    let width = units.to_device(attributes.width, UnitAxis::Horizontal, marker, None);
    let height = units.to_device(attributes.height, UnitAxis::Vertical, marker, None);
    if width <= 0.0 || height <= 0.0 {
        return None;
    }

    let transform = marker_transform(factory, marker, attributes, placement, stroke_width, width, height);
    let content = factory.create_content(tree, marker, ContainerKind::Marker, Some(shape), transform, refs)?;

    if document[marker].style.overflow.unwrap_or_default().clips() {
        let view_box = viewport_transform(attributes, width, height);
        let clip = view_box.invert().map(|inverse| inverse.map_rect(Rect::from_wh(width, height)).0);
        tree[content].clip = clip;
    }
    Some(content)
}

fn viewport_transform(attributes: &Marker, width: f32, height: f32) -> Matrix {
    match attributes.view_box.filter(|view_box| view_box.is_valid()) {
        Some(view_box) => view_box_transform(&view_box, &attributes.aspect, width, height),
        None => Matrix::new_identity(),
    }
}

/// anchor translation, orientation, stroke-width scale, then the viewBox mapping
/// with the reference point moved onto the anchor
fn marker_transform(
    factory: &DrawableFactory,
    marker: ElementId,
    attributes: &Marker,
    placement: &Placement,
    stroke_width: f32,
    width: f32,
    height: f32,
) -> Matrix {
    let units = factory.units();
    let angle = match attributes.orient {
        MarkerOrient::Auto => placement.angle,
        MarkerOrient::AutoStartReverse if placement.position == MarkerPosition::Start => placement.angle + 180.0,
        MarkerOrient::AutoStartReverse => placement.angle,
        MarkerOrient::Angle(angle) => angle,
        MarkerOrient::Zero => 0.0,
    };

    let view_box = viewport_transform(attributes, width, height);
    let reference = view_box.map_point(Point::new(
        units.to_device(attributes.ref_x, UnitAxis::Horizontal, marker, None),
        units.to_device(attributes.ref_y, UnitAxis::Vertical, marker, None),
    ));

    let mut transform = Matrix::translate(placement.anchor);
    transform.pre_rotate(angle, None);
    if attributes.units == MarkerUnits::StrokeWidth {
        transform.pre_scale((stroke_width, stroke_width), None);
    }
    transform.pre_translate((-reference.x, -reference.y));
    transform.pre_concat(&view_box);
    transform
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LocalAssetLoader;
    use crate::config::RenderConfig;
    use crate::document::{Document, Fragment, Length, PaintServer, PathSegment, Rgba};
    use crate::drawable::{DrawableKind, IgnoreAttributes};
    use crate::geometry::path_data;
    use kurbo::BezPath;

    fn kinds(placements: &[Placement]) -> Vec<MarkerPosition> {
        placements.iter().map(|p| p.position).collect()
    }

    #[test]
    fn cubic_runs_place_one_mid_marker_per_segment_end() {
        let mut outline = BezPath::new();
        outline.move_to((0.0, 0.0));
        outline.curve_to((1.0, 0.0), (2.0, 0.0), (3.0, 0.0));
        outline.curve_to((4.0, 0.0), (5.0, 0.0), (6.0, 0.0));
        outline.curve_to((7.0, 0.0), (8.0, 0.0), (9.0, 0.0));

        let placements = placements(&vertices(&Outline::from(outline)));
        assert_eq!(
            kinds(&placements),
            vec![MarkerPosition::Start, MarkerPosition::Mid, MarkerPosition::Mid, MarkerPosition::End]
        );
        assert_eq!(placements[1].anchor, Point::new(3.0, 0.0));
        assert_eq!(placements[2].anchor, Point::new(6.0, 0.0));
        assert!(placements.iter().all(|p| p.angle.abs() < 1e-4));
    }

    fn arc(x: f32, y: f32) -> PathSegment {
        PathSegment::ArcTo {
            rx: 15.0,
            ry: 15.0,
            x_axis_rotation: 0.0,
            large_arc: true,
            sweep: true,
            x,
            y,
        }
    }

    #[test]
    fn single_arc_has_no_mid_marker() {
        let segments = [PathSegment::MoveTo { x: 0.0, y: 20.0 }, arc(30.0, 20.0)];
        let outline = path_data(&segments, 0.1).unwrap().unwrap();
        assert!(outline.path.elements().len() > 2);

        let placements = placements(&vertices(&outline));
        assert_eq!(kinds(&placements), vec![MarkerPosition::Start, MarkerPosition::End]);
        assert!((placements[1].anchor.x - 30.0).abs() < 1e-3);
    }

    #[test]
    fn arc_then_line_has_one_mid_marker_at_the_arc_end() {
        let segments = [
            PathSegment::MoveTo { x: 0.0, y: 20.0 },
            arc(30.0, 20.0),
            PathSegment::LineTo { x: 60.0, y: 20.0 },
        ];
        let outline = path_data(&segments, 0.1).unwrap().unwrap();
        let placements = placements(&vertices(&outline));
        assert_eq!(
            kinds(&placements),
            vec![MarkerPosition::Start, MarkerPosition::Mid, MarkerPosition::End]
        );
        let mid = placements[1].anchor;
        assert!((mid.x - 30.0).abs() < 1e-3 && (mid.y - 20.0).abs() < 1e-3);
    }

    #[test]
    fn line_vertices_use_bisector() {
        let mut outline = BezPath::new();
        outline.move_to((0.0, 0.0));
        outline.line_to((10.0, 0.0));
        outline.line_to((10.0, 10.0));

        let placements = placements(&vertices(&Outline::from(outline)));
        assert_eq!(placements.len(), 3);
        assert!((placements[0].angle - 0.0).abs() < 1e-4);
        assert!((placements[1].angle - 45.0).abs() < 1e-4);
        assert!((placements[2].angle - 90.0).abs() < 1e-4);
    }

    #[test]
    fn coincident_points_are_skipped_for_direction() {
        let mut outline = BezPath::new();
        outline.move_to((0.0, 0.0));
        outline.line_to((0.0, 0.0));
        outline.line_to((0.0, 5.0));
        outline.line_to((0.0, 5.0));

        let placements = placements(&vertices(&Outline::from(outline)));
        assert!((placements[0].angle - 90.0).abs() < 1e-4);
        assert!((placements.last().unwrap().angle - 90.0).abs() < 1e-4);
    }

    #[test]
    fn close_adds_a_vertex_back_to_start() {
        let mut outline = BezPath::new();
        outline.move_to((0.0, 0.0));
        outline.line_to((10.0, 0.0));
        outline.close_path();
        let vertices = vertices(&Outline::from(outline));
        assert_eq!(vertices.last(), Some(&(Point::new(0.0, 0.0), VertexKind::Line)));
    }

    fn path_with_markers(orient: MarkerOrient, self_reference: bool) -> (Document, ElementId) {
        let mut doc = Document::new();
        let root = doc.create_root(ElementKind::Svg(Fragment::default()));
        let marker = doc.append(
            root,
            ElementKind::Marker(Marker {
                orient,
                units: MarkerUnits::UserSpaceOnUse,
                width: Length::number(4.0),
                height: Length::number(4.0),
                ..Marker::default()
            }),
        );
        doc.set_id(marker, "dot");
        let dot = doc.append(
            marker,
            ElementKind::Line {
                x1: Length::ZERO,
                y1: Length::ZERO,
                x2: Length::number(2.0),
                y2: Length::ZERO,
            },
        );
        doc.style_mut(dot).stroke = Some(PaintServer::Color(Rgba::BLACK));
        if self_reference {
            doc.style_mut(dot).marker_start = Some("url(#dot)".into());
        }
        let path = doc.append(
            root,
            ElementKind::Polyline { points: vec![(10.0, 10.0), (50.0, 10.0), (50.0, 50.0)] },
        );
        let style = doc.style_mut(path);
        style.marker_start = Some("url(#dot)".into());
        style.marker_mid = Some("url(#dot)".into());
        style.marker_end = Some("url(#dot)".into());
        (doc, path)
    }

    fn build(doc: &Document) -> DrawableTree {
        let config = RenderConfig::default();
        let factory = DrawableFactory::new(doc, &config, &LocalAssetLoader);
        let mut tree = DrawableTree::new();
        let mut refs = ReferenceChain::new();
        let root = factory.create(&mut tree, doc.root().unwrap(), None, None, IgnoreAttributes::empty(), &mut refs);
        tree.set_root(root);
        assert!(refs.is_empty());
        tree
    }

    fn markers_of(tree: &DrawableTree, path: ElementId) -> Vec<DrawableId> {
        let id = tree.find(path).unwrap();
        match &tree[id].kind {
            DrawableKind::Shape { markers, .. } => markers.clone(),
            _ => panic!("not a shape"),
        }
    }

    #[test]
    fn markers_are_placed_at_every_vertex() {
        let (doc, path) = path_with_markers(MarkerOrient::Auto, false);
        let tree = build(&doc);
        let markers = markers_of(&tree, path);
        assert_eq!(markers.len(), 3);

        let end = &tree[markers[2]];
        let origin = end.transform.map_point(Point::new(0.0, 0.0));
        assert!((origin.x - 50.0).abs() < 1e-4 && (origin.y - 50.0).abs() < 1e-4);
        // Oriented downwards: the marker's x axis maps to +y
        let axis = end.transform.map_vector((1.0, 0.0));
        assert!(axis.x.abs() < 1e-4 && (axis.y - 1.0).abs() < 1e-4);
        assert_eq!(end.clip, Some(Rect::from_wh(4.0, 4.0)));
    }

    #[test]
    fn auto_start_reverse_flips_only_the_start_marker() {
        let (doc, path) = path_with_markers(MarkerOrient::AutoStartReverse, false);
        let tree = build(&doc);
        let markers = markers_of(&tree, path);
        let start_axis = tree[markers[0]].transform.map_vector((1.0, 0.0));
        assert!((start_axis.x + 1.0).abs() < 1e-4);
        let end_axis = tree[markers[2]].transform.map_vector((1.0, 0.0));
        assert!((end_axis.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn marker_content_referencing_its_marker_terminates() {
        let (doc, path) = path_with_markers(MarkerOrient::Zero, true);
        let tree = build(&doc);
        let markers = markers_of(&tree, path);
        assert_eq!(markers.len(), 3);
        for marker in markers {
            let dot = tree[marker].children()[0];
            let DrawableKind::Shape { markers: nested, .. } = &tree[dot].kind else {
                panic!("marker content is not a shape");
            };
            assert!(nested.is_empty());
        }
    }
}
