// SVG drawable tree: builds, resolves and draws an SVG element tree through Skia
pub mod assets;
pub mod clip;
pub mod config;
pub mod disposal;
pub mod document;
pub mod drawable;
pub mod error;
pub mod filter;
mod font;
pub mod geometry;
pub mod marker;
pub mod paint;
pub mod units;

#[cfg(test)]
mod testing;

pub use crate::assets::{AssetLoader, LocalAssetLoader};
pub use crate::config::RenderConfig;
pub use crate::document::{Document, ElementId, ElementKind};
pub use crate::drawable::{Drawable, DrawableId, DrawableKind, DrawableTree, IgnoreAttributes};
pub use crate::error::{RenderError, Result};

use crate::drawable::{DrawableFactory, ReferenceChain};
use skia_safe::{Canvas, Picture, Point, Rect};

/// Build the drawable tree for `document` with the default asset loader
pub fn build_tree(document: &Document, config: &RenderConfig) -> DrawableTree {
    build_tree_with_loader(document, config, &LocalAssetLoader)
}

/// Build the drawable tree for `document`: the build pass over the whole element
/// tree, then the post-process pass resolving clip paths, masks, opacity and filters
pub fn build_tree_with_loader(document: &Document, config: &RenderConfig, loader: &dyn AssetLoader) -> DrawableTree {
    let mut tree = DrawableTree::new();
    let Some(root) = document.root() else {
        tracing::debug!("document has no root element");
        return tree;
    };

    let factory = DrawableFactory::new(document, config, loader);
    let mut refs = ReferenceChain::new();
    let root = factory.create(&mut tree, root, None, None, IgnoreAttributes::empty(), &mut refs);
    tree.set_root(root);
    if let Some(root) = root {
        factory.post_process(&mut tree, root, IgnoreAttributes::empty(), &mut refs);
    }
    tracing::debug!("built {} drawables for {} elements", tree.len(), document.len());
    tree
}

/// Draw the whole tree onto `canvas`
pub fn draw(tree: &DrawableTree, canvas: &Canvas) {
    if let Some(root) = tree.root() {
        let _ = tree.draw(canvas, root, IgnoreAttributes::empty(), None);
    }
}

/// Leaf drawables under `point`, topmost first
pub fn hit_test(tree: &DrawableTree, point: Point) -> Vec<DrawableId> {
    tree.hit_test(point)
}

/// Record `id` into a picture clipped to `bounds`
pub fn snapshot(tree: &DrawableTree, id: DrawableId, bounds: Rect) -> Option<Picture> {
    tree.snapshot(id, bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        Fragment, GradientAttributes, Length, LinearGradient, PaintServer, Rgba, Stop, Transform,
    };
    use crate::testing::pixel;
    use skia_safe::{surfaces, Color};

    fn circle(cx: f32, cy: f32, r: f32) -> ElementKind {
        ElementKind::Circle { cx: Length::number(cx), cy: Length::number(cy), r: Length::number(r) }
    }

    #[test]
    fn red_circle_end_to_end() {
        let mut doc = Document::new();
        let root = doc.create_root(ElementKind::Svg(Fragment {
            width: Length::px(100.0),
            height: Length::px(100.0),
            ..Fragment::default()
        }));
        let shape = doc.append(root, circle(50.0, 50.0, 40.0));
        doc.style_mut(shape).fill = Some(PaintServer::Color(Rgba::rgb(255, 0, 0)));

        let tree = build_tree(&doc, &RenderConfig::default());
        let id = tree.find(shape).unwrap();
        assert_eq!(tree[id].transformed_bounds, Rect::from_xywh(10.0, 10.0, 80.0, 80.0));

        let mut surface = surfaces::raster_n32_premul((100, 100)).unwrap();
        draw(&tree, surface.canvas());
        assert_eq!(pixel(&mut surface, 50, 50), Color::RED);
        assert_eq!(pixel(&mut surface, 2, 2).a(), 0);
        assert_eq!(hit_test(&tree, Point::new(50.0, 50.0)), vec![id]);
    }

    #[test]
    fn translated_group_with_gradient_and_opacity() {
        let mut doc = Document::new();
        let root = doc.create_root(ElementKind::Svg(Fragment {
            width: Length::px(100.0),
            height: Length::px(100.0),
            ..Fragment::default()
        }));
        let gradient = doc.append(
            root,
            ElementKind::LinearGradient(LinearGradient {
                common: GradientAttributes::default(),
                ..LinearGradient::default()
            }),
        );
        doc.set_id(gradient, "solid");
        for offset in [0.0, 1.0] {
            doc.append(
                gradient,
                ElementKind::Stop(Stop {
                    offset: Length::number(offset),
                    color: Rgba::rgb(0, 0, 255).into(),
                    opacity: 1.0,
                }),
            );
        }
        let group = doc.append(root, ElementKind::Group);
        doc.style_mut(group).transform = Transform::Translate { x: 20.0, y: 0.0 }.into();
        doc.style_mut(group).opacity = Some(0.5);
        let shape = doc.append(group, circle(20.0, 20.0, 10.0));
        doc.style_mut(shape).fill = Some(PaintServer::reference("url(#solid)"));

        let tree = build_tree(&doc, &RenderConfig::default());
        let group_id = tree.find(group).unwrap();
        assert_eq!(tree[group_id].transformed_bounds, Rect::from_xywh(30.0, 10.0, 20.0, 20.0));
        assert!(tree[group_id].opacity.is_some());

        let mut surface = surfaces::raster_n32_premul((100, 100)).unwrap();
        draw(&tree, surface.canvas());
        let center = pixel(&mut surface, 40, 20);
        assert_eq!((center.r(), center.g(), center.b()), (0, 0, 255));
        assert!((120..=135).contains(&center.a()));
    }

    #[test]
    fn bounding_box_gradient_on_flat_shape_paints_the_fallback() {
        let mut doc = Document::new();
        let root = doc.create_root(ElementKind::Svg(Fragment {
            width: Length::px(20.0),
            height: Length::px(20.0),
            ..Fragment::default()
        }));
        let gradient = doc.append(root, ElementKind::LinearGradient(LinearGradient::default()));
        doc.set_id(gradient, "fade");
        for (offset, color) in [(0.0, Rgba::rgb(255, 0, 0)), (1.0, Rgba::rgb(0, 0, 255))] {
            doc.append(
                gradient,
                ElementKind::Stop(Stop { offset: Length::number(offset), color: color.into(), opacity: 1.0 }),
            );
        }
        let line = doc.append(
            root,
            ElementKind::Line {
                x1: Length::number(10.0),
                y1: Length::number(0.0),
                x2: Length::number(10.0),
                y2: Length::number(20.0),
            },
        );
        let style = doc.style_mut(line);
        style.stroke = Some(PaintServer::reference_with_fallback(
            "url(#fade)",
            PaintServer::Color(Rgba::rgb(0, 255, 0)),
        ));
        style.stroke_width = Some(Length::number(4.0));

        let tree = build_tree(&doc, &RenderConfig::default());
        let id = tree.find(line).unwrap();
        assert_eq!(tree[id].geometry_bounds.width(), 0.0);

        let mut surface = surfaces::raster_n32_premul((20, 20)).unwrap();
        draw(&tree, surface.canvas());
        assert_eq!(pixel(&mut surface, 10, 5), Color::GREEN);
        assert_eq!(pixel(&mut surface, 10, 15), Color::GREEN);
        assert_eq!(pixel(&mut surface, 2, 10).a(), 0);
    }

    #[test]
    fn dispose_releases_every_resource() {
        let mut doc = Document::new();
        let root = doc.create_root(ElementKind::Svg(Fragment::default()));
        for index in 0..3 {
            doc.append(root, circle(10.0 * index as f32, 10.0, 5.0));
        }
        let mut tree = build_tree(&doc, &RenderConfig::default());
        assert_eq!(tree.len(), 4);
        assert!(tree.dispose() > 0);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
    }

    #[test]
    fn empty_document_builds_an_empty_tree() {
        let tree = build_tree(&Document::new(), &RenderConfig::default());
        assert!(tree.is_empty());
        let mut surface = surfaces::raster_n32_premul((10, 10)).unwrap();
        draw(&tree, surface.canvas());
        assert!(snapshot(&tree, DrawableId(0), Rect::from_wh(10.0, 10.0)).is_none());
    }
}
