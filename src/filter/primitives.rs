// Individual filter primitives mapped onto Skia image filters

use super::lighting::{self, Lighting, Reflection};
use super::{resolve_color, transfer, Evaluation, FilterResult};
use crate::document::{
    BlendMode, Channel, CompositeOperator, ConvolveMatrix, EdgeMode, ElementId, ElementKind,
    FilterPrimitive, MorphologyOperator, PreserveAspectRatio, PrimitiveKind, TurbulenceKind,
};
use crate::drawable::{record_picture, DrawableTree, IgnoreAttributes, ReferenceChain};
use crate::units::fit_rect;
use skia_safe::{
    color_filters, image_filters, shaders, BlendMode as SkBlendMode, ColorChannel, IPoint, ISize,
    ImageFilter, Rect, SamplingOptions, TileMode,
};

/// Evaluate one primitive. `None` means the primitive is disabled or its
/// parameters are unusable; the previous result then stays current.
pub(super) fn apply(
    evaluation: &mut Evaluation,
    id: ElementId,
    primitive: &FilterPrimitive,
    subregion: Rect,
    is_first: bool,
    refs: &mut ReferenceChain,
) -> Option<FilterResult> {
    let space = evaluation.space;
    let crop = subregion;
    let output = |filter: Option<ImageFilter>| FilterResult::new(filter, subregion);

    match &primitive.kind {
        PrimitiveKind::Blend { input2, mode } => {
            let foreground = evaluation.get_input(&primitive.input, is_first);
            let background = evaluation.get_input(input2, is_first);
            output(image_filters::blend(
                blend_mode(*mode),
                background.node.input(),
                foreground.node.input(),
                crop,
            ))
        }
        PrimitiveKind::ColorMatrix(kind) => {
            let input = evaluation.get_input(&primitive.input, is_first);
            let matrix = transfer::color_matrix(kind);
            output(image_filters::color_filter(
                color_filters::matrix_row_major(&matrix, None),
                input.node.input(),
                crop,
            ))
        }
        PrimitiveKind::ComponentTransfer => {
            let input = evaluation.get_input(&primitive.input, is_first);
            let document = evaluation.document();
            let functions = document.children(id).iter().filter_map(|child| match document.kind(*child) {
                ElementKind::TransferFunction(function) => Some((function.channel, &function.func)),
                _ => None,
            });
            let [a, r, g, b] = transfer::channel_tables(functions);
            let table = color_filters::table_argb(&a, &r, &g, &b)?;
            output(image_filters::color_filter(table, input.node.input(), crop))
        }
        PrimitiveKind::Composite { input2, operator } => {
            let foreground = evaluation.get_input(&primitive.input, is_first);
            let background = evaluation.get_input(input2, is_first);
            let filter = match *operator {
                CompositeOperator::Arithmetic { k1, k2, k3, k4 } => image_filters::arithmetic(
                    k1,
                    k2,
                    k3,
                    k4,
                    true,
                    background.node.input(),
                    foreground.node.input(),
                    crop,
                ),
                operator => image_filters::blend(
                    composite_mode(operator),
                    background.node.input(),
                    foreground.node.input(),
                    crop,
                ),
            };
            output(filter)
        }
        PrimitiveKind::ConvolveMatrix(matrix) => {
            let input = evaluation.get_input(&primitive.input, is_first);
            output(convolve(matrix, input.node.input(), crop)?)
        }
        PrimitiveKind::DiffuseLighting { surface_scale, diffuse_constant, lighting_color } => {
            if *diffuse_constant < 0.0 {
                return None;
            }
            let input = evaluation.get_input(&primitive.input, is_first);
            let lighting = Lighting {
                reflection: Reflection::Diffuse { constant: *diffuse_constant },
                surface_scale: *surface_scale,
                color: resolve_color(evaluation.document(), id, *lighting_color, 1.0),
            };
            let light = light_source(evaluation, id)?;
            output(lighting::light_filter(&light, &lighting, &space, input.node.input(), crop))
        }
        PrimitiveKind::SpecularLighting {
            surface_scale,
            specular_constant,
            specular_exponent,
            lighting_color,
        } => {
            if *specular_constant < 0.0 {
                return None;
            }
            let input = evaluation.get_input(&primitive.input, is_first);
            let lighting = Lighting {
                reflection: Reflection::Specular {
                    constant: *specular_constant,
                    exponent: specular_exponent.clamp(1.0, 128.0),
                },
                surface_scale: *surface_scale,
                color: resolve_color(evaluation.document(), id, *lighting_color, 1.0),
            };
            let light = light_source(evaluation, id)?;
            output(lighting::light_filter(&light, &lighting, &space, input.node.input(), crop))
        }
        PrimitiveKind::DisplacementMap { input2, scale, x_channel, y_channel } => {
            let color = evaluation.get_input(&primitive.input, is_first);
            let displacement = evaluation.get_input(input2, is_first);
            output(image_filters::displacement_map(
                (color_channel(*x_channel), color_channel(*y_channel)),
                space.length(*scale),
                displacement.node.input(),
                color.node.input(),
                crop,
            ))
        }
        PrimitiveKind::DropShadow { dx, dy, std_deviation: (sx, sy), color, opacity } => {
            if *sx < 0.0 || *sy < 0.0 {
                return None;
            }
            let input = evaluation.get_input(&primitive.input, is_first);
            let color = resolve_color(evaluation.document(), id, *color, *opacity);
            output(image_filters::drop_shadow(
                (space.dx(*dx), space.dy(*dy)),
                (space.length(*sx), space.length(*sy)),
                color,
                None,
                input.node.input(),
                crop,
            ))
        }
        PrimitiveKind::Flood { color, opacity } => {
            let color = resolve_color(evaluation.document(), id, *color, *opacity);
            output(image_filters::shader(shaders::color(color), crop))
        }
        PrimitiveKind::GaussianBlur { std_deviation: (sx, sy) } => {
            if *sx < 0.0 || *sy < 0.0 {
                return None;
            }
            let input = evaluation.get_input(&primitive.input, is_first);
            if *sx == 0.0 && *sy == 0.0 {
                return Some(FilterResult { node: input.node, region: subregion });
            }
            output(image_filters::blur(
                (space.length(*sx), space.length(*sy)),
                TileMode::Decal,
                input.node.input(),
                crop,
            ))
        }
        PrimitiveKind::Image { href, aspect } => Some(image(evaluation, href, aspect, subregion, refs)),
        PrimitiveKind::Merge => {
            let document = evaluation.document();
            let keys: Vec<String> = document
                .children(id)
                .iter()
                .filter_map(|child| match document.kind(*child) {
                    ElementKind::MergeNode { input } => Some(input.clone()),
                    _ => None,
                })
                .collect();
            let inputs: Vec<Option<ImageFilter>> = keys
                .iter()
                .map(|key| evaluation.get_input(key, is_first).node.input())
                .collect();
            output(image_filters::merge(inputs, crop))
        }
        PrimitiveKind::Morphology { operator, radius: (rx, ry) } => {
            let (rx, ry) = (space.dx(*rx).round(), space.dy(*ry).round());
            if rx < 0.0 || ry < 0.0 {
                return None;
            }
            let input = evaluation.get_input(&primitive.input, is_first);
            if rx == 0.0 && ry == 0.0 {
                return Some(FilterResult { node: input.node, region: subregion });
            }
            output(match operator {
                MorphologyOperator::Dilate => image_filters::dilate((rx, ry), input.node.input(), crop),
                MorphologyOperator::Erode => image_filters::erode((rx, ry), input.node.input(), crop),
            })
        }
        PrimitiveKind::Offset { dx, dy } => {
            let input = evaluation.get_input(&primitive.input, is_first);
            output(image_filters::offset((space.dx(*dx), space.dy(*dy)), input.node.input(), crop))
        }
        PrimitiveKind::Tile => {
            let input = evaluation.get_input(&primitive.input, is_first);
            if input.region.is_empty() {
                return Some(evaluation.transparent(subregion));
            }
            output(image_filters::tile(&input.region, &subregion, input.node.input()))
        }
        PrimitiveKind::Turbulence { base_frequency: (fx, fy), num_octaves, seed, stitch_tiles, kind } => {
            if *fx < 0.0 || *fy < 0.0 {
                return None;
            }
            let tile_size = stitch_tiles
                .then(|| ISize::new(subregion.width().round() as i32, subregion.height().round() as i32));
            let octaves = *num_octaves as usize;
            let shader = match kind {
                TurbulenceKind::FractalNoise => shaders::fractal_noise((*fx, *fy), octaves, seed.round(), tile_size),
                TurbulenceKind::Turbulence => shaders::turbulence((*fx, *fy), octaves, seed.round(), tile_size),
            }?;
            output(image_filters::shader(shader, crop))
        }
    }
}

fn blend_mode(mode: BlendMode) -> SkBlendMode {
    match mode {
        BlendMode::Normal => SkBlendMode::SrcOver,
        BlendMode::Multiply => SkBlendMode::Multiply,
        BlendMode::Screen => SkBlendMode::Screen,
        BlendMode::Overlay => SkBlendMode::Overlay,
        BlendMode::Darken => SkBlendMode::Darken,
        BlendMode::Lighten => SkBlendMode::Lighten,
        BlendMode::ColorDodge => SkBlendMode::ColorDodge,
        BlendMode::ColorBurn => SkBlendMode::ColorBurn,
        BlendMode::HardLight => SkBlendMode::HardLight,
        BlendMode::SoftLight => SkBlendMode::SoftLight,
        BlendMode::Difference => SkBlendMode::Difference,
        BlendMode::Exclusion => SkBlendMode::Exclusion,
        BlendMode::Hue => SkBlendMode::Hue,
        BlendMode::Saturation => SkBlendMode::Saturation,
        BlendMode::Color => SkBlendMode::Color,
        BlendMode::Luminosity => SkBlendMode::Luminosity,
    }
}

fn composite_mode(operator: CompositeOperator) -> SkBlendMode {
    match operator {
        CompositeOperator::Over | CompositeOperator::Arithmetic { .. } => SkBlendMode::SrcOver,
        CompositeOperator::In => SkBlendMode::SrcIn,
        CompositeOperator::Out => SkBlendMode::SrcOut,
        CompositeOperator::Atop => SkBlendMode::SrcATop,
        CompositeOperator::Xor => SkBlendMode::Xor,
        CompositeOperator::Lighter => SkBlendMode::Plus,
    }
}

fn color_channel(channel: Channel) -> ColorChannel {
    match channel {
        Channel::R => ColorChannel::R,
        Channel::G => ColorChannel::G,
        Channel::B => ColorChannel::B,
        Channel::A => ColorChannel::A,
    }
}

/// First light source child of a lighting primitive
fn light_source(evaluation: &Evaluation, id: ElementId) -> Option<crate::document::LightSource> {
    let document = evaluation.document();
    let light = document.children(id).iter().find_map(|child| match document.kind(*child) {
        ElementKind::LightSource(light) => Some(*light),
        _ => None,
    });
    if light.is_none() {
        tracing::debug!("lighting primitive {} has no light source", id.index());
    }
    light
}

/// Kernel is reversed: the filter correlates while the primitive convolves
fn convolve(matrix: &ConvolveMatrix, input: Option<ImageFilter>, crop: Rect) -> Option<Option<ImageFilter>> {
    let (order_x, order_y) = (matrix.order_x, matrix.order_y);
    if order_x == 0 || order_y == 0 || matrix.kernel.len() != (order_x * order_y) as usize {
        tracing::debug!("feConvolveMatrix kernel does not match order {}x{}", order_x, order_y);
        return None;
    }
    let target_x = matrix.target_x.unwrap_or(order_x / 2);
    let target_y = matrix.target_y.unwrap_or(order_y / 2);
    if target_x >= order_x || target_y >= order_y {
        return None;
    }

    let kernel: Vec<f32> = matrix.kernel.iter().rev().copied().collect();
    let divisor = match matrix.divisor.filter(|divisor| *divisor != 0.0) {
        Some(divisor) => divisor,
        None => {
            let sum: f32 = kernel.iter().sum();
            if sum == 0.0 { 1.0 } else { sum }
        }
    };
    let tile_mode = match matrix.edge_mode {
        EdgeMode::Duplicate => TileMode::Clamp,
        EdgeMode::Wrap => TileMode::Repeat,
        EdgeMode::None => TileMode::Decal,
    };
    Some(image_filters::matrix_convolution(
        ISize::new(order_x as i32, order_y as i32),
        &kernel,
        1.0 / divisor,
        matrix.bias,
        IPoint::new(target_x as i32, target_y as i32),
        tile_mode,
        !matrix.preserve_alpha,
        input,
        crop,
    ))
}

/// feImage: a raster fitted into the subregion, or a rendering of a referenced element
fn image(
    evaluation: &Evaluation,
    href: &str,
    aspect: &PreserveAspectRatio,
    subregion: Rect,
    refs: &mut ReferenceChain,
) -> FilterResult {
    let document = evaluation.document();
    let result = if href.starts_with('#') {
        match document.require(href) {
            Ok(target) => render_element(evaluation, target, subregion, refs),
            Err(error) => {
                tracing::warn!("feImage: {}", error);
                None
            }
        }
    } else {
        match evaluation.factory.loader().load_image(href) {
            Ok(image) => {
                let (width, height) = (image.width() as f32, image.height() as f32);
                let dst = fit_rect(width, height, &subregion, aspect);
                let filter = image_filters::image(
                    image,
                    Some(&Rect::from_wh(width, height)),
                    Some(&dst),
                    Some(SamplingOptions::default()),
                );
                FilterResult::new(image_filters::offset((0.0, 0.0), filter, subregion), subregion)
            }
            Err(error) => {
                tracing::warn!("feImage: {}", error);
                None
            }
        }
    };
    result.unwrap_or_else(|| evaluation.transparent(subregion))
}

fn render_element(
    evaluation: &Evaluation,
    target: ElementId,
    subregion: Rect,
    refs: &mut ReferenceChain,
) -> Option<FilterResult> {
    if !refs.enter(target) {
        tracing::trace!("feImage reference cycle through element {}", target.index());
        return None;
    }
    let factory = evaluation.factory;
    let mut tree = DrawableTree::new();
    let root = factory.create(&mut tree, target, None, None, IgnoreAttributes::empty(), refs);
    tree.set_root(root);
    let picture = root.and_then(|root| {
        factory.post_process(&mut tree, root, IgnoreAttributes::empty(), refs);
        record_picture(subregion, |canvas| {
            let _ = tree.draw(canvas, root, IgnoreAttributes::empty(), None);
        })
    });
    tree.dispose();
    refs.leave(target);
    FilterResult::new(image_filters::picture(picture?, Some(&subregion)), subregion)
}

#[cfg(test)]
mod tests {
    use crate::config::RenderConfig;
    use crate::document::{
        BlendMode, Channel, ColorMatrixKind, ColorValue, CompositeOperator, ConvolveMatrix, Document, EdgeMode,
        ElementId, ElementKind, Filter, FilterPrimitive, Fragment, Length, LightSource, PaintServer, PrimitiveKind,
        RectShape, Rgba, TransferFn, TransferFunction,
    };
    use crate::testing::pixel;
    use skia_safe::{surfaces, Color, Surface};

    struct Scene {
        doc: Document,
        filter: ElementId,
    }

    impl Scene {
        /// Red 20x20 square at (10, 10) in a 40x40 canvas, filtered by `#f`
        fn new() -> Self {
            Self::build(None)
        }

        /// Same scene with a blue `backdrop` drawn before the square
        fn over(backdrop: ElementKind) -> Self {
            Self::build(Some(backdrop))
        }

        fn build(backdrop: Option<ElementKind>) -> Self {
            let mut doc = Document::new();
            let root = doc.create_root(ElementKind::Svg(Fragment {
                width: Length::px(40.0),
                height: Length::px(40.0),
                ..Fragment::default()
            }));
            let filter = doc.append(root, ElementKind::Filter(Filter::default()));
            doc.set_id(filter, "f");
            if let Some(backdrop) = backdrop {
                let backdrop = doc.append(root, backdrop);
                doc.style_mut(backdrop).fill = Some(PaintServer::Color(Rgba::rgb(0, 0, 255)));
            }
            let square = doc.append(root, square(10.0, 20.0));
            doc.style_mut(square).fill = Some(PaintServer::Color(Rgba::rgb(255, 0, 0)));
            doc.style_mut(square).filter = Some("url(#f)".into());
            Self { doc, filter }
        }

        fn primitive(&mut self, primitive: FilterPrimitive) -> ElementId {
            self.doc.append(self.filter, ElementKind::FilterPrimitive(primitive))
        }

        fn square_id(&self) -> ElementId {
            let root = self.doc.root().unwrap();
            *self.doc.children(root).last().unwrap()
        }

        fn render(&self) -> Surface {
            let tree = crate::build_tree(&self.doc, &RenderConfig::default());
            let mut surface = surfaces::raster_n32_premul((40, 40)).unwrap();
            crate::draw(&tree, surface.canvas());
            surface
        }
    }

    fn square(at: f32, size: f32) -> ElementKind {
        ElementKind::Rect(RectShape {
            x: Length::number(at),
            y: Length::number(at),
            width: Length::number(size),
            height: Length::number(size),
            ..RectShape::default()
        })
    }

    fn flood(color: Rgba) -> FilterPrimitive {
        FilterPrimitive::new(PrimitiveKind::Flood { color: ColorValue::Rgba(color), opacity: 1.0 })
    }

    #[test]
    fn offset_moves_the_source_within_the_region() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Offset { dx: 5.0, dy: 0.0 }));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 12, 20).a(), 0);
        assert_eq!(pixel(&mut surface, 31, 20), Color::RED);
        assert_eq!(pixel(&mut surface, 33, 20).a(), 0);
    }

    #[test]
    fn desaturate_produces_gray() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::ColorMatrix(ColorMatrixKind::Saturate(0.0))));
        let mut surface = scene.render();
        let color = pixel(&mut surface, 20, 20);
        assert!(color.r().abs_diff(color.g()) <= 1 && color.g().abs_diff(color.b()) <= 1);
        assert!(color.r() > 40 && color.r() < 70);
    }

    #[test]
    fn component_transfer_swaps_red_for_blue() {
        let mut scene = Scene::new();
        let transfer = scene.primitive(FilterPrimitive::new(PrimitiveKind::ComponentTransfer));
        scene.doc.append(
            transfer,
            ElementKind::TransferFunction(TransferFunction {
                channel: Channel::R,
                func: TransferFn::Linear { slope: 0.0, intercept: 0.0 },
            }),
        );
        scene.doc.append(
            transfer,
            ElementKind::TransferFunction(TransferFunction {
                channel: Channel::B,
                func: TransferFn::Linear { slope: 0.0, intercept: 1.0 },
            }),
        );
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 20, 20), Color::BLUE);
    }

    #[test]
    fn source_alpha_is_black() {
        let mut scene = Scene::new();
        scene.primitive(
            FilterPrimitive::new(PrimitiveKind::ColorMatrix(ColorMatrixKind::Saturate(1.0))).with_input("SourceAlpha"),
        );
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 20, 20), Color::BLACK);
    }

    #[test]
    fn merge_stacks_inputs_in_order() {
        let mut scene = Scene::new();
        scene.primitive(flood(Rgba::rgb(0, 255, 0)).with_result("backdrop"));
        let merge = scene.primitive(FilterPrimitive::new(PrimitiveKind::Merge));
        scene.doc.append(merge, ElementKind::MergeNode { input: "backdrop".into() });
        scene.doc.append(merge, ElementKind::MergeNode { input: "SourceGraphic".into() });
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 9, 9), Color::GREEN);
        assert_eq!(pixel(&mut surface, 20, 20), Color::RED);
    }

    #[test]
    fn tile_repeats_previous_subregion() {
        let mut scene = Scene::new();
        let mut small = flood(Rgba::rgb(0, 0, 255));
        small.x = Some(Length::number(8.0));
        small.y = Some(Length::number(8.0));
        small.width = Some(Length::number(4.0));
        small.height = Some(Length::number(4.0));
        scene.primitive(small);
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Tile));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 21, 21), Color::BLUE);
    }

    #[test]
    fn zero_radius_morphology_passes_through() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Morphology {
            operator: crate::document::MorphologyOperator::Dilate,
            radius: (0.0, 0.0),
        }));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 20, 20), Color::RED);
    }

    #[test]
    fn morphology_radius_is_rounded_to_whole_pixels() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Morphology {
            operator: crate::document::MorphologyOperator::Erode,
            radius: (0.4, 0.4),
        }));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 10, 20), Color::RED);
        assert_eq!(pixel(&mut surface, 29, 20), Color::RED);
    }

    #[test]
    fn negative_blur_is_disabled() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::GaussianBlur { std_deviation: (-1.0, 2.0) }));
        let tree = crate::build_tree(&scene.doc, &RenderConfig::default());
        let square = tree.hit_test(skia_safe::Point::new(20.0, 20.0));
        assert!(square.is_empty());
    }

    #[test]
    fn unknown_input_falls_back_to_source() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Offset { dx: 0.0, dy: 0.0 }).with_input("nowhere"));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 20, 20), Color::RED);
    }

    #[test]
    fn fe_image_renders_referenced_element() {
        let mut scene = Scene::new();
        let root = scene.doc.root().unwrap();
        let defs = scene.doc.append(root, ElementKind::Defs);
        let backdrop = scene.doc.append(defs, square(0.0, 40.0));
        scene.doc.set_id(backdrop, "backdrop");
        scene.doc.style_mut(backdrop).fill = Some(PaintServer::Color(Rgba::rgb(0, 0, 255)));
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Image {
            href: "#backdrop".into(),
            aspect: Default::default(),
        }));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 9, 9), Color::BLUE);
        assert_eq!(pixel(&mut surface, 5, 5).a(), 0);
    }

    #[test]
    fn turbulence_produces_output() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Turbulence {
            base_frequency: (0.05, 0.05),
            num_octaves: 2,
            seed: 3.0,
            stitch_tiles: false,
            kind: crate::document::TurbulenceKind::FractalNoise,
        }));
        let mut surface = scene.render();
        let covered = (10..30).any(|x| pixel(&mut surface, x, 20).a() > 0);
        assert!(covered);
    }

    #[test]
    fn background_image_holds_what_was_drawn_before() {
        let mut scene = Scene::over(square(0.0, 15.0));
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Offset { dx: 10.0, dy: 0.0 }).with_input("BackgroundImage"));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 22, 12), Color::BLUE);
        assert_eq!(pixel(&mut surface, 20, 20).a(), 0);
    }

    #[test]
    fn background_alpha_is_black() {
        let mut scene = Scene::over(square(0.0, 15.0));
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Offset { dx: 10.0, dy: 0.0 }).with_input("BackgroundAlpha"));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 22, 12), Color::BLACK);
    }

    #[test]
    fn missing_background_is_transparent() {
        for input in ["BackgroundImage", "BackgroundAlpha"] {
            let mut scene = Scene::new();
            scene.primitive(FilterPrimitive::new(PrimitiveKind::Offset { dx: 10.0, dy: 0.0 }).with_input(input));
            let mut surface = scene.render();
            assert_eq!(pixel(&mut surface, 22, 12).a(), 0, "{input}");
            assert_eq!(pixel(&mut surface, 20, 20).a(), 0, "{input}");
        }
    }

    #[test]
    fn fill_paint_floods_the_region() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Offset { dx: 0.0, dy: 0.0 }).with_input("FillPaint"));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 9, 9), Color::RED);
        assert_eq!(pixel(&mut surface, 31, 31), Color::RED);
        assert_eq!(pixel(&mut surface, 5, 5).a(), 0);
    }

    #[test]
    fn stroke_paint_floods_the_region_or_stays_transparent() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Offset { dx: 0.0, dy: 0.0 }).with_input("StrokePaint"));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 20, 20).a(), 0);

        let square = scene.square_id();
        scene.doc.style_mut(square).stroke = Some(PaintServer::Color(Rgba::rgb(0, 255, 0)));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 9, 9), Color::GREEN);
        assert_eq!(pixel(&mut surface, 20, 20), Color::GREEN);
    }

    #[test]
    fn multiply_blend_darkens_the_overlap() {
        let mut scene = Scene::new();
        scene.primitive(flood(Rgba::rgb(0, 255, 0)).with_result("green"));
        scene.primitive(
            FilterPrimitive::new(PrimitiveKind::Blend { input2: "green".into(), mode: BlendMode::Multiply })
                .with_input("SourceGraphic"),
        );
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 20, 20), Color::BLACK);
        assert_eq!(pixel(&mut surface, 9, 9), Color::GREEN);
    }

    #[test]
    fn arithmetic_composite_adds_inputs() {
        let mut scene = Scene::new();
        scene.primitive(flood(Rgba::rgb(0, 255, 0)).with_result("green"));
        scene.primitive(
            FilterPrimitive::new(PrimitiveKind::Composite {
                input2: "green".into(),
                operator: CompositeOperator::Arithmetic { k1: 0.0, k2: 1.0, k3: 1.0, k4: 0.0 },
            })
            .with_input("SourceGraphic"),
        );
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 20, 20), Color::YELLOW);
        assert_eq!(pixel(&mut surface, 9, 9), Color::GREEN);
    }

    #[test]
    fn arithmetic_composite_constant_term_floods() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::Composite {
            input2: "SourceGraphic".into(),
            operator: CompositeOperator::Arithmetic { k1: 0.0, k2: 0.0, k3: 0.0, k4: 1.0 },
        }));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 9, 9), Color::WHITE);
        assert_eq!(pixel(&mut surface, 5, 5).a(), 0);
    }

    #[test]
    fn convolve_kernel_is_applied_reversed() {
        // Picks the right-hand neighbour once reversed, shifting the square left
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::ConvolveMatrix(ConvolveMatrix {
            order_x: 3,
            order_y: 1,
            kernel: vec![1.0, 0.0, 0.0],
            divisor: Some(1.0),
            edge_mode: EdgeMode::None,
            ..ConvolveMatrix::default()
        })));
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 9, 20), Color::RED);
        assert_eq!(pixel(&mut surface, 28, 20), Color::RED);
        assert_eq!(pixel(&mut surface, 29, 20).a(), 0);
    }

    #[test]
    fn convolve_kernel_of_wrong_size_is_disabled() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::ConvolveMatrix(ConvolveMatrix {
            kernel: vec![1.0; 4],
            ..ConvolveMatrix::default()
        })));
        let tree = crate::build_tree(&scene.doc, &RenderConfig::default());
        assert!(tree.hit_test(skia_safe::Point::new(20.0, 20.0)).is_empty());
    }

    #[test]
    fn displacement_map_shifts_by_channel() {
        // Full red moves sampling right by half the scale; mid green leaves y alone
        let mut scene = Scene::new();
        scene.primitive(flood(Rgba::rgb(255, 128, 0)).with_result("map"));
        scene.primitive(
            FilterPrimitive::new(PrimitiveKind::DisplacementMap {
                input2: "map".into(),
                scale: 10.0,
                x_channel: Channel::R,
                y_channel: Channel::G,
            })
            .with_input("SourceGraphic"),
        );
        let mut surface = scene.render();
        assert_eq!(pixel(&mut surface, 9, 20), Color::RED);
        assert_eq!(pixel(&mut surface, 20, 20), Color::RED);
        assert_eq!(pixel(&mut surface, 27, 20).a(), 0);
    }

    #[test]
    fn overhead_distant_light_lights_flat_surface() {
        let mut scene = Scene::new();
        let lighting = scene.primitive(FilterPrimitive::new(PrimitiveKind::DiffuseLighting {
            surface_scale: 1.0,
            diffuse_constant: 1.0,
            lighting_color: ColorValue::Rgba(Rgba::rgb(255, 255, 255)),
        }));
        scene.doc.append(lighting, ElementKind::LightSource(LightSource::Distant { azimuth: 0.0, elevation: 90.0 }));
        let mut surface = scene.render();
        let lit = pixel(&mut surface, 20, 20);
        assert_eq!(lit.a(), 255);
        assert!(lit.r() >= 250 && lit.g() >= 250 && lit.b() >= 250);
        assert_eq!(pixel(&mut surface, 5, 5).a(), 0);
    }

    #[test]
    fn lighting_without_light_source_is_disabled() {
        let mut scene = Scene::new();
        scene.primitive(FilterPrimitive::new(PrimitiveKind::DiffuseLighting {
            surface_scale: 1.0,
            diffuse_constant: 1.0,
            lighting_color: ColorValue::Rgba(Rgba::rgb(255, 255, 255)),
        }));
        let tree = crate::build_tree(&scene.doc, &RenderConfig::default());
        assert!(tree.hit_test(skia_safe::Point::new(20.0, 20.0)).is_empty());
    }
}
