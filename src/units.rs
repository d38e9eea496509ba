// Length and coordinate conversion

use crate::config::RenderConfig;
use crate::document::{
    Align, Document, ElementId, ElementKind, Length, LengthUnit, PreserveAspectRatio, ViewBox,
};
use skia_safe::{Matrix, Rect};

/// Which dimension a percentage refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitAxis {
    Horizontal,
    Vertical,
    /// Normalized diagonal, used for radii and stroke widths
    Other,
}

/// Converts typed lengths to device-space scalars
#[derive(Clone, Copy)]
pub struct UnitResolver<'a> {
    document: &'a Document,
    config: &'a RenderConfig,
}

impl<'a> UnitResolver<'a> {
    pub fn new(document: &'a Document, config: &'a RenderConfig) -> Self {
        Self { document, config }
    }

    /// Resolve `length` for `owner`. Percentages use `reference` when given,
    /// otherwise the viewport of the nearest `<svg>` ancestor.
    pub fn to_device(
        &self,
        length: Length,
        axis: UnitAxis,
        owner: ElementId,
        reference: Option<Rect>,
    ) -> f32 {
        let dpi = self.config.dpi;
        match length.unit {
            LengthUnit::None | LengthUnit::Px => length.value,
            LengthUnit::Em => length.value * self.font_size(owner),
            LengthUnit::Ex => length.value * self.font_size(owner) / 2.0,
            LengthUnit::Pt => length.value * dpi / 72.0,
            LengthUnit::Pc => length.value * dpi / 6.0,
            LengthUnit::Cm => length.value * dpi / 2.54,
            LengthUnit::Mm => length.value * dpi / 25.4,
            LengthUnit::In => length.value * dpi,
            LengthUnit::Percent => {
                let reference = match reference {
                    Some(rect) => (rect.width(), rect.height()),
                    None => self.viewport_size(owner),
                };
                length.value / 100.0 * axis_extent(axis, reference)
            }
        }
    }

    /// Resolve a length in the given coordinate system. In objectBoundingBox mode the
    /// value is a fraction of `bounds` (offset by its origin when `is_position`).
    pub fn to_units(
        &self,
        length: Length,
        axis: UnitAxis,
        owner: ElementId,
        bounds: Rect,
        bounding_box: bool,
        is_position: bool,
    ) -> f32 {
        if bounding_box {
            let extent = axis_extent(axis, (bounds.width(), bounds.height()));
            let origin = match (is_position, axis) {
                (true, UnitAxis::Horizontal) => bounds.left,
                (true, UnitAxis::Vertical) => bounds.top,
                _ => 0.0,
            };
            origin + length.fraction() * extent
        } else {
            self.to_device(length, axis, owner, None)
        }
    }

    /// Computed `font-size` of `owner` in pixels
    pub fn font_size(&self, owner: ElementId) -> f32 {
        let mut chain = Vec::new();
        for ancestor in self.document.ancestors(owner) {
            if let Some(size) = self.document[ancestor].style.font_size {
                chain.push(size);
            }
        }
        // Apply from the outermost declaration inwards so relative sizes compound
        chain
            .into_iter()
            .rev()
            .fold(self.config.default_font_size, |parent, size| match size.unit {
                LengthUnit::Em => size.value * parent,
                LengthUnit::Ex => size.value * parent / 2.0,
                LengthUnit::Percent => size.value / 100.0 * parent,
                LengthUnit::None | LengthUnit::Px => size.value,
                LengthUnit::Pt => size.value * self.config.dpi / 72.0,
                LengthUnit::Pc => size.value * self.config.dpi / 6.0,
                LengthUnit::Cm => size.value * self.config.dpi / 2.54,
                LengthUnit::Mm => size.value * self.config.dpi / 25.4,
                LengthUnit::In => size.value * self.config.dpi,
            })
    }

    /// Size of the viewport established for `owner` by its nearest `<svg>` ancestor
    pub fn viewport_size(&self, owner: ElementId) -> (f32, f32) {
        let fallback = (self.config.viewport_width, self.config.viewport_height);
        let Some(viewport) = self.document.nearest_viewport(owner) else {
            return fallback;
        };
        let ElementKind::Svg(fragment) = &self.document[viewport].kind else {
            return fallback;
        };
        if let Some(view_box) = fragment.view_box.filter(ViewBox::is_valid) {
            return (view_box.width, view_box.height);
        }
        // The fragment's own percentages refer to its parent viewport
        let parent = self.document.parent(viewport).unwrap_or(viewport);
        let (parent_width, parent_height) = if parent == viewport {
            fallback
        } else {
            self.viewport_size(viewport)
        };
        let width = match fragment.width.unit {
            LengthUnit::Percent => fragment.width.value / 100.0 * parent_width,
            _ => self.to_device(fragment.width, UnitAxis::Horizontal, viewport, None),
        };
        let height = match fragment.height.unit {
            LengthUnit::Percent => fragment.height.value / 100.0 * parent_height,
            _ => self.to_device(fragment.height, UnitAxis::Vertical, viewport, None),
        };
        (width, height)
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn config(&self) -> &'a RenderConfig {
        self.config
    }
}

fn axis_extent(axis: UnitAxis, (width, height): (f32, f32)) -> f32 {
    match axis {
        UnitAxis::Horizontal => width,
        UnitAxis::Vertical => height,
        UnitAxis::Other => ((width * width + height * height) / 2.0).sqrt(),
    }
}

/// Matrix mapping objectBoundingBox unit space onto `bounds`
pub fn bounding_box_matrix(bounds: &Rect) -> Matrix {
    let mut matrix = Matrix::translate((bounds.left, bounds.top));
    matrix.pre_scale((bounds.width(), bounds.height()), None);
    matrix
}

/// Matrix mapping `view_box` into a `width` x `height` viewport at the origin
pub fn view_box_transform(
    view_box: &ViewBox,
    aspect: &PreserveAspectRatio,
    width: f32,
    height: f32,
) -> Matrix {
    if !view_box.is_valid() {
        return Matrix::new_identity();
    }
    let mut scale_x = width / view_box.width;
    let mut scale_y = height / view_box.height;

    if aspect.align == Align::None {
        let mut matrix = Matrix::scale((scale_x, scale_y));
        matrix.pre_translate((-view_box.x, -view_box.y));
        return matrix;
    }

    let scale = if aspect.slice {
        scale_x.max(scale_y)
    } else {
        scale_x.min(scale_y)
    };
    scale_x = scale;
    scale_y = scale;

    let free_x = width - view_box.width * scale_x;
    let free_y = height - view_box.height * scale_y;
    let (fx, fy) = match aspect.align {
        Align::None | Align::XMinYMin => (0.0, 0.0),
        Align::XMidYMin => (0.5, 0.0),
        Align::XMaxYMin => (1.0, 0.0),
        Align::XMinYMid => (0.0, 0.5),
        Align::XMidYMid => (0.5, 0.5),
        Align::XMaxYMid => (1.0, 0.5),
        Align::XMinYMax => (0.0, 1.0),
        Align::XMidYMax => (0.5, 1.0),
        Align::XMaxYMax => (1.0, 1.0),
    };

    let mut matrix = Matrix::translate((free_x * fx, free_y * fy));
    matrix.pre_scale((scale_x, scale_y), None);
    matrix.pre_translate((-view_box.x, -view_box.y));
    matrix
}

/// Fit a `src` sized box into `dst` following preserveAspectRatio, returning the destination rect
pub fn fit_rect(src_width: f32, src_height: f32, dst: &Rect, aspect: &PreserveAspectRatio) -> Rect {
    let view_box = ViewBox::new(0.0, 0.0, src_width, src_height);
    let matrix = view_box_transform(&view_box, aspect, dst.width(), dst.height());
    let (mapped, _) = matrix.map_rect(Rect::from_wh(src_width, src_height));
    mapped.with_offset((dst.left, dst.top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Fragment, RectShape};

    fn document_with_viewport(width: f32, height: f32) -> (Document, ElementId) {
        let mut doc = Document::new();
        let root = doc.create_root(ElementKind::Svg(Fragment {
            width: Length::px(width),
            height: Length::px(height),
            ..Fragment::default()
        }));
        let rect = doc.append(root, ElementKind::Rect(RectShape::default()));
        (doc, rect)
    }

    #[test]
    fn absolute_units_use_dpi() {
        let (doc, rect) = document_with_viewport(200.0, 100.0);
        let config = RenderConfig::default();
        let units = UnitResolver::new(&doc, &config);
        assert_eq!(units.to_device(Length::new(1.0, LengthUnit::In), UnitAxis::Horizontal, rect, None), 96.0);
        assert_eq!(units.to_device(Length::new(72.0, LengthUnit::Pt), UnitAxis::Horizontal, rect, None), 96.0);
        assert_eq!(units.to_device(Length::new(2.0, LengthUnit::Em), UnitAxis::Horizontal, rect, None), 32.0);
    }

    #[test]
    fn percentages_use_viewport_or_reference() {
        let (doc, rect) = document_with_viewport(200.0, 100.0);
        let config = RenderConfig::default();
        let units = UnitResolver::new(&doc, &config);
        assert_eq!(units.to_device(Length::percent(50.0), UnitAxis::Horizontal, rect, None), 100.0);
        assert_eq!(units.to_device(Length::percent(50.0), UnitAxis::Vertical, rect, None), 50.0);
        let reference = Rect::from_wh(40.0, 10.0);
        assert_eq!(
            units.to_device(Length::percent(50.0), UnitAxis::Horizontal, rect, Some(reference)),
            20.0
        );
    }

    #[test]
    fn bounding_box_units_are_fractions_of_bounds() {
        let (doc, rect) = document_with_viewport(200.0, 100.0);
        let config = RenderConfig::default();
        let units = UnitResolver::new(&doc, &config);
        let bounds = Rect::from_xywh(10.0, 20.0, 100.0, 50.0);
        let x = units.to_units(Length::percent(50.0), UnitAxis::Horizontal, rect, bounds, true, true);
        let w = units.to_units(Length::number(0.5), UnitAxis::Horizontal, rect, bounds, true, false);
        assert_eq!(x, 60.0);
        assert_eq!(w, 50.0);
    }

    #[test]
    fn nested_font_sizes_compound() {
        let (mut doc, rect) = document_with_viewport(100.0, 100.0);
        let root = doc.root().unwrap();
        doc.style_mut(root).font_size = Some(Length::px(20.0));
        doc.style_mut(rect).font_size = Some(Length::new(150.0, LengthUnit::Percent));
        let config = RenderConfig::default();
        let units = UnitResolver::new(&doc, &config);
        assert_eq!(units.font_size(rect), 30.0);
    }

    #[test]
    fn view_box_meet_centers_content() {
        let view_box = ViewBox::new(0.0, 0.0, 10.0, 10.0);
        let matrix = view_box_transform(&view_box, &PreserveAspectRatio::default(), 200.0, 100.0);
        let (mapped, _) = matrix.map_rect(Rect::from_wh(10.0, 10.0));
        assert_eq!(mapped, Rect::from_xywh(50.0, 0.0, 100.0, 100.0));
    }
}
