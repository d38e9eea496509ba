// Typed attribute values shared by SVG elements

use skia_safe::Matrix;

/// Unit attached to a length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    /// Plain user-space number
    #[default]
    None,
    Px,
    Em,
    Ex,
    Percent,
    Pt, // 1pt = 1/72 inch
    Pc, // 1pc = 12pt
    Cm,
    Mm,
    In,
}

/// An SVG length value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Length {
    pub value: f32,
    pub unit: LengthUnit,
}

impl Length {
    pub const ZERO: Length = Length { value: 0.0, unit: LengthUnit::None };

    pub const fn new(value: f32, unit: LengthUnit) -> Self {
        Self { value, unit }
    }

    pub const fn number(value: f32) -> Self {
        Self { value, unit: LengthUnit::None }
    }

    pub const fn px(value: f32) -> Self {
        Self { value, unit: LengthUnit::Px }
    }

    pub const fn percent(value: f32) -> Self {
        Self { value, unit: LengthUnit::Percent }
    }

    pub fn is_percent(&self) -> bool {
        self.unit == LengthUnit::Percent
    }

    /// Value as a fraction for objectBoundingBox coordinates, where `50%` and `0.5` mean the same.
    pub fn fraction(&self) -> f32 {
        match self.unit {
            LengthUnit::Percent => self.value / 100.0,
            _ => self.value,
        }
    }
}

/// Straight (non-premultiplied) 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Skia color with the alpha channel multiplied by `opacity`
    pub fn to_skia(&self, opacity: f32) -> skia_safe::Color {
        let alpha = (self.a as f32 / 255.0) * opacity.clamp(0.0, 1.0);
        let alpha = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        skia_safe::Color::from_argb(alpha, self.r, self.g, self.b)
    }
}

/// Color value that may defer to the inherited `color` property
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorValue {
    Rgba(Rgba),
    CurrentColor,
}

impl From<Rgba> for ColorValue {
    fn from(value: Rgba) -> Self {
        ColorValue::Rgba(value)
    }
}

/// How a fill or stroke is painted
#[derive(Debug, Clone, PartialEq)]
pub enum PaintServer {
    None,
    Color(Rgba),
    CurrentColor,
    /// `url(#id)` reference, with the color used when the target cannot be resolved
    Reference {
        href: String,
        fallback: Option<Box<PaintServer>>,
    },
}

impl PaintServer {
    pub fn reference(href: impl Into<String>) -> Self {
        PaintServer::Reference { href: href.into(), fallback: None }
    }

    pub fn reference_with_fallback(href: impl Into<String>, fallback: PaintServer) -> Self {
        PaintServer::Reference {
            href: href.into(),
            fallback: Some(Box::new(fallback)),
        }
    }
}

/// Coordinate system for gradients, patterns, clip paths, masks and filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    UserSpaceOnUse,
    ObjectBoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpreadMethod {
    #[default]
    Pad,
    Reflect,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    Collapse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    Inline,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    Visible,
    #[default]
    Hidden,
    Scroll,
    Auto,
}

impl Overflow {
    /// `visible` and `auto` both leave content unclipped
    pub fn clips(&self) -> bool {
        matches!(self, Overflow::Hidden | Overflow::Scroll)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeRendering {
    #[default]
    Auto,
    OptimizeSpeed,
    CrispEdges,
    GeometricPrecision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

/// The `clip` property: offsets from each edge of the viewport, `None` meaning `auto`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClipOffsets {
    pub top: Option<f32>,
    pub right: Option<f32>,
    pub bottom: Option<f32>,
    pub left: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    None,
    XMinYMin,
    XMidYMin,
    XMaxYMin,
    XMinYMid,
    #[default]
    XMidYMid,
    XMaxYMid,
    XMinYMax,
    XMidYMax,
    XMaxYMax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreserveAspectRatio {
    pub align: Align,
    pub slice: bool,
}

/// One entry of a `transform` attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Matrix { a: f32, b: f32, c: f32, d: f32, e: f32, f: f32 },
    Translate { x: f32, y: f32 },
    Scale { x: f32, y: f32 },
    Rotate { angle: f32, cx: f32, cy: f32 },
    SkewX(f32),
    SkewY(f32),
}

impl Transform {
    pub fn to_matrix(&self) -> Matrix {
        match *self {
            Transform::Matrix { a, b, c, d, e, f } => {
                Matrix::new_all(a, c, e, b, d, f, 0.0, 0.0, 1.0)
            }
            Transform::Translate { x, y } => Matrix::translate((x, y)),
            Transform::Scale { x, y } => Matrix::scale((x, y)),
            Transform::Rotate { angle, cx, cy } => {
                let mut matrix = Matrix::translate((cx, cy));
                matrix.pre_rotate(angle, None);
                matrix.pre_translate((-cx, -cy));
                matrix
            }
            Transform::SkewX(angle) => {
                Matrix::new_all(1.0, angle.to_radians().tan(), 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0)
            }
            Transform::SkewY(angle) => {
                Matrix::new_all(1.0, 0.0, 0.0, angle.to_radians().tan(), 1.0, 0.0, 0.0, 0.0, 1.0)
            }
        }
    }
}

/// A `transform` attribute, applied left to right
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformList(pub Vec<Transform>);

impl TransformList {
    pub fn new(transforms: Vec<Transform>) -> Self {
        Self(transforms)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_matrix(&self) -> Matrix {
        let mut matrix = Matrix::new_identity();
        for transform in &self.0 {
            matrix.pre_concat(&transform.to_matrix());
        }
        matrix
    }
}

impl From<Transform> for TransformList {
    fn from(value: Transform) -> Self {
        TransformList(vec![value])
    }
}

/// Path data segment in absolute coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    CubicTo { x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32 },
    QuadTo { x1: f32, y1: f32, x: f32, y: f32 },
    ArcTo {
        rx: f32,
        ry: f32,
        x_axis_rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    },
    ClosePath,
}
