// Element kinds and their typed attribute data

use super::values::{
    ColorValue, Length, PathSegment, PreserveAspectRatio, SpreadMethod, TransformList, Units,
    ViewBox,
};

/// Element kind discriminator with the attributes specific to each kind
#[derive(Debug, Clone)]
pub enum ElementKind {
    Svg(Fragment),
    Group,
    Switch,
    Symbol(Symbol),
    Anchor { href: Option<String> },
    Use(Use),
    Defs,

    Circle { cx: Length, cy: Length, r: Length },
    Ellipse { cx: Length, cy: Length, rx: Length, ry: Length },
    Rect(RectShape),
    Line { x1: Length, y1: Length, x2: Length, y2: Length },
    Polyline { points: Vec<(f32, f32)> },
    Polygon { points: Vec<(f32, f32)> },
    Path { segments: Vec<PathSegment> },
    Image(ImageElement),
    Text(TextElement),

    LinearGradient(LinearGradient),
    RadialGradient(RadialGradient),
    Stop(Stop),
    Pattern(Pattern),
    ClipPath(ClipPath),
    Mask(Mask),
    Marker(Marker),

    Filter(Filter),
    FilterPrimitive(FilterPrimitive),
    LightSource(LightSource),
    TransferFunction(TransferFunction),
    MergeNode { input: String },

    /// Anything the renderer does not know; never drawn
    Unknown(String),
}

impl ElementKind {
    /// Kinds the drawable factory can turn into a drawable
    pub fn is_renderable(&self) -> bool {
        matches!(
            self,
            ElementKind::Svg(_)
                | ElementKind::Group
                | ElementKind::Switch
                | ElementKind::Anchor { .. }
                | ElementKind::Use(_)
                | ElementKind::Circle { .. }
                | ElementKind::Ellipse { .. }
                | ElementKind::Rect(_)
                | ElementKind::Line { .. }
                | ElementKind::Polyline { .. }
                | ElementKind::Polygon { .. }
                | ElementKind::Path { .. }
                | ElementKind::Image(_)
                | ElementKind::Text(_)
        )
    }

    pub fn is_gradient(&self) -> bool {
        matches!(self, ElementKind::LinearGradient(_) | ElementKind::RadialGradient(_))
    }

    pub fn tag_name(&self) -> &str {
        match self {
            ElementKind::Svg(_) => "svg",
            ElementKind::Group => "g",
            ElementKind::Switch => "switch",
            ElementKind::Symbol(_) => "symbol",
            ElementKind::Anchor { .. } => "a",
            ElementKind::Use(_) => "use",
            ElementKind::Defs => "defs",
            ElementKind::Circle { .. } => "circle",
            ElementKind::Ellipse { .. } => "ellipse",
            ElementKind::Rect(_) => "rect",
            ElementKind::Line { .. } => "line",
            ElementKind::Polyline { .. } => "polyline",
            ElementKind::Polygon { .. } => "polygon",
            ElementKind::Path { .. } => "path",
            ElementKind::Image(_) => "image",
            ElementKind::Text(_) => "text",
            ElementKind::LinearGradient(_) => "linearGradient",
            ElementKind::RadialGradient(_) => "radialGradient",
            ElementKind::Stop(_) => "stop",
            ElementKind::Pattern(_) => "pattern",
            ElementKind::ClipPath(_) => "clipPath",
            ElementKind::Mask(_) => "mask",
            ElementKind::Marker(_) => "marker",
            ElementKind::Filter(_) => "filter",
            ElementKind::FilterPrimitive(primitive) => primitive.kind.tag_name(),
            ElementKind::LightSource(LightSource::Distant { .. }) => "feDistantLight",
            ElementKind::LightSource(LightSource::Point { .. }) => "fePointLight",
            ElementKind::LightSource(LightSource::Spot { .. }) => "feSpotLight",
            ElementKind::TransferFunction(func) => match func.channel {
                Channel::R => "feFuncR",
                Channel::G => "feFuncG",
                Channel::B => "feFuncB",
                Channel::A => "feFuncA",
            },
            ElementKind::MergeNode { .. } => "feMergeNode",
            ElementKind::Unknown(name) => name,
        }
    }
}

/// `<svg>` viewport
#[derive(Debug, Clone)]
pub struct Fragment {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
    pub view_box: Option<ViewBox>,
    pub aspect: PreserveAspectRatio,
}

impl Default for Fragment {
    fn default() -> Self {
        Self {
            x: Length::ZERO,
            y: Length::ZERO,
            width: Length::percent(100.0),
            height: Length::percent(100.0),
            view_box: None,
            aspect: PreserveAspectRatio::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Symbol {
    pub view_box: Option<ViewBox>,
    pub aspect: PreserveAspectRatio,
}

#[derive(Debug, Clone, Default)]
pub struct Use {
    pub href: String,
    pub x: Length,
    pub y: Length,
    pub width: Option<Length>,
    pub height: Option<Length>,
}

#[derive(Debug, Clone, Default)]
pub struct RectShape {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
    pub rx: Option<Length>,
    pub ry: Option<Length>,
}

#[derive(Debug, Clone, Default)]
pub struct ImageElement {
    pub href: String,
    pub x: Length,
    pub y: Length,
    pub width: Option<Length>,
    pub height: Option<Length>,
    pub aspect: PreserveAspectRatio,
}

#[derive(Debug, Clone, Default)]
pub struct TextElement {
    pub x: Length,
    pub y: Length,
    pub content: String,
}

/// Attributes common to both gradient kinds; `None` means "not set here"
#[derive(Debug, Clone, Default)]
pub struct GradientAttributes {
    pub href: Option<String>,
    pub units: Option<Units>,
    pub transform: Option<TransformList>,
    pub spread: Option<SpreadMethod>,
}

#[derive(Debug, Clone, Default)]
pub struct LinearGradient {
    pub common: GradientAttributes,
    pub x1: Option<Length>,
    pub y1: Option<Length>,
    pub x2: Option<Length>,
    pub y2: Option<Length>,
}

#[derive(Debug, Clone, Default)]
pub struct RadialGradient {
    pub common: GradientAttributes,
    pub cx: Option<Length>,
    pub cy: Option<Length>,
    pub r: Option<Length>,
    pub fx: Option<Length>,
    pub fy: Option<Length>,
}

#[derive(Debug, Clone)]
pub struct Stop {
    pub offset: Length,
    pub color: ColorValue,
    pub opacity: f32,
}

impl Default for Stop {
    fn default() -> Self {
        Self {
            offset: Length::ZERO,
            color: ColorValue::Rgba(super::values::Rgba::BLACK),
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pattern {
    pub href: Option<String>,
    pub x: Option<Length>,
    pub y: Option<Length>,
    pub width: Option<Length>,
    pub height: Option<Length>,
    pub units: Option<Units>,
    pub content_units: Option<Units>,
    pub transform: Option<TransformList>,
    pub view_box: Option<ViewBox>,
    pub aspect: Option<PreserveAspectRatio>,
}

#[derive(Debug, Clone, Default)]
pub struct ClipPath {
    pub units: Option<Units>,
}

#[derive(Debug, Clone, Default)]
pub struct Mask {
    pub units: Option<Units>,
    pub content_units: Option<Units>,
    pub x: Option<Length>,
    pub y: Option<Length>,
    pub width: Option<Length>,
    pub height: Option<Length>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerUnits {
    #[default]
    StrokeWidth,
    UserSpaceOnUse,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MarkerOrient {
    Auto,
    AutoStartReverse,
    /// Fixed angle in degrees
    Angle(f32),
    #[default]
    Zero,
}

#[derive(Debug, Clone)]
pub struct Marker {
    pub ref_x: Length,
    pub ref_y: Length,
    pub width: Length,
    pub height: Length,
    pub units: MarkerUnits,
    pub orient: MarkerOrient,
    pub view_box: Option<ViewBox>,
    pub aspect: PreserveAspectRatio,
}

impl Default for Marker {
    fn default() -> Self {
        Self {
            ref_x: Length::ZERO,
            ref_y: Length::ZERO,
            width: Length::number(3.0),
            height: Length::number(3.0),
            units: MarkerUnits::default(),
            orient: MarkerOrient::default(),
            view_box: None,
            aspect: PreserveAspectRatio::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub href: Option<String>,
    pub x: Option<Length>,
    pub y: Option<Length>,
    pub width: Option<Length>,
    pub height: Option<Length>,
    pub filter_units: Option<Units>,
    pub primitive_units: Option<Units>,
}

/// A filter primitive element (`fe*`)
#[derive(Debug, Clone)]
pub struct FilterPrimitive {
    pub x: Option<Length>,
    pub y: Option<Length>,
    pub width: Option<Length>,
    pub height: Option<Length>,
    /// `in` attribute; empty means "previous result" (or SourceGraphic first)
    pub input: String,
    /// `result` attribute; empty means unnamed
    pub result: String,
    pub kind: PrimitiveKind,
}

impl FilterPrimitive {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            x: None,
            y: None,
            width: None,
            height: None,
            input: String::new(),
            result: String::new(),
            kind,
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = result.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColorMatrixKind {
    /// 20 values, row major; anything else is treated as identity
    Matrix(Vec<f32>),
    Saturate(f32),
    HueRotate(f32),
    LuminanceToAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CompositeOperator {
    #[default]
    Over,
    In,
    Out,
    Atop,
    Xor,
    Lighter,
    Arithmetic { k1: f32, k2: f32, k3: f32, k4: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeMode {
    #[default]
    Duplicate,
    Wrap,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channel {
    R,
    G,
    B,
    #[default]
    A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MorphologyOperator {
    #[default]
    Erode,
    Dilate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurbulenceKind {
    FractalNoise,
    #[default]
    Turbulence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvolveMatrix {
    pub order_x: u32,
    pub order_y: u32,
    pub kernel: Vec<f32>,
    pub divisor: Option<f32>,
    pub bias: f32,
    pub target_x: Option<u32>,
    pub target_y: Option<u32>,
    pub edge_mode: EdgeMode,
    pub preserve_alpha: bool,
}

impl Default for ConvolveMatrix {
    fn default() -> Self {
        Self {
            order_x: 3,
            order_y: 3,
            kernel: Vec::new(),
            divisor: None,
            bias: 0.0,
            target_x: None,
            target_y: None,
            edge_mode: EdgeMode::Duplicate,
            preserve_alpha: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveKind {
    Blend { input2: String, mode: BlendMode },
    ColorMatrix(ColorMatrixKind),
    /// Transfer functions are `TransferFunction` children
    ComponentTransfer,
    Composite { input2: String, operator: CompositeOperator },
    ConvolveMatrix(ConvolveMatrix),
    /// Light source is the first `LightSource` child
    DiffuseLighting {
        surface_scale: f32,
        diffuse_constant: f32,
        lighting_color: ColorValue,
    },
    SpecularLighting {
        surface_scale: f32,
        specular_constant: f32,
        specular_exponent: f32,
        lighting_color: ColorValue,
    },
    DisplacementMap {
        input2: String,
        scale: f32,
        x_channel: Channel,
        y_channel: Channel,
    },
    DropShadow {
        dx: f32,
        dy: f32,
        std_deviation: (f32, f32),
        color: ColorValue,
        opacity: f32,
    },
    Flood { color: ColorValue, opacity: f32 },
    GaussianBlur { std_deviation: (f32, f32) },
    Image { href: String, aspect: PreserveAspectRatio },
    /// Inputs are `MergeNode` children
    Merge,
    Morphology { operator: MorphologyOperator, radius: (f32, f32) },
    Offset { dx: f32, dy: f32 },
    Tile,
    Turbulence {
        base_frequency: (f32, f32),
        num_octaves: u32,
        seed: f32,
        stitch_tiles: bool,
        kind: TurbulenceKind,
    },
}

impl PrimitiveKind {
    pub fn tag_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Blend { .. } => "feBlend",
            PrimitiveKind::ColorMatrix(_) => "feColorMatrix",
            PrimitiveKind::ComponentTransfer => "feComponentTransfer",
            PrimitiveKind::Composite { .. } => "feComposite",
            PrimitiveKind::ConvolveMatrix(_) => "feConvolveMatrix",
            PrimitiveKind::DiffuseLighting { .. } => "feDiffuseLighting",
            PrimitiveKind::SpecularLighting { .. } => "feSpecularLighting",
            PrimitiveKind::DisplacementMap { .. } => "feDisplacementMap",
            PrimitiveKind::DropShadow { .. } => "feDropShadow",
            PrimitiveKind::Flood { .. } => "feFlood",
            PrimitiveKind::GaussianBlur { .. } => "feGaussianBlur",
            PrimitiveKind::Image { .. } => "feImage",
            PrimitiveKind::Merge => "feMerge",
            PrimitiveKind::Morphology { .. } => "feMorphology",
            PrimitiveKind::Offset { .. } => "feOffset",
            PrimitiveKind::Tile => "feTile",
            PrimitiveKind::Turbulence { .. } => "feTurbulence",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightSource {
    Distant { azimuth: f32, elevation: f32 },
    Point { x: f32, y: f32, z: f32 },
    Spot {
        x: f32,
        y: f32,
        z: f32,
        points_at_x: f32,
        points_at_y: f32,
        points_at_z: f32,
        specular_exponent: f32,
        limiting_cone_angle: Option<f32>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferFn {
    Identity,
    Table(Vec<f32>),
    Discrete(Vec<f32>),
    Linear { slope: f32, intercept: f32 },
    Gamma { amplitude: f32, exponent: f32, offset: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    pub channel: Channel,
    pub func: TransferFn,
}
