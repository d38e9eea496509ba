// Renderer configuration

/// Configuration for building and drawing an SVG drawable tree
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Dots per inch used to convert absolute units (in, cm, mm, pt, pc)
    pub dpi: f32,
    /// Font size used when no element sets `font-size`
    pub default_font_size: f32,
    /// Font family used when no element sets `font-family`
    pub default_font_family: String,
    /// Viewport used for percentages when no `<svg>` ancestor establishes one
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Antialiasing for shapes whose `shape-rendering` is `auto`
    pub antialias: bool,
    /// Languages accepted by `systemLanguage` tests, e.g. "en" or "en-US"
    pub languages: Vec<String>,
    /// Feature strings accepted by `requiredFeatures`
    pub supported_features: Vec<String>,
    /// Extension URIs accepted by `requiredExtensions`
    pub supported_extensions: Vec<String>,
    /// Flattening tolerance for arc segments in path data
    pub curve_tolerance: f64,
}

const SVG11_FEATURE_PREFIX: &str = "http://www.w3.org/TR/SVG11/feature#";

const SUPPORTED_SVG11_FEATURES: &[&str] = &[
    "SVG",
    "SVG-static",
    "CoreAttribute",
    "Structure",
    "BasicStructure",
    "ContainerAttribute",
    "ConditionalProcessing",
    "Image",
    "Style",
    "ViewportAttribute",
    "Shape",
    "Text",
    "BasicText",
    "PaintAttribute",
    "BasicPaintAttribute",
    "OpacityAttribute",
    "GraphicsAttribute",
    "BasicGraphicsAttribute",
    "Marker",
    "Gradient",
    "Pattern",
    "Clip",
    "BasicClip",
    "Mask",
    "Filter",
    "BasicFilter",
    "XlinkAttribute",
];

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: 96.0,
            default_font_size: 16.0,
            default_font_family: "sans-serif".to_string(),
            viewport_width: 300.0,
            viewport_height: 150.0,
            antialias: true,
            languages: vec!["en".to_string()],
            supported_features: SUPPORTED_SVG11_FEATURES
                .iter()
                .map(|feature| format!("{SVG11_FEATURE_PREFIX}{feature}"))
                .collect(),
            supported_extensions: Vec::new(),
            curve_tolerance: 0.1,
        }
    }
}

impl RenderConfig {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.supported_features.iter().any(|f| f == feature)
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        self.supported_extensions.iter().any(|e| e == extension)
    }

    /// `en` matches `en` and `en-US`; `en-US` matches only `en-US`
    pub fn accepts_language(&self, language: &str) -> bool {
        let language = language.trim();
        self.languages.iter().any(|accepted| {
            accepted.eq_ignore_ascii_case(language)
                || accepted
                    .split('-')
                    .next()
                    .is_some_and(|primary| primary.eq_ignore_ascii_case(language))
                || language
                    .split('-')
                    .next()
                    .is_some_and(|primary| primary.eq_ignore_ascii_case(accepted))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_matching_uses_primary_subtag() {
        let config = RenderConfig::default();
        assert!(config.accepts_language("en"));
        assert!(config.accepts_language("en-GB"));
        assert!(!config.accepts_language("fr"));
    }

    #[test]
    fn default_features_include_shapes() {
        let config = RenderConfig::default();
        assert!(config.has_feature("http://www.w3.org/TR/SVG11/feature#Shape"));
        assert!(!config.has_feature("http://www.w3.org/TR/SVG11/feature#Animation"));
        assert!(!config.has_extension("http://example.org/ext"));
    }
}
