// Helpers shared by the unit tests
use skia_safe::{AlphaType, Color, ColorType, ImageInfo, Surface};

/// Unpremultiplied color of one pixel of a raster surface
pub fn pixel(surface: &mut Surface, x: i32, y: i32) -> Color {
    let info = ImageInfo::new((1, 1), ColorType::RGBA8888, AlphaType::Unpremul, None);
    let mut rgba = [0u8; 4];
    assert!(surface.read_pixels(&info, &mut rgba, 4, (x, y)));
    Color::from_argb(rgba[3], rgba[0], rgba[1], rgba[2])
}
