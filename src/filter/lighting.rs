// Diffuse and specular lighting primitives

use super::PrimitiveSpace;
use crate::document::LightSource;
use skia_safe::{image_filters, Color, ImageFilter, Point3, Rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reflection {
    Diffuse { constant: f32 },
    Specular { constant: f32, exponent: f32 },
}

#[derive(Debug, Clone, Copy)]
pub struct Lighting {
    pub reflection: Reflection,
    pub surface_scale: f32,
    pub color: Color,
}

/// Unit vector pointing towards a distant light
pub fn distant_direction(azimuth: f32, elevation: f32) -> Point3 {
    let (azimuth, elevation) = (azimuth.to_radians(), elevation.to_radians());
    Point3::new(
        azimuth.cos() * elevation.cos(),
        azimuth.sin() * elevation.cos(),
        elevation.sin(),
    )
}

/// Spot cone angle in degrees, limited to a half space
pub fn cone_angle(limiting_cone_angle: Option<f32>) -> f32 {
    limiting_cone_angle.map(|angle| angle.clamp(-90.0, 90.0)).unwrap_or(90.0)
}

/// Build the Skia lighting filter for `light`. Light positions are in primitive units.
pub(crate) fn light_filter(
    light: &LightSource,
    lighting: &Lighting,
    space: &PrimitiveSpace,
    input: Option<ImageFilter>,
    crop: Rect,
) -> Option<ImageFilter> {
    let Lighting { reflection, surface_scale, color } = *lighting;
    let position = |x: f32, y: f32, z: f32| Point3::new(space.x(x), space.y(y), space.length(z));

    match (*light, reflection) {
        (LightSource::Distant { azimuth, elevation }, Reflection::Diffuse { constant }) => {
            image_filters::distant_lit_diffuse(
                distant_direction(azimuth, elevation),
                color,
                surface_scale,
                constant,
                input,
                crop,
            )
        }
        (LightSource::Distant { azimuth, elevation }, Reflection::Specular { constant, exponent }) => {
            image_filters::distant_lit_specular(
                distant_direction(azimuth, elevation),
                color,
                surface_scale,
                constant,
                exponent,
                input,
                crop,
            )
        }
        (LightSource::Point { x, y, z }, Reflection::Diffuse { constant }) => {
            image_filters::point_lit_diffuse(position(x, y, z), color, surface_scale, constant, input, crop)
        }
        (LightSource::Point { x, y, z }, Reflection::Specular { constant, exponent }) => {
            image_filters::point_lit_specular(
                position(x, y, z),
                color,
                surface_scale,
                constant,
                exponent,
                input,
                crop,
            )
        }
        (
            LightSource::Spot {
                x,
                y,
                z,
                points_at_x,
                points_at_y,
                points_at_z,
                specular_exponent,
                limiting_cone_angle,
            },
            reflection,
        ) => {
            let location = position(x, y, z);
            let target = position(points_at_x, points_at_y, points_at_z);
            let cone = cone_angle(limiting_cone_angle);
            match reflection {
                Reflection::Diffuse { constant } => image_filters::spot_lit_diffuse(
                    location,
                    target,
                    specular_exponent,
                    cone,
                    color,
                    surface_scale,
                    constant,
                    input,
                    crop,
                ),
                Reflection::Specular { constant, exponent } => image_filters::spot_lit_specular(
                    location,
                    target,
                    specular_exponent,
                    cone,
                    color,
                    surface_scale,
                    constant,
                    exponent,
                    input,
                    crop,
                ),
            }
        }
    }
}
