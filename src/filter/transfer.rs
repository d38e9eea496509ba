// Color matrices and component transfer tables

use crate::document::{Channel, ColorMatrixKind, TransferFn};

pub const IDENTITY: [f32; 20] = [
    1.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, 0.0,
];

/// Luminance of the color moved into alpha, color channels cleared
pub const LUMINANCE_TO_ALPHA: [f32; 20] = [
    0.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 0.0, 0.0, //
    0.2125, 0.7154, 0.0721, 0.0, 0.0,
];

/// Keeps alpha, zeroes color
pub const ALPHA_ONLY: [f32; 20] = [
    0.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, 0.0,
];

pub fn saturate(s: f32) -> [f32; 20] {
    [
        0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s, 0.0, 0.0,
        0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s, 0.0, 0.0,
        0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]
}

pub fn hue_rotate(degrees: f32) -> [f32; 20] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        0.213 + cos * 0.787 - sin * 0.213,
        0.715 - cos * 0.715 - sin * 0.715,
        0.072 - cos * 0.072 + sin * 0.928,
        0.0,
        0.0,
        0.213 - cos * 0.213 + sin * 0.143,
        0.715 + cos * 0.285 + sin * 0.140,
        0.072 - cos * 0.072 - sin * 0.283,
        0.0,
        0.0,
        0.213 - cos * 0.213 - sin * 0.787,
        0.715 - cos * 0.715 + sin * 0.715,
        0.072 + cos * 0.928 + sin * 0.072,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
        0.0,
    ]
}

/// Row-major 4x5 matrix for an feColorMatrix. Raw matrices with the wrong number
/// of values fall back to identity.
pub fn color_matrix(kind: &ColorMatrixKind) -> [f32; 20] {
    match kind {
        ColorMatrixKind::Matrix(values) => match <[f32; 20]>::try_from(values.as_slice()) {
            Ok(matrix) => matrix,
            Err(_) => {
                tracing::debug!("feColorMatrix with {} values treated as identity", values.len());
                IDENTITY
            }
        },
        ColorMatrixKind::Saturate(s) => saturate(s.clamp(0.0, 1.0)),
        ColorMatrixKind::HueRotate(degrees) => hue_rotate(*degrees),
        ColorMatrixKind::LuminanceToAlpha => LUMINANCE_TO_ALPHA,
    }
}

/// Apply one transfer function to a normalized channel value
pub fn transfer(func: &TransferFn, c: f32) -> f32 {
    let value = match func {
        TransferFn::Identity => c,
        TransferFn::Table(values) if values.is_empty() => c,
        TransferFn::Table(values) => {
            let n = values.len() - 1;
            if n == 0 {
                values[0]
            } else {
                let k = ((c * n as f32).floor() as usize).min(n - 1);
                let start = k as f32 / n as f32;
                values[k] + (c - start) * n as f32 * (values[k + 1] - values[k])
            }
        }
        TransferFn::Discrete(values) if values.is_empty() => c,
        TransferFn::Discrete(values) => {
            let n = values.len();
            let k = ((c * n as f32).floor() as usize).min(n - 1);
            values[k]
        }
        TransferFn::Linear { slope, intercept } => slope * c + intercept,
        TransferFn::Gamma { amplitude, exponent, offset } => amplitude * c.powf(*exponent) + offset,
    };
    value.clamp(0.0, 1.0)
}

/// 256 entry lookup table for `func`
pub fn lookup_table(func: &TransferFn) -> [u8; 256] {
    let mut table = [0u8; 256];
    for (index, entry) in table.iter_mut().enumerate() {
        let c = index as f32 / 255.0;
        *entry = (transfer(func, c) * 255.0).round() as u8;
    }
    table
}

/// Per-channel tables in A, R, G, B order. Later functions for a channel win.
pub fn channel_tables<'a>(functions: impl IntoIterator<Item = (Channel, &'a TransferFn)>) -> [[u8; 256]; 4] {
    let identity = lookup_table(&TransferFn::Identity);
    let mut tables = [identity; 4];
    for (channel, func) in functions {
        let slot = match channel {
            Channel::A => 0,
            Channel::R => 1,
            Channel::G => 2,
            Channel::B => 3,
        };
        tables[slot] = lookup_table(func);
    }
    tables
}
