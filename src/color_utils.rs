//! Color utility functions.
//!
//! Class colors are computed from the class id alone, so the same class renders
//! with the same color in every session without a stored palette.

use crate::model::ClassId;

/// Hue step between consecutive class ids, in tenths of a degree (golden angle).
const GOLDEN_ANGLE_TENTHS: u64 = 1375;

const CLASS_SATURATION: f32 = 0.7;
const CLASS_VALUE: f32 = 0.9;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ClassColor {
    /// CSS-style hex string, e.g. `#e64d4d`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Deterministic render color for a class.
pub fn class_color(class_id: ClassId) -> ClassColor {
    // Integer arithmetic keeps the hue exact for any id.
    let hue_tenths = (u64::from(class_id) * GOLDEN_ANGLE_TENTHS) % 3600;
    let hue = hue_tenths as f32 / 10.0;
    let (r, g, b) = hsv_to_rgb(hue, CLASS_SATURATION, CLASS_VALUE);
    ClassColor {
        r: to_channel(r),
        g: to_channel(g),
        b: to_channel(b),
    }
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert HSV to RGB.
///
/// # Arguments
/// * `h` - Hue in degrees (0-360)
/// * `s` - Saturation (0.0-1.0)
/// * `v` - Value/brightness (0.0-1.0)
///
/// # Returns
/// RGB tuple with values in range 0.0-1.0
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}
