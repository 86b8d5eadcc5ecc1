//! Color space helpers.
//!
//! GUI color pickers work on 8-bit sRGB values (the same `0xRRGGBB` hex
//! notation the scene description uses), while shaders expect linear floats.

use glam::Vec3;

/// Convert one sRGB-encoded channel in [0, 1] to linear.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert one linear channel in [0, 1] to sRGB encoding.
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Split `0xRRGGBB` into sRGB bytes.
pub fn hex_to_srgb_bytes(hex: u32) -> [u8; 3] {
    [
        ((hex >> 16) & 0xFF) as u8,
        ((hex >> 8) & 0xFF) as u8,
        (hex & 0xFF) as u8,
    ]
}

/// Pack sRGB bytes back into `0xRRGGBB`.
pub fn srgb_bytes_to_hex(rgb: [u8; 3]) -> u32 {
    (u32::from(rgb[0]) << 16) | (u32::from(rgb[1]) << 8) | u32::from(rgb[2])
}

/// Decode sRGB bytes to a linear RGB vector.
pub fn srgb_bytes_to_linear(rgb: [u8; 3]) -> Vec3 {
    Vec3::new(
        srgb_to_linear(f32::from(rgb[0]) / 255.0),
        srgb_to_linear(f32::from(rgb[1]) / 255.0),
        srgb_to_linear(f32::from(rgb[2]) / 255.0),
    )
}

/// Decode `0xRRGGBB` to a linear RGB vector.
pub fn hex_to_linear(hex: u32) -> Vec3 {
    srgb_bytes_to_linear(hex_to_srgb_bytes(hex))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_split() {
        assert_eq!(hex_to_srgb_bytes(0x334455), [0x33, 0x44, 0x55]);
        assert_eq!(srgb_bytes_to_hex([0x33, 0x44, 0x55]), 0x334455);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(hex_to_linear(0x000000), Vec3::ZERO);
        assert!((hex_to_linear(0xFFFFFF) - Vec3::ONE).length() < 1e-5);
    }

    #[test]
    fn test_mid_gray_is_darker_in_linear() {
        let c = hex_to_linear(0x808080);
        assert!((c.x - 0.2158).abs() < 1e-3);
        assert_eq!(c.x, c.y);
    }

    #[test]
    fn test_transfer_functions_invert() {
        for i in 0..=20 {
            let c = i as f32 / 20.0;
            assert!((linear_to_srgb(srgb_to_linear(c)) - c).abs() < 1e-4);
        }
    }
}
