//! Material and light records driven by the GUI.
//!
//! These are plain values; the viewport copies them into uniform buffers
//! once per frame.

use std::ops::RangeInclusive;

use facet_math::color::hex_to_linear;
use facet_math::Vec3;

pub const METALNESS_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const GLOSSINESS_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const ASPECT_RANGE: RangeInclusive<f32> = 0.1..=5.0;
pub const IOR_RANGE: RangeInclusive<f32> = 1.0..=4.0;
pub const LIGHT_OFFSET_RANGE: RangeInclusive<f32> = -10.0..=10.0;

/// Reflectance at normal incidence of a typical dielectric.
pub const DIELECTRIC_F0: f32 = 0.04;

/// Lower bound on the microfacet slope parameter to keep the NDFs finite.
pub const MIN_ALPHA: f32 = 1.0e-3;

fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    value.clamp(*range.start(), *range.end())
}

/// Surface parameters of the sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    /// Base color (linear RGB)
    pub color: Vec3,
    /// Specular tint for dielectrics (linear RGB)
    pub specular_color: Vec3,
    /// 0 = dielectric, 1 = metal
    pub metalness: f32,
    /// 0 = rough, 1 = mirror-like
    pub glossiness: f32,
    /// Tangent/bitangent roughness ratio for the anisotropic NDFs
    pub aspect: f32,
    /// Index of refraction used by the Schlick (IoR) Fresnel
    pub ior: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            color: hex_to_linear(0xFFFFFF),
            specular_color: hex_to_linear(0xFFFFFF),
            metalness: 0.1,
            glossiness: 0.5,
            aspect: 1.0,
            ior: 2.0,
        }
    }
}

impl MaterialParams {
    /// Copy with every scalar forced into its slider range.
    pub fn clamped(mut self) -> Self {
        self.metalness = clamp_to(self.metalness, &METALNESS_RANGE);
        self.glossiness = clamp_to(self.glossiness, &GLOSSINESS_RANGE);
        self.aspect = clamp_to(self.aspect, &ASPECT_RANGE);
        self.ior = clamp_to(self.ior, &IOR_RANGE);
        self.color = self.color.clamp(Vec3::ZERO, Vec3::ONE);
        self.specular_color = self.specular_color.clamp(Vec3::ZERO, Vec3::ONE);
        self
    }

    pub fn roughness(&self) -> f32 {
        1.0 - self.glossiness
    }

    /// Microfacet slope parameter, `roughness²`.
    pub fn alpha(&self) -> f32 {
        (self.roughness() * self.roughness()).max(MIN_ALPHA)
    }

    /// Tangent and bitangent slopes. Their product stays `alpha²` so the
    /// aspect ratio reshapes the lobe without changing its area.
    pub fn anisotropic_alphas(&self) -> (f32, f32) {
        let alpha = self.alpha();
        let s = self.aspect.max(*ASPECT_RANGE.start()).sqrt();
        ((alpha * s).max(MIN_ALPHA), (alpha / s).max(MIN_ALPHA))
    }

    /// Scalar reflectance at normal incidence for a dielectric of this IOR.
    pub fn ior_reflectance(&self) -> f32 {
        let r = (self.ior - 1.0) / (self.ior + 1.0);
        r * r
    }

    /// Reflectance at normal incidence.
    pub fn f0(&self) -> Vec3 {
        (self.specular_color * DIELECTRIC_F0).lerp(self.color, self.metalness)
    }

    /// Reflectance at normal incidence with the dielectric part derived from
    /// the index of refraction.
    pub fn f0_from_ior(&self) -> Vec3 {
        (self.specular_color * self.ior_reflectance()).lerp(self.color, self.metalness)
    }

    /// Lambertian albedo; metals have none.
    pub fn diffuse_color(&self) -> Vec3 {
        self.color * (1.0 - self.metalness)
    }
}

/// The scene's single directional light. It always aims at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub color: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, 0.0),
            color: Vec3::ONE,
        }
    }
}

impl DirectionalLight {
    /// Unit vector pointing from the surface toward the light.
    pub fn direction(&self) -> Vec3 {
        self.position.try_normalize().unwrap_or(Vec3::Y)
    }

    /// Set the horizontal offset edited by the GUI, keeping it in range.
    pub fn set_offset(&mut self, x: f32, z: f32) {
        self.position.x = clamp_to(x, &LIGHT_OFFSET_RANGE);
        self.position.z = clamp_to(z, &LIGHT_OFFSET_RANGE);
    }
}

/// Uniform hemisphere ambient term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Vec3::splat(0.3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let m = MaterialParams::default();
        assert!((m.metalness - 0.1).abs() < 1e-6);
        assert!((m.glossiness - 0.5).abs() < 1e-6);
        assert!((m.aspect - 1.0).abs() < 1e-6);
        assert!((m.ior - 2.0).abs() < 1e-6);
        assert!((m.color - Vec3::ONE).length() < 1e-5);
    }

    #[test]
    fn test_clamped() {
        let m = MaterialParams {
            metalness: 2.0,
            glossiness: -1.0,
            aspect: 0.0,
            ior: 9.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(m.metalness, 1.0);
        assert_eq!(m.glossiness, 0.0);
        assert_eq!(m.aspect, 0.1);
        assert_eq!(m.ior, 4.0);
    }

    #[test]
    fn test_alpha_floor() {
        let m = MaterialParams {
            glossiness: 1.0,
            ..Default::default()
        };
        assert_eq!(m.alpha(), MIN_ALPHA);
    }

    #[test]
    fn test_anisotropic_alphas_preserve_area() {
        let m = MaterialParams {
            glossiness: 0.4,
            aspect: 3.0,
            ..Default::default()
        };
        let (ax, ay) = m.anisotropic_alphas();
        assert!(ax > ay);
        assert!((ax * ay - m.alpha() * m.alpha()).abs() < 1e-5);
    }

    #[test]
    fn test_f0_blends_with_metalness() {
        let mut m = MaterialParams {
            color: Vec3::new(1.0, 0.5, 0.25),
            metalness: 0.0,
            ..Default::default()
        };
        assert!((m.f0() - Vec3::splat(DIELECTRIC_F0)).length() < 1e-6);
        m.metalness = 1.0;
        assert!((m.f0() - m.color).length() < 1e-6);
    }

    #[test]
    fn test_ior_reflectance() {
        let m = MaterialParams {
            ior: 1.5,
            ..Default::default()
        };
        assert!((m.ior_reflectance() - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_light_offset_clamped() {
        let mut light = DirectionalLight::default();
        light.set_offset(20.0, -3.0);
        assert_eq!(light.position, Vec3::new(10.0, 10.0, -3.0));
        assert!((light.direction().length() - 1.0).abs() < 1e-6);
    }
}
