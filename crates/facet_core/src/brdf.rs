//! CPU reference implementation of the selectable microfacet models.
//!
//! Every function here has a line-for-line WGSL twin in `pbr.fs.wgsl`. The
//! CPU side exists so the models can be unit tested and integrated (see
//! [`crate::furnace`]) without a GPU.
//!
//! The specular term is the Cook-Torrance microfacet form
//!
//! ```text
//! f_s = D(h) * G(l, v) * F(l, h) / (4 * (n.l) * (n.v))
//! ```
//!
//! and the diffuse term is Lambertian, scaled down by metalness.

use std::f32::consts::{FRAC_1_PI, PI};

use facet_math::Vec3;

use crate::material::MaterialParams;
use crate::shading::{FresnelModel, GsfModel, NdfModel, ShadingModels};

/// sqrt(2 / pi), the Beckmann-to-Schlick remapping constant.
const SQRT_2_OVER_PI: f32 = 0.797_884_6;

const EPSILON: f32 = 1.0e-5;

/// Orthonormal tangent frame at a shading point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingFrame {
    pub normal: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

impl ShadingFrame {
    /// Build a frame from a normal and an approximate tangent
    /// (Gram-Schmidt orthogonalised).
    pub fn new(normal: Vec3, tangent: Vec3) -> Self {
        let normal = normal.normalize();
        let tangent = (tangent - normal * normal.dot(tangent)).try_normalize();
        match tangent {
            Some(tangent) => Self {
                normal,
                tangent,
                bitangent: normal.cross(tangent),
            },
            None => Self::from_normal(normal),
        }
    }

    /// Build an arbitrary frame around a normal.
    pub fn from_normal(normal: Vec3) -> Self {
        let n = normal.normalize();
        let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
        let a = -1.0 / (sign + n.z);
        let b = n.x * n.y * a;

        let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
        let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);

        Self {
            normal: n,
            tangent,
            bitangent,
        }
    }

    /// Frame with +Z as normal and +X as tangent.
    pub fn z_up() -> Self {
        Self {
            normal: Vec3::Z,
            tangent: Vec3::X,
            bitangent: Vec3::Y,
        }
    }
}

/// Dot products shared by the model functions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dots {
    pub n_dot_l: f32,
    pub n_dot_v: f32,
    pub n_dot_h: f32,
    pub l_dot_h: f32,
    pub v_dot_h: f32,
    pub h_dot_x: f32,
    pub h_dot_y: f32,
    /// Mirror direction of the light against the view vector (Phong).
    pub r_dot_v: f32,
    /// |l + v|²
    pub l_plus_v_len2: f32,
    /// (l + v) . n
    pub l_plus_v_dot_n: f32,
}

impl Dots {
    /// Compute all dot products for unit vectors `l` and `v`.
    pub fn new(l: Vec3, v: Vec3, frame: &ShadingFrame) -> Self {
        let n = frame.normal;
        let l_plus_v = l + v;
        let h = l_plus_v.try_normalize().unwrap_or(n);
        let n_dot_l = n.dot(l);
        let r = 2.0 * n_dot_l * n - l;

        Self {
            n_dot_l: n_dot_l.max(0.0),
            n_dot_v: n.dot(v).max(0.0),
            n_dot_h: n.dot(h).max(0.0),
            l_dot_h: l.dot(h).max(0.0),
            v_dot_h: v.dot(h).max(0.0),
            h_dot_x: frame.tangent.dot(h),
            h_dot_y: frame.bitangent.dot(h),
            r_dot_v: r.dot(v).max(0.0),
            l_plus_v_len2: l_plus_v.length_squared(),
            l_plus_v_dot_n: l_plus_v.dot(n).max(0.0),
        }
    }
}

/// Phong-family specular exponent equivalent to a Beckmann slope `alpha`.
pub fn phong_exponent(alpha: f32) -> f32 {
    (2.0 / (alpha * alpha) - 2.0).max(0.0)
}

/// Normal distribution `D(h)`.
pub fn ndf(model: NdfModel, d: &Dots, alpha: f32, (alpha_x, alpha_y): (f32, f32)) -> f32 {
    let alpha2 = alpha * alpha;
    let cos2 = d.n_dot_h * d.n_dot_h;

    match model {
        NdfModel::None => 1.0,
        NdfModel::BlinnPhong => {
            let n = phong_exponent(alpha);
            (n + 2.0) * 0.5 * FRAC_1_PI * d.n_dot_h.max(EPSILON).powf(n)
        }
        NdfModel::Phong => {
            let n = phong_exponent(alpha);
            (n + 2.0) * 0.5 * FRAC_1_PI * d.r_dot_v.max(EPSILON).powf(n)
        }
        NdfModel::Beckmann => {
            if cos2 <= EPSILON {
                return 0.0;
            }
            ((cos2 - 1.0) / (alpha2 * cos2)).exp() / (PI * alpha2 * cos2 * cos2)
        }
        NdfModel::Gaussian => {
            let theta = d.n_dot_h.clamp(0.0, 1.0).acos();
            (-(theta * theta) / alpha2).exp() / (PI * alpha2)
        }
        NdfModel::Ggx => {
            if cos2 <= EPSILON {
                return 0.0;
            }
            let tan2 = (1.0 - cos2) / cos2;
            let t = alpha / (cos2 * (alpha2 + tan2));
            FRAC_1_PI * t * t
        }
        NdfModel::TrowbridgeReitz => {
            let denom = cos2 * (alpha2 - 1.0) + 1.0;
            alpha2 / (PI * denom * denom)
        }
        NdfModel::TrowbridgeReitzAnisotropic => {
            let x = d.h_dot_x / alpha_x;
            let y = d.h_dot_y / alpha_y;
            let denom = x * x + y * y + cos2;
            1.0 / (PI * alpha_x * alpha_y * denom * denom)
        }
        NdfModel::WardAnisotropic => {
            if cos2 <= EPSILON {
                return 0.0;
            }
            let x = d.h_dot_x / alpha_x;
            let y = d.h_dot_y / alpha_y;
            (-(x * x + y * y) / cos2).exp() / (PI * alpha_x * alpha_y * cos2 * cos2)
        }
    }
}

/// Schlick-style single-direction masking term.
fn schlick_g1(cos: f32, k: f32) -> f32 {
    cos / (cos * (1.0 - k) + k)
}

/// Smith masking for GGX.
fn smith_ggx_g1(cos: f32, alpha: f32) -> f32 {
    let alpha2 = alpha * alpha;
    2.0 * cos / (cos + (alpha2 + (1.0 - alpha2) * cos * cos).sqrt())
}

/// Rational approximation of Smith masking for Beckmann.
fn smith_beckmann_g1(cos: f32, alpha: f32) -> f32 {
    let sin = (1.0 - cos * cos).max(0.0).sqrt();
    if sin <= EPSILON {
        return 1.0;
    }
    let c = cos / (alpha * sin);
    if c >= 1.6 {
        return 1.0;
    }
    (3.535 * c + 2.181 * c * c) / (1.0 + 2.276 * c + 2.577 * c * c)
}

/// Geometric shadowing `G(l, v)`.
pub fn gsf(model: GsfModel, d: &Dots, alpha: f32) -> f32 {
    let nl = d.n_dot_l;
    let nv = d.n_dot_v;

    match model {
        GsfModel::None => 1.0,
        GsfModel::Implicit => nl * nv,
        GsfModel::AshikhminShirley => nl * nv / (d.l_dot_h * nl.max(nv)).max(EPSILON),
        GsfModel::AshikhminPremoze => nl * nv / (nl + nv - nl * nv).max(EPSILON),
        GsfModel::Duer => d.l_plus_v_len2 / d.l_plus_v_dot_n.max(EPSILON).powi(4),
        GsfModel::Neumann => nl * nv / nl.max(nv).max(EPSILON),
        GsfModel::Kelemen => nl * nv / (d.v_dot_h * d.v_dot_h).max(EPSILON),
        GsfModel::ModifiedKelemen => {
            let k = alpha * SQRT_2_OVER_PI;
            let gh = nv * k + (1.0 - k);
            gh * gh * nl
        }
        GsfModel::CookTorrance => {
            let vh = d.v_dot_h.max(EPSILON);
            let masking = 2.0 * d.n_dot_h * nv / vh;
            let shadowing = 2.0 * d.n_dot_h * nl / vh;
            masking.min(shadowing).min(1.0)
        }
        GsfModel::Ward => (nl * nv).sqrt(),
        GsfModel::Kurt => nl * nv / (d.v_dot_h * (nl * nv).max(EPSILON).powf(alpha)).max(EPSILON),
        GsfModel::Walter => smith_beckmann_g1(nl, alpha) * smith_beckmann_g1(nv, alpha),
        GsfModel::Ggx => smith_ggx_g1(nl, alpha) * smith_ggx_g1(nv, alpha),
        GsfModel::Schlick => schlick_g1(nl, alpha) * schlick_g1(nv, alpha),
        GsfModel::SchlickBeckmann => {
            let k = alpha * SQRT_2_OVER_PI;
            schlick_g1(nl, k) * schlick_g1(nv, k)
        }
        GsfModel::SchlickGgx => {
            let k = alpha * 0.5;
            schlick_g1(nl, k) * schlick_g1(nv, k)
        }
    }
}

/// Schlick's `(1 - cos)^5` weight.
pub fn schlick_weight(cos: f32) -> f32 {
    let m = (1.0 - cos).clamp(0.0, 1.0);
    let m2 = m * m;
    m2 * m2 * m
}

/// Fresnel reflectance `F(l, h)`.
///
/// `f0` is the metalness-blended reflectance, `f0_ior` the same blend with
/// the dielectric part derived from the index of refraction.
pub fn fresnel(model: FresnelModel, f0: Vec3, f0_ior: Vec3, l_dot_h: f32) -> Vec3 {
    match model {
        FresnelModel::None => f0,
        FresnelModel::Schlick => f0 + (Vec3::ONE - f0) * schlick_weight(l_dot_h),
        FresnelModel::SchlickIor => f0_ior + (Vec3::ONE - f0_ior) * schlick_weight(l_dot_h),
        FresnelModel::SphericalGaussian => {
            let power = (-5.554_73 * l_dot_h - 6.983_16) * l_dot_h;
            f0 + (Vec3::ONE - f0) * power.exp2()
        }
    }
}

/// A material bound to a model selection, ready for evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brdf {
    pub models: ShadingModels,
    pub material: MaterialParams,
}

impl Brdf {
    pub fn new(models: ShadingModels, material: MaterialParams) -> Self {
        Self {
            models,
            material: material.clamped(),
        }
    }

    /// Specular lobe only.
    pub fn specular(&self, l: Vec3, v: Vec3, frame: &ShadingFrame) -> Vec3 {
        let d = Dots::new(l, v, frame);
        if d.n_dot_l <= 0.0 || d.n_dot_v <= 0.0 {
            return Vec3::ZERO;
        }

        let alpha = self.material.alpha();
        let distribution = ndf(self.models.ndf, &d, alpha, self.material.anisotropic_alphas());
        let geometry = gsf(self.models.gsf, &d, alpha);
        let reflectance = fresnel(
            self.models.fresnel,
            self.material.f0(),
            self.material.f0_from_ior(),
            d.l_dot_h,
        );

        reflectance * (distribution * geometry / (4.0 * d.n_dot_l * d.n_dot_v))
    }

    /// Full BRDF value (without the cosine factor) for unit `l` and `v`.
    pub fn evaluate(&self, l: Vec3, v: Vec3, frame: &ShadingFrame) -> Vec3 {
        if frame.normal.dot(l) <= 0.0 || frame.normal.dot(v) <= 0.0 {
            return Vec3::ZERO;
        }
        self.material.diffuse_color() * FRAC_1_PI + self.specular(l, v, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(theta: f32, phi: f32) -> Vec3 {
        Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos())
    }

    fn dots_for_half(h: Vec3) -> Dots {
        Dots {
            n_dot_h: h.z,
            h_dot_x: h.x,
            h_dot_y: h.y,
            ..Default::default()
        }
    }

    /// Integrate D(h) (n.h) over the hemisphere of half vectors.
    fn projected_area(model: NdfModel, alpha: f32, alphas: (f32, f32)) -> f32 {
        let steps = 512;
        let d_theta = 0.5 * PI / steps as f32;
        let d_phi = 2.0 * PI / steps as f32;
        let mut sum = 0.0;
        for i in 0..steps {
            let theta = (i as f32 + 0.5) * d_theta;
            for j in 0..steps {
                let phi = (j as f32 + 0.5) * d_phi;
                let h = dir(theta, phi);
                sum += ndf(model, &dots_for_half(h), alpha, alphas) * h.z * theta.sin();
            }
        }
        sum * d_theta * d_phi
    }

    #[test]
    fn test_ggx_matches_trowbridge_reitz() {
        for i in 0..=10 {
            let cos = 0.05 + 0.095 * i as f32;
            let d = Dots {
                n_dot_h: cos,
                ..Default::default()
            };
            let ggx = ndf(NdfModel::Ggx, &d, 0.3, (0.3, 0.3));
            let tr = ndf(NdfModel::TrowbridgeReitz, &d, 0.3, (0.3, 0.3));
            assert!((ggx - tr).abs() <= 1e-3 * tr.max(1.0), "cos={cos}: {ggx} vs {tr}");
        }
    }

    #[test]
    fn test_anisotropic_models_reduce_to_isotropic() {
        let alpha = 0.4;
        for (theta, phi) in [(0.1, 0.3), (0.6, 1.2), (1.1, 2.5)] {
            let d = dots_for_half(dir(theta, phi));
            let tr = ndf(NdfModel::TrowbridgeReitz, &d, alpha, (alpha, alpha));
            let tr_aniso = ndf(NdfModel::TrowbridgeReitzAnisotropic, &d, alpha, (alpha, alpha));
            assert!((tr - tr_aniso).abs() < 1e-3 * tr.max(1.0));

            let beckmann = ndf(NdfModel::Beckmann, &d, alpha, (alpha, alpha));
            let ward = ndf(NdfModel::WardAnisotropic, &d, alpha, (alpha, alpha));
            assert!((beckmann - ward).abs() < 1e-3 * beckmann.max(1.0));
        }
    }

    #[test]
    fn test_ndf_projected_area_is_one() {
        let alpha = 0.5;
        for model in [
            NdfModel::BlinnPhong,
            NdfModel::Beckmann,
            NdfModel::Ggx,
            NdfModel::TrowbridgeReitz,
        ] {
            let area = projected_area(model, alpha, (alpha, alpha));
            assert!((area - 1.0).abs() < 0.02, "{model:?}: {area}");
        }

        let material = MaterialParams {
            glossiness: 1.0 - alpha.sqrt(),
            aspect: 2.5,
            ..Default::default()
        };
        let alphas = material.anisotropic_alphas();
        for model in [NdfModel::TrowbridgeReitzAnisotropic, NdfModel::WardAnisotropic] {
            let area = projected_area(model, material.alpha(), alphas);
            assert!((area - 1.0).abs() < 0.02, "{model:?}: {area}");
        }
    }

    #[test]
    fn test_bounded_gsf_within_unit_range() {
        let frame = ShadingFrame::z_up();
        let bounded = [
            GsfModel::None,
            GsfModel::Implicit,
            GsfModel::AshikhminPremoze,
            GsfModel::Neumann,
            GsfModel::ModifiedKelemen,
            GsfModel::CookTorrance,
            GsfModel::Ward,
            GsfModel::Walter,
            GsfModel::Ggx,
            GsfModel::Schlick,
            GsfModel::SchlickBeckmann,
            GsfModel::SchlickGgx,
        ];
        for model in bounded {
            for (tl, tv, phi) in [(0.2, 0.3, 0.0), (1.2, 0.4, 2.0), (1.5, 1.5, 3.0)] {
                let d = Dots::new(dir(tl, 0.0), dir(tv, phi), &frame);
                let g = gsf(model, &d, 0.3);
                assert!((-1e-5..=1.0 + 1e-5).contains(&g), "{model:?}: {g}");
            }
        }
    }

    #[test]
    fn test_smith_gsf_is_one_at_normal_incidence() {
        let frame = ShadingFrame::z_up();
        let d = Dots::new(Vec3::Z, Vec3::Z, &frame);
        for model in [GsfModel::Ggx, GsfModel::Walter, GsfModel::Schlick, GsfModel::CookTorrance] {
            assert!((gsf(model, &d, 0.5) - 1.0).abs() < 1e-4, "{model:?}");
        }
    }

    #[test]
    fn test_fresnel_limits() {
        let f0 = Vec3::new(0.9, 0.6, 0.3);
        for model in [FresnelModel::Schlick, FresnelModel::SphericalGaussian] {
            assert!((fresnel(model, f0, f0, 1.0) - f0).length() < 1e-3, "{model:?}");
            assert!((fresnel(model, f0, f0, 0.0) - Vec3::ONE).length() < 1e-3, "{model:?}");
        }
        assert_eq!(fresnel(FresnelModel::None, f0, Vec3::ZERO, 0.2), f0);
        assert_eq!(fresnel(FresnelModel::SchlickIor, f0, Vec3::ONE * 0.1, 1.0), Vec3::ONE * 0.1);
    }

    #[test]
    fn test_schlick_weight() {
        assert!((schlick_weight(1.0) - 0.0).abs() < 0.001);
        assert!((schlick_weight(0.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_evaluate_below_horizon_is_black() {
        let brdf = Brdf::new(ShadingModels::default(), MaterialParams::default());
        let frame = ShadingFrame::z_up();
        assert_eq!(brdf.evaluate(-Vec3::Z, Vec3::Z, &frame), Vec3::ZERO);
        assert_eq!(brdf.evaluate(Vec3::Z, dir(2.0, 0.0), &frame), Vec3::ZERO);
    }

    #[test]
    fn test_specular_peaks_at_mirror_direction() {
        let models = ShadingModels {
            ndf: NdfModel::Ggx,
            gsf: GsfModel::Ggx,
            fresnel: FresnelModel::Schlick,
        };
        let brdf = Brdf::new(models, MaterialParams::default());
        let frame = ShadingFrame::z_up();
        let v = dir(0.5, 0.0);
        let mirror = dir(0.5, PI);
        let off = dir(0.9, PI);
        let peak = brdf.specular(mirror, v, &frame).x;
        assert!(peak > brdf.specular(off, v, &frame).x);
    }

    #[test]
    fn test_power_terms_clamp_their_base_like_the_shader() {
        let alpha = 0.5;
        let n = phong_exponent(alpha);
        let expected = (n + 2.0) * 0.5 * FRAC_1_PI * EPSILON.powf(n);
        let grazing = Dots::default();

        for model in [NdfModel::BlinnPhong, NdfModel::Phong] {
            let d = ndf(model, &grazing, alpha, (alpha, alpha));
            assert!(d > 0.0, "{model:?}");
            assert!(((d - expected) / expected).abs() < 1e-4, "{model:?}: {d} vs {expected}");
        }

        let kurt = Dots {
            v_dot_h: 1.0,
            n_dot_v: 1.0,
            ..Default::default()
        };
        let g = gsf(GsfModel::Kurt, &kurt, alpha);
        assert!(g.is_finite());
        assert_eq!(g, 0.0);
    }

    #[test]
    fn test_frame_is_orthonormal() {
        let n = Vec3::new(0.3, -0.8, 0.2).normalize();
        for frame in [ShadingFrame::from_normal(n), ShadingFrame::new(n, Vec3::X)] {
            assert!(frame.tangent.dot(n).abs() < 1e-4);
            assert!(frame.bitangent.dot(n).abs() < 1e-4);
            assert!(frame.tangent.dot(frame.bitangent).abs() < 1e-4);
            assert!((frame.tangent.length() - 1.0).abs() < 1e-4);
            assert!((frame.bitangent.length() - 1.0).abs() < 1e-4);
        }
    }
}
