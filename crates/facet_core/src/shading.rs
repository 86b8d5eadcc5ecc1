//! Selectable microfacet model variants.
//!
//! Each enum's variant order is part of the GPU contract: `index()` is the
//! value written into the shading uniform and matched by the `switch`
//! statements in `pbr.fs.wgsl`.

/// Common behaviour of the NDF, GSF and Fresnel selectors.
pub trait ShadingModel: Copy + PartialEq + std::fmt::Debug + 'static {
    /// Label shown next to the selector in the GUI.
    const LABEL: &'static str;

    /// All variants in GPU index order.
    const ALL: &'static [Self];

    /// Human-readable name, also used in config files.
    fn name(self) -> &'static str;

    /// Index uploaded to the shader.
    fn index(self) -> u32 {
        Self::ALL.iter().position(|m| *m == self).unwrap_or(0) as u32
    }

    fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Look up a variant by its display name (case-insensitive).
    fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }
}

/// Normal Distribution Function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NdfModel {
    #[default]
    None,
    BlinnPhong,
    Phong,
    Beckmann,
    Gaussian,
    Ggx,
    TrowbridgeReitz,
    TrowbridgeReitzAnisotropic,
    WardAnisotropic,
}

impl NdfModel {
    /// True for the models that read the tangent frame and the aspect ratio.
    pub fn is_anisotropic(self) -> bool {
        matches!(self, Self::TrowbridgeReitzAnisotropic | Self::WardAnisotropic)
    }
}

impl ShadingModel for NdfModel {
    const LABEL: &'static str = "NDF";

    const ALL: &'static [Self] = &[
        Self::None,
        Self::BlinnPhong,
        Self::Phong,
        Self::Beckmann,
        Self::Gaussian,
        Self::Ggx,
        Self::TrowbridgeReitz,
        Self::TrowbridgeReitzAnisotropic,
        Self::WardAnisotropic,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::BlinnPhong => "Blinn-Phong",
            Self::Phong => "Phong",
            Self::Beckmann => "Beckmann",
            Self::Gaussian => "Gaussian",
            Self::Ggx => "GGX",
            Self::TrowbridgeReitz => "Trowbridge-Reitz",
            Self::TrowbridgeReitzAnisotropic => "Trowbridge-Reitz (Anisotropic)",
            Self::WardAnisotropic => "Ward (Anisotropic)",
        }
    }
}

/// Geometric Shadowing Function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GsfModel {
    None,
    #[default]
    Implicit,
    AshikhminShirley,
    AshikhminPremoze,
    Duer,
    Neumann,
    Kelemen,
    ModifiedKelemen,
    CookTorrance,
    Ward,
    Kurt,
    Walter,
    Ggx,
    Schlick,
    SchlickBeckmann,
    SchlickGgx,
}

impl ShadingModel for GsfModel {
    const LABEL: &'static str = "GSF";

    const ALL: &'static [Self] = &[
        Self::None,
        Self::Implicit,
        Self::AshikhminShirley,
        Self::AshikhminPremoze,
        Self::Duer,
        Self::Neumann,
        Self::Kelemen,
        Self::ModifiedKelemen,
        Self::CookTorrance,
        Self::Ward,
        Self::Kurt,
        Self::Walter,
        Self::Ggx,
        Self::Schlick,
        Self::SchlickBeckmann,
        Self::SchlickGgx,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Implicit => "Implicit",
            Self::AshikhminShirley => "Ashikhmin-Shirley",
            Self::AshikhminPremoze => "Ashikhmin-Premoze",
            Self::Duer => "Duer",
            Self::Neumann => "Neumann",
            Self::Kelemen => "Kelemen",
            Self::ModifiedKelemen => "Modified Kelemen",
            Self::CookTorrance => "Cook-Torrance",
            Self::Ward => "Ward",
            Self::Kurt => "Kurt",
            Self::Walter => "Walter",
            Self::Ggx => "GGX",
            Self::Schlick => "Schlick",
            Self::SchlickBeckmann => "Schlick-Beckmann",
            Self::SchlickGgx => "Schlick-GGX",
        }
    }
}

/// Fresnel function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FresnelModel {
    None,
    #[default]
    Schlick,
    SchlickIor,
    SphericalGaussian,
}

impl ShadingModel for FresnelModel {
    const LABEL: &'static str = "Fresnel";

    const ALL: &'static [Self] = &[
        Self::None,
        Self::Schlick,
        Self::SchlickIor,
        Self::SphericalGaussian,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Schlick => "Schlick",
            Self::SchlickIor => "Schlick (IoR)",
            Self::SphericalGaussian => "Spherical-Gaussian",
        }
    }
}

/// The current selection of all three model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShadingModels {
    pub ndf: NdfModel,
    pub gsf: GsfModel,
    pub fresnel: FresnelModel,
}

impl ShadingModels {
    /// Whether the anisotropy aspect control is meaningful.
    pub fn uses_aspect(&self) -> bool {
        self.ndf.is_anisotropic()
    }

    /// Whether the index of refraction control is meaningful.
    pub fn uses_ior(&self) -> bool {
        self.fresnel == FresnelModel::SchlickIor
    }

    /// Indices in `[ndf, gsf, fresnel]` order for uniform upload.
    pub fn indices(&self) -> [u32; 3] {
        [self.ndf.index(), self.gsf.index(), self.fresnel.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_indices<M: ShadingModel>() {
        for (i, model) in M::ALL.iter().enumerate() {
            assert_eq!(model.index(), i as u32);
            assert_eq!(M::from_index(i as u32), Some(*model));
            assert_eq!(M::from_name(model.name()), Some(*model));
        }
        assert_eq!(M::from_index(M::ALL.len() as u32), None);
    }

    #[test]
    fn test_index_and_name_lookup() {
        check_indices::<NdfModel>();
        check_indices::<GsfModel>();
        check_indices::<FresnelModel>();
    }

    #[test]
    fn test_variant_counts() {
        assert_eq!(NdfModel::ALL.len(), 9);
        assert_eq!(GsfModel::ALL.len(), 16);
        assert_eq!(FresnelModel::ALL.len(), 4);
    }

    #[test]
    fn test_name_lookup_is_case_insensitive() {
        assert_eq!(NdfModel::from_name("ggx"), Some(NdfModel::Ggx));
        assert_eq!(GsfModel::from_name(" schlick-ggx "), Some(GsfModel::SchlickGgx));
        assert_eq!(FresnelModel::from_name("schlick (ior)"), Some(FresnelModel::SchlickIor));
        assert_eq!(NdfModel::from_name("Lambert"), None);
    }

    #[test]
    fn test_default_selection() {
        let models = ShadingModels::default();
        assert_eq!(models.indices(), [0, 1, 1]);
        assert!(!models.uses_aspect());
        assert!(!models.uses_ior());
    }

    #[test]
    fn test_conditional_controls() {
        let models = ShadingModels {
            ndf: NdfModel::WardAnisotropic,
            gsf: GsfModel::Ward,
            fresnel: FresnelModel::SchlickIor,
        };
        assert!(models.uses_aspect());
        assert!(models.uses_ior());
        assert!(!NdfModel::Ggx.is_anisotropic());
    }
}
