//! Viewer configuration.
//!
//! All settings are optional; anything missing from the JSON file falls back
//! to the demo defaults. Colors are written as `"#RRGGBB"` strings and shading
//! models by their GUI names.

use std::fs;
use std::path::{Path, PathBuf};

use facet_math::color::hex_to_linear;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::material::{DirectionalLight, MaterialParams};
use crate::shading::{FresnelModel, GsfModel, NdfModel, ShadingModel, ShadingModels};

/// Errors that can occur while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown {family} model '{name}'")]
    UnknownModel { family: &'static str, name: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// `"#RRGGBB"` (or `"0xRRGGBB"`) color strings.
mod hex_color {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("#{:06X}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(de::Error::custom)
    }

    pub fn parse(text: &str) -> Result<u32, String> {
        let digits = text
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        if digits.len() != 6 {
            return Err(format!("expected 6 hex digits, got '{}'", text));
        }
        u32::from_str_radix(digits, 16).map_err(|e| format!("'{}': {}", text, e))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Facet - Microfacet Model Explorer".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Initial model selection by GUI name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub ndf: String,
    pub gsf: String,
    pub fresnel: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let models = ShadingModels::default();
        Self {
            ndf: models.ndf.name().to_string(),
            gsf: models.gsf.name().to_string(),
            fresnel: models.fresnel.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    #[serde(with = "hex_color")]
    pub color: u32,
    #[serde(with = "hex_color")]
    pub specular_color: u32,
    pub metalness: f32,
    pub glossiness: f32,
    pub aspect: f32,
    pub ior: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        let defaults = MaterialParams::default();
        Self {
            color: 0xFFFFFF,
            specular_color: 0xFFFFFF,
            metalness: defaults.metalness,
            glossiness: defaults.glossiness,
            aspect: defaults.aspect,
            ior: defaults.ior,
        }
    }
}

/// Horizontal position of the directional light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub x: f32,
    pub z: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        let light = DirectionalLight::default();
        Self {
            x: light.position.x,
            z: light.position.z,
        }
    }
}

/// Which parts of the room to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomOptions {
    pub walls: bool,
    pub props: bool,
    pub grid: bool,
    /// Distance from the origin to each wall
    pub wall_distance: f32,
    pub wall_height: f32,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            walls: true,
            props: true,
            grid: true,
            wall_distance: 40.0,
            wall_height: 30.0,
        }
    }
}

/// Largest cube face the default wgpu limits allow (`max_texture_dimension_2d`).
pub const MAX_ENV_MAP_RESOLUTION: u32 = 8192;

/// Largest furnace grid; the readout is recomputed on the UI thread.
pub const MAX_FURNACE_RESOLUTION: u32 = 256;

/// Top-level viewer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    /// Directory holding `pbr.vs.wgsl` and `pbr.fs.wgsl`; the compiled-in
    /// copies are used when unset or unreadable
    pub shader_dir: Option<PathBuf>,
    /// Rebuild the sphere pipeline when the shader files change
    pub hot_reload: bool,
    /// Face size of the dynamic environment cube map
    pub env_map_resolution: u32,
    /// Grid resolution of the GUI's white furnace readout
    pub furnace_resolution: u32,
    pub models: ModelConfig,
    pub material: MaterialConfig,
    pub light: LightConfig,
    pub room: RoomOptions,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            shader_dir: None,
            hot_reload: true,
            env_map_resolution: 128,
            furnace_resolution: 48,
            models: ModelConfig::default(),
            material: MaterialConfig::default(),
            light: LightConfig::default(),
            room: RoomOptions::default(),
        }
    }
}

impl ViewerConfig {
    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a JSON config string.
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> ConfigResult<()> {
        self.shading_models()?;

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window",
                reason: format!("size {}x{} is empty", self.window.width, self.window.height),
            });
        }
        if !self.env_map_resolution.is_power_of_two() {
            return Err(ConfigError::InvalidValue {
                field: "env_map_resolution",
                reason: format!("{} is not a power of two", self.env_map_resolution),
            });
        }
        if self.env_map_resolution > MAX_ENV_MAP_RESOLUTION {
            return Err(ConfigError::InvalidValue {
                field: "env_map_resolution",
                reason: format!(
                    "{} exceeds the maximum of {}",
                    self.env_map_resolution, MAX_ENV_MAP_RESOLUTION
                ),
            });
        }
        if self.furnace_resolution == 0 || self.furnace_resolution > MAX_FURNACE_RESOLUTION {
            return Err(ConfigError::InvalidValue {
                field: "furnace_resolution",
                reason: format!(
                    "{} is outside 1..={}",
                    self.furnace_resolution, MAX_FURNACE_RESOLUTION
                ),
            });
        }
        if self.room.wall_distance <= 0.0 || self.room.wall_height <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "room",
                reason: "wall dimensions must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the model names.
    pub fn shading_models(&self) -> ConfigResult<ShadingModels> {
        fn resolve<M: ShadingModel>(name: &str) -> ConfigResult<M> {
            M::from_name(name).ok_or_else(|| ConfigError::UnknownModel {
                family: M::LABEL,
                name: name.to_string(),
            })
        }

        Ok(ShadingModels {
            ndf: resolve::<NdfModel>(&self.models.ndf)?,
            gsf: resolve::<GsfModel>(&self.models.gsf)?,
            fresnel: resolve::<FresnelModel>(&self.models.fresnel)?,
        })
    }

    /// Initial material, clamped into the GUI ranges.
    pub fn material_params(&self) -> MaterialParams {
        MaterialParams {
            color: hex_to_linear(self.material.color),
            specular_color: hex_to_linear(self.material.specular_color),
            metalness: self.material.metalness,
            glossiness: self.material.glossiness,
            aspect: self.material.aspect,
            ior: self.material.ior,
        }
        .clamped()
    }

    pub fn directional_light(&self) -> DirectionalLight {
        let mut light = DirectionalLight::default();
        light.set_offset(self.light.x, self.light.z);
        light
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = ViewerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.shading_models().unwrap(), ShadingModels::default());
    }

    #[test]
    fn test_partial_config() {
        let json = r##"{
            "models": { "ndf": "GGX", "fresnel": "Schlick (IoR)" },
            "material": { "color": "#FF8000", "glossiness": 0.9 },
            "room": { "walls": false }
        }"##;
        let config = ViewerConfig::from_json_str(json).unwrap();
        let models = config.shading_models().unwrap();
        assert_eq!(models.ndf, NdfModel::Ggx);
        assert_eq!(models.gsf, GsfModel::Implicit);
        assert_eq!(models.fresnel, FresnelModel::SchlickIor);
        assert_eq!(config.material.color, 0xFF8000);
        assert!((config.material_params().glossiness - 0.9).abs() < 1e-6);
        assert!(!config.room.walls);
        assert!(config.room.props);
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let err = ViewerConfig::from_json_str(r#"{ "models": { "gsf": "Smith" } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModel { family: "GSF", .. }));
    }

    #[test]
    fn test_bad_color_is_rejected() {
        let err = ViewerConfig::from_json_str(r##"{ "material": { "color": "#FFF" } }"##).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_map_resolution_must_be_power_of_two() {
        let err = ViewerConfig::from_json_str(r#"{ "env_map_resolution": 100 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "env_map_resolution", .. }));
    }

    #[test]
    fn test_env_map_resolution_is_capped() {
        let ok = ViewerConfig::from_json_str(r#"{ "env_map_resolution": 8192 }"#).unwrap();
        assert_eq!(ok.env_map_resolution, MAX_ENV_MAP_RESOLUTION);

        for json in [
            r#"{ "env_map_resolution": 16384 }"#,
            r#"{ "env_map_resolution": 1073741824 }"#,
        ] {
            let err = ViewerConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { field: "env_map_resolution", .. }));
        }
    }

    #[test]
    fn test_furnace_resolution_is_bounded() {
        assert!(ViewerConfig::from_json_str(r#"{ "furnace_resolution": 256 }"#).is_ok());
        for json in [r#"{ "furnace_resolution": 0 }"#, r#"{ "furnace_resolution": 100000 }"#] {
            let err = ViewerConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { field: "furnace_resolution", .. }));
        }
    }

    #[test]
    fn test_json_round_trip_keeps_hex_colors() {
        let mut config = ViewerConfig::default();
        config.material.specular_color = 0x334455;
        let json = config.to_json_string().unwrap();
        assert!(json.contains("\"#334455\""));
        assert_eq!(ViewerConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_material_and_light_are_clamped() {
        let json = r#"{ "material": { "aspect": 50.0 }, "light": { "x": -30.0, "z": 2.0 } }"#;
        let config = ViewerConfig::from_json_str(json).unwrap();
        assert_eq!(config.material_params().aspect, 5.0);
        let light = config.directional_light();
        assert_eq!(light.position.x, -10.0);
        assert_eq!(light.position.z, 2.0);
    }

    #[test]
    fn test_missing_file() {
        let err = ViewerConfig::load("/nonexistent/facet.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
