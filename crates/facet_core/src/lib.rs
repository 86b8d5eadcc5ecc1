//! Facet Core - shading models, materials and scene assembly.
//!
//! This crate provides:
//!
//! - **Shading model selection**: `NdfModel`, `GsfModel`, `FresnelModel`
//! - **Material and light records** mirrored into GPU uniforms by the viewport
//! - **CPU BRDF reference**: the same math the WGSL shaders run, plus a
//!   white furnace integrator for energy checks
//! - **Scene assembly**: procedural meshes and the demo room layout
//! - **Configuration**: JSON viewer settings
//!
//! # Example
//!
//! ```ignore
//! use facet_core::{Brdf, MaterialParams, ShadingModels, furnace};
//!
//! let brdf = Brdf::new(ShadingModels::default(), MaterialParams::default());
//! let albedo = furnace::directional_albedo(&brdf, 1.0, 32);
//! println!("albedo at normal incidence: {:?}", albedo);
//! ```

pub mod brdf;
pub mod config;
pub mod furnace;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod shading;

// Re-export commonly used types
pub use brdf::{Brdf, ShadingFrame};
pub use config::{ConfigError, ViewerConfig};
pub use material::{AmbientLight, DirectionalLight, MaterialParams};
pub use mesh::{GridLines, Mesh};
pub use scene::{EnvironmentProbe, Fog, SceneDescription, SceneObject};
pub use shading::{FresnelModel, GsfModel, NdfModel, ShadingModel, ShadingModels};
