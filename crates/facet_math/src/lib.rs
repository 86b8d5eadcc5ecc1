// Re-export glam for convenience
pub use glam::*;

// Facet math types
mod camera;
pub mod color;

pub use camera::Camera;
