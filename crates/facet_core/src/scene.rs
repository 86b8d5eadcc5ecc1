//! Demo scene assembly.
//!
//! Builds the static room around the shaded sphere once at startup: floor,
//! walls, box props and a grid, plus the lights, fog and environment probe.

use std::f32::consts::{FRAC_PI_2, PI};

use facet_math::{Mat4, Vec3};

use crate::config::RoomOptions;
use crate::material::{AmbientLight, DirectionalLight};
use crate::mesh::{GridLines, Mesh};

pub const SPHERE_HEIGHT: f32 = 1.9;
pub const SPHERE_RADIUS: f32 = 2.0;
pub const SPHERE_WIDTH_SEGMENTS: u32 = 64;
pub const SPHERE_HEIGHT_SEGMENTS: u32 = 32;

pub const FLOOR_HEIGHT: f32 = -1.0;
pub const FLOOR_SIZE: f32 = 100_000.0;
pub const FLOOR_COLOR: u32 = 0x100D1A + 0x101010;
pub const FLOOR_SHININESS: f32 = 10.0;

pub const PROP_COLOR: u32 = 0x334455;
pub const PROP_SHININESS: f32 = 30.0;
pub const PROP_POSITIONS: [Vec3; 3] = [
    Vec3::new(4.0, 0.0, 3.0),
    Vec3::new(1.0, 1.0, 7.0),
    Vec3::new(5.0, 2.0, 4.0),
];

pub const WALL_COLOR: u32 = 0x2A2633;
pub const WALL_SHININESS: f32 = 5.0;

pub const GRID_SIZE: f32 = 200.0;
pub const GRID_DIVISIONS: u32 = 20;
pub const GRID_COLOR: u32 = 0x000000;

/// A static mesh drawn with the room's Blinn-Phong shading.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub name: String,
    /// World-space geometry
    pub mesh: Mesh,
    /// Diffuse color as `0xRRGGBB`
    pub color: u32,
    pub shininess: f32,
}

/// Linear distance fog.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub color: u32,
    pub near: f32,
    pub far: f32,
}

impl Fog {
    /// Blend weight toward the fog color at `distance` from the eye.
    /// Mirrors `fog_factor` in `room.wgsl` and `grid.wgsl`.
    pub fn factor(&self, distance: f32) -> f32 {
        ((distance - self.near) / (self.far - self.near).max(1.0e-4)).clamp(0.0, 1.0)
    }
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            color: 0x000000,
            near: 1000.0,
            far: 5000.0,
        }
    }
}

/// Where and how the sphere's reflection cube map is captured.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvironmentProbe {
    pub position: Vec3,
    /// Face size in pixels
    pub resolution: u32,
    pub near: f32,
    pub far: f32,
}

impl EnvironmentProbe {
    /// Number of mip levels in a full chain for this resolution.
    pub fn mip_level_count(&self) -> u32 {
        32 - self.resolution.max(1).leading_zeros()
    }
}

/// Everything the viewport needs to draw the demo.
#[derive(Clone, Debug)]
pub struct SceneDescription {
    pub sphere: Mesh,
    pub sphere_center: Vec3,
    pub objects: Vec<SceneObject>,
    pub grid: Option<GridLines>,
    pub grid_height: f32,
    pub ambient: AmbientLight,
    pub light: DirectionalLight,
    pub fog: Fog,
    pub background: u32,
    pub probe: EnvironmentProbe,
    pub camera_position: Vec3,
    pub camera_target: Vec3,
}

impl SceneDescription {
    /// Assemble the demo room.
    pub fn build(options: &RoomOptions, env_map_resolution: u32) -> Self {
        let sphere_center = Vec3::new(0.0, SPHERE_HEIGHT, 0.0);
        let mut objects = vec![SceneObject {
            name: "floor".to_string(),
            mesh: Mesh::plane(FLOOR_SIZE, FLOOR_SIZE)
                .transformed(Mat4::from_translation(Vec3::new(0.0, FLOOR_HEIGHT, 0.0))),
            color: FLOOR_COLOR,
            shininess: FLOOR_SHININESS,
        }];

        if options.walls {
            objects.extend(Self::walls(options.wall_distance, options.wall_height));
        }

        if options.props {
            let cube = Mesh::cuboid(Vec3::ONE);
            objects.extend(PROP_POSITIONS.iter().enumerate().map(|(i, position)| SceneObject {
                name: format!("prop_{}", i + 1),
                mesh: cube.transformed(Mat4::from_translation(*position)),
                color: PROP_COLOR,
                shininess: PROP_SHININESS,
            }));
        }

        let grid = options
            .grid
            .then(|| GridLines::new(GRID_SIZE, GRID_DIVISIONS, GRID_COLOR, GRID_COLOR));

        log::debug!(
            "Assembled room: {} objects, grid={}",
            objects.len(),
            grid.is_some()
        );

        Self {
            sphere: Mesh::uv_sphere(SPHERE_RADIUS, SPHERE_WIDTH_SEGMENTS, SPHERE_HEIGHT_SEGMENTS),
            sphere_center,
            objects,
            grid,
            grid_height: 0.0,
            ambient: AmbientLight::default(),
            light: DirectionalLight::default(),
            fog: Fog::default(),
            background: 0x000000,
            probe: EnvironmentProbe {
                position: sphere_center,
                resolution: env_map_resolution.max(1),
                near: 0.1,
                far: 100_000.0,
            },
            camera_position: Vec3::new(8.0, 8.0, 8.0),
            camera_target: Vec3::ZERO,
        }
    }

    /// Four inward-facing walls standing on the floor.
    fn walls(distance: f32, height: f32) -> Vec<SceneObject> {
        let panel = Mesh::plane(distance * 2.0, height);
        (0..4)
            .map(|k| {
                let angle = k as f32 * FRAC_PI_2;
                let inward = Mat4::from_rotation_y(angle).transform_vector3(Vec3::Z);
                let center = -inward * distance + Vec3::new(0.0, FLOOR_HEIGHT + height * 0.5, 0.0);
                let transform = Mat4::from_translation(center)
                    * Mat4::from_rotation_y(angle)
                    * Mat4::from_rotation_x(PI * 0.5);
                SceneObject {
                    name: format!("wall_{}", k + 1),
                    mesh: panel.transformed(transform),
                    color: WALL_COLOR,
                    shininess: WALL_SHININESS,
                }
            })
            .collect()
    }

    /// Number of triangles in the room (sphere excluded).
    pub fn room_triangle_count(&self) -> usize {
        self.objects.iter().map(|o| o.mesh.triangle_count()).sum()
    }
}
