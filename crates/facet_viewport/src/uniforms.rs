//! GPU-side records shared with the WGSL shaders.
//!
//! Field order and padding follow WGSL uniform layout rules; the size tests
//! at the bottom catch drift between these structs and the shader structs.

use facet_core::{
    AmbientLight, DirectionalLight, Fog, GridLines, MaterialParams, Mesh, SceneObject,
    ShadingModels,
};
use facet_math::color::hex_to_linear;
use facet_math::{Camera, Mat4, Vec3};

/// Camera uniform data for GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Eye position; w is unused
    pub position: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_proj = camera.view_projection_matrix().to_cols_array_2d();
        self.position = camera.position.extend(1.0).to_array();
    }

    /// Uniform for one environment cube face.
    pub fn from_matrices(view_proj: Mat4, position: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            position: position.extend(1.0).to_array(),
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Lights and fog shared by every pipeline
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    /// Unit vector pointing toward the light
    pub light_direction: [f32; 3],
    pub _pad0: f32,
    pub light_color: [f32; 3],
    pub _pad1: f32,
    pub ambient_color: [f32; 3],
    pub _pad2: f32,
    pub fog_color: [f32; 3],
    pub fog_near: f32,
    pub fog_far: f32,
    pub _pad3: [f32; 3],
}

impl SceneUniform {
    pub fn new(light: &DirectionalLight, ambient: &AmbientLight, fog: &Fog) -> Self {
        Self {
            light_direction: light.direction().to_array(),
            light_color: light.color.to_array(),
            ambient_color: ambient.color.to_array(),
            fog_color: hex_to_linear(fog.color).to_array(),
            fog_near: fog.near,
            fog_far: fog.far,
            ..Default::default()
        }
    }
}

/// Sphere transform, material and model selection
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PbrUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 3],
    pub metalness: f32,
    pub specular_color: [f32; 3],
    pub glossiness: f32,
    pub aspect: f32,
    pub ior: f32,
    /// Highest mip level of the environment cube
    pub env_max_lod: f32,
    pub _pad0: f32,
    pub ndf_type: u32,
    pub gsf_type: u32,
    pub ff_type: u32,
    pub _pad1: u32,
}

impl PbrUniform {
    pub fn new(model: Mat4, material: &MaterialParams, models: &ShadingModels, env_max_lod: f32) -> Self {
        let material = material.clamped();
        let [ndf_type, gsf_type, ff_type] = models.indices();
        Self {
            model: model.to_cols_array_2d(),
            color: material.color.to_array(),
            metalness: material.metalness,
            specular_color: material.specular_color.to_array(),
            glossiness: material.glossiness,
            aspect: material.aspect,
            ior: material.ior,
            env_max_lod,
            _pad0: 0.0,
            ndf_type,
            gsf_type,
            ff_type,
            _pad1: 0,
        }
    }
}

/// Sphere vertex (position, normal, tangent with handedness, uv)
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PbrVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 4],
    pub uv: [f32; 2],
}

impl PbrVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x4,
        3 => Float32x2
    ];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PbrVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }

    pub fn from_mesh(mesh: &Mesh) -> Vec<Self> {
        (0..mesh.vertex_count())
            .map(|i| Self {
                position: mesh.positions[i].to_array(),
                normal: mesh.normals.get(i).copied().unwrap_or(Vec3::Y).to_array(),
                tangent: mesh
                    .tangents
                    .get(i)
                    .map(|t| t.to_array())
                    .unwrap_or([1.0, 0.0, 0.0, 1.0]),
                uv: mesh.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect()
    }
}

/// Room vertex: world-space geometry with its Blinn-Phong material baked in
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RoomVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub shininess: f32,
}

impl RoomVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x3,
        3 => Float32
    ];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RoomVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }

    /// Merge all room objects into one vertex/index list.
    pub fn from_objects(objects: &[SceneObject]) -> (Vec<Self>, Vec<u32>) {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for object in objects {
            let base = vertices.len() as u32;
            let color = hex_to_linear(object.color).to_array();
            let mesh = &object.mesh;
            vertices.extend(mesh.positions.iter().enumerate().map(|(i, p)| Self {
                position: p.to_array(),
                normal: mesh.normals.get(i).copied().unwrap_or(Vec3::Y).to_array(),
                color,
                shininess: object.shininess,
            }));
            indices.extend(mesh.indices.iter().map(|i| i + base));
        }

        (vertices, indices)
    }
}

/// Grid line vertex (position + color)
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GridVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl GridVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GridVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }

    pub fn from_grid(grid: &GridLines, height: f32) -> Vec<Self> {
        grid.positions
            .iter()
            .zip(&grid.colors)
            .map(|(p, c)| Self {
                position: [p.x, p.y + height, p.z],
                color: hex_to_linear(*c).to_array(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_core::{FresnelModel, GsfModel, NdfModel};
    use std::mem::size_of;

    #[test]
    fn test_uniform_sizes_match_wgsl() {
        assert_eq!(size_of::<CameraUniform>(), 80);
        assert_eq!(size_of::<SceneUniform>(), 80);
        assert_eq!(size_of::<PbrUniform>(), 128);
        for size in [
            size_of::<CameraUniform>(),
            size_of::<SceneUniform>(),
            size_of::<PbrUniform>(),
        ] {
            assert_eq!(size % 16, 0);
        }
    }

    #[test]
    fn test_vertex_strides() {
        assert_eq!(PbrVertex::desc().array_stride, 48);
        assert_eq!(RoomVertex::desc().array_stride, 40);
        assert_eq!(GridVertex::desc().array_stride, 24);
    }

    #[test]
    fn test_pbr_uniform_packs_models_and_clamps_material() {
        let models = ShadingModels {
            ndf: NdfModel::Ggx,
            gsf: GsfModel::SchlickGgx,
            fresnel: FresnelModel::SphericalGaussian,
        };
        let material = MaterialParams {
            aspect: 9.0,
            ..Default::default()
        };
        let uniform = PbrUniform::new(Mat4::IDENTITY, &material, &models, 7.0);
        assert_eq!([uniform.ndf_type, uniform.gsf_type, uniform.ff_type], [5, 15, 3]);
        assert_eq!(uniform.aspect, 5.0);
        assert_eq!(uniform.env_max_lod, 7.0);
    }

    #[test]
    fn test_scene_uniform_from_lights() {
        let uniform = SceneUniform::new(
            &DirectionalLight::default(),
            &AmbientLight::default(),
            &Fog::default(),
        );
        assert_eq!(uniform.light_direction, [0.0, 1.0, 0.0]);
        assert_eq!(uniform.fog_near, 1000.0);
        assert_eq!(uniform.fog_far, 5000.0);
        assert_eq!(uniform.fog_color, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_room_vertices_rebase_indices() {
        let cube = Mesh::cuboid(Vec3::ONE);
        let objects = vec![
            SceneObject {
                name: "a".to_string(),
                mesh: cube.clone(),
                color: 0xFFFFFF,
                shininess: 10.0,
            },
            SceneObject {
                name: "b".to_string(),
                mesh: cube.clone(),
                color: 0x000000,
                shininess: 30.0,
            },
        ];
        let (vertices, indices) = RoomVertex::from_objects(&objects);
        assert_eq!(vertices.len(), cube.vertex_count() * 2);
        assert_eq!(indices.len(), cube.indices.len() * 2);
        assert_eq!(indices.iter().max().copied(), Some(vertices.len() as u32 - 1));
        assert_eq!(vertices[0].shininess, 10.0);
        assert_eq!(vertices[vertices.len() - 1].color, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_grid_vertices_follow_line_list() {
        let grid = GridLines::new(200.0, 20, 0x000000, 0x000000);
        let vertices = GridVertex::from_grid(&grid, 0.5);
        assert_eq!(vertices.len(), grid.line_count() * 2);
        assert!(vertices.iter().all(|v| v.position[1] == 0.5));
    }
}
