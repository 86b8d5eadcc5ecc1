//! Dynamic environment cube map.
//!
//! The room is rendered into the six faces of a cube texture from the probe
//! position every frame, then a mip chain is built by downsampling each face.
//! The sphere samples it with a level of detail proportional to roughness.

use facet_core::EnvironmentProbe;
use facet_math::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::shader::MIPMAP_SHADER;
use crate::uniforms::CameraUniform;

pub const CUBE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const CUBE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Face directions and up vectors in cube layer order (+X, -X, +Y, -Y, +Z, -Z).
const FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::Y),
    (Vec3::NEG_X, Vec3::Y),
    (Vec3::Y, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::Z),
    (Vec3::Z, Vec3::Y),
    (Vec3::NEG_Z, Vec3::Y),
];

/// View matrices for the six faces, oriented so that a rendered face lines
/// up with how wgpu samples that cube layer.
pub fn face_view_matrices(position: Vec3) -> [Mat4; 6] {
    FACES.map(|(dir, up)| Mat4::look_to_lh(position, dir, up))
}

/// 90 degree square projection shared by all faces.
pub fn face_projection(near: f32, far: f32) -> Mat4 {
    Mat4::perspective_lh(std::f32::consts::FRAC_PI_2, 1.0, near, far)
}

pub fn face_view_projections(probe: &EnvironmentProbe) -> [Mat4; 6] {
    let projection = face_projection(probe.near, probe.far);
    face_view_matrices(probe.position).map(|view| projection * view)
}

/// One downsample step: read `source` mip, write into `target`.
struct MipPass {
    target: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

/// GPU resources of the reflection probe.
pub struct EnvironmentMap {
    texture: wgpu::Texture,
    cube_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    face_views: Vec<wgpu::TextureView>,
    depth_view: wgpu::TextureView,
    face_camera_bind_groups: Vec<wgpu::BindGroup>,
    mip_pipeline: wgpu::RenderPipeline,
    mip_passes: Vec<MipPass>,
    probe: EnvironmentProbe,
}

impl EnvironmentMap {
    pub fn new(
        device: &wgpu::Device,
        probe: &EnvironmentProbe,
        camera_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let resolution = probe.resolution.max(1);
        let mip_level_count = probe.mip_level_count();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Environment Cube"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 6,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CUBE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let cube_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Environment Cube View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let face_views = (0..6)
            .map(|layer| Self::layer_view(&texture, 0, layer))
            .collect();

        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Environment Depth"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CUBE_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let face_camera_bind_groups = face_view_projections(probe)
            .iter()
            .enumerate()
            .map(|(face, view_proj)| {
                let uniform = CameraUniform::from_matrices(*view_proj, probe.position);
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Environment Face {} Camera", face)),
                    contents: bytemuck::cast_slice(&[uniform]),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("Environment Face {} Bind Group", face)),
                    layout: camera_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                })
            })
            .collect();

        let (mip_pipeline, mip_layout) = Self::create_mip_pipeline(device);

        let mip_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Mip Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let mut mip_passes = Vec::new();
        for level in 1..mip_level_count {
            for layer in 0..6 {
                let source = Self::layer_view(&texture, level - 1, layer);
                let target = Self::layer_view(&texture, level, layer);
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Mip Bind Group"),
                    layout: &mip_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&source),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&mip_sampler),
                        },
                    ],
                });
                mip_passes.push(MipPass { target, bind_group });
            }
        }

        log::info!(
            "Environment cube: {}x{} per face, {} mip levels",
            resolution,
            resolution,
            mip_level_count
        );

        Self {
            texture,
            cube_view,
            sampler,
            face_views,
            depth_view,
            face_camera_bind_groups,
            mip_pipeline,
            mip_passes,
            probe: *probe,
        }
    }

    fn layer_view(texture: &wgpu::Texture, level: u32, layer: u32) -> wgpu::TextureView {
        texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Environment Face View"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_mip_level: level,
            mip_level_count: Some(1),
            base_array_layer: layer,
            array_layer_count: Some(1),
            ..Default::default()
        })
    }

    fn create_mip_pipeline(device: &wgpu::Device) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mip Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mipmap Shader"),
            source: wgpu::ShaderSource::Wgsl(MIPMAP_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mip Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mip Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: CUBE_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        (pipeline, layout)
    }

    pub fn cube_view(&self) -> &wgpu::TextureView {
        &self.cube_view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn probe(&self) -> &EnvironmentProbe {
        &self.probe
    }

    /// Highest sampleable level of detail.
    pub fn max_lod(&self) -> f32 {
        self.texture.mip_level_count().saturating_sub(1) as f32
    }

    /// Render all six faces with `draw`, then rebuild the mip chain.
    ///
    /// `draw` receives the pass and the face's camera bind group; it is
    /// responsible for binding everything else.
    pub fn capture<F>(&self, encoder: &mut wgpu::CommandEncoder, clear_color: wgpu::Color, mut draw: F)
    where
        F: FnMut(&mut wgpu::RenderPass<'_>, &wgpu::BindGroup),
    {
        for (face_view, camera_bind_group) in self.face_views.iter().zip(&self.face_camera_bind_groups) {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Environment Face Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: face_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            draw(&mut pass, camera_bind_group);
        }

        self.generate_mips(encoder);
    }

    fn generate_mips(&self, encoder: &mut wgpu::CommandEncoder) {
        for mip in &self.mip_passes {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Environment Mip Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &mip.target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.mip_pipeline);
            pass.set_bind_group(0, &mip.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_math::Vec4;

    /// Screen-space direction of a world direction as seen by one face.
    fn project(face: usize, dir: Vec3) -> Vec3 {
        let view_proj = face_projection(0.1, 100.0) * face_view_matrices(Vec3::ZERO)[face];
        let clip = view_proj * Vec4::new(dir.x, dir.y, dir.z, 1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn test_face_centers_look_along_axes() {
        for (face, (dir, _)) in FACES.iter().enumerate() {
            let ndc = project(face, *dir);
            assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5, "face {face}: {ndc:?}");
            assert!(ndc.z > 0.0 && ndc.z < 1.0);
        }
    }

    #[test]
    fn test_face_orientation_matches_cube_sampling() {
        // (face, world direction that lands right of center, world direction above center)
        let expected = [
            (0, Vec3::NEG_Z, Vec3::Y),
            (1, Vec3::Z, Vec3::Y),
            (2, Vec3::X, Vec3::NEG_Z),
            (3, Vec3::X, Vec3::Z),
            (4, Vec3::X, Vec3::Y),
            (5, Vec3::NEG_X, Vec3::Y),
        ];
        for (face, right, up) in expected {
            let forward = FACES[face].0;
            let to_right = project(face, forward + right * 0.5);
            let to_up = project(face, forward + up * 0.5);
            assert!(to_right.x > 0.4 && to_right.y.abs() < 1e-5, "face {face} right: {to_right:?}");
            assert!(to_up.y > 0.4 && to_up.x.abs() < 1e-5, "face {face} up: {to_up:?}");
        }
    }

    #[test]
    fn test_probe_offset_moves_eye() {
        let probe = EnvironmentProbe {
            position: Vec3::new(0.0, 1.9, 0.0),
            resolution: 128,
            near: 0.1,
            far: 1000.0,
        };
        for view_proj in face_view_projections(&probe) {
            let clip = view_proj * Vec4::new(0.0, 1.9, 0.0, 1.0);
            // The eye itself sits on the near side of every frustum
            assert!(clip.w.abs() < 1e-4);
        }
    }
}
