//! Facet Viewport - wgpu renderer for the microfacet model explorer.
//!
//! Draws the room, the grid and the shaded sphere, keeps the sphere's
//! environment cube up to date and hosts the egui control panel.

use anyhow::Result;
use std::sync::Arc;

use wgpu::{util::DeviceExt, Device, Instance, Queue, Surface, SurfaceConfiguration};

use facet_core::{AmbientLight, Fog, SceneDescription, ViewerConfig};
use facet_math::color::hex_to_linear;
use facet_math::{Camera, Mat4, Vec3};

pub mod environment;
pub mod shader;
pub mod ui;
pub mod uniforms;

pub use environment::EnvironmentMap;
pub use shader::{PbrShaderFiles, ShaderError, ShaderOrigin, ShaderStatus};
pub use ui::{ControlState, FrameStats};

use environment::{CUBE_DEPTH_FORMAT, CUBE_FORMAT};
use shader::{PbrShaderSource, GRID_SHADER, ROOM_SHADER};
use uniforms::{CameraUniform, GridVertex, PbrUniform, PbrVertex, RoomVertex, SceneUniform};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

fn depth_state(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn uniform_layout_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Pipeline for the room or grid shader targeting one color format.
fn create_scene_pipeline(
    device: &Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    vertex_layout: wgpu::VertexBufferLayout<'_>,
    topology: wgpu::PrimitiveTopology,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers: &[vertex_layout],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Cube faces use mirrored frames, and the floor and walls are single-sided quads
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(depth_state(depth_format)),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

/// Validate and compile the sphere shader, returning its pipeline.
fn create_pbr_pipeline(
    device: &Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    source: &PbrShaderSource,
) -> Result<wgpu::RenderPipeline> {
    shader::validate_wgsl(&source.origin.to_string(), &source.source)?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("PBR Shader"),
        source: wgpu::ShaderSource::Wgsl(source.source.as_str().into()),
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("PBR Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: "vs_main",
            buffers: &[PbrVertex::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(depth_state(DEPTH_FORMAT)),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    });

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        anyhow::bail!("PBR pipeline rejected by wgpu: {}", error);
    }

    Ok(pipeline)
}

/// Geometry and pipelines of everything except the sphere.
struct RoomResources {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    grid_vertex_buffer: Option<wgpu::Buffer>,
    grid_vertex_count: u32,
    pipeline: wgpu::RenderPipeline,
    cube_pipeline: wgpu::RenderPipeline,
    grid_pipeline: wgpu::RenderPipeline,
    grid_cube_pipeline: wgpu::RenderPipeline,
}

impl RoomResources {
    /// Draw room then grid. `cube` selects the environment-face pipelines.
    fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        cube: bool,
        camera_bind_group: &wgpu::BindGroup,
        scene_bind_group: &wgpu::BindGroup,
    ) {
        let (room_pipeline, grid_pipeline) = if cube {
            (&self.cube_pipeline, &self.grid_cube_pipeline)
        } else {
            (&self.pipeline, &self.grid_pipeline)
        };

        pass.set_bind_group(0, camera_bind_group, &[]);
        pass.set_bind_group(1, scene_bind_group, &[]);

        pass.set_pipeline(room_pipeline);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.num_indices, 0, 0..1);

        if let Some(grid) = &self.grid_vertex_buffer {
            pass.set_pipeline(grid_pipeline);
            pass.set_vertex_buffer(0, grid.slice(..));
            pass.draw(0..self.grid_vertex_count, 0..1);
        }
    }
}

/// Core renderer managing wgpu state
pub struct Renderer {
    pub surface: Surface<'static>,
    pub device: Device,
    pub queue: Queue,
    pub config: SurfaceConfiguration,
    pub size: (u32, u32),
    pub camera: Camera,
    home_camera: (Vec3, Vec3),
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    ambient: AmbientLight,
    fog: Fog,
    clear_color: wgpu::Color,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,

    room: RoomResources,

    // Sphere
    pbr_pipeline: wgpu::RenderPipeline,
    pbr_pipeline_layout: wgpu::PipelineLayout,
    pbr_buffer: wgpu::Buffer,
    pbr_bind_group: wgpu::BindGroup,
    sphere_vertex_buffer: wgpu::Buffer,
    sphere_index_buffer: wgpu::Buffer,
    sphere_num_indices: u32,
    sphere_model: Mat4,
    shader_files: PbrShaderFiles,

    environment: EnvironmentMap,

    // egui state
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,

    // UI state
    pub controls: ControlState,
    pub fps: f32,
    frame_count: u32,
    fps_update_timer: f32,
    num_triangles: usize,
}

impl Renderer {
    /// Create a depth texture for the given size
    fn create_depth_texture(device: &Device, size: (u32, u32)) -> (wgpu::Texture, wgpu::TextureView) {
        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        (depth_texture, depth_view)
    }

    /// Create a new renderer for the given window
    pub async fn new(window: Arc<winit::window::Window>, viewer_config: &ViewerConfig) -> Result<Self> {
        let size = window.inner_size();
        let size = (size.width.max(1), size.height.max(1));

        // Create wgpu instance
        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("Failed to find suitable GPU adapter"))?;

        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Facet Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("Surface reports no supported formats"))?;

        let config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.0,
            height: size.1,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        // Scene and controls
        let max_dimension = device.limits().max_texture_dimension_2d;
        if viewer_config.env_map_resolution > max_dimension {
            anyhow::bail!(
                "env_map_resolution {} exceeds this device's texture limit of {}",
                viewer_config.env_map_resolution,
                max_dimension
            );
        }

        let scene = SceneDescription::build(&viewer_config.room, viewer_config.env_map_resolution);
        let mut controls = ControlState::from_config(viewer_config)?;

        let aspect = size.0 as f32 / size.1 as f32;
        let camera = Camera::new(scene.camera_position, scene.camera_target, aspect);

        log::info!(
            "Camera positioned at {:?}, looking at {:?}",
            camera.position,
            camera.target
        );

        // Camera uniform (group 0)
        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[uniform_layout_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Lights and fog (group 1)
        let scene_uniform = SceneUniform::new(&controls.light, &scene.ambient, &scene.fog);
        let scene_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Buffer"),
            contents: bytemuck::cast_slice(&[scene_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let scene_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[uniform_layout_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        let (depth_texture, depth_view) = Self::create_depth_texture(&device, size);

        // Room and grid
        let scene_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Room Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &scene_bind_group_layout],
            push_constant_ranges: &[],
        });

        let room_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Room Shader"),
            source: wgpu::ShaderSource::Wgsl(ROOM_SHADER.into()),
        });
        let grid_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Grid Shader"),
            source: wgpu::ShaderSource::Wgsl(GRID_SHADER.into()),
        });

        let room_pipeline_for = |label: &str, color: wgpu::TextureFormat, depth: wgpu::TextureFormat| {
            create_scene_pipeline(
                &device,
                label,
                &scene_pipeline_layout,
                &room_shader,
                RoomVertex::desc(),
                wgpu::PrimitiveTopology::TriangleList,
                color,
                depth,
            )
        };
        let grid_pipeline_for = |label: &str, color: wgpu::TextureFormat, depth: wgpu::TextureFormat| {
            create_scene_pipeline(
                &device,
                label,
                &scene_pipeline_layout,
                &grid_shader,
                GridVertex::desc(),
                wgpu::PrimitiveTopology::LineList,
                color,
                depth,
            )
        };

        let (room_vertices, room_indices) = RoomVertex::from_objects(&scene.objects);
        let grid_vertices = scene
            .grid
            .as_ref()
            .map(|grid| GridVertex::from_grid(grid, scene.grid_height));

        let room = RoomResources {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Room Vertex Buffer"),
                contents: bytemuck::cast_slice(&room_vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Room Index Buffer"),
                contents: bytemuck::cast_slice(&room_indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            num_indices: room_indices.len() as u32,
            grid_vertex_buffer: grid_vertices.as_ref().map(|vertices| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Grid Vertex Buffer"),
                    contents: bytemuck::cast_slice(vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            }),
            grid_vertex_count: grid_vertices.as_ref().map_or(0, |v| v.len() as u32),
            pipeline: room_pipeline_for("Room Pipeline", config.format, DEPTH_FORMAT),
            cube_pipeline: room_pipeline_for("Room Cube Pipeline", CUBE_FORMAT, CUBE_DEPTH_FORMAT),
            grid_pipeline: grid_pipeline_for("Grid Pipeline", config.format, DEPTH_FORMAT),
            grid_cube_pipeline: grid_pipeline_for("Grid Cube Pipeline", CUBE_FORMAT, CUBE_DEPTH_FORMAT),
        };

        log::info!(
            "Room: {} objects, {} triangles, grid={}",
            scene.objects.len(),
            scene.room_triangle_count(),
            room.grid_vertex_buffer.is_some()
        );

        // Environment cube
        let environment = EnvironmentMap::new(&device, &scene.probe, &camera_bind_group_layout);

        // Sphere (group 2: material, environment)
        let sphere_model = Mat4::from_translation(scene.sphere_center);
        let pbr_uniform = PbrUniform::new(
            sphere_model,
            &controls.material,
            &controls.models,
            environment.max_lod(),
        );
        let pbr_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("PBR Buffer"),
            contents: bytemuck::cast_slice(&[pbr_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let pbr_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PBR Bind Group Layout"),
            entries: &[
                uniform_layout_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pbr_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("PBR Bind Group"),
            layout: &pbr_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: pbr_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(environment.cube_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(environment.sampler()),
                },
            ],
        });

        let pbr_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PBR Pipeline Layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
                &scene_bind_group_layout,
                &pbr_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let mut shader_files = PbrShaderFiles::new(viewer_config.shader_dir.clone(), viewer_config.hot_reload);
        let source = shader_files.load();
        let pbr_pipeline = match create_pbr_pipeline(&device, &pbr_pipeline_layout, config.format, &source) {
            Ok(pipeline) => {
                controls.shader_status = ShaderStatus::Active(source.origin);
                pipeline
            }
            Err(e) if source.origin != ShaderOrigin::Embedded => {
                log::error!("{:#}; falling back to built-in sphere shader", e);
                let pipeline = create_pbr_pipeline(
                    &device,
                    &pbr_pipeline_layout,
                    config.format,
                    &PbrShaderSource::embedded(),
                )?;
                controls.shader_status = ShaderStatus::Rejected {
                    active: ShaderOrigin::Embedded,
                    error: format!("{:#}", e),
                };
                pipeline
            }
            Err(e) => return Err(e),
        };

        let sphere_vertices = PbrVertex::from_mesh(&scene.sphere);
        let sphere_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere Vertex Buffer"),
            contents: bytemuck::cast_slice(&sphere_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sphere_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere Index Buffer"),
            contents: bytemuck::cast_slice(&scene.sphere.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::info!(
            "Sphere: {} vertices, {} triangles",
            scene.sphere.vertex_count(),
            scene.sphere.triangle_count()
        );

        // Initialize egui
        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1, false);

        log::info!("egui initialized");

        let background = hex_to_linear(scene.background);
        let num_triangles = scene.room_triangle_count() + scene.sphere.triangle_count();

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            camera,
            home_camera: (scene.camera_position, scene.camera_target),
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            scene_buffer,
            scene_bind_group,
            ambient: scene.ambient,
            fog: scene.fog,
            clear_color: wgpu::Color {
                r: background.x as f64,
                g: background.y as f64,
                b: background.z as f64,
                a: 1.0,
            },
            depth_texture,
            depth_view,
            room,
            pbr_pipeline,
            pbr_pipeline_layout,
            pbr_buffer,
            pbr_bind_group,
            sphere_vertex_buffer,
            sphere_index_buffer,
            sphere_num_indices: scene.sphere.indices.len() as u32,
            sphere_model,
            shader_files,
            environment,
            egui_ctx,
            egui_state,
            egui_renderer,
            controls,
            fps: 0.0,
            frame_count: 0,
            fps_update_timer: 0.0,
            num_triangles,
        })
    }

    /// Handle window resize
    pub fn resize(&mut self, new_size: (u32, u32)) {
        if new_size.0 > 0 && new_size.1 > 0 {
            self.size = new_size;
            self.config.width = new_size.0;
            self.config.height = new_size.1;
            self.surface.configure(&self.device, &self.config);

            let (depth_texture, depth_view) = Self::create_depth_texture(&self.device, new_size);
            self.depth_texture = depth_texture;
            self.depth_view = depth_view;

            let aspect = new_size.0 as f32 / new_size.1 as f32;
            self.camera.set_aspect(aspect);
            self.update_camera();
        }
    }

    /// Update camera uniform buffer (call after modifying camera)
    pub fn update_camera(&mut self) {
        self.camera_uniform.update_view_proj(&self.camera);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
    }

    /// Put the camera back at its startup position
    pub fn reset_camera(&mut self) {
        let (position, target) = self.home_camera;
        let mut camera = Camera::new(position, target, self.camera.aspect);
        camera.near = self.camera.near;
        camera.far = self.camera.far;
        self.camera = camera;
        self.update_camera();
        log::info!("Camera reset to {:?}", position);
    }

    pub fn toggle_ui(&mut self) {
        self.controls.show_ui = !self.controls.show_ui;
    }

    /// Reload the sphere shader on the next frame
    pub fn request_shader_reload(&mut self) {
        self.shader_files.request_reload();
    }

    /// Handle egui window event - returns true if event was consumed by egui
    pub fn handle_egui_event(&mut self, window: &winit::window::Window, event: &winit::event::WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        response.consumed
    }

    /// Update FPS counter (call each frame with delta_time)
    pub fn update_fps(&mut self, delta_time: f32) {
        self.frame_count += 1;
        self.fps_update_timer += delta_time;

        // Update FPS every 0.5 seconds
        if self.fps_update_timer >= 0.5 {
            self.fps = self.frame_count as f32 / self.fps_update_timer;
            self.frame_count = 0;
            self.fps_update_timer = 0.0;
        }
    }

    /// Rebuild the sphere pipeline if its sources changed. A source that
    /// fails to compile leaves the current pipeline in place.
    fn reload_shader_if_needed(&mut self) {
        if std::mem::take(&mut self.controls.reload_requested) {
            self.shader_files.request_reload();
        }
        if !self.shader_files.poll() {
            return;
        }

        let source = self.shader_files.load();
        match create_pbr_pipeline(&self.device, &self.pbr_pipeline_layout, self.config.format, &source) {
            Ok(pipeline) => {
                log::info!("Sphere shader rebuilt from {}", source.origin);
                self.pbr_pipeline = pipeline;
                self.controls.shader_status = ShaderStatus::Active(source.origin);
            }
            Err(e) => {
                log::error!("Keeping previous sphere shader: {:#}", e);
                self.controls.shader_status = ShaderStatus::Rejected {
                    active: self.controls.shader_status.active().clone(),
                    error: format!("{:#}", e),
                };
            }
        }
    }

    /// Copy the GUI-owned state into the scene and material uniforms
    fn upload_uniforms(&mut self) {
        let scene_uniform = SceneUniform::new(&self.controls.light, &self.ambient, &self.fog);
        self.queue
            .write_buffer(&self.scene_buffer, 0, bytemuck::cast_slice(&[scene_uniform]));

        let pbr_uniform = PbrUniform::new(
            self.sphere_model,
            &self.controls.material,
            &self.controls.models,
            self.environment.max_lod(),
        );
        self.queue
            .write_buffer(&self.pbr_buffer, 0, bytemuck::cast_slice(&[pbr_uniform]));
    }

    /// Render one frame: environment capture, room, sphere, GUI
    pub fn render(&mut self, window: &winit::window::Window) -> Result<()> {
        self.reload_shader_if_needed();

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Build UI
        let raw_input = self.egui_state.take_egui_input(window);
        let stats = FrameStats {
            fps: self.fps,
            size: self.size,
            triangles: self.num_triangles,
            env_resolution: self.environment.probe().resolution,
            env_mip_levels: self.environment.probe().mip_level_count(),
        };
        let controls = &mut self.controls;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if ui::draw_panel(ctx, controls, &stats) {
                log::trace!("Shading inputs changed");
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        self.upload_uniforms();

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.size.0, self.size.1],
            pixels_per_point: window.scale_factor() as f32,
        };

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // Upload egui textures
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        // Reflection probe sees the room only
        let room = &self.room;
        let scene_bind_group = &self.scene_bind_group;
        self.environment
            .capture(&mut encoder, self.clear_color, |pass, camera_bind_group| {
                room.draw(pass, true, camera_bind_group, scene_bind_group);
            });

        // Main render pass
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.room
                .draw(&mut render_pass, false, &self.camera_bind_group, &self.scene_bind_group);

            render_pass.set_pipeline(&self.pbr_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_bind_group(1, &self.scene_bind_group, &[]);
            render_pass.set_bind_group(2, &self.pbr_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.sphere_vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.sphere_index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.sphere_num_indices, 0, 0..1);
        }

        // Render egui on top
        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime(); // egui renderer needs a 'static pass

            self.egui_renderer
                .render(&mut egui_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
