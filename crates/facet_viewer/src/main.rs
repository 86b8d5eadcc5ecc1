use anyhow::Result;
use facet_core::ViewerConfig;
use facet_viewport::Renderer;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

const ORBIT_SENSITIVITY: f32 = 0.005;
const PAN_SENSITIVITY: f32 = 0.001;

/// Application state
struct App {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,

    // Input state
    left_mouse_pressed: bool,
    pan_mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    last_frame_time: Instant,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            window: None,
            renderer: None,
            left_mouse_pressed: false,
            pan_mouse_pressed: false,
            last_mouse_pos: None,
            last_frame_time: Instant::now(),
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        // Initialize renderer (async in pollster block)
        let renderer = pollster::block_on(Renderer::new(window.clone(), &self.config))?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, keycode: KeyCode) {
        if keycode == KeyCode::Escape {
            log::info!("Escape pressed");
            event_loop.exit();
            return;
        }

        let Some(renderer) = &mut self.renderer else {
            return;
        };
        match keycode {
            KeyCode::KeyF => renderer.reset_camera(),
            KeyCode::KeyR => {
                log::info!("Shader reload requested");
                renderer.request_shader_reload();
            }
            KeyCode::KeyH => renderer.toggle_ui(),
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let delta_time = (now - self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) else {
            return;
        };

        renderer.update_fps(delta_time);

        if let Err(e) = renderer.render(window) {
            // Check if it's a surface error we can handle
            if let Some(surface_err) = e.downcast_ref::<wgpu::SurfaceError>() {
                match surface_err {
                    wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                        // Surface lost, reconfigure
                        renderer.resize(renderer.size);
                    }
                    wgpu::SurfaceError::OutOfMemory => {
                        log::error!("Out of memory!");
                        event_loop.exit();
                    }
                    _ => {
                        log::warn!("Surface error: {:?}", surface_err);
                    }
                }
            } else {
                log::error!("Render error: {:?}", e);
            }
        }

        // Request next frame
        window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            match self.init(event_loop) {
                Ok(()) => log::info!("Window and renderer initialized"),
                Err(e) => {
                    log::error!("Failed to initialize viewer: {:#}", e);
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        // Let egui handle the event first
        if let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) {
            if renderer.handle_egui_event(window, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize((physical_size.width, physical_size.height));
                    log::info!("Resized to {}x{}", physical_size.width, physical_size.height);
                }
            }
            WindowEvent::MouseInput { button, state, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.left_mouse_pressed = pressed,
                    MouseButton::Right | MouseButton::Middle => self.pan_mouse_pressed = pressed,
                    _ => {}
                }
                if !pressed {
                    self.last_mouse_pos = None;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.left_mouse_pressed || self.pan_mouse_pressed {
                    if let (Some(last_pos), Some(renderer)) = (self.last_mouse_pos, &mut self.renderer) {
                        let delta_x = (position.x - last_pos.0) as f32;
                        let delta_y = (position.y - last_pos.1) as f32;

                        if self.left_mouse_pressed {
                            renderer
                                .camera
                                .orbit(-delta_x * ORBIT_SENSITIVITY, -delta_y * ORBIT_SENSITIVITY);
                        } else {
                            // Pan offset is scaled by the orbit distance
                            renderer
                                .camera
                                .pan(-delta_x * PAN_SENSITIVITY, delta_y * PAN_SENSITIVITY);
                        }
                        renderer.update_camera();
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(renderer) = &mut self.renderer {
                    let scroll_amount = match delta {
                        winit::event::MouseScrollDelta::LineDelta(_, y) => y * 100.0,
                        winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                    };

                    renderer.camera.dolly(-scroll_amount);
                    renderer.update_camera();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(keycode),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, keycode),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting Facet Viewer");

    let config = match std::env::args().nth(1) {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);

    log::info!("Running event loop");
    event_loop.run_app(&mut app)?;

    Ok(())
}
