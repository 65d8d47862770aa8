use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::*,
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::error::RendererError;
use crate::render_application::SceneRenderer;
use crate::renderer::{run_frame, FrameState, MouseButtons, RenderApp, WgpuDevice};
use crate::scene::demo::build_demo_scene;
use crate::settings::RenderSettings;
use crate::time::FrameTimer;

struct Running {
    window: Arc<Window>,
    renderer: SceneRenderer<WgpuDevice>,
    frame: FrameState,
}

/// Window shell. Owns the event loop side and forwards everything to the
/// [`SceneRenderer`].
pub struct App {
    settings: RenderSettings,
    running: Option<Running>,
    timer: FrameTimer,
    buttons: MouseButtons,
    cursor: (f32, f32),
}

impl App {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            running: None,
            timer: FrameTimer::new(),
            buttons: MouseButtons::empty(),
            cursor: (0.0, 0.0),
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<Running, RendererError> {
        let resolution = &self.settings.resolution;
        let attributes = Window::default_attributes()
            .with_title("wgpu shadows & skinning")
            .with_inner_size(PhysicalSize::new(resolution.width, resolution.height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let device = WgpuDevice::new(window.clone(), &self.settings)?;
        let scene = build_demo_scene(&self.settings.assets);
        let mut renderer = SceneRenderer::new(device, scene, self.settings.clone());
        renderer.initialize()?;

        let frame = renderer.first_frame();
        Ok(Running {
            window,
            renderer,
            frame,
        })
    }

    fn button_flag(button: MouseButton) -> MouseButtons {
        match button {
            MouseButton::Left => MouseButtons::LEFT,
            MouseButton::Right => MouseButtons::RIGHT,
            MouseButton::Middle => MouseButtons::MIDDLE,
            _ => MouseButtons::empty(),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(running) => {
                running.window.request_redraw();
                self.timer = FrameTimer::new();
                self.running = Some(running);
            }
            Err(err) => {
                log::error!("Renderer failed to start: {}", err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        if running.window.id() != id {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                if let Err(err) = running.renderer.shutdown() {
                    log::warn!("Shutdown flush failed: {}", err);
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.renderer.on_resize(size.width, size.height);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = running.window.inner_size();
                running.renderer.on_resize(size.width, size.height);
            }
            WindowEvent::Focused(focused) => {
                self.timer.set_paused(!focused);
            }
            WindowEvent::RedrawRequested => {
                let dt = self.timer.tick();
                match run_frame(&mut running.renderer, running.frame, dt) {
                    Ok(next) => running.frame = next,
                    Err(RendererError::Surface(err)) => {
                        log::warn!("Skipping frame: {}", err);
                    }
                    Err(err) => {
                        log::error!("Frame {} failed: {}", running.frame.frame_index, err);
                        event_loop.exit();
                        return;
                    }
                }
                running.window.request_redraw();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape && state == ElementState::Pressed {
                    if let Err(err) = running.renderer.shutdown() {
                        log::warn!("Shutdown flush failed: {}", err);
                    }
                    event_loop.exit();
                    return;
                }
                running
                    .renderer
                    .on_key(code, state == ElementState::Pressed);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let flag = Self::button_flag(button);
                let (x, y) = self.cursor;
                match state {
                    ElementState::Pressed => {
                        self.buttons.insert(flag);
                        running.renderer.on_mouse_down(flag, x, y);
                    }
                    ElementState::Released => {
                        self.buttons.remove(flag);
                        running.renderer.on_mouse_up(flag, x, y);
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                running
                    .renderer
                    .on_mouse_move(self.buttons, self.cursor.0, self.cursor.1);
            }
            _ => {}
        }
    }
}
