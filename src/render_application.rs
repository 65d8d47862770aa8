use std::collections::HashSet;

use glam::Vec2;
use winit::keyboard::KeyCode;

use crate::error::RendererError;
use crate::renderer::command::CommandList;
use crate::renderer::device::{GraphicsDevice, StaticResources};
use crate::renderer::draw::{record_main_pass, MainPassInputs};
use crate::renderer::frame::{FrameState, MouseButtons, RenderApp};
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::shadow_pass::{record_shadow_pass, ShadowMapTarget};
use crate::renderer::upload::FrameConstants;
use crate::scene::{Camera, Scene, ShadowController};
use crate::settings::RenderSettings;

/// Drives one scene through the frame lifecycle on any [`GraphicsDevice`].
pub struct SceneRenderer<D: GraphicsDevice> {
    device: D,
    settings: RenderSettings,
    scene: Scene,
    camera: Camera,
    shadow: ShadowController,
    shadow_target: ShadowMapTarget,
    constants: FrameConstants,
    commands: CommandList,
    shaders: Option<ShaderLibrary>,
    keys_down: HashSet<KeyCode>,
    last_mouse: Vec2,
}

impl<D: GraphicsDevice> SceneRenderer<D> {
    pub fn new(device: D, scene: Scene, settings: RenderSettings) -> Self {
        let shadow = ShadowController::new(
            scene.bounds,
            settings.light_rotation_speed,
            settings.shadow_map_size,
        );

        Self {
            device,
            shadow_target: ShadowMapTarget::new(settings.shadow_map_size),
            settings,
            scene,
            camera: Camera::default(),
            shadow,
            constants: FrameConstants::new(),
            commands: CommandList::new(),
            shaders: None,
            keys_down: HashSet::new(),
            last_mouse: Vec2::ZERO,
        }
    }

    pub fn first_frame(&self) -> FrameState {
        FrameState::new(self.device.back_buffer_count())
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn shadow(&self) -> &ShadowController {
        &self.shadow
    }

    pub fn constants(&self) -> &FrameConstants {
        &self.constants
    }

    pub fn commands(&self) -> &CommandList {
        &self.commands
    }

    pub fn shadows_enabled(&self) -> bool {
        self.settings.shadows_enabled
    }

    fn update_camera(&mut self, dt: f32) {
        let step = self.settings.camera_speed * dt;
        if self.keys_down.contains(&KeyCode::KeyW) {
            self.camera.walk(step);
        }
        if self.keys_down.contains(&KeyCode::KeyS) {
            self.camera.walk(-step);
        }
        if self.keys_down.contains(&KeyCode::KeyA) {
            self.camera.strafe(-step);
        }
        if self.keys_down.contains(&KeyCode::KeyD) {
            self.camera.strafe(step);
        }
    }
}

impl<D: GraphicsDevice> RenderApp for SceneRenderer<D> {
    fn initialize(&mut self) -> Result<(), RendererError> {
        let shaders = ShaderLibrary::standard()?;

        self.device.create_static_resources(&StaticResources {
            geometry: &self.scene.geometry,
            textures: &self.scene.textures,
            shaders: &shaders,
            shadow_map_size: self.settings.shadow_map_size,
        })?;
        self.shaders = Some(shaders);

        let (width, height) = self.device.surface_size();
        self.camera.set_aspect(width, height);

        self.device.flush()?;
        log::info!(
            "Renderer initialised: {}x{}, shadows {}",
            width,
            height,
            if self.settings.shadows_enabled { "on" } else { "off" }
        );
        Ok(())
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.device.resize(width, height);
        self.camera.set_aspect(width, height);
    }

    fn update(&mut self, dt: f32) {
        self.update_camera(dt);

        self.shadow.update(dt);
        self.scene
            .lighting
            .set_sun_direction(self.shadow.light_direction());

        self.scene.update_animations(dt);

        let environment = &self.scene.lighting.environment;
        self.constants.upload_object_constants(&self.scene.items);
        self.constants.upload_material_constants(&self.scene.materials);
        self.constants
            .upload_pass_constants(&self.camera, self.shadow.light(), environment);
        if self.settings.shadows_enabled {
            self.constants
                .upload_shadow_pass_constants(self.shadow.light(), environment);
        }
        self.constants
            .upload_skinned_constants(&self.scene.skinned_instances);
    }

    fn draw(&mut self, frame: &mut FrameState) {
        self.commands.clear();

        if self.settings.shadows_enabled {
            record_shadow_pass(
                &mut self.commands,
                &mut self.shadow_target,
                &self.scene.items,
                &self.scene.materials,
            );
        }

        let (width, height) = self.device.surface_size();
        record_main_pass(
            &mut self.commands,
            &MainPassInputs {
                catalog: &self.scene.items,
                materials: &self.scene.materials,
                width,
                height,
                skybox_heap_index: self.scene.skybox,
                shadow_map_heap_index: self
                    .settings
                    .shadows_enabled
                    .then(|| self.scene.textures.shadow_map_heap_index()),
            },
        );

        log::trace!(
            "Frame {} recorded {} commands into back buffer {}",
            frame.frame_index,
            self.commands.len(),
            frame.back_buffer_index
        );
    }

    fn draw_end(&mut self, frame: FrameState) -> Result<FrameState, RendererError> {
        if self.shaders.is_none() {
            return Err(RendererError::NotInitialized("draw_end"));
        }

        self.device.upload_constants(&self.constants)?;
        self.device.submit(&self.commands)?;
        self.device.present()?;
        self.device.flush()?;

        Ok(frame.advance())
    }

    fn on_mouse_down(&mut self, _buttons: MouseButtons, x: f32, y: f32) {
        self.last_mouse = Vec2::new(x, y);
    }

    fn on_mouse_move(&mut self, buttons: MouseButtons, x: f32, y: f32) {
        let position = Vec2::new(x, y);
        if buttons.contains(MouseButtons::LEFT) {
            let delta = (position - self.last_mouse) * self.settings.mouse_sensitivity;
            self.camera.pitch(delta.y.to_radians());
            self.camera.rotate_y(delta.x.to_radians());
        }
        self.last_mouse = position;
    }

    fn on_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.keys_down.insert(key);
        } else {
            self.keys_down.remove(&key);
        }
    }

    fn shutdown(&mut self) -> Result<(), RendererError> {
        self.device.flush()
    }
}
