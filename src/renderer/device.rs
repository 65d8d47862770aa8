use std::collections::HashMap;

use crate::error::RendererError;
use crate::renderer::binding::RootSlot;
use crate::renderer::command::{CommandList, RenderCommand, ResourceState, TargetId};
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::upload::FrameConstants;
use crate::scene::{GeometryRegistry, TextureTable};

/// Everything the device turns into static GPU resources at start-up.
pub struct StaticResources<'a> {
    pub geometry: &'a GeometryRegistry,
    pub textures: &'a TextureTable,
    pub shaders: &'a ShaderLibrary,
    pub shadow_map_size: u32,
}

/// The GPU side of the renderer. The scene core only talks to this trait, so
/// a frame can be recorded and checked without a GPU.
pub trait GraphicsDevice {
    fn back_buffer_count(&self) -> u32;

    fn surface_size(&self) -> (u32, u32);

    /// Creates buffers, textures and pipelines. Called once, before any frame.
    fn create_static_resources(
        &mut self,
        resources: &StaticResources<'_>,
    ) -> Result<(), RendererError>;

    fn resize(&mut self, width: u32, height: u32);

    /// Copies the CPU constant mirrors into the GPU buffers.
    fn upload_constants(&mut self, constants: &FrameConstants) -> Result<(), RendererError>;

    fn submit(&mut self, commands: &CommandList) -> Result<(), RendererError>;

    fn present(&mut self) -> Result<(), RendererError>;

    /// Blocks until the GPU has finished every submitted command.
    fn flush(&mut self) -> Result<(), RendererError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    CreateStaticResources,
    Resize(u32, u32),
    UploadConstants,
    Submit,
    Present,
    Flush,
}

/// Counts of what `create_static_resources` was handed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StaticResourceSummary {
    pub vertex_buffers: usize,
    pub geometries: usize,
    pub textures: usize,
    pub shaders: usize,
    pub shadow_map_size: u32,
}

/// In-memory device. Keeps every command list and constant upload and checks
/// that target transitions and constant records are consistent.
pub struct RecordingDevice {
    width: u32,
    height: u32,
    back_buffer_count: u32,
    static_resources: Option<StaticResourceSummary>,
    states: HashMap<TargetId, ResourceState>,
    uploaded_this_frame: bool,
    pub events: Vec<DeviceEvent>,
    pub submissions: Vec<CommandList>,
    pub uploads: Vec<FrameConstants>,
}

impl RecordingDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            back_buffer_count: 2,
            static_resources: None,
            states: Self::initial_states(),
            uploaded_this_frame: false,
            events: Vec::new(),
            submissions: Vec::new(),
            uploads: Vec::new(),
        }
    }

    fn initial_states() -> HashMap<TargetId, ResourceState> {
        HashMap::from([
            (TargetId::BackBuffer, ResourceState::Present),
            (TargetId::SceneDepth, ResourceState::DepthWrite),
            (TargetId::ShadowMap, ResourceState::GenericRead),
        ])
    }

    pub fn static_resources(&self) -> Option<StaticResourceSummary> {
        self.static_resources
    }

    pub fn state(&self, target: TargetId) -> Option<ResourceState> {
        self.states.get(&target).copied()
    }

    pub fn count(&self, event: DeviceEvent) -> usize {
        self.events.iter().filter(|&&e| e == event).count()
    }

    pub fn last_submission(&self) -> Option<&CommandList> {
        self.submissions.last()
    }

    fn check_record(
        constants: &FrameConstants,
        slot: RootSlot,
        record: u32,
    ) -> Result<(), RendererError> {
        let len = match slot {
            RootSlot::ObjectCb => constants.objects.len(),
            RootSlot::MaterialCb => constants.materials.len(),
            RootSlot::PassCb => constants.passes.len(),
            RootSlot::SkinnedCb => constants.skinned.len(),
            other => {
                return Err(RendererError::InvalidCommand(format!(
                    "{:?} is not a constant-buffer slot",
                    other
                )))
            }
        };
        if record as usize >= len {
            return Err(RendererError::InvalidCommand(format!(
                "{:?} record {} out of range ({} uploaded)",
                slot, record, len
            )));
        }
        Ok(())
    }

    /// Target states only change once the whole list is accepted.
    fn replay(&mut self, commands: &CommandList) -> Result<(), RendererError> {
        let constants = self.uploads.last();
        let mut states = self.states.clone();

        for command in commands.commands() {
            match *command {
                RenderCommand::Transition { target, from, to } => {
                    let current = states.get(&target).copied();
                    if current != Some(from) {
                        return Err(RendererError::InvalidCommand(format!(
                            "{:?} transition {:?} -> {:?} while in {:?}",
                            target, from, to, current
                        )));
                    }
                    states.insert(target, to);
                }
                RenderCommand::SetConstantBuffer { slot, record } => {
                    let constants = constants.ok_or_else(|| {
                        RendererError::InvalidCommand(
                            "constant buffer bound before any upload".to_string(),
                        )
                    })?;
                    Self::check_record(constants, slot, record)?;
                }
                RenderCommand::SetDescriptorTable { slot, heap_index } => {
                    let textures = self.static_resources.map_or(0, |s| s.textures);
                    let valid = match slot {
                        RootSlot::ShadowMapTable => heap_index as usize == textures,
                        RootSlot::SkyboxTable | RootSlot::DiffuseTable | RootSlot::NormalTable => {
                            (heap_index as usize) < textures
                        }
                        _ => false,
                    };
                    if !valid {
                        return Err(RendererError::InvalidCommand(format!(
                            "{:?} heap index {} out of range",
                            slot, heap_index
                        )));
                    }
                }
                RenderCommand::DrawIndexed(_) if !self.uploaded_this_frame => {
                    return Err(RendererError::InvalidCommand(
                        "draw submitted before the frame's constants were uploaded".to_string(),
                    ));
                }
                _ => {}
            }
        }

        self.states = states;
        Ok(())
    }
}

impl GraphicsDevice for RecordingDevice {
    fn back_buffer_count(&self) -> u32 {
        self.back_buffer_count
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_static_resources(
        &mut self,
        resources: &StaticResources<'_>,
    ) -> Result<(), RendererError> {
        self.static_resources = Some(StaticResourceSummary {
            vertex_buffers: resources.geometry.buffer_count(),
            geometries: resources.geometry.len(),
            textures: resources.textures.len(),
            shaders: resources.shaders.len(),
            shadow_map_size: resources.shadow_map_size,
        });
        self.events.push(DeviceEvent::CreateStaticResources);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.events.push(DeviceEvent::Resize(width, height));
    }

    fn upload_constants(&mut self, constants: &FrameConstants) -> Result<(), RendererError> {
        self.uploads.push(constants.clone());
        self.uploaded_this_frame = true;
        self.events.push(DeviceEvent::UploadConstants);
        Ok(())
    }

    fn submit(&mut self, commands: &CommandList) -> Result<(), RendererError> {
        if self.static_resources.is_none() {
            return Err(RendererError::NotInitialized("static resources"));
        }
        self.replay(commands)?;
        self.submissions.push(commands.clone());
        self.events.push(DeviceEvent::Submit);
        Ok(())
    }

    fn present(&mut self) -> Result<(), RendererError> {
        if self.state(TargetId::BackBuffer) != Some(ResourceState::Present) {
            return Err(RendererError::InvalidCommand(
                "back buffer presented while still a render target".to_string(),
            ));
        }
        self.uploaded_this_frame = false;
        self.events.push(DeviceEvent::Present);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RendererError> {
        self.events.push(DeviceEvent::Flush);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::command::DrawIndexedArgs;

    fn ready_device() -> RecordingDevice {
        let mut device = RecordingDevice::new(640, 480);
        let geometry = GeometryRegistry::new();
        let textures = TextureTable::new();
        let shaders = ShaderLibrary::new();
        device
            .create_static_resources(&StaticResources {
                geometry: &geometry,
                textures: &textures,
                shaders: &shaders,
                shadow_map_size: 1024,
            })
            .unwrap();
        device
    }

    #[test]
    fn submit_requires_static_resources() {
        let mut device = RecordingDevice::new(640, 480);
        assert!(matches!(
            device.submit(&CommandList::new()),
            Err(RendererError::NotInitialized(_))
        ));
    }

    #[test]
    fn mismatched_transition_is_rejected() {
        let mut device = ready_device();
        let mut commands = CommandList::new();
        commands.push(RenderCommand::Transition {
            target: TargetId::ShadowMap,
            from: ResourceState::DepthWrite,
            to: ResourceState::GenericRead,
        });
        assert!(matches!(
            device.submit(&commands),
            Err(RendererError::InvalidCommand(_))
        ));
    }

    #[test]
    fn draw_without_upload_is_rejected() {
        let mut device = ready_device();
        let mut commands = CommandList::new();
        commands.push(RenderCommand::DrawIndexed(DrawIndexedArgs {
            index_count: 3,
            instance_count: 1,
            start_index: 0,
            base_vertex: 0,
            start_instance: 0,
        }));
        assert!(device.submit(&commands).is_err());

        device.upload_constants(&FrameConstants::new()).unwrap();
        assert!(device.submit(&commands).is_ok());
    }

    #[test]
    fn constant_records_are_range_checked() {
        let mut device = ready_device();
        device.upload_constants(&FrameConstants::new()).unwrap();

        let mut commands = CommandList::new();
        commands.push(RenderCommand::SetConstantBuffer {
            slot: RootSlot::PassCb,
            record: 1,
        });
        assert!(device.submit(&commands).is_ok());

        commands.push(RenderCommand::SetConstantBuffer {
            slot: RootSlot::ObjectCb,
            record: 0,
        });
        assert!(device.submit(&commands).is_err());
    }

    #[test]
    fn rejected_submit_keeps_target_states() {
        let mut device = ready_device();
        device.upload_constants(&FrameConstants::new()).unwrap();

        let mut commands = CommandList::new();
        commands.push(RenderCommand::Transition {
            target: TargetId::BackBuffer,
            from: ResourceState::Present,
            to: ResourceState::RenderTarget,
        });
        commands.push(RenderCommand::SetConstantBuffer {
            slot: RootSlot::ObjectCb,
            record: 5,
        });
        assert!(device.submit(&commands).is_err());
        assert_eq!(
            device.state(TargetId::BackBuffer),
            Some(ResourceState::Present)
        );

        let mut frame = CommandList::new();
        frame.push(RenderCommand::Transition {
            target: TargetId::BackBuffer,
            from: ResourceState::Present,
            to: ResourceState::RenderTarget,
        });
        assert!(device.submit(&frame).is_ok());
        assert_eq!(
            device.state(TargetId::BackBuffer),
            Some(ResourceState::RenderTarget)
        );
    }
}
