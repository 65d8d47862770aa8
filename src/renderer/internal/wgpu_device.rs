use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::RendererError;
use crate::renderer::command::CommandList;
use crate::renderer::device::{GraphicsDevice, StaticResources};
use crate::renderer::internal::replay::{replay, FrameTargets, ReplayResources};
use crate::renderer::internal::{
    FrameUniforms, GeometryBuffers, PipelineLayouts, RenderContext, RenderPipelines, ShadowMap,
    TextureHeap,
};
use crate::renderer::upload::FrameConstants;
use crate::settings::RenderSettings;

struct GpuResources {
    buffers: Vec<GeometryBuffers>,
    geometry_buffers: Vec<usize>,
    heap: TextureHeap,
    shadow: ShadowMap,
    uniforms: FrameUniforms,
    pipelines: RenderPipelines,
}

/// [`GraphicsDevice`] backed by a wgpu surface.
pub struct WgpuDevice {
    context: RenderContext,
    resources: Option<GpuResources>,
    frame: Option<wgpu::SurfaceTexture>,
    record_counts: [usize; 4],
}

impl WgpuDevice {
    pub fn new(window: Arc<Window>, settings: &RenderSettings) -> Result<Self, RendererError> {
        let context = pollster::block_on(RenderContext::new(window, settings))?;
        Ok(Self {
            context,
            resources: None,
            frame: None,
            record_counts: [0; 4],
        })
    }

    fn acquire(&self) -> Result<wgpu::SurfaceTexture, RendererError> {
        match self.context.surface.get_current_texture() {
            Ok(texture) => Ok(texture),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.context.reconfigure();
                Ok(self.context.surface.get_current_texture()?)
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl GraphicsDevice for WgpuDevice {
    fn back_buffer_count(&self) -> u32 {
        self.context.config.desired_maximum_frame_latency
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.context.config.width, self.context.config.height)
    }

    fn create_static_resources(
        &mut self,
        resources: &StaticResources<'_>,
    ) -> Result<(), RendererError> {
        let device = &self.context.device;
        let queue = &self.context.queue;

        let buffers = GeometryBuffers::create_all(device, resources.geometry);
        let geometry_buffers = resources
            .geometry
            .iter()
            .map(|(_, geometry)| geometry.buffers.index())
            .collect();

        let heap = TextureHeap::new(device, queue, resources.textures);
        let shadow = ShadowMap::new(device, queue, resources.shadow_map_size);
        let uniforms = FrameUniforms::new(device, &FrameConstants::new());

        let layouts = PipelineLayouts::new(
            device,
            &uniforms.bind_layout,
            &heap.pass_layout,
            &heap.material_layout,
        );
        let pipelines = RenderPipelines::new(
            device,
            resources.shaders,
            &layouts,
            self.context.config.format,
        )?;

        self.resources = Some(GpuResources {
            buffers,
            geometry_buffers,
            heap,
            shadow,
            uniforms,
            pipelines,
        });
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(PhysicalSize::new(width, height));
    }

    fn upload_constants(&mut self, constants: &FrameConstants) -> Result<(), RendererError> {
        let gpu = self
            .resources
            .as_mut()
            .ok_or(RendererError::NotInitialized("upload_constants"))?;
        gpu.uniforms
            .upload(&self.context.device, &self.context.queue, constants);
        self.record_counts = [
            constants.objects.len(),
            constants.materials.len(),
            constants.passes.len(),
            constants.skinned.len(),
        ];
        Ok(())
    }

    fn submit(&mut self, commands: &CommandList) -> Result<(), RendererError> {
        if self.resources.is_none() {
            return Err(RendererError::NotInitialized("submit"));
        }
        let surface_texture = self.acquire()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let Some(gpu) = self.resources.as_mut() else {
            return Err(RendererError::NotInitialized("submit"));
        };
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("FrameEncoder"),
                });

        let frame = FrameTargets {
            back_buffer: &view,
            scene_depth: &self.context.depth.view,
            shadow_map: &gpu.shadow.view,
        };
        let mut resources = ReplayResources {
            device: &self.context.device,
            pipelines: &gpu.pipelines,
            uniforms: &gpu.uniforms,
            heap: &mut gpu.heap,
            shadow: &gpu.shadow,
            buffers: &gpu.buffers,
            geometry_buffers: &gpu.geometry_buffers,
            record_counts: self.record_counts,
        };
        let stats = replay(&mut encoder, &frame, &mut resources, commands)?;

        self.context.queue.submit(Some(encoder.finish()));
        self.frame = Some(surface_texture);

        log::trace!("Submitted {} passes, {} draws", stats.passes, stats.draws);
        Ok(())
    }

    fn present(&mut self) -> Result<(), RendererError> {
        match self.frame.take() {
            Some(frame) => frame.present(),
            None => log::warn!("present() without a submitted frame"),
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RendererError> {
        self.context
            .device
            .poll(wgpu::PollType::wait_indefinitely())?;
        Ok(())
    }
}
