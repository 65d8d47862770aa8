use std::collections::HashMap;

use crate::error::RendererError;
use crate::renderer::binding::RootSlot;
use crate::renderer::command::{
    ClearFlags, CommandList, DrawIndexedArgs, RenderCommand, ScissorRect, TargetId, Viewport,
};
use crate::renderer::constant_buffer::ConstantBuffer;
use crate::renderer::constants::{
    MaterialConstants, ObjectConstants, PassConstants, SkinnedConstants,
};
use crate::renderer::internal::{
    FrameUniforms, GeometryBuffers, RenderPipelines, ShadowMap, TextureHeap,
};
use crate::renderer::pipeline::PipelineKind;
use crate::scene::GeometryHandle;

/// Views of the three render targets for this frame.
pub(crate) struct FrameTargets<'a> {
    pub(crate) back_buffer: &'a wgpu::TextureView,
    pub(crate) scene_depth: &'a wgpu::TextureView,
    pub(crate) shadow_map: &'a wgpu::TextureView,
}

/// Static resources a command list refers to by index.
pub(crate) struct ReplayResources<'a> {
    pub(crate) device: &'a wgpu::Device,
    pub(crate) pipelines: &'a RenderPipelines,
    pub(crate) uniforms: &'a FrameUniforms,
    pub(crate) heap: &'a mut TextureHeap,
    pub(crate) shadow: &'a ShadowMap,
    pub(crate) buffers: &'a [GeometryBuffers],
    /// Buffer pair index per geometry handle.
    pub(crate) geometry_buffers: &'a [usize],
    /// Records uploaded per uniform binding, in binding order.
    pub(crate) record_counts: [usize; 4],
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReplayStats {
    pub(crate) passes: u32,
    pub(crate) draws: u32,
}

#[derive(Debug, Clone, Copy)]
enum PendingClear {
    Color([f32; 4]),
    DepthStencil { depth: Option<f32>, stencil: Option<u8> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Targets {
    color: Option<TargetId>,
    depth: Option<TargetId>,
}

impl Targets {
    fn uses(&self, target: TargetId) -> bool {
        self.color == Some(target) || self.depth == Some(target)
    }
}

/// Root bindings as the command list set them.
#[derive(Debug, Default)]
struct Bindings {
    pipeline: Option<PipelineKind>,
    geometry: Option<GeometryHandle>,
    offsets: [u32; 4],
    skybox: Option<u32>,
    diffuse: Option<u32>,
    normal: Option<u32>,
}

/// What the open render pass already has set.
#[derive(Debug, Default)]
struct PassBindings {
    pipeline: Option<PipelineKind>,
    geometry: Option<GeometryHandle>,
}

fn record_stride(slot: RootSlot) -> u64 {
    match slot {
        RootSlot::ObjectCb => ConstantBuffer::<ObjectConstants>::stride(),
        RootSlot::MaterialCb => ConstantBuffer::<MaterialConstants>::stride(),
        RootSlot::PassCb => ConstantBuffer::<PassConstants>::stride(),
        _ => ConstantBuffer::<SkinnedConstants>::stride(),
    }
}

fn invalid(message: impl Into<String>) -> RendererError {
    RendererError::InvalidCommand(message.into())
}

/// Turns a recorded command list into wgpu render passes.
///
/// Passes open lazily at the first draw after `SetRenderTargets`, so clears
/// recorded before it become load operations. A transition ends the pass;
/// wgpu tracks the actual usage barriers itself.
struct Replay<'a, 'r> {
    encoder: &'a mut wgpu::CommandEncoder,
    frame: &'a FrameTargets<'a>,
    resources: &'a mut ReplayResources<'r>,
    pass: Option<wgpu::RenderPass<'static>>,
    targets: Option<Targets>,
    clears: HashMap<TargetId, PendingClear>,
    viewport: Option<Viewport>,
    scissor: Option<ScissorRect>,
    bindings: Bindings,
    bound: PassBindings,
    stats: ReplayStats,
}

pub(crate) fn replay(
    encoder: &mut wgpu::CommandEncoder,
    frame: &FrameTargets<'_>,
    resources: &mut ReplayResources<'_>,
    commands: &CommandList,
) -> Result<ReplayStats, RendererError> {
    let mut replay = Replay {
        encoder,
        frame,
        resources,
        pass: None,
        targets: None,
        clears: HashMap::new(),
        viewport: None,
        scissor: None,
        bindings: Bindings::default(),
        bound: PassBindings::default(),
        stats: ReplayStats::default(),
    };

    for command in commands.commands() {
        replay.apply(command)?;
    }
    replay.flush_clears(None)?;
    replay.end_pass();

    Ok(replay.stats)
}

impl Replay<'_, '_> {
    fn apply(&mut self, command: &RenderCommand) -> Result<(), RendererError> {
        match *command {
            RenderCommand::Transition { target, from, to } => {
                self.flush_clears(None)?;
                self.end_pass();
                log::trace!("{:?}: {:?} -> {:?}", target, from, to);
            }
            RenderCommand::SetViewport(viewport) => {
                self.viewport = Some(viewport);
                if let Some(pass) = self.pass.as_mut() {
                    apply_viewport(pass, &viewport);
                }
            }
            RenderCommand::SetScissor(rect) => {
                self.scissor = Some(rect);
                if let Some(pass) = self.pass.as_mut() {
                    pass.set_scissor_rect(rect.x, rect.y, rect.width, rect.height);
                }
            }
            RenderCommand::ClearColor { target, color } => {
                if target != TargetId::BackBuffer {
                    return Err(invalid(format!("{:?} has no color aspect", target)));
                }
                self.queue_clear(target, PendingClear::Color(color));
            }
            RenderCommand::ClearDepthStencil {
                target,
                flags,
                depth,
                stencil,
            } => {
                if target == TargetId::BackBuffer {
                    return Err(invalid("back buffer has no depth aspect"));
                }
                let depth = flags
                    .contains(ClearFlags::DEPTH)
                    .then_some(depth);
                let stencil = (flags.contains(ClearFlags::STENCIL)
                    && target == TargetId::SceneDepth)
                    .then_some(stencil);
                self.queue_clear(target, PendingClear::DepthStencil { depth, stencil });
            }
            RenderCommand::SetRenderTargets { color, depth } => {
                let targets = Targets { color, depth };
                if self.targets != Some(targets) {
                    self.end_pass();
                    self.flush_clears(Some(targets))?;
                    self.targets = Some(targets);
                }
            }
            RenderCommand::SetPipeline(kind) => self.bindings.pipeline = Some(kind),
            RenderCommand::SetConstantBuffer { slot, record } => {
                let index = slot
                    .dynamic_offset_index()
                    .ok_or_else(|| invalid(format!("{:?} is not a constant-buffer slot", slot)))?;
                let available = self.resources.record_counts[index];
                if record as usize >= available {
                    return Err(invalid(format!(
                        "{:?} record {} out of range ({} uploaded)",
                        slot, record, available
                    )));
                }
                self.bindings.offsets[index] = (u64::from(record) * record_stride(slot)) as u32;
            }
            RenderCommand::SetDescriptorTable { slot, heap_index } => {
                let textures = self.resources.heap.len() as u32;
                match slot {
                    RootSlot::ShadowMapTable if heap_index == textures => {}
                    RootSlot::SkyboxTable if heap_index < textures => {
                        self.bindings.skybox = Some(heap_index)
                    }
                    RootSlot::DiffuseTable if heap_index < textures => {
                        self.bindings.diffuse = Some(heap_index)
                    }
                    RootSlot::NormalTable if heap_index < textures => {
                        self.bindings.normal = Some(heap_index)
                    }
                    _ => {
                        return Err(invalid(format!(
                            "{:?} heap index {} out of range",
                            slot, heap_index
                        )))
                    }
                }
            }
            RenderCommand::SetGeometry(handle) => {
                if handle.index() >= self.resources.geometry_buffers.len() {
                    return Err(invalid(format!("unknown geometry {:?}", handle)));
                }
                self.bindings.geometry = Some(handle);
            }
            RenderCommand::SetTopology(topology) => {
                if topology != wgpu::PrimitiveTopology::TriangleList {
                    return Err(invalid(format!(
                        "pipelines are built for triangle lists, got {:?}",
                        topology
                    )));
                }
            }
            RenderCommand::DrawIndexed(args) => self.draw(&args)?,
        }
        Ok(())
    }

    fn queue_clear(&mut self, target: TargetId, clear: PendingClear) {
        // A clear inside an open pass restarts it with a clearing load op.
        if self.pass.is_some() && self.targets.is_some_and(|t| t.uses(target)) {
            self.end_pass();
        }
        let merged = match (self.clears.get(&target), clear) {
            (
                Some(&PendingClear::DepthStencil { depth, stencil }),
                PendingClear::DepthStencil {
                    depth: new_depth,
                    stencil: new_stencil,
                },
            ) => PendingClear::DepthStencil {
                depth: new_depth.or(depth),
                stencil: new_stencil.or(stencil),
            },
            _ => clear,
        };
        self.clears.insert(target, merged);
    }

    /// Executes clears that no draw picked up, except those for `keep`.
    fn flush_clears(&mut self, keep: Option<Targets>) -> Result<(), RendererError> {
        while let Some(target) = self
            .clears
            .keys()
            .copied()
            .find(|&t| !keep.is_some_and(|k| k.uses(t)))
        {
            let targets = match self.targets {
                Some(targets) if targets.uses(target) => targets,
                _ if target == TargetId::BackBuffer => Targets {
                    color: Some(target),
                    depth: None,
                },
                _ => Targets {
                    color: None,
                    depth: Some(target),
                },
            };
            self.end_pass();
            self.begin_pass(targets)?;
            self.end_pass();
        }
        Ok(())
    }

    fn begin_pass(&mut self, targets: Targets) -> Result<(), RendererError> {
        let frame = self.frame;
        let color_clear = targets.color.and_then(|t| self.clears.remove(&t));
        let depth_clear = targets.depth.and_then(|t| self.clears.remove(&t));

        let color_attachment = match targets.color {
            Some(target) => {
                let load = match color_clear {
                    Some(PendingClear::Color([r, g, b, a])) => wgpu::LoadOp::Clear(wgpu::Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: a as f64,
                    }),
                    _ => wgpu::LoadOp::Load,
                };
                Some(wgpu::RenderPassColorAttachment {
                    view: color_view(frame, target)?,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })
            }
            None => None,
        };

        let depth_attachment = match targets.depth {
            Some(target) => {
                let (depth, stencil) = match depth_clear {
                    Some(PendingClear::DepthStencil { depth, stencil }) => (depth, stencil),
                    _ => (None, None),
                };
                let depth_ops = wgpu::Operations {
                    load: depth.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                    store: wgpu::StoreOp::Store,
                };
                let stencil_ops = (target == TargetId::SceneDepth).then(|| wgpu::Operations {
                    load: stencil.map_or(wgpu::LoadOp::Load, |s| wgpu::LoadOp::Clear(u32::from(s))),
                    store: wgpu::StoreOp::Store,
                });
                Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view(frame, target)?,
                    depth_ops: Some(depth_ops),
                    stencil_ops,
                })
            }
            None => None,
        };

        let label = if targets.depth == Some(TargetId::ShadowMap) {
            "ShadowPass"
        } else {
            "MainPass"
        };
        let color_attachments: Vec<_> = color_attachment.into_iter().map(Some).collect();
        let mut pass = self
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &color_attachments,
                depth_stencil_attachment: depth_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();

        if let Some(viewport) = &self.viewport {
            apply_viewport(&mut pass, viewport);
        }
        if let Some(rect) = self.scissor {
            pass.set_scissor_rect(rect.x, rect.y, rect.width, rect.height);
        }

        self.pass = Some(pass);
        self.bound = PassBindings::default();
        self.stats.passes += 1;
        Ok(())
    }

    fn end_pass(&mut self) {
        self.pass = None;
    }

    fn draw(&mut self, args: &DrawIndexedArgs) -> Result<(), RendererError> {
        let kind = self
            .bindings
            .pipeline
            .ok_or_else(|| invalid("draw without a pipeline"))?;
        let geometry = self
            .bindings
            .geometry
            .ok_or_else(|| invalid("draw without geometry"))?;

        if self.pass.is_none() {
            let targets = self
                .targets
                .ok_or_else(|| invalid("draw without render targets"))?;
            self.begin_pass(targets)?;
        }
        let Some(pass) = self.pass.as_mut() else {
            return Err(invalid("render pass did not open"));
        };
        let resources = &mut *self.resources;

        if self.bound.pipeline != Some(kind) {
            let pipeline = resources
                .pipelines
                .get(kind)
                .ok_or_else(|| invalid(format!("{:?} pipeline was not built", kind)))?;
            pass.set_pipeline(pipeline);
            self.bound.pipeline = Some(kind);
        }

        if self.bound.geometry != Some(geometry) {
            let buffers = &resources.buffers[resources.geometry_buffers[geometry.index()]];
            pass.set_vertex_buffer(0, buffers.vertex.slice(..));
            pass.set_index_buffer(buffers.index.slice(..), buffers.index_format);
            self.bound.geometry = Some(geometry);
        }

        pass.set_bind_group(0, &resources.uniforms.bind_group, &self.bindings.offsets);
        if !kind.is_shadow() {
            let pass_group =
                resources
                    .heap
                    .pass_group(resources.device, self.bindings.skybox, resources.shadow);
            pass.set_bind_group(1, pass_group, &[]);
            let material_group = resources.heap.material_group(
                resources.device,
                self.bindings.diffuse,
                self.bindings.normal,
            );
            pass.set_bind_group(2, material_group, &[]);
        }

        pass.draw_indexed(
            args.start_index..args.start_index + args.index_count,
            args.base_vertex,
            args.start_instance..args.start_instance + args.instance_count,
        );
        self.stats.draws += 1;
        Ok(())
    }
}

fn color_view<'f>(
    frame: &FrameTargets<'f>,
    target: TargetId,
) -> Result<&'f wgpu::TextureView, RendererError> {
    match target {
        TargetId::BackBuffer => Ok(frame.back_buffer),
        other => Err(invalid(format!("{:?} cannot be a color target", other))),
    }
}

fn depth_view<'f>(
    frame: &FrameTargets<'f>,
    target: TargetId,
) -> Result<&'f wgpu::TextureView, RendererError> {
    match target {
        TargetId::SceneDepth => Ok(frame.scene_depth),
        TargetId::ShadowMap => Ok(frame.shadow_map),
        TargetId::BackBuffer => Err(invalid("back buffer cannot be a depth target")),
    }
}

fn apply_viewport(pass: &mut wgpu::RenderPass<'_>, viewport: &Viewport) {
    pass.set_viewport(
        viewport.x,
        viewport.y,
        viewport.width,
        viewport.height,
        viewport.min_depth,
        viewport.max_depth,
    );
}
