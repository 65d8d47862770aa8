use bitflags::bitflags;

use crate::renderer::binding::RootSlot;
use crate::renderer::pipeline::PipelineKind;
use crate::scene::GeometryHandle;

/// Usage state of a render target between commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Present,
    RenderTarget,
    DepthWrite,
    GenericRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    BackBuffer,
    SceneDepth,
    ShadowMap,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const DEPTH = 1 << 0;
        const STENCIL = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndexedArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
    pub start_instance: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Transition {
        target: TargetId,
        from: ResourceState,
        to: ResourceState,
    },
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    ClearColor {
        target: TargetId,
        color: [f32; 4],
    },
    ClearDepthStencil {
        target: TargetId,
        flags: ClearFlags,
        depth: f32,
        stencil: u8,
    },
    SetRenderTargets {
        color: Option<TargetId>,
        depth: Option<TargetId>,
    },
    SetPipeline(PipelineKind),
    SetConstantBuffer {
        slot: RootSlot,
        record: u32,
    },
    SetDescriptorTable {
        slot: RootSlot,
        heap_index: u32,
    },
    SetGeometry(GeometryHandle),
    SetTopology(wgpu::PrimitiveTopology),
    DrawIndexed(DrawIndexedArgs),
}

/// Ordered commands for one frame. Replayed by the device in `submit`.
#[derive(Debug, Default, Clone)]
pub struct CommandList {
    commands: Vec<RenderCommand>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawIndexedArgs> {
        self.commands.iter().filter_map(|command| match command {
            RenderCommand::DrawIndexed(args) => Some(args),
            _ => None,
        })
    }

    pub fn transitions_of(
        &self,
        target: TargetId,
    ) -> impl Iterator<Item = (ResourceState, ResourceState)> + '_ {
        self.commands.iter().filter_map(move |command| match *command {
            RenderCommand::Transition { target: t, from, to } if t == target => Some((from, to)),
            _ => None,
        })
    }

    pub fn position(&self, predicate: impl Fn(&RenderCommand) -> bool) -> Option<usize> {
        self.commands.iter().position(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_filter_only_draw_commands() {
        let mut list = CommandList::new();
        list.push(RenderCommand::SetPipeline(PipelineKind::Opaque));
        list.push(RenderCommand::DrawIndexed(DrawIndexedArgs {
            index_count: 3,
            instance_count: 1,
            start_index: 0,
            base_vertex: 0,
            start_instance: 0,
        }));

        assert_eq!(list.len(), 2);
        assert_eq!(list.draws().count(), 1);
    }

    #[test]
    fn transitions_are_filtered_by_target() {
        let mut list = CommandList::new();
        list.push(RenderCommand::Transition {
            target: TargetId::ShadowMap,
            from: ResourceState::GenericRead,
            to: ResourceState::DepthWrite,
        });
        list.push(RenderCommand::Transition {
            target: TargetId::BackBuffer,
            from: ResourceState::Present,
            to: ResourceState::RenderTarget,
        });

        let shadow: Vec<_> = list.transitions_of(TargetId::ShadowMap).collect();
        assert_eq!(shadow, vec![(ResourceState::GenericRead, ResourceState::DepthWrite)]);
    }
}
