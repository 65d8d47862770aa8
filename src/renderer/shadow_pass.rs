use crate::renderer::binding::RootSlot;
use crate::renderer::command::{
    ClearFlags, CommandList, RenderCommand, ResourceState, ScissorRect, TargetId, Viewport,
};
use crate::renderer::draw::draw_render_items;
use crate::renderer::pipeline::PipelineKind;
use crate::renderer::upload::SHADOW_PASS;
use crate::scene::{MaterialTable, RenderItemCatalog, RenderLayer};

/// Layers rendered into the shadow map and the depth-only pipeline each uses.
pub const SHADOW_CASTERS: [(RenderLayer, PipelineKind); 2] = [
    (RenderLayer::Opaque, PipelineKind::Shadow),
    (RenderLayer::SkinnedOpaque, PipelineKind::SkinnedShadow),
];

/// Tracks the shadow map between its sampled and depth-write states.
/// Sampled by default; only the shadow pass flips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowMapTarget {
    size: u32,
    state: ResourceState,
}

impl ShadowMapTarget {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            state: ResourceState::GenericRead,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn begin_write(&mut self, commands: &mut CommandList) {
        assert_eq!(
            self.state,
            ResourceState::GenericRead,
            "shadow map is already bound for writing"
        );
        commands.push(RenderCommand::Transition {
            target: TargetId::ShadowMap,
            from: ResourceState::GenericRead,
            to: ResourceState::DepthWrite,
        });
        self.state = ResourceState::DepthWrite;
    }

    pub fn end_write(&mut self, commands: &mut CommandList) {
        assert_eq!(
            self.state,
            ResourceState::DepthWrite,
            "shadow map was never bound for writing"
        );
        commands.push(RenderCommand::Transition {
            target: TargetId::ShadowMap,
            from: ResourceState::DepthWrite,
            to: ResourceState::GenericRead,
        });
        self.state = ResourceState::GenericRead;
    }
}

/// Depth-only pass from the light. Leaves the map readable for the main pass.
pub fn record_shadow_pass(
    commands: &mut CommandList,
    target: &mut ShadowMapTarget,
    catalog: &RenderItemCatalog,
    materials: &MaterialTable,
) {
    commands.push(RenderCommand::SetViewport(Viewport::full(
        target.size,
        target.size,
    )));
    commands.push(RenderCommand::SetScissor(ScissorRect::full(
        target.size,
        target.size,
    )));

    target.begin_write(commands);
    commands.push(RenderCommand::ClearDepthStencil {
        target: TargetId::ShadowMap,
        flags: ClearFlags::DEPTH,
        depth: 1.0,
        stencil: 0,
    });
    commands.push(RenderCommand::SetRenderTargets {
        color: None,
        depth: Some(TargetId::ShadowMap),
    });
    commands.push(RenderCommand::SetConstantBuffer {
        slot: RootSlot::PassCb,
        record: SHADOW_PASS,
    });

    for (layer, pipeline) in SHADOW_CASTERS {
        commands.push(RenderCommand::SetPipeline(pipeline));
        draw_render_items(commands, catalog.layer(layer), materials);
    }

    target.end_write(commands);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::primitives::{box_mesh, grid_mesh};
    use crate::scene::{GeometryRegistry, MaterialParams, MaterialTextures, RenderItem};

    fn scene() -> (RenderItemCatalog, MaterialTable) {
        let mut registry = GeometryRegistry::new();
        let cube = registry.register("Box", &box_mesh(1.0, 1.0, 1.0, 0));
        let grid = registry.register("Grid", &grid_mesh(20.0, 30.0, 4, 4));
        let mut materials = MaterialTable::new();
        let material =
            materials.register("Gray", MaterialTextures::default(), MaterialParams::default());

        let mut catalog = RenderItemCatalog::new();
        catalog.add(
            RenderItem::new(cube, registry.geometry(cube), material),
            RenderLayer::Opaque,
        );
        catalog.add(
            RenderItem::new(grid, registry.geometry(grid), material),
            RenderLayer::Transparent,
        );
        catalog.add(
            RenderItem::new(cube, registry.geometry(cube), material),
            RenderLayer::Debug,
        );
        (catalog, materials)
    }

    #[test]
    fn shadow_pass_draws_only_casters() {
        let (catalog, materials) = scene();
        let mut target = ShadowMapTarget::new(2048);
        let mut commands = CommandList::new();
        record_shadow_pass(&mut commands, &mut target, &catalog, &materials);

        let draws: Vec<_> = commands.draws().collect();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].index_count, 36);
        assert!(commands
            .commands()
            .contains(&RenderCommand::SetViewport(Viewport::full(2048, 2048))));
    }

    #[test]
    fn map_round_trips_to_readable() {
        let (catalog, materials) = scene();
        let mut target = ShadowMapTarget::new(512);
        let mut commands = CommandList::new();
        record_shadow_pass(&mut commands, &mut target, &catalog, &materials);

        let transitions: Vec<_> = commands.transitions_of(TargetId::ShadowMap).collect();
        assert_eq!(
            transitions,
            vec![
                (ResourceState::GenericRead, ResourceState::DepthWrite),
                (ResourceState::DepthWrite, ResourceState::GenericRead),
            ]
        );
        assert_eq!(target.state(), ResourceState::GenericRead);

        let clear = commands
            .position(|c| matches!(c, RenderCommand::ClearDepthStencil { .. }))
            .unwrap();
        let first_draw = commands
            .position(|c| matches!(c, RenderCommand::DrawIndexed(_)))
            .unwrap();
        assert!(clear < first_draw);
    }

    #[test]
    #[should_panic]
    fn double_begin_is_rejected() {
        let mut target = ShadowMapTarget::new(512);
        let mut commands = CommandList::new();
        target.begin_write(&mut commands);
        target.begin_write(&mut commands);
    }
}
