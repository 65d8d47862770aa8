use crate::renderer::binding::RootSlot;
use crate::renderer::command::{
    ClearFlags, CommandList, DrawIndexedArgs, RenderCommand, ResourceState, ScissorRect, TargetId,
    Viewport,
};
use crate::renderer::pipeline::PipelineKind;
use crate::renderer::upload::CAMERA_PASS;
use crate::scene::{MaterialTable, RenderItem, RenderItemCatalog, RenderLayer};

/// LightSteelBlue.
pub const CLEAR_COLOR: [f32; 4] = [0.690_196, 0.768_627, 0.870_588, 1.0];

/// Scene state the main pass reads from.
pub struct MainPassInputs<'a> {
    pub catalog: &'a RenderItemCatalog,
    pub materials: &'a MaterialTable,
    pub width: u32,
    pub height: u32,
    pub skybox_heap_index: Option<u32>,
    /// `None` when shadow mapping is off.
    pub shadow_map_heap_index: Option<u32>,
}

/// Binds per-item resources and issues one indexed draw per item.
pub fn draw_render_items<'a>(
    commands: &mut CommandList,
    items: impl IntoIterator<Item = &'a RenderItem>,
    materials: &MaterialTable,
) {
    for item in items {
        let material = materials.material(item.material);

        commands.push(RenderCommand::SetConstantBuffer {
            slot: RootSlot::ObjectCb,
            record: item.object_index(),
        });
        commands.push(RenderCommand::SetConstantBuffer {
            slot: RootSlot::MaterialCb,
            record: material.cb_index,
        });

        if let Some(heap_index) = material.diffuse_slot {
            commands.push(RenderCommand::SetDescriptorTable {
                slot: RootSlot::DiffuseTable,
                heap_index,
            });
        }
        if let Some(heap_index) = material.normal_slot {
            commands.push(RenderCommand::SetDescriptorTable {
                slot: RootSlot::NormalTable,
                heap_index,
            });
        }
        if let Some(skinned) = item.skinned {
            commands.push(RenderCommand::SetConstantBuffer {
                slot: RootSlot::SkinnedCb,
                record: skinned.cb_index,
            });
        }

        commands.push(RenderCommand::SetGeometry(item.geometry));
        commands.push(RenderCommand::SetTopology(item.topology));
        commands.push(RenderCommand::DrawIndexed(DrawIndexedArgs {
            index_count: item.index_count,
            instance_count: 1,
            start_index: item.start_index,
            base_vertex: item.base_vertex,
            start_instance: 0,
        }));
    }
}

/// Colour pass into the back buffer. Layers are walked in
/// `RenderLayer::DRAW_ORDER`; items keep insertion order within a layer.
pub fn record_main_pass(commands: &mut CommandList, inputs: &MainPassInputs<'_>) {
    commands.push(RenderCommand::SetViewport(Viewport::full(
        inputs.width,
        inputs.height,
    )));
    commands.push(RenderCommand::SetScissor(ScissorRect::full(
        inputs.width,
        inputs.height,
    )));

    commands.push(RenderCommand::Transition {
        target: TargetId::BackBuffer,
        from: ResourceState::Present,
        to: ResourceState::RenderTarget,
    });
    commands.push(RenderCommand::ClearColor {
        target: TargetId::BackBuffer,
        color: CLEAR_COLOR,
    });
    commands.push(RenderCommand::ClearDepthStencil {
        target: TargetId::SceneDepth,
        flags: ClearFlags::DEPTH | ClearFlags::STENCIL,
        depth: 1.0,
        stencil: 0,
    });
    commands.push(RenderCommand::SetRenderTargets {
        color: Some(TargetId::BackBuffer),
        depth: Some(TargetId::SceneDepth),
    });

    commands.push(RenderCommand::SetConstantBuffer {
        slot: RootSlot::PassCb,
        record: CAMERA_PASS,
    });
    if let Some(heap_index) = inputs.skybox_heap_index {
        commands.push(RenderCommand::SetDescriptorTable {
            slot: RootSlot::SkyboxTable,
            heap_index,
        });
    }
    if let Some(heap_index) = inputs.shadow_map_heap_index {
        commands.push(RenderCommand::SetDescriptorTable {
            slot: RootSlot::ShadowMapTable,
            heap_index,
        });
    }

    for layer in RenderLayer::DRAW_ORDER {
        commands.push(RenderCommand::SetPipeline(PipelineKind::for_layer(layer)));
        draw_render_items(commands, inputs.catalog.layer(layer), inputs.materials);
    }

    commands.push(RenderCommand::Transition {
        target: TargetId::BackBuffer,
        from: ResourceState::RenderTarget,
        to: ResourceState::Present,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::primitives::box_mesh;
    use crate::scene::{GeometryRegistry, MaterialParams, MaterialTextures};

    #[test]
    fn box_item_issues_exactly_its_draw() {
        let mut registry = GeometryRegistry::new();
        let handle = registry.register("Box", &box_mesh(1.0, 1.0, 1.0, 0));
        let mut materials = MaterialTable::new();
        let material =
            materials.register("Gray", MaterialTextures::default(), MaterialParams::default());
        let mut catalog = RenderItemCatalog::new();
        catalog.add(
            RenderItem::new(handle, registry.geometry(handle), material),
            RenderLayer::Opaque,
        );

        let mut commands = CommandList::new();
        draw_render_items(&mut commands, catalog.layer(RenderLayer::Opaque), &materials);

        let draws: Vec<_> = commands.draws().copied().collect();
        assert_eq!(
            draws,
            vec![DrawIndexedArgs {
                index_count: 36,
                instance_count: 1,
                start_index: 0,
                base_vertex: 0,
                start_instance: 0,
            }]
        );
        assert!(!commands
            .commands()
            .iter()
            .any(|c| matches!(c, RenderCommand::SetDescriptorTable { .. })));
    }

    #[test]
    fn textured_and_skinned_items_bind_their_extras() {
        let mut registry = GeometryRegistry::new();
        let handle = registry.register("Box", &box_mesh(1.0, 1.0, 1.0, 0));
        let mut materials = MaterialTable::new();
        let material = materials.register(
            "Bricks",
            MaterialTextures {
                diffuse: Some(2),
                normal: Some(3),
            },
            MaterialParams::default(),
        );
        let item = RenderItem::new(handle, registry.geometry(handle), material).with_skinning(0, 0);

        let mut commands = CommandList::new();
        draw_render_items(&mut commands, [&item], &materials);

        let list = commands.commands();
        assert!(list.contains(&RenderCommand::SetDescriptorTable {
            slot: RootSlot::DiffuseTable,
            heap_index: 2,
        }));
        assert!(list.contains(&RenderCommand::SetDescriptorTable {
            slot: RootSlot::NormalTable,
            heap_index: 3,
        }));
        assert!(list.contains(&RenderCommand::SetConstantBuffer {
            slot: RootSlot::SkinnedCb,
            record: 0,
        }));
    }

    #[test]
    fn main_pass_follows_layer_order_and_brackets_back_buffer() {
        let catalog = RenderItemCatalog::new();
        let materials = MaterialTable::new();
        let mut commands = CommandList::new();
        record_main_pass(
            &mut commands,
            &MainPassInputs {
                catalog: &catalog,
                materials: &materials,
                width: 800,
                height: 600,
                skybox_heap_index: Some(6),
                shadow_map_heap_index: None,
            },
        );

        let pipelines: Vec<PipelineKind> = commands
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::SetPipeline(kind) => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            pipelines,
            vec![
                PipelineKind::Opaque,
                PipelineKind::SkinnedOpaque,
                PipelineKind::AlphaTested,
                PipelineKind::Transparent,
                PipelineKind::Debug,
                PipelineKind::Skybox,
            ]
        );

        let transitions: Vec<_> = commands.transitions_of(TargetId::BackBuffer).collect();
        assert_eq!(
            transitions,
            vec![
                (ResourceState::Present, ResourceState::RenderTarget),
                (ResourceState::RenderTarget, ResourceState::Present),
            ]
        );
        assert!(!commands.commands().iter().any(|c| matches!(
            c,
            RenderCommand::SetDescriptorTable {
                slot: RootSlot::ShadowMapTable,
                ..
            }
        )));
    }
}
