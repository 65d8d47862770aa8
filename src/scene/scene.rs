use std::sync::Arc;

use super::animation::{SkinnedData, SkinnedModelInstance};
use super::geometry::GeometryRegistry;
use super::lights::SceneLighting;
use super::material::{MaterialTable, TextureTable};
use super::render_item::{RenderItem, RenderItemCatalog, RenderLayer};
use super::shadow::SceneBounds;
use glam::Vec4;

/// Everything the frame reads: static tables built once, plus the items and
/// animated instances that change per frame.
pub struct Scene {
    pub geometry: GeometryRegistry,
    pub textures: TextureTable,
    pub materials: MaterialTable,
    pub items: RenderItemCatalog,
    pub skinned_instances: Vec<SkinnedModelInstance>,
    pub lighting: SceneLighting,
    pub bounds: SceneBounds,
    /// Heap slot of the cube texture bound for the sky and reflections.
    pub skybox: Option<u32>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            geometry: GeometryRegistry::new(),
            textures: TextureTable::new(),
            materials: MaterialTable::new(),
            items: RenderItemCatalog::new(),
            skinned_instances: Vec::new(),
            lighting: SceneLighting::new(Vec4::new(0.25, 0.25, 0.35, 1.0)),
            bounds: SceneBounds::default(),
            skybox: None,
        }
    }

    pub fn add_item(&mut self, item: RenderItem, layer: RenderLayer) -> u32 {
        self.items.add(item, layer)
    }

    /// Starts `clip` on a new instance and returns its skinned-constant record.
    pub fn add_skinned_instance(&mut self, skeleton: Arc<SkinnedData>, clip: &str) -> u32 {
        self.skinned_instances
            .push(SkinnedModelInstance::new(skeleton, clip));
        (self.skinned_instances.len() - 1) as u32
    }

    pub fn update_animations(&mut self, dt: f32) {
        for instance in &mut self.skinned_instances {
            instance.update(dt);
        }
    }

    pub fn has_skinned_items(&self) -> bool {
        self.items.layer(RenderLayer::SkinnedOpaque).next().is_some()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
