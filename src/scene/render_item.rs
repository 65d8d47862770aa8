use glam::Mat4;

use super::geometry::{Geometry, GeometryHandle};
use super::material::MaterialHandle;

/// Pipeline grouping of render items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderLayer {
    Opaque,
    SkinnedOpaque,
    Transparent,
    AlphaTested,
    Debug,
    Skybox,
}

impl RenderLayer {
    pub const COUNT: usize = 6;

    pub const ALL: [RenderLayer; Self::COUNT] = [
        RenderLayer::Opaque,
        RenderLayer::SkinnedOpaque,
        RenderLayer::Transparent,
        RenderLayer::AlphaTested,
        RenderLayer::Debug,
        RenderLayer::Skybox,
    ];

    /// Order the main pass walks the layers in.
    pub const DRAW_ORDER: [RenderLayer; Self::COUNT] = [
        RenderLayer::Opaque,
        RenderLayer::SkinnedOpaque,
        RenderLayer::AlphaTested,
        RenderLayer::Transparent,
        RenderLayer::Debug,
        RenderLayer::Skybox,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Which skinned palette an item reads and which instance drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinnedBinding {
    pub cb_index: u32,
    pub instance: usize,
}

/// One drawable placement of a geometry with a material.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    object_index: u32,
    pub world: Mat4,
    pub tex_transform: Mat4,
    pub topology: wgpu::PrimitiveTopology,
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    pub index_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
    pub skinned: Option<SkinnedBinding>,
    layer: RenderLayer,
}

impl RenderItem {
    /// Draws the whole range of `geometry` with identity transforms.
    pub fn new(handle: GeometryHandle, geometry: &Geometry, material: MaterialHandle) -> Self {
        Self {
            object_index: 0,
            world: Mat4::IDENTITY,
            tex_transform: Mat4::IDENTITY,
            topology: wgpu::PrimitiveTopology::TriangleList,
            geometry: handle,
            material,
            index_count: geometry.index_count,
            start_index: geometry.start_index,
            base_vertex: geometry.base_vertex,
            skinned: None,
            layer: RenderLayer::Opaque,
        }
    }

    pub fn with_world(mut self, world: Mat4) -> Self {
        self.world = world;
        self
    }

    pub fn with_tex_transform(mut self, tex_transform: Mat4) -> Self {
        self.tex_transform = tex_transform;
        self
    }

    pub fn with_skinning(mut self, cb_index: u32, instance: usize) -> Self {
        self.skinned = Some(SkinnedBinding { cb_index, instance });
        self
    }

    /// Position in the catalog; only the catalog assigns it.
    pub fn object_index(&self) -> u32 {
        self.object_index
    }

    pub fn layer(&self) -> RenderLayer {
        self.layer
    }
}

/// All render items of the scene, bucketed by layer. Object indices stay dense
/// over the whole catalog.
///
/// Removing an item renumbers everything after it and bumps `generation`, so
/// the object constant buffer has to be rebuilt from scratch.
#[derive(Default)]
pub struct RenderItemCatalog {
    items: Vec<RenderItem>,
    layers: [Vec<usize>; RenderLayer::COUNT],
    generation: u64,
}

impl RenderItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut item: RenderItem, layer: RenderLayer) -> u32 {
        let index = self.items.len();
        item.object_index = index as u32;
        item.layer = layer;
        self.items.push(item);
        self.layers[layer.index()].push(index);
        index as u32
    }

    pub fn remove(&mut self, object_index: u32) -> Option<RenderItem> {
        let index = object_index as usize;
        if index >= self.items.len() {
            return None;
        }

        let removed = self.items.remove(index);
        for layer in &mut self.layers {
            layer.clear();
        }
        for (position, item) in self.items.iter_mut().enumerate() {
            item.object_index = position as u32;
            self.layers[item.layer.index()].push(position);
        }
        self.generation += 1;

        Some(removed)
    }

    pub fn layer(&self, layer: RenderLayer) -> impl Iterator<Item = &RenderItem> {
        self.layers[layer.index()].iter().map(|&i| &self.items[i])
    }

    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Handle;
    use crate::scene::geometry::GeometryRegistry;
    use crate::renderer::primitives::box_mesh;

    fn item(registry: &mut GeometryRegistry) -> RenderItem {
        let handle = match registry.get("Box") {
            Some(handle) => handle,
            None => registry.register("Box", &box_mesh(1.0, 1.0, 1.0, 0)),
        };
        RenderItem::new(handle, registry.geometry(handle), Handle::new(0))
    }

    fn assert_dense(catalog: &RenderItemCatalog) {
        let mut indices: Vec<u32> = catalog.items().iter().map(|i| i.object_index()).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..catalog.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn indices_are_dense_across_layers() {
        let mut registry = GeometryRegistry::new();
        let mut catalog = RenderItemCatalog::new();
        for layer in [
            RenderLayer::Skybox,
            RenderLayer::Opaque,
            RenderLayer::Debug,
            RenderLayer::AlphaTested,
            RenderLayer::Opaque,
        ] {
            catalog.add(item(&mut registry), layer);
        }

        assert_dense(&catalog);
        assert_eq!(catalog.layer(RenderLayer::Opaque).count(), 2);
        assert_eq!(catalog.layer(RenderLayer::Transparent).count(), 0);
    }

    #[test]
    fn removal_renumbers_and_invalidates() {
        let mut registry = GeometryRegistry::new();
        let mut catalog = RenderItemCatalog::new();
        catalog.add(item(&mut registry), RenderLayer::Opaque);
        catalog.add(item(&mut registry), RenderLayer::Debug);
        catalog.add(item(&mut registry), RenderLayer::Opaque);

        let removed = catalog.remove(0).unwrap();
        assert_eq!(removed.layer(), RenderLayer::Opaque);
        assert_eq!(catalog.generation(), 1);
        assert_dense(&catalog);

        let opaque: Vec<u32> = catalog
            .layer(RenderLayer::Opaque)
            .map(|i| i.object_index())
            .collect();
        assert_eq!(opaque, vec![1]);
        assert!(catalog.remove(5).is_none());
    }

    #[test]
    fn re_added_item_takes_the_next_free_index() {
        let mut registry = GeometryRegistry::new();
        let mut catalog = RenderItemCatalog::new();
        for _ in 0..3 {
            catalog.add(item(&mut registry), RenderLayer::Opaque);
        }

        let removed = catalog.remove(1).unwrap();
        assert_eq!(removed.object_index(), 1);
        assert_eq!(catalog.add(removed, RenderLayer::Transparent), 2);
        assert_dense(&catalog);
        assert_eq!(catalog.items()[2].layer(), RenderLayer::Transparent);
    }

    #[test]
    fn draw_order_differs_from_declaration_order() {
        assert_eq!(RenderLayer::DRAW_ORDER[2], RenderLayer::AlphaTested);
        assert_eq!(RenderLayer::DRAW_ORDER[3], RenderLayer::Transparent);
        assert_eq!(RenderLayer::DRAW_ORDER[5], RenderLayer::Skybox);
    }
}
