use glam::Mat4;

use crate::renderer::constant_buffer::ConstantBuffer;
use crate::renderer::constants::{
    MaterialConstants, ObjectConstants, PassConstants, PassEnvironment, PassView,
    SkinnedConstants,
};
use crate::scene::animation::SkinnedModelInstance;
use crate::scene::{Camera, LightSpace, MaterialTable, RenderItemCatalog};

/// Record of the pass buffer holding the camera viewpoint.
pub const CAMERA_PASS: u32 = 0;
/// Record of the pass buffer holding the light viewpoint.
pub const SHADOW_PASS: u32 = 1;
pub const PASS_COUNT: usize = 2;

/// CPU mirrors of every per-frame constant buffer. Written in `update`, then
/// handed to the device as a whole before the frame is submitted.
#[derive(Clone)]
pub struct FrameConstants {
    pub objects: ConstantBuffer<ObjectConstants>,
    pub materials: ConstantBuffer<MaterialConstants>,
    pub passes: ConstantBuffer<PassConstants>,
    pub skinned: ConstantBuffer<SkinnedConstants>,
    object_generation: u64,
}

impl FrameConstants {
    pub fn new() -> Self {
        Self {
            objects: ConstantBuffer::new("ObjectConstants", 0),
            materials: ConstantBuffer::new("MaterialConstants", 0),
            passes: ConstantBuffer::new("PassConstants", PASS_COUNT),
            skinned: ConstantBuffer::new("SkinnedConstants", 0),
            object_generation: 0,
        }
    }

    /// Rebuilds the whole buffer when items were added or removed.
    pub fn upload_object_constants(&mut self, catalog: &RenderItemCatalog) {
        if self.objects.len() != catalog.len() || self.object_generation != catalog.generation() {
            self.objects.reallocate(catalog.len());
            self.object_generation = catalog.generation();
        }

        for item in catalog.items() {
            let record = ObjectConstants::new(item.world, item.tex_transform);
            self.objects.write(item.object_index() as usize, &record);
        }
    }

    pub fn upload_material_constants(&mut self, materials: &MaterialTable) {
        if self.materials.len() != materials.len() {
            self.materials.reallocate(materials.len());
        }

        for material in materials.iter() {
            let record = MaterialConstants::new(
                material.diffuse_albedo,
                material.fresnel_r0,
                material.roughness,
                material.diffuse_slot,
                material.normal_slot,
            );
            self.materials.write(material.cb_index as usize, &record);
        }
    }

    /// Camera viewpoint; carries the light's shadow transform for sampling.
    pub fn upload_pass_constants(
        &mut self,
        camera: &Camera,
        light: &LightSpace,
        environment: &PassEnvironment,
    ) {
        let view = PassView {
            view: camera.view(),
            proj: camera.proj(),
            eye_position: camera.position(),
            shadow_transform: light.shadow_transform,
        };
        self.passes
            .write(CAMERA_PASS as usize, &PassConstants::new(&view, environment));
    }

    pub fn upload_shadow_pass_constants(
        &mut self,
        light: &LightSpace,
        environment: &PassEnvironment,
    ) {
        let view = PassView {
            view: light.view,
            proj: light.proj,
            eye_position: light.position,
            shadow_transform: Mat4::IDENTITY,
        };
        self.passes
            .write(SHADOW_PASS as usize, &PassConstants::new(&view, environment));
    }

    /// One palette record per skinned instance, in instance order.
    pub fn upload_skinned_constants(&mut self, instances: &[SkinnedModelInstance]) {
        if self.skinned.len() != instances.len() {
            self.skinned.reallocate(instances.len());
        }

        for (index, instance) in instances.iter().enumerate() {
            let record = SkinnedConstants::from_palette(&instance.final_transforms);
            self.skinned.write(index, &record);
        }
    }

    pub fn object(&self, object_index: u32) -> ObjectConstants {
        self.objects.read(object_index as usize)
    }

    pub fn material(&self, cb_index: u32) -> MaterialConstants {
        self.materials.read(cb_index as usize)
    }

    pub fn pass(&self, record: u32) -> PassConstants {
        self.passes.read(record as usize)
    }
}

impl Default for FrameConstants {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Handle;
    use crate::renderer::primitives::box_mesh;
    use crate::scene::{
        GeometryRegistry, MaterialParams, MaterialTextures, RenderItem, RenderLayer, SceneBounds,
    };
    use glam::Vec3;

    fn catalog_with(count: usize) -> RenderItemCatalog {
        let mut registry = GeometryRegistry::new();
        let handle = registry.register("Box", &box_mesh(1.0, 1.0, 1.0, 0));
        let mut catalog = RenderItemCatalog::new();
        for i in 0..count {
            let item = RenderItem::new(handle, registry.geometry(handle), Handle::new(0))
                .with_world(Mat4::from_translation(Vec3::new(i as f32 + 1.0, 0.0, 0.0)));
            catalog.add(item, RenderLayer::Opaque);
        }
        catalog
    }

    #[test]
    fn object_records_are_transposed_worlds() {
        let catalog = catalog_with(3);
        let mut constants = FrameConstants::new();
        constants.upload_object_constants(&catalog);

        for item in catalog.items() {
            let stored = Mat4::from_cols_array_2d(&constants.object(item.object_index()).world);
            assert_eq!(stored, item.world.transpose());
        }
    }

    #[test]
    fn removal_reallocates_object_buffer() {
        let mut catalog = catalog_with(3);
        let mut constants = FrameConstants::new();
        constants.upload_object_constants(&catalog);
        assert_eq!(constants.objects.len(), 3);

        catalog.remove(1);
        constants.upload_object_constants(&catalog);
        assert_eq!(constants.objects.len(), 2);
        let last = Mat4::from_cols_array_2d(&constants.object(1).world).transpose();
        assert_eq!(last.w_axis.x, 3.0);
    }

    #[test]
    fn material_flags_track_texture_slots() {
        let mut materials = MaterialTable::new();
        materials.register(
            "Bricks",
            MaterialTextures {
                diffuse: Some(0),
                normal: Some(1),
            },
            MaterialParams::default(),
        );
        materials.register("Green", MaterialTextures::default(), MaterialParams::default());

        let mut constants = FrameConstants::new();
        constants.upload_material_constants(&materials);

        let bricks = constants.material(0);
        let green = constants.material(1);
        assert_eq!((bricks.texture_on, bricks.normal_on), (1, 1));
        assert_eq!((green.texture_on, green.normal_on), (0, 0));
    }

    #[test]
    fn passes_occupy_adjacent_records() {
        let light = LightSpace::new(Vec3::new(0.57735, -0.57735, 0.57735), SceneBounds::default());
        let camera = Camera::default();
        let environment = PassEnvironment::default();

        let mut constants = FrameConstants::new();
        constants.upload_pass_constants(&camera, &light, &environment);
        constants.upload_shadow_pass_constants(&light, &environment);

        assert_eq!(constants.passes.offset(SHADOW_PASS as usize), 1536);
        let camera_pass = constants.pass(CAMERA_PASS);
        let shadow_pass = constants.pass(SHADOW_PASS);
        assert_eq!(
            Mat4::from_cols_array_2d(&camera_pass.shadow_transform),
            light.shadow_transform.transpose()
        );
        assert_eq!(shadow_pass.eye_pos_w, light.position.to_array());
        assert_eq!(
            Mat4::from_cols_array_2d(&shadow_pass.view),
            light.view.transpose()
        );
    }

    #[test]
    fn oversized_skeleton_keeps_the_first_bones() {
        use crate::renderer::constants::MAX_BONES;
        use crate::scene::animation::{SkinnedData, SkinnedModelInstance};
        use std::collections::HashMap;
        use std::sync::Arc;

        let bones = MAX_BONES + 4;
        let skeleton = SkinnedData::new(
            vec![None; bones],
            vec![Mat4::IDENTITY; bones],
            HashMap::new(),
        );
        let mut instance = SkinnedModelInstance::new(Arc::new(skeleton), "Idle");
        instance.final_transforms = (0..bones)
            .map(|bone| Mat4::from_translation(Vec3::new(bone as f32, 0.0, 0.0)))
            .collect();

        let mut constants = FrameConstants::new();
        constants.upload_skinned_constants(&[instance]);

        let record = constants.skinned.read(0);
        let last = Mat4::from_cols_array_2d(&record.bone_transforms[MAX_BONES - 1]).transpose();
        assert_eq!(last.w_axis.x, (MAX_BONES - 1) as f32);
    }
}
