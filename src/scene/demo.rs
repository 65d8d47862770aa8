//! The shadow and skinning showcase: a tiled floor, a wire-fence crate, a
//! skull, two rows of brick columns topped with mirror balls and an animated
//! soldier, under one rotating sun and ten point lights.

use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};

use super::geometry::SubmeshRange;
use super::lights::demo_lighting;
use super::material::{MaterialParams, MaterialTextures};
use super::render_item::{RenderItem, RenderLayer};
use super::scene::Scene;
use crate::asset::skinned_model::{load_skinned_model, model_texture_path, SkinnedModelData};
use crate::asset::text_mesh::load_text_mesh;
use crate::asset::MeshData;
use crate::renderer::primitives::{box_mesh, cylinder_mesh, grid_mesh, quad_mesh, sphere_mesh};
use crate::settings::AssetSettings;

const FOREST_GREEN: Vec4 = Vec4::new(0.133_333, 0.545_098, 0.133_333, 1.0);
const LIGHT_STEEL_BLUE: Vec4 = Vec4::new(0.690_196, 0.768_627, 0.870_588, 1.0);
const LIGHT_GRAY: Vec4 = Vec4::new(0.827_451, 0.827_451, 0.827_451, 1.0);

/// Skinned model placement: scaled down, turned to face the camera and
/// pushed back behind the crate.
pub fn skinned_model_world() -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0))
        * Mat4::from_rotation_y(PI)
        * Mat4::from_scale(Vec3::splat(0.05))
}

pub fn submesh_name(subset: usize) -> String {
    format!("sm_{}", subset)
}

/// Builds the demo. Missing model files are logged and skipped.
pub fn build_demo_scene(assets: &AssetSettings) -> Scene {
    let mut scene = Scene::new();
    scene.lighting = demo_lighting();

    let skinned_model = match load_skinned_model(&assets.skinned_model) {
        Ok(model) => Some(model),
        Err(err) => {
            log::warn!("Skinned model skipped: {}", err);
            None
        }
    };

    build_geometry(&mut scene, &assets.skull_mesh, skinned_model.as_ref());
    build_textures(&mut scene, assets, skinned_model.as_ref());
    build_materials(&mut scene, skinned_model.as_ref());
    build_render_items(&mut scene);

    if let Some(model) = skinned_model {
        add_skinned_items(&mut scene, model, &assets.clip_name);
    }

    log::info!(
        "Demo scene: {} geometries, {} textures, {} materials, {} render items",
        scene.geometry.len(),
        scene.textures.len(),
        scene.materials.len(),
        scene.items.len()
    );
    scene
}

fn build_geometry(scene: &mut Scene, skull_path: &Path, skinned: Option<&SkinnedModelData>) {
    let registry = &mut scene.geometry;
    registry.register("Box", &box_mesh(1.5, 0.5, 1.5, 3));
    registry.register("Grid", &grid_mesh(20.0, 30.0, 60, 40));
    registry.register("Sphere", &sphere_mesh(0.5, 20, 20));
    registry.register("Cylinder", &cylinder_mesh(0.5, 0.3, 3.0, 20, 20));
    registry.register("Quad", &quad_mesh(0.0, 0.0, 1.0, 1.0, 0.0));

    match load_text_mesh(skull_path) {
        Ok(mesh) => {
            registry.register("Skull", &mesh);
        }
        Err(err) if err.is_missing_file() => {
            log::warn!("{:?} not found, the skull is left out", skull_path);
        }
        Err(err) => log::warn!("Skull skipped: {}", err),
    }

    if let Some(model) = skinned {
        let ranges: Vec<SubmeshRange> = model
            .subsets
            .iter()
            .enumerate()
            .map(|(i, subset)| SubmeshRange {
                name: submesh_name(i),
                start_index: subset.face_start * 3,
                index_count: subset.face_count * 3,
                base_vertex: subset.vertex_start as i32,
            })
            .collect();
        let mesh = MeshData {
            vertices: model.vertices.clone(),
            indices: model.indices.clone(),
        };
        registry.register_shared("SkinnedModel", &mesh, &ranges);
    }
}

fn build_textures(scene: &mut Scene, assets: &AssetSettings, skinned: Option<&SkinnedModelData>) {
    let dir = &assets.texture_dir;
    let textures = &mut scene.textures;
    textures.register_texture("bricks", dir.join("bricks.png"));
    textures.register_normal_map("bricksNormal", dir.join("bricks_nmap.png"));
    textures.register_texture("stone", dir.join("stone.png"));
    textures.register_texture("tile", dir.join("tile.png"));
    textures.register_normal_map("tileNormal", dir.join("tile_nmap.png"));
    textures.register_texture("wirefence", dir.join("WireFence.png"));
    scene.skybox = Some(textures.register_cube_texture("skybox", dir.join("grasscube1024.png")));

    let Some(model) = skinned else {
        return;
    };
    for material in &model.materials {
        if let Some(file) = &material.diffuse_map {
            textures.register_texture(file, model_texture_path(&assets.skinned_model, file));
        }
        if let Some(file) = &material.normal_map {
            textures.register_normal_map(file, model_texture_path(&assets.skinned_model, file));
        }
    }
}

fn params(diffuse_albedo: Vec4, fresnel: f32, roughness: f32) -> MaterialParams {
    MaterialParams {
        diffuse_albedo,
        fresnel_r0: Vec3::splat(fresnel),
        roughness,
    }
}

fn build_materials(scene: &mut Scene, skinned: Option<&SkinnedModelData>) {
    let slot = |name: &str| scene.textures.slot(name);
    let untextured = MaterialTextures::default();

    let bricks = MaterialTextures {
        diffuse: slot("bricks"),
        normal: slot("bricksNormal"),
    };
    let stone = MaterialTextures {
        diffuse: slot("stone"),
        normal: None,
    };
    let tile = MaterialTextures {
        diffuse: slot("tile"),
        normal: slot("tileNormal"),
    };
    let fence = MaterialTextures {
        diffuse: slot("wirefence"),
        normal: None,
    };

    let materials = &mut scene.materials;
    materials.register("Green", untextured, params(FOREST_GREEN, 0.02, 0.1));
    materials.register("Blue", untextured, params(LIGHT_STEEL_BLUE, 0.05, 0.3));
    materials.register("Gray", untextured, params(LIGHT_GRAY, 0.02, 0.2));
    materials.register("Skull", untextured, params(Vec4::ONE, 0.05, 0.3));
    materials.register("Bricks", bricks, params(Vec4::ONE, 0.02, 0.1));
    materials.register("Stone", stone, params(Vec4::ONE, 0.05, 0.3));
    materials.register("Tile", tile, params(Vec4::ONE, 0.02, 0.2));
    materials.register("WireFence", fence, params(Vec4::ONE, 0.1, 0.25));
    // The cube is sampled through the skybox slot, not the diffuse table.
    materials.register("Skybox", untextured, params(Vec4::ONE, 0.1, 1.0));
    materials.register(
        "Mirror",
        untextured,
        MaterialParams {
            diffuse_albedo: Vec4::new(0.0, 0.0, 0.0, 1.0),
            fresnel_r0: Vec3::new(0.98, 0.97, 0.95),
            roughness: 0.1,
        },
    );

    let Some(model) = skinned else {
        return;
    };
    for material in &model.materials {
        let textures = MaterialTextures {
            diffuse: material.diffuse_map.as_deref().and_then(|f| scene.textures.slot(f)),
            normal: material.normal_map.as_deref().and_then(|f| scene.textures.slot(f)),
        };
        scene.materials.register(
            &material.name,
            textures,
            MaterialParams {
                diffuse_albedo: material.diffuse_albedo,
                fresnel_r0: material.fresnel_r0,
                roughness: material.roughness,
            },
        );
    }
}

fn build_render_items(scene: &mut Scene) {
    let Scene {
        geometry,
        materials,
        items,
        ..
    } = scene;

    let mut add = |geometry_name: &str, material_name: &str, world: Mat4, tex: Mat4, layer| {
        let (Some(handle), Some(material)) =
            (geometry.get(geometry_name), materials.get(material_name))
        else {
            log::warn!(
                "Render item '{}' with '{}' skipped, geometry or material missing",
                geometry_name,
                material_name
            );
            return;
        };
        let item = RenderItem::new(handle, geometry.geometry(handle), material)
            .with_world(world)
            .with_tex_transform(tex);
        items.add(item, layer);
    };

    add(
        "Box",
        "Skybox",
        Mat4::IDENTITY,
        Mat4::from_scale(Vec3::splat(5000.0)),
        RenderLayer::Skybox,
    );
    add(
        "Grid",
        "Tile",
        Mat4::IDENTITY,
        Mat4::from_scale(Vec3::splat(8.0)),
        RenderLayer::Opaque,
    );
    add("Quad", "Tile", Mat4::IDENTITY, Mat4::IDENTITY, RenderLayer::Debug);
    add(
        "Box",
        "WireFence",
        Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)) * Mat4::from_scale(Vec3::splat(2.0)),
        Mat4::IDENTITY,
        RenderLayer::AlphaTested,
    );
    add(
        "Skull",
        "Skull",
        Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)) * Mat4::from_scale(Vec3::splat(0.5)),
        Mat4::IDENTITY,
        RenderLayer::Opaque,
    );

    for i in 0..5 {
        let z = -10.0 + i as f32 * 5.0;
        for x in [-5.0, 5.0] {
            add(
                "Cylinder",
                "Bricks",
                Mat4::from_translation(Vec3::new(x, 1.5, z)),
                Mat4::IDENTITY,
                RenderLayer::Opaque,
            );
        }
        for x in [-5.0, 5.0] {
            add(
                "Sphere",
                "Mirror",
                Mat4::from_translation(Vec3::new(x, 3.5, z)),
                Mat4::IDENTITY,
                RenderLayer::Opaque,
            );
        }
    }
}

fn add_skinned_items(scene: &mut Scene, model: SkinnedModelData, clip_name: &str) {
    let skeleton = Arc::new(model.skeleton);
    let instance = scene.skinned_instances.len();
    let cb_index = scene.add_skinned_instance(skeleton, clip_name);

    for (i, material) in model.materials.iter().enumerate() {
        let (Some(handle), Some(material)) = (
            scene.geometry.get(&submesh_name(i)),
            scene.materials.get(&material.name),
        ) else {
            continue;
        };
        let item = RenderItem::new(handle, scene.geometry.geometry(handle), material)
            .with_world(skinned_model_world())
            .with_skinning(cb_index, instance);
        scene.items.add(item, RenderLayer::SkinnedOpaque);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::constants::LightKind;

    fn missing_assets() -> AssetSettings {
        AssetSettings {
            texture_dir: "does/not/exist".into(),
            skull_mesh: "does/not/exist/skull.txt".into(),
            skinned_model: "does/not/exist/soldier.gltf".into(),
            clip_name: "Take1".to_string(),
        }
    }

    #[test]
    fn missing_models_leave_the_rest_of_the_scene() {
        let scene = build_demo_scene(&missing_assets());

        assert!(scene.geometry.get("Skull").is_none());
        assert!(scene.skinned_instances.is_empty());
        assert!(!scene.has_skinned_items());
        // sky, grid, quad, crate, 10 cylinders, 10 spheres
        assert_eq!(scene.items.len(), 24);
        assert_eq!(scene.items.layer(RenderLayer::Opaque).count(), 21);
        assert_eq!(scene.materials.len(), 10);
        assert_eq!(scene.textures.len(), 7);
        assert_eq!(scene.skybox, scene.textures.slot("skybox"));
    }

    #[test]
    fn material_slots_follow_registration_order() {
        let scene = build_demo_scene(&missing_assets());
        let bricks = scene.materials.material(scene.materials.get("Bricks").unwrap());
        assert_eq!(bricks.cb_index, 4);
        assert_eq!(bricks.diffuse_slot, Some(0));
        assert_eq!(bricks.normal_slot, Some(1));

        let sky = scene.materials.material(scene.materials.get("Skybox").unwrap());
        assert_eq!(sky.diffuse_slot, None);
    }

    #[test]
    fn lighting_has_a_sun_first() {
        let scene = build_demo_scene(&missing_assets());
        let lights = scene.lighting.lights();
        assert_eq!(lights.len(), 11);
        assert_eq!(lights[0].kind, LightKind::Directional);
    }

    #[test]
    fn skinned_world_scales_then_turns_then_offsets() {
        let p = skinned_model_world().transform_point3(Vec3::new(20.0, 0.0, 0.0));
        assert!(p.abs_diff_eq(Vec3::new(-1.0, 0.0, -5.0), 1e-5));
    }
}
