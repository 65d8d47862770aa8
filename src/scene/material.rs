use std::path::{Path, PathBuf};

use glam::{Vec3, Vec4};

use crate::asset::{AssetCache, Handle};

/// Sentinel used by raw descriptor slot indices for "nothing bound".
pub const NO_TEXTURE: i32 = -1;

/// Conversions between `Option<u32>` heap slots and the raw `-1` sentinel.
pub struct TextureSlot;

impl TextureSlot {
    pub fn from_raw(raw: i32) -> Option<u32> {
        u32::try_from(raw).ok()
    }

    pub fn to_raw(slot: Option<u32>) -> i32 {
        slot.map(|s| s as i32).unwrap_or(NO_TEXTURE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Color,
    NormalMap,
    Cube,
}

/// A texture registered for loading. `heap_index` is its descriptor slot.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    pub name: String,
    pub path: PathBuf,
    pub heap_index: u32,
    pub kind: TextureKind,
}

/// Named textures with sequential, stable heap slots.
#[derive(Default)]
pub struct TextureTable {
    textures: AssetCache<TextureInfo>,
}

impl TextureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, path: impl AsRef<Path>, kind: TextureKind) -> u32 {
        if let Some(existing) = self.textures.find(name) {
            return self.textures.values()[existing.index()].heap_index;
        }

        let heap_index = self.textures.len() as u32;
        self.textures.insert(
            name,
            TextureInfo {
                name: name.to_string(),
                path: path.as_ref().to_path_buf(),
                heap_index,
                kind,
            },
        );
        heap_index
    }

    pub fn register_texture(&mut self, name: &str, path: impl AsRef<Path>) -> u32 {
        self.register(name, path, TextureKind::Color)
    }

    pub fn register_normal_map(&mut self, name: &str, path: impl AsRef<Path>) -> u32 {
        self.register(name, path, TextureKind::NormalMap)
    }

    pub fn register_cube_texture(&mut self, name: &str, path: impl AsRef<Path>) -> u32 {
        self.register(name, path, TextureKind::Cube)
    }

    pub fn slot(&self, name: &str) -> Option<u32> {
        self.textures
            .find(name)
            .map(|handle| self.textures.values()[handle.index()].heap_index)
    }

    pub fn get(&self, heap_index: u32) -> Option<&TextureInfo> {
        self.textures.values().get(heap_index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextureInfo> {
        self.textures.values().iter()
    }

    /// First descriptor slot after the textures; the shadow map lives here.
    pub fn shadow_map_heap_index(&self) -> u32 {
        self.textures.len() as u32
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// Texture references of a material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterialTextures {
    pub diffuse: Option<u32>,
    pub normal: Option<u32>,
}

/// Shading coefficients of a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    pub diffuse_albedo: Vec4,
    pub fresnel_r0: Vec3,
    pub roughness: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            diffuse_albedo: Vec4::ONE,
            fresnel_r0: Vec3::splat(0.01),
            roughness: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub cb_index: u32,
    pub diffuse_slot: Option<u32>,
    pub normal_slot: Option<u32>,
    pub diffuse_albedo: Vec4,
    pub fresnel_r0: Vec3,
    pub roughness: f32,
}

impl Material {
    pub fn has_diffuse_texture(&self) -> bool {
        self.diffuse_slot.is_some()
    }

    pub fn has_normal_map(&self) -> bool {
        self.normal_slot.is_some()
    }
}

pub type MaterialHandle = Handle<Material>;

/// Named materials with dense constant-buffer indices `0..len`.
#[derive(Default)]
pub struct MaterialTable {
    materials: AssetCache<Material>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle of the material; its `cb_index` equals
    /// `handle.index()`. Re-registering a name returns the existing material.
    pub fn register(
        &mut self,
        name: &str,
        textures: MaterialTextures,
        params: MaterialParams,
    ) -> MaterialHandle {
        if let Some(existing) = self.materials.find(name) {
            return existing;
        }

        let cb_index = self.materials.len() as u32;
        self.materials.insert(
            name,
            Material {
                name: name.to_string(),
                cb_index,
                diffuse_slot: textures.diffuse,
                normal_slot: textures.normal,
                diffuse_albedo: params.diffuse_albedo,
                fresnel_r0: params.fresnel_r0,
                roughness: params.roughness,
            },
        )
    }

    pub fn get(&self, name: &str) -> Option<MaterialHandle> {
        self.materials.find(name)
    }

    pub fn material(&self, handle: MaterialHandle) -> &Material {
        self.materials
            .get(handle)
            .unwrap_or_else(|| panic!("unknown material handle {:?}", handle))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.values().iter()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_slots_are_sequential_and_deduplicated() {
        let mut table = TextureTable::new();
        assert_eq!(table.register_texture("bricks", "bricks.png"), 0);
        assert_eq!(table.register_normal_map("bricksNormal", "bricks_nmap.png"), 1);
        assert_eq!(table.register_texture("bricks", "other.png"), 0);
        assert_eq!(table.register_cube_texture("sky", "sky"), 2);

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0).unwrap().path, PathBuf::from("bricks.png"));
        assert_eq!(table.shadow_map_heap_index(), 3);
    }

    #[test]
    fn material_cb_indices_are_dense() {
        let mut table = MaterialTable::new();
        for name in ["Green", "Blue", "Gray", "Skull"] {
            table.register(name, MaterialTextures::default(), MaterialParams::default());
        }
        table.register("Blue", MaterialTextures::default(), MaterialParams::default());

        let mut indices: Vec<u32> = table.iter().map(|m| m.cb_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..4).collect::<Vec<_>>());
    }

    #[test]
    fn raw_sentinel_round_trips_through_option() {
        assert_eq!(TextureSlot::from_raw(NO_TEXTURE), None);
        assert_eq!(TextureSlot::from_raw(4), Some(4));
        assert_eq!(TextureSlot::to_raw(None), -1);
        assert_eq!(TextureSlot::to_raw(Some(7)), 7);
    }
}
