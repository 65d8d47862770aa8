use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

pub const MAX_LIGHTS: usize = 16;
pub const MAX_BONES: usize = 96;

/// GPU layouts expect row-major matrices multiplied as `v * M`.
fn gpu_matrix(m: Mat4) -> [[f32; 4]; 4] {
    m.transpose().to_cols_array_2d()
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct ObjectConstants {
    pub world: [[f32; 4]; 4],
    pub tex_transform: [[f32; 4]; 4],
}

impl ObjectConstants {
    pub fn new(world: Mat4, tex_transform: Mat4) -> Self {
        Self {
            world: gpu_matrix(world),
            tex_transform: gpu_matrix(tex_transform),
        }
    }
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct MaterialConstants {
    pub diffuse_albedo: [f32; 4],
    pub fresnel_r0: [f32; 3],
    pub roughness: f32,
    pub texture_on: u32,
    pub normal_on: u32,
    pub _padding: [u32; 2],
}

impl MaterialConstants {
    pub fn new(
        diffuse_albedo: Vec4,
        fresnel_r0: Vec3,
        roughness: f32,
        diffuse_slot: Option<u32>,
        normal_slot: Option<u32>,
    ) -> Self {
        Self {
            diffuse_albedo: diffuse_albedo.to_array(),
            fresnel_r0: fresnel_r0.to_array(),
            roughness,
            texture_on: diffuse_slot.is_some() as u32,
            normal_on: normal_slot.is_some() as u32,
            _padding: [0; 2],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum LightKind {
    Directional = 0,
    Point = 1,
    Spot = 2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub strength: Vec3,
    pub falloff_start: f32,
    pub direction: Vec3,
    pub falloff_end: f32,
    pub position: Vec3,
    pub spot_power: f32,
}

impl Light {
    pub fn directional(direction: Vec3, strength: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            direction,
            strength,
            ..Self::default()
        }
    }

    pub fn point(position: Vec3, strength: Vec3, falloff_start: f32, falloff_end: f32) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            strength,
            falloff_start,
            falloff_end,
            ..Self::default()
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Directional,
            strength: Vec3::splat(0.5),
            falloff_start: 1.0,
            direction: Vec3::NEG_Y,
            falloff_end: 10.0,
            position: Vec3::ZERO,
            spot_power: 64.0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct LightConstants {
    pub light_type: u32,
    pub _padding: [u32; 3],
    pub strength: [f32; 3],
    pub falloff_start: f32,
    pub direction: [f32; 3],
    pub falloff_end: f32,
    pub position: [f32; 3],
    pub spot_power: f32,
}

impl LightConstants {
    pub fn from_light(light: &Light) -> Self {
        Self {
            light_type: light.kind as u32,
            _padding: [0; 3],
            strength: light.strength.to_array(),
            falloff_start: light.falloff_start,
            direction: light.direction.to_array(),
            falloff_end: light.falloff_end,
            position: light.position.to_array(),
            spot_power: light.spot_power,
        }
    }
}

/// Frame-global data for one viewpoint. Matrix fields are stored transposed.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct PassConstants {
    pub view: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub inv_proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub shadow_transform: [[f32; 4]; 4],
    pub ambient_light: [f32; 4],
    pub eye_pos_w: [f32; 3],
    pub light_count: u32,
    pub lights: [LightConstants; MAX_LIGHTS],
    pub fog_color: [f32; 4],
    pub fog_start: f32,
    pub fog_range: f32,
    pub _padding: [f32; 2],
}

/// Inputs for one pass record besides the lighting environment.
#[derive(Clone, Copy, Debug)]
pub struct PassView {
    pub view: Mat4,
    pub proj: Mat4,
    pub eye_position: Vec3,
    pub shadow_transform: Mat4,
}

/// Ambient, fog and light list shared by both pass records.
#[derive(Clone, Debug)]
pub struct PassEnvironment {
    pub ambient_light: Vec4,
    pub fog_color: Vec4,
    pub fog_start: f32,
    pub fog_range: f32,
    pub lights: Vec<Light>,
}

impl Default for PassEnvironment {
    fn default() -> Self {
        Self {
            ambient_light: Vec4::new(0.0, 0.0, 0.0, 1.0),
            fog_color: Vec4::new(0.7, 0.7, 0.7, 1.0),
            fog_start: 5.0,
            fog_range: 150.0,
            lights: Vec::new(),
        }
    }
}

impl PassConstants {
    pub fn new(view: &PassView, environment: &PassEnvironment) -> Self {
        let view_proj = view.proj * view.view;
        let mut constants = Self {
            view: gpu_matrix(view.view),
            inv_view: gpu_matrix(view.view.inverse()),
            proj: gpu_matrix(view.proj),
            inv_proj: gpu_matrix(view.proj.inverse()),
            view_proj: gpu_matrix(view_proj),
            inv_view_proj: gpu_matrix(view_proj.inverse()),
            shadow_transform: gpu_matrix(view.shadow_transform),
            ambient_light: environment.ambient_light.to_array(),
            eye_pos_w: view.eye_position.to_array(),
            fog_color: environment.fog_color.to_array(),
            fog_start: environment.fog_start,
            fog_range: environment.fog_range,
            ..Self::zeroed()
        };

        if environment.lights.len() > MAX_LIGHTS {
            log::warn!(
                "{} lights requested, only the first {} are uploaded",
                environment.lights.len(),
                MAX_LIGHTS
            );
        }
        let count = environment.lights.len().min(MAX_LIGHTS);
        constants.light_count = count as u32;
        for (dst, src) in constants.lights.iter_mut().zip(&environment.lights) {
            *dst = LightConstants::from_light(src);
        }

        constants
    }
}

impl Default for PassConstants {
    fn default() -> Self {
        Self::new(
            &PassView {
                view: Mat4::IDENTITY,
                proj: Mat4::IDENTITY,
                eye_position: Vec3::ZERO,
                shadow_transform: Mat4::IDENTITY,
            },
            &PassEnvironment::default(),
        )
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SkinnedConstants {
    pub bone_transforms: [[[f32; 4]; 4]; MAX_BONES],
}

impl SkinnedConstants {
    /// Unused palette entries stay identity so stray bone indices are harmless.
    /// Bones past [`MAX_BONES`] are dropped.
    pub fn from_palette(palette: &[Mat4]) -> Self {
        let mut constants = Self {
            bone_transforms: [gpu_matrix(Mat4::IDENTITY); MAX_BONES],
        };
        for (dst, src) in constants.bone_transforms.iter_mut().zip(palette) {
            *dst = gpu_matrix(*src);
        }
        constants
    }
}

impl Default for SkinnedConstants {
    fn default() -> Self {
        Self::from_palette(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn record_sizes_match_shader_layouts() {
        assert_eq!(size_of::<ObjectConstants>(), 128);
        assert_eq!(size_of::<MaterialConstants>(), 48);
        assert_eq!(size_of::<LightConstants>(), 64);
        // 7 * mat4 + ambient + eye/count + 16 lights + fog block
        assert_eq!(size_of::<PassConstants>(), 1536);
        assert_eq!(size_of::<SkinnedConstants>(), 6144);
    }

    #[test]
    fn object_matrices_are_transposed() {
        let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let constants = ObjectConstants::new(world, Mat4::IDENTITY);
        let stored = Mat4::from_cols_array_2d(&constants.world);

        assert_eq!(stored, world.transpose());
        assert_eq!(constants.world[0][3], 1.0);
    }

    #[test]
    fn material_flags_follow_slots() {
        let with = MaterialConstants::new(Vec4::ONE, Vec3::ZERO, 0.5, Some(0), Some(3));
        let without = MaterialConstants::new(Vec4::ONE, Vec3::ZERO, 0.5, None, None);
        let mixed = MaterialConstants::new(Vec4::ONE, Vec3::ZERO, 0.5, Some(2), None);

        assert_eq!((with.texture_on, with.normal_on), (1, 1));
        assert_eq!((without.texture_on, without.normal_on), (0, 0));
        assert_eq!((mixed.texture_on, mixed.normal_on), (1, 0));
    }

    #[test]
    fn light_list_is_clamped() {
        let environment = PassEnvironment {
            lights: vec![Light::default(); MAX_LIGHTS + 3],
            ..PassEnvironment::default()
        };
        let constants = PassConstants::new(
            &PassView {
                view: Mat4::IDENTITY,
                proj: Mat4::IDENTITY,
                eye_position: Vec3::ZERO,
                shadow_transform: Mat4::IDENTITY,
            },
            &environment,
        );

        assert_eq!(constants.light_count, MAX_LIGHTS as u32);
    }

    #[test]
    fn unused_bones_are_identity() {
        let palette = [Mat4::from_scale(Vec3::splat(2.0))];
        let constants = SkinnedConstants::from_palette(&palette);

        assert_eq!(constants.bone_transforms[0][0][0], 2.0);
        assert_eq!(
            Mat4::from_cols_array_2d(&constants.bone_transforms[MAX_BONES - 1]),
            Mat4::IDENTITY
        );
    }
}
