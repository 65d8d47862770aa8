/// Bind slots shared by the draw recorder and the shaders. The numbering is
/// part of the shader interface and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RootSlot {
    ObjectCb = 0,
    MaterialCb = 1,
    PassCb = 2,
    SkyboxTable = 3,
    DiffuseTable = 4,
    NormalTable = 5,
    ShadowMapTable = 6,
    SkinnedCb = 7,
}

/// Where a slot lives in the wgpu pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindLocation {
    pub group: u32,
    pub binding: u32,
}

pub const UNIFORM_GROUP: u32 = 0;
pub const PASS_TEXTURE_GROUP: u32 = 1;
pub const MATERIAL_TEXTURE_GROUP: u32 = 2;

/// Samplers live next to the pass textures.
pub const WRAP_SAMPLER_BINDING: u32 = 2;
pub const SHADOW_SAMPLER_BINDING: u32 = 3;

impl RootSlot {
    pub const ALL: [RootSlot; 8] = [
        RootSlot::ObjectCb,
        RootSlot::MaterialCb,
        RootSlot::PassCb,
        RootSlot::SkyboxTable,
        RootSlot::DiffuseTable,
        RootSlot::NormalTable,
        RootSlot::ShadowMapTable,
        RootSlot::SkinnedCb,
    ];

    pub const fn index(self) -> u32 {
        self as u32
    }

    pub const fn is_constant_buffer(self) -> bool {
        matches!(
            self,
            RootSlot::ObjectCb | RootSlot::MaterialCb | RootSlot::PassCb | RootSlot::SkinnedCb
        )
    }

    pub const fn location(self) -> BindLocation {
        let (group, binding) = match self {
            RootSlot::ObjectCb => (UNIFORM_GROUP, 0),
            RootSlot::MaterialCb => (UNIFORM_GROUP, 1),
            RootSlot::PassCb => (UNIFORM_GROUP, 2),
            RootSlot::SkinnedCb => (UNIFORM_GROUP, 3),
            RootSlot::SkyboxTable => (PASS_TEXTURE_GROUP, 0),
            RootSlot::ShadowMapTable => (PASS_TEXTURE_GROUP, 1),
            RootSlot::DiffuseTable => (MATERIAL_TEXTURE_GROUP, 0),
            RootSlot::NormalTable => (MATERIAL_TEXTURE_GROUP, 1),
        };
        BindLocation { group, binding }
    }

    /// Dynamic offsets of the uniform group are passed in binding order.
    pub const fn dynamic_offset_index(self) -> Option<usize> {
        match self.location() {
            BindLocation {
                group: UNIFORM_GROUP,
                binding,
            } => Some(binding as usize),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_numbers_are_fixed() {
        let indices: Vec<u32> = RootSlot::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn locations_are_unique() {
        for (i, a) in RootSlot::ALL.iter().enumerate() {
            for b in &RootSlot::ALL[i + 1..] {
                assert_ne!(a.location(), b.location(), "{:?} / {:?}", a, b);
            }
        }
    }

    #[test]
    fn only_constant_buffers_take_dynamic_offsets() {
        for slot in RootSlot::ALL {
            assert_eq!(slot.dynamic_offset_index().is_some(), slot.is_constant_buffer());
        }
        assert_eq!(RootSlot::SkinnedCb.dynamic_offset_index(), Some(3));
    }
}
