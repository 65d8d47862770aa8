use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

/// One pose sample for a bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time_pos: f32,
    pub translation: Vec3,
    pub scale: Vec3,
    pub rotation: Quat,
}

impl Keyframe {
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Keyframe {
    fn default() -> Self {
        Self {
            time_pos: 0.0,
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Keyframes of one bone, sorted by time.
#[derive(Debug, Clone, Default)]
pub struct BoneAnimation {
    pub keyframes: Vec<Keyframe>,
}

impl BoneAnimation {
    pub fn new(keyframes: Vec<Keyframe>) -> Self {
        Self { keyframes }
    }

    pub fn end_time(&self) -> f32 {
        self.keyframes.last().map(|k| k.time_pos).unwrap_or(0.0)
    }

    fn bracket(&self, time: f32) -> Option<(usize, usize, f32)> {
        let count = self.keyframes.len();
        if count == 0 {
            return None;
        }

        if count == 1 || time <= self.keyframes[0].time_pos {
            return Some((0, 0, 0.0));
        }

        let last = count - 1;
        if time >= self.keyframes[last].time_pos {
            return Some((last, last, 0.0));
        }

        let upper = self.keyframes.partition_point(|k| k.time_pos <= time);
        let lower = upper - 1;
        let start = self.keyframes[lower].time_pos;
        let span = self.keyframes[upper].time_pos - start;
        let factor = if span.abs() < f32::EPSILON {
            0.0
        } else {
            ((time - start) / span).clamp(0.0, 1.0)
        };

        Some((lower, upper, factor))
    }

    /// Bone-local transform at `time`. Clamps to the first/last keyframe outside
    /// the animated range.
    pub fn interpolate(&self, time: f32) -> Mat4 {
        let Some((lower, upper, factor)) = self.bracket(time) else {
            return Mat4::IDENTITY;
        };

        let a = &self.keyframes[lower];
        if lower == upper {
            return a.to_matrix();
        }

        let b = &self.keyframes[upper];
        let translation = a.translation.lerp(b.translation, factor);
        let scale = a.scale.lerp(b.scale, factor);
        let rotation = a
            .rotation
            .normalize()
            .slerp(b.rotation.normalize(), factor)
            .normalize();

        Mat4::from_scale_rotation_translation(scale, rotation, translation)
    }
}

/// A named clip: one track per bone, indexed like the skeleton.
#[derive(Debug, Clone, Default)]
pub struct AnimationClip {
    pub bone_animations: Vec<BoneAnimation>,
}

impl AnimationClip {
    pub fn end_time(&self) -> f32 {
        self.bone_animations
            .iter()
            .map(BoneAnimation::end_time)
            .fold(0.0, f32::max)
    }

    fn interpolate(&self, time: f32, to_parent: &mut [Mat4]) {
        for (bone, local) in to_parent.iter_mut().enumerate() {
            *local = self
                .bone_animations
                .get(bone)
                .map(|track| track.interpolate(time))
                .unwrap_or(Mat4::IDENTITY);
        }
    }
}

/// Skeleton plus its clips. Shared by every instance that plays it.
#[derive(Debug, Clone, Default)]
pub struct SkinnedData {
    bone_hierarchy: Vec<Option<usize>>,
    bone_offsets: Vec<Mat4>,
    animations: HashMap<String, AnimationClip>,
    evaluation_order: Vec<usize>,
}

impl SkinnedData {
    /// `bone_hierarchy[i]` is the parent of bone `i`; `bone_offsets[i]` maps
    /// mesh space into bone `i`'s bind space.
    pub fn new(
        bone_hierarchy: Vec<Option<usize>>,
        bone_offsets: Vec<Mat4>,
        animations: HashMap<String, AnimationClip>,
    ) -> Self {
        assert_eq!(
            bone_hierarchy.len(),
            bone_offsets.len(),
            "every bone needs an offset matrix"
        );

        let evaluation_order = parents_first_order(&bone_hierarchy);

        Self {
            bone_hierarchy,
            bone_offsets,
            animations,
            evaluation_order,
        }
    }

    pub fn bone_count(&self) -> usize {
        self.bone_hierarchy.len()
    }

    pub fn has_clip(&self, clip_name: &str) -> bool {
        self.animations.contains_key(clip_name)
    }

    pub fn clip_end_time(&self, clip_name: &str) -> f32 {
        self.animations
            .get(clip_name)
            .map(AnimationClip::end_time)
            .unwrap_or(0.0)
    }

    /// Bone palette for `clip_name` at `time_pos`: animated local transforms
    /// composed up the hierarchy, then applied after each bone offset. An
    /// unknown clip yields the identity palette.
    pub fn final_transforms(&self, clip_name: &str, time_pos: f32, out: &mut Vec<Mat4>) {
        let bone_count = self.bone_count();
        out.clear();
        out.resize(bone_count, Mat4::IDENTITY);

        let Some(clip) = self.animations.get(clip_name) else {
            return;
        };

        let mut to_parent = vec![Mat4::IDENTITY; bone_count];
        clip.interpolate(time_pos, &mut to_parent);

        let mut to_root = vec![Mat4::IDENTITY; bone_count];
        for &bone in &self.evaluation_order {
            to_root[bone] = match self.bone_hierarchy[bone] {
                Some(parent) => to_root[parent] * to_parent[bone],
                None => to_parent[bone],
            };
        }

        for bone in 0..bone_count {
            out[bone] = to_root[bone] * self.bone_offsets[bone];
        }
    }
}

fn parents_first_order(hierarchy: &[Option<usize>]) -> Vec<usize> {
    let depth_of = |mut bone: usize| {
        let mut depth = 0usize;
        while let Some(parent) = hierarchy[bone] {
            assert!(depth <= hierarchy.len(), "bone hierarchy contains a cycle");
            bone = parent;
            depth += 1;
        }
        depth
    };

    let mut order: Vec<usize> = (0..hierarchy.len()).collect();
    order.sort_by_key(|&bone| depth_of(bone));
    order
}

/// A running clip on a shared skeleton.
#[derive(Debug, Clone)]
pub struct SkinnedModelInstance {
    pub skinned_info: Arc<SkinnedData>,
    pub final_transforms: Vec<Mat4>,
    pub clip_name: String,
    pub time_pos: f32,
}

impl SkinnedModelInstance {
    pub fn new(skinned_info: Arc<SkinnedData>, clip_name: impl Into<String>) -> Self {
        let clip_name = clip_name.into();
        if !skinned_info.has_clip(&clip_name) {
            log::warn!(
                "Animation clip '{}' not found, bones will stay in bind pose",
                clip_name
            );
        }

        let final_transforms = vec![Mat4::IDENTITY; skinned_info.bone_count()];
        Self {
            skinned_info,
            final_transforms,
            clip_name,
            time_pos: 0.0,
        }
    }

    /// Advances the clip and refreshes the palette. Passing the clip end
    /// restarts at zero.
    pub fn update(&mut self, dt: f32) {
        self.time_pos += dt;

        if self.time_pos > self.skinned_info.clip_end_time(&self.clip_name) {
            self.time_pos = 0.0;
        }

        self.skinned_info
            .final_transforms(&self.clip_name, self.time_pos, &mut self.final_transforms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    fn key(time_pos: f32, translation: Vec3, rotation: Quat) -> Keyframe {
        Keyframe {
            time_pos,
            translation,
            rotation,
            ..Keyframe::default()
        }
    }

    fn two_bone_data() -> SkinnedData {
        let root = BoneAnimation::new(vec![
            key(0.0, Vec3::ZERO, Quat::IDENTITY),
            key(2.0, vec3(2.0, 0.0, 0.0), Quat::IDENTITY),
        ]);
        let child = BoneAnimation::new(vec![key(0.0, vec3(0.0, 1.0, 0.0), Quat::IDENTITY)]);

        let mut animations = HashMap::new();
        animations.insert(
            "walk".to_string(),
            AnimationClip {
                bone_animations: vec![root, child],
            },
        );

        SkinnedData::new(
            vec![None, Some(0)],
            vec![Mat4::IDENTITY, Mat4::from_translation(vec3(0.0, -1.0, 0.0))],
            animations,
        )
    }

    #[test]
    fn translation_is_linearly_interpolated() {
        let track = BoneAnimation::new(vec![
            key(0.0, Vec3::ZERO, Quat::IDENTITY),
            key(1.0, Vec3::ONE, Quat::IDENTITY),
        ]);

        let mid = track.interpolate(0.5);
        assert!(mid.w_axis.truncate().abs_diff_eq(Vec3::splat(0.5), 1e-6));
        assert!(track.interpolate(-1.0).abs_diff_eq(Mat4::IDENTITY, 1e-6));
        assert!(track
            .interpolate(3.0)
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::ONE, 1e-6));
    }

    #[test]
    fn rotation_is_spherically_interpolated() {
        let track = BoneAnimation::new(vec![
            key(0.0, Vec3::ZERO, Quat::IDENTITY),
            key(1.0, Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::PI)),
        ]);

        let rotated = track.interpolate(0.5).transform_vector3(Vec3::Z);
        assert!(rotated.z.abs() < 1e-4, "{rotated:?}");
        assert!((rotated.x.abs() - 1.0).abs() < 1e-4, "{rotated:?}");
    }

    #[test]
    fn child_bones_compose_with_their_parent() {
        let data = two_bone_data();
        let mut palette = Vec::new();
        data.final_transforms("walk", 1.0, &mut palette);

        assert_eq!(palette.len(), 2);
        // Root moved halfway, the child rides along; the child offset cancels
        // its bind translation.
        let child_origin = palette[1].transform_point3(vec3(0.0, 1.0, 0.0));
        assert!(child_origin.abs_diff_eq(vec3(1.0, 1.0, 0.0), 1e-5), "{child_origin:?}");
    }

    #[test]
    fn children_listed_before_parents_still_resolve() {
        let child = BoneAnimation::new(vec![key(0.0, vec3(0.0, 1.0, 0.0), Quat::IDENTITY)]);
        let root = BoneAnimation::new(vec![key(0.0, vec3(3.0, 0.0, 0.0), Quat::IDENTITY)]);
        let mut animations = HashMap::new();
        animations.insert(
            "idle".to_string(),
            AnimationClip {
                bone_animations: vec![child, root],
            },
        );
        let data = SkinnedData::new(
            vec![Some(1), None],
            vec![Mat4::IDENTITY, Mat4::IDENTITY],
            animations,
        );

        let mut palette = Vec::new();
        data.final_transforms("idle", 0.0, &mut palette);
        assert!(palette[0]
            .w_axis
            .truncate()
            .abs_diff_eq(vec3(3.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn instance_time_advances_then_wraps_to_zero() {
        let mut instance = SkinnedModelInstance::new(Arc::new(two_bone_data()), "walk");

        instance.update(1.5);
        assert!((instance.time_pos - 1.5).abs() < 1e-6);

        instance.update(0.5);
        assert!((instance.time_pos - 2.0).abs() < 1e-6, "reaching the end exactly does not wrap");

        instance.update(0.25);
        assert_eq!(instance.time_pos, 0.0);
        assert_eq!(instance.final_transforms.len(), 2);
    }

    #[test]
    fn unknown_clip_gives_identity_palette() {
        let mut instance = SkinnedModelInstance::new(Arc::new(two_bone_data()), "run");
        instance.update(0.1);
        assert!(instance
            .final_transforms
            .iter()
            .all(|m| m.abs_diff_eq(Mat4::IDENTITY, 1e-6)));
    }
}
