//! Skinned model import from glTF.
//!
//! Everything is converted to the renderer's left-handed frame by mirroring Z.
//! All primitives of the first skinned mesh share one vertex/index buffer pair;
//! each primitive becomes a subset with its own material.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use glam::{Mat4, Quat, Vec3, Vec4};

use super::IndexData;
use crate::error::AssetError;
use crate::renderer::constants::MAX_BONES;
use crate::renderer::SkinnedVertex;
use crate::scene::animation::{AnimationClip, BoneAnimation, Keyframe, SkinnedData};

/// Vertex and face range of one submesh inside the shared buffers. Indices of
/// a subset are relative to `vertex_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinnedSubset {
    pub vertex_start: u32,
    pub vertex_count: u32,
    pub face_start: u32,
    pub face_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkinnedMaterial {
    pub name: String,
    pub diffuse_map: Option<String>,
    pub normal_map: Option<String>,
    pub diffuse_albedo: Vec4,
    pub fresnel_r0: Vec3,
    pub roughness: f32,
}

pub struct SkinnedModelData {
    pub vertices: Vec<SkinnedVertex>,
    pub indices: IndexData,
    pub subsets: Vec<SkinnedSubset>,
    /// One per subset.
    pub materials: Vec<SkinnedMaterial>,
    pub skeleton: SkinnedData,
}

const MIRROR_Z: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, -1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
]);

fn mirror_point(p: [f32; 3]) -> [f32; 3] {
    [p[0], p[1], -p[2]]
}

fn mirror_matrix(m: Mat4) -> Mat4 {
    MIRROR_Z * m * MIRROR_Z
}

fn mirror_keyframe(key: Keyframe) -> Keyframe {
    Keyframe {
        time_pos: key.time_pos,
        translation: Vec3::new(key.translation.x, key.translation.y, -key.translation.z),
        scale: key.scale,
        rotation: Quat::from_xyzw(-key.rotation.x, -key.rotation.y, key.rotation.z, key.rotation.w),
    }
}

fn skinned_error(path: &Path, reason: impl Into<String>) -> AssetError {
    AssetError::SkinnedModel {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

pub fn load_skinned_model(path: impl AsRef<Path>) -> Result<SkinnedModelData, AssetError> {
    let path = path.as_ref();
    log::info!("Loading skinned model: {:?}", path);

    let (document, buffers, _images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;

    let (mesh_node, skin) = document
        .nodes()
        .find_map(|node| match (node.mesh(), node.skin()) {
            (Some(_), Some(skin)) => Some((node, skin)),
            _ => None,
        })
        .ok_or_else(|| skinned_error(path, "no node with both a mesh and a skin"))?;

    let joints: Vec<gltf::Node> = skin.joints().collect();
    if joints.len() > MAX_BONES {
        log::warn!(
            "Skeleton in {:?} has {} joints, only the first {} are uploaded",
            path,
            joints.len(),
            MAX_BONES
        );
    }

    let mut node_parent = vec![None; document.nodes().len()];
    for node in document.nodes() {
        for child in node.children() {
            node_parent[child.index()] = Some(node.index());
        }
    }

    let joint_of_node: HashMap<usize, usize> = joints
        .iter()
        .enumerate()
        .map(|(joint, node)| (node.index(), joint))
        .collect();

    let bone_hierarchy: Vec<Option<usize>> = joints
        .iter()
        .map(|node| {
            node_parent[node.index()].and_then(|parent| joint_of_node.get(&parent).copied())
        })
        .collect();

    // Root joints inherit whatever non-joint ancestors sit above them.
    let nodes: Vec<gltf::Node> = document.nodes().collect();
    let ancestor_transform = |joint: usize| -> Mat4 {
        let mut transform = Mat4::IDENTITY;
        let mut current = node_parent[joints[joint].index()];
        while let Some(node) = current {
            transform = Mat4::from_cols_array_2d(&nodes[node].transform().matrix()) * transform;
            current = node_parent[node];
        }
        transform
    };

    let inverse_binds: Vec<Mat4> = skin
        .reader(|buffer| Some(&buffers[buffer.index()]))
        .read_inverse_bind_matrices()
        .map(|matrices| matrices.map(|m| Mat4::from_cols_array_2d(&m)).collect())
        .unwrap_or_else(|| vec![Mat4::IDENTITY; joints.len()]);
    let bone_offsets = inverse_binds.into_iter().map(mirror_matrix).collect();

    let mut animations = HashMap::new();
    for (animation_index, animation) in document.animations().enumerate() {
        let clip_name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Animation_{}", animation_index));

        let mut tracks = vec![ChannelSet::default(); joints.len()];
        for channel in animation.channels() {
            let Some(&joint) = joint_of_node.get(&channel.target().node().index()) else {
                continue;
            };

            let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(inputs) = reader.read_inputs() else {
                log::warn!("Clip '{}' has a channel without keyframe times", clip_name);
                continue;
            };
            let times: Vec<f32> = inputs.collect();

            match reader.read_outputs() {
                Some(gltf::animation::util::ReadOutputs::Translations(iter)) => {
                    tracks[joint].translation = Some((times, iter.map(Vec3::from).collect()));
                }
                Some(gltf::animation::util::ReadOutputs::Rotations(iter)) => {
                    let values = iter.into_f32().map(Quat::from_array).collect();
                    tracks[joint].rotation = Some((times, values));
                }
                Some(gltf::animation::util::ReadOutputs::Scales(iter)) => {
                    tracks[joint].scale = Some((times, iter.map(Vec3::from).collect()));
                }
                _ => {}
            }
        }

        let bone_animations = tracks
            .iter()
            .enumerate()
            .map(|(joint, channels)| {
                let (t, r, s) = joints[joint].transform().decomposed();
                let rest = Keyframe {
                    time_pos: 0.0,
                    translation: Vec3::from(t),
                    rotation: Quat::from_array(r),
                    scale: Vec3::from(s),
                };
                let parent_space = match bone_hierarchy[joint] {
                    Some(_) => None,
                    None => Some(ancestor_transform(joint)),
                };
                channels.bake(rest, parent_space)
            })
            .collect();

        animations.insert(clip_name, AnimationClip { bone_animations });
    }

    if animations.is_empty() {
        log::warn!("Skinned model {:?} contains no animation clips", path);
    }

    let skeleton = SkinnedData::new(bone_hierarchy, bone_offsets, animations);

    let mesh = mesh_node
        .mesh()
        .ok_or_else(|| skinned_error(path, "skinned node lost its mesh"))?;

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut subsets = Vec::new();
    let mut materials = Vec::new();

    for (primitive_index, primitive) in mesh.primitives().enumerate() {
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| skinned_error(path, "primitive without positions"))?
            .collect();
        let count = positions.len();

        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .map(|n| n.collect())
            .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; count]);
        let uvs: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|uv| uv.into_f32().collect())
            .unwrap_or_else(|| vec![[0.0, 0.0]; count]);
        let tangents: Vec<[f32; 4]> = reader
            .read_tangents()
            .map(|t| t.collect())
            .unwrap_or_else(|| vec![[1.0, 0.0, 0.0, 1.0]; count]);
        let joint_indices: Vec<[u16; 4]> = reader
            .read_joints(0)
            .map(|j| j.into_u16().collect())
            .unwrap_or_else(|| vec![[0; 4]; count]);
        let weights: Vec<[f32; 4]> = reader
            .read_weights(0)
            .map(|w| w.into_f32().collect())
            .unwrap_or_else(|| vec![[1.0, 0.0, 0.0, 0.0]; count]);

        let primitive_indices: Vec<u32> = match reader.read_indices() {
            Some(read) => read.into_u32().collect(),
            None => (0..count as u32).collect(),
        };

        let vertex_start = vertices.len() as u32;
        let face_start = (indices.len() / 3) as u32;

        for i in 0..count {
            let tangent = tangents[i];
            vertices.push(SkinnedVertex {
                position: mirror_point(positions[i]),
                normal: mirror_point(normals[i]),
                uv: uvs[i],
                tangent: mirror_point([tangent[0], tangent[1], tangent[2]]),
                bone_weights: [weights[i][0], weights[i][1], weights[i][2]],
                bone_indices: joint_indices[i].map(|j| j.min(u16::from(u8::MAX)) as u8),
            });
        }
        indices.extend_from_slice(&primitive_indices);

        subsets.push(SkinnedSubset {
            vertex_start,
            vertex_count: count as u32,
            face_start,
            face_count: (primitive_indices.len() / 3) as u32,
        });
        materials.push(read_material(&primitive.material(), primitive_index));
    }

    log::info!(
        "Skinned model: {} vertices, {} subsets, {} bones",
        vertices.len(),
        subsets.len(),
        skeleton.bone_count()
    );

    Ok(SkinnedModelData {
        vertices,
        indices: IndexData::compact(indices),
        subsets,
        materials,
        skeleton,
    })
}

type Track<T> = Option<(Vec<f32>, Vec<T>)>;

#[derive(Clone, Default)]
struct ChannelSet {
    translation: Track<Vec3>,
    rotation: Track<Quat>,
    scale: Track<Vec3>,
}

impl ChannelSet {
    /// Resamples the separate T/R/S channels onto their union of key times.
    fn bake(&self, rest: Keyframe, parent_space: Option<Mat4>) -> BoneAnimation {
        let mut times = BTreeSet::new();
        for track_times in [
            self.translation.as_ref().map(|(t, _)| t),
            self.rotation.as_ref().map(|(t, _)| t),
            self.scale.as_ref().map(|(t, _)| t),
        ]
        .into_iter()
        .flatten()
        {
            times.extend(track_times.iter().map(|t| OrderedTime(*t)));
        }
        if times.is_empty() {
            times.insert(OrderedTime(0.0));
        }

        let keyframes = times
            .into_iter()
            .map(|OrderedTime(time_pos)| {
                let mut key = Keyframe {
                    time_pos,
                    translation: sample(&self.translation, time_pos, Vec3::lerp)
                        .unwrap_or(rest.translation),
                    rotation: sample(&self.rotation, time_pos, |a, b, f| {
                        a.normalize().slerp(b.normalize(), f)
                    })
                    .unwrap_or(rest.rotation),
                    scale: sample(&self.scale, time_pos, Vec3::lerp).unwrap_or(rest.scale),
                };

                if let Some(parent) = parent_space {
                    let (scale, rotation, translation) =
                        (parent * key.to_matrix()).to_scale_rotation_translation();
                    key.scale = scale;
                    key.rotation = rotation;
                    key.translation = translation;
                }

                mirror_keyframe(key)
            })
            .collect();

        BoneAnimation::new(keyframes)
    }
}

fn sample<T: Copy>(track: &Track<T>, time: f32, mix: impl Fn(T, T, f32) -> T) -> Option<T> {
    let (times, values) = track.as_ref()?;
    let count = times.len().min(values.len());
    if count == 0 {
        return None;
    }
    if time <= times[0] {
        return Some(values[0]);
    }
    if time >= times[count - 1] {
        return Some(values[count - 1]);
    }

    let upper = times[..count].partition_point(|&t| t <= time);
    let lower = upper - 1;
    let span = times[upper] - times[lower];
    let factor = if span.abs() < f32::EPSILON {
        0.0
    } else {
        (time - times[lower]) / span
    };
    Some(mix(values[lower], values[upper], factor))
}

#[derive(Clone, Copy, PartialEq, PartialOrd)]
struct OrderedTime(f32);

impl Eq for OrderedTime {}

impl Ord for OrderedTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

fn image_file_name(texture: gltf::Texture) -> Option<String> {
    match texture.source().source() {
        gltf::image::Source::Uri { uri, .. } => Some(uri.to_string()),
        gltf::image::Source::View { .. } => {
            log::warn!(
                "Embedded texture '{}' is not supported, skipping",
                texture.name().unwrap_or("unnamed")
            );
            None
        }
    }
}

fn read_material(material: &gltf::Material, subset: usize) -> SkinnedMaterial {
    let pbr = material.pbr_metallic_roughness();
    let albedo = Vec4::from(pbr.base_color_factor());
    let metallic = pbr.metallic_factor();

    SkinnedMaterial {
        name: material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("skinned_{}", subset)),
        diffuse_map: pbr
            .base_color_texture()
            .and_then(|info| image_file_name(info.texture())),
        normal_map: material
            .normal_texture()
            .and_then(|info| image_file_name(info.texture())),
        diffuse_albedo: albedo,
        fresnel_r0: Vec3::splat(0.04).lerp(albedo.truncate(), metallic),
        roughness: pbr.roughness_factor(),
    }
}

/// Texture files of a model live next to it.
pub fn model_texture_path(model_path: &Path, file_name: &str) -> PathBuf {
    model_path
        .parent()
        .map(|dir| dir.join(file_name))
        .unwrap_or_else(|| PathBuf::from(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirroring_a_keyframe_matches_mirroring_its_matrix() {
        let key = Keyframe {
            time_pos: 0.0,
            translation: Vec3::new(1.0, 2.0, 3.0),
            scale: Vec3::new(1.0, 2.0, 1.0),
            rotation: Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), 0.7),
        };

        let expected = mirror_matrix(key.to_matrix());
        let actual = mirror_keyframe(key).to_matrix();
        assert!(actual.abs_diff_eq(expected, 1e-5), "{actual:?} vs {expected:?}");
    }

    #[test]
    fn channels_are_resampled_on_shared_times() {
        let channels = ChannelSet {
            translation: Some((vec![0.0, 1.0], vec![Vec3::ZERO, Vec3::X])),
            rotation: None,
            scale: Some((vec![0.5], vec![Vec3::splat(2.0)])),
        };

        let track = channels.bake(Keyframe::default(), None);
        let times: Vec<f32> = track.keyframes.iter().map(|k| k.time_pos).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        assert!(track.keyframes[1]
            .translation
            .abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-6));
        assert_eq!(track.keyframes[2].scale, Vec3::splat(2.0));
    }

    #[test]
    fn missing_model_reports_missing_file() {
        let err = load_skinned_model("no/such/model.gltf").err().unwrap();
        assert!(err.is_missing_file(), "{err}");
    }
}
