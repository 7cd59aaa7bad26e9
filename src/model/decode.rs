// glTF / GLB decoding into AvatarModel

use crate::error::AvatarError;
use crate::model::animation::{AnimationClip, Channel, ChannelValues, Interpolation};
use crate::model::model::{AvatarModel, MeshPrimitive, Node, Skin, Transform};
use ::gltf::animation::util::ReadOutputs;
use nalgebra_glm as glm;
use std::sync::Arc;

/// Decode a `.glb` or `.gltf` byte slice. External buffer URIs are not resolved.
pub fn decode_gltf(bytes: &[u8]) -> Result<AvatarModel, AvatarError> {
    let (document, buffers, _images) = ::gltf::import_slice(bytes)?;
    let buffer_data = |buffer: ::gltf::Buffer<'_>| buffers.get(buffer.index()).map(|d| d.0.as_slice());

    let mut nodes: Vec<Node> = document
        .nodes()
        .map(|node| {
            let (t, r, s) = node.transform().decomposed();
            Node {
                name: node.name().unwrap_or_default().to_string(),
                parent: None,
                children: Vec::new(),
                rest: Transform {
                    translation: glm::make_vec3(&t),
                    rotation: glm::quat(r[0], r[1], r[2], r[3]),
                    scale: glm::make_vec3(&s),
                },
            }
        })
        .collect();

    for node in document.nodes() {
        for child in node.children() {
            nodes[child.index()].parent = Some(node.index());
            nodes[node.index()].children.push(child.index());
        }
    }

    let roots: Vec<usize> = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => (0..nodes.len()).filter(|&i| nodes[i].parent.is_none()).collect(),
    };

    let mut meshes = Vec::new();
    for node in document.nodes() {
        let Some(mesh) = node.mesh() else { continue };
        let skin = node.skin().map(|s| s.index());

        for primitive in mesh.primitives() {
            if primitive.mode() != ::gltf::mesh::Mode::Triangles {
                continue;
            }
            let reader = primitive.reader(buffer_data);
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|n| n.collect())
                .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|i| i.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());
            let joints: Vec<[u16; 4]> = reader
                .read_joints(0)
                .map(|j| j.into_u16().collect())
                .unwrap_or_default();
            let weights: Vec<[f32; 4]> = reader
                .read_weights(0)
                .map(|w| w.into_f32().collect())
                .unwrap_or_default();
            if !joints.is_empty() || !weights.is_empty() {
                if joints.len() != positions.len() || weights.len() != positions.len() {
                    return Err(AvatarError::Decode(format!(
                        "mesh {} primitive {}: {} positions but {} joint and {} weight entries",
                        mesh.index(),
                        primitive.index(),
                        positions.len(),
                        joints.len(),
                        weights.len()
                    )));
                }
            }
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(AvatarError::Decode(format!(
                    "mesh {} primitive {}: index {bad} out of range for {} vertices",
                    mesh.index(),
                    primitive.index(),
                    positions.len()
                )));
            }
            let color = primitive
                .material()
                .pbr_metallic_roughness()
                .base_color_factor();

            meshes.push(MeshPrimitive {
                node: node.index(),
                skin,
                positions,
                normals,
                indices,
                joints,
                weights,
                color,
            });
        }
    }

    let mut skins = Vec::new();
    for skin in document.skins() {
        let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
        let reader = skin.reader(buffer_data);
        let inverse_bind: Vec<glm::Mat4> = reader
            .read_inverse_bind_matrices()
            .map(|mats| {
                mats.map(|cols| {
                    let flat: Vec<f32> = cols.iter().flatten().copied().collect();
                    glm::make_mat4(&flat)
                })
                .collect()
            })
            .unwrap_or_else(|| vec![glm::identity(); joints.len()]);
        skins.push(Skin {
            joints,
            inverse_bind,
        });
    }

    let mut clips = Vec::new();
    for (idx, animation) in document.animations().enumerate() {
        let mut channels = Vec::new();
        for channel in animation.channels() {
            let node = channel.target().node().index();
            let interpolation = match channel.sampler().interpolation() {
                ::gltf::animation::Interpolation::Step => Interpolation::Step,
                ::gltf::animation::Interpolation::Linear => Interpolation::Linear,
                ::gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
            };
            let reader = channel.reader(buffer_data);
            let Some(inputs) = reader.read_inputs() else {
                continue;
            };
            let times: Vec<f32> = inputs.collect();
            let values = match reader.read_outputs() {
                Some(ReadOutputs::Translations(it)) => {
                    ChannelValues::Translation(it.map(|v| glm::make_vec3(&v)).collect())
                }
                Some(ReadOutputs::Rotations(it)) => ChannelValues::Rotation(
                    it.into_f32()
                        .map(|[x, y, z, w]| glm::quat(x, y, z, w))
                        .collect(),
                ),
                Some(ReadOutputs::Scales(it)) => {
                    ChannelValues::Scale(it.map(|v| glm::make_vec3(&v)).collect())
                }
                // Morph target weights are not animated
                _ => continue,
            };
            channels.push(Channel {
                node,
                interpolation,
                times,
                values,
            });
        }
        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("clip {idx}"));
        clips.push(Arc::new(AnimationClip::new(name, channels)));
    }

    let name = document
        .scenes()
        .next()
        .and_then(|s| s.name().map(str::to_string))
        .unwrap_or_else(|| "glTF Model".to_string());

    log::info!(
        "decoded model '{}': {} nodes, {} primitives, {} skins, {} clips",
        name,
        nodes.len(),
        meshes.len(),
        skins.len(),
        clips.len()
    );

    Ok(AvatarModel {
        name,
        nodes,
        roots,
        meshes,
        skins,
        clips,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"name": "Avatar", "nodes": [0]}],
        "nodes": [
            {"name": "root", "children": [1], "translation": [0.0, 1.0, 0.0]},
            {"name": "head", "scale": [2.0, 2.0, 2.0]}
        ]
    }"#;

    #[test]
    fn decodes_node_hierarchy() {
        let model = decode_gltf(MINIMAL.as_bytes()).unwrap();
        assert_eq!(model.name, "Avatar");
        assert_eq!(model.nodes.len(), 2);
        assert_eq!(model.roots, vec![0]);
        assert_eq!(model.nodes[0].children, vec![1]);
        assert_eq!(model.nodes[1].parent, Some(0));
        assert_eq!(model.nodes[0].rest.translation, glm::vec3(0.0, 1.0, 0.0));
        assert_eq!(model.nodes[1].rest.scale, glm::vec3(2.0, 2.0, 2.0));
        assert!(model.clips.is_empty());
        assert!(model.meshes.is_empty());
    }

    // Three positions, then a single JOINTS_0 / WEIGHTS_0 entry
    const SHORT_SKIN_BUFFER: &str =
        "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAAAAAAIA/AAAAAAAAAAAAAAAA";

    fn skinned_triangle(joint_count: usize) -> String {
        format!(
            r#"{{
            "asset": {{"version": "2.0"}},
            "scenes": [{{"nodes": [0, 1]}}],
            "nodes": [{{"name": "body", "mesh": 0, "skin": 0}}, {{"name": "hips"}}],
            "skins": [{{"joints": [1]}}],
            "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0, "JOINTS_0": 1, "WEIGHTS_0": 2}}}}]}}],
            "buffers": [{{"byteLength": 60, "uri": "data:application/octet-stream;base64,{SHORT_SKIN_BUFFER}"}}],
            "bufferViews": [
                {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
                {{"buffer": 0, "byteOffset": 36, "byteLength": 8}},
                {{"buffer": 0, "byteOffset": 44, "byteLength": 16}}
            ],
            "accessors": [
                {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
                {{"bufferView": 1, "componentType": 5123, "count": {joint_count}, "type": "VEC4"}},
                {{"bufferView": 2, "componentType": 5126, "count": {joint_count}, "type": "VEC4"}}
            ]
        }}"#
        )
    }

    #[test]
    fn short_joint_stream_is_a_decode_error() {
        let err = decode_gltf(skinned_triangle(1).as_bytes()).unwrap_err();
        assert!(matches!(err, AvatarError::Decode(_)));
        assert!(err.to_string().contains("3 positions but 1 joint"));
    }

    #[test]
    fn rejects_garbage() {
        let err = decode_gltf(b"definitely not a model").unwrap_err();
        assert!(matches!(err, AvatarError::Decode(_)));
    }
}
