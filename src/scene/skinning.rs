// CPU skinning of the current pose into a flat vertex stream

use crate::model::AvatarModel;
use crate::renderer::vertex::Vertex;
use nalgebra_glm as glm;

const UP: [f32; 3] = [0.0, 1.0, 0.0];

/// Joint matrices (`world[joint] * inverse_bind`) for every skin.
fn joint_matrices(model: &AvatarModel, world: &[glm::Mat4]) -> Vec<Vec<glm::Mat4>> {
    model
        .skins
        .iter()
        .map(|skin| {
            skin.joints
                .iter()
                .enumerate()
                .map(|(i, &joint)| {
                    let joint_world = world.get(joint).copied().unwrap_or_else(glm::Mat4::identity);
                    let inverse_bind = skin
                        .inverse_bind
                        .get(i)
                        .copied()
                        .unwrap_or_else(glm::Mat4::identity);
                    joint_world * inverse_bind
                })
                .collect()
        })
        .collect()
}

/// Deform every primitive by the posed node matrices, writing into `out`.
///
/// Vertices keep the order of `AvatarModel::flattened_indices`, so the index
/// buffer uploaded once at load time stays valid across frames.
pub fn skin_vertices(model: &AvatarModel, world: &[glm::Mat4], out: &mut Vec<Vertex>) {
    out.clear();
    out.reserve(model.vertex_count());
    let joints = joint_matrices(model, world);

    for mesh in &model.meshes {
        let node_matrix = world
            .get(mesh.node)
            .copied()
            .unwrap_or_else(glm::Mat4::identity);
        let skin = mesh
            .skin
            .filter(|_| mesh.is_skinned())
            .and_then(|s| joints.get(s));

        for (i, position) in mesh.positions.iter().enumerate() {
            let matrix = match skin {
                Some(joint_mats) => blend_joints(joint_mats, mesh.joints[i], mesh.weights[i]),
                None => node_matrix,
            };
            let p = matrix * glm::vec4(position[0], position[1], position[2], 1.0);
            let n = mesh.normals.get(i).copied().unwrap_or(UP);
            let n = matrix * glm::vec4(n[0], n[1], n[2], 0.0);
            let n = if glm::length(&n.xyz()) > f32::EPSILON {
                glm::normalize(&n.xyz())
            } else {
                glm::make_vec3(&UP)
            };
            out.push(Vertex {
                position: [p.x, p.y, p.z],
                normal: [n.x, n.y, n.z],
                color: mesh.color,
            });
        }
    }
}

fn blend_joints(joint_mats: &[glm::Mat4], joints: [u16; 4], weights: [f32; 4]) -> glm::Mat4 {
    let mut matrix = glm::Mat4::zeros();
    let mut total = 0.0;
    for (&joint, &weight) in joints.iter().zip(&weights) {
        if weight <= 0.0 {
            continue;
        }
        if let Some(m) = joint_mats.get(joint as usize) {
            matrix += m * weight;
            total += weight;
        }
    }
    if total > f32::EPSILON {
        matrix / total
    } else {
        glm::Mat4::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::world_matrices;
    use crate::model::{MeshPrimitive, Node, Skin, Transform};

    fn bone(parent: Option<usize>, y: f32) -> Node {
        Node {
            name: String::new(),
            parent,
            children: Vec::new(),
            rest: Transform {
                translation: glm::vec3(0.0, y, 0.0),
                ..Transform::default()
            },
        }
    }

    fn primitive(skin: Option<usize>) -> MeshPrimitive {
        MeshPrimitive {
            node: 0,
            skin,
            positions: vec![[0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]],
            indices: vec![0, 0, 0],
            joints: vec![[1, 0, 0, 0]],
            weights: vec![[1.0, 0.0, 0.0, 0.0]],
            color: [1.0; 4],
        }
    }

    #[test]
    fn static_mesh_follows_its_node() {
        let model = AvatarModel {
            nodes: vec![bone(None, 2.0)],
            roots: vec![0],
            meshes: vec![primitive(None)],
            ..AvatarModel::default()
        };
        let world = world_matrices(&model, &model.rest_pose());
        let mut out = Vec::new();
        skin_vertices(&model, &world, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].position, [0.0, 3.0, 0.0]);
        assert_eq!(out[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn short_joint_stream_falls_back_to_node_matrix() {
        let mut mesh = primitive(Some(0));
        mesh.positions.push([1.0, 0.0, 0.0]);
        mesh.normals.push([0.0, 0.0, 1.0]);
        assert!(!mesh.is_skinned());

        let model = AvatarModel {
            nodes: vec![bone(None, 2.0)],
            roots: vec![0],
            meshes: vec![mesh],
            skins: vec![Skin {
                joints: vec![0],
                inverse_bind: vec![glm::Mat4::identity()],
            }],
            ..AvatarModel::default()
        };
        let world = world_matrices(&model, &model.rest_pose());
        let mut out = Vec::new();
        skin_vertices(&model, &world, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].position, [1.0, 2.0, 0.0]);
    }

    #[test]
    fn skinned_vertex_tracks_joint_motion() {
        let mut model = AvatarModel {
            nodes: vec![bone(None, 0.0), bone(Some(0), 1.0)],
            roots: vec![0],
            meshes: vec![primitive(Some(0))],
            skins: vec![Skin {
                joints: vec![0, 1],
                inverse_bind: vec![
                    glm::Mat4::identity(),
                    glm::translation(&glm::vec3(0.0, -1.0, 0.0)),
                ],
            }],
            ..AvatarModel::default()
        };

        // Bind pose leaves the vertex where it was authored
        let world = world_matrices(&model, &model.rest_pose());
        let mut out = Vec::new();
        skin_vertices(&model, &world, &mut out);
        assert_eq!(out[0].position, [0.0, 1.0, 0.0]);

        model.nodes[1].rest.translation = glm::vec3(1.0, 1.0, 0.0);
        let world = world_matrices(&model, &model.rest_pose());
        skin_vertices(&model, &world, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].position, [1.0, 1.0, 0.0]);
    }
}
