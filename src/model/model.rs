use crate::model::animation::AnimationClip;
use nalgebra_glm as glm;
use std::sync::Arc;

/// Local translation/rotation/scale of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: glm::Vec3,
    pub rotation: glm::Quat,
    pub scale: glm::Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: glm::vec3(0.0, 0.0, 0.0),
            rotation: glm::quat_identity(),
            scale: glm::vec3(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn to_matrix(&self) -> glm::Mat4 {
        let t = glm::translation(&self.translation);
        let r = glm::quat_to_mat4(&glm::quat_normalize(&self.rotation));
        let s = glm::scaling(&self.scale);
        t * r * s
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub rest: Transform,
}

/// One triangle-list primitive, flattened out of its glTF mesh.
#[derive(Debug, Clone)]
pub struct MeshPrimitive {
    pub node: usize,
    pub skin: Option<usize>,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
    pub color: [f32; 4],
}

impl MeshPrimitive {
    /// Skinned only when every vertex carries one joint set and one weight set.
    pub fn is_skinned(&self) -> bool {
        self.skin.is_some()
            && !self.joints.is_empty()
            && self.joints.len() == self.positions.len()
            && self.weights.len() == self.positions.len()
    }
}

#[derive(Debug, Clone)]
pub struct Skin {
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<glm::Mat4>,
}

/// A decoded avatar: node hierarchy, geometry, skins and animation clips.
#[derive(Debug, Clone, Default)]
pub struct AvatarModel {
    pub name: String,
    pub nodes: Vec<Node>,
    pub roots: Vec<usize>,
    pub meshes: Vec<MeshPrimitive>,
    pub skins: Vec<Skin>,
    pub clips: Vec<Arc<AnimationClip>>,
}

impl AvatarModel {
    pub fn rest_pose(&self) -> Vec<Transform> {
        self.nodes.iter().map(|n| n.rest).collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.positions.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len()).sum()
    }

    /// All primitive indices concatenated, rebased onto one vertex stream.
    pub fn flattened_indices(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.index_count());
        let mut base = 0u32;
        for mesh in &self.meshes {
            out.extend(mesh.indices.iter().map(|i| i + base));
            base += mesh.positions.len() as u32;
        }
        out
    }
}
