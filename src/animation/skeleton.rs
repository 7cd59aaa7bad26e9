// Node hierarchy transforms

use crate::model::{AvatarModel, Transform};
use nalgebra_glm as glm;

/// Resolve world matrices for every node from per-node local transforms.
/// `locals` must hold one entry per model node.
pub fn world_matrices(model: &AvatarModel, locals: &[Transform]) -> Vec<glm::Mat4> {
    let count = model.nodes.len();
    let mut world = vec![glm::Mat4::identity(); count];
    let mut ready = vec![false; count];
    let mut visiting = vec![false; count];

    for idx in 0..count {
        calc_node(idx, model, locals, &mut world, &mut ready, &mut visiting);
    }
    world
}

/// Parent first, then this node. Cycles fall back to the local transform.
fn calc_node(
    idx: usize,
    model: &AvatarModel,
    locals: &[Transform],
    world: &mut [glm::Mat4],
    ready: &mut [bool],
    visiting: &mut [bool],
) {
    if ready[idx] {
        return;
    }
    let local = locals
        .get(idx)
        .copied()
        .unwrap_or_default()
        .to_matrix();

    let parent = model.nodes[idx].parent.filter(|&p| p < world.len() && !visiting[p]);
    world[idx] = match parent {
        Some(p) => {
            visiting[idx] = true;
            calc_node(p, model, locals, world, ready, visiting);
            visiting[idx] = false;
            world[p] * local
        }
        None => local,
    };
    ready[idx] = true;
}
