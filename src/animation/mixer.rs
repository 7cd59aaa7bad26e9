// Clip playback and weighted pose blending

use super::action::ClipAction;
use super::interpolation::{Sample, sample_channel};
use crate::model::{AvatarModel, Transform};
use nalgebra_glm as glm;

#[derive(Clone, Copy)]
struct Accumulator {
    translation: glm::Vec3,
    translation_weight: f32,
    rotation: glm::Vec4,
    rotation_weight: f32,
    scale: glm::Vec3,
    scale_weight: f32,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            translation: glm::Vec3::zeros(),
            translation_weight: 0.0,
            rotation: glm::Vec4::zeros(),
            rotation_weight: 0.0,
            scale: glm::Vec3::zeros(),
            scale_weight: 0.0,
        }
    }
}

impl Accumulator {
    fn add_rotation(&mut self, q: glm::Quat, weight: f32) {
        // Keep every contribution in the same hemisphere as the running sum
        let coords = if self.rotation.dot(&q.coords) < 0.0 {
            -q.coords
        } else {
            q.coords
        };
        self.rotation += coords * weight;
        self.rotation_weight += weight;
    }

    /// Normalized blend; any weight short of 1 is filled from the rest pose.
    fn resolve(&self, rest: &Transform) -> Transform {
        let fill = |w: f32| (1.0 - w).max(0.0);
        let norm = |w: f32| w.max(1.0);

        let translation = if self.translation_weight > 0.0 {
            (self.translation + rest.translation * fill(self.translation_weight))
                / norm(self.translation_weight)
        } else {
            rest.translation
        };

        let scale = if self.scale_weight > 0.0 {
            (self.scale + rest.scale * fill(self.scale_weight)) / norm(self.scale_weight)
        } else {
            rest.scale
        };

        let rotation = if self.rotation_weight > 0.0 {
            let mut sum = self.rotation;
            let rest_coords = if sum.dot(&rest.rotation.coords) < 0.0 {
                -rest.rotation.coords
            } else {
                rest.rotation.coords
            };
            sum += rest_coords * fill(self.rotation_weight);
            if sum.norm() > f32::EPSILON {
                glm::quat_normalize(&glm::Quat::from_vector(sum))
            } else {
                rest.rotation
            }
        } else {
            rest.rotation
        };

        Transform {
            translation,
            rotation,
            scale,
        }
    }
}

/// Owns one action per clip of a loaded model and blends them into a pose.
pub struct AnimationMixer {
    actions: Vec<ClipAction>,
    rest: Vec<Transform>,
    pose: Vec<Transform>,
    elapsed: f32,
}

impl AnimationMixer {
    pub fn new(model: &AvatarModel) -> Self {
        let rest = model.rest_pose();
        Self {
            actions: model.clips.iter().cloned().map(ClipAction::new).collect(),
            pose: rest.clone(),
            rest,
            elapsed: 0.0,
        }
    }

    pub fn action(&self, index: usize) -> Option<&ClipAction> {
        self.actions.get(index)
    }

    pub fn action_mut(&mut self, index: usize) -> Option<&mut ClipAction> {
        self.actions.get_mut(index)
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Total time advanced since the mixer was created
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn pose(&self) -> &[Transform] {
        &self.pose
    }

    /// Advance every running action by `dt` and re-blend the pose.
    pub fn update(&mut self, dt: f32) {
        self.elapsed += dt;
        for action in &mut self.actions {
            action.advance(dt);
        }
        self.evaluate();
    }

    fn evaluate(&mut self) {
        let mut acc = vec![Accumulator::default(); self.rest.len()];

        for action in &self.actions {
            let weight = action.effective_weight();
            if weight <= 0.0 {
                continue;
            }
            for channel in &action.clip().channels {
                let Some(slot) = acc.get_mut(channel.node) else {
                    continue;
                };
                match sample_channel(channel, action.time()) {
                    Some(Sample::Translation(v)) => {
                        slot.translation += v * weight;
                        slot.translation_weight += weight;
                    }
                    Some(Sample::Rotation(q)) => slot.add_rotation(q, weight),
                    Some(Sample::Scale(v)) => {
                        slot.scale += v * weight;
                        slot.scale_weight += weight;
                    }
                    None => {}
                }
            }
        }

        for ((out, rest), slot) in self.pose.iter_mut().zip(&self.rest).zip(&acc) {
            *out = slot.resolve(rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnimationClip, Channel, ChannelValues, Interpolation, Node};
    use std::sync::Arc;

    fn slide_clip(name: &str, x: f32) -> Arc<AnimationClip> {
        Arc::new(AnimationClip::new(
            name,
            vec![Channel {
                node: 0,
                interpolation: Interpolation::Linear,
                times: vec![0.0, 1.0],
                values: ChannelValues::Translation(vec![glm::vec3(x, 0.0, 0.0); 2]),
            }],
        ))
    }

    fn model() -> AvatarModel {
        AvatarModel {
            nodes: vec![Node {
                name: "hips".into(),
                parent: None,
                children: Vec::new(),
                rest: Transform::default(),
            }],
            roots: vec![0],
            clips: vec![slide_clip("idle", 2.0), slide_clip("talking", 4.0)],
            ..AvatarModel::default()
        }
    }

    #[test]
    fn nothing_playing_keeps_rest_pose() {
        let mut mixer = AnimationMixer::new(&model());
        mixer.update(0.016);
        assert_eq!(mixer.pose()[0], Transform::default());
    }

    #[test]
    fn single_full_weight_action_drives_pose() {
        let mut mixer = AnimationMixer::new(&model());
        mixer.action_mut(0).unwrap().play();
        mixer.update(0.1);
        assert_eq!(mixer.pose()[0].translation, glm::vec3(2.0, 0.0, 0.0));
    }

    #[test]
    fn complementary_weights_blend_linearly() {
        let mut mixer = AnimationMixer::new(&model());
        mixer.action_mut(0).unwrap().set_effective_weight(0.75).play();
        mixer.action_mut(1).unwrap().set_effective_weight(0.25).play();
        mixer.update(0.1);
        let x = mixer.pose()[0].translation.x;
        assert!((x - 2.5).abs() < 1e-5);
    }

    #[test]
    fn partial_weight_is_filled_from_rest() {
        let mut mixer = AnimationMixer::new(&model());
        mixer.action_mut(1).unwrap().set_effective_weight(0.5).play();
        mixer.update(0.1);
        let x = mixer.pose()[0].translation.x;
        assert!((x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn elapsed_tracks_updates() {
        let mut mixer = AnimationMixer::new(&model());
        mixer.update(0.016);
        mixer.update(0.016);
        assert!((mixer.elapsed() - 0.032).abs() < 1e-6);
        assert_eq!(mixer.action_count(), 2);
    }
}
