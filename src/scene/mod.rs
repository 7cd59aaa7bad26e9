//! Scene graph: camera, orbit controls, lights and the loaded avatar.

pub mod camera;
pub mod controls;
pub mod lights;
pub mod skinning;

pub use camera::PerspectiveCamera;
pub use controls::OrbitControls;
pub use lights::{AmbientLight, DirectionalLight, Lights};
pub use skinning::skin_vertices;

use crate::model::AvatarModel;
use nalgebra_glm as glm;

/// Lights plus the avatar once it has loaded.
pub struct Scene {
    lights: Lights,
    model: Option<AvatarModel>,
    model_scale: f32,
}

impl Scene {
    pub fn new(lights: Lights) -> Self {
        Self {
            lights,
            model: None,
            model_scale: 1.0,
        }
    }

    pub fn lights(&self) -> &Lights {
        &self.lights
    }

    pub fn insert_model(&mut self, model: AvatarModel, scale: f32) {
        self.model = Some(model);
        self.model_scale = scale;
    }

    pub fn model(&self) -> Option<&AvatarModel> {
        self.model.as_ref()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_scale(&self) -> f32 {
        self.model_scale
    }

    /// Uniform scale applied to the whole avatar
    pub fn model_matrix(&self) -> glm::Mat4 {
        glm::scaling(&glm::vec3(self.model_scale, self.model_scale, self.model_scale))
    }

    /// Remove the avatar; lights stay.
    pub fn clear(&mut self) {
        self.model = None;
        self.model_scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SceneSettings;

    #[test]
    fn clear_drops_model_but_keeps_lights() {
        let lights = Lights::from_settings(&SceneSettings::default());
        let mut scene = Scene::new(lights);
        scene.insert_model(AvatarModel::default(), 0.7);
        assert!(scene.has_model());
        assert_eq!(scene.model_matrix()[(0, 0)], 0.7);

        scene.clear();
        assert!(!scene.has_model());
        assert_eq!(*scene.lights(), lights);
        assert_eq!(scene.model_matrix(), glm::Mat4::identity());
    }
}
