use crate::settings::SceneSettings;
use nalgebra_glm as glm;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Light shining from `position` toward the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: glm::Vec3,
}

impl DirectionalLight {
    /// Unit vector from the lit surface toward the light
    pub fn direction(&self) -> glm::Vec3 {
        if glm::length(&self.position) > f32::EPSILON {
            glm::normalize(&self.position)
        } else {
            glm::vec3(0.0, 1.0, 0.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lights {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
}

impl Lights {
    pub fn from_settings(settings: &SceneSettings) -> Self {
        Self {
            ambient: AmbientLight {
                color: settings.ambient_color,
                intensity: settings.ambient_intensity,
            },
            directional: DirectionalLight {
                color: settings.directional_color,
                intensity: settings.directional_intensity,
                position: glm::make_vec3(&settings.directional_position),
            },
        }
    }
}
