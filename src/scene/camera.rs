use crate::settings::SceneSettings;
use nalgebra_glm as glm;

/// Y-up perspective camera looking at a target point.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: glm::Vec3,
    pub target: glm::Vec3,
    aspect: f32,
    projection: glm::Mat4,
}

impl PerspectiveCamera {
    pub fn new(settings: &SceneSettings, aspect: f32) -> Self {
        let mut camera = Self {
            fov_degrees: settings.fov_degrees,
            near: settings.near_plane,
            far: settings.far_plane,
            position: glm::make_vec3(&settings.camera_position),
            target: glm::make_vec3(&settings.camera_target),
            aspect: sanitize_aspect(aspect),
            projection: glm::Mat4::identity(),
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = sanitize_aspect(aspect);
    }

    /// Recompute the projection after changing fov, aspect or clip planes.
    pub fn update_projection_matrix(&mut self) {
        self.projection =
            glm::perspective(self.aspect, self.fov_degrees.to_radians(), self.near, self.far);
    }

    pub fn projection(&self) -> &glm::Mat4 {
        &self.projection
    }

    pub fn view(&self) -> glm::Mat4 {
        glm::look_at(&self.position, &self.target, &glm::vec3(0.0, 1.0, 0.0))
    }

    pub fn view_proj(&self) -> glm::Mat4 {
        self.projection * self.view()
    }

    pub fn distance(&self) -> f32 {
        glm::distance(&self.position, &self.target)
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}
