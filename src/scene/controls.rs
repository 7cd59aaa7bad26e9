use super::camera::PerspectiveCamera;
use crate::settings::SceneSettings;
use nalgebra_glm as glm;
use std::f32::consts::PI;

const POLAR_EPS: f32 = 1e-4;
const ROTATE_SPEED: f32 = 0.01;
const ZOOM_STEP: f32 = 0.95;

/// Damped orbit around a target point, driven by mouse input.
///
/// Input accumulates into pending deltas; each `update` applies a
/// `damping_factor` share of them to the camera and decays the rest, so the
/// camera trails the input and eases to a stop.
pub struct OrbitControls {
    target: glm::Vec3,
    damping_factor: f32,
    min_distance: f32,
    max_distance: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_scale: f32,
    left_mouse_pressed: bool,
    right_mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    enabled: bool,
}

impl OrbitControls {
    pub fn new(settings: &SceneSettings) -> Self {
        Self {
            target: glm::make_vec3(&settings.camera_target),
            damping_factor: settings.damping_factor,
            min_distance: settings.min_distance,
            max_distance: settings.max_distance,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_scale: 1.0,
            left_mouse_pressed: false,
            right_mouse_pressed: false,
            last_mouse_pos: None,
            enabled: true,
        }
    }

    pub fn target(&self) -> glm::Vec3 {
        self.target
    }

    pub fn distance_range(&self) -> (f32, f32) {
        (self.min_distance, self.max_distance)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.left_mouse_pressed = false;
            self.right_mouse_pressed = false;
            self.last_mouse_pos = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Handle mouse button press/release
    pub fn on_mouse_button(&mut self, button: winit::event::MouseButton, pressed: bool) {
        if !self.enabled {
            return;
        }
        match button {
            winit::event::MouseButton::Left => self.left_mouse_pressed = pressed,
            winit::event::MouseButton::Right => self.right_mouse_pressed = pressed,
            _ => return,
        }
        if !pressed {
            self.last_mouse_pos = None;
        }
    }

    /// Drag with either button orbits. Returns true when input was consumed.
    pub fn on_mouse_move(&mut self, position: (f64, f64)) -> bool {
        if !self.enabled || !(self.left_mouse_pressed || self.right_mouse_pressed) {
            self.last_mouse_pos = None;
            return false;
        }
        let handled = match self.last_mouse_pos {
            Some(last) => {
                self.rotate((position.0 - last.0) as f32, (position.1 - last.1) as f32);
                true
            }
            None => false,
        };
        self.last_mouse_pos = Some(position);
        handled
    }

    /// Wheel zoom; positive `lines` moves closer.
    pub fn on_scroll(&mut self, lines: f32) {
        if self.enabled {
            self.pending_scale *= ZOOM_STEP.powf(lines);
        }
    }

    fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        self.pending_theta -= delta_x * ROTATE_SPEED;
        self.pending_phi -= delta_y * ROTATE_SPEED;
    }

    /// Apply one damped step to `camera`. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let mut radius = glm::length(&offset);
        let (mut theta, mut phi) = if radius > f32::EPSILON {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, PI / 2.0)
        };

        let damping = if self.damping_factor > 0.0 {
            self.damping_factor.min(1.0)
        } else {
            1.0
        };
        theta += self.pending_theta * damping;
        phi = (phi + self.pending_phi * damping).clamp(POLAR_EPS, PI - POLAR_EPS);
        radius = (radius * self.pending_scale).clamp(self.min_distance, self.max_distance);

        self.pending_theta *= 1.0 - damping;
        self.pending_phi *= 1.0 - damping;
        self.pending_scale = 1.0;

        let position = self.target
            + glm::vec3(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
        let moved = glm::distance(&position, &camera.position) > 1e-5;
        camera.position = position;
        camera.target = self.target;
        moved
    }
}
