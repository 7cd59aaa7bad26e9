//! Rendering seam between the controller and the GPU.
//!
//! The controller only talks to [`RenderSurface`]; [`WgpuSurface`] is the
//! window-backed implementation used by the desktop host.

pub mod render;
pub mod renderer;
pub mod vertex;

pub use renderer::{Overlay, WgpuSurface};
pub use vertex::Vertex;

use crate::error::RenderError;
use crate::model::AvatarModel;
use crate::scene::Lights;
use nalgebra_glm as glm;

/// Everything needed to draw one frame.
pub struct Frame<'a> {
    pub view_proj: glm::Mat4,
    pub model_matrix: glm::Mat4,
    pub lights: &'a Lights,
    /// Posed vertices, ordered to match the uploaded index buffer.
    /// Empty when no model is in the scene.
    pub vertices: &'a [Vertex],
    pub clear_color: [f32; 4],
}

pub trait RenderSurface {
    /// Current size of the host container (window client area)
    fn container_size(&self) -> (u32, u32);
    /// Size the drawing buffer is configured for
    fn size(&self) -> (u32, u32);
    fn set_size(&mut self, width: u32, height: u32);
    /// Upload static topology for a freshly loaded model
    fn upload_model(&mut self, model: &AvatarModel);
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError>;
    fn is_attached(&self) -> bool;
    /// Stop presenting into the host container
    fn detach(&mut self);
    /// Free graphics resources. The surface draws nothing afterwards.
    fn release(&mut self);
}

/// Uniform block shared by the vertex and fragment stages.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// rgb premultiplied by intensity
    pub ambient: [f32; 4],
    pub light_dir: [f32; 4],
    pub light_color: [f32; 4],
}

impl SceneUniform {
    pub fn from_frame(frame: &Frame<'_>) -> Self {
        let ambient = frame.lights.ambient;
        let sun = frame.lights.directional;
        let dir = sun.direction();
        Self {
            view_proj: frame.view_proj.into(),
            model: frame.model_matrix.into(),
            ambient: premultiply(ambient.color, ambient.intensity),
            light_dir: [dir.x, dir.y, dir.z, 0.0],
            light_color: premultiply(sun.color, sun.intensity),
        }
    }
}

fn premultiply(color: [f32; 3], intensity: f32) -> [f32; 4] {
    [
        color[0] * intensity,
        color[1] * intensity,
        color[2] * intensity,
        1.0,
    ]
}
