pub mod animation;
pub mod chat;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod model;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod speech;

pub use controller::{AvatarController, ControllerOptions, LoadState};
pub use error::{AvatarError, RenderError};
