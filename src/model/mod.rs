pub mod animation;
pub mod decode;
pub mod loader;
pub mod model;

pub use animation::*;
pub use decode::decode_gltf;
pub use loader::{GltfLoader, ModelLoader};
pub use model::*;
