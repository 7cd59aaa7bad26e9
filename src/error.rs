/// Errors surfaced by the avatar controller and its collaborators.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AvatarError {
    /// Fetching or decoding the avatar model failed. Recoverable by retry.
    #[error("Error loading 3D model: {0}")]
    ModelLoad(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("decode error: {0}")]
    Decode(String),

    /// Chat, speech synthesis or speech capture failed.
    #[error("{service} error: {message}")]
    Collaborator { service: &'static str, message: String },

    /// Required configuration is missing or unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AvatarError {
    pub fn collaborator(service: &'static str, message: impl ToString) -> Self {
        AvatarError::Collaborator {
            service,
            message: message.to_string(),
        }
    }

    /// Re-tag a transport or decode failure as a model load failure.
    pub fn into_model_load(self) -> Self {
        match self {
            AvatarError::ModelLoad(_) => self,
            other => AvatarError::ModelLoad(other.to_string()),
        }
    }

    /// Re-tag a transport failure as a failure of the named collaborator.
    pub fn into_collaborator(self, service: &'static str) -> Self {
        match self {
            AvatarError::Collaborator { .. } => self,
            other => AvatarError::collaborator(service, other),
        }
    }
}

/// Errors from the render surface. A render error ends the current frame.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    #[error("surface lost")]
    Lost,

    #[error("surface outdated")]
    Outdated,

    #[error("out of memory")]
    OutOfMemory,

    #[error("surface timeout")]
    Timeout,

    #[error("render error: {0}")]
    Other(String),
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(err: wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost => RenderError::Lost,
            wgpu::SurfaceError::Outdated => RenderError::Outdated,
            wgpu::SurfaceError::OutOfMemory => RenderError::OutOfMemory,
            wgpu::SurfaceError::Timeout => RenderError::Timeout,
            other => RenderError::Other(other.to_string()),
        }
    }
}

impl From<gltf::Error> for AvatarError {
    fn from(err: gltf::Error) -> Self {
        AvatarError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_load_message_carries_prefix() {
        let err = AvatarError::Http {
            status: 404,
            url: "http://host/robot.glb".into(),
        }
        .into_model_load();
        assert_eq!(
            err.to_string(),
            "Error loading 3D model: HTTP 404 from http://host/robot.glb"
        );
    }

    #[test]
    fn into_model_load_does_not_double_wrap() {
        let err = AvatarError::ModelLoad("bad".into()).into_model_load();
        assert_eq!(err.to_string(), "Error loading 3D model: bad");
    }

    #[test]
    fn collaborator_tagging_keeps_service() {
        let err = AvatarError::Network("refused".into()).into_collaborator("gemini");
        assert_eq!(err.to_string(), "gemini error: network error: refused");
    }
}
