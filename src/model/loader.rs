use crate::error::AvatarError;
use crate::model::decode::decode_gltf;
use crate::model::model::AvatarModel;
use async_trait::async_trait;
use std::path::Path;

/// Fetches and decodes an avatar model from a URL or local path.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<AvatarModel, AvatarError>;
}

/// glTF loader: `http(s)://` through reqwest, anything else from disk.
#[derive(Debug, Clone, Default)]
pub struct GltfLoader {
    client: reqwest::Client,
}

impl GltfLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelLoader for GltfLoader {
    async fn load(&self, url: &str) -> Result<AvatarModel, AvatarError> {
        log::info!("Loading model: {url}");
        let fetched = if is_remote(url) {
            download_model(&self.client, url).await
        } else {
            load_from_file(Path::new(url.trim_start_matches("file://"))).await
        };
        let bytes = fetched.map_err(AvatarError::into_model_load)?;

        // Decoding is CPU bound; keep it off the async workers
        tokio::task::spawn_blocking(move || decode_gltf(&bytes))
            .await
            .map_err(|e| AvatarError::ModelLoad(e.to_string()))?
            .map_err(AvatarError::into_model_load)
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Load model bytes from a local file
pub async fn load_from_file(path: &Path) -> Result<Vec<u8>, AvatarError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| AvatarError::Network(format!("{}: {}", path.display(), e)))
}

/// Download model bytes over HTTP
pub async fn download_model(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, AvatarError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AvatarError::Network(format!("Failed to download from {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(AvatarError::Http {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AvatarError::Network(format!("Failed to read response from {url}: {e}")))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MINIMAL: &str = r#"{"asset":{"version":"2.0"},"nodes":[{"name":"root"}]}"#;

    #[tokio::test]
    async fn downloads_and_decodes_remote_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robot.gltf"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MINIMAL))
            .expect(1)
            .mount(&server)
            .await;

        let model = GltfLoader::new()
            .load(&format!("{}/robot.gltf", server.uri()))
            .await
            .unwrap();
        assert_eq!(model.nodes.len(), 1);
        assert_eq!(model.roots, vec![0]);
    }

    #[tokio::test]
    async fn http_failure_becomes_model_load_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = GltfLoader::new()
            .load(&format!("{}/missing.glb", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, AvatarError::ModelLoad(_)));
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[tokio::test]
    async fn loads_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let url = file.path().to_str().unwrap().to_string();

        let model = GltfLoader::new().load(&url).await.unwrap();
        assert_eq!(model.nodes[0].name, "root");
    }

    #[tokio::test]
    async fn missing_local_file_reports_path() {
        let err = GltfLoader::new()
            .load("/nonexistent/avatar.glb")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error loading 3D model:"));
        assert!(err.to_string().contains("/nonexistent/avatar.glb"));
    }

    #[tokio::test]
    async fn corrupt_payload_is_a_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"glTF\x02\x00".to_vec()))
            .mount(&server)
            .await;

        let err = GltfLoader::new()
            .load(&format!("{}/broken.glb", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, AvatarError::ModelLoad(_)));
    }
}
