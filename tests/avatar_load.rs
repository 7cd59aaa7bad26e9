use avatarvis::animation::PlaybackState;
use avatarvis::model::{AvatarModel, GltfLoader};
use avatarvis::renderer::{Frame, RenderSurface};
use avatarvis::{AvatarController, ControllerOptions, LoadState, RenderError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Keeps the first vertex of every rendered frame.
#[derive(Clone, Default)]
struct FrameLogSurface {
    frames: Arc<Mutex<Vec<Option<[f32; 3]>>>>,
    size: (u32, u32),
}

impl RenderSurface for FrameLogSurface {
    fn container_size(&self) -> (u32, u32) {
        (800, 600)
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn upload_model(&mut self, _model: &AvatarModel) {}

    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        let first = frame.vertices.first().map(|v| v.position);
        self.frames.lock().unwrap().push(first);
        Ok(())
    }

    fn is_attached(&self) -> bool {
        true
    }

    fn detach(&mut self) {}

    fn release(&mut self) {}
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// A one-triangle GLB whose root node slides to x=1 in "Idle" and x=2 in "Talking".
fn robot_glb() -> Vec<u8> {
    let mut bin = Vec::new();
    bin.extend(f32_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])); // 0..36
    bin.extend([0u32, 1, 2].iter().flat_map(|i| i.to_le_bytes())); // 36..48
    bin.extend(f32_bytes(&[0.0, 1.0])); // 48..56
    bin.extend(f32_bytes(&[1.0, 0.0, 0.0, 1.0, 0.0, 0.0])); // 56..80
    bin.extend(f32_bytes(&[2.0, 0.0, 0.0, 2.0, 0.0, 0.0])); // 80..104

    let json = serde_json::json!({
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"name": "Robot", "nodes": [0]}],
        "nodes": [{"name": "body", "mesh": 0}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
        "buffers": [{"byteLength": bin.len()}],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 12},
            {"buffer": 0, "byteOffset": 48, "byteLength": 8},
            {"buffer": 0, "byteOffset": 56, "byteLength": 24},
            {"buffer": 0, "byteOffset": 80, "byteLength": 24}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
             "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
            {"bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR"},
            {"bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR",
             "min": [0.0], "max": [1.0]},
            {"bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3"},
            {"bufferView": 4, "componentType": 5126, "count": 2, "type": "VEC3"}
        ],
        "animations": [
            {"name": "Idle",
             "channels": [{"sampler": 0, "target": {"node": 0, "path": "translation"}}],
             "samplers": [{"input": 2, "output": 3}]},
            {"name": "Talking",
             "channels": [{"sampler": 0, "target": {"node": 0, "path": "translation"}}],
             "samplers": [{"input": 2, "output": 4}]}
        ]
    });

    pack_glb(&json, bin)
}

fn pack_glb(json: &serde_json::Value, bin: Vec<u8>) -> Vec<u8> {
    let mut json = serde_json::to_vec(json).unwrap();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend(b"glTF");
    glb.extend(2u32.to_le_bytes());
    glb.extend((total as u32).to_le_bytes());
    glb.extend((json.len() as u32).to_le_bytes());
    glb.extend(b"JSON");
    glb.extend(json);
    glb.extend((bin.len() as u32).to_le_bytes());
    glb.extend(b"BIN\0");
    glb.extend(bin);
    glb
}

/// A skinned triangle whose joint and weight streams cover only one vertex.
fn short_skin_glb() -> Vec<u8> {
    let mut bin = f32_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]); // 0..36
    bin.extend([0u16; 4].iter().flat_map(|j| j.to_le_bytes())); // 36..44
    bin.extend(f32_bytes(&[1.0, 0.0, 0.0, 0.0])); // 44..60

    let json = serde_json::json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0, 1]}],
        "nodes": [{"name": "body", "mesh": 0, "skin": 0}, {"name": "hips"}],
        "skins": [{"joints": [1]}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0, "JOINTS_0": 1, "WEIGHTS_0": 2}}]}],
        "buffers": [{"byteLength": bin.len()}],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 8},
            {"buffer": 0, "byteOffset": 44, "byteLength": 16}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
             "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
            {"bufferView": 1, "componentType": 5123, "count": 1, "type": "VEC4"},
            {"bufferView": 2, "componentType": 5126, "count": 1, "type": "VEC4"}
        ]
    });
    pack_glb(&json, bin)
}

fn controller_for(
    url: String,
    surface: FrameLogSurface,
    loads: Arc<AtomicUsize>,
) -> AvatarController<FrameLogSurface> {
    let options = ControllerOptions::new(url).on_load(move || {
        loads.fetch_add(1, Ordering::SeqCst);
    });
    AvatarController::new(
        options,
        surface,
        Arc::new(GltfLoader::new()),
        tokio::runtime::Handle::current(),
    )
}

fn last_x(surface: &FrameLogSurface) -> f32 {
    let frames = surface.frames.lock().unwrap();
    frames
        .last()
        .copied()
        .flatten()
        .map(|p| p[0])
        .unwrap_or(f32::NAN)
}

#[tokio::test]
async fn served_robot_idles_then_talks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/RobotExpressive.glb"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(robot_glb()))
        .expect(1)
        .mount(&server)
        .await;

    let surface = FrameLogSurface::default();
    let loads = Arc::new(AtomicUsize::new(0));
    let mut controller = controller_for(
        format!("{}/RobotExpressive.glb", server.uri()),
        surface.clone(),
        loads.clone(),
    );

    // Nothing is drawn but the empty scene until the model arrives
    controller.tick().unwrap();
    assert_eq!(surface.frames.lock().unwrap().last(), Some(&None));

    assert_eq!(controller.loaded().await, &LoadState::Ready);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(controller.scene().model_scale(), 0.7);

    controller.tick().unwrap();
    assert!((last_x(&surface) - 1.0).abs() < 1e-4);
    assert_eq!(controller.clip_weights(), Some((1.0, 0.0)));

    controller.set_speaking(true);
    for _ in 0..40 {
        controller.tick().unwrap();
    }
    assert_eq!(controller.playback_state(), PlaybackState::TalkingActive);
    assert!((last_x(&surface) - 2.0).abs() < 1e-4);

    controller.set_speaking(false);
    for _ in 0..40 {
        controller.tick().unwrap();
    }
    assert_eq!(controller.playback_state(), PlaybackState::IdleActive);
    assert!((last_x(&surface) - 1.0).abs() < 1e-4);

    controller.dispose();
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_download_recovers_on_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(robot_glb()))
        .mount(&server)
        .await;

    let loads = Arc::new(AtomicUsize::new(0));
    let mut controller = controller_for(
        format!("{}/robot.glb", server.uri()),
        FrameLogSurface::default(),
        loads.clone(),
    );

    let message = controller
        .loaded()
        .await
        .error()
        .map(str::to_string)
        .unwrap_or_default();
    assert!(message.starts_with("Error loading 3D model:"));
    assert!(message.contains("503"));
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    controller.retry();
    assert!(controller.load_state().is_loading());
    assert!(controller.loaded().await.is_ready());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(controller.mixer().map(|m| m.action_count()), Some(2));
}

#[tokio::test]
async fn inconsistent_skin_is_a_load_error_not_a_crash() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(short_skin_glb()))
        .mount(&server)
        .await;

    let surface = FrameLogSurface::default();
    let loads = Arc::new(AtomicUsize::new(0));
    let mut controller = controller_for(
        format!("{}/skinned.glb", server.uri()),
        surface.clone(),
        loads.clone(),
    );

    let message = controller
        .loaded()
        .await
        .error()
        .map(str::to_string)
        .unwrap_or_default();
    assert!(message.starts_with("Error loading 3D model:"));
    assert!(message.contains("joint"));
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    controller.tick().unwrap();
    assert_eq!(surface.frames.lock().unwrap().last(), Some(&None));
}
