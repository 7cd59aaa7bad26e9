//! Avatar rendering and animation controller.
//!
//! Owns the scene, camera, orbit controls and the loaded model's mixer, and
//! drives the idle/talking crossfade from the external speaking flag.
//!
//! Lifecycle:
//! - construction issues exactly one asynchronous model load
//! - `poll_load` / `loaded` apply its result (`Loading -> Ready | Error`)
//! - `retry` re-issues the load from `Error` only
//! - `dispose` tears everything down; later calls are inert
//!
//! The load task reports through a oneshot channel tagged with the generation
//! it was issued for. Disposal and retry drop the receiver, so a late result
//! has nowhere to go and never touches a torn-down scene.

use crate::animation::{
    AnimationMixer, LoopMode, PlaybackState, SpeakingCrossfade, Stance, world_matrices,
};
use crate::error::{AvatarError, RenderError};
use crate::model::{AvatarModel, ModelLoader};
use crate::renderer::{Frame, RenderSurface, Vertex};
use crate::scene::{Lights, OrbitControls, PerspectiveCamera, Scene, skin_vertices};
use crate::settings::SceneSettings;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Clip slots, taken positionally from the model's animation list
pub const IDLE_CLIP: usize = 0;
pub const TALKING_CLIP: usize = 1;

pub type LoadCallback = Box<dyn FnMut() + Send>;
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Error(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Error(message) => Some(message),
            _ => None,
        }
    }
}

pub struct ControllerOptions {
    pub model_url: String,
    pub is_speaking: bool,
    pub settings: SceneSettings,
    pub on_load: Option<LoadCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl ControllerOptions {
    pub fn new(model_url: impl Into<String>) -> Self {
        Self {
            model_url: model_url.into(),
            is_speaking: false,
            settings: SceneSettings::default(),
            on_load: None,
            on_error: None,
        }
    }

    pub fn with_speaking(mut self, is_speaking: bool) -> Self {
        self.is_speaking = is_speaking;
        self
    }

    pub fn with_settings(mut self, settings: SceneSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn on_load(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_load = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }
}

type LoadResult = Result<AvatarModel, AvatarError>;

struct PendingLoad {
    generation: u64,
    receiver: oneshot::Receiver<LoadResult>,
}

pub struct AvatarController<S: RenderSurface> {
    surface: S,
    loader: Arc<dyn ModelLoader>,
    runtime: Handle,
    settings: SceneSettings,
    model_url: String,
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    mixer: Option<AnimationMixer>,
    crossfade: SpeakingCrossfade,
    speaking: bool,
    load_state: LoadState,
    generation: u64,
    pending: Option<PendingLoad>,
    on_load: Option<LoadCallback>,
    on_error: Option<ErrorCallback>,
    vertices: Vec<Vertex>,
    disposed: bool,
}

impl<S: RenderSurface> AvatarController<S> {
    pub fn new(
        options: ControllerOptions,
        mut surface: S,
        loader: Arc<dyn ModelLoader>,
        runtime: Handle,
    ) -> Self {
        let ControllerOptions {
            model_url,
            is_speaking,
            settings,
            on_load,
            on_error,
        } = options;

        let (width, height) = surface.container_size();
        if width > 0 && height > 0 && surface.size() != (width, height) {
            surface.set_size(width, height);
        }

        let camera = PerspectiveCamera::new(&settings, aspect_ratio(width, height));
        let controls = OrbitControls::new(&settings);
        let scene = Scene::new(Lights::from_settings(&settings));
        let crossfade = SpeakingCrossfade::new(settings.fade_duration);

        let mut controller = Self {
            surface,
            loader,
            runtime,
            settings,
            model_url,
            scene,
            camera,
            controls,
            mixer: None,
            crossfade,
            speaking: is_speaking,
            load_state: LoadState::Loading,
            generation: 0,
            pending: None,
            on_load,
            on_error,
            vertices: Vec::new(),
            disposed: false,
        };
        controller.start_load();
        controller
    }

    fn start_load(&mut self) {
        self.generation += 1;
        let (sender, receiver) = oneshot::channel();
        self.pending = Some(PendingLoad {
            generation: self.generation,
            receiver,
        });

        let loader = self.loader.clone();
        let url = self.model_url.clone();
        log::info!("Loading avatar model (attempt {}): {url}", self.generation);
        self.runtime.spawn(async move {
            let result = loader.load(&url).await;
            // A dropped receiver means the controller moved on; nothing to do
            let _ = sender.send(result);
        });
    }

    /// Apply a finished load if one is waiting. Never blocks.
    pub fn poll_load(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let result = match pending.receiver.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => Err(load_task_lost()),
        };
        let generation = pending.generation;
        self.pending = None;
        self.finish_load(generation, result);
    }

    /// Wait for the in-flight load, apply it, and return the resulting state.
    /// Returns immediately when nothing is pending.
    pub async fn loaded(&mut self) -> &LoadState {
        if let Some(pending) = self.pending.as_mut() {
            let generation = pending.generation;
            let result = (&mut pending.receiver)
                .await
                .unwrap_or_else(|_| Err(load_task_lost()));
            self.pending = None;
            self.finish_load(generation, result);
        }
        &self.load_state
    }

    fn finish_load(&mut self, generation: u64, result: LoadResult) {
        if self.disposed || generation != self.generation {
            log::debug!("Discarding stale model load (attempt {generation})");
            return;
        }
        match result {
            Ok(model) => self.install_model(model),
            Err(err) => {
                let message = err.into_model_load().to_string();
                log::error!("{message}");
                self.load_state = LoadState::Error(message.clone());
                if let Some(callback) = self.on_error.as_mut() {
                    callback(&message);
                }
            }
        }
    }

    fn install_model(&mut self, model: AvatarModel) {
        log::info!(
            "Avatar model '{}' ready: {} nodes, {} clips",
            model.name,
            model.nodes.len(),
            model.clips.len()
        );
        self.surface.upload_model(&model);

        let mut mixer = AnimationMixer::new(&model);
        if let Some(idle) = mixer.action_mut(IDLE_CLIP) {
            idle.set_effective_time_scale(1.0)
                .set_effective_weight(1.0)
                .set_loop(LoopMode::Repeat)
                .play();
        }
        self.mixer = Some(mixer);
        self.crossfade = SpeakingCrossfade::new(self.settings.fade_duration);
        self.scene.insert_model(model, self.settings.model_scale);
        self.load_state = LoadState::Ready;

        if let Some(callback) = self.on_load.as_mut() {
            callback();
        }

        // A flag raised while loading takes effect now
        if self.speaking {
            self.apply_stance(Stance::Talking);
        }
    }

    /// Re-issue the model load after a failure. No-op unless in `Error`.
    pub fn retry(&mut self) {
        if self.disposed || self.load_state.error().is_none() {
            return;
        }
        log::info!("Retrying model load: {}", self.model_url);
        self.scene.clear();
        self.mixer = None;
        self.vertices.clear();
        self.crossfade = SpeakingCrossfade::new(self.settings.fade_duration);
        self.load_state = LoadState::Loading;
        self.start_load();
    }

    /// Edge-triggered: only a change of the flag starts a crossfade.
    pub fn set_speaking(&mut self, speaking: bool) {
        if self.disposed || speaking == self.speaking {
            return;
        }
        self.speaking = speaking;
        self.apply_stance(Stance::from_speaking(speaking));
    }

    fn has_crossfade(&self) -> bool {
        self.mixer
            .as_ref()
            .is_some_and(|mixer| mixer.action_count() > TALKING_CLIP)
    }

    fn apply_stance(&mut self, stance: Stance) {
        if !self.has_crossfade() {
            return;
        }
        let restart = self.crossfade.request(stance);
        if let Some(action) = self
            .mixer
            .as_mut()
            .and_then(|mixer| mixer.action_mut(clip_for(stance)))
        {
            if restart || !action.is_running() {
                action.reset().play();
            }
        }
        self.sync_weights();
    }

    /// Push crossfade weights into the two actions; a settled blend stops the
    /// clip that faded out.
    fn sync_weights(&mut self) {
        if !self.has_crossfade() {
            return;
        }
        let settled = !matches!(self.crossfade.state(), PlaybackState::Transitioning { .. });
        let Some(mixer) = self.mixer.as_mut() else {
            return;
        };
        let (idle, talking) = self.crossfade.weights();
        for (index, weight) in [(IDLE_CLIP, idle), (TALKING_CLIP, talking)] {
            if let Some(action) = mixer.action_mut(index) {
                action.set_effective_weight(weight);
                if settled && weight <= 0.0 && action.is_running() {
                    action.stop();
                }
            }
        }
    }

    /// One frame: controls, pending load, crossfade and mixer, then draw.
    pub fn tick(&mut self) -> Result<(), RenderError> {
        if self.disposed {
            return Ok(());
        }
        self.controls.update(&mut self.camera);
        self.poll_load();

        let dt = self.settings.time_step;
        if self.has_crossfade() {
            self.crossfade.advance(dt);
            self.sync_weights();
        }
        if let Some(mixer) = self.mixer.as_mut() {
            mixer.update(dt);
        }
        self.pose_vertices();

        let frame = Frame {
            view_proj: self.camera.view_proj(),
            model_matrix: self.scene.model_matrix(),
            lights: self.scene.lights(),
            vertices: &self.vertices,
            clear_color: self.settings.clear_color,
        };
        self.surface.render(&frame)
    }

    fn pose_vertices(&mut self) {
        self.vertices.clear();
        let (Some(model), Some(mixer)) = (self.scene.model(), self.mixer.as_ref()) else {
            return;
        };
        let world = world_matrices(model, mixer.pose());
        skin_vertices(model, &world, &mut self.vertices);
    }

    /// Follow the host container size. Unchanged or zero sizes are ignored.
    pub fn handle_resize(&mut self) {
        if self.disposed {
            return;
        }
        let (width, height) = self.surface.container_size();
        if width == 0 || height == 0 || self.surface.size() == (width, height) {
            return;
        }
        self.camera.set_aspect(aspect_ratio(width, height));
        self.camera.update_projection_matrix();
        self.surface.set_size(width, height);
    }

    /// Tear down in order: resize reaction, surface attachment, scene, GPU
    /// resources, pending load and mixer. Safe to call repeatedly and while a
    /// load is in flight.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if self.surface.is_attached() {
            self.surface.detach();
        }
        self.scene.clear();
        self.surface.release();
        self.pending = None;
        self.mixer = None;
        self.vertices.clear();
        self.controls.set_enabled(false);
        log::info!("Avatar controller disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.crossfade.state()
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn model_url(&self) -> &str {
        &self.model_url
    }

    /// Effective (idle, talking) weights; `None` before a model is ready.
    pub fn clip_weights(&self) -> Option<(f32, f32)> {
        let mixer = self.mixer.as_ref()?;
        let weight = |index| mixer.action(index).map_or(0.0, |a| a.effective_weight());
        Some((weight(IDLE_CLIP), weight(TALKING_CLIP)))
    }

    pub fn mixer(&self) -> Option<&AnimationMixer> {
        self.mixer.as_ref()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

impl<S: RenderSurface> Drop for AvatarController<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn clip_for(stance: Stance) -> usize {
    match stance {
        Stance::Idle => IDLE_CLIP,
        Stance::Talking => TALKING_CLIP,
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

fn load_task_lost() -> AvatarError {
    AvatarError::ModelLoad("load task ended without a result".to_string())
}
