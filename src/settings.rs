use crate::error::AvatarError;
use serde::{Deserialize, Serialize};

pub const CONFY_APP_NAME: &str = "avatarvis-rs";

pub const DEFAULT_MODEL_URL: &str =
    "https://threejs.org/examples/models/gltf/RobotExpressive/RobotExpressive.glb";

/// Explicit runtime configuration handed to the host at startup.
///
/// A missing `tts_api_key` is a normal value: it selects the system voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarConfig {
    pub chat_api_key: String,
    pub tts_api_key: Option<String>,
    pub model_url: String,
    /// External recogniser for voice input, e.g. `whisper-mic --once`
    #[serde(default)]
    pub capture_command: Option<String>,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            chat_api_key: String::new(),
            tts_api_key: None,
            model_url: DEFAULT_MODEL_URL.to_string(),
            capture_command: None,
        }
    }
}

impl AvatarConfig {
    /// Stored config, then environment overrides, then the command line.
    pub fn load(args: &[String]) -> Self {
        let stored: AvatarConfig = confy::load(CONFY_APP_NAME, "config").unwrap_or_default();
        stored.with_overrides(|key| std::env::var(key).ok(), args)
    }

    pub fn with_overrides(
        mut self,
        env: impl Fn(&str) -> Option<String>,
        args: &[String],
    ) -> Self {
        if let Some(key) = env("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
            self.chat_api_key = key;
        }
        if let Some(key) = env("ELEVENLABS_API_KEY").filter(|k| !k.is_empty()) {
            self.tts_api_key = Some(key);
        }
        if let Some(url) = env("AVATAR_MODEL_URL").filter(|u| !u.is_empty()) {
            self.model_url = url;
        }
        if let Some(command) = env("AVATAR_CAPTURE_CMD").filter(|c| !c.trim().is_empty()) {
            self.capture_command = Some(command);
        }
        if let Some(url) = args.get(1) {
            self.model_url = url.clone();
        }
        self.tts_api_key = self.tts_api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn has_chat_key(&self) -> bool {
        !self.chat_api_key.trim().is_empty()
    }

    /// Fails when the chat key is missing. The host still starts; chat turns fail.
    pub fn validate(&self) -> Result<(), AvatarError> {
        if !self.has_chat_key() {
            return Err(AvatarError::Config(
                "missing chat API key; set GEMINI_API_KEY".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scene, camera and animation constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSettings {
    pub fov_degrees: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub camera_position: [f32; 3],
    pub camera_target: [f32; 3],
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub model_scale: f32,
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    pub directional_color: [f32; 3],
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
    pub fade_duration: f32,
    pub time_step: f32,
    pub clear_color: [f32; 4],
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near_plane: 0.1,
            far_plane: 1000.0,
            camera_position: [0.0, 2.5, 4.2],
            camera_target: [0.0, 0.0, 0.0],
            damping_factor: 0.05,
            min_distance: 1.0,
            max_distance: 5.0,
            model_scale: 0.7,
            ambient_color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.5,
            directional_color: [1.0, 1.0, 1.0],
            directional_intensity: 1.0,
            directional_position: [0.0, 10.0, 10.0],
            fade_duration: 0.5,
            time_step: 0.016,
            clear_color: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl SceneSettings {
    pub fn load() -> Self {
        confy::load(CONFY_APP_NAME, "scene").unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    pub show_chat_panel: bool,
    #[serde(default)]
    pub show_model_info: bool,
    pub chat_panel_width: f32,
    pub window_size: [f64; 2],
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            show_chat_panel: true,
            show_model_info: false,
            chat_panel_width: 400.0,
            window_size: [1200.0, 800.0],
        }
    }
}

impl UiSettings {
    pub fn load() -> Self {
        confy::load(CONFY_APP_NAME, "ui").unwrap_or_default()
    }

    pub fn save(&self) {
        if let Err(e) = confy::store(CONFY_APP_NAME, "ui", self) {
            log::warn!("failed to store ui settings: {e}");
        }
    }
}

// Aggregate struct for convenience
pub struct Settings {
    pub scene: SceneSettings,
    pub ui: UiSettings,
}

impl Settings {
    pub fn load() -> Self {
        Self {
            scene: SceneSettings::load(),
            ui: UiSettings::load(),
        }
    }
}
