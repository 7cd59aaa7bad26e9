//! ElevenLabs text-to-speech.

use super::SpeechSynthesizer;
use crate::error::AvatarError;
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const SERVICE: &str = "ElevenLabs";

#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    /// Defaults to `https://api.elevenlabs.io`
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

impl ElevenLabsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.elevenlabs.io".to_string(),
            voice_id: "pNInz6obpgDQGcFmaJgB".to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }

    /// Set the base URL (useful for testing with mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }
}

/// Plays encoded audio; resolves when playback ends.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, audio: Vec<u8>) -> Result<(), AvatarError>;
}

/// Writes the clip to a temp file and runs a platform audio player on it.
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new() -> Self {
        if cfg!(target_os = "macos") {
            Self::with_command("afplay", &[])
        } else {
            Self::with_command("mpg123", &["-q"])
        }
    }

    pub fn with_command(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl Default for CommandPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, audio: Vec<u8>) -> Result<(), AvatarError> {
        // File creation and the write are blocking; keep them off the async workers
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            let mut file = tempfile::Builder::new()
                .prefix("avatarvis-")
                .suffix(".mp3")
                .tempfile()?;
            file.write_all(&audio)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(|e| AvatarError::collaborator(SERVICE, e))?
        .map_err(|e| AvatarError::collaborator(SERVICE, e))?;

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(file.path())
            .status()
            .await
            .map_err(|e| AvatarError::collaborator(SERVICE, format!("{}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(AvatarError::collaborator(
                SERVICE,
                format!("{} exited with {status}", self.program),
            ))
        }
    }
}

pub struct ElevenLabsSpeech {
    config: ElevenLabsConfig,
    client: reqwest::Client,
    player: Arc<dyn AudioPlayer>,
}

impl ElevenLabsSpeech {
    pub fn new(config: ElevenLabsConfig) -> Self {
        Self::with_player(config, Arc::new(CommandPlayer::new()))
    }

    pub fn with_player(config: ElevenLabsConfig, player: Arc<dyn AudioPlayer>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            player,
        }
    }

    /// Fetch the synthesised clip without playing it.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AvatarError> {
        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.voice_id
        );
        let body = serde_json::json!({
            "text": text,
            "model_id": self.config.model_id,
            "voice_settings": {
                "stability": self.config.stability,
                "similarity_boost": self.config.similarity_boost,
            },
        });

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AvatarError::collaborator(SERVICE, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(AvatarError::Http { status, url }.into_collaborator(SERVICE));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AvatarError::collaborator(SERVICE, e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSpeech {
    async fn speak(&self, text: &str) -> Result<(), AvatarError> {
        let audio = self.synthesize(text).await?;
        log::debug!("ElevenLabs clip: {} bytes", audio.len());
        self.player.play(audio).await
    }
}
