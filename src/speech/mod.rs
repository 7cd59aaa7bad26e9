//! Speech collaborators: synthesis backends, capture, and the router that
//! picks a synthesiser and falls back to the system voice.

pub mod elevenlabs;
pub mod system;

pub use elevenlabs::{AudioPlayer, CommandPlayer, ElevenLabsConfig, ElevenLabsSpeech};
pub use system::{CommandCapture, SystemSpeech};

use crate::error::AvatarError;
use crate::settings::AvatarConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Speaks text aloud; resolves when playback has finished.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), AvatarError>;
}

/// Captures one utterance and returns its transcript.
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    async fn capture_utterance(&self) -> Result<String, AvatarError>;
}

/// Primary synthesiser when configured, system voice otherwise or on failure.
pub struct SpeechRouter {
    primary: Option<Arc<dyn SpeechSynthesizer>>,
    fallback: Arc<dyn SpeechSynthesizer>,
}

impl SpeechRouter {
    pub fn new(
        primary: Option<Arc<dyn SpeechSynthesizer>>,
        fallback: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// ElevenLabs when a TTS key is present, system speech otherwise.
    pub fn from_config(config: &AvatarConfig) -> Self {
        let primary = config.tts_api_key.as_ref().map(|key| {
            let speech = ElevenLabsSpeech::new(ElevenLabsConfig::new(key.clone()));
            Arc::new(speech) as Arc<dyn SpeechSynthesizer>
        });
        if primary.is_none() {
            log::info!("No ElevenLabs key configured; using system speech");
        }
        Self::new(primary, Arc::new(SystemSpeech::new()))
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechRouter {
    async fn speak(&self, text: &str) -> Result<(), AvatarError> {
        if let Some(primary) = &self.primary {
            match primary.speak(text).await {
                Ok(()) => return Ok(()),
                Err(e) => log::warn!("TTS error: {e}; falling back to system speech"),
            }
        }
        self.fallback.speak(text).await
    }
}
