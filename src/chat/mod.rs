//! Chat completion collaborators.

pub mod gemini;

pub use gemini::{GeminiChat, GeminiConfig};

use crate::error::AvatarError;
use async_trait::async_trait;

/// Sends one user message and returns the assistant's reply.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<String, AvatarError>;
}
