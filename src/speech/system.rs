//! Platform speech commands: the system voice and an external transcriber.

use super::{SpeechCapture, SpeechSynthesizer};
use crate::error::AvatarError;
use async_trait::async_trait;

/// Speaks through the OS voice (`say` on macOS, `espeak` elsewhere).
pub struct SystemSpeech {
    program: String,
    args: Vec<String>,
}

impl SystemSpeech {
    pub fn new() -> Self {
        let program = if cfg!(target_os = "macos") {
            "say"
        } else {
            "espeak"
        };
        Self::with_command(program, &[])
    }

    pub fn with_command(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl Default for SystemSpeech {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for SystemSpeech {
    async fn speak(&self, text: &str) -> Result<(), AvatarError> {
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .status()
            .await
            .map_err(|e| AvatarError::collaborator("system speech", format!("{}: {e}", self.program)))?;
        if status.success() {
            Ok(())
        } else {
            Err(AvatarError::collaborator(
                "system speech",
                format!("{} exited with {status}", self.program),
            ))
        }
    }
}

/// Runs an external recogniser once and reads the transcript from stdout.
pub struct CommandCapture {
    program: String,
    args: Vec<String>,
}

impl CommandCapture {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Parse a whitespace separated command line such as `whisper-mic --once`.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        let args: Vec<&str> = parts.collect();
        Some(Self::new(program, &args))
    }
}

#[async_trait]
impl SpeechCapture for CommandCapture {
    async fn capture_utterance(&self) -> Result<String, AvatarError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| AvatarError::collaborator("speech capture", format!("{}: {e}", self.program)))?;
        if !output.status.success() {
            return Err(AvatarError::collaborator(
                "speech capture",
                format!("{} exited with {}", self.program, output.status),
            ));
        }
        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if transcript.is_empty() {
            return Err(AvatarError::collaborator("speech capture", "no speech detected"));
        }
        Ok(transcript)
    }
}
