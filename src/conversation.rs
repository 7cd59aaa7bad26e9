//! Chat turn orchestration: user message, reply, spoken reply.
//!
//! A turn runs as a tokio task. New messages go out over an unbounded channel
//! and the speaking flag over a `watch` channel; the UI thread drains both
//! each frame and forwards the flag to the avatar controller.

use crate::chat::ChatClient;
use crate::speech::{SpeechCapture, SpeechSynthesizer};
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};

pub const GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    pub fn new(id: u64, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
            timestamp: Local::now(),
        }
    }

    /// Local wall-clock time, e.g. `14:05:09`
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Message list shown in the chat panel, seeded with the greeting.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self {
            messages: vec![ChatMessage::new(1, Sender::Bot, GREETING)],
        }
    }
}

impl ChatHistory {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Move every delivered message into the history. Returns how many arrived.
    pub fn drain(&mut self, feed: &mut mpsc::UnboundedReceiver<ChatMessage>) -> usize {
        let before = self.messages.len();
        while let Ok(message) = feed.try_recv() {
            self.messages.push(message);
        }
        self.messages.len() - before
    }
}

/// UI-side ends of a conversation's channels.
pub struct ConversationFeed {
    pub messages: mpsc::UnboundedReceiver<ChatMessage>,
    pub speaking: watch::Receiver<bool>,
}

pub struct Conversation {
    chat: Arc<dyn ChatClient>,
    voice: Arc<dyn SpeechSynthesizer>,
    speaking: watch::Sender<bool>,
    messages: mpsc::UnboundedSender<ChatMessage>,
    // The greeting holds id 1
    next_id: AtomicU64,
}

impl Conversation {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        voice: Arc<dyn SpeechSynthesizer>,
    ) -> (Arc<Self>, ConversationFeed) {
        let (speaking, speaking_rx) = watch::channel(false);
        let (messages, messages_rx) = mpsc::unbounded_channel();
        let conversation = Arc::new(Self {
            chat,
            voice,
            speaking,
            messages,
            next_id: AtomicU64::new(2),
        });
        let feed = ConversationFeed {
            messages: messages_rx,
            speaking: speaking_rx,
        };
        (conversation, feed)
    }

    pub fn subscribe_speaking(&self) -> watch::Receiver<bool> {
        self.speaking.subscribe()
    }

    fn post(&self, sender: Sender, text: &str) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // The UI may already be gone during shutdown
        let _ = self.messages.send(ChatMessage::new(id, sender, text));
    }

    /// Run one turn. Blank input is ignored; chat and speech failures are
    /// logged, and the speaking flag is always lowered afterwards.
    pub async fn submit(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.post(Sender::User, text);

        let reply = match self.chat.send_message(text).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                log::error!("Error: No response from chat service");
                return;
            }
            Err(e) => {
                log::error!("Error: {e}");
                return;
            }
        };
        self.post(Sender::Bot, &reply);

        self.speaking.send_replace(true);
        if let Err(e) = self.voice.speak(&reply).await {
            log::error!("TTS error: {e}");
        }
        self.speaking.send_replace(false);
    }

    /// Capture one spoken utterance and submit its transcript.
    pub async fn submit_voice(&self, capture: &dyn SpeechCapture) {
        match capture.capture_utterance().await {
            Ok(transcript) => {
                log::info!("Heard: {transcript}");
                self.submit(&transcript).await;
            }
            Err(e) => log::error!("Speech recognition error: {e}"),
        }
    }
}
