use crate::ui::{Ui, UiAction, UiView};
use avatarvis::chat::{GeminiChat, GeminiConfig};
use avatarvis::conversation::{ChatHistory, Conversation, ConversationFeed};
use avatarvis::model::GltfLoader;
use avatarvis::renderer::{Overlay, RenderSurface, WgpuSurface};
use avatarvis::settings::{AvatarConfig, Settings};
use avatarvis::speech::{CommandCapture, SpeechCapture, SpeechRouter};
use avatarvis::{AvatarController, ControllerOptions, RenderError};
use egui_wgpu::ScreenDescriptor;
use egui_winit::State;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::window::Window;

pub struct EventResponse {
    pub repaint: bool,
    pub exit: bool,
}

/// Desktop host: one window, the avatar controller, and the chat overlay.
pub struct App {
    pub window: Arc<Window>,
    controller: AvatarController<WgpuSurface>,
    egui_ctx: egui::Context,
    egui_state: State,
    egui_wants_pointer: bool,
    ui: Ui,
    history: ChatHistory,
    feed: ConversationFeed,
    conversation: Arc<Conversation>,
    capture: Option<Arc<dyn SpeechCapture>>,
    listening: Arc<AtomicBool>,
    runtime: Handle,
}

impl App {
    pub async fn new(
        window: Arc<Window>,
        config: &AvatarConfig,
        settings: Settings,
        runtime: Handle,
    ) -> anyhow::Result<Self> {
        let surface = WgpuSurface::new(window.clone()).await?;

        let options = ControllerOptions::new(config.model_url.clone())
            .with_settings(settings.scene)
            .on_load(|| log::info!("Avatar ready"))
            .on_error(|message| log::warn!("Avatar unavailable: {message}"));
        let controller = AvatarController::new(
            options,
            surface,
            Arc::new(GltfLoader::new()),
            runtime.clone(),
        );

        let chat = Arc::new(GeminiChat::new(GeminiConfig::new(config.chat_api_key.clone())));
        let voice = Arc::new(SpeechRouter::from_config(config));
        let (conversation, feed) = Conversation::new(chat, voice);

        let capture = config
            .capture_command
            .as_deref()
            .and_then(CommandCapture::from_command_line)
            .map(|c| Arc::new(c) as Arc<dyn SpeechCapture>);

        let egui_ctx = egui::Context::default();
        let egui_state = State::new(
            egui_ctx.clone(),
            egui::viewport::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Ok(Self {
            window,
            controller,
            egui_ctx,
            egui_state,
            egui_wants_pointer: false,
            ui: Ui::new(settings.ui),
            history: ChatHistory::default(),
            feed,
            conversation,
            capture,
            listening: Arc::new(AtomicBool::new(false)),
            runtime,
        })
    }

    pub fn handle_event(&mut self, event: &WindowEvent) -> EventResponse {
        let egui_response = self.egui_state.on_window_event(&self.window, event);
        let ignored = EventResponse {
            repaint: egui_response.repaint,
            exit: false,
        };

        match event {
            WindowEvent::CloseRequested => {
                self.ui.settings.save();
                self.controller.dispose();
                return EventResponse {
                    repaint: false,
                    exit: true,
                };
            }
            WindowEvent::Resized(_) => {
                self.controller.handle_resize();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if self.egui_wants_pointer {
                    return ignored;
                }
                let pressed = *state == ElementState::Pressed;
                self.controller.controls_mut().on_mouse_button(*button, pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.egui_wants_pointer {
                    return ignored;
                }
                self.controller
                    .controls_mut()
                    .on_mouse_move((position.x, position.y));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if self.egui_wants_pointer {
                    return ignored;
                }
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                self.controller.controls_mut().on_scroll(lines);
            }
            _ => {}
        }

        ignored
    }

    /// Reconfigure the surface after it was lost or went stale.
    pub fn reconfigure(&mut self) {
        let (width, height) = self.controller.surface().container_size();
        self.controller.surface_mut().set_size(width, height);
    }

    pub fn render(&mut self) -> Result<(), RenderError> {
        self.history.drain(&mut self.feed.messages);
        if self.feed.speaking.has_changed().unwrap_or(false) {
            let speaking = *self.feed.speaking.borrow_and_update();
            self.controller.set_speaking(speaking);
        }

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let view = UiView {
            load_state: self.controller.load_state(),
            messages: self.history.messages(),
            model: self.controller.scene().model(),
            playback: self.controller.playback_state(),
            clip_weights: self.controller.clip_weights(),
            speaking: self.controller.is_speaking(),
            listening: self.listening.load(Ordering::Relaxed),
            voice_available: self.capture.is_some(),
        };
        let ui = &mut self.ui;
        let mut actions = Vec::new();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            actions = ui.show(ctx, &view);
        });

        // Update egui pointer state for next frame
        self.egui_wants_pointer = self.egui_ctx.wants_pointer_input();

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let size = self.window.inner_size();
        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: full_output.pixels_per_point,
        };
        self.controller.surface_mut().set_overlay(Overlay {
            paint_jobs,
            textures_delta: full_output.textures_delta,
            screen_descriptor,
        });

        for action in actions {
            self.apply(action);
        }

        self.controller.tick()
    }

    fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::Retry => self.controller.retry(),
            UiAction::Send(text) => {
                let conversation = self.conversation.clone();
                self.runtime.spawn(async move {
                    conversation.submit(&text).await;
                });
            }
            UiAction::Voice => {
                let Some(capture) = self.capture.clone() else {
                    return;
                };
                if self.listening.swap(true, Ordering::Relaxed) {
                    return;
                }
                let conversation = self.conversation.clone();
                let listening = self.listening.clone();
                self.runtime.spawn(async move {
                    conversation.submit_voice(capture.as_ref()).await;
                    listening.store(false, Ordering::Relaxed);
                });
            }
        }
    }
}
