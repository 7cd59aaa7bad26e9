use avatarvis::animation::PlaybackState;
use avatarvis::conversation::{ChatMessage, Sender};
use avatarvis::model::AvatarModel;
use avatarvis::settings::UiSettings;
use avatarvis::LoadState;

/// Requests raised by the overlay during one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Retry,
    Send(String),
    Voice,
}

/// Read-only state the overlay draws from.
pub struct UiView<'a> {
    pub load_state: &'a LoadState,
    pub messages: &'a [ChatMessage],
    pub model: Option<&'a AvatarModel>,
    pub playback: PlaybackState,
    pub clip_weights: Option<(f32, f32)>,
    pub speaking: bool,
    pub listening: bool,
    pub voice_available: bool,
}

pub struct Ui {
    pub settings: UiSettings,
    input: String,
}

impl Ui {
    pub fn new(settings: UiSettings) -> Self {
        Self {
            settings,
            input: String::new(),
        }
    }

    pub fn show(&mut self, ctx: &egui::Context, view: &UiView<'_>) -> Vec<UiAction> {
        let mut actions = Vec::new();

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                if ui
                    .button(if self.settings.show_chat_panel {
                        "✅ Chat"
                    } else {
                        "⬜ Chat"
                    })
                    .clicked()
                {
                    self.settings.show_chat_panel = !self.settings.show_chat_panel;
                    self.settings.save();
                }

                if ui
                    .button(if self.settings.show_model_info {
                        "✅ Model Info"
                    } else {
                        "⬜ Model Info"
                    })
                    .clicked()
                {
                    self.settings.show_model_info = !self.settings.show_model_info;
                    self.settings.save();
                }

                ui.separator();
                if view.speaking {
                    ui.colored_label(egui::Color32::from_rgb(102, 204, 102), "🔊 Speaking");
                } else if view.listening {
                    ui.colored_label(egui::Color32::GOLD, "🎤 Listening...");
                }
            });
        });

        if self.settings.show_chat_panel {
            self.show_chat_panel(ctx, view, &mut actions);
        }

        if self.settings.show_model_info {
            self.show_model_info_window(ctx, view);
        }

        match view.load_state {
            LoadState::Loading => show_loading(ctx),
            LoadState::Error(message) => {
                if show_load_error(ctx, message) {
                    actions.push(UiAction::Retry);
                }
            }
            LoadState::Ready => {}
        }

        actions
    }

    fn show_chat_panel(&mut self, ctx: &egui::Context, view: &UiView<'_>, actions: &mut Vec<UiAction>) {
        egui::SidePanel::right("chat_panel")
            .default_width(self.settings.chat_panel_width)
            .resizable(true)
            .show(ctx, |ui| {
                ui.heading("💬 Chat");
                ui.separator();

                // Leave room for the input row
                let history_height = (ui.available_height() - 40.0).max(0.0);
                egui::ScrollArea::vertical()
                    .max_height(history_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for message in view.messages {
                            show_message(ui, message);
                        }
                    });

                ui.separator();
                ui.horizontal(|ui| {
                    let edit = ui.add(
                        egui::TextEdit::singleline(&mut self.input)
                            .hint_text("Type your message...")
                            .desired_width(ui.available_width() - 90.0),
                    );
                    let submitted =
                        edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                    if (ui.button("Send").clicked() || submitted) && !self.input.trim().is_empty() {
                        actions.push(UiAction::Send(std::mem::take(&mut self.input)));
                        edit.request_focus();
                    }

                    let mic = ui
                        .add_enabled(
                            view.voice_available && !view.listening,
                            egui::Button::new("🎤"),
                        )
                        .on_disabled_hover_text("Set AVATAR_CAPTURE_CMD to enable voice input");
                    if mic.clicked() {
                        actions.push(UiAction::Voice);
                    }
                });
            });
    }

    fn show_model_info_window(&mut self, ctx: &egui::Context, view: &UiView<'_>) {
        egui::Window::new("ℹ️ Model Info")
            .open(&mut self.settings.show_model_info)
            .default_width(260.0)
            .show(ctx, |ui| {
                let Some(model) = view.model else {
                    ui.label("No model loaded");
                    return;
                };
                ui.label(format!("Name: {}", model.name));
                ui.label(format!("Nodes: {}", model.nodes.len()));
                ui.label(format!("Vertices: {}", model.vertex_count()));
                ui.label(format!("Triangles: {}", model.index_count() / 3));
                ui.separator();

                ui.label(egui::RichText::new("Clips").strong());
                for (index, clip) in model.clips.iter().enumerate() {
                    ui.label(format!("#{index} {} ({:.2}s)", clip.name, clip.duration));
                }
                ui.separator();

                let state = match view.playback {
                    PlaybackState::IdleActive => "Idle".to_string(),
                    PlaybackState::TalkingActive => "Talking".to_string(),
                    PlaybackState::Transitioning { target } => format!("Fading to {target:?}"),
                };
                ui.label(format!("State: {state}"));
                if let Some((idle, talking)) = view.clip_weights {
                    ui.add(egui::ProgressBar::new(idle).text(format!("idle {idle:.2}")));
                    ui.add(egui::ProgressBar::new(talking).text(format!("talking {talking:.2}")));
                }
            });
    }
}

fn show_message(ui: &mut egui::Ui, message: &ChatMessage) {
    let (who, color, align) = match message.sender {
        Sender::User => ("You", egui::Color32::from_rgb(64, 128, 255), egui::Align::Max),
        Sender::Bot => ("Assistant", egui::Color32::from_rgb(102, 204, 102), egui::Align::Min),
    };
    ui.with_layout(egui::Layout::top_down(align), |ui| {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(who).strong().color(color));
            ui.label(egui::RichText::new(message.time_label()).small().weak());
        });
        ui.label(message.text.as_str());
    });
    ui.add_space(6.0);
}

fn overlay_frame() -> egui::Frame {
    egui::Frame::new()
        .fill(egui::Color32::from_black_alpha(200))
        .corner_radius(egui::CornerRadius::same(8))
        .inner_margin(egui::Margin::same(16))
}

fn show_loading(ctx: &egui::Context) {
    egui::Area::new(egui::Id::new("loading_overlay"))
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            overlay_frame().show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(egui::RichText::new("Loading 3D Model...").color(egui::Color32::WHITE));
                });
            });
        });
}

/// Returns true when "Retry Loading" was clicked.
fn show_load_error(ctx: &egui::Context, message: &str) -> bool {
    let mut retry = false;
    egui::Area::new(egui::Id::new("load_error_overlay"))
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            overlay_frame().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(220, 38, 38), message);
                    ui.add_space(8.0);
                    retry = ui.button("Retry Loading").clicked();
                });
            });
        });
    retry
}
