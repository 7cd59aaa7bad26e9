use crate::app::app::App;
use avatarvis::RenderError;
use avatarvis::settings::{AvatarConfig, Settings};
use std::sync::Arc;
use tokio::runtime::Runtime;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

pub struct AppHandler {
    pub app: Option<App>,
    pub config: AvatarConfig,
    pub runtime: Runtime,
}

impl AppHandler {
    pub fn new(config: AvatarConfig, runtime: Runtime) -> Self {
        Self {
            app: None,
            config,
            runtime,
        }
    }
}

impl ApplicationHandler for AppHandler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        let settings = Settings::load();
        let [width, height] = settings.ui.window_size;
        let window_attrs = Window::default_attributes()
            .with_title("avatarvis-rs - AI Avatar Chat")
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        // Adapter and device requests are executor agnostic
        let handle = self.runtime.handle().clone();
        match pollster::block_on(App::new(window, &self.config, settings, handle)) {
            Ok(app) => self.app = Some(app),
            Err(e) => {
                log::error!("Failed to initialise renderer: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(app) = &mut self.app {
            let response = app.handle_event(&event);
            if response.repaint {
                app.window.request_redraw();
            }
            if response.exit {
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(app) = &mut self.app {
            match app.render() {
                Ok(()) => {}
                Err(RenderError::Lost | RenderError::Outdated) => app.reconfigure(),
                Err(e) => log::error!("Render error: {e}"),
            }
            app.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Drop the controller (and its GPU state) before the runtime goes away
        self.app = None;
    }
}
