use winit::event_loop::{ControlFlow, EventLoop};

mod app;
mod ui;

use app::AppHandler;
use avatarvis::settings::AvatarConfig;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // First positional argument overrides the model URL
    let args: Vec<String> = std::env::args().collect();
    let config = AvatarConfig::load(&args);
    if let Err(e) = config.validate() {
        log::warn!("{e}; chat replies will fail");
    }
    log::info!("Avatar model: {}", config.model_url);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut handler = AppHandler::new(config, tokio::runtime::Runtime::new()?);
    event_loop.run_app(&mut handler)?;

    Ok(())
}
