use engine::{LoopConfig, Scene};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{
    GameplayScene, GeneratorConfig, GeneratorError, OllamaGenerator, ThreadedReplyChannel,
    WorldSettings,
};

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error("failed to build generator client: {0}")]
    GeneratorClient(#[source] GeneratorError),
    #[error("failed to spawn reply worker thread: {0}")]
    ReplyWorker(#[source] std::io::Error),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== Zedla Startup ===");

    let generator_config = GeneratorConfig::from_env();
    let generator =
        OllamaGenerator::new(&generator_config).map_err(BootstrapError::GeneratorClient)?;
    info!(
        endpoint = generator.endpoint(),
        model = %generator_config.model,
        request_timeout_ms = generator_config.request_timeout.as_millis() as u64,
        "generator_configured"
    );
    let channel =
        ThreadedReplyChannel::spawn(Box::new(generator)).map_err(BootstrapError::ReplyWorker)?;

    let settings = WorldSettings::default();
    let config = LoopConfig {
        window_width: settings.screen_width as u32,
        window_height: settings.screen_height as u32,
        ..LoopConfig::default()
    };
    let scene = GameplayScene::new(settings, generator_config.reply_timeout(), Box::new(channel));

    Ok(AppWiring {
        config,
        scene: Box::new(scene),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
