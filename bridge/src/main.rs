use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use bridge::telegram::grammers::GrammersFactory;
use bridge::{start_server, AppState, ClientManager, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("bridge=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("grammers_mtsender=warn".parse()?)
        .add_directive("grammers_session=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting Telegram bridge");

    let config = Config::load().await?;

    if config.api_key.is_none() {
        warn!("No API key configured - set BRIDGE_API_KEY to protect the bridge");
    }

    let factory = GrammersFactory::new(&config.session_dir, &config.session_name);
    info!("Session file: {}", factory.session_path().display());

    let telegram = Arc::new(ClientManager::new(Arc::new(factory)));
    if let Some(credentials) = config.telegram.clone() {
        telegram.configure(credentials).await;
    } else {
        info!("Waiting for credentials via POST /configure");
    }

    let state = AppState::new(telegram, config.api_key.clone());
    start_server(&config, state).await?;

    Ok(())
}
