mod accounts;
mod bridge;
mod config;
mod mapping;
mod media;
mod signal;
mod telegram;
mod text;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::accounts::BotRegistry;
use crate::bridge::Bridge;
use crate::config::Config;
use crate::mapping::ChatMap;
use crate::signal::client::SignalRestClient;
use crate::telegram::TelegramApi;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bridgebot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let _ = dotenvy::dotenv();

    // Load configuration: a TOML file when given, the environment otherwise
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    match &config_path {
        Some(path) => info!("Loading configuration from: {}", path.display()),
        None => info!("Loading configuration from environment"),
    }
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Signal account: {}", config.signal.phone_number);
    info!("  signal-cli REST API: {}", config.signal.api_host);
    info!("  Sticker store: {}", config.signal.sticker_dir().display());
    info!("  /id command: {}", config.bridge.id_command);

    let chats = ChatMap::new(config.signal.chats.clone(), config.telegram.chats.clone())?;
    info!("  Bridged chats: {}", chats.len());

    let signal = SignalRestClient::new(&config.signal)?;
    signal.detect_groups().await?;

    let bot = Bot::new(&config.telegram.token);
    let bots = BotRegistry::new(
        Arc::new(bot.clone()),
        config.telegram.personalized_tokens.clone(),
        Box::new(|token: &str| Arc::new(Bot::new(token)) as Arc<dyn TelegramApi>),
    );
    info!("Personalized bots: {}", bots.personalized_count());

    let bridge = Arc::new(Bridge::new(
        chats,
        bots,
        Arc::new(signal),
        config.signal.sticker_dir(),
        config.bridge.id_command,
    ));

    info!("Bridge is starting...");
    let mut signal_task = tokio::spawn(signal::listener::run(Arc::clone(&bridge)));
    let mut telegram_task = tokio::spawn(telegram::listener::run(Arc::clone(&bridge), bot));

    // Both listeners restart themselves after failures, so one ending here
    // means it panicked or was shut down.
    let stopped = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            None
        }
        res = &mut signal_task => Some(("Signal", res)),
        res = &mut telegram_task => Some(("Telegram", res)),
    };

    signal_task.abort();
    telegram_task.abort();

    if let Some((side, res)) = stopped {
        if let Err(e) = &res {
            error!("{} listener task failed: {}", side, e);
        }
        anyhow::bail!("{} listener stopped unexpectedly", side);
    }

    Ok(())
}
