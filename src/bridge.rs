use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::accounts::BotRegistry;
use crate::mapping::ChatMap;
use crate::signal::SignalApi;

/// Everything both relay directions share. Built once in `main` and never
/// mutated afterwards (apart from the personalized bot cache).
pub struct Bridge {
    pub chats: ChatMap,
    pub bots: BotRegistry,
    pub signal: Arc<dyn SignalApi>,
    /// Root of the signal-cli sticker store: `<dir>/<pack id>/<sticker id>`.
    pub sticker_dir: PathBuf,
    /// Answer `/id` instead of relaying it.
    pub id_command: bool,
    /// Pause between empty Signal polls.
    pub idle_delay: Duration,
    /// Pause before a failed listener loop is started again.
    pub restart_delay: Duration,
}

impl Bridge {
    pub fn new(
        chats: ChatMap,
        bots: BotRegistry,
        signal: Arc<dyn SignalApi>,
        sticker_dir: PathBuf,
        id_command: bool,
    ) -> Self {
        Self {
            chats,
            bots,
            signal,
            sticker_dir,
            id_command,
            idle_delay: Duration::from_millis(500),
            restart_delay: Duration::from_secs(5),
        }
    }
}
