use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::info;

use crate::telegram::TelegramApi;

const PERSONALIZED_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(32).unwrap();

/// Builds a bot client from a token.
pub type BotFactory = Box<dyn Fn(&str) -> Arc<dyn TelegramApi> + Send + Sync>;

/// The Telegram identity a Signal user's messages go out through.
#[derive(Clone)]
pub struct Outbound {
    pub bot: Arc<dyn TelegramApi>,
    /// Personalized bots speak as the user, so no attribution prefix.
    pub is_personalized: bool,
}

/// Default Telegram bot plus the per-Signal-user personalized bots.
pub struct BotRegistry {
    default: Arc<dyn TelegramApi>,
    tokens: HashMap<String, String>,
    factory: BotFactory,
    cache: Mutex<LruCache<String, Outbound>>,
}

impl BotRegistry {
    pub fn new(
        default: Arc<dyn TelegramApi>,
        tokens: HashMap<String, String>,
        factory: BotFactory,
    ) -> Self {
        Self {
            default,
            tokens,
            factory,
            cache: Mutex::new(LruCache::new(PERSONALIZED_CACHE_SIZE)),
        }
    }

    pub fn default_bot(&self) -> Arc<dyn TelegramApi> {
        Arc::clone(&self.default)
    }

    pub fn personalized_count(&self) -> usize {
        self.tokens.len()
    }

    /// Resolve the bot for a Signal user. Personalized bots are built on
    /// first use and kept for the lifetime of the process.
    pub async fn for_signal_user(&self, signal_uuid: &str) -> Outbound {
        let mut cache = self.cache.lock().await;
        if let Some(hit) = cache.get(signal_uuid) {
            return hit.clone();
        }

        let resolved = match self.tokens.get(signal_uuid) {
            Some(token) => {
                info!("Using personalized Telegram bot for Signal user {}", signal_uuid);
                Outbound {
                    bot: (self.factory)(token),
                    is_personalized: true,
                }
            }
            None => Outbound {
                bot: self.default_bot(),
                is_personalized: false,
            },
        };

        cache.put(signal_uuid.to_string(), resolved.clone());
        resolved
    }
}
