//! Recording fakes for the platform clients.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::accounts::BotRegistry;
use crate::bridge::Bridge;
use crate::mapping::ChatMap;
use crate::signal::types::Received;
use crate::signal::SignalApi;
use crate::telegram::{Entity, MediaItem, TelegramApi, Upload};

#[derive(Debug, Clone, PartialEq)]
pub enum TelegramCall {
    Text {
        bot: String,
        chat_id: i64,
        text: String,
        entities: Vec<Entity>,
    },
    Sticker {
        bot: String,
        chat_id: i64,
        sticker: Upload,
    },
    MediaGroup {
        bot: String,
        chat_id: i64,
        media: Vec<MediaItem>,
    },
}

pub type CallLog = Arc<Mutex<Vec<TelegramCall>>>;

pub struct RecordingTelegram {
    name: String,
    log: CallLog,
    files: HashMap<String, Vec<u8>>,
}

impl RecordingTelegram {
    pub fn new(name: &str, log: CallLog) -> Self {
        Self {
            name: name.to_string(),
            log,
            files: HashMap::new(),
        }
    }

    pub fn named(name: &str) -> Self {
        Self::new(name, CallLog::default())
    }

    pub fn with_file(mut self, file_id: &str, bytes: &[u8]) -> Self {
        self.files.insert(file_id.to_string(), bytes.to_vec());
        self
    }

    fn record(&self, call: TelegramCall) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl TelegramApi for RecordingTelegram {
    async fn send_text(&self, chat_id: i64, text: &str, entities: &[Entity]) -> Result<()> {
        self.record(TelegramCall::Text {
            bot: self.name.clone(),
            chat_id,
            text: text.to_string(),
            entities: entities.to_vec(),
        });
        Ok(())
    }

    async fn send_sticker(&self, chat_id: i64, sticker: Upload) -> Result<()> {
        self.record(TelegramCall::Sticker {
            bot: self.name.clone(),
            chat_id,
            sticker,
        });
        Ok(())
    }

    async fn send_media_group(&self, chat_id: i64, media: Vec<MediaItem>) -> Result<()> {
        self.record(TelegramCall::MediaGroup {
            bot: self.name.clone(),
            chat_id,
            media,
        });
        Ok(())
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        match self.files.get(file_id) {
            Some(bytes) if !bytes.is_empty() => Ok(bytes.clone()),
            _ => anyhow::bail!("Downloaded file {} is empty", file_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalSend {
    pub group_id: String,
    pub text: String,
    pub attachments: Vec<String>,
}

#[derive(Default)]
pub struct RecordingSignal {
    sent: Mutex<Vec<SignalSend>>,
    attachments: HashMap<String, Vec<u8>>,
    inbox: Mutex<VecDeque<Vec<Received>>>,
}

impl RecordingSignal {
    pub fn with_attachment(mut self, id: &str, bytes: &[u8]) -> Self {
        self.attachments.insert(id.to_string(), bytes.to_vec());
        self
    }

    pub fn with_batch(self, batch: Vec<Received>) -> Self {
        self.inbox.lock().unwrap().push_back(batch);
        self
    }

    pub fn sent(&self) -> Vec<SignalSend> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalApi for RecordingSignal {
    async fn send(&self, group_id: &str, text: &str, attachments: &[String]) -> Result<()> {
        self.sent.lock().unwrap().push(SignalSend {
            group_id: group_id.to_string(),
            text: text.to_string(),
            attachments: attachments.to_vec(),
        });
        Ok(())
    }

    async fn receive(&self) -> Result<Vec<Received>> {
        match self.inbox.lock().unwrap().pop_front() {
            Some(batch) => Ok(batch),
            None => anyhow::bail!("inbox drained"),
        }
    }

    async fn fetch_attachment(&self, attachment_id: &str) -> Result<Vec<u8>> {
        match self.attachments.get(attachment_id) {
            Some(bytes) => Ok(bytes.clone()),
            None => anyhow::bail!("Signal attachment {} is empty", attachment_id),
        }
    }
}

/// A bridge between Signal group "G1" and Telegram chat -1001 where the
/// Signal user "uuid-alice" has a personalized bot.
pub struct Harness {
    pub bridge: Bridge,
    pub calls: CallLog,
    pub signal: Arc<RecordingSignal>,
}

impl Harness {
    pub fn new(signal: RecordingSignal) -> Self {
        Self::with_default_bot(signal, |bot| bot)
    }

    /// Like [`Harness::new`], letting the caller stock the default bot with
    /// downloadable files.
    pub fn with_default_bot<F>(signal: RecordingSignal, stock: F) -> Self
    where
        F: FnOnce(RecordingTelegram) -> RecordingTelegram,
    {
        let calls = CallLog::default();
        let default = stock(RecordingTelegram::new("default", calls.clone()));

        let mut tokens = HashMap::new();
        tokens.insert("uuid-alice".to_string(), "alice-bot".to_string());
        let factory_log = calls.clone();
        let bots = BotRegistry::new(
            Arc::new(default),
            tokens,
            Box::new(move |token: &str| {
                Arc::new(RecordingTelegram::new(token, factory_log.clone())) as Arc<dyn TelegramApi>
            }),
        );

        let signal = Arc::new(signal);
        let chats = ChatMap::new(vec!["G1".to_string()], vec![-1001]).unwrap();
        let mut bridge = Bridge::new(
            chats,
            bots,
            signal.clone(),
            PathBuf::from("/nonexistent/stickers"),
            true,
        );
        bridge.idle_delay = Duration::from_millis(1);
        bridge.restart_delay = Duration::from_millis(1);

        Self {
            bridge,
            calls,
            signal,
        }
    }

    pub fn calls(&self) -> Vec<TelegramCall> {
        self.calls.lock().unwrap().clone()
    }
}
