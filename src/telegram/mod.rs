pub mod client;
pub mod listener;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

use crate::media::MediaCategory;

/// Formatting applied to a range of an outgoing Telegram message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Bold,
    Italic,
    Strikethrough,
    Code,
    Spoiler,
    Blockquote,
}

/// A formatting entity. `offset` and `length` are UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

impl Entity {
    pub fn new(kind: EntityKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
        }
    }
}

/// An in-memory file uploaded along with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One item of a media group. Only the first item of a group carries the
/// caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub category: MediaCategory,
    pub file: Upload,
    pub caption: Option<String>,
    pub caption_entities: Vec<Entity>,
}

/// Outbound side of a Telegram bot identity.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, entities: &[Entity]) -> Result<()>;

    async fn send_sticker(&self, chat_id: i64, sticker: Upload) -> Result<()>;

    async fn send_media_group(&self, chat_id: i64, media: Vec<MediaItem>) -> Result<()>;

    /// Download a file by its Telegram file id.
    async fn download(&self, file_id: &str) -> Result<Vec<u8>>;
}
