//! Inbound Telegram message, shaped after the Bot API `Message` object.
//!
//! Only the fields the bridge reads are declared; everything else is
//! ignored during decoding. teloxide messages are converted with
//! [`TgMessage::from_teloxide`] once, when the update enters the bridge.

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    #[serde(default)]
    pub from: Option<TgUser>,
    pub chat: TgChat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub audio: Option<TgFile>,
    #[serde(default)]
    pub document: Option<TgFile>,
    #[serde(default)]
    pub animation: Option<TgFile>,
    #[serde(default)]
    pub sticker: Option<TgSticker>,
    #[serde(default)]
    pub video: Option<TgFile>,
    #[serde(default)]
    pub video_note: Option<TgFile>,
    #[serde(default)]
    pub voice: Option<TgFile>,
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    #[serde(default)]
    pub new_chat_photo: Vec<PhotoSize>,
    #[serde(default)]
    pub dice: Option<Dice>,
    #[serde(default)]
    pub game: Option<Game>,
    #[serde(default)]
    pub poll: Option<Poll>,
    #[serde(default)]
    pub venue: Option<Venue>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub new_chat_members: Vec<TgUser>,
    #[serde(default)]
    pub left_chat_member: Option<TgUser>,
    #[serde(default)]
    pub new_chat_title: Option<String>,
    #[serde(default)]
    pub reply_to_message: Option<Box<TgMessage>>,
}

impl TgMessage {
    pub fn from_teloxide(message: &teloxide::types::Message) -> Result<Self> {
        let value = serde_json::to_value(message).context("Failed to serialize telegram message")?;
        serde_json::from_value(value).context("Failed to decode telegram message")
    }

    /// Text, falling back to the caption of media messages.
    pub fn text_or_caption(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.caption.as_deref().filter(|c| !c.is_empty()))
    }

    /// Lowercase name of the media the message carries, if any.
    pub fn media_label(&self) -> Option<&'static str> {
        if !self.photo.is_empty() {
            Some("photo")
        } else if self.video.is_some() {
            Some("video")
        } else if self.animation.is_some() {
            Some("animation")
        } else if self.audio.is_some() {
            Some("audio")
        } else if self.voice.is_some() {
            Some("voice")
        } else if self.video_note.is_some() {
            Some("video note")
        } else if self.sticker.is_some() {
            Some("sticker")
        } else if self.document.is_some() {
            Some("document")
        } else if self.location.is_some() {
            Some("location")
        } else if self.poll.is_some() {
            Some("poll")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl TgUser {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// Any downloadable attachment: audio, document, animation, video, voice...
#[derive(Debug, Clone, Deserialize)]
pub struct TgFile {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgSticker {
    pub file_id: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub is_animated: bool,
    #[serde(default)]
    pub is_video: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dice {
    pub emoji: String,
    pub value: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Game {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Poll {
    pub question: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollOption {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Venue {
    pub title: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub horizontal_accuracy: Option<f64>,
    #[serde(default)]
    pub heading: Option<u16>,
    #[serde(default)]
    pub proximity_alert_radius: Option<u32>,
}
