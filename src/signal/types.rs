//! Envelopes as delivered by the signal-cli REST API (`GET /v1/receive`).

use serde::Deserialize;

use crate::telegram::EntityKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Received {
    pub envelope: Envelope,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub source_uuid: Option<String>,
    #[serde(default)]
    pub source_number: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub data_message: Option<DataMessage>,
}

impl Envelope {
    /// Display name of the sender for attribution prefixes.
    pub fn sender_name(&self) -> &str {
        self.source_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.source_number.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn sender_uuid(&self) -> &str {
        self.source_uuid.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub group_info: Option<GroupInfo>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub quote: Option<Quote>,
    #[serde(default)]
    pub text_styles: Vec<TextStyle>,
    #[serde(default)]
    pub sticker: Option<Sticker>,
    #[serde(default)]
    pub reaction: Option<serde_json::Value>,
}

impl DataMessage {
    pub fn group_id(&self) -> Option<&str> {
        self.group_info.as_ref().map(|g| g.group_id.as_str())
    }

    pub fn body(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub group_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(default)]
    pub author_uuid: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<serde_json::Value>,
}

/// A styled range of the message body, in UTF-16 code units.
#[derive(Debug, Clone, Deserialize)]
pub struct TextStyle {
    pub style: String,
    pub start: usize,
    pub length: usize,
}

impl TextStyle {
    /// Telegram formatting for this style, `None` for styles Telegram lacks.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self.style.as_str() {
            "ITALIC" => Some(EntityKind::Italic),
            "STRIKETHROUGH" => Some(EntityKind::Strikethrough),
            "MONOSPACE" => Some(EntityKind::Code),
            "BOLD" => Some(EntityKind::Bold),
            "SPOILER" => Some(EntityKind::Spoiler),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sticker {
    pub pack_id: String,
    pub sticker_id: u64,
}
