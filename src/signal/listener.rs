//! Signal -> Telegram direction.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::bridge::Bridge;
use crate::media::{attachment_file_name, MediaCategory};
use crate::signal::types::{DataMessage, Envelope, Received, Sticker, TextStyle};
use crate::telegram::{Entity, EntityKind, MediaItem, Upload};
use crate::text::{add_quote, utf16_len};

/// Poll signal-cli and relay every envelope, one at a time. A failure drops
/// the envelope being handled; the rest of its batch is kept and polling
/// resumes after `restart_delay`.
pub async fn run(bridge: Arc<Bridge>) {
    info!("Starting Signal listener...");

    let mut pending = VecDeque::new();
    loop {
        if let Err(e) = relay(&bridge, &mut pending).await {
            error!(
                "Signal listener failed: {:#}, restarting in {:?}",
                e, bridge.restart_delay
            );
            tokio::time::sleep(bridge.restart_delay).await;
        }
    }
}

async fn relay(bridge: &Bridge, pending: &mut VecDeque<Received>) -> Result<()> {
    loop {
        while let Some(received) = pending.pop_front() {
            handle_envelope(bridge, &received).await?;
        }

        let batch = bridge.signal.receive().await?;
        if batch.is_empty() {
            tokio::time::sleep(bridge.idle_delay).await;
            continue;
        }
        pending.extend(batch);
    }
}

pub async fn handle_envelope(bridge: &Bridge, received: &Received) -> Result<()> {
    let envelope = &received.envelope;

    let Some(data) = envelope.data_message.as_ref() else {
        return Ok(());
    };

    let Some(group_id) = data.group_id() else {
        debug!("Skipping direct message from {}", envelope.sender_uuid());
        return Ok(());
    };

    let Some(chat_id) = bridge.chats.telegram_for(group_id) else {
        warn!("Got a message from unknown group: {}", group_id);
        return Ok(());
    };

    if data.reaction.is_some() {
        debug!("Skipping reaction in SIGNAL:{}", group_id);
        return Ok(());
    }

    if let Some(sticker) = &data.sticker {
        return forward_sticker(bridge, chat_id, group_id, envelope, sticker).await;
    }

    forward_message(bridge, chat_id, group_id, envelope, data).await
}

fn sticker_path(sticker_dir: &Path, sticker: &Sticker) -> Option<PathBuf> {
    // Pack ids are hex strings; anything else must not reach the filesystem.
    if sticker.pack_id.is_empty() || !sticker.pack_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(
        sticker_dir
            .join(&sticker.pack_id)
            .join(sticker.sticker_id.to_string()),
    )
}

async fn forward_sticker(
    bridge: &Bridge,
    chat_id: i64,
    group_id: &str,
    envelope: &Envelope,
    sticker: &Sticker,
) -> Result<()> {
    let outbound = bridge.bots.for_signal_user(envelope.sender_uuid()).await;
    let name = envelope.sender_name();

    let bytes = match sticker_path(&bridge.sticker_dir, sticker) {
        Some(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read sticker {}", path.display()))
            }
        },
        None => None,
    };

    let Some(bytes) = bytes else {
        warn!(
            "Sticker {}/{} not found locally, sending a notice to TG:{}",
            sticker.pack_id, sticker.sticker_id, chat_id
        );
        let notice = format!("{} Sent a sticker, but we can not forward it", name);
        return outbound.bot.send_text(chat_id, &notice, &[]).await;
    };

    info!(
        "Forwarding a sticker to TG:{} from SIGNAL:{}",
        chat_id, group_id
    );

    if !outbound.is_personalized {
        bridge
            .bots
            .default_bot()
            .send_text(chat_id, &format!("{}:", name), &[])
            .await?;
    }

    outbound
        .bot
        .send_sticker(
            chat_id,
            Upload {
                file_name: "sticker.png".to_string(),
                bytes,
            },
        )
        .await
}

/// Answer `/id` inside the Signal group. Returns true when the message was a
/// command and must not be relayed.
async fn handle_commands(
    bridge: &Bridge,
    group_id: &str,
    envelope: &Envelope,
    data: &DataMessage,
) -> Result<bool> {
    if data.body() != "/id" {
        return Ok(false);
    }

    let mut text = format!("your id: {}", envelope.sender_uuid());
    if let Some(quote) = &data.quote {
        text.push_str(&format!(
            "\nquoted user id: {}",
            quote.author_uuid.as_deref().unwrap_or("unknown")
        ));
    }

    bridge.signal.send(group_id, &text, &[]).await?;
    Ok(true)
}

/// Map Signal text styles onto Telegram entities shifted by `offset`.
fn map_styles(offset: usize, styles: &[TextStyle]) -> Vec<Entity> {
    let mut entities = Vec::with_capacity(styles.len());
    for style in styles {
        match style.entity_kind() {
            Some(kind) => {
                entities.push(Entity::new(kind, offset + style.start, style.length))
            }
            None => warn!(
                "Unknown style {} ({}+{})",
                style.style, style.start, style.length
            ),
        }
    }
    entities
}

/// Build the Telegram text for a Signal message: attribution prefix, quoted
/// block, then the body, with entities measured against the result.
pub fn compose(prefix: &str, data: &DataMessage) -> (String, Vec<Entity>) {
    let mut head = prefix.to_string();
    let mut entities = Vec::new();

    if let Some(quote) = &data.quote {
        let quote_text = match quote.text.as_deref().filter(|t| !t.is_empty()) {
            Some(text) => text.to_string(),
            None => format!("Message with {} attachments", quote.attachments.len()),
        };

        let started_at = utf16_len(&head);
        head.push_str(&add_quote(&quote_text));
        head.truncate(head.trim_end().len());
        let quote_end = utf16_len(&head);
        head.push('\n');

        entities.push(Entity::new(
            EntityKind::Blockquote,
            started_at,
            quote_end.saturating_sub(started_at),
        ));
    }

    entities.extend(map_styles(utf16_len(&head), &data.text_styles));

    let mut text = head;
    text.push_str(data.body());
    text.truncate(text.trim_end().len());

    (text, entities)
}

async fn build_media(
    bridge: &Bridge,
    data: &DataMessage,
    text: String,
    entities: Vec<Entity>,
) -> Result<Vec<MediaItem>> {
    let mut media = Vec::with_capacity(data.attachments.len());
    let mut pending_caption = Some((text, entities)).filter(|(text, _)| !text.is_empty());

    for attachment in &data.attachments {
        let bytes = bridge.signal.fetch_attachment(&attachment.id).await?;
        let mime = attachment.content_type.as_deref();
        let (caption, caption_entities) = match pending_caption.take() {
            Some((text, entities)) => (Some(text), entities),
            None => (None, Vec::new()),
        };

        media.push(MediaItem {
            category: MediaCategory::from_mime(mime),
            file: Upload {
                file_name: attachment_file_name(
                    attachment.filename.as_deref(),
                    &attachment.id,
                    mime,
                ),
                bytes,
            },
            caption,
            caption_entities,
        });
    }

    Ok(media)
}

async fn forward_message(
    bridge: &Bridge,
    chat_id: i64,
    group_id: &str,
    envelope: &Envelope,
    data: &DataMessage,
) -> Result<()> {
    if bridge.id_command && handle_commands(bridge, group_id, envelope, data).await? {
        return Ok(());
    }

    if data.body().is_empty() && data.attachments.is_empty() {
        debug!("Nothing to relay from SIGNAL:{}", group_id);
        return Ok(());
    }

    let outbound = bridge.bots.for_signal_user(envelope.sender_uuid()).await;
    let prefix = if outbound.is_personalized {
        String::new()
    } else {
        format!("{}: ", envelope.sender_name())
    };

    let (text, entities) = compose(&prefix, data);

    if !data.attachments.is_empty() {
        let media = build_media(bridge, data, text, entities).await?;
        info!(
            "Forwarding message with {} media to TG:{} from SIGNAL:{}",
            media.len(),
            chat_id,
            group_id
        );
        return outbound.bot.send_media_group(chat_id, media).await;
    }

    info!(
        "Forwarding a text message to TG:{} from SIGNAL:{}",
        chat_id, group_id
    );
    outbound.bot.send_text(chat_id, &text, &entities).await
}
