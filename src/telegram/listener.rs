//! Telegram -> Signal direction.

use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use tracing::{debug, error, info, warn};

use crate::bridge::Bridge;
use crate::media::{data_uri, fallback_file_name};
use crate::telegram::types::{Location, PhotoSize, TgMessage, TgUser};
use crate::telegram::TelegramApi;
use crate::text::{add_quote, capitalize};

/// Run the Telegram dispatcher until it is shut down. A failed start is
/// retried after `restart_delay`.
pub async fn run(bridge: Arc<Bridge>, bot: Bot) {
    info!("Starting Telegram listener...");

    while let Err(e) = dispatch(Arc::clone(&bridge), bot.clone()).await {
        error!(
            "Telegram listener failed: {:#}, restarting in {:?}",
            e, bridge.restart_delay
        );
        tokio::time::sleep(bridge.restart_delay).await;
    }
}

async fn dispatch(bridge: Arc<Bridge>, bot: Bot) -> Result<()> {
    bot.delete_webhook()
        .drop_pending_updates(true)
        .await
        .context("Failed to delete Telegram webhook")?;

    let handler = Update::filter_message().endpoint(on_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![bridge])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn on_message(msg: Message, bridge: Arc<Bridge>) -> Result<()> {
    let message = TgMessage::from_teloxide(&msg)?;
    handle_message(&bridge, &message).await
}

pub async fn handle_message(bridge: &Bridge, message: &TgMessage) -> Result<()> {
    let chat_id = message.chat.id;
    let Some(group_id) = bridge.chats.signal_for(chat_id) else {
        warn!("Got a message from unknown chat: {}", chat_id);
        return Ok(());
    };

    if bridge.id_command && handle_commands(bridge, message).await? {
        return Ok(());
    }

    let bot = bridge.bots.default_bot();
    let extracted = extract_message(bot.as_ref(), message).await?;
    let text = format!("{}: {}", extracted.prefix, extracted.text)
        .trim()
        .to_string();

    info!(
        "Forwarding a message with {} attachments to SIGNAL:{} from TG:{}",
        extracted.attachments.len(),
        group_id,
        chat_id
    );
    bridge
        .signal
        .send(group_id, &text, &extracted.attachments)
        .await
}

fn is_id_command(text: &str) -> bool {
    text == "/id" || text.starts_with("/id@")
}

/// Answer `/id` inside the Telegram chat. Returns true when the message was
/// a command and must not be relayed.
async fn handle_commands(bridge: &Bridge, message: &TgMessage) -> Result<bool> {
    let Some(text) = message.text.as_deref() else {
        return Ok(false);
    };
    if !is_id_command(text.trim()) {
        return Ok(false);
    }
    let Some(from) = &message.from else {
        return Ok(false);
    };

    let mut reply = format!("your id: {}", from.id);
    if let Some(quoted) = message
        .reply_to_message
        .as_deref()
        .and_then(|m| m.from.as_ref())
    {
        reply.push_str(&format!("\nquoted user id: {}", quoted.id));
    }

    bridge
        .bots
        .default_bot()
        .send_text(message.chat.id, &reply, &[])
        .await?;
    Ok(true)
}

struct Extracted {
    attachments: Vec<String>,
    prefix: String,
    text: String,
}

/// A file to download: (file id, file name, declared MIME type).
type FileRef<'a> = (&'a str, String, Option<&'a str>);

fn media_files(message: &TgMessage) -> Vec<FileRef<'_>> {
    let mut files = Vec::new();

    if let Some(audio) = &message.audio {
        let mime = audio.mime_type.as_deref();
        let name = audio
            .file_name
            .clone()
            .unwrap_or_else(|| fallback_file_name("audio", mime, "mp3"));
        files.push((audio.file_id.as_str(), name, mime));
    }

    // teloxide keeps only `animation` for GIFs; raw updates also carry `document`.
    if let Some(document) = message.document.as_ref().or(message.animation.as_ref()) {
        let mime = document.mime_type.as_deref();
        let name = document
            .file_name
            .clone()
            .or_else(|| message.animation.as_ref().and_then(|a| a.file_name.clone()))
            .unwrap_or_else(|| fallback_file_name("document", mime, "bin"));
        files.push((document.file_id.as_str(), name, mime));
    }

    if let Some(sticker) = &message.sticker {
        if !sticker.is_animated && !sticker.is_video {
            files.push((sticker.file_id.as_str(), "sticker.webp".to_string(), None));
        }
    }

    if let Some(video) = &message.video {
        let mime = video.mime_type.as_deref();
        let name = video
            .file_name
            .clone()
            .unwrap_or_else(|| fallback_file_name("video", mime, "mp4"));
        files.push((video.file_id.as_str(), name, mime));
    }

    if let Some(note) = &message.video_note {
        files.push((note.file_id.as_str(), "video_message.mp4".to_string(), None));
    }

    if let Some(voice) = &message.voice {
        let mime = voice.mime_type.as_deref();
        let name = fallback_file_name("audio_message", mime, "ogg");
        files.push((voice.file_id.as_str(), name, mime));
    }

    files
}

async fn download(
    bot: &dyn TelegramApi,
    file_id: &str,
    file_name: &str,
    mime: Option<&str>,
) -> Result<String> {
    let bytes = bot.download(file_id).await?;
    if bytes.is_empty() {
        anyhow::bail!("Downloaded file {} is empty", file_id);
    }
    Ok(data_uri(mime, file_name, &bytes))
}

/// The largest variant of a photo.
fn best_photo(photos: &[PhotoSize]) -> Option<&PhotoSize> {
    photos.iter().max_by_key(|p| p.file_size.unwrap_or(0))
}

fn format_location(location: &Location) -> String {
    let mut text = format!(
        "Location:\nlat: {}\nlong: {}",
        location.latitude, location.longitude
    );
    if let Some(accuracy) = location.horizontal_accuracy.filter(|a| *a != 0.0) {
        text.push_str(&format!("\naccuracy: {}", accuracy));
    }
    if let Some(heading) = location.heading.filter(|h| *h != 0) {
        text.push_str(&format!("\nheading_deg: {}", heading));
    }
    if let Some(radius) = location.proximity_alert_radius.filter(|r| *r != 0) {
        text.push_str(&format!("\nproximity_dist: {}", radius));
    }
    text
}

/// Text rendering for messages that carry no (meaningful) text of their own.
fn special_text(message: &TgMessage) -> Option<String> {
    if let Some(dice) = &message.dice {
        return Some(format!("{} ({})", dice.emoji, dice.value));
    }
    if let Some(game) = &message.game {
        return Some(format!("Game - {}", game.title));
    }
    if let Some(poll) = &message.poll {
        let options = poll
            .options
            .iter()
            .map(|o| format!("- {}", o.text))
            .collect::<Vec<_>>()
            .join("\n");
        return Some(format!("Poll - {}\n\n{}", poll.question, options));
    }
    if let Some(venue) = &message.venue {
        return Some(format!("Venue - {}\nAddress: {}", venue.title, venue.address));
    }
    if let Some(location) = &message.location {
        return Some(format_location(location));
    }
    if !message.new_chat_members.is_empty() {
        return Some(
            message
                .new_chat_members
                .iter()
                .map(|user| format!("Member {} joined", user.full_name()))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }
    if let Some(user) = &message.left_chat_member {
        return Some(format!("Member {} left the chat", user.full_name()));
    }
    if let Some(title) = &message.new_chat_title {
        return Some(format!("Chat was renamed to {}", title));
    }
    None
}

/// Quoted preview of the message being replied to.
fn reply_preview(reply: &TgMessage) -> String {
    let quoted = match reply.text_or_caption() {
        Some(text) => text.to_string(),
        None => capitalize(reply.media_label().unwrap_or("message")),
    };
    add_quote(&quoted)
}

async fn extract_message(bot: &dyn TelegramApi, message: &TgMessage) -> Result<Extracted> {
    let prefix = message
        .from
        .as_ref()
        .map(TgUser::full_name)
        .unwrap_or_else(|| "Unknown".to_string());

    let mut attachments = Vec::new();
    for (file_id, file_name, mime) in media_files(message) {
        attachments.push(download(bot, file_id, &file_name, mime).await?);
    }

    if let Some(photo) = best_photo(&message.photo) {
        attachments.push(download(bot, &photo.file_id, "photo.jpg", None).await?);
    }

    if let Some(photo) = best_photo(&message.new_chat_photo) {
        attachments.push(download(bot, &photo.file_id, "new_chat_photo.jpg", None).await?);
        return Ok(Extracted {
            attachments,
            prefix,
            text: "Chat photo was changed".to_string(),
        });
    }

    let mut text = special_text(message)
        .or_else(|| message.text_or_caption().map(str::to_string))
        .unwrap_or_default();

    if let Some(sticker) = message.sticker.as_ref().filter(|s| s.is_animated || s.is_video) {
        attachments.clear();
        text = format!("Animated sticker {}", sticker.emoji.as_deref().unwrap_or(""))
            .trim_end()
            .to_string();
    }

    if let Some(reply) = message.reply_to_message.as_deref() {
        text = format!("{}\n{}", reply_preview(reply), text);
    }

    Ok(Extracted {
        attachments,
        prefix,
        text,
    })
}
