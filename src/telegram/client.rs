use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    FileId, InputFile, InputMedia, InputMediaAudio, InputMediaDocument, InputMediaPhoto,
    InputMediaVideo, MessageEntity, MessageEntityKind,
};
use tracing::debug;

use crate::media::MediaCategory;
use crate::telegram::{Entity, EntityKind, MediaItem, TelegramApi, Upload};

fn to_message_entity(entity: &Entity) -> MessageEntity {
    let kind = match entity.kind {
        EntityKind::Bold => MessageEntityKind::Bold,
        EntityKind::Italic => MessageEntityKind::Italic,
        EntityKind::Strikethrough => MessageEntityKind::Strikethrough,
        EntityKind::Code => MessageEntityKind::Code,
        EntityKind::Spoiler => MessageEntityKind::Spoiler,
        EntityKind::Blockquote => MessageEntityKind::Blockquote,
    };
    MessageEntity {
        kind,
        offset: entity.offset,
        length: entity.length,
    }
}

fn to_message_entities(entities: &[Entity]) -> Vec<MessageEntity> {
    entities.iter().map(to_message_entity).collect()
}

fn to_input_file(upload: Upload) -> InputFile {
    InputFile::memory(upload.bytes).file_name(upload.file_name)
}

fn to_input_media(item: MediaItem) -> InputMedia {
    let file = to_input_file(item.file);
    let entities = to_message_entities(&item.caption_entities);
    let caption = item.caption;

    match item.category {
        MediaCategory::Photo => {
            let mut media = InputMediaPhoto::new(file);
            if let Some(caption) = caption {
                media = media.caption(caption).caption_entities(entities);
            }
            InputMedia::Photo(media)
        }
        MediaCategory::Video => {
            let mut media = InputMediaVideo::new(file);
            if let Some(caption) = caption {
                media = media.caption(caption).caption_entities(entities);
            }
            InputMedia::Video(media)
        }
        MediaCategory::Audio => {
            let mut media = InputMediaAudio::new(file);
            if let Some(caption) = caption {
                media = media.caption(caption).caption_entities(entities);
            }
            InputMedia::Audio(media)
        }
        MediaCategory::Document => {
            let mut media = InputMediaDocument::new(file);
            if let Some(caption) = caption {
                media = media.caption(caption).caption_entities(entities);
            }
            InputMedia::Document(media)
        }
    }
}

#[async_trait]
impl TelegramApi for Bot {
    async fn send_text(&self, chat_id: i64, text: &str, entities: &[Entity]) -> Result<()> {
        let mut request = Requester::send_message(self, ChatId(chat_id), text);
        if !entities.is_empty() {
            request = request.entities(to_message_entities(entities));
        }
        request
            .await
            .with_context(|| format!("Failed to send message to chat {}", chat_id))?;
        Ok(())
    }

    async fn send_sticker(&self, chat_id: i64, sticker: Upload) -> Result<()> {
        Requester::send_sticker(self, ChatId(chat_id), to_input_file(sticker))
            .await
            .with_context(|| format!("Failed to send sticker to chat {}", chat_id))?;
        Ok(())
    }

    async fn send_media_group(&self, chat_id: i64, media: Vec<MediaItem>) -> Result<()> {
        let media: Vec<InputMedia> = media.into_iter().map(to_input_media).collect();
        Requester::send_media_group(self, ChatId(chat_id), media)
            .await
            .with_context(|| format!("Failed to send media group to chat {}", chat_id))?;
        Ok(())
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = Requester::get_file(self, FileId(file_id.to_string()))
            .await
            .with_context(|| format!("Failed to resolve file {}", file_id))?;

        debug!("Downloading telegram file {}", file.path);

        let mut buf: Vec<u8> = Vec::new();
        self.download_file(&file.path, &mut buf)
            .await
            .with_context(|| format!("Failed to download file {}", file_id))?;

        if buf.is_empty() {
            anyhow::bail!("Downloaded file {} is empty", file_id);
        }
        Ok(buf)
    }
}
