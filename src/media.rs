use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Known MIME types and the file extensions registered for them.
/// The first row for a MIME type is its preferred extension.
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpeg", "jpeg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/heic", "heic"),
    ("image/bmp", "bmp"),
    ("image/svg+xml", "svg"),
    ("video/mp4", "mp4"),
    ("video/quicktime", "mov"),
    ("video/webm", "webm"),
    ("video/x-matroska", "mkv"),
    ("video/3gpp", "3gp"),
    ("audio/mpeg", "mp3"),
    ("audio/ogg", "ogg"),
    ("audio/ogg", "oga"),
    ("audio/aac", "aac"),
    ("audio/mp4", "m4a"),
    ("audio/x-m4a", "m4a"),
    ("audio/wav", "wav"),
    ("audio/flac", "flac"),
    ("application/pdf", "pdf"),
    ("application/zip", "zip"),
    ("application/json", "json"),
    ("application/x-tgsticker", "tgs"),
    ("application/octet-stream", "bin"),
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("text/csv", "csv"),
];

pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Preferred file extension (without the dot) for a MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime_essence(mime);
    MIME_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == essence)
        .map(|(_, ext)| *ext)
}

/// MIME type guessed from the extension of a file name.
pub fn mime_for_file_name(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_lowercase();
    MIME_EXTENSIONS
        .iter()
        .find(|(_, known)| *known == ext)
        .map(|(mime, _)| *mime)
}

/// Strips parameters and normalises case: `"Image/PNG; q=1"` -> `"image/png"`.
fn mime_essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_lowercase()
}

/// Category a Telegram media group item is sent as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Audio,
    Photo,
    Video,
    Document,
}

impl MediaCategory {
    /// Decided by the MIME type prefix; anything unknown is a document.
    pub fn from_mime(mime: Option<&str>) -> Self {
        let mime = mime.map(mime_essence).unwrap_or_default();
        if mime.starts_with("audio/") {
            MediaCategory::Audio
        } else if mime.starts_with("image/") {
            MediaCategory::Photo
        } else if mime.starts_with("video/") {
            MediaCategory::Video
        } else {
            MediaCategory::Document
        }
    }
}

/// Filename for an attachment: the declared one verbatim, otherwise the id
/// with the extension registered for its MIME type.
pub fn attachment_file_name(filename: Option<&str>, id: &str, mime: Option<&str>) -> String {
    if let Some(name) = filename.filter(|name| !name.is_empty()) {
        return name.to_string();
    }

    let Some(ext) = mime.and_then(extension_for_mime) else {
        return id.to_string();
    };

    // signal-cli usually stores attachments as "<id>.<ext>" already
    if Path::new(id)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
    {
        return id.to_string();
    }

    format!("{}.{}", id, ext)
}

/// Fallback name `stem.ext` where the extension follows the declared MIME
/// type when one is known, `default_ext` otherwise.
pub fn fallback_file_name(stem: &str, mime: Option<&str>, default_ext: &str) -> String {
    let ext = mime.and_then(extension_for_mime).unwrap_or(default_ext);
    format!("{}.{}", stem, ext)
}

/// Encode a payload as the data string signal-cli accepts for attachments:
/// `data:<mime>;filename=<name>;base64,<payload>`.
pub fn data_uri(mime: Option<&str>, file_name: &str, bytes: &[u8]) -> String {
    let mime = mime
        .map(mime_essence)
        .filter(|m| !m.is_empty())
        .or_else(|| mime_for_file_name(file_name).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_MIME.to_string());
    format!(
        "data:{};filename={};base64,{}",
        mime,
        file_name,
        BASE64.encode(bytes)
    )
}
