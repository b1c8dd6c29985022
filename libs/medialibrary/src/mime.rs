//! MIME type detection
//!
//! Content signatures win; the extension table is the fallback when the
//! bytes are not recognised.

use image::ImageFormat;

/// Type reported when neither content nor extension is recognised
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Number of leading bytes [`sniff`] needs to see
pub const SNIFF_LEN: usize = 512;

/// Guess a MIME type from the file extension alone
pub fn from_extension(file_name: &str) -> &'static str {
    match crate::path::extension(file_name).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "pdf" => "application/pdf",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// Recognise a MIME type from leading content bytes
pub fn sniff(head: &[u8]) -> Option<&'static str> {
    if let Ok(format) = image::guess_format(head) {
        if let Some(mime) = image_mime(format) {
            return Some(mime);
        }
    }

    if head.starts_with(b"%PDF-") {
        return Some("application/pdf");
    }
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return Some("video/mp4");
    }
    if head.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some("video/webm");
    }
    if head.starts_with(b"ID3") || head.starts_with(&[0xFF, 0xFB]) || head.starts_with(&[0xFF, 0xF3])
    {
        return Some("audio/mpeg");
    }
    if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"WAVE" {
        return Some("audio/wav");
    }
    if head.starts_with(b"OggS") {
        return Some("audio/ogg");
    }
    if looks_like_svg(head) {
        return Some("image/svg+xml");
    }

    None
}

/// Sniff the content, falling back to the extension table
pub fn detect(head: &[u8], file_name: &str) -> &'static str {
    sniff(head).unwrap_or_else(|| from_extension(file_name))
}

fn image_mime(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        ImageFormat::Ico => Some("image/x-icon"),
        ImageFormat::Avif => Some("image/avif"),
        _ => None,
    }
}

fn looks_like_svg(head: &[u8]) -> bool {
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}
