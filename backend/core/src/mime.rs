//! MIME type detection for uploaded files.
//!
//! Magic bytes win over the file extension; the extension is only consulted
//! when the content signature is unknown.

use std::path::Path;

pub const PDF: &str = "application/pdf";
pub const PLAIN_TEXT: &str = "text/plain";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content signatures checked against the start of the payload.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF", PDF),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"II*\x00", "image/tiff"),
    (b"MM\x00*", "image/tiff"),
];

/// Detect the MIME type from content, then from the file name.
pub fn sniff_mime(bytes: &[u8], file_name: &str) -> &'static str {
    if let Some(mime) = sniff_signature(bytes) {
        return mime;
    }
    detect_by_extension(Path::new(file_name))
}

fn sniff_signature(bytes: &[u8]) -> Option<&'static str> {
    // RIFF....WEBP
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|(_, mime)| *mime)
}

/// Detect MIME type by file extension.
pub fn detect_by_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "bmp"          => "image/bmp",
        "tiff" | "tif" => "image/tiff",

        "pdf"          => PDF,
        "txt"          => PLAIN_TEXT,
        "md"           => "text/markdown",
        "csv"          => "text/csv",
        "html" | "htm" => "text/html",

        _              => OCTET_STREAM,
    }
}

pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// Types whose bytes are already the text.
pub fn is_plain_text(mime: &str) -> bool {
    matches!(mime, PLAIN_TEXT | "text/csv" | "text/markdown")
}
