//! MIME type defaults derived from file extensions.

/// MIME type used when the extension is unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Returns the MIME type for a file name based on its extension.
///
/// Only the types the storage backend signs for are recognized; anything
/// else falls back to [`DEFAULT_MIME_TYPE`].
pub fn sniff_mime_type(file_name: &str) -> &'static str {
    let ext = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return DEFAULT_MIME_TYPE,
    };

    match ext.as_str() {
        "html" | "htm" => "text/html",
        "js" => "text/js",
        "css" => "text/css",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "zip" => "application/zip",
        "pdf" => "application/pdf",
        "doc" => "application/doc",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "mp3" => "audio/mp3",
        "wav" => "audio/wav",
        _ => DEFAULT_MIME_TYPE,
    }
}
