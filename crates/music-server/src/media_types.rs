//! Recognized audio extensions and their MIME types.
//!
//! The table doubles as the scan allow-list; streaming consults it only to
//! pick a `Content-Type` and falls back to octet-stream for anything else.

use std::ffi::OsStr;
use std::path::Path;

/// Content type used for files outside the table.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Lowercase extension (without dot) to MIME type.
const AUDIO_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("flac", "audio/flac"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("m4a", "audio/mp4"),
];

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.to_ascii_lowercase())
}

fn lookup(ext: &str) -> Option<&'static str> {
    AUDIO_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// True when the file extension (any case) is a supported audio type.
pub fn is_supported(path: &Path) -> bool {
    lowercase_extension(path)
        .as_deref()
        .and_then(lookup)
        .is_some()
}

/// MIME type for a path, defaulting to [`FALLBACK_MIME`].
pub fn mime_for_path(path: &Path) -> &'static str {
    lowercase_extension(path)
        .as_deref()
        .and_then(lookup)
        .unwrap_or(FALLBACK_MIME)
}
