//! MIME type detection based on file extensions.

use std::path::Path;

/// Extension to MIME type table used by `sendFile` and `Request::is`.
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("js", "application/javascript"),
    ("html", "text/html"),
    ("txt", "text/plain"),
    ("css", "text/css"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("gif", "image/gif"),
    ("png", "image/png"),
    ("json", "application/json"),
];

/// Returns the MIME type registered for a bare extension (without the dot).
///
/// Lookup is case-sensitive, matching the table exactly.
pub fn from_extension(ext: &str) -> Option<&'static str> {
    CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Returns the MIME type for a file path, or `None` when the extension is
/// missing or not in the table.
pub fn from_path(path: impl AsRef<Path>) -> Option<&'static str> {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(from_extension)
}
