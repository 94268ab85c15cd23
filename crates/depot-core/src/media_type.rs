//! Extension to content-type mapping.
//!
//! Covers the formats this system is commonly asked to serve; unknown
//! extensions return `None` and callers fall back to
//! `application/octet-stream`.

/// Look up the content type for a file extension (without the leading dot).
/// Case-insensitive.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let normalized = extension.to_ascii_lowercase();
    let content_type = match normalized.as_str() {
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "bin" => "application/octet-stream",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        _ => return None,
    };
    Some(content_type)
}

/// Content type for a filename, from its extension.
pub fn content_type_for_filename(filename: &str) -> Option<&'static str> {
    let extension = std::path::Path::new(filename).extension()?.to_str()?;
    content_type_for_extension(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(content_type_for_extension("html"), Some("text/html"));
        assert_eq!(content_type_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(content_type_for_extension("png"), Some("image/png"));
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(content_type_for_extension("xyz"), None);
        assert_eq!(content_type_for_extension(""), None);
    }

    #[test]
    fn test_filename_lookup() {
        assert_eq!(content_type_for_filename("hello.html"), Some("text/html"));
        assert_eq!(content_type_for_filename("hello"), None);
        assert_eq!(content_type_for_filename("archive.tar.gz"), None);
    }
}
