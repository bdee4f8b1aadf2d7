//! Upload validation and object key generation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Video types accepted for upload.
const ALLOWED_VIDEO_TYPES: &[&str] = &["video/mp4", "video/webm", "video/quicktime"];

/// Image types accepted for upload (cover art, avatars).
const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// A file received from a client, held in memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File contents
    pub bytes: Vec<u8>,
    /// Name supplied by the client
    pub original_name: String,
    /// Declared MIME type
    pub mime_type: String,
}

impl UploadFile {
    pub fn new(
        bytes: Vec<u8>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            original_name: original_name.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Per-upload options.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Key prefix ("tracks", "videos", "covers", ...)
    pub folder: String,
    /// Overrides the client-wide size limit
    pub max_size: Option<u64>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            folder: "uploads".to_string(),
            max_size: None,
        }
    }
}

impl UploadOptions {
    pub fn folder(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            max_size: None,
        }
    }

    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedObject {
    /// Publicly resolvable URL
    pub url: String,
    /// Generated file name (last key segment)
    pub filename: String,
    /// Object key in the bucket
    pub key: String,
    /// Normalized MIME type
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
}

/// Lower-case the MIME type and drop parameters (`audio/mpeg; charset=x`).
pub fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Check a MIME type against the allow-list.
pub fn is_allowed_mime(mime_type: &str) -> bool {
    let mime = normalize_mime(mime_type);
    match mime.split_once('/') {
        Some(("audio", subtype)) => !subtype.is_empty(),
        Some(("video", _)) => ALLOWED_VIDEO_TYPES.contains(&mime.as_str()),
        Some(("image", _)) => ALLOWED_IMAGE_TYPES.contains(&mime.as_str()),
        _ => false,
    }
}

/// Validate MIME type and size before any remote call.
pub fn validate_upload(file: &UploadFile, max_size: u64) -> StorageResult<()> {
    if !is_allowed_mime(&file.mime_type) {
        return Err(StorageError::validation(format!(
            "File type '{}' is not allowed",
            file.mime_type
        )));
    }

    if file.bytes.is_empty() {
        return Err(StorageError::validation("File is empty"));
    }

    if file.size() > max_size {
        return Err(StorageError::validation(format!(
            "File is {} bytes, maximum is {} bytes",
            file.size(),
            max_size
        )));
    }

    Ok(())
}

/// Generate a collision-resistant key: `<folder>/<unix-millis>-<uuid><.ext>`.
///
/// Returns `(key, filename)`.
pub fn generate_key(folder: &str, original_name: &str, mime_type: &str) -> (String, String) {
    let extension = extension_from_name(original_name)
        .or_else(|| extension_for_mime(mime_type).map(str::to_string));

    let filename = match extension {
        Some(ext) => format!("{}-{}.{}", Utc::now().timestamp_millis(), Uuid::new_v4(), ext),
        None => format!("{}-{}", Utc::now().timestamp_millis(), Uuid::new_v4()),
    };

    let folder = folder.trim_matches('/');
    let key = if folder.is_empty() {
        filename.clone()
    } else {
        format!("{}/{}", folder, filename)
    };

    (key, filename)
}

/// Extension of a client-supplied name, if it looks like one.
fn extension_from_name(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(ext)
}

/// Default extension for a MIME type.
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    let ext = match normalize_mime(mime_type).as_str() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        "audio/flac" | "audio/x-flac" => "flac",
        "audio/aac" => "aac",
        "audio/mp4" | "audio/x-m4a" => "m4a",
        "audio/webm" => "weba",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => return None,
    };
    Some(ext)
}

/// MIME type for a derived artifact, from its file extension.
pub fn content_type_for_path(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("aac") => "audio/aac",
        Some("weba") => "audio/webm",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_allow_list() {
        assert!(is_allowed_mime("audio/mpeg"));
        assert!(is_allowed_mime("audio/x-some-new-codec"));
        assert!(is_allowed_mime("Audio/WAV; codecs=1"));
        assert!(is_allowed_mime("video/mp4"));
        assert!(is_allowed_mime("image/png"));

        assert!(!is_allowed_mime("video/x-msvideo"));
        assert!(!is_allowed_mime("image/svg+xml"));
        assert!(!is_allowed_mime("application/pdf"));
        assert!(!is_allowed_mime("audio/"));
        assert!(!is_allowed_mime(""));
    }

    #[test]
    fn test_validate_rejects_oversized() {
        let file = UploadFile::new(vec![0u8; 11], "a.mp3", "audio/mpeg");
        let err = validate_upload(&file, 10).unwrap_err();
        assert!(err.is_validation());
        assert!(validate_upload(&file, 11).is_ok());
    }

    #[test]
    fn test_validate_rejects_type_and_empty() {
        let pdf = UploadFile::new(vec![1, 2, 3], "doc.pdf", "application/pdf");
        assert!(validate_upload(&pdf, 1024).unwrap_err().is_validation());

        let empty = UploadFile::new(Vec::new(), "a.mp3", "audio/mpeg");
        assert!(validate_upload(&empty, 1024).unwrap_err().is_validation());
    }

    #[test]
    fn test_generate_key_uses_name_extension() {
        let (key, filename) = generate_key("tracks", "My Song.MP3", "audio/mpeg");
        assert!(key.starts_with("tracks/"));
        assert!(key.ends_with(".mp3"));
        assert_eq!(key, format!("tracks/{}", filename));
    }

    #[test]
    fn test_generate_key_falls_back_to_mime() {
        let (key, _) = generate_key("/videos/", "clip", "video/quicktime");
        assert!(key.starts_with("videos/"));
        assert!(key.ends_with(".mov"));
    }

    #[test]
    fn test_generate_key_is_unique() {
        let (a, _) = generate_key("tracks", "a.mp3", "audio/mpeg");
        let (b, _) = generate_key("tracks", "a.mp3", "audio/mpeg");
        assert_ne!(a, b);
    }

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path(Path::new("/x/audio.mp3")), "audio/mpeg");
        assert_eq!(content_type_for_path(Path::new("/x/video.MP4")), "video/mp4");
        assert_eq!(content_type_for_path(Path::new("/x/blob")), "application/octet-stream");
    }

    #[test]
    fn test_content_type_covers_accepted_uploads() {
        for name in ["a.mov", "a.ogg", "a.flac", "a.aac", "a.weba", "a.webp", "a.gif"] {
            let mime = content_type_for_path(Path::new(name));
            assert!(is_allowed_mime(mime), "{} mapped to {}", name, mime);
            let ext = extension_for_mime(mime).unwrap();
            assert_eq!(Some(ext), name.strip_prefix("a."));
        }
        assert_eq!(content_type_for_path(Path::new("clip.MOV")), "video/quicktime");
    }
}
