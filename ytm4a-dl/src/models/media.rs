//! Media identity, fetched metadata and user-editable tags

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PipelineError;

/// Author used when upstream does not name one
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Canonical token identifying one video
///
/// Produced once per run by the identifier resolver and reused by every later
/// stage of that run. There are no mutators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaIdentifier(String);

impl MediaIdentifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch page for this identifier
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }

    /// Embeddable representation used for the title lookup
    pub fn embed_url(&self) -> String {
        format!("https://www.youtube.com/embed/{}", self.0)
    }

    /// Best-guess artwork URL; never verified
    pub fn thumbnail_url(&self) -> String {
        format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", self.0)
    }

    /// Title used when the real one cannot be read
    pub fn placeholder_title(&self) -> String {
        format!("YouTube Video {}", self.0)
    }
}

impl fmt::Display for MediaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptive metadata for one video
///
/// Unknown fields carry sentinels: empty strings, `duration_seconds == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    pub author: String,
    /// 0 = unknown
    pub duration_seconds: u64,
    pub thumbnail_url: String,
    pub source_url: String,
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub description: String,
    /// Placeholder values were substituted for unreadable fields
    #[serde(default)]
    pub degraded: bool,
}

impl MediaMetadata {
    /// Metadata built from the identifier alone
    pub fn placeholder(id: &MediaIdentifier) -> Self {
        Self {
            title: id.placeholder_title(),
            author: UNKNOWN_ARTIST.to_string(),
            duration_seconds: 0,
            thumbnail_url: id.thumbnail_url(),
            source_url: id.watch_url(),
            uploader: String::new(),
            description: String::new(),
            degraded: true,
        }
    }

    /// Metadata with a title read from upstream
    pub fn with_title(id: &MediaIdentifier, title: String) -> Self {
        Self {
            title,
            degraded: false,
            ..Self::placeholder(id)
        }
    }
}

/// User-editable copy of title and artist
///
/// Edits never touch the `MediaMetadata` they were seeded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableTrackTags {
    pub title: String,
    pub artist: String,
}

impl EditableTrackTags {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    pub fn from_metadata(metadata: &MediaMetadata) -> Self {
        Self::new(metadata.title.clone(), metadata.author.clone())
    }

    /// Both fields must be non-blank before a download may start
    pub fn validate(&self) -> Result<(), PipelineError> {
        match (self.title.trim().is_empty(), self.artist.trim().is_empty()) {
            (false, false) => Ok(()),
            (true, true) => Err(PipelineError::Validation(
                "Enter a title and an artist name".to_string(),
            )),
            (true, false) => Err(PipelineError::Validation("Enter a title".to_string())),
            (false, true) => Err(PipelineError::Validation("Enter an artist name".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_urls() {
        let id = MediaIdentifier::new("abc123");

        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=abc123");
        assert_eq!(id.embed_url(), "https://www.youtube.com/embed/abc123");
        assert_eq!(
            id.thumbnail_url(),
            "https://img.youtube.com/vi/abc123/maxresdefault.jpg"
        );
        assert_eq!(id.placeholder_title(), "YouTube Video abc123");
    }

    #[test]
    fn test_placeholder_uses_sentinels() {
        let meta = MediaMetadata::placeholder(&MediaIdentifier::new("xyz"));

        assert_eq!(meta.title, "YouTube Video xyz");
        assert_eq!(meta.author, UNKNOWN_ARTIST);
        assert_eq!(meta.duration_seconds, 0);
        assert!(meta.degraded);
    }

    #[test]
    fn test_edits_do_not_mutate_source() {
        let meta = MediaMetadata::with_title(&MediaIdentifier::new("xyz"), "Original".into());
        let mut tags = EditableTrackTags::from_metadata(&meta);
        tags.title = "Edited".into();

        assert_eq!(meta.title, "Original");
        assert!(!meta.degraded);
        assert_eq!(tags.title, "Edited");
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert!(EditableTrackTags::new("Song", "Band").validate().is_ok());

        for (title, artist) in [("", "Band"), ("Song", ""), ("  ", "Band"), ("", "")] {
            let err = EditableTrackTags::new(title, artist).validate().unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::ValidationError);
        }
    }
}
