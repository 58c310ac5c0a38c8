// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Seed-only domain entities: memories, stories and badges.
//!
//! No runtime route operates on these; they exist for the `seed` binary.
//! Media exclusivity (a memory or story page carries at most one of
//! video/image/audio) is structural: [`MediaAttachment`] is the only way to
//! attach media, and row decoding rejects rows with more than one URL set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Exactly one media item: video, image or audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "url", rename_all = "lowercase")]
pub enum MediaAttachment {
    Video(String),
    Image(String),
    Audio(String),
}

impl MediaAttachment {
    /// Split into the (video, image, audio) column triple for persistence.
    pub fn into_columns(self) -> (Option<String>, Option<String>, Option<String>) {
        match self {
            MediaAttachment::Video(url) => (Some(url), None, None),
            MediaAttachment::Image(url) => (None, Some(url), None),
            MediaAttachment::Audio(url) => (None, None, Some(url)),
        }
    }

    /// Rebuild from the column triple. At most one URL may be set;
    /// rows violating that are rejected rather than silently picking one.
    pub fn from_columns(
        video: Option<String>,
        image: Option<String>,
        audio: Option<String>,
    ) -> Result<Option<Self>, MediaError> {
        let set = [video.is_some(), image.is_some(), audio.is_some()]
            .iter()
            .filter(|&&s| s)
            .count();
        if set > 1 {
            return Err(MediaError::MultipleAttachments);
        }

        Ok(video
            .map(MediaAttachment::Video)
            .or(image.map(MediaAttachment::Image))
            .or(audio.map(MediaAttachment::Audio)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("row has more than one media URL set")]
    MultipleAttachments,
}

/// Mood-tagged journal entry with optional media and location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub user_id: String,
    /// Mood score, -2..=2.
    pub mood: i32,
    pub text_content: String,
    pub visibility: String,
    pub media: Option<MediaAttachment>,
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Ordered collection of pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub visibility: String,
    pub created_at: DateTime<Utc>,
}

/// One page of a story, optionally carrying one media item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryPage {
    pub id: String,
    pub story_id: String,
    pub page_number: i32,
    pub page_text: String,
    pub media: Option<MediaAttachment>,
}

/// Achievement record tied to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub icon_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_round_trip() {
        let media = MediaAttachment::Image("https://example.com/a.png".to_string());
        let (video, image, audio) = media.clone().into_columns();
        let restored = MediaAttachment::from_columns(video, image, audio).unwrap();
        assert_eq!(restored, Some(media));
    }

    #[test]
    fn test_no_media_is_none() {
        let restored = MediaAttachment::from_columns(None, None, None).unwrap();
        assert_eq!(restored, None);
    }

    #[test]
    fn test_two_urls_rejected() {
        let result = MediaAttachment::from_columns(
            Some("https://example.com/a.mp4".to_string()),
            Some("https://example.com/a.png".to_string()),
            None,
        );
        assert!(matches!(result, Err(MediaError::MultipleAttachments)));
    }
}
