//! Transcript acquisition and the timed-segment model.
//!
//! A transcript arrives as an ordered sequence of timed caption segments;
//! everything downstream (chunking, indexing, retrieval) works from these.

mod youtube;

pub use youtube::YoutubeCaptions;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single timed caption segment as supplied by the transcript source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Caption text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl TranscriptSegment {
    /// Create a new segment.
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }

    /// End time of this segment in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A fetched transcript with its video metadata.
#[derive(Debug, Clone)]
pub struct VideoTranscript {
    /// The 11-character video identifier.
    pub video_id: String,
    /// Video title.
    pub title: String,
    /// Total video duration in seconds.
    pub duration_seconds: i64,
    /// Ordered caption segments.
    pub segments: Vec<TranscriptSegment>,
}

impl VideoTranscript {
    /// Full transcript text (concatenated segments).
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Trait for transcript acquisition backends.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript and metadata for a video.
    async fn fetch(&self, video_id: &str) -> Result<VideoTranscript>;
}

/// Extract a video ID from a URL or bare ID.
///
/// Accepts `watch?v=`, `youtu.be/`, `embed/`, `shorts/` URL forms and bare
/// 11-character IDs.
pub fn extract_video_id(input: &str) -> Option<String> {
    let re = Regex::new(
        r"(?x)
        (?:
            (?:https?://)?
            (?:www\.)?
            (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid regex");

    let caps = re.captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id_urls() {
        let id = "dQw4w9WgXcQ";
        let inputs = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
        ];

        for input in inputs {
            assert_eq!(extract_video_id(input).as_deref(), Some(id), "{}", input);
        }
    }

    #[test]
    fn test_extract_video_id_with_extra_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_extract_video_id_rejects_garbage() {
        assert_eq!(extract_video_id("not a url"), None);
        assert_eq!(extract_video_id("https://example.com/watch?v=abc"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_segment_end() {
        let seg = TranscriptSegment::new("hi", 3.0, 2.0);
        assert_eq!(seg.end(), 5.0);
    }

    #[test]
    fn test_full_text_skips_empty_segments() {
        let t = VideoTranscript {
            video_id: "x".into(),
            title: "t".into(),
            duration_seconds: 10,
            segments: vec![
                TranscriptSegment::new("Hello", 0.0, 2.0),
                TranscriptSegment::new("   ", 2.0, 1.0),
                TranscriptSegment::new("world", 3.0, 2.0),
            ],
        };
        assert_eq!(t.full_text(), "Hello world");
    }
}
