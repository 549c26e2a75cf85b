//! YouTube caption source.
//!
//! Fetches video metadata and caption tracks with yt-dlp, then downloads
//! and parses the json3 caption format. Manual subtitles are preferred
//! over auto-generated captions.

use super::{TranscriptSegment, TranscriptSource, VideoTranscript};
use crate::error::{GraspError, Result};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Caption-based transcript source for YouTube videos.
pub struct YoutubeCaptions {
    language: String,
    http: reqwest::Client,
}

impl YoutubeCaptions {
    /// Create a new caption source for the given language.
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetch video metadata and caption track listing via yt-dlp.
    async fn fetch_metadata(&self, video_id: &str) -> Result<serde_json::Value> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);

        let output = tokio::process::Command::new("yt-dlp")
            .args([
                "--dump-json",
                "--no-download",
                "--no-warnings",
                "--ignore-errors",
                &url,
            ])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GraspError::ToolNotFound("yt-dlp".to_string())
                } else {
                    GraspError::VideoSource(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GraspError::NotFound(format!(
                "Video {} not found or unavailable: {}",
                video_id, stderr
            )));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&json_str)
            .map_err(|e| GraspError::VideoSource(format!("Failed to parse yt-dlp output: {}", e)))
    }
}

#[async_trait]
impl TranscriptSource for YoutubeCaptions {
    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<VideoTranscript> {
        let info = self.fetch_metadata(video_id).await?;

        let title = info["title"].as_str().unwrap_or("Unknown Title").to_string();
        let duration_seconds = info["duration"].as_f64().unwrap_or(0.0) as i64;

        let caption_url = select_caption_url(&info, &self.language).ok_or_else(|| {
            GraspError::VideoSource(format!(
                "No {} captions available for video {}",
                self.language, video_id
            ))
        })?;

        debug!("Downloading caption track for {}", video_id);
        let body = self
            .http
            .get(&caption_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let segments = parse_json3(&body)?;
        if segments.is_empty() {
            warn!("Caption track for {} contained no usable segments", video_id);
            return Err(GraspError::VideoSource(format!(
                "Empty caption track for video {}",
                video_id
            )));
        }

        Ok(VideoTranscript {
            video_id: video_id.to_string(),
            title,
            duration_seconds,
            segments,
        })
    }
}

/// Pick a json3 caption track URL, preferring manual subtitles over
/// auto-generated captions.
fn select_caption_url(info: &serde_json::Value, language: &str) -> Option<String> {
    for key in ["subtitles", "automatic_captions"] {
        let Some(tracks) = info[key][language].as_array() else {
            continue;
        };
        if let Some(url) = tracks
            .iter()
            .find(|t| t["ext"].as_str() == Some("json3"))
            .and_then(|t| t["url"].as_str())
        {
            return Some(url.to_string());
        }
    }
    None
}

/// Parse the json3 caption format into timed segments.
///
/// Events carry `segs[].utf8` text fragments with `tStartMs`/`dDurationMs`
/// millisecond timings; events without text are skipped.
fn parse_json3(body: &str) -> Result<Vec<TranscriptSegment>> {
    let data: serde_json::Value = serde_json::from_str(body)?;

    let mut segments = Vec::new();
    let events = data["events"].as_array().cloned().unwrap_or_default();

    for event in events {
        let Some(segs) = event["segs"].as_array() else {
            continue;
        };
        let text: String = segs
            .iter()
            .filter_map(|s| s["utf8"].as_str())
            .collect();
        if text.trim().is_empty() {
            continue;
        }

        segments.push(TranscriptSegment {
            text,
            start: event["tStartMs"].as_f64().unwrap_or(0.0) / 1000.0,
            duration: event["dDurationMs"].as_f64().unwrap_or(0.0) / 1000.0,
        });
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json3() {
        let body = r#"{
            "events": [
                {"tStartMs": 0, "dDurationMs": 2000, "segs": [{"utf8": "Hello "}, {"utf8": "world"}]},
                {"tStartMs": 2000, "dDurationMs": 1000},
                {"tStartMs": 3000, "dDurationMs": 2500, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 5500, "dDurationMs": 1500, "segs": [{"utf8": "Goodbye"}]}
            ]
        }"#;

        let segments = parse_json3(body).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hello world");
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].duration, 2.0);
        assert_eq!(segments[1].text, "Goodbye");
        assert_eq!(segments[1].start, 5.5);
    }

    #[test]
    fn test_parse_json3_no_events() {
        assert!(parse_json3("{}").unwrap().is_empty());
    }

    #[test]
    fn test_select_caption_url_prefers_manual() {
        let info: serde_json::Value = serde_json::from_str(
            r#"{
                "subtitles": {"en": [
                    {"ext": "vtt", "url": "https://example.com/manual.vtt"},
                    {"ext": "json3", "url": "https://example.com/manual.json3"}
                ]},
                "automatic_captions": {"en": [
                    {"ext": "json3", "url": "https://example.com/auto.json3"}
                ]}
            }"#,
        )
        .unwrap();

        assert_eq!(
            select_caption_url(&info, "en").as_deref(),
            Some("https://example.com/manual.json3")
        );
    }

    #[test]
    fn test_select_caption_url_falls_back_to_auto() {
        let info: serde_json::Value = serde_json::from_str(
            r#"{
                "subtitles": {},
                "automatic_captions": {"en": [
                    {"ext": "json3", "url": "https://example.com/auto.json3"}
                ]}
            }"#,
        )
        .unwrap();

        assert_eq!(
            select_caption_url(&info, "en").as_deref(),
            Some("https://example.com/auto.json3")
        );
        assert_eq!(select_caption_url(&info, "de"), None);
    }
}
