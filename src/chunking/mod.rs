//! Token-budget chunking of timed transcripts.
//!
//! Splits a caption-segment stream into contiguous, time-bounded chunks
//! sized for embedding and LLM context windows. Chunking is deterministic
//! and makes no provider calls.

use crate::transcript::TranscriptSegment;

/// Calibration constant for the word-based token estimate.
const TOKENS_PER_WORD: f64 = 1.3;

/// Estimate the token cost of a text.
///
/// A rough approximation (`words * 1.3`), not a real tokenizer. Kept as a
/// named function so a real tokenizer can replace it without touching the
/// chunking control flow.
pub fn estimate_tokens(text: &str) -> f64 {
    text.split_whitespace().count() as f64 * TOKENS_PER_WORD
}

/// A chunk of transcript text produced by the chunker.
///
/// Carries no index; the caller assigns `chunk_index` from position when
/// persisting.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftChunk {
    /// Chunk text, trimmed.
    pub text: String,
    /// Start time in seconds (start of the first segment in the chunk).
    pub start_time: f64,
    /// End time in seconds (end of the last segment in the chunk).
    pub end_time: f64,
}

/// Greedy token-budget chunker.
pub struct TokenBudgetChunker {
    target_tokens: f64,
}

impl TokenBudgetChunker {
    /// Create a chunker with the given soft token budget per chunk.
    pub fn new(target_tokens: u32) -> Self {
        Self {
            target_tokens: f64::from(target_tokens),
        }
    }

    /// Split segments into chunks of approximately `target_tokens` each.
    ///
    /// Segments accumulate into the current chunk until the next one would
    /// push the estimate over budget; the budget only triggers a split once
    /// the current chunk is non-empty, so a single oversized segment still
    /// becomes one chunk and is never split. Whitespace-only segments are
    /// skipped. The final in-progress chunk is flushed if non-empty.
    pub fn chunk(&self, segments: &[TranscriptSegment]) -> Vec<DraftChunk> {
        let mut chunks = Vec::new();
        let mut text = String::new();
        let mut start_time = 0.0;
        let mut end_time = 0.0;
        let mut tokens = 0.0;

        for segment in segments {
            let seg_text = segment.text.trim();
            if seg_text.is_empty() {
                continue;
            }

            let seg_tokens = estimate_tokens(seg_text);

            if tokens == 0.0 {
                start_time = segment.start;
            }

            if tokens + seg_tokens > self.target_tokens && tokens > 0.0 {
                chunks.push(DraftChunk {
                    text: text.trim().to_string(),
                    start_time,
                    end_time,
                });
                text = format!("{} ", seg_text);
                start_time = segment.start;
                end_time = segment.end();
                tokens = seg_tokens;
            } else {
                text.push_str(seg_text);
                text.push(' ');
                end_time = segment.end();
                tokens += seg_tokens;
            }
        }

        if !text.trim().is_empty() {
            chunks.push(DraftChunk {
                text: text.trim().to_string(),
                start_time,
                end_time,
            });
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, start: f64, duration: f64) -> TranscriptSegment {
        TranscriptSegment::new(text, start, duration)
    }

    /// Produce a segment with `words` distinct words.
    fn wordy_seg(words: usize, start: f64, duration: f64) -> TranscriptSegment {
        let text = (0..words).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        seg(&text, start, duration)
    }

    #[test]
    fn test_empty_input() {
        let chunker = TokenBudgetChunker::new(600);
        assert!(chunker.chunk(&[]).is_empty());
    }

    #[test]
    fn test_empty_segments_skipped() {
        let chunker = TokenBudgetChunker::new(600);
        let segments = vec![
            seg("Hello world", 0.0, 2.0),
            seg("", 2.0, 1.0),
            seg("Goodbye now", 3.0, 2.0),
        ];

        let chunks = chunker.chunk(&segments);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello world Goodbye now");
        assert_eq!(chunks[0].start_time, 0.0);
        assert_eq!(chunks[0].end_time, 5.0);
    }

    #[test]
    fn test_splits_on_budget() {
        let chunker = TokenBudgetChunker::new(50);
        let segments: Vec<_> = (0..10)
            .map(|i| wordy_seg(100, i as f64, 1.0))
            .collect();

        let chunks = chunker.chunk(&segments);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.split_whitespace().count() <= 100);
        }
    }

    #[test]
    fn test_single_oversized_segment_never_splits() {
        let chunker = TokenBudgetChunker::new(10);
        let chunks = chunker.chunk(&[wordy_seg(500, 0.0, 60.0)]);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_time, 0.0);
        assert_eq!(chunks[0].end_time, 60.0);
    }

    #[test]
    fn test_soft_ceiling_respected() {
        let chunker = TokenBudgetChunker::new(20);
        let segments: Vec<_> = (0..12)
            .map(|i| wordy_seg(5, i as f64 * 2.0, 2.0))
            .collect();

        let chunks = chunker.chunk(&segments);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            // Multi-segment chunks stay under budget; only a lone oversized
            // segment may exceed it.
            assert!(estimate_tokens(&chunk.text) <= 20.0);
        }
    }

    #[test]
    fn test_content_and_order_preserved() {
        let chunker = TokenBudgetChunker::new(15);
        let segments = vec![
            seg("alpha beta gamma", 0.0, 2.0),
            seg("delta epsilon", 2.0, 2.0),
            seg("zeta eta theta iota", 4.0, 2.0),
            seg("kappa lambda", 6.0, 2.0),
        ];

        let chunks = chunker.chunk(&segments);
        let joined = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
        assert_eq!(joined, "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda");
    }

    #[test]
    fn test_end_times_non_decreasing() {
        let chunker = TokenBudgetChunker::new(8);
        let segments: Vec<_> = (0..20)
            .map(|i| wordy_seg(4, i as f64 * 3.0, 3.0))
            .collect();

        let chunks = chunker.chunk(&segments);
        for pair in chunks.windows(2) {
            assert!(pair[0].end_time <= pair[1].end_time);
            assert!(pair[0].end_time <= pair[1].start_time);
        }
    }

    #[test]
    fn test_chunk_start_is_triggering_segment_start() {
        let chunker = TokenBudgetChunker::new(5);
        let segments = vec![
            wordy_seg(4, 0.0, 2.0),
            wordy_seg(4, 10.0, 2.0),
        ];

        let chunks = chunker.chunk(&segments);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].start_time, 10.0);
        assert_eq!(chunks[1].end_time, 12.0);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0.0);
        assert!((estimate_tokens("one two three") - 3.9).abs() < 1e-9);
    }
}
