use serde::{Deserialize, Serialize};

/// One timed line of transcript text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSnippet {
    /// Snippet text, already entity-decoded
    pub text: String,

    /// Start offset in seconds
    pub start: f64,

    /// Display duration in seconds
    pub duration: f64,
}

/// A fully resolved transcript for one caption track
///
/// Snippets are kept in payload order (ascending start); duplicates are not
/// merged. The value is immutable once built and safe to cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Ordered timed snippets
    pub snippets: Vec<TranscriptSnippet>,

    /// Canonical video identifier
    pub video_id: String,

    /// Human-readable track name (e.g. "English (auto-generated)")
    pub language: String,

    /// BCP-47 style language code of the track
    pub language_code: String,

    /// Whether the track was machine-generated
    pub is_generated: bool,
}

impl Transcript {
    /// Concatenated snippet text, one snippet per line
    pub fn plain_text(&self) -> String {
        self.snippets
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Total covered duration: end of the last snippet, in seconds
    pub fn duration(&self) -> f64 {
        self.snippets
            .last()
            .map(|s| s.start + s.duration)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transcript {
        Transcript {
            snippets: vec![
                TranscriptSnippet {
                    text: "hello".to_string(),
                    start: 0.0,
                    duration: 1.5,
                },
                TranscriptSnippet {
                    text: "world".to_string(),
                    start: 1.5,
                    duration: 2.0,
                },
            ],
            video_id: "dQw4w9WgXcQ".to_string(),
            language: "English".to_string(),
            language_code: "en".to_string(),
            is_generated: false,
        }
    }

    #[test]
    fn test_plain_text_joins_lines() {
        assert_eq!(sample().plain_text(), "hello\nworld");
    }

    #[test]
    fn test_duration_is_end_of_last_snippet() {
        assert!((sample().duration() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_transcript_duration() {
        let mut t = sample();
        t.snippets.clear();
        assert_eq!(t.duration(), 0.0);
    }
}
