//! Tubetext - fetch YouTube caption tracks and transcripts without an API key
//!
//! This library scrapes caption metadata out of the public watch page, selects
//! the best caption track for a language preference list, downloads and parses
//! the timed-text payload, and renders it as text, JSON, SRT or WebVTT.

pub mod cli;
pub mod config;
pub mod format;
pub mod gateway;
pub mod page;
pub mod pipeline;
pub mod timedtext;
pub mod tracks;
pub mod transcript;
pub mod video_id;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use pipeline::{BatchOutcome, FetchResponse, TranscriptPipeline};
pub use tracks::{CaptionTrack, TrackCatalog};
pub use transcript::{Transcript, TranscriptSnippet};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Typed failure kinds for a single transcript resolution.
///
/// Every variant carries the video id it refers to; the language-related
/// variants additionally carry the language list that was requested.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("could not resolve '{0}' to a video id")]
    InvalidReference(String),

    #[error("video '{0}' is unavailable")]
    VideoUnavailable(String),

    #[error("request for video '{0}' was blocked: the source served a bot challenge")]
    IpBlocked(String),

    #[error("subtitles are disabled for video '{0}'")]
    TranscriptsDisabled(String),

    #[error("no transcript found for video '{video_id}' in languages {languages:?}")]
    NoTranscriptFound {
        video_id: String,
        languages: Vec<String>,
    },

    #[error("caption track '{language_code}' of video '{video_id}' is not translatable")]
    NotTranslatable {
        video_id: String,
        language_code: String,
    },

    #[error("translation language '{requested}' is not available for video '{video_id}'")]
    TranslationLanguageNotAvailable {
        video_id: String,
        requested: String,
    },

    #[error("unsupported format '{0}' (valid formats: text, json, srt, webvtt)")]
    UnsupportedFormat(String),
}
