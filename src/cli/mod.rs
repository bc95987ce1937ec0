use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tubetext",
    about = "Tubetext - Fetch YouTube transcripts and caption tracks without an API key",
    version,
    long_about = "A CLI tool that scrapes caption metadata from the public watch page, \
selects the best caption track for your language preferences, and renders the transcript \
as text, JSON, SRT or WebVTT. No API key required."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the transcript for a single video
    Fetch {
        /// Video id or URL (watch, youtu.be, shorts, embed, live)
        #[arg(value_name = "VIDEO")]
        reference: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Language preference list, most preferred first
        #[arg(short, long, value_name = "LANG", default_values_t = vec!["en".to_string()])]
        languages: Vec<String>,

        /// Keep inline emphasis tags (<b>, <i>, ...) in snippet text
        #[arg(long)]
        preserve_formatting: bool,

        /// Translate the selected track into this language code
        #[arg(short, long, value_name = "LANG")]
        translate: Option<String>,
    },

    /// List the caption tracks a video offers
    Tracks {
        /// Video id or URL
        #[arg(value_name = "VIDEO")]
        reference: String,
    },

    /// Fetch transcripts for several videos in concurrent groups
    Batch {
        /// Video ids or URLs
        #[arg(value_name = "VIDEO")]
        references: Vec<String>,

        /// Read additional references from a file, one per line
        #[arg(short = 'i', long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Language preference list, most preferred first
        #[arg(short, long, value_name = "LANG", default_values_t = vec!["en".to_string()])]
        languages: Vec<String>,

        /// Keep inline emphasis tags in snippet text
        #[arg(long)]
        preserve_formatting: bool,

        /// Abort remaining groups after the first failure
        #[arg(long)]
        stop_on_error: bool,
    },

    /// Show or edit the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported output formats
    Formats,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    /// Plain text, one snippet per line
    Text,
    /// Pretty-printed JSON
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
}

impl OutputFormat {
    /// Name understood by the formatter factory
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "webvtt",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
