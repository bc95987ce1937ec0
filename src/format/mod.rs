use crate::transcript::{Transcript, TranscriptSnippet};
use crate::{Result, TranscriptError};

/// Renders a transcript (or several) into an output string.
///
/// `format` is the one required primitive; `format_transcripts` defaults to a
/// per-item join and is overridden where the format has its own multi-document
/// shape (JSON arrays, numbered time-coded blocks).
pub trait TranscriptFormatter {
    fn format(&self, transcript: &Transcript) -> Result<String>;

    fn format_transcripts(&self, transcripts: &[Transcript]) -> Result<String> {
        let parts = transcripts
            .iter()
            .map(|t| self.format(t))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join("\n\n\n"))
    }
}

impl std::fmt::Debug for dyn TranscriptFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TranscriptFormatter")
    }
}

/// Map a format name to an implementation; JSON when no name is given.
pub fn formatter_for(
    name: Option<&str>,
) -> std::result::Result<Box<dyn TranscriptFormatter>, TranscriptError> {
    match name.unwrap_or("json") {
        "text" | "txt" => Ok(Box::new(TextFormatter)),
        "json" => Ok(Box::new(JsonFormatter)),
        "srt" => Ok(Box::new(SrtFormatter)),
        "webvtt" | "vtt" => Ok(Box::new(WebVttFormatter)),
        other => Err(TranscriptError::UnsupportedFormat(other.to_string())),
    }
}

/// One line of snippet text per snippet
pub struct TextFormatter;

impl TranscriptFormatter for TextFormatter {
    fn format(&self, transcript: &Transcript) -> Result<String> {
        Ok(transcript.plain_text())
    }
}

/// Pretty-printed serialization of the transcript value object
pub struct JsonFormatter;

impl TranscriptFormatter for JsonFormatter {
    fn format(&self, transcript: &Transcript) -> Result<String> {
        Ok(serde_json::to_string_pretty(transcript)?)
    }

    /// A single structurally valid array, not a textual join.
    fn format_transcripts(&self, transcripts: &[Transcript]) -> Result<String> {
        Ok(serde_json::to_string_pretty(transcripts)?)
    }
}

/// SubRip subtitle output
pub struct SrtFormatter;

impl TranscriptFormatter for SrtFormatter {
    fn format(&self, transcript: &Transcript) -> Result<String> {
        let blocks: Vec<String> = transcript
            .snippets
            .iter()
            .enumerate()
            .map(|(i, snippet)| {
                format!(
                    "{}\n{} --> {}\n{}",
                    i + 1,
                    format_timestamp(snippet.start, ','),
                    format_timestamp(snippet_end(&transcript.snippets, i), ','),
                    snippet.text
                )
            })
            .collect();
        Ok(format!("{}\n", blocks.join("\n\n")))
    }

    fn format_transcripts(&self, transcripts: &[Transcript]) -> Result<String> {
        format_numbered(self, transcripts)
    }
}

/// WebVTT subtitle output
pub struct WebVttFormatter;

impl TranscriptFormatter for WebVttFormatter {
    fn format(&self, transcript: &Transcript) -> Result<String> {
        let blocks: Vec<String> = transcript
            .snippets
            .iter()
            .enumerate()
            .map(|(i, snippet)| {
                format!(
                    "{} --> {}\n{}",
                    format_timestamp(snippet.start, '.'),
                    format_timestamp(snippet_end(&transcript.snippets, i), '.'),
                    snippet.text
                )
            })
            .collect();
        Ok(format!("WEBVTT\n\n{}\n", blocks.join("\n\n")))
    }

    fn format_transcripts(&self, transcripts: &[Transcript]) -> Result<String> {
        format_numbered(self, transcripts)
    }
}

/// Multi-transcript shape shared by the time-coded formatters: each block is
/// prefixed with a 1-based `TRANSCRIPT {n}:` header, blocks separated by a
/// blank line.
fn format_numbered(
    formatter: &dyn TranscriptFormatter,
    transcripts: &[Transcript],
) -> Result<String> {
    let mut parts = Vec::with_capacity(transcripts.len());
    for (i, transcript) in transcripts.iter().enumerate() {
        let body = formatter.format(transcript)?;
        parts.push(format!("TRANSCRIPT {}:\n{}", i + 1, body.trim_end()));
    }
    Ok(parts.join("\n\n"))
}

/// A cue ends at its own start+duration unless the next snippet starts
/// earlier, in which case it is clipped to avoid overlapping the next cue.
fn snippet_end(snippets: &[TranscriptSnippet], index: usize) -> f64 {
    let own_end = snippets[index].start + snippets[index].duration;
    match snippets.get(index + 1) {
        Some(next) => own_end.min(next.start),
        None => own_end,
    }
}

/// Render seconds as `HH:MM:SS<sep>mmm`, all fields zero-padded.
fn format_timestamp(seconds: f64, millis_sep: char) -> String {
    let total_millis = (seconds * 1000.0).round() as u64;
    let millis = total_millis % 1000;
    let total_secs = total_millis / 1000;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        millis_sep,
        millis
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(snippets: Vec<(&str, f64, f64)>) -> Transcript {
        Transcript {
            snippets: snippets
                .into_iter()
                .map(|(text, start, duration)| TranscriptSnippet {
                    text: text.to_string(),
                    start,
                    duration,
                })
                .collect(),
            video_id: "dQw4w9WgXcQ".to_string(),
            language: "English".to_string(),
            language_code: "en".to_string(),
            is_generated: false,
        }
    }

    fn three_snippets() -> Transcript {
        transcript(vec![
            ("first line", 0.0, 2.5),
            ("second line", 2.5, 3.0),
            ("third line", 5.5, 2.0),
        ])
    }

    #[test]
    fn test_text_formatter() {
        let out = TextFormatter.format(&three_snippets()).unwrap();
        assert_eq!(out, "first line\nsecond line\nthird line");
    }

    #[test]
    fn test_text_multi_uses_triple_newline() {
        let t = three_snippets();
        let out = TextFormatter
            .format_transcripts(&[t.clone(), t])
            .unwrap();
        assert_eq!(out.matches("\n\n\n").count(), 1);
    }

    #[test]
    fn test_srt_literal_output() {
        let out = SrtFormatter.format(&three_snippets()).unwrap();
        let expected = "1\n\
                        00:00:00,000 --> 00:00:02,500\n\
                        first line\n\
                        \n\
                        2\n\
                        00:00:02,500 --> 00:00:05,500\n\
                        second line\n\
                        \n\
                        3\n\
                        00:00:05,500 --> 00:00:07,500\n\
                        third line\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_webvtt_literal_output() {
        let out = WebVttFormatter
            .format(&transcript(vec![("only", 1.0, 2.0)]))
            .unwrap();
        assert_eq!(out, "WEBVTT\n\n00:00:01.000 --> 00:00:03.000\nonly\n");
    }

    #[test]
    fn test_overlapping_cue_clipped_to_next_start() {
        let t = transcript(vec![("long", 0.0, 10.0), ("next", 4.0, 1.0)]);
        let out = SrtFormatter.format(&t).unwrap();
        assert!(out.contains("00:00:00,000 --> 00:00:04,000"));
    }

    #[test]
    fn test_final_snippet_keeps_own_end() {
        let t = transcript(vec![("tail", 10.0, 5.0)]);
        let out = SrtFormatter.format(&t).unwrap();
        assert!(out.contains("00:00:10,000 --> 00:00:15,000"));
    }

    #[test]
    fn test_hour_field_zero_padded_at_3600_seconds() {
        let t = transcript(vec![("late", 3600.0, 1.0)]);
        let srt = SrtFormatter.format(&t).unwrap();
        let vtt = WebVttFormatter.format(&t).unwrap();
        assert!(srt.contains("01:00:00,000 --> 01:00:01,000"));
        assert!(vtt.contains("01:00:00.000 --> 01:00:01.000"));
    }

    #[test]
    fn test_timecoded_multi_has_numbered_headers() {
        let t = three_snippets();
        let out = SrtFormatter.format_transcripts(&[t.clone(), t]).unwrap();
        assert!(out.starts_with("TRANSCRIPT 1:\n1\n00:00:00,000"));
        assert!(out.contains("\n\nTRANSCRIPT 2:\n"));
    }

    #[test]
    fn test_json_multi_is_single_array() {
        let t = three_snippets();
        let out = JsonFormatter.format_transcripts(&[t.clone(), t]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_factory_defaults_to_json() {
        let t = three_snippets();
        let out = formatter_for(None).unwrap().format(&t).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&out).is_ok());
    }

    #[test]
    fn test_factory_rejects_unknown_name() {
        let err = formatter_for(Some("yaml")).unwrap_err();
        assert_eq!(err, TranscriptError::UnsupportedFormat("yaml".to_string()));
        assert!(err.to_string().contains("text, json, srt, webvtt"));
    }
}
