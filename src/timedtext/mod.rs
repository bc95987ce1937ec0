use regex::Regex;

use crate::transcript::TranscriptSnippet;

/// Inline emphasis tags kept when formatting is preserved.
///
/// The literal tag set is an output-compatibility contract shared with other
/// implementations, not a tuning knob.
const FORMATTING_TAGS: &[&str] = &[
    "strong", "em", "b", "i", "mark", "small", "del", "ins", "sub", "sup",
];

/// Decode a raw caption payload into ordered timed snippets.
///
/// Two dialects are served by the source: the XML "transcript" dialect and
/// WebVTT. Snippets come back in document/cue order with no re-sorting and no
/// de-duplication; a payload yielding zero snippets is not an error here.
pub fn parse(payload: &str, preserve_formatting: bool) -> Vec<TranscriptSnippet> {
    let trimmed = payload.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with("WEBVTT") {
        parse_webvtt(trimmed, preserve_formatting)
    } else {
        parse_xml(payload, preserve_formatting)
    }
}

/// Parse the XML dialect: repeated `<text start="S" dur="D">BODY</text>`.
///
/// The source escapes at both the document and the field level, so the whole
/// payload is decoded once before the structural match and each element body
/// is decoded again afterwards.
fn parse_xml(payload: &str, preserve_formatting: bool) -> Vec<TranscriptSnippet> {
    let decoded = decode_escape_layer(payload);

    let element_re =
        Regex::new(r#"(?s)<text\s+start="([^"]*)"(?:\s+dur="([^"]*)")?[^>]*>(.*?)</text>"#)
            .unwrap();

    element_re
        .captures_iter(&decoded)
        .filter_map(|caps| {
            let start: f64 = caps[1].parse().ok()?;
            let duration: f64 = caps
                .get(2)
                .map(|m| m.as_str().parse().unwrap_or(0.0))
                .unwrap_or(0.0);
            let text = clean_text(&caps[3], preserve_formatting);
            Some(TranscriptSnippet {
                text,
                start,
                duration,
            })
        })
        .collect()
}

/// Parse the WebVTT dialect: header line, then `TS --> TS` cue blocks.
fn parse_webvtt(payload: &str, preserve_formatting: bool) -> Vec<TranscriptSnippet> {
    let mut snippets = Vec::new();
    let mut lines = payload.lines();

    while let Some(line) = lines.next() {
        let Some((start_raw, end_raw)) = line.trim().split_once("-->") else {
            continue;
        };
        let Some(start) = parse_timestamp(start_raw.trim()) else {
            continue;
        };
        // Cue settings may trail the end timestamp; take the first token.
        let end_token = end_raw.trim().split_whitespace().next().unwrap_or("");
        let Some(end) = parse_timestamp(end_token) else {
            continue;
        };

        let mut body: Vec<&str> = Vec::new();
        for text_line in lines.by_ref() {
            let text_line = text_line.trim();
            if text_line.is_empty() {
                break;
            }
            body.push(text_line);
        }

        snippets.push(TranscriptSnippet {
            text: clean_text(&body.join("\n"), preserve_formatting),
            start,
            duration: (end - start).max(0.0),
        });
    }

    snippets
}

/// Convert `HH:MM:SS.mmm` (or `MM:SS.mmm`) to fractional seconds.
fn parse_timestamp(raw: &str) -> Option<f64> {
    let parts: Vec<&str> = raw.split(':').collect();
    let (hours, minutes, seconds) = match parts.len() {
        3 => (parts[0], parts[1], parts[2]),
        2 => ("0", parts[0], parts[1]),
        _ => return None,
    };

    let hours: f64 = hours.parse().ok()?;
    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Undo the backslash-escape layer, then the entity layer, over a whole payload.
fn decode_escape_layer(raw: &str) -> String {
    let unescaped = unescape_backslashes(raw);
    html_escape::decode_html_entities(&unescaped).into_owned()
}

fn unescape_backslashes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('/') => out.push('/'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Entity-decode an element body and apply the tag policy.
///
/// Without formatting preservation every tag is stripped and run-length
/// whitespace collapses to single spaces; with preservation the allow-listed
/// emphasis tags survive and whitespace is left alone.
fn clean_text(body: &str, preserve_formatting: bool) -> String {
    let decoded = html_escape::decode_html_entities(body);
    let tag_re = Regex::new(r"</?([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").unwrap();

    if preserve_formatting {
        return tag_re
            .replace_all(&decoded, |caps: &regex::Captures| {
                let name = caps[1].to_lowercase();
                if FORMATTING_TAGS.contains(&name.as_str()) {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            })
            .into_owned();
    }

    let stripped = tag_re.replace_all(&decoded, "");
    let ws_re = Regex::new(r"\s+").unwrap();
    ws_re.replace_all(&stripped, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_single_element() {
        let payload = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="4.5">Never gonna give you up</text></transcript>"#;
        let snippets = parse(payload, false);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].text, "Never gonna give you up");
        assert_eq!(snippets[0].start, 0.0);
        assert!((snippets[0].duration - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_xml_preserves_document_order() {
        let payload = r#"<transcript><text start="5" dur="1">second</text><text start="0" dur="1">first</text></transcript>"#;
        let snippets = parse(payload, false);
        assert_eq!(snippets[0].text, "second");
        assert_eq!(snippets[1].text, "first");
    }

    #[test]
    fn test_xml_double_escaped_entities() {
        // The field level carries its own entity layer on top of the
        // document-level one.
        let payload = r#"<transcript><text start="0" dur="1">it&amp;#39;s &amp;quot;here&amp;quot;</text></transcript>"#;
        let snippets = parse(payload, false);
        assert_eq!(snippets[0].text, "it's \"here\"");
    }

    #[test]
    fn test_xml_backslash_unicode_escapes() {
        let payload = "<transcript><text start=\"0\" dur=\"1\">fish \\u0026 chips</text></transcript>";
        let snippets = parse(payload, false);
        assert_eq!(snippets[0].text, "fish & chips");
    }

    #[test]
    fn test_formatting_stripped_by_default() {
        let payload = r#"<transcript><text start="0" dur="4.5">Never gonna <i>give</i>  you up</text></transcript>"#;
        let snippets = parse(payload, false);
        assert_eq!(snippets[0].text, "Never gonna give you up");
    }

    #[test]
    fn test_formatting_preserved_keeps_allow_listed_tags() {
        let payload = r#"<transcript><text start="0" dur="4.5">Never gonna <i>give</i> you up</text></transcript>"#;
        let snippets = parse(payload, true);
        assert_eq!(snippets[0].text, "Never gonna <i>give</i> you up");
    }

    #[test]
    fn test_non_emphasis_tags_stripped_even_when_preserving() {
        let payload = r#"<transcript><text start="0" dur="1"><font color="red">hi</font> <b>there</b></text></transcript>"#;
        let snippets = parse(payload, true);
        assert_eq!(snippets[0].text, "hi <b>there</b>");
    }

    #[test]
    fn test_xml_missing_dur_defaults_to_zero() {
        let payload = r#"<transcript><text start="1.5">tail</text></transcript>"#;
        let snippets = parse(payload, false);
        assert_eq!(snippets[0].duration, 0.0);
    }

    #[test]
    fn test_empty_payload_yields_no_snippets() {
        assert!(parse("<transcript></transcript>", false).is_empty());
    }

    #[test]
    fn test_webvtt_basic_cues() {
        let payload = "WEBVTT\n\n00:00:00.000 --> 00:00:02.500\nHello\n\n00:00:02.500 --> 00:00:05.000\nWorld\n";
        let snippets = parse(payload, false);
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].text, "Hello");
        assert!((snippets[0].duration - 2.5).abs() < f64::EPSILON);
        assert!((snippets[1].start - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_webvtt_short_timestamps() {
        let payload = "WEBVTT\n\n01:05.250 --> 01:07.750\nshort form\n";
        let snippets = parse(payload, false);
        assert!((snippets[0].start - 65.25).abs() < f64::EPSILON);
        assert!((snippets[0].duration - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_webvtt_multiline_cue_joins_with_newline() {
        let payload = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\nline one\nline two\n";
        let snippets = parse(payload, true);
        assert_eq!(snippets[0].text, "line one\nline two");
    }

    #[test]
    fn test_webvtt_cue_settings_after_end_timestamp() {
        let payload = "WEBVTT\n\n00:00:01.000 --> 00:00:03.000 align:start position:0%\npositioned\n";
        let snippets = parse(payload, false);
        assert_eq!(snippets.len(), 1);
        assert!((snippets[0].duration - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_webvtt_tags_follow_same_policy() {
        let payload = "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\n<c.colorCCCCCC>styled</c> <b>bold</b>\n";
        assert_eq!(parse(payload, false)[0].text, "styled bold");
        assert_eq!(parse(payload, true)[0].text, "styled <b>bold</b>");
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        assert!(parse_timestamp("not-a-time").is_none());
        assert!(parse_timestamp("1:2:3:4").is_none());
    }
}
