use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TranscriptError;

/// A language a caption track can be machine-translated into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationTarget {
    pub language_code: String,
    pub display_name: String,
}

/// One selectable caption track of a video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Address of the timed-text payload
    pub fetch_url: String,

    /// Human-readable track name
    pub display_name: String,

    /// BCP-47 style language code
    pub language_code: String,

    /// Whether the track was machine-generated (speech recognition)
    pub is_generated: bool,

    /// Languages this track can be translated into; empty when the track is
    /// not individually marked translatable
    pub translation_targets: Vec<TranslationTarget>,
}

impl CaptionTrack {
    /// The offered translation target matching `code`, if any
    pub fn translation_target(&self, code: &str) -> Option<&TranslationTarget> {
        self.translation_targets
            .iter()
            .find(|t| t.language_code == code)
    }

    /// Payload address for a machine translation of this track.
    ///
    /// Fails when the track offers no translations at all, or when the
    /// requested target is not among its offered targets.
    pub fn translation_url(
        &self,
        video_id: &str,
        target_code: &str,
    ) -> Result<String, TranscriptError> {
        if self.translation_targets.is_empty() {
            return Err(TranscriptError::NotTranslatable {
                video_id: video_id.to_string(),
                language_code: self.language_code.clone(),
            });
        }
        if self.translation_target(target_code).is_none() {
            return Err(TranscriptError::TranslationLanguageNotAvailable {
                video_id: video_id.to_string(),
                requested: target_code.to_string(),
            });
        }
        Ok(format!(
            "{}&tlang={}",
            self.fetch_url,
            urlencoding::encode(target_code)
        ))
    }
}

/// All caption tracks a watch page advertises, split by provenance
///
/// A language code appears at most once per partition; a video may offer both
/// a manual and a generated track for the same code.
#[derive(Debug, Clone, Default)]
pub struct TrackCatalog {
    pub video_id: String,
    pub manual: HashMap<String, CaptionTrack>,
    pub generated: HashMap<String, CaptionTrack>,
}

impl TrackCatalog {
    /// Build a catalog from the caption track container of a watch page.
    ///
    /// Individual tracks with missing required fields are skipped silently;
    /// upstream data is known to be inconsistent and partial availability
    /// beats total failure. A container with no track list at all is the one
    /// caller-level error.
    pub fn build(renderer: &Value, video_id: &str) -> Result<Self, TranscriptError> {
        let raw_tracks = renderer
            .get("captionTracks")
            .and_then(Value::as_array)
            .ok_or_else(|| TranscriptError::NoTranscriptFound {
                video_id: video_id.to_string(),
                languages: Vec::new(),
            })?;

        let translation_targets: Vec<TranslationTarget> = renderer
            .get("translationLanguages")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        Some(TranslationTarget {
                            language_code: entry.get("languageCode")?.as_str()?.to_string(),
                            display_name: track_name(entry.get("languageName")?)?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut catalog = Self {
            video_id: video_id.to_string(),
            ..Self::default()
        };

        for raw in raw_tracks {
            let Some(track) = parse_track(raw, &translation_targets) else {
                tracing::debug!("skipping malformed caption track entry");
                continue;
            };
            // Last writer wins on a code collision, matching source order.
            let partition = if track.is_generated {
                &mut catalog.generated
            } else {
                &mut catalog.manual
            };
            partition.insert(track.language_code.clone(), track);
        }

        Ok(catalog)
    }

    /// Pick the best track for an ordered language preference list.
    ///
    /// The whole preference list is scanned against manual tracks before
    /// generated tracks are considered at all: provenance trumps language
    /// rank, so a lower-ranked manual track beats a higher-ranked generated
    /// one. This is a deliberate policy, not an oversight.
    pub fn select(&self, languages: &[String]) -> Result<&CaptionTrack, TranscriptError> {
        for code in languages {
            if let Some(track) = self.manual.get(code) {
                return Ok(track);
            }
        }
        for code in languages {
            if let Some(track) = self.generated.get(code) {
                return Ok(track);
            }
        }
        Err(TranscriptError::NoTranscriptFound {
            video_id: self.video_id.clone(),
            languages: languages.to_vec(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.manual.is_empty() && self.generated.is_empty()
    }

    /// Manual tracks ordered by language code, for stable display
    pub fn manual_sorted(&self) -> Vec<&CaptionTrack> {
        sorted_by_code(self.manual.values())
    }

    /// Generated tracks ordered by language code, for stable display
    pub fn generated_sorted(&self) -> Vec<&CaptionTrack> {
        sorted_by_code(self.generated.values())
    }

    /// Translation targets offered by any track of this catalog,
    /// deduplicated and ordered by language code
    pub fn translation_targets(&self) -> Vec<&TranslationTarget> {
        let mut out: Vec<&TranslationTarget> = Vec::new();
        let all = self
            .manual
            .values()
            .chain(self.generated.values())
            .flat_map(|t| t.translation_targets.iter());
        for target in all {
            if !out.iter().any(|seen| seen.language_code == target.language_code) {
                out.push(target);
            }
        }
        out.sort_by(|a, b| a.language_code.cmp(&b.language_code));
        out
    }
}

fn sorted_by_code<'a>(tracks: impl Iterator<Item = &'a CaptionTrack>) -> Vec<&'a CaptionTrack> {
    let mut out: Vec<&CaptionTrack> = tracks.collect();
    out.sort_by(|a, b| a.language_code.cmp(&b.language_code));
    out
}

fn parse_track(raw: &Value, targets: &[TranslationTarget]) -> Option<CaptionTrack> {
    let fetch_url = raw.get("baseUrl")?.as_str()?.replace("\\u0026", "&");
    let language_code = raw.get("languageCode")?.as_str()?.to_string();
    let display_name = raw
        .get("name")
        .and_then(track_name)
        .unwrap_or_else(|| language_code.clone());
    let is_generated = raw.get("kind").and_then(Value::as_str) == Some("asr");
    let translatable = raw
        .get("isTranslatable")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Some(CaptionTrack {
        fetch_url,
        display_name,
        language_code,
        is_generated,
        translation_targets: if translatable { targets.to_vec() } else { Vec::new() },
    })
}

/// Track names come as either {"simpleText": ...} or {"runs": [{"text": ...}]}
fn track_name(name: &Value) -> Option<String> {
    if let Some(simple) = name.get("simpleText").and_then(Value::as_str) {
        return Some(simple.to_string());
    }
    name.pointer("/runs/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "dQw4w9WgXcQ";

    fn renderer() -> Value {
        json!({
            "captionTracks": [
                {
                    "baseUrl": "https://example.com/api/timedtext?lang=es",
                    "name": { "simpleText": "Spanish" },
                    "languageCode": "es",
                    "isTranslatable": true
                },
                {
                    "baseUrl": "https://example.com/api/timedtext?lang=en&kind=asr",
                    "name": { "runs": [{ "text": "English (auto-generated)" }] },
                    "languageCode": "en",
                    "kind": "asr"
                }
            ],
            "translationLanguages": [
                { "languageCode": "de", "languageName": { "simpleText": "German" } },
                { "languageCode": "fr", "languageName": { "simpleText": "French" } }
            ]
        })
    }

    #[test]
    fn test_build_partitions_by_provenance() {
        let catalog = TrackCatalog::build(&renderer(), ID).unwrap();
        assert!(catalog.manual.contains_key("es"));
        assert!(catalog.generated.contains_key("en"));
        assert_eq!(catalog.manual.len(), 1);
        assert_eq!(catalog.generated.len(), 1);
    }

    #[test]
    fn test_translation_targets_only_on_translatable_tracks() {
        let catalog = TrackCatalog::build(&renderer(), ID).unwrap();
        assert_eq!(catalog.manual["es"].translation_targets.len(), 2);
        assert!(catalog.generated["en"].translation_targets.is_empty());
    }

    #[test]
    fn test_malformed_track_skipped_silently() {
        let value = json!({
            "captionTracks": [
                { "name": { "simpleText": "no url or code" } },
                { "baseUrl": "https://example.com/t?lang=en", "languageCode": "en" }
            ]
        });
        let catalog = TrackCatalog::build(&value, ID).unwrap();
        assert_eq!(catalog.manual.len(), 1);
        assert!(catalog.generated.is_empty());
    }

    #[test]
    fn test_missing_track_list_is_no_transcript_found_with_empty_languages() {
        let err = TrackCatalog::build(&json!({}), ID).unwrap_err();
        assert_eq!(
            err,
            TranscriptError::NoTranscriptFound {
                video_id: ID.to_string(),
                languages: Vec::new(),
            }
        );
    }

    #[test]
    fn test_duplicate_code_last_writer_wins() {
        let value = json!({
            "captionTracks": [
                { "baseUrl": "https://example.com/first", "languageCode": "en" },
                { "baseUrl": "https://example.com/second", "languageCode": "en" }
            ]
        });
        let catalog = TrackCatalog::build(&value, ID).unwrap();
        assert_eq!(catalog.manual["en"].fetch_url, "https://example.com/second");
    }

    #[test]
    fn test_selection_prefers_manual_over_generated_across_ranks() {
        // Generated "en" matches the first preference, but the manual "es"
        // further down the list must win.
        let catalog = TrackCatalog::build(&renderer(), ID).unwrap();
        let languages = vec!["en".to_string(), "es".to_string()];
        let track = catalog.select(&languages).unwrap();
        assert_eq!(track.language_code, "es");
        assert!(!track.is_generated);
    }

    #[test]
    fn test_selection_falls_back_to_generated() {
        let catalog = TrackCatalog::build(&renderer(), ID).unwrap();
        let languages = vec!["en".to_string()];
        let track = catalog.select(&languages).unwrap();
        assert!(track.is_generated);
    }

    #[test]
    fn test_selection_failure_carries_requested_languages() {
        let catalog = TrackCatalog::build(&renderer(), ID).unwrap();
        let languages = vec!["ja".to_string(), "ko".to_string()];
        let err = catalog.select(&languages).unwrap_err();
        assert_eq!(
            err,
            TranscriptError::NoTranscriptFound {
                video_id: ID.to_string(),
                languages,
            }
        );
    }

    #[test]
    fn test_translation_target_carries_its_own_display_name() {
        let catalog = TrackCatalog::build(&renderer(), ID).unwrap();
        let target = catalog.manual["es"].translation_target("de").unwrap();
        assert_eq!(target.display_name, "German");
        assert!(catalog.manual["es"].translation_target("xx").is_none());
    }

    #[test]
    fn test_listing_accessors_sort_by_language_code() {
        let value = json!({
            "captionTracks": [
                { "baseUrl": "https://example.com/t?lang=sv", "languageCode": "sv" },
                { "baseUrl": "https://example.com/t?lang=de", "languageCode": "de" },
                { "baseUrl": "https://example.com/t?lang=fr", "languageCode": "fr" },
                { "baseUrl": "https://example.com/t?lang=pt&kind=asr", "languageCode": "pt", "kind": "asr" },
                { "baseUrl": "https://example.com/t?lang=en&kind=asr", "languageCode": "en", "kind": "asr" }
            ]
        });
        let catalog = TrackCatalog::build(&value, ID).unwrap();

        let manual: Vec<&str> = catalog
            .manual_sorted()
            .iter()
            .map(|t| t.language_code.as_str())
            .collect();
        assert_eq!(manual, ["de", "fr", "sv"]);

        let generated: Vec<&str> = catalog
            .generated_sorted()
            .iter()
            .map(|t| t.language_code.as_str())
            .collect();
        assert_eq!(generated, ["en", "pt"]);
    }

    #[test]
    fn test_translation_targets_listing_is_sorted() {
        let catalog = TrackCatalog::build(&renderer(), ID).unwrap();
        let codes: Vec<&str> = catalog
            .translation_targets()
            .iter()
            .map(|t| t.language_code.as_str())
            .collect();
        assert_eq!(codes, ["de", "fr"]);
    }

    #[test]
    fn test_translation_url_appends_target() {
        let catalog = TrackCatalog::build(&renderer(), ID).unwrap();
        let url = catalog.manual["es"].translation_url(ID, "de").unwrap();
        assert!(url.ends_with("&tlang=de"));
    }

    #[test]
    fn test_translation_of_untranslatable_track_fails() {
        let catalog = TrackCatalog::build(&renderer(), ID).unwrap();
        let err = catalog.generated["en"].translation_url(ID, "de").unwrap_err();
        assert!(matches!(err, TranscriptError::NotTranslatable { .. }));
    }

    #[test]
    fn test_translation_to_unoffered_language_fails() {
        let catalog = TrackCatalog::build(&renderer(), ID).unwrap();
        let err = catalog.manual["es"].translation_url(ID, "xx").unwrap_err();
        assert!(matches!(
            err,
            TranscriptError::TranslationLanguageNotAvailable { .. }
        ));
    }
}
