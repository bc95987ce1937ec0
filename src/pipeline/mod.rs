use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use futures_util::future::join_all;

use crate::config::{CacheConfig, Config, GatewayConfig, NetworkConfig};
use crate::format;
use crate::gateway::{CaptionGateway, TimedTextGateway};
use crate::page::{self, VideoMetadata};
use crate::timedtext;
use crate::tracks::TrackCatalog;
use crate::transcript::Transcript;
use crate::video_id;
use crate::{Result, TranscriptError};

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Identifiers per concurrent batch group
pub const BATCH_GROUP_SIZE: usize = 3;

/// Result of one single-video resolution
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub transcript: Transcript,
    pub metadata: VideoMetadata,
    pub formatted: Option<String>,
}

/// Aggregate result of a batch resolution
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: HashMap<String, FetchResponse>,
    pub errors: HashMap<String, anyhow::Error>,
}

/// Which cache(s) a clear operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    All,
    Pages,
    Transcripts,
}

struct CacheEntry<T> {
    data: T,
    stored_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            stored_at: Instant::now(),
        }
    }

    /// Expiry is lazy: age is checked at read time, stale entries yield None.
    fn fresh(&self, max_age: Duration) -> Option<T> {
        (self.stored_at.elapsed() <= max_age).then(|| self.data.clone())
    }
}

/// Main transcript resolution pipeline
///
/// Composes identifier normalization, page fetch, failure classification,
/// metadata/catalog extraction, track selection and payload parsing, with a
/// short-lived page cache and transcript cache in front of the fetch steps.
pub struct TranscriptPipeline {
    client: reqwest::Client,
    config: Config,
    page_cache: Mutex<HashMap<String, CacheEntry<String>>>,
    transcript_cache: Mutex<HashMap<String, CacheEntry<Transcript>>>,
}

impl TranscriptPipeline {
    /// Create a new pipeline
    pub fn new(config: Config) -> Result<Self> {
        let client = build_client(&config.network)?;
        Ok(Self {
            client,
            config,
            page_cache: Mutex::new(HashMap::new()),
            transcript_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Resolve a single reference to a transcript plus page metadata,
    /// optionally rendering it through a named formatter.
    pub async fn fetch_transcript(
        &self,
        reference: &str,
        languages: &[String],
        preserve_formatting: bool,
        format_name: Option<&str>,
    ) -> Result<FetchResponse> {
        let video_id = video_id::normalize(reference)?;
        tracing::info!("Resolving transcript for video: {}", video_id);

        // A transcript cache hit still needs the page (or page cache) so the
        // response carries current metadata.
        let html = self.page_html(&video_id).await?;
        let metadata = self.metadata_or_classify(&html, &video_id)?;

        let key = transcript_key(&video_id, languages, preserve_formatting);
        if let Some(transcript) = self.cached_transcript(&key) {
            tracing::debug!("transcript cache hit for {}", key);
            return respond(transcript, metadata, format_name);
        }

        let gateway = self.config.gateway.clone();
        if gateway.enabled && gateway.try_first {
            match self
                .gateway_fetch(&gateway, &video_id, languages, preserve_formatting)
                .await
            {
                Ok(transcript) => {
                    self.store_transcript(&key, &transcript);
                    return respond(transcript, metadata, format_name);
                }
                Err(e) => {
                    tracing::debug!("gateway-first path failed, using primary: {}", e);
                }
            }
        }

        match self
            .resolve_primary(&video_id, &html, languages, preserve_formatting)
            .await
        {
            Ok(transcript) => {
                self.store_transcript(&key, &transcript);
                respond(transcript, metadata, format_name)
            }
            Err(primary_error) => {
                if gateway.enabled && !gateway.try_first {
                    if let Ok(transcript) = self
                        .gateway_fetch(&gateway, &video_id, languages, preserve_formatting)
                        .await
                    {
                        self.store_transcript(&key, &transcript);
                        return respond(transcript, metadata, format_name);
                    }
                    // The fallback is invisible on total failure: its own
                    // error is discarded and the primary error propagates.
                }
                Err(primary_error)
            }
        }
    }

    /// Fetch a machine translation of the best-matching track.
    pub async fn fetch_translated(
        &self,
        reference: &str,
        languages: &[String],
        target_code: &str,
        preserve_formatting: bool,
        format_name: Option<&str>,
    ) -> Result<FetchResponse> {
        let video_id = video_id::normalize(reference)?;
        let html = self.page_html(&video_id).await?;
        let metadata = self.metadata_or_classify(&html, &video_id)?;

        let renderer = page::captions_renderer(&html, &video_id)?;
        let catalog = TrackCatalog::build(&renderer, &video_id)?;
        let track = catalog.select(languages)?;
        let url = track.translation_url(&video_id, target_code)?;

        let payload = self.fetch_payload(&url).await?;
        let snippets = timedtext::parse(&payload, preserve_formatting);
        if snippets.is_empty() {
            return Err(TranscriptError::NoTranscriptFound {
                video_id: video_id.clone(),
                languages: vec![target_code.to_string()],
            }
            .into());
        }

        // The display name belongs to the translation target, not to the
        // source track the translation was derived from.
        let language = track
            .translation_target(target_code)
            .map(|target| target.display_name.clone())
            .unwrap_or_else(|| target_code.to_string());

        let transcript = Transcript {
            snippets,
            video_id,
            language,
            language_code: target_code.to_string(),
            is_generated: track.is_generated,
        };
        respond(transcript, metadata, format_name)
    }

    /// List all caption tracks the watch page advertises.
    pub async fn list_tracks(&self, reference: &str) -> Result<TrackCatalog> {
        let video_id = video_id::normalize(reference)?;
        let html = self.page_html(&video_id).await?;
        let renderer = page::captions_renderer(&html, &video_id)?;
        Ok(TrackCatalog::build(&renderer, &video_id)?)
    }

    /// Resolve many references in concurrent groups of [`BATCH_GROUP_SIZE`].
    ///
    /// All members of a group run concurrently; the next group starts only
    /// when the current one has fully finished. With `stop_on_error` the
    /// remaining groups are skipped after a group containing a failure.
    pub async fn fetch_batch(
        &self,
        references: &[String],
        languages: &[String],
        preserve_formatting: bool,
        format_name: Option<&str>,
        stop_on_error: bool,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for group in references.chunks(BATCH_GROUP_SIZE) {
            let fetches = group.iter().map(|reference| {
                self.fetch_transcript(reference, languages, preserve_formatting, format_name)
            });
            let results = join_all(fetches).await;

            let mut group_failed = false;
            for (reference, result) in group.iter().zip(results) {
                match result {
                    Ok(response) => {
                        outcome.results.insert(reference.clone(), response);
                    }
                    Err(e) => {
                        tracing::warn!("batch item '{}' failed: {}", reference, e);
                        group_failed = true;
                        outcome.errors.insert(reference.clone(), e);
                    }
                }
            }

            if stop_on_error && group_failed {
                tracing::info!("stopping batch after failed group");
                break;
            }
        }

        outcome
    }

    /// Drop cached entries for the given scope.
    pub fn clear_cache(&self, scope: CacheScope) {
        if matches!(scope, CacheScope::All | CacheScope::Pages) {
            self.page_cache.lock().unwrap().clear();
        }
        if matches!(scope, CacheScope::All | CacheScope::Transcripts) {
            self.transcript_cache.lock().unwrap().clear();
        }
    }

    /// Replace the cache settings; existing entries expire under the new age.
    pub fn set_cache_config(&mut self, cache: CacheConfig) {
        self.config.cache = cache;
    }

    /// Replace the alternate-gateway settings.
    pub fn set_gateway_config(&mut self, gateway: GatewayConfig) {
        self.config.gateway = gateway;
    }

    /// Replace the cookie attached to outgoing requests.
    pub fn set_cookie(&mut self, cookie: Option<String>) {
        self.config.network.cookie = cookie;
    }

    /// Replace the network settings, rebuilding the HTTP client.
    pub fn set_network_config(&mut self, network: NetworkConfig) -> Result<()> {
        self.client = build_client(&network)?;
        self.config.network = network;
        Ok(())
    }

    /// Watch-page HTML for a video, served from cache when fresh.
    async fn page_html(&self, video_id: &str) -> Result<String> {
        if self.config.cache.enabled {
            let cache = self.page_cache.lock().unwrap();
            if let Some(entry) = cache.get(video_id) {
                if let Some(html) = entry.fresh(self.cache_max_age()) {
                    tracing::debug!("page cache hit for {}", video_id);
                    return Ok(html);
                }
            }
        }

        let html = self.fetch_page(video_id).await?;

        if self.config.cache.enabled {
            self.page_cache
                .lock()
                .unwrap()
                .insert(video_id.to_string(), CacheEntry::new(html.clone()));
        }
        Ok(html)
    }

    async fn fetch_page(&self, video_id: &str) -> Result<String> {
        let url = format!("{}{}", WATCH_URL_PREFIX, video_id);
        tracing::debug!("fetching watch page: {}", url);

        let mut request = self
            .client
            .get(&url)
            .header("Accept-Language", "en-US,en;q=0.9");
        if let Some(cookie) = &self.config.network.cookie {
            request = request.header("Cookie", cookie.clone());
        }

        let response = request.send().await.context("Failed to fetch watch page")?;

        // A transport-level not-found is the same terminal condition as a
        // page that says the video does not exist.
        if matches!(response.status().as_u16(), 404 | 410) {
            return Err(TranscriptError::VideoUnavailable(video_id.to_string()).into());
        }

        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }

    async fn fetch_payload(&self, url: &str) -> Result<String> {
        tracing::debug!("fetching caption payload: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch caption payload")?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    /// The primary path: classify, build the catalog, select a track, fetch
    /// and parse its payload.
    async fn resolve_primary(
        &self,
        video_id: &str,
        html: &str,
        languages: &[String],
        preserve_formatting: bool,
    ) -> Result<Transcript> {
        let renderer = page::captions_renderer(html, video_id)?;
        let catalog = TrackCatalog::build(&renderer, video_id)?;
        let track = catalog.select(languages)?;
        tracing::info!(
            "selected {} track '{}' ({})",
            if track.is_generated { "generated" } else { "manual" },
            track.display_name,
            track.language_code
        );

        let payload = self.fetch_payload(&track.fetch_url).await?;
        let snippets = timedtext::parse(&payload, preserve_formatting);

        // A payload that parses but yields nothing is surfaced as a missing
        // transcript rather than an empty success.
        if snippets.is_empty() {
            return Err(TranscriptError::NoTranscriptFound {
                video_id: video_id.to_string(),
                languages: languages.to_vec(),
            }
            .into());
        }

        Ok(Transcript {
            snippets,
            video_id: video_id.to_string(),
            language: track.display_name.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
        })
    }

    async fn gateway_fetch(
        &self,
        config: &GatewayConfig,
        video_id: &str,
        languages: &[String],
        preserve_formatting: bool,
    ) -> Result<Transcript> {
        let gateway = TimedTextGateway::new(self.client.clone(), config);
        gateway
            .fetch_transcript(video_id, languages, preserve_formatting)
            .await
    }

    /// Extract metadata, falling back to page classification so a blocked or
    /// unavailable page reports its typed condition instead of a generic
    /// extraction failure.
    fn metadata_or_classify(&self, html: &str, video_id: &str) -> Result<VideoMetadata> {
        match page::extract_metadata(html, video_id) {
            Ok(metadata) => Ok(metadata),
            Err(extract_error) => {
                page::captions_renderer(html, video_id)?;
                Err(extract_error)
            }
        }
    }

    fn cached_transcript(&self, key: &str) -> Option<Transcript> {
        if !self.config.cache.enabled {
            return None;
        }
        self.transcript_cache
            .lock()
            .unwrap()
            .get(key)
            .and_then(|entry| entry.fresh(self.cache_max_age()))
    }

    fn store_transcript(&self, key: &str, transcript: &Transcript) {
        if !self.config.cache.enabled {
            return;
        }
        self.transcript_cache
            .lock()
            .unwrap()
            .insert(key.to_string(), CacheEntry::new(transcript.clone()));
    }

    fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.config.cache.max_age_secs)
    }
}

fn build_client(network: &NetworkConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(
            network
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        )
        .timeout(Duration::from_secs(network.timeout_secs));

    if let Some(proxy) = &network.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy).context("Invalid proxy address")?);
    }

    builder.build().context("Failed to build HTTP client")
}

fn respond(
    transcript: Transcript,
    metadata: VideoMetadata,
    format_name: Option<&str>,
) -> Result<FetchResponse> {
    let formatted = match format_name {
        Some(name) => Some(format::formatter_for(Some(name))?.format(&transcript)?),
        None => None,
    };
    Ok(FetchResponse {
        transcript,
        metadata,
        formatted,
    })
}

/// Transcript cache entries are keyed by everything that influences the
/// resolved value: id, language preference order and the formatting flag.
fn transcript_key(video_id: &str, languages: &[String], preserve_formatting: bool) -> String {
    format!(
        "{}|{}|{}",
        video_id,
        languages.join(","),
        preserve_formatting
    )
}
