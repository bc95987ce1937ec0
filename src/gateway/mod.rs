use std::time::Duration;

use async_trait::async_trait;

use crate::config::GatewayConfig;
use crate::timedtext;
use crate::transcript::Transcript;
use crate::Result;

/// A mirror service capable of serving the same caption data when the
/// primary source is unreachable or blocking the request.
#[async_trait]
pub trait CaptionGateway: Send + Sync {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: &[String],
        preserve_formatting: bool,
    ) -> Result<Transcript>;
}

/// Gateway speaking the plain timed-text endpoint shape:
/// `{base}/api/timedtext?v={id}&lang={code}`
pub struct TimedTextGateway {
    base_urls: Vec<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl TimedTextGateway {
    /// The caller's client is reused so gateway fetches go through the same
    /// proxy and user-agent options as the primary path; only the timeout is
    /// gateway-specific.
    pub fn new(client: reqwest::Client, config: &GatewayConfig) -> Self {
        Self {
            base_urls: config.base_urls.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            client,
        }
    }

    async fn try_one(&self, base: &str, video_id: &str, code: &str) -> Result<String> {
        let url = format!(
            "{}/api/timedtext?v={}&lang={}",
            base.trim_end_matches('/'),
            urlencoding::encode(video_id),
            urlencoding::encode(code)
        );
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl CaptionGateway for TimedTextGateway {
    /// Try every configured base address against the preference list in
    /// order; the first payload that parses to at least one snippet wins.
    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: &[String],
        preserve_formatting: bool,
    ) -> Result<Transcript> {
        for base in &self.base_urls {
            for code in languages {
                let payload = match self.try_one(base, video_id, code).await {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::debug!("gateway {} failed for lang {}: {}", base, code, e);
                        continue;
                    }
                };

                let snippets = timedtext::parse(&payload, preserve_formatting);
                if snippets.is_empty() {
                    continue;
                }

                return Ok(Transcript {
                    snippets,
                    video_id: video_id.to_string(),
                    language: code.clone(),
                    language_code: code.clone(),
                    is_generated: false,
                });
            }
        }

        anyhow::bail!(
            "no configured gateway produced captions for video '{}'",
            video_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_configured_gateways_is_an_error() {
        let config = GatewayConfig {
            enabled: true,
            base_urls: Vec::new(),
            timeout_secs: 5,
            try_first: false,
        };
        let gateway = TimedTextGateway::new(reqwest::Client::new(), &config);

        let err = gateway
            .fetch_transcript("dQw4w9WgXcQ", &["en".to_string()], false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no configured gateway"));
    }
}
