//! Lightweight existence checks for candidate URLs.
//!
//! A probe answers one question: does this URL currently serve an asset of the
//! expected media family? It never downloads the body and never fails loudly;
//! any transport problem is a miss.

use crate::config::ProbeConfig;
use crate::types::MediaKind;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;
use url::Url;

/// Existence check used by the load queues.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Whether `url` serves an asset of `kind`.
    async fn probe(&self, url: &str, kind: MediaKind) -> bool;
}

/// HTTP prober issuing `HEAD` requests.
///
/// Servers that reject `HEAD` (405 or 501) get one retry as a single-byte
/// ranged `GET`.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    base_url: Option<Url>,
    check_content_type: bool,
}

impl HttpProber {
    /// Creates a prober from the probe settings.
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .brotli(true);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::Network)?;
        Ok(Self {
            client,
            base_url: None,
            check_content_type: config.check_content_type,
        })
    }

    /// Origin that site-relative paths such as `/galeria/a.jpg` are joined to.
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        let base =
            Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))?;
        self.base_url = Some(base);
        Ok(self)
    }

    /// Absolute URL a candidate is requested from.
    pub fn absolute_url(&self, candidate: &str) -> Result<Url> {
        match Url::parse(candidate) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_ref().ok_or_else(|| {
                    Error::InvalidUrl(format!("{candidate}: relative path and no base URL"))
                })?;
                base.join(candidate)
                    .map_err(|e| Error::InvalidUrl(format!("{candidate}: {e}")))
            },
            Err(e) => Err(Error::InvalidUrl(format!("{candidate}: {e}"))),
        }
    }

    async fn request(&self, url: Url, kind: MediaKind) -> Result<bool> {
        let response = self.client.head(url.clone()).send().await?;
        let response = match response.status() {
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED => {
                debug!(%url, "HEAD rejected, retrying with ranged GET");
                self.client.get(url).header(RANGE, "bytes=0-0").send().await?
            },
            _ => response,
        };
        Ok(self.accepts(&response, kind))
    }

    fn accepts(&self, response: &Response, kind: MediaKind) -> bool {
        if !response.status().is_success() {
            return false;
        }
        if !self.check_content_type {
            return true;
        }
        // A missing header is not evidence against the asset.
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| {
                ct.trim_start()
                    .to_ascii_lowercase()
                    .starts_with(kind.content_type_prefix())
            })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, kind: MediaKind) -> bool {
        let target = match self.absolute_url(url) {
            Ok(target) => target,
            Err(e) => {
                debug!("Skipping probe: {e}");
                return false;
            },
        };
        match self.request(target, kind).await {
            Ok(found) => {
                debug!(url, found, "Probed candidate");
                found
            },
            Err(e) => {
                debug!(url, "Probe failed: {e}");
                false
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    fn prober(server: &MockServer) -> HttpProber {
        HttpProber::new(&ProbeConfig::default())
            .unwrap()
            .with_base_url(&server.uri())
            .unwrap()
    }

    #[tokio::test]
    async fn test_head_hit_with_matching_content_type() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/galeria/a.webp"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/webp"))
            .expect(1)
            .mount(&server)
            .await;

        assert!(prober(&server).probe("/galeria/a.webp", MediaKind::Image).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_asset_is_a_miss() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(!prober(&server).probe("/galeria/a.jpg", MediaKind::Image).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_media_family_is_a_miss() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/index.html"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "video/mp4"))
            .mount(&server)
            .await;

        let prober = prober(&server);
        assert!(!prober.probe("/index.html", MediaKind::Image).await);
        assert!(!prober.probe("/clip.mp4", MediaKind::Image).await);
        assert!(prober.probe("/clip.mp4", MediaKind::Video).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_content_type_check_can_be_disabled() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "application/octet-stream"),
            )
            .mount(&server)
            .await;

        let config = ProbeConfig {
            check_content_type: false,
            ..ProbeConfig::default()
        };
        let prober = HttpProber::new(&config)?.with_base_url(&server.uri())?;
        assert!(prober.probe("/a.png", MediaKind::Image).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_head_rejected_falls_back_to_ranged_get() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/videos/desfile.mp4"))
            .and(header("range", "bytes=0-0"))
            .respond_with(ResponseTemplate::new(206).insert_header("content-type", "video/mp4"))
            .expect(1)
            .mount(&server)
            .await;

        assert!(prober(&server).probe("/videos/desfile.mp4", MediaKind::Video).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_absolute_candidate_ignores_base() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/cdn/a.jpg"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = HttpProber::new(&ProbeConfig::default())?;
        let url = format!("{}/cdn/a.jpg", server.uri());
        assert!(prober.probe(&url, MediaKind::Image).await);
        // Relative path with no base configured cannot be probed
        assert!(!prober.probe("/cdn/a.jpg", MediaKind::Image).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_is_a_miss() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let config = ProbeConfig {
            timeout_ms: Some(100),
            ..ProbeConfig::default()
        };
        let prober = HttpProber::new(&config)?.with_base_url(&server.uri())?;
        assert!(!prober.probe("/slow.jpg", MediaKind::Image).await);
        Ok(())
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpProber::new(&ProbeConfig::default())
            .unwrap()
            .with_base_url("not a url")
            .unwrap_err();
        assert_eq!(err.category(), "url");
    }
}
