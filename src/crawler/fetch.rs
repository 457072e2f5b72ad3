use reqwest::Client;
use tracing::debug;

use crate::config::CrawlConfig;
use crate::error::{MineError, Result};

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Thin wrapper over a shared `reqwest::Client` configured from [`CrawlConfig`].
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.page_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<FetchedPage> {
        Self::validate_url(url)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "text/html, application/xhtml+xml")
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(FetchedPage {
            url: url.to_string(),
            status,
            body,
        })
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<(u16, Vec<u8>)> {
        Self::validate_url(url)?;
        debug!("GET {} (binary)", url);

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        Ok((status, bytes.to_vec()))
    }

    fn validate_url(raw: &str) -> Result<url::Url> {
        let parsed = url::Url::parse(raw)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MineError::InvalidUrl(format!(
                "only http and https URLs are supported: {}",
                raw
            )));
        }
        Ok(parsed)
    }
}
