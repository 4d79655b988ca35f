use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::app::{HarvestError, Result};
use crate::config::FetchConfig;
use crate::fetcher::{Fetcher, Request, RateLimiter};

pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    limiter: RateLimiter,
    requests: AtomicU64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)?,
            limiter: RateLimiter::new(config.min_interval()),
            requests: AtomicU64::new(0),
        })
    }

    fn url_for(&self, request: &Request) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(Some(&request.query()));
        url
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<String> {
        let url = self.url_for(request);

        self.limiter.wait_then_mark().await;
        tracing::info!("Issuing request for {}", request.query());

        let response = self.client.get(url.clone()).send().await?;
        self.requests.fetch_add(1, Ordering::Relaxed);

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Retrieval {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }

    fn requests_issued(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}
