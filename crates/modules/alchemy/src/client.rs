//! Alchemy Data API client: multi-chain token balances.
//!
//! Rate-limit aware: HTTP 429 is retried with exponential backoff. Every
//! other failure degrades to fewer holdings, never to an error.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use folio_common::error::{FolioError, FolioResult};
use folio_common::traits::BalancesProvider;
use folio_common::types::{FetchOptions, Holding, Network};
use folio_types::config::{mask_secret, AlchemyConfig};
use folio_utils::retry::{retry_with_backoff, RetryPolicy};

use crate::normalize::{extract_page, native_holding, normalize_entry};

const TOKENS_BY_ADDRESS: &str = "assets/tokens/by-address";

/// Upper bound on continuation pages followed for one slug.
const MAX_PAGES: usize = 50;

#[derive(Serialize)]
struct AddressQuery<'a> {
    address: &'a str,
    networks: [&'a str; 1],
}

#[derive(Serialize)]
struct TokensRequest<'a> {
    addresses: [AddressQuery<'a>; 1],
    #[serde(rename = "withMetadata")]
    with_metadata: bool,
    #[serde(rename = "withPrices")]
    with_prices: bool,
    #[serde(rename = "pageKey", skip_serializing_if = "Option::is_none")]
    page_key: Option<&'a str>,
}

/// Balances provider backed by `POST {data}/assets/tokens/by-address`.
#[derive(Clone)]
pub struct AlchemyClient {
    http: Client,
    api_key: Option<String>,
    data_api_url: String,
    retry: RetryPolicy,
    defaults: FetchOptions,
}

impl AlchemyClient {
    pub fn new(cfg: &AlchemyConfig, timeout: Duration) -> FolioResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FolioError::Network(format!("build HTTP client: {e}")))?;

        let api_key = cfg.api_key.clone().filter(|k| !k.is_empty());
        match &api_key {
            Some(k) => info!(key = %mask_secret(k), "Alchemy client initialized"),
            None => info!("Alchemy client initialized without API key"),
        }

        Ok(Self {
            http,
            api_key,
            data_api_url: cfg.data_api_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy {
                attempts: cfg.max_retries,
                base_delay_ms: 1000,
                max_delay_ms: 8000,
                jitter_ratio: 0.0,
            },
            defaults: FetchOptions {
                with_metadata: cfg.with_metadata,
                with_prices: cfg.with_prices,
            },
        })
    }

    /// Replace the 429 backoff policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Request toggles from config, for callers without their own.
    pub fn default_options(&self) -> FetchOptions {
        self.defaults
    }

    fn path_key_url(&self) -> Option<String> {
        self.api_key
            .as_ref()
            .map(|k| format!("{}/{}/{}", self.data_api_url, k, TOKENS_BY_ADDRESS))
    }

    fn header_key_url(&self) -> String {
        format!("{}/{}", self.data_api_url, TOKENS_BY_ADDRESS)
    }

    /// One page for one slug, with 429 backoff.
    async fn fetch_page(&self, body: &TokensRequest<'_>) -> FolioResult<serde_json::Value> {
        retry_with_backoff(
            &self.retry,
            move || self.post_once(body),
            |e: &FolioError, _| e.is_retryable(),
        )
        .await
    }

    /// Path-key variant first; the header-key variant when that answers
    /// 404 or when no key is configured.
    async fn post_once(&self, body: &TokensRequest<'_>) -> FolioResult<serde_json::Value> {
        let mut resp = None;
        if let Some(url) = self.path_key_url() {
            let r = self.send(&url, body).await?;
            if r.status() != StatusCode::NOT_FOUND {
                resp = Some(r);
            } else {
                debug!("path-key route returned 404, trying header key");
            }
        }
        let resp = match resp {
            Some(r) => r,
            None => self.send(&self.header_key_url(), body).await?,
        };

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FolioError::RateLimited("Alchemy Data API".into()));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FolioError::Http {
                status: status.as_u16(),
                message,
            });
        }
        resp.json()
            .await
            .map_err(|e| FolioError::Decode(format!("Alchemy response: {e}")))
    }

    async fn send(&self, url: &str, body: &TokensRequest<'_>) -> FolioResult<reqwest::Response> {
        let mut req = self.http.post(url).json(body);
        if let Some(key) = &self.api_key {
            req = req.header("X-API-Key", key);
        }
        req.send()
            .await
            .map_err(|e| FolioError::Network(format!("Alchemy request failed: {e}")))
    }

    /// All pages for one slug. A failing page ends the walk; whatever was
    /// collected before it is kept.
    async fn holdings_for_slug(
        &self,
        address: &str,
        network: Network,
        slug: &str,
        opts: FetchOptions,
    ) -> Vec<Holding> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut page_key: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let body = TokensRequest {
                addresses: [AddressQuery {
                    address,
                    networks: [slug],
                }],
                with_metadata: opts.with_metadata,
                with_prices: opts.with_prices,
                page_key: page_key.as_deref(),
            };

            let json = match self.fetch_page(&body).await {
                Ok(j) => j,
                Err(e) => {
                    warn!(network = %network, slug, error = %e, "Alchemy page failed");
                    break;
                }
            };

            let page = extract_page(&json);
            let native = page.native.as_ref().and_then(|n| native_holding(n, network));
            let tokens = page.tokens.iter().filter_map(|t| normalize_entry(t, network));
            for holding in native.into_iter().chain(tokens) {
                if seen.insert(holding.id.clone()) {
                    out.push(holding);
                }
            }

            match page.next_page_key {
                Some(next) if page_key.as_deref() != Some(next.as_str()) => page_key = Some(next),
                _ => break,
            }
        }
        out
    }
}

#[async_trait]
impl BalancesProvider for AlchemyClient {
    fn name(&self) -> &'static str {
        "alchemy"
    }

    async fn holdings(
        &self,
        address: &str,
        network: Network,
        opts: FetchOptions,
    ) -> FolioResult<Vec<Holding>> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(Vec::new());
        }

        // First slug yielding anything wins; aliases are never merged.
        for slug in network.info().alchemy_slugs {
            let holdings = self.holdings_for_slug(address, network, slug, opts).await;
            if !holdings.is_empty() {
                debug!(network = %network, slug, count = holdings.len(), "holdings fetched");
                return Ok(holdings);
            }
        }
        Ok(Vec::new())
    }
}
