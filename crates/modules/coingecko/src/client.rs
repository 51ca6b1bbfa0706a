//! CoinGecko API client: Demo/Pro API with pacing and retry on rate-limit.
//!
//! Every request goes through one [`RequestPacer`] and is retried with
//! backoff on HTTP 429. The API key, when configured, travels as a query
//! parameter (`x_cg_demo_api_key` or `x_cg_pro_api_key`); without one the
//! public tier is used.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use folio_common::error::{FolioError, FolioResult};
use folio_common::traits::MarketDataProvider;
use folio_common::types::*;
use folio_types::config::{mask_secret, CoinGeckoConfig, CoinGeckoTier};
use folio_utils::pacer::RequestPacer;
use folio_utils::retry::{retry_with_backoff, RetryPolicy};

/// Contract addresses per `/simple/token_price` request.
const PRICE_BATCH: usize = 100;

// ── Response Types ──────────────────────────────────────────────────

#[derive(Deserialize, Debug, Default)]
struct ImageSet {
    thumb: Option<String>,
    small: Option<String>,
    large: Option<String>,
}

/// Subset of `/coins/{platform}/contract/{address}` and `/coins/{id}`.
#[derive(Deserialize, Debug)]
struct CoinResponse {
    id: Option<String>,
    #[serde(default)]
    image: ImageSet,
}

/// CoinGecko HTTP client with pacing and rate-limit handling.
#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    api_key: Option<String>,
    tier: CoinGeckoTier,
    base_url: String,
    pacer: Arc<RequestPacer>,
    retry: RetryPolicy,
}

impl CoinGeckoClient {
    pub fn new(cfg: &CoinGeckoConfig, timeout: Duration) -> FolioResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FolioError::Network(format!("build HTTP client: {e}")))?;

        let api_key = cfg.api_key.clone().filter(|k| !k.is_empty());
        match &api_key {
            Some(k) => info!(tier = %cfg.tier, key = %mask_secret(k), "CoinGecko client initialized"),
            None => info!("CoinGecko client initialized without API key (public tier)"),
        }

        let pacer = RequestPacer::new(
            cfg.max_concurrent,
            Duration::from_millis(cfg.min_spacing_ms),
        );

        Ok(Self {
            http,
            api_key,
            tier: cfg.tier,
            base_url: cfg.resolved_base_url().trim_end_matches('/').to_string(),
            pacer: Arc::new(pacer),
            retry: RetryPolicy::from(&cfg.retry),
        })
    }

    /// Paced, retried GET. Returns the response for any status except an
    /// exhausted 429, which becomes [`FolioError::RateLimited`].
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> FolioResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut query: Vec<(&str, &str)> = query.to_vec();
        if let Some(key) = &self.api_key {
            query.push((self.tier.key_param(), key.as_str()));
        }

        let (url, query) = (url.as_str(), query.as_slice());
        retry_with_backoff(
            &self.retry,
            move || async move {
                let resp = self.pacer.schedule(|| self.send(url, query)).await??;
                if resp.status() == StatusCode::TOO_MANY_REQUESTS {
                    return Err(FolioError::RateLimited(format!("CoinGecko {path}")));
                }
                Ok(resp)
            },
            |e: &FolioError, _| e.is_retryable(),
        )
        .await
    }

    async fn send(&self, url: &str, query: &[(&str, &str)]) -> FolioResult<reqwest::Response> {
        debug!(url, "CoinGecko request");
        self.http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FolioError::Network(format!("CoinGecko request failed: {e}")))
    }

    async fn json<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> FolioResult<T> {
        resp.json()
            .await
            .map_err(|e| FolioError::Decode(format!("CoinGecko response: {e}")))
    }

    async fn token_price_batch(
        &self,
        network: Network,
        addresses: &[String],
    ) -> FolioResult<HashMap<String, TokenPrice>> {
        let path = format!("/simple/token_price/{}", network.info().cg_platform_id);
        let joined = addresses.join(",");
        let resp = match self
            .get(
                &path,
                &[
                    ("contract_addresses", joined.as_str()),
                    ("vs_currencies", "usd"),
                    ("include_24hr_change", "true"),
                    ("include_last_updated_at", "true"),
                ],
            )
            .await
        {
            Ok(r) => r,
            Err(e @ (FolioError::RateLimited(_) | FolioError::Http { .. })) => {
                warn!(network = %network, error = %e, "token price batch failed");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(e),
        };

        if !resp.status().is_success() {
            warn!(network = %network, status = resp.status().as_u16(), "token price batch failed");
            return Ok(HashMap::new());
        }
        let raw: HashMap<String, TokenPrice> = Self::json(resp).await?;
        Ok(raw
            .into_iter()
            .map(|(addr, price)| (addr.to_lowercase(), price))
            .collect())
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoClient {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn prices_for_contracts(
        &self,
        network: Network,
        addresses: &[String],
    ) -> FolioResult<HashMap<String, TokenPrice>> {
        let distinct: Vec<String> = addresses
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if distinct.is_empty() {
            return Ok(HashMap::new());
        }

        // A failed chunk costs only its own prices.
        let mut out = HashMap::with_capacity(distinct.len());
        for (i, chunk) in distinct.chunks(PRICE_BATCH).enumerate() {
            match self.token_price_batch(network, chunk).await {
                Ok(prices) => out.extend(prices),
                Err(e) => warn!(network = %network, chunk = i, error = %e, "token price chunk skipped"),
            }
        }
        Ok(out)
    }

    async fn simple_prices_by_ids(
        &self,
        ids: &[String],
    ) -> FolioResult<HashMap<String, SimplePrice>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = ids.join(",");
        let resp = match self
            .get("/simple/price", &[("ids", joined.as_str()), ("vs_currencies", "usd")])
            .await
        {
            Ok(r) => r,
            Err(e @ (FolioError::RateLimited(_) | FolioError::Http { .. })) => {
                warn!(error = %e, "simple price failed");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(e),
        };
        if !resp.status().is_success() {
            warn!(status = resp.status().as_u16(), "simple price failed");
            return Ok(HashMap::new());
        }
        Self::json(resp).await
    }

    async fn contract_metadata(
        &self,
        network: Network,
        address: &str,
    ) -> LookupOutcome<ContractMetadata> {
        let path = format!(
            "/coins/{}/contract/{}",
            network.info().cg_platform_id,
            address.to_lowercase()
        );
        let resp = match self.get(&path, &[]).await {
            Ok(r) => r,
            Err(e) => return LookupOutcome::Transient(e.to_string()),
        };

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return LookupOutcome::NotFound;
        }
        if !status.is_success() {
            return LookupOutcome::Transient(format!("HTTP {}", status.as_u16()));
        }
        match Self::json::<CoinResponse>(resp).await {
            Ok(coin) => LookupOutcome::Found(ContractMetadata {
                id: coin.id,
                thumb: coin.image.thumb,
                small: coin.image.small,
            }),
            Err(e) => LookupOutcome::Transient(e.to_string()),
        }
    }

    async fn coin_images(&self, coin_id: &str) -> FolioResult<CoinImages> {
        let path = format!("/coins/{coin_id}");
        let resp = self
            .get(
                &path,
                &[
                    ("localization", "false"),
                    ("tickers", "false"),
                    ("market_data", "false"),
                    ("community_data", "false"),
                    ("developer_data", "false"),
                ],
            )
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FolioError::Http {
                status: status.as_u16(),
                message: format!("CoinGecko /coins/{coin_id}"),
            });
        }
        let coin: CoinResponse = Self::json(resp).await?;
        Ok(CoinImages {
            thumb: coin.image.thumb,
            small: coin.image.small,
            large: coin.image.large,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::config::RetryConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, key: Option<&str>) -> CoinGeckoClient {
        let cfg = CoinGeckoConfig {
            api_key: key.map(str::to_string),
            base_url: Some(server.uri()),
            min_spacing_ms: 0,
            retry: RetryConfig {
                attempts: 2,
                base_delay_ms: 1,
                max_delay_ms: 2,
                jitter_ratio: 0.0,
            },
            ..CoinGeckoConfig::default()
        };
        CoinGeckoClient::new(&cfg, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_prices_for_contracts_lowercases_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/token_price/ethereum"))
            .and(query_param("contract_addresses", "0xaaa,0xbbb"))
            .and(query_param("vs_currencies", "usd"))
            .and(query_param("include_24hr_change", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "0xAAA": { "usd": 2.0, "usd_24h_change": -1.25, "last_updated_at": 1700000000u64 },
                "0xbbb": { "usd": null }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let prices = client(&server, None)
            .prices_for_contracts(
                Network::Mainnet,
                &["0xAAA".into(), "0xbbb".into(), "0xaaa".into()],
            )
            .await
            .unwrap();

        assert_eq!(prices["0xaaa"].usd, Some(2.0));
        assert_eq!(prices["0xaaa"].usd_24h_change, Some(-1.25));
        assert_eq!(prices["0xbbb"].usd, None);
    }

    #[tokio::test]
    async fn test_empty_input_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let cg = client(&server, None);
        assert!(cg.prices_for_contracts(Network::Base, &[]).await.unwrap().is_empty());
        assert!(cg.simple_prices_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_2xx_price_response_is_empty_map() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let prices = client(&server, None)
            .simple_prices_by_ids(&["ethereum".into()])
            .await
            .unwrap();
        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_api_key_sent_as_query_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("ids", "ethereum"))
            .and(query_param("x_cg_demo_api_key", "secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "ethereum": { "usd": 3000.0 } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let prices = client(&server, Some("secret"))
            .simple_prices_by_ids(&["ethereum".into()])
            .await
            .unwrap();
        assert_eq!(prices["ethereum"].usd, Some(3000.0));
    }

    #[tokio::test]
    async fn test_contract_metadata_classification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/polygon-pos/contract/0xbbb"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/coins/polygon-pos/contract/0xccc"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/coins/polygon-pos/contract/0xddd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "dai",
                "image": {
                    "thumb": "https://cg/coins/images/9956/thumb/dai.png",
                    "small": "https://cg/coins/images/9956/small/dai.png"
                }
            })))
            .mount(&server)
            .await;

        let cg = client(&server, None);
        assert_eq!(
            cg.contract_metadata(Network::Polygon, "0xBBB").await,
            LookupOutcome::NotFound
        );
        assert!(matches!(
            cg.contract_metadata(Network::Polygon, "0xccc").await,
            LookupOutcome::Transient(_)
        ));
        match cg.contract_metadata(Network::Polygon, "0xddd").await {
            LookupOutcome::Found(meta) => {
                assert_eq!(meta.id.as_deref(), Some("dai"));
                assert!(meta.small.unwrap().contains("/small/"));
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/ethereum"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/coins/ethereum"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ethereum",
                "image": { "thumb": "t", "small": "s", "large": "l" }
            })))
            .mount(&server)
            .await;

        let images = client(&server, None).coin_images("ethereum").await.unwrap();
        assert_eq!(images.large.as_deref(), Some("l"));
    }

    #[tokio::test]
    async fn test_exhausted_rate_limit_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let outcome = client(&server, None)
            .contract_metadata(Network::Base, "0xeee")
            .await;
        assert!(matches!(outcome, LookupOutcome::Transient(_)));
    }

    #[tokio::test]
    async fn test_rate_limited_chunk_keeps_other_chunks() {
        let server = MockServer::start().await;
        let addresses: Vec<String> = (1..=150).map(|i| format!("0x{i:040x}")).collect();
        let first_chunk = addresses[..PRICE_BATCH].join(",");

        Mock::given(method("GET"))
            .and(path("/simple/token_price/ethereum"))
            .and(query_param("contract_addresses", first_chunk.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                addresses[0].clone(): { "usd": 2.0 }
            })))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/simple/token_price/ethereum"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let prices = client(&server, None)
            .prices_for_contracts(Network::Mainnet, &addresses)
            .await
            .unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[&addresses[0]].usd, Some(2.0));
    }

    #[tokio::test]
    async fn test_rate_limited_simple_price_is_empty_map() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let prices = client(&server, None)
            .simple_prices_by_ids(&["ethereum".to_string()])
            .await
            .unwrap();
        assert!(prices.is_empty());
    }
}
