//! Paced JSON-RPC clients, one per network.
//!
//! The registry is built once from config and handed around by reference.
//! Every call on every network goes through the same serial
//! [`RequestPacer`], so free public endpoints are never hammered.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use folio_common::error::{FolioError, FolioResult};
use folio_common::types::Network;
use folio_types::config::ProvidersConfig;
use folio_utils::format::parse_quantity;
use folio_utils::pacer::RequestPacer;

/// Where a network's RPC URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcSource {
    Override,
    Alchemy,
    Public,
}

impl RpcSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RpcSource::Override => "override",
            RpcSource::Alchemy => "alchemy",
            RpcSource::Public => "public",
        }
    }
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

pub struct RpcClient {
    network: Network,
    url: String,
    source: RpcSource,
    http: Client,
    pacer: Arc<RequestPacer>,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn network(&self) -> Network {
        self.network
    }

    pub fn source(&self) -> RpcSource {
        self.source
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> FolioResult<T> {
        let params = &params;
        self.pacer.schedule(|| self.send(method, params)).await?
    }

    async fn send<T: DeserializeOwned>(&self, method: &str, params: &Value) -> FolioResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(network = %self.network, method, id, "rpc call");

        let resp = self
            .http
            .post(&self.url)
            .json(&json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
            .send()
            .await
            .map_err(|e| FolioError::Network(format!("{} rpc: {e}", self.network)))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FolioError::RateLimited(format!("{} rpc {method}", self.network)));
        }
        if !status.is_success() {
            return Err(FolioError::Http {
                status: status.as_u16(),
                message: format!("{} rpc {method}", self.network),
            });
        }

        let body: RpcResponse<T> = resp
            .json()
            .await
            .map_err(|e| FolioError::Decode(format!("{} rpc {method}: {e}", self.network)))?;
        if let Some(err) = body.error {
            return Err(FolioError::Other(format!("rpc error {}: {}", err.code, err.message)));
        }
        body.result
            .ok_or_else(|| FolioError::Decode(format!("{} rpc {method}: missing result", self.network)))
    }

    /// Gas-token balance of `address` at the latest block, in wei.
    pub async fn native_balance(&self, address: &str) -> FolioResult<U256> {
        let address = Address::from_str(address.trim())
            .map_err(|_| FolioError::InvalidAddress(address.to_string()))?;
        let raw: String = self
            .call("eth_getBalance", json!([address.to_checksum(None), "latest"]))
            .await?;
        parse_quantity(&raw).ok_or_else(|| FolioError::Decode(format!("eth_getBalance: {raw}")))
    }

    pub async fn chain_id(&self) -> FolioResult<u64> {
        let raw: String = self.call("eth_chainId", json!([])).await?;
        let hex = raw.trim_start_matches("0x");
        u64::from_str_radix(hex, 16).map_err(|_| FolioError::Decode(format!("eth_chainId: {raw}")))
    }
}

/// One [`RpcClient`] per supported network, sharing a single pacer.
pub struct RpcRegistry {
    clients: BTreeMap<Network, RpcClient>,
    pacer: Arc<RequestPacer>,
}

impl RpcRegistry {
    /// URL precedence per network: explicit override, then Alchemy when a key
    /// is configured, then the network's public endpoint.
    pub fn new(cfg: &ProvidersConfig) -> FolioResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| FolioError::Network(format!("build HTTP client: {e}")))?;
        let pacer = Arc::new(RequestPacer::serial(Duration::from_millis(cfg.rpc.min_gap_ms)));
        let alchemy_key = cfg.alchemy.api_key.as_deref().filter(|k| !k.is_empty());

        let clients = Network::ALL
            .into_iter()
            .map(|network| {
                let (url, source) = match (cfg.rpc.override_for(network), alchemy_key) {
                    (Some(url), _) => (url.to_string(), RpcSource::Override),
                    (None, Some(key)) => (
                        format!("https://{}.g.alchemy.com/v2/{key}", network.info().alchemy_rpc_prefix),
                        RpcSource::Alchemy,
                    ),
                    (None, None) => (cfg.rpc.public_rpc_for(network).to_string(), RpcSource::Public),
                };
                let client = RpcClient {
                    network,
                    url,
                    source,
                    http: http.clone(),
                    pacer: pacer.clone(),
                    next_id: AtomicU64::new(1),
                };
                (network, client)
            })
            .collect();

        info!(min_gap_ms = cfg.rpc.min_gap_ms, "rpc registry ready");
        Ok(Self { clients, pacer })
    }

    pub fn client(&self, network: Network) -> FolioResult<&RpcClient> {
        self.clients
            .get(&network)
            .ok_or_else(|| FolioError::Config(format!("no rpc client for {network}")))
    }

    pub fn pacer(&self) -> &Arc<RequestPacer> {
        &self.pacer
    }
}
