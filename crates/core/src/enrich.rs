//! Per-network enrichment: fills price and icon gaps left by the balances
//! provider, under the shared metadata budget.
//!
//! Nothing in here fails. Provider errors degrade to missing fields, a 404
//! from the metadata lookup marks the contract as filtered, and a skipped or
//! failed lookup raises the placeholder flag.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::convert::Infallible;

use tracing::{debug, info, warn};

use folio_common::traits::MarketDataProvider;
use folio_common::types::*;
use folio_utils::format::derive_large_from;
use folio_utils::parallel::map_with_limit;

use crate::budget::RateBudget;

/// Output of one network's enrichment pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkEnrichment {
    pub holdings: Vec<Holding>,
    pub filtered_keys: BTreeSet<String>,
    pub placeholders_used: bool,
}

/// What happened to one metadata candidate.
#[derive(Debug)]
enum MetadataLookup {
    /// Budget spent or outside the allowed set.
    Skipped,
    Done(LookupOutcome<ContractMetadata>),
}

/// Gas-token price and icons, looked up once per network.
#[derive(Debug, Default)]
struct NativeExtras {
    price_usd: Option<f64>,
    images: CoinImages,
}

/// Enrich one network's holdings.
///
/// `allowed`, when given, restricts metadata lookups to the listed
/// [`filtered_key`]s; any other candidate is treated as skipped.
pub async fn enrich_network(
    network: Network,
    mut holdings: Vec<Holding>,
    market: &dyn MarketDataProvider,
    budget: &RateBudget,
    concurrency: usize,
    allowed: Option<&HashSet<String>>,
) -> NetworkEnrichment {
    if holdings.is_empty() {
        return NetworkEnrichment::default();
    }

    let contracts = distinct_contracts(&holdings, |_| true);
    let candidates = distinct_contracts(&holdings, |h| !h.has_icon());
    let has_native = holdings.iter().any(|h| h.is_native);

    let prices = match market.prices_for_contracts(network, &contracts).await {
        Ok(p) => p,
        Err(e) => {
            warn!(network = %network, error = %e, "contract price batch failed");
            HashMap::new()
        }
    };

    let lookups = match map_with_limit(&candidates, concurrency, |address, _| {
        let address = address.clone();
        async move {
            let permitted = allowed.map_or(true, |set| set.contains(&filtered_key(network, &address)));
            if !permitted || !budget.try_consume_one() {
                return Ok::<_, Infallible>(MetadataLookup::Skipped);
            }
            Ok(MetadataLookup::Done(market.contract_metadata(network, &address).await))
        }
    })
    .await
    {
        Ok(v) => v,
        Err(never) => match never {},
    };

    let mut out = NetworkEnrichment::default();
    let mut metadata: HashMap<&str, ContractMetadata> = HashMap::new();
    for (address, lookup) in candidates.iter().zip(lookups) {
        match lookup {
            MetadataLookup::Skipped => out.placeholders_used = true,
            MetadataLookup::Done(LookupOutcome::Found(meta)) => {
                metadata.insert(address.as_str(), meta);
            }
            MetadataLookup::Done(LookupOutcome::NotFound) => {
                debug!(network = %network, address = %address, "contract unknown to pricing provider");
                out.filtered_keys.insert(filtered_key(network, address));
            }
            MetadataLookup::Done(LookupOutcome::Transient(reason)) => {
                debug!(network = %network, address = %address, %reason, "metadata lookup failed");
                out.placeholders_used = true;
            }
        }
    }

    let native = if has_native {
        Some(native_extras(network, market).await)
    } else {
        None
    };

    for holding in &mut holdings {
        if holding.is_native {
            merge_native(holding, native.as_ref());
        } else {
            let key = holding.contract_key();
            let key = key.as_deref().unwrap_or_default();
            merge_token(holding, prices.get(key), metadata.get(key));
        }
    }

    info!(
        network = %network,
        holdings = holdings.len(),
        candidates = candidates.len(),
        resolved = metadata.len(),
        filtered = out.filtered_keys.len(),
        placeholders = out.placeholders_used,
        "network enriched"
    );
    out.holdings = holdings;
    out
}

/// Lowercased contract addresses of the matching token holdings, first-seen order.
fn distinct_contracts(holdings: &[Holding], keep: impl Fn(&Holding) -> bool) -> Vec<String> {
    let mut seen = HashSet::new();
    holdings
        .iter()
        .filter(|h| !h.is_native && keep(h))
        .filter_map(Holding::contract_key)
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

async fn native_extras(network: Network, market: &dyn MarketDataProvider) -> NativeExtras {
    let coin_id = network.info().native_cg_id;
    let ids = [coin_id.to_string()];
    let (price, images) = tokio::join!(market.simple_prices_by_ids(&ids), market.coin_images(coin_id));

    let price_usd = match price {
        Ok(map) => map.get(coin_id).and_then(|p| p.usd),
        Err(e) => {
            debug!(network = %network, error = %e, "native price lookup failed");
            None
        }
    };
    let images = images.unwrap_or_else(|e| {
        debug!(network = %network, error = %e, "native icon lookup failed");
        CoinImages::default()
    });
    NativeExtras { price_usd, images }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map_or(true, str::is_empty)
}

/// Set `slot` from `candidate` only when the holding has nothing there yet.
fn fill(slot: &mut Option<String>, candidate: Option<&String>) {
    if is_blank(slot) {
        if let Some(v) = candidate.filter(|v| !v.is_empty()) {
            *slot = Some(v.clone());
        }
    }
}

fn fill_value(holding: &mut Holding) {
    if let (Some(price), Some(amount)) = (holding.price_usd, holding.amount()) {
        holding.value_usd = Some(price * amount);
    }
}

fn merge_token(holding: &mut Holding, price: Option<&TokenPrice>, meta: Option<&ContractMetadata>) {
    if let Some(p) = price {
        holding.price_usd = holding.price_usd.or(p.usd);
        holding.price_24h_change_pct = holding.price_24h_change_pct.or(p.usd_24h_change);
    }
    fill_value(holding);

    if let Some(m) = meta {
        fill(&mut holding.image_thumb, m.thumb.as_ref());
        fill(&mut holding.image_small, m.small.as_ref());
    }
    if is_blank(&holding.image_large) {
        holding.image_large =
            derive_large_from(holding.image_small.as_deref(), holding.image_thumb.as_deref());
    }
}

fn merge_native(holding: &mut Holding, native: Option<&NativeExtras>) {
    if let Some(n) = native {
        holding.price_usd = holding.price_usd.or(n.price_usd);
        fill(&mut holding.image_thumb, n.images.thumb.as_ref());
        fill(&mut holding.image_small, n.images.small.as_ref());
        fill(&mut holding.image_large, n.images.large.as_ref());
    }
    fill_value(holding);

    if is_blank(&holding.image_large) {
        holding.image_large =
            derive_large_from(holding.image_small.as_deref(), holding.image_thumb.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use std::sync::atomic::Ordering;

    const AAA: &str = "0xAAA0000000000000000000000000000000000001";
    const BBB: &str = "0xBBB0000000000000000000000000000000000002";

    #[tokio::test]
    async fn test_native_and_token_values() {
        let market = FakeMarket::default()
            .with_contract_price(AAA, 2.0)
            .with_simple_price("ethereum", 3000.0);
        let holdings = vec![
            native(Network::Mainnet, "1.5"),
            token(Network::Mainnet, AAA, "100", 6),
        ];

        let out = enrich_network(
            Network::Mainnet,
            holdings,
            &market,
            &RateBudget::new(30),
            3,
            None,
        )
        .await;

        assert_eq!(out.holdings[0].value_usd, Some(4500.0));
        assert_eq!(out.holdings[1].price_usd, Some(2.0));
        assert_eq!(out.holdings[1].value_usd, Some(200.0));
        assert_eq!(out.holdings[1].image_large, None);
        assert!(out.filtered_keys.is_empty());
        assert!(!out.placeholders_used);
    }

    #[tokio::test]
    async fn test_existing_fields_are_never_overwritten() {
        let market = FakeMarket::default()
            .with_contract_price(AAA, 5.0)
            .with_metadata(
                AAA,
                LookupOutcome::Found(ContractMetadata {
                    id: Some("aaa".into()),
                    thumb: Some("https://cg/thumb/aaa.png".into()),
                    small: Some("https://cg/small/aaa.png".into()),
                }),
            );
        let mut held = token(Network::Mainnet, AAA, "10", 18);
        held.price_usd = Some(1.0);
        held.value_usd = Some(10.0);
        held.image_small = Some("https://alchemy/logo.png".into());

        let out = enrich_network(Network::Mainnet, vec![held], &market, &RateBudget::new(30), 3, None)
            .await;

        let h = &out.holdings[0];
        assert_eq!(h.price_usd, Some(1.0));
        assert_eq!(h.value_usd, Some(10.0));
        assert_eq!(h.image_small.as_deref(), Some("https://alchemy/logo.png"));
        // Already had an icon, so no metadata lookup was spent on it.
        assert_eq!(market.metadata_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_found_is_filtered_but_still_priced() {
        let market = FakeMarket::default()
            .with_contract_price(BBB, 0.5)
            .with_metadata(BBB, LookupOutcome::NotFound);
        let holdings = vec![token(Network::Polygon, BBB, "4", 18)];

        let out = enrich_network(Network::Polygon, holdings, &market, &RateBudget::new(30), 3, None)
            .await;

        assert_eq!(
            out.filtered_keys,
            BTreeSet::from([format!("polygon:{}", BBB.to_lowercase())])
        );
        let h = &out.holdings[0];
        assert_eq!(h.image_thumb, None);
        assert_eq!(h.image_small, None);
        assert_eq!(h.image_large, None);
        assert_eq!(h.price_usd, Some(0.5));
        assert_eq!(h.value_usd, Some(2.0));
        assert!(!out.placeholders_used);
    }

    #[tokio::test]
    async fn test_transient_failure_sets_placeholder() {
        let market =
            FakeMarket::default().with_metadata(AAA, LookupOutcome::Transient("HTTP 503".into()));
        let out = enrich_network(
            Network::Base,
            vec![token(Network::Base, AAA, "1", 18)],
            &market,
            &RateBudget::new(30),
            3,
            None,
        )
        .await;
        assert!(out.placeholders_used);
        assert!(out.filtered_keys.is_empty());
    }

    #[tokio::test]
    async fn test_found_metadata_derives_large_icon() {
        let market = FakeMarket::default().with_metadata(
            AAA,
            LookupOutcome::Found(ContractMetadata {
                id: Some("dai".into()),
                thumb: Some("https://cg/coins/images/1/thumb/dai.png".into()),
                small: Some("https://cg/coins/images/1/small/dai.png".into()),
            }),
        );
        let out = enrich_network(
            Network::Mainnet,
            vec![token(Network::Mainnet, AAA, "1", 18)],
            &market,
            &RateBudget::new(30),
            3,
            None,
        )
        .await;
        assert_eq!(
            out.holdings[0].image_large.as_deref(),
            Some("https://cg/coins/images/1/large/dai.png")
        );
    }

    #[tokio::test]
    async fn test_no_large_icon_without_size_segment() {
        let market = FakeMarket::default().with_metadata(
            AAA,
            LookupOutcome::Found(ContractMetadata {
                id: Some("odd".into()),
                thumb: Some("https://assets.cg/odd-thumb.png".into()),
                small: None,
            }),
        );
        let out = enrich_network(
            Network::Mainnet,
            vec![token(Network::Mainnet, AAA, "1", 18)],
            &market,
            &RateBudget::new(30),
            3,
            None,
        )
        .await;
        let h = &out.holdings[0];
        assert_eq!(h.image_thumb.as_deref(), Some("https://assets.cg/odd-thumb.png"));
        assert_eq!(h.image_large, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_caps_lookups_at_30_of_45() {
        let market = FakeMarket::default();
        let holdings: Vec<Holding> = (0..45)
            .map(|i| token(Network::Mainnet, &format!("0x{:040x}", i + 1), "1", 18))
            .collect();

        let out = enrich_network(Network::Mainnet, holdings, &market, &RateBudget::new(30), 3, None)
            .await;

        assert_eq!(market.metadata_calls.load(Ordering::SeqCst), 30);
        assert!(out.placeholders_used);
        assert_eq!(out.holdings.len(), 45);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_not_hit_with_20_candidates() {
        let market = FakeMarket::default();
        let holdings: Vec<Holding> = (0..20)
            .map(|i| token(Network::Mainnet, &format!("0x{:040x}", i + 1), "1", 18))
            .collect();

        let out = enrich_network(Network::Mainnet, holdings, &market, &RateBudget::new(30), 3, None)
            .await;

        assert_eq!(market.metadata_calls.load(Ordering::SeqCst), 20);
        assert!(!out.placeholders_used);
    }

    #[tokio::test]
    async fn test_allowed_set_limits_lookups() {
        let market = FakeMarket::default();
        let holdings = vec![
            token(Network::Mainnet, AAA, "1", 18),
            token(Network::Mainnet, BBB, "1", 18),
        ];
        let allowed = HashSet::from([filtered_key(Network::Mainnet, AAA)]);

        let out = enrich_network(
            Network::Mainnet,
            holdings,
            &market,
            &RateBudget::new(30),
            3,
            Some(&allowed),
        )
        .await;

        assert_eq!(market.metadata_calls.load(Ordering::SeqCst), 1);
        assert!(out.placeholders_used);
    }

    #[tokio::test]
    async fn test_price_batch_failure_degrades() {
        let market = FakeMarket {
            fail_prices: true,
            ..FakeMarket::default()
        };
        let out = enrich_network(
            Network::Arbitrum,
            vec![native(Network::Arbitrum, "2"), token(Network::Arbitrum, AAA, "1", 18)],
            &market,
            &RateBudget::new(30),
            3,
            None,
        )
        .await;
        assert_eq!(out.holdings.len(), 2);
        assert!(out.holdings.iter().all(|h| h.price_usd.is_none() && h.value_usd.is_none()));
        assert!(!out.placeholders_used);
    }

    #[tokio::test]
    async fn test_duplicate_contracts_are_looked_up_once() {
        let market = FakeMarket::default();
        let lower = AAA.to_lowercase();
        let holdings = vec![
            token(Network::Mainnet, AAA, "1", 18),
            token(Network::Mainnet, &lower, "2", 18),
        ];
        enrich_network(Network::Mainnet, holdings, &market, &RateBudget::new(30), 3, None).await;
        assert_eq!(market.metadata_calls.load(Ordering::SeqCst), 1);
        assert_eq!(market.price_requests.lock().unwrap()[0], vec![lower]);
    }

    #[tokio::test]
    async fn test_empty_network_makes_no_calls() {
        let market = FakeMarket::default();
        let out =
            enrich_network(Network::Optimism, Vec::new(), &market, &RateBudget::new(30), 3, None).await;
        assert_eq!(out, NetworkEnrichment::default());
        assert!(market.price_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_native_icons_come_from_coin_images() {
        let market = FakeMarket {
            coin_images: Some(CoinImages {
                thumb: Some("https://cg/coins/images/279/thumb/eth.png".into()),
                small: Some("https://cg/coins/images/279/small/eth.png".into()),
                large: Some("https://cg/coins/images/279/large/eth.png".into()),
            }),
            ..FakeMarket::default()
        };
        let out = enrich_network(
            Network::Base,
            vec![native(Network::Base, "0.1")],
            &market,
            &RateBudget::new(0),
            3,
            None,
        )
        .await;
        let h = &out.holdings[0];
        assert_eq!(h.image_large.as_deref(), Some("https://cg/coins/images/279/large/eth.png"));
        // Native lookups never touch the budget or the placeholder flag.
        assert!(!out.placeholders_used);
    }
}
