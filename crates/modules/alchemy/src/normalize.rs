//! Data API response normalization.
//!
//! The portfolio endpoint has shipped several envelope and field-name
//! variants. Each logical field is resolved from an ordered table of JSON
//! pointers; the first present, well-typed value wins. Numbers may arrive
//! as strings and are coerced, with coercion failures treated as absent.

use alloy::primitives::U256;
use serde_json::Value;

use folio_common::types::{Holding, Network, TokenInfo};
use folio_utils::format::{format_units, parse_quantity};

const ADDRESS: &[&str] = &["/tokenAddress", "/contractAddress"];
const BALANCE: &[&str] = &["/tokenBalance", "/balance", "/quantity"];
const DECIMALS: &[&str] = &[
    "/decimals",
    "/token/decimals",
    "/metadata/decimals",
    "/tokenMetadata/decimals",
];
const SYMBOL: &[&str] = &["/tokenMetadata/symbol", "/metadata/symbol", "/token/symbol", "/symbol"];
const NAME: &[&str] = &["/tokenMetadata/name", "/metadata/name", "/token/name", "/name"];
const LOGO: &[&str] = &[
    "/tokenMetadata/logo",
    "/metadata/logo",
    "/token/logo",
    "/logo",
    "/icon",
    "/logoURI",
];
const PRICE_USD: &[&str] = &[
    "/price/latestUSDPrice",
    "/price/usd",
    "/prices/latest/value",
    "/quote/usd",
    "/usdPrice",
    "/priceUsd",
];
const CHANGE_24H: &[&str] = &["/price/percentChange24h", "/priceChange24hPct", "/usd_24h_change"];

/// Raw shapes extracted from one response page.
#[derive(Debug, Default)]
pub struct Page<'a> {
    pub tokens: Vec<&'a Value>,
    pub native: Option<NativeEntry>,
    pub next_page_key: Option<String>,
}

/// Top-level `nativeBalance` object, when the envelope carries one.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEntry {
    pub raw: U256,
    pub price_usd: Option<f64>,
    pub logo: Option<String>,
}

/// Locate the token list, native entry and continuation token in `body`.
///
/// Token list: `tokens`, then `data.tokens`, then every `addresses[].tokens`
/// and `addresses[].assets` concatenated.
pub fn extract_page(body: &Value) -> Page<'_> {
    let mut tokens: Vec<&Value> = Vec::new();
    for pointer in ["/tokens", "/data/tokens"] {
        if let Some(list) = body.pointer(pointer).and_then(Value::as_array) {
            if !list.is_empty() {
                tokens = list.iter().collect();
                break;
            }
        }
    }
    if tokens.is_empty() {
        if let Some(addresses) = body.get("addresses").and_then(Value::as_array) {
            for entry in addresses {
                for key in ["tokens", "assets"] {
                    if let Some(list) = entry.get(key).and_then(Value::as_array) {
                        tokens.extend(list.iter());
                    }
                }
            }
        }
    }

    let native = body.get("nativeBalance").and_then(|n| {
        let raw = parse_quantity(n.get("balance")?.as_str()?)?;
        Some(NativeEntry {
            raw,
            price_usd: price_usd(n),
            logo: probe_str(n, &["/logo"]),
        })
    });

    let next_page_key = probe_str(body, &["/pageKey", "/data/pageKey"]);

    Page {
        tokens,
        native,
        next_page_key,
    }
}

/// Convert one token-list entry. `None` for zero balances, unparsable
/// balances and non-native entries without a contract address.
pub fn normalize_entry(entry: &Value, network: Network) -> Option<Holding> {
    let raw = balance(entry)?;
    if raw.is_zero() {
        return None;
    }

    let price = price_usd(entry);
    let change = probe_f64(entry, CHANGE_24H);
    let logo = probe_str(entry, LOGO);

    if is_native(entry) {
        let formatted = format_units(raw, network.info().native_decimals);
        return Some(with_price(
            Holding {
                id: Holding::native_id(network),
                network,
                is_native: true,
                token: None,
                balance_raw: raw,
                balance_formatted: formatted,
                price_usd: None,
                price_24h_change_pct: change,
                value_usd: None,
                image_thumb: logo.clone(),
                image_small: logo.clone(),
                image_large: logo,
            },
            price,
        ));
    }

    let address = probe_str(entry, ADDRESS)?;
    let decimals = probe_f64(entry, DECIMALS)
        .filter(|d| d.fract() == 0.0 && (0.0..=255.0).contains(d))
        .map(|d| d as u8);
    let formatted = match decimals {
        Some(d) => format_units(raw, d),
        None => raw.to_string(),
    };

    Some(with_price(
        Holding {
            id: Holding::token_id(network, &address),
            network,
            is_native: false,
            token: Some(TokenInfo {
                address,
                symbol: probe_str(entry, SYMBOL),
                name: probe_str(entry, NAME),
                decimals,
                logo_uri: logo.clone(),
            }),
            balance_raw: raw,
            balance_formatted: formatted,
            price_usd: None,
            price_24h_change_pct: change,
            value_usd: None,
            image_thumb: logo.clone(),
            image_small: logo.clone(),
            image_large: logo,
        },
        price,
    ))
}

/// Synthetic native holding from a top-level `nativeBalance` entry.
pub fn native_holding(entry: &NativeEntry, network: Network) -> Option<Holding> {
    if entry.raw.is_zero() {
        return None;
    }
    Some(with_price(
        Holding {
            id: Holding::native_id(network),
            network,
            is_native: true,
            token: None,
            balance_raw: entry.raw,
            balance_formatted: format_units(entry.raw, network.info().native_decimals),
            price_usd: None,
            price_24h_change_pct: None,
            value_usd: None,
            image_thumb: entry.logo.clone(),
            image_small: entry.logo.clone(),
            image_large: entry.logo.clone(),
        },
        entry.price_usd,
    ))
}

fn with_price(mut holding: Holding, price: Option<f64>) -> Holding {
    holding.price_usd = price;
    holding.value_usd = price.and_then(|p| holding.amount().map(|a| a * p));
    holding
}

/// Native if flagged, typed as such, or carrying no contract address at all.
fn is_native(entry: &Value) -> bool {
    if entry.get("isNative").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    let typed_native = ["type", "standard"].iter().any(|k| {
        entry
            .get(*k)
            .and_then(Value::as_str)
            .is_some_and(|s| s.to_ascii_lowercase().contains("native"))
    });
    typed_native || probe_str(entry, ADDRESS).is_none()
}

fn balance(entry: &Value) -> Option<U256> {
    BALANCE.iter().find_map(|p| match entry.pointer(p)? {
        Value::String(s) => parse_quantity(s),
        Value::Number(n) => n.as_u64().map(U256::from),
        _ => None,
    })
}

/// USD price: a `tokenPrices[]` entry with currency `usd` first, then the
/// flat candidates.
fn price_usd(entry: &Value) -> Option<f64> {
    let from_list = entry
        .get("tokenPrices")
        .and_then(Value::as_array)
        .and_then(|prices| {
            prices.iter().find(|p| {
                p.get("currency")
                    .and_then(Value::as_str)
                    .is_some_and(|c| c.eq_ignore_ascii_case("usd"))
            })
        })
        .and_then(|p| p.get("value"))
        .and_then(coerce_f64);
    from_list.or_else(|| probe_f64(entry, PRICE_USD))
}

fn probe_str(v: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| {
        v.pointer(p)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn probe_f64(v: &Value, pointers: &[&str]) -> Option<f64> {
    pointers.iter().find_map(|p| v.pointer(p).and_then(coerce_f64))
}

fn coerce_f64(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}
