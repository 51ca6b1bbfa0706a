//! Client-side portfolio cache.
//!
//! Holds the last snapshot for the active address and decides when a load
//! actually hits the network. Every change is published on a `watch`
//! channel so a UI can re-render from [`PortfolioStore::subscribe`].

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use folio_common::types::{Portfolio, WalletMode};

use crate::aggregator::PortfolioFetcher;

/// Everything a consumer renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioState {
    pub address: Option<String>,
    pub mode: WalletMode,
    pub enriched_portfolio: Portfolio,
    pub filtered_keys: BTreeSet<String>,
    pub placeholders_used: bool,
    pub is_loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Empty,
    Loading,
    Ready,
}

impl PortfolioState {
    pub fn phase(&self) -> LoadPhase {
        if self.is_loading {
            LoadPhase::Loading
        } else if self.enriched_portfolio.is_empty() {
            LoadPhase::Empty
        } else {
            LoadPhase::Ready
        }
    }

    fn clear_derived(&mut self) {
        self.enriched_portfolio.clear();
        self.filtered_keys.clear();
        self.placeholders_used = false;
    }
}

/// How a [`PortfolioStore::load_portfolio`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Cached snapshot for this address was reused, nothing fetched.
    CacheHit,
    Loaded,
    /// The active address changed while loading; the result was dropped.
    Discarded,
}

pub struct PortfolioStore {
    fetcher: Arc<dyn PortfolioFetcher>,
    state: watch::Sender<PortfolioState>,
    in_flight: AtomicUsize,
}

/// Clears `is_loading` once the last concurrent load finishes, however it ends.
struct LoadingGuard<'a>(&'a PortfolioStore);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let remaining = self.0.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        self.0.state.send_modify(|s| s.is_loading = remaining > 0);
    }
}

impl PortfolioStore {
    pub fn new(fetcher: Arc<dyn PortfolioFetcher>) -> Self {
        let (state, _) = watch::channel(PortfolioState::default());
        Self {
            fetcher,
            state,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Current state, cloned.
    pub fn snapshot(&self) -> PortfolioState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PortfolioState> {
        self.state.subscribe()
    }

    /// Switch the active address. A different address drops the cached
    /// portfolio; the same address is a no-op.
    pub fn set_address(&self, address: &str) {
        self.state.send_if_modified(|s| {
            if s.address.as_deref() == Some(address) {
                return false;
            }
            debug!(address, "active address changed");
            s.address = Some(address.to_string());
            s.clear_derived();
            true
        });
    }

    pub fn set_mode(&self, mode: WalletMode) {
        self.state.send_if_modified(|s| {
            let changed = s.mode != mode;
            s.mode = mode;
            changed
        });
    }

    /// Load the portfolio for `address` unless it is already cached.
    ///
    /// The result is only written if `address` is still the active address
    /// when the fetch completes.
    pub async fn load_portfolio(&self, address: &str, force: bool) -> LoadOutcome {
        let cached = {
            let s = self.state.borrow();
            !force && s.address.as_deref() == Some(address) && !s.enriched_portfolio.is_empty()
        };
        if cached {
            debug!(address, "portfolio cache hit");
            return LoadOutcome::CacheHit;
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = LoadingGuard(self);
        self.state.send_modify(|s| s.is_loading = true);

        let snapshot = self.fetcher.fetch(address).await;

        let written = self.state.send_if_modified(|s| {
            if s.address.as_deref() != Some(address) {
                return false;
            }
            s.enriched_portfolio = snapshot.enriched_portfolio;
            s.filtered_keys = snapshot.filtered_keys;
            s.placeholders_used = snapshot.placeholders_used;
            true
        });
        if written {
            LoadOutcome::Loaded
        } else {
            info!(address, "discarding portfolio for an address that is no longer active");
            LoadOutcome::Discarded
        }
    }
}
