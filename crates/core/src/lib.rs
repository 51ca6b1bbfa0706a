//! Folio core: the portfolio pipeline and the pieces around it.
//!
//! Provider modules are never named here. The CLI factory builds them and
//! hands them in as `folio-common` trait objects.

pub mod aggregator;
pub mod budget;
pub mod enrich;
pub mod rpc;
pub mod store;
pub mod wallet;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use aggregator::{PortfolioAggregator, PortfolioFetcher};
pub use budget::RateBudget;
pub use rpc::RpcRegistry;
pub use store::PortfolioStore;
pub use workspace::init_workspace;
