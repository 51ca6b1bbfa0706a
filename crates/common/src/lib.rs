//! Folio common layer: networks, holdings, provider traits, errors.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{FolioError, FolioResult};
pub use types::{Holding, Network, Portfolio, PortfolioSnapshot};
