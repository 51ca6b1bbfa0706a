//! Universal error types for Folio.
//!
//! Every provider adapter converts its failures into [`FolioError`]. The
//! portfolio pipeline never surfaces these to the top-level load: they are
//! folded into degraded results (empty lists, filtered keys, the placeholder
//! flag). They do reach the CLI for direct calls such as RPC balance reads.

use serde::Serialize;
use thiserror::Error;

/// Error category: determines exit code and retry strategy.
///
/// Exit codes:
/// - `0`: success
/// - `1`: user error (config, validation)
/// - `2`: network error
/// - `3`: system error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Network,
    Validation,
    System,
}

impl ErrorCategory {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCategory::Config => 1,
            ErrorCategory::Validation => 1,
            ErrorCategory::Network => 2,
            ErrorCategory::System => 3,
        }
    }
}

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // ── Network ─────────────────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    // ── Config / validation ─────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    // ── System ──────────────────────────────────────────────────────
    #[error("Request pacer closed")]
    PacerClosed,

    #[error("{0}")]
    Other(String),
}

impl FolioError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FolioError::Network(_)
            | FolioError::RateLimited(_)
            | FolioError::Http { .. }
            | FolioError::Decode(_) => ErrorCategory::Network,
            FolioError::Config(_) => ErrorCategory::Config,
            FolioError::InvalidAddress(_) | FolioError::Wallet(_) => ErrorCategory::Validation,
            FolioError::PacerClosed | FolioError::Other(_) => ErrorCategory::System,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    /// Only rate-limit signals are worth a backoff retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FolioError::RateLimited(_))
    }
}

pub type FolioResult<T> = Result<T, FolioError>;
