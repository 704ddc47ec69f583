//! Marketplace upstream integration
//!
//! HTTP client, paginated fetcher, and process-wide request budget for the
//! third-party marketplace orders API. The upstream is treated as
//! untrusted: every page is shape-checked before use and pagination is
//! bounded by a hard cap.

use thiserror::Error;

mod client;
mod fetcher;
mod rate_limit;
pub mod types;

pub use client::MarketplaceApi;
pub use fetcher::{FetchReport, OrderFetcher};
pub use rate_limit::RequestBudget;

/// Errors raised while fetching from the marketplace API.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Client could not be constructed from the provided configuration.
    #[error("client initialization failed: {0}")]
    Initialization(String),

    /// Timeout, connection failure, 5xx, or rate limiting that survived
    /// all configured retries. Retryable at the run level.
    #[error("transient upstream failure on page {page} after {attempts} attempts: {details}")]
    Transient {
        page: usize,
        attempts: u32,
        details: String,
    },

    /// The response body did not have the expected shape. Downstream
    /// pages cannot be trusted either, so the fetch run aborts early.
    #[error("malformed response on page {page}: {details}")]
    Malformed { page: usize, details: String },

    /// Non-retryable upstream HTTP error (4xx other than 429).
    #[error("upstream returned HTTP {status} on page {page}: {details}")]
    Http {
        page: usize,
        status: u16,
        details: String,
    },
}

impl FetchError {
    /// Short machine-readable label for structured error detail.
    pub fn kind_label(&self) -> &'static str {
        match self {
            FetchError::Initialization(_) => "initialization",
            FetchError::Transient { .. } => "transient",
            FetchError::Malformed { .. } => "malformed",
            FetchError::Http { .. } => "http",
        }
    }

    /// Whether a retry of the whole run may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}
