//! Marketplace HTTP client
//!
//! Thin reqwest wrapper for the upstream orders endpoint: carries the
//! bearer credential and shared secret header on every request, consults
//! the process-wide request budget before each call, and retries
//! transient failures with exponential backoff and jitter.

use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, thread_rng};
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::config::MarketplaceConfig;
use crate::marketplace::{FetchError, RequestBudget};

/// Header carrying the shared secret alongside the bearer credential.
const API_SECRET_HEADER: &str = "X-Api-Secret";

/// Outcome of one request attempt: retryable attempts carry an optional
/// upstream retry hint, fatal attempts abort the page immediately.
enum AttemptError {
    Retryable {
        details: String,
        retry_after: Option<u64>,
    },
    Fatal(FetchError),
}

/// Client for the marketplace orders API.
#[derive(Clone)]
pub struct MarketplaceApi {
    config: MarketplaceConfig,
    budget: Arc<RequestBudget>,
    client: Client,
}

impl MarketplaceApi {
    /// Build a client from configuration. Credentials become default
    /// headers so every request carries them.
    pub fn new(
        config: MarketplaceConfig,
        budget: Arc<RequestBudget>,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| FetchError::Initialization(e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        if let Some(secret) = &config.api_secret {
            let value = HeaderValue::from_str(secret)
                .map_err(|e| FetchError::Initialization(e.to_string()))?;
            headers.insert(API_SECRET_HEADER, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Initialization(e.to_string()))?;

        Ok(Self {
            config,
            budget,
            client,
        })
    }

    /// Configured page size for offset pagination.
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Configured hard page cap.
    pub fn page_cap(&self) -> usize {
        self.config.page_cap
    }

    /// Fetch one page of orders at the given offset, retrying transient
    /// failures. Returns the raw JSON body and the number of requests
    /// actually issued.
    pub async fn fetch_orders_page(
        &self,
        page: usize,
        skip: usize,
    ) -> Result<(JsonValue, u32), FetchError> {
        let max_attempts = self.config.fetch_retries.max(1);
        let mut attempts: u32 = 0;

        loop {
            // The budget is process-wide shared state and is consulted
            // before every upstream request, retries included.
            self.budget.acquire().await;
            attempts += 1;

            match self.request_page(page, skip).await {
                Ok(body) => {
                    debug!(page, skip, attempts, "Fetched orders page");
                    return Ok((body, attempts));
                }
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Retryable {
                    details,
                    retry_after,
                }) => {
                    if attempts >= max_attempts {
                        return Err(FetchError::Transient {
                            page,
                            attempts,
                            details,
                        });
                    }

                    let backoff = self.backoff_seconds(attempts - 1, retry_after);
                    warn!(
                        page,
                        attempt = attempts,
                        backoff_seconds = backoff,
                        %details,
                        "Transient upstream failure, retrying page"
                    );
                    sleep(Duration::from_secs_f64(backoff)).await;
                }
            }
        }
    }

    /// Exponential backoff with jitter; an upstream Retry-After hint wins
    /// when it is larger than the calculated backoff.
    fn backoff_seconds(&self, prior_failures: u32, retry_after: Option<u64>) -> f64 {
        let base = self.config.retry_base_seconds as f64;
        let max = self.config.retry_max_seconds as f64;

        let mut backoff = (base * 2_f64.powi(prior_failures as i32)).min(max);

        if let Some(retry_after) = retry_after {
            backoff = backoff.max(retry_after as f64);
        }

        let jitter_bound = self.config.retry_jitter_factor * backoff;
        if jitter_bound > 0.0 {
            backoff += thread_rng().gen_range(0.0..jitter_bound);
        }

        backoff
    }

    async fn request_page(&self, page: usize, skip: usize) -> Result<JsonValue, AttemptError> {
        let mut url = Url::parse(&format!("{}/orders", self.config.api_base))
            .map_err(|e| AttemptError::Fatal(FetchError::Initialization(e.to_string())))?;

        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("sort", "date_asc");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                // Timeouts and connection failures are transient.
                return Err(AttemptError::Retryable {
                    details: e.to_string(),
                    retry_after: None,
                });
            }
        };

        let status = response.status();

        if status.is_success() {
            return response.json::<JsonValue>().await.map_err(|e| {
                AttemptError::Fatal(FetchError::Malformed {
                    page,
                    details: format!("body is not valid JSON: {}", e),
                })
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());

            return Err(AttemptError::Retryable {
                details: "rate limited by upstream".to_string(),
                retry_after,
            });
        }

        let details = truncate_body(response.text().await.unwrap_or_default());

        if status.is_server_error() {
            return Err(AttemptError::Retryable {
                details: format!("HTTP {}: {}", status.as_u16(), details),
                retry_after: None,
            });
        }

        Err(AttemptError::Fatal(FetchError::Http {
            page,
            status: status.as_u16(),
            details,
        }))
    }
}

fn truncate_body(body: String) -> String {
    if body.chars().count() > 200 {
        let truncated: String = body.chars().take(200).collect();
        format!("{}...", truncated)
    } else {
        body
    }
}
