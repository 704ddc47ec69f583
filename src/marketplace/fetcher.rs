//! Paginated order fetcher
//!
//! Retrieves the full remote collection for a time window using offset
//! pagination. Termination rule: keep requesting pages until one comes
//! back empty. A page that is shorter than the page size but non-empty is
//! NOT a termination signal; upstream data does not align to page
//! boundaries and stopping on a short page silently loses records from
//! later pages. A hard page cap bounds runaway loops and is reported as
//! possible truncation, distinct from clean completion.

use metrics::counter;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::marketplace::types::{
    OrderWindow, extract_channel, extract_date_created, extract_external_id,
};
use crate::marketplace::{FetchError, MarketplaceApi};

/// Outcome of one full fetch run.
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// Shape-validated raw records, deduplicated and window-filtered.
    pub records: Vec<JsonValue>,
    /// Pages retrieved, including the terminating empty page.
    pub pages_fetched: usize,
    /// Upstream requests issued, retries included.
    pub api_calls: u32,
    /// True when the page cap was hit before an empty page was seen.
    pub truncated: bool,
}

/// Fetcher for the marketplace orders collection.
pub struct OrderFetcher {
    api: MarketplaceApi,
}

impl OrderFetcher {
    pub fn new(api: MarketplaceApi) -> Self {
        Self { api }
    }

    /// Fetch every order in the requested window, optionally scoped to one
    /// channel.
    ///
    /// Window and channel filtering happen in memory after the full fetch;
    /// the upstream does not support reliable server-side date filtering.
    pub async fn fetch_all(
        &self,
        window: &OrderWindow,
        channel: Option<&str>,
    ) -> Result<FetchReport, FetchError> {
        let page_size = self.api.page_size();
        let page_cap = self.api.page_cap();

        let mut records: Vec<JsonValue> = Vec::new();
        let mut pages_fetched = 0usize;
        let mut api_calls = 0u32;
        let mut truncated = false;

        loop {
            if pages_fetched >= page_cap {
                // Never conflated with clean completion: the caller sees
                // the truncation flag and the log stream sees a warning.
                warn!(
                    page_cap,
                    records = records.len(),
                    "Page cap reached before an empty page; possible truncation"
                );
                counter!("marketplace_fetch_truncations_total").increment(1);
                truncated = true;
                break;
            }

            let skip = pages_fetched * page_size;
            let (body, attempts) = self.api.fetch_orders_page(pages_fetched, skip).await?;
            api_calls += attempts;
            pages_fetched += 1;

            let page_records = validate_page(body, pages_fetched - 1)?;

            if page_records.is_empty() {
                debug!(pages_fetched, "Empty page received, collection complete");
                break;
            }

            debug!(
                page = pages_fetched - 1,
                count = page_records.len(),
                "Fetched page"
            );
            records.extend(page_records);
        }

        let fetched_total = records.len();
        let records = filter_records(records, window, channel);

        info!(
            fetched = fetched_total,
            retained = records.len(),
            pages = pages_fetched,
            api_calls,
            truncated,
            "Fetch run complete"
        );
        counter!("marketplace_orders_fetched_total").increment(fetched_total as u64);

        Ok(FetchReport {
            records,
            pages_fetched,
            api_calls,
            truncated,
        })
    }
}

/// Shape-check one page body: it must decode as a JSON array and every
/// element must be an object. Any deviation is a malformed response, not
/// a generic decode panic further down.
pub fn validate_page(body: JsonValue, page: usize) -> Result<Vec<JsonValue>, FetchError> {
    let items = match body {
        JsonValue::Array(items) => items,
        other => {
            return Err(FetchError::Malformed {
                page,
                details: format!("expected a JSON array, got {}", json_type_name(&other)),
            });
        }
    };

    for (index, item) in items.iter().enumerate() {
        if !item.is_object() {
            return Err(FetchError::Malformed {
                page,
                details: format!(
                    "element {} is {}, expected an object",
                    index,
                    json_type_name(item)
                ),
            });
        }
    }

    Ok(items)
}

/// In-memory window and channel filter, with dedup by external id
/// (first occurrence wins).
///
/// Records whose date or id cannot be read pass through: the reconciler
/// owns record-level rejection and counts them there.
fn filter_records(
    records: Vec<JsonValue>,
    window: &OrderWindow,
    channel: Option<&str>,
) -> Vec<JsonValue> {
    let mut seen_ids = std::collections::HashSet::new();
    let mut retained = Vec::with_capacity(records.len());

    for record in records {
        if let Some(requested) = channel
            && let Some(record_channel) = extract_channel(&record)
            && record_channel != requested
        {
            continue;
        }

        if let Some(date_created) = extract_date_created(&record)
            && !window.contains(date_created)
        {
            continue;
        }

        if let Some(id) = extract_external_id(&record)
            && !seen_ids.insert(id)
        {
            continue;
        }

        retained.push(record);
    }

    retained
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
