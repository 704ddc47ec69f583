//! Raw upstream record types
//!
//! The upstream API is inconsistently shaped, so mapping is lenient where
//! the data allows it (ids may arrive as numbers or strings, buyers as
//! objects or plain strings) and strict where the engine depends on the
//! value (status must parse to a known state).

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::engine::state::OrderState;

/// Half-open time window requested for a sync run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl OrderWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// Error mapping one upstream record. Record-level failures are counted
/// and skipped, never aborting a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordParseError {
    #[error("missing required field '{name}'")]
    MissingField { name: &'static str },
    #[error("invalid value for field '{name}': {details}")]
    InvalidField { name: &'static str, details: String },
}

/// One marketplace order as mapped from a raw upstream object.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOrder {
    pub external_id: String,
    pub status: OrderState,
    pub channel: Option<String>,
    pub buyer: Option<String>,
    pub total_amount: Option<f64>,
    pub currency: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub payload: JsonValue,
}

impl RawOrder {
    /// Map a raw upstream object into a typed record.
    ///
    /// The caller has already verified `value` is a JSON object; this
    /// enforces the per-record contract on top of that.
    pub fn from_value(value: &JsonValue) -> Result<Self, RecordParseError> {
        let external_id =
            extract_external_id(value).ok_or(RecordParseError::MissingField { name: "id" })?;

        let status_raw = value
            .get("status")
            .and_then(|v| v.as_str())
            .ok_or(RecordParseError::MissingField { name: "status" })?;

        let status =
            OrderState::parse(status_raw).map_err(|err| RecordParseError::InvalidField {
                name: "status",
                details: err.to_string(),
            })?;

        let channel = value
            .get("channel")
            .or_else(|| value.get("store"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        // Buyers arrive either as objects with a nickname or as plain strings.
        let buyer = match value.get("buyer") {
            Some(JsonValue::String(name)) => Some(name.clone()),
            Some(JsonValue::Object(map)) => map
                .get("nickname")
                .or_else(|| map.get("name"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            _ => None,
        };

        let total_amount = value.get("total_amount").and_then(|v| v.as_f64());

        let currency = value
            .get("currency_id")
            .or_else(|| value.get("currency"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let date_created = extract_date_created(value);

        Ok(Self {
            external_id,
            status,
            channel,
            buyer,
            total_amount,
            currency,
            date_created,
            payload: value.clone(),
        })
    }
}

/// External id, tolerating numeric and string forms under either key.
pub fn extract_external_id(value: &JsonValue) -> Option<String> {
    let id = value.get("id").or_else(|| value.get("order_id"))?;
    match id {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Creation date as RFC 3339, when present and readable.
pub fn extract_date_created(value: &JsonValue) -> Option<DateTime<Utc>> {
    value
        .get("date_created")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Channel value as reported by the record, under either key.
pub fn extract_channel(value: &JsonValue) -> Option<&str> {
    value
        .get("channel")
        .or_else(|| value.get("store"))
        .and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_complete_record() {
        let value = json!({
            "id": 2000001,
            "status": "shipped",
            "channel": "mlb",
            "buyer": {"nickname": "COMPRADOR123"},
            "total_amount": 159.9,
            "currency_id": "BRL",
            "date_created": "2026-01-05T12:30:00-03:00",
        });

        let order = RawOrder::from_value(&value).unwrap();
        assert_eq!(order.external_id, "2000001");
        assert_eq!(order.status, OrderState::Shipped);
        assert_eq!(order.channel.as_deref(), Some("mlb"));
        assert_eq!(order.buyer.as_deref(), Some("COMPRADOR123"));
        assert_eq!(order.total_amount, Some(159.9));
        assert_eq!(order.currency.as_deref(), Some("BRL"));
        assert!(order.date_created.is_some());
    }

    #[test]
    fn test_accepts_string_id_and_string_buyer() {
        let value = json!({
            "order_id": "A-77",
            "status": "processing",
            "buyer": "Maria",
        });

        let order = RawOrder::from_value(&value).unwrap();
        assert_eq!(order.external_id, "A-77");
        assert_eq!(order.buyer.as_deref(), Some("Maria"));
    }

    #[test]
    fn test_rejects_missing_id() {
        let value = json!({"status": "shipped"});
        assert_eq!(
            RawOrder::from_value(&value),
            Err(RecordParseError::MissingField { name: "id" })
        );
    }

    #[test]
    fn test_rejects_missing_status() {
        let value = json!({"id": 1});
        assert_eq!(
            RawOrder::from_value(&value),
            Err(RecordParseError::MissingField { name: "status" })
        );
    }

    #[test]
    fn test_rejects_unknown_status() {
        let value = json!({"id": 1, "status": "teleported"});
        assert!(matches!(
            RawOrder::from_value(&value),
            Err(RecordParseError::InvalidField { name: "status", .. })
        ));
    }

    #[test]
    fn test_unreadable_date_is_none() {
        let value = json!({"id": 1, "status": "shipped", "date_created": "not-a-date"});
        let order = RawOrder::from_value(&value).unwrap();
        assert!(order.date_created.is_none());
    }

    #[test]
    fn test_window_contains() {
        let start = "2026-01-01T00:00:00Z".parse().unwrap();
        let end = "2026-01-31T23:59:59Z".parse().unwrap();
        let window = OrderWindow::new(start, end);

        assert!(window.contains("2026-01-15T10:00:00Z".parse().unwrap()));
        assert!(!window.contains("2026-02-01T00:00:00Z".parse().unwrap()));
    }
}
