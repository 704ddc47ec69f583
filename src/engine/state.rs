//! Domain state enumerations.
//!
//! Order lifecycle states, derived stock conditions, alert taxonomy, and
//! job lifecycle states. Every enum carries a stable string form used for
//! database storage and the HTTP surface; parsing is exhaustive so adding
//! a category is a compile-time-checked change.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Error raised when a stored or upstream string does not map to a known
/// enumeration value.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownValue {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Lifecycle state of a marketplace order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Processing,
    Shipped,
    Delivered,
    Returned,
    Cancelled,
    Issue,
}

impl OrderState {
    pub const ALL: [OrderState; 6] = [
        OrderState::Processing,
        OrderState::Shipped,
        OrderState::Delivered,
        OrderState::Returned,
        OrderState::Cancelled,
        OrderState::Issue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Processing => "processing",
            OrderState::Shipped => "shipped",
            OrderState::Delivered => "delivered",
            OrderState::Returned => "returned",
            OrderState::Cancelled => "cancelled",
            OrderState::Issue => "issue",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownValue> {
        // Upstream emits a handful of legacy aliases alongside the
        // canonical keys.
        match value {
            "processing" | "paid" | "handling" => Ok(OrderState::Processing),
            "shipped" | "in_transit" => Ok(OrderState::Shipped),
            "delivered" => Ok(OrderState::Delivered),
            "returned" => Ok(OrderState::Returned),
            "cancelled" | "canceled" => Ok(OrderState::Cancelled),
            "issue" | "claim" | "dispute" => Ok(OrderState::Issue),
            other => Err(UnknownValue::new("order state", other)),
        }
    }

    /// Terminal states never hold an open alert: once an order is
    /// delivered, returned, or cancelled it is definitionally no longer a
    /// problem, regardless of how long it sat there.
    pub fn is_terminal(&self) -> bool {
        match self {
            OrderState::Delivered | OrderState::Returned | OrderState::Cancelled => true,
            OrderState::Processing | OrderState::Shipped | OrderState::Issue => false,
        }
    }
}

/// Stock condition derived from quantity vs. configured minimum.
///
/// The variants are mutually exclusive, so at any moment at most one stock
/// alert type is being asserted per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockCondition {
    Ok,
    Low,
    Zero,
    Negative,
}

impl StockCondition {
    /// Derive the condition from current and minimum quantities.
    pub fn derive(quantity: i32, minimum: i32) -> Self {
        if quantity < 0 {
            StockCondition::Negative
        } else if quantity == 0 {
            StockCondition::Zero
        } else if quantity <= minimum {
            StockCondition::Low
        } else {
            StockCondition::Ok
        }
    }
}

/// Kind of entity an alert refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Order,
    Stock,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Order => "order",
            EntityKind::Stock => "stock",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownValue> {
        match value {
            "order" => Ok(EntityKind::Order),
            "stock" => Ok(EntityKind::Stock),
            other => Err(UnknownValue::new("entity kind", other)),
        }
    }
}

/// Alert taxonomy: one type per stalled order category plus the three
/// stock conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertType {
    OrderStalled(OrderState),
    EstoqueBaixo,
    EstoqueZero,
    EstoqueNegativo,
}

impl AlertType {
    /// Stable key stored in the alerts table and used for open-alert
    /// uniqueness.
    pub fn key(&self) -> String {
        match self {
            AlertType::OrderStalled(state) => format!("pedido_parado_{}", state.as_str()),
            AlertType::EstoqueBaixo => "estoque_baixo".to_string(),
            AlertType::EstoqueZero => "estoque_zero".to_string(),
            AlertType::EstoqueNegativo => "estoque_negativo".to_string(),
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownValue> {
        if let Some(state) = value.strip_prefix("pedido_parado_") {
            return OrderState::parse(state)
                .map(AlertType::OrderStalled)
                .map_err(|_| UnknownValue::new("alert type", value));
        }
        match value {
            "estoque_baixo" => Ok(AlertType::EstoqueBaixo),
            "estoque_zero" => Ok(AlertType::EstoqueZero),
            "estoque_negativo" => Ok(AlertType::EstoqueNegativo),
            other => Err(UnknownValue::new("alert type", other)),
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            AlertType::OrderStalled(_) => EntityKind::Order,
            AlertType::EstoqueBaixo | AlertType::EstoqueZero | AlertType::EstoqueNegativo => {
                EntityKind::Stock
            }
        }
    }
}

/// Alert severity tier. Ordering reflects escalation: yellow < red < critical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Yellow,
    Red,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Yellow => "yellow",
            Severity::Red => "red",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownValue> {
        match value {
            "yellow" => Ok(Severity::Yellow),
            "red" => Ok(Severity::Red),
            "critical" => Ok(Severity::Critical),
            other => Err(UnknownValue::new("severity", other)),
        }
    }
}

/// Alert lifecycle status. `Resolvido` is the only status immune from
/// automatic transitions; `Lido` (acknowledged) alerts still escalate and
/// auto-resolve when the underlying condition clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Ativo,
    Lido,
    Resolvido,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Ativo => "ativo",
            AlertStatus::Lido => "lido",
            AlertStatus::Resolvido => "resolvido",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownValue> {
        match value {
            "ativo" => Ok(AlertStatus::Ativo),
            "lido" => Ok(AlertStatus::Lido),
            "resolvido" => Ok(AlertStatus::Resolvido),
            other => Err(UnknownValue::new("alert status", other)),
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, AlertStatus::Resolvido)
    }
}

/// Bulk job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownValue> {
        match value {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(UnknownValue::new("job status", other)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Chunk lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ChunkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStatus::Pending => "pending",
            ChunkStatus::Processing => "processing",
            ChunkStatus::Completed => "completed",
            ChunkStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownValue> {
        match value {
            "pending" => Ok(ChunkStatus::Pending),
            "processing" => Ok(ChunkStatus::Processing),
            "completed" => Ok(ChunkStatus::Completed),
            "failed" => Ok(ChunkStatus::Failed),
            other => Err(UnknownValue::new("chunk status", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_state_round_trip() {
        for state in OrderState::ALL {
            assert_eq!(OrderState::parse(state.as_str()).unwrap(), state);
        }
    }

    #[test]
    fn test_order_state_aliases() {
        assert_eq!(
            OrderState::parse("canceled").unwrap(),
            OrderState::Cancelled
        );
        assert_eq!(OrderState::parse("claim").unwrap(), OrderState::Issue);
        assert_eq!(OrderState::parse("paid").unwrap(), OrderState::Processing);
        assert!(OrderState::parse("unknown").is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderState::Delivered.is_terminal());
        assert!(OrderState::Returned.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(!OrderState::Processing.is_terminal());
        assert!(!OrderState::Shipped.is_terminal());
        assert!(!OrderState::Issue.is_terminal());
    }

    #[test]
    fn test_stock_condition_derivation() {
        assert_eq!(StockCondition::derive(-3, 5), StockCondition::Negative);
        assert_eq!(StockCondition::derive(0, 5), StockCondition::Zero);
        assert_eq!(StockCondition::derive(3, 5), StockCondition::Low);
        assert_eq!(StockCondition::derive(5, 5), StockCondition::Low);
        assert_eq!(StockCondition::derive(6, 5), StockCondition::Ok);
    }

    #[test]
    fn test_alert_type_keys() {
        let stalled = AlertType::OrderStalled(OrderState::Issue);
        assert_eq!(stalled.key(), "pedido_parado_issue");
        assert_eq!(AlertType::parse("pedido_parado_issue").unwrap(), stalled);
        assert_eq!(
            AlertType::parse("estoque_zero").unwrap(),
            AlertType::EstoqueZero
        );
        assert!(AlertType::parse("pedido_parado_bogus").is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Yellow < Severity::Red);
        assert!(Severity::Red < Severity::Critical);
    }

    #[test]
    fn test_alert_status_open() {
        assert!(AlertStatus::Ativo.is_open());
        assert!(AlertStatus::Lido.is_open());
        assert!(!AlertStatus::Resolvido.is_open());
    }
}
