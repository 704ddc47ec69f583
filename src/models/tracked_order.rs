//! TrackedOrder entity model
//!
//! This module contains the SeaORM entity model for the tracked_orders
//! table, the local mirror of marketplace orders. `status_entered_at` is
//! only touched when the status actually changes between reconciliation
//! passes; it is the clock the alert engine escalates on.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// TrackedOrder entity representing one mirrored marketplace order
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tracked_orders")]
pub struct Model {
    /// Unique identifier for the tracked order (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Marketplace order identifier, unique per channel
    pub external_id: String,

    /// Sales channel / store scope (e.g. mlb, shopee)
    pub channel: String,

    /// Current lifecycle state (stable string form of OrderState)
    pub status: String,

    /// Timestamp of the last status change; never reset on re-observation
    pub status_entered_at: DateTimeWithTimeZone,

    /// Buyer display name as reported upstream
    pub buyer: Option<String>,

    /// Order total as reported upstream
    pub total_amount: Option<f64>,

    /// ISO currency code
    pub currency: Option<String>,

    /// Timestamp the order was created in the marketplace
    pub order_created_at: Option<DateTimeWithTimeZone>,

    /// Last raw upstream record for this order
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Option<JsonValue>,

    /// Timestamp when the tracked order was created locally
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the tracked order was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
