//! StockItem entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// StockItem entity representing one locally-owned inventory item
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_items")]
pub struct Model {
    /// Unique identifier for the stock item (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Stock keeping unit, unique across the catalog
    pub sku: String,

    /// Item display name
    pub name: String,

    /// Current quantity on hand; may go negative on oversell
    pub quantity: i32,

    /// Minimum quantity before the low-stock condition triggers
    pub minimum_quantity: i32,

    /// Timestamp when the stock item was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the stock item was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
