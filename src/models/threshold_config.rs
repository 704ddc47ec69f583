//! ThresholdConfig entity model
//!
//! One row per order-status category. Tiers are hours-in-state before an
//! alert escalates to yellow, red, and critical respectively; tiers must
//! be strictly increasing.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// ThresholdConfig entity holding the escalation tiers for one category
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "threshold_configs")]
pub struct Model {
    /// Unique identifier for the configuration row (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Order-status category this row configures (stable OrderState key)
    pub category: String,

    /// Hours in state before a yellow alert
    pub tier_1_hours: i32,

    /// Hours in state before escalation to red
    pub tier_2_hours: i32,

    /// Hours in state before escalation to critical
    pub tier_3_hours: i32,

    /// Timestamp when the configuration was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the configuration was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
