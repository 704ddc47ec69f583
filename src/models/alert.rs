//! Alert entity model
//!
//! Alerts are derived records: the threshold engine creates, escalates,
//! and resolves them as a pure function of entity state. At most one
//! unresolved row may exist per (entity_ref, alert_type).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Alert entity representing one derived alert
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    /// Unique identifier for the alert (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Kind of entity the alert refers to (order | stock)
    pub entity_kind: String,

    /// External order id or SKU the alert refers to
    pub entity_ref: String,

    /// Alert taxonomy key (e.g. pedido_parado_processing, estoque_zero)
    pub alert_type: String,

    /// Current severity tier (yellow | red | critical)
    pub severity: String,

    /// Lifecycle status (ativo | lido | resolvido)
    pub status: String,

    /// Human-readable description set at creation
    pub message: Option<String>,

    /// Timestamp of resolution, automatic or manual
    pub resolved_at: Option<DateTimeWithTimeZone>,

    /// Note describing why the alert was resolved
    pub resolution_note: Option<String>,

    /// Timestamp when the alert was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the alert was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
