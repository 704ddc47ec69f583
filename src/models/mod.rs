//! # Data Models
//!
//! This module contains all the SeaORM entity models used throughout the
//! Vigia service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod alert;
pub mod stock_item;
pub mod sync_chunk;
pub mod sync_job;
pub mod threshold_config;
pub mod tracked_order;

pub use alert::Entity as Alert;
pub use stock_item::Entity as StockItem;
pub use sync_chunk::Entity as SyncChunk;
pub use sync_job::Entity as SyncJob;
pub use threshold_config::Entity as ThresholdConfig;
pub use tracked_order::Entity as TrackedOrder;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "vigia".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
