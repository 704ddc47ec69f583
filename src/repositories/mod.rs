//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for database entities, providing a clean API for data access.

pub mod alert;
pub mod stock_item;
pub mod sync_job;
pub mod threshold_config;
pub mod tracked_order;

pub use alert::AlertRepository;
pub use stock_item::StockItemRepository;
pub use sync_job::SyncJobRepository;
pub use threshold_config::ThresholdConfigRepository;
pub use tracked_order::TrackedOrderRepository;
