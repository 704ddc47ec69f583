//! Database migrations for the Vigia sync and alerting service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_01_10_100000_create_tracked_orders;
mod m2026_01_10_100100_create_stock_items;
mod m2026_01_10_100200_create_threshold_configs;
mod m2026_01_10_100300_create_alerts;
mod m2026_01_10_100400_create_sync_jobs;
mod m2026_01_10_100500_create_sync_chunks;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_10_100000_create_tracked_orders::Migration),
            Box::new(m2026_01_10_100100_create_stock_items::Migration),
            Box::new(m2026_01_10_100200_create_threshold_configs::Migration),
            Box::new(m2026_01_10_100300_create_alerts::Migration),
            Box::new(m2026_01_10_100400_create_sync_jobs::Migration),
            Box::new(m2026_01_10_100500_create_sync_chunks::Migration),
        ]
    }
}
