//! Shared helpers for integration tests.

#![allow(dead_code)]

use migration::MigratorTrait;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use uuid::Uuid;

use vigia::config::{MarketplaceConfig, RateLimitConfig};
use vigia::engine::state::OrderState;
use vigia::marketplace::{MarketplaceApi, RequestBudget};
use vigia::models::tracked_order;
use vigia::repositories::ThresholdConfigRepository;
use vigia::repositories::threshold_config::ThresholdTiers;

/// Fresh in-memory database with all migrations applied.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Marketplace client pointed at a mock server, with fast retries and a
/// budget large enough to never block a test.
pub fn test_marketplace_api(base_url: &str, page_size: usize, page_cap: usize) -> MarketplaceApi {
    let config = MarketplaceConfig {
        api_base: base_url.to_string(),
        access_token: Some("test-token".to_string()),
        api_secret: Some("test-secret".to_string()),
        page_size,
        page_cap,
        fetch_retries: 3,
        retry_base_seconds: 0,
        retry_max_seconds: 1,
        retry_jitter_factor: 0.0,
    };

    let budget = RequestBudget::new(&RateLimitConfig {
        max_requests: 100_000,
        window_seconds: 60,
    });

    MarketplaceApi::new(config, budget).expect("Failed to build marketplace client")
}

/// Insert a tracked order directly, bypassing the reconciler, with an
/// explicit time already spent in the current state.
pub async fn insert_tracked_order(
    db: &DatabaseConnection,
    external_id: &str,
    status: OrderState,
    hours_in_state: i64,
) -> tracked_order::Model {
    let now = Utc::now().fixed_offset();
    let entered = now - Duration::hours(hours_in_state);

    let order = tracked_order::ActiveModel {
        id: Set(Uuid::new_v4()),
        external_id: Set(external_id.to_string()),
        channel: Set("default".to_string()),
        status: Set(status.as_str().to_string()),
        status_entered_at: Set(entered),
        buyer: Set(None),
        total_amount: Set(None),
        currency: Set(None),
        order_created_at: Set(None),
        payload: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    order.insert(db).await.expect("Failed to insert order")
}

/// Backdate the state-entry timestamp of an existing tracked order.
pub async fn backdate_status_entered_at(
    db: &DatabaseConnection,
    order: tracked_order::Model,
    hours_ago: i64,
) -> tracked_order::Model {
    let entered: DateTime<FixedOffset> =
        Utc::now().fixed_offset() - Duration::hours(hours_ago);

    let mut active: tracked_order::ActiveModel = order.into();
    active.status_entered_at = Set(entered);
    active.update(db).await.expect("Failed to backdate order")
}

/// Configure tiers for one category.
pub async fn seed_threshold(
    db: &DatabaseConnection,
    category: OrderState,
    tier_1: i32,
    tier_2: i32,
    tier_3: i32,
) {
    ThresholdConfigRepository::new(db)
        .create(category, ThresholdTiers::new(tier_1, tier_2, tier_3))
        .await
        .expect("Failed to seed threshold");
}
