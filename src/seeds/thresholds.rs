//! Default threshold seeding
//!
//! Creates one ThresholdConfig row per non-terminal order state when none
//! exists yet. Existing rows are left untouched so operator changes
//! survive re-seeding.

use sea_orm::DatabaseConnection;
use tracing::info;

use crate::engine::state::OrderState;
use crate::error::RepositoryError;
use crate::repositories::ThresholdConfigRepository;
use crate::repositories::threshold_config::ThresholdTiers;

/// Default escalation tiers per category, in hours.
const DEFAULT_TIERS: [(OrderState, i32, i32, i32); 3] = [
    (OrderState::Processing, 24, 72, 168),
    (OrderState::Shipped, 72, 120, 240),
    (OrderState::Issue, 12, 48, 96),
];

/// Seed default threshold configurations, returning how many were created.
pub async fn seed_default_thresholds(db: &DatabaseConnection) -> Result<u32, RepositoryError> {
    let repo = ThresholdConfigRepository::new(db);
    let mut created = 0;

    for (category, tier_1, tier_2, tier_3) in DEFAULT_TIERS {
        if repo.find_by_category(category.as_str()).await?.is_some() {
            continue;
        }

        repo.create(category, ThresholdTiers::new(tier_1, tier_2, tier_3))
            .await?;
        created += 1;
    }

    if created > 0 {
        info!(created, "Seeded default threshold configurations");
    }

    Ok(created)
}
