//! # ThresholdConfig Repository
//!
//! CRUD over escalation tier configuration, one row per order-status
//! category, with strictly-increasing tier validation. The alert engine
//! loads the full table once per pass instead of consulting any global
//! mutable settings.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use thiserror::Error;
use uuid::Uuid;

use crate::engine::state::OrderState;
use crate::error::RepositoryError;
use crate::models::threshold_config::{ActiveModel, Column, Entity, Model};

/// Escalation tiers for one category, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdTiers {
    pub tier_1_hours: i32,
    pub tier_2_hours: i32,
    pub tier_3_hours: i32,
}

impl ThresholdTiers {
    pub fn new(tier_1_hours: i32, tier_2_hours: i32, tier_3_hours: i32) -> Self {
        Self {
            tier_1_hours,
            tier_2_hours,
            tier_3_hours,
        }
    }
}

/// Error raised when submitted tiers are not strictly increasing or negative.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdValidationError {
    #[error("tier hours must be non-negative, got {value}")]
    NegativeTier { value: i32 },
    #[error("tiers must be strictly increasing: {tier_1} < {tier_2} < {tier_3} does not hold")]
    NotIncreasing {
        tier_1: i32,
        tier_2: i32,
        tier_3: i32,
    },
}

/// Validate tier ordering: 0 <= tier_1 < tier_2 < tier_3.
pub fn validate_tiers(tiers: ThresholdTiers) -> Result<(), ThresholdValidationError> {
    if tiers.tier_1_hours < 0 {
        return Err(ThresholdValidationError::NegativeTier {
            value: tiers.tier_1_hours,
        });
    }

    if tiers.tier_1_hours >= tiers.tier_2_hours || tiers.tier_2_hours >= tiers.tier_3_hours {
        return Err(ThresholdValidationError::NotIncreasing {
            tier_1: tiers.tier_1_hours,
            tier_2: tiers.tier_2_hours,
            tier_3: tiers.tier_3_hours,
        });
    }

    Ok(())
}

/// Repository for threshold configuration database operations
pub struct ThresholdConfigRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ThresholdConfigRepository<'a> {
    /// Create a new ThresholdConfigRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// List all configured categories
    pub async fn list_all(&self) -> Result<Vec<Model>, RepositoryError> {
        let configs = Entity::find().all(self.db).await?;
        Ok(configs)
    }

    /// Load all configurations into a per-state map for one engine pass.
    ///
    /// Rows whose category no longer parses are skipped with a warning
    /// instead of failing the pass.
    pub async fn load_tier_map(&self) -> Result<HashMap<OrderState, ThresholdTiers>, RepositoryError> {
        let mut map = HashMap::new();

        for config in self.list_all().await? {
            match OrderState::parse(&config.category) {
                Ok(state) => {
                    map.insert(
                        state,
                        ThresholdTiers::new(
                            config.tier_1_hours,
                            config.tier_2_hours,
                            config.tier_3_hours,
                        ),
                    );
                }
                Err(err) => {
                    tracing::warn!(category = %config.category, %err, "Skipping threshold config with unknown category");
                }
            }
        }

        Ok(map)
    }

    /// Find the configuration for one category
    pub async fn find_by_category(&self, category: &str) -> Result<Option<Model>, RepositoryError> {
        let config = Entity::find()
            .filter(Column::Category.eq(category))
            .one(self.db)
            .await?;

        Ok(config)
    }

    /// Create a configuration row for a category
    pub async fn create(
        &self,
        category: OrderState,
        tiers: ThresholdTiers,
    ) -> Result<Model, RepositoryError> {
        let now = Utc::now().fixed_offset();

        let config = ActiveModel {
            id: Set(Uuid::new_v4()),
            category: Set(category.as_str().to_string()),
            tier_1_hours: Set(tiers.tier_1_hours),
            tier_2_hours: Set(tiers.tier_2_hours),
            tier_3_hours: Set(tiers.tier_3_hours),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = config.insert(self.db).await?;

        tracing::info!(
            category = category.as_str(),
            tier_1 = tiers.tier_1_hours,
            tier_2 = tiers.tier_2_hours,
            tier_3 = tiers.tier_3_hours,
            "Threshold configuration created"
        );

        Ok(inserted)
    }

    /// Update the tiers for an existing category
    pub async fn update_tiers(
        &self,
        category: OrderState,
        tiers: ThresholdTiers,
    ) -> Result<Model, RepositoryError> {
        let config = self
            .find_by_category(category.as_str())
            .await?
            .ok_or(RepositoryError::NotFound {
                entity: "threshold config",
                reference: category.as_str().to_string(),
            })?;

        let mut active: ActiveModel = config.into();
        active.tier_1_hours = Set(tiers.tier_1_hours);
        active.tier_2_hours = Set(tiers.tier_2_hours);
        active.tier_3_hours = Set(tiers.tier_3_hours);
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(self.db).await?;
        Ok(updated)
    }
}
