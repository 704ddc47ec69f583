//! # StockItem Repository

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::stock_item::{ActiveModel, Column, Entity, Model};

/// Repository for stock item database operations
pub struct StockItemRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> StockItemRepository<'a> {
    /// Create a new StockItemRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// List the full catalog
    pub async fn list_all(&self) -> Result<Vec<Model>, RepositoryError> {
        let items = Entity::find().all(self.db).await?;
        Ok(items)
    }

    /// Find one stock item by SKU
    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<Model>, RepositoryError> {
        let item = Entity::find()
            .filter(Column::Sku.eq(sku))
            .one(self.db)
            .await?;

        Ok(item)
    }

    /// Insert a stock item or refresh an existing one by SKU
    pub async fn upsert(
        &self,
        sku: &str,
        name: &str,
        quantity: i32,
        minimum_quantity: i32,
    ) -> Result<Model, RepositoryError> {
        let now = Utc::now().fixed_offset();

        if let Some(existing) = self.find_by_sku(sku).await? {
            let mut active: ActiveModel = existing.into();
            active.name = Set(name.to_string());
            active.quantity = Set(quantity);
            active.minimum_quantity = Set(minimum_quantity);
            active.updated_at = Set(now);
            let updated = active.update(self.db).await?;
            return Ok(updated);
        }

        let item = ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku.to_string()),
            name: Set(name.to_string()),
            quantity: Set(quantity),
            minimum_quantity: Set(minimum_quantity),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = item.insert(self.db).await?;
        Ok(inserted)
    }

    /// Set the current quantity for a SKU
    pub async fn set_quantity(&self, sku: &str, quantity: i32) -> Result<Model, RepositoryError> {
        let item = self
            .find_by_sku(sku)
            .await?
            .ok_or(RepositoryError::NotFound {
                entity: "stock item",
                reference: sku.to_string(),
            })?;

        let mut active: ActiveModel = item.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now().fixed_offset());
        let updated = active.update(self.db).await?;

        Ok(updated)
    }
}
