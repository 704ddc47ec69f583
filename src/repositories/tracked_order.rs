//! # TrackedOrder Repository
//!
//! Query access to the local order mirror. Writes go through the
//! reconciler, which owns upsert semantics; this repository serves the
//! alert engine and the HTTP surface.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::engine::state::OrderState;
use crate::error::RepositoryError;
use crate::models::tracked_order::{Column, Entity, Model};

/// Repository for tracked order database operations
pub struct TrackedOrderRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TrackedOrderRepository<'a> {
    /// Create a new TrackedOrderRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find one tracked order by its channel-scoped external id
    pub async fn find_by_external(
        &self,
        channel: &str,
        external_id: &str,
    ) -> Result<Option<Model>, RepositoryError> {
        let order = Entity::find()
            .filter(Column::Channel.eq(channel))
            .filter(Column::ExternalId.eq(external_id))
            .one(self.db)
            .await?;

        Ok(order)
    }

    /// List all orders currently in a non-terminal state.
    ///
    /// This is the working set of the order alert pass; terminal orders
    /// are only visited through the open alerts they may still hold.
    pub async fn list_non_terminal(&self) -> Result<Vec<Model>, RepositoryError> {
        let non_terminal: Vec<&str> = OrderState::ALL
            .iter()
            .filter(|s| !s.is_terminal())
            .map(|s| s.as_str())
            .collect();

        let orders = Entity::find()
            .filter(Column::Status.is_in(non_terminal))
            .all(self.db)
            .await?;

        Ok(orders)
    }

    /// List all orders currently in a terminal state
    pub async fn list_terminal(&self) -> Result<Vec<Model>, RepositoryError> {
        let terminal: Vec<&str> = OrderState::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .map(|s| s.as_str())
            .collect();

        let orders = Entity::find()
            .filter(Column::Status.is_in(terminal))
            .all(self.db)
            .await?;

        Ok(orders)
    }

    /// Total number of tracked orders
    pub async fn count(&self) -> Result<u64, RepositoryError> {
        let count = Entity::find().count(self.db).await?;
        Ok(count)
    }
}
