//! Reconciler
//!
//! Maps raw upstream records onto tracked orders by external id. A record
//! for an unknown order creates it; a known order is refreshed in place.
//! `status_entered_at` is stamped only on an actual state change, so
//! re-observing the same state never resets the time-in-state clock the
//! alert engine escalates on.

use chrono::Utc;
use metrics::counter;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::marketplace::types::RawOrder;
use crate::models::tracked_order::{ActiveModel, Column, Entity, Model};

/// Counters describing one reconciliation batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Orders seen for the first time.
    pub created: u32,
    /// Orders refreshed without a state change.
    pub updated: u32,
    /// Orders whose state changed (timer restarted).
    pub transitioned: u32,
    /// Orders identical to the stored snapshot; no write issued.
    pub unchanged: u32,
    /// Records skipped because they failed to map or persist.
    pub errors: u32,
}

impl ReconcileOutcome {
    /// Fold another batch outcome into this one.
    pub fn absorb(&mut self, other: ReconcileOutcome) {
        self.created += other.created;
        self.updated += other.updated;
        self.transitioned += other.transitioned;
        self.unchanged += other.unchanged;
        self.errors += other.errors;
    }
}

enum RecordDisposition {
    Created,
    Transitioned,
    Updated,
    Unchanged,
}

/// Reconciler owning all writes to the tracked order mirror.
pub struct Reconciler<'a> {
    db: &'a DatabaseConnection,
    default_channel: String,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler; `default_channel` is assigned to records that
    /// do not carry their own channel.
    pub fn new(db: &'a DatabaseConnection, default_channel: &str) -> Self {
        Self {
            db,
            default_channel: default_channel.to_string(),
        }
    }

    /// Reconcile a batch of raw records.
    ///
    /// Each record is processed independently: a record that fails to map
    /// or persist increments the error counter and is skipped, never
    /// aborting the batch.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn reconcile(
        &self,
        records: &[JsonValue],
    ) -> Result<ReconcileOutcome, RepositoryError> {
        let mut outcome = ReconcileOutcome::default();

        for value in records {
            let raw = match RawOrder::from_value(value) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(%err, "Skipping unmappable record");
                    counter!("reconcile_record_errors_total").increment(1);
                    outcome.errors += 1;
                    continue;
                }
            };

            match self.apply(&raw).await {
                Ok(RecordDisposition::Created) => outcome.created += 1,
                Ok(RecordDisposition::Transitioned) => outcome.transitioned += 1,
                Ok(RecordDisposition::Updated) => outcome.updated += 1,
                Ok(RecordDisposition::Unchanged) => outcome.unchanged += 1,
                Err(err) => {
                    warn!(external_id = %raw.external_id, %err, "Failed to persist record");
                    counter!("reconcile_record_errors_total").increment(1);
                    outcome.errors += 1;
                }
            }
        }

        debug!(
            created = outcome.created,
            updated = outcome.updated,
            transitioned = outcome.transitioned,
            unchanged = outcome.unchanged,
            errors = outcome.errors,
            "Reconciliation batch complete"
        );

        Ok(outcome)
    }

    async fn apply(&self, raw: &RawOrder) -> Result<RecordDisposition, RepositoryError> {
        let channel = raw
            .channel
            .clone()
            .unwrap_or_else(|| self.default_channel.clone());

        let existing = Entity::find()
            .filter(Column::Channel.eq(channel.as_str()))
            .filter(Column::ExternalId.eq(raw.external_id.as_str()))
            .one(self.db)
            .await?;

        let now = Utc::now().fixed_offset();

        let Some(existing) = existing else {
            let order = ActiveModel {
                id: Set(Uuid::new_v4()),
                external_id: Set(raw.external_id.clone()),
                channel: Set(channel),
                status: Set(raw.status.as_str().to_string()),
                status_entered_at: Set(now),
                buyer: Set(raw.buyer.clone()),
                total_amount: Set(raw.total_amount),
                currency: Set(raw.currency.clone()),
                order_created_at: Set(raw.date_created.map(|dt| dt.fixed_offset())),
                payload: Set(Some(raw.payload.clone())),
                created_at: Set(now),
                updated_at: Set(now),
            };
            order.insert(self.db).await?;
            return Ok(RecordDisposition::Created);
        };

        let transitioned = existing.status != raw.status.as_str();
        let refreshed = fields_changed(&existing, raw);

        if !transitioned && !refreshed {
            // Upstream snapshot unchanged; leave the row untouched so the
            // pass stays idempotent.
            return Ok(RecordDisposition::Unchanged);
        }

        let previous_status = existing.status.clone();
        let mut active: ActiveModel = existing.into();

        if transitioned {
            active.status = Set(raw.status.as_str().to_string());
            active.status_entered_at = Set(now);
        }

        active.buyer = Set(raw.buyer.clone());
        active.total_amount = Set(raw.total_amount);
        active.currency = Set(raw.currency.clone());
        active.order_created_at = Set(raw.date_created.map(|dt| dt.fixed_offset()));
        active.payload = Set(Some(raw.payload.clone()));
        active.updated_at = Set(now);

        active.update(self.db).await?;

        if transitioned {
            debug!(
                external_id = %raw.external_id,
                from = %previous_status,
                to = raw.status.as_str(),
                "Order state transition"
            );
            counter!("reconcile_transitions_total").increment(1);
            Ok(RecordDisposition::Transitioned)
        } else {
            Ok(RecordDisposition::Updated)
        }
    }
}

fn fields_changed(existing: &Model, raw: &RawOrder) -> bool {
    existing.buyer != raw.buyer
        || existing.total_amount != raw.total_amount
        || existing.currency != raw.currency
        || existing.order_created_at != raw.date_created.map(|dt| dt.fixed_offset())
        || existing.payload.as_ref() != Some(&raw.payload)
}
