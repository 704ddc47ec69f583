//! Threshold Alert Engine
//!
//! Converges the alert ledger against current entity state. The decision
//! core is a pure function of (computed condition, existing alert state),
//! so creation, escalation, and resolution are testable without a
//! database, and the passes are safe to re-run on a schedule: a second
//! pass over unchanged state changes nothing.

use std::collections::HashSet;

use chrono::Utc;
use metrics::counter;
use sea_orm::DatabaseConnection;
use tracing::{debug, info, instrument, warn};

use crate::engine::state::{AlertType, EntityKind, OrderState, Severity, StockCondition};
use crate::error::RepositoryError;
use crate::models::alert::Model as AlertModel;
use crate::repositories::threshold_config::ThresholdTiers;
use crate::repositories::{
    AlertRepository, StockItemRepository, ThresholdConfigRepository, TrackedOrderRepository,
};

/// What the engine should do for one (entity, alert_type) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCommand {
    /// Condition holds and no alert is open: create one at this severity.
    Create(Severity),
    /// Condition holds at a different tier than the open alert: update
    /// severity in place, never a duplicate row.
    Escalate(Severity),
    /// Condition holds at the stored tier: leave the alert alone.
    Keep,
    /// Condition cleared while an alert is open: resolve it.
    Resolve,
    /// Condition absent and nothing open.
    Nothing,
}

/// Pure decision core of the alert state machine.
///
/// `computed` is the severity the current entity state warrants (None when
/// no tier is met, the state is terminal, or the condition cleared);
/// `open` is the severity of the currently open alert, if any.
pub fn decide(computed: Option<Severity>, open: Option<Severity>) -> AlertCommand {
    match (computed, open) {
        (Some(severity), None) => AlertCommand::Create(severity),
        (Some(severity), Some(existing)) if severity != existing => {
            AlertCommand::Escalate(severity)
        }
        (Some(_), Some(_)) => AlertCommand::Keep,
        (None, Some(_)) => AlertCommand::Resolve,
        (None, None) => AlertCommand::Nothing,
    }
}

/// Highest tier whose threshold the elapsed time has met, ascending order.
pub fn order_tier(elapsed_hours: i64, tiers: &ThresholdTiers) -> Option<Severity> {
    if elapsed_hours >= tiers.tier_3_hours as i64 {
        Some(Severity::Critical)
    } else if elapsed_hours >= tiers.tier_2_hours as i64 {
        Some(Severity::Red)
    } else if elapsed_hours >= tiers.tier_1_hours as i64 {
        Some(Severity::Yellow)
    } else {
        None
    }
}

/// Severity asserted by a stock condition, if any.
fn stock_assertion(condition: StockCondition) -> Option<(AlertType, Severity)> {
    match condition {
        StockCondition::Negative => Some((AlertType::EstoqueNegativo, Severity::Critical)),
        StockCondition::Zero => Some((AlertType::EstoqueZero, Severity::Red)),
        StockCondition::Low => Some((AlertType::EstoqueBaixo, Severity::Yellow)),
        StockCondition::Ok => None,
    }
}

const STOCK_ALERT_TYPES: [AlertType; 3] = [
    AlertType::EstoqueNegativo,
    AlertType::EstoqueZero,
    AlertType::EstoqueBaixo,
];

/// Counters describing one engine pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOutcome {
    pub evaluated: u32,
    pub created: u32,
    pub escalated: u32,
    pub resolved: u32,
    /// Entities skipped because their category has no threshold config.
    pub skipped_missing_config: u32,
}

/// Engine that maintains the alert ledger.
pub struct ThresholdAlertEngine<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ThresholdAlertEngine<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Evaluate every tracked order against the configured duration tiers.
    ///
    /// Thresholds are loaded once per pass; a category without
    /// configuration is skipped with one warning rather than crashing the
    /// pass or resolving alerts for a condition that never cleared.
    #[instrument(skip(self))]
    pub async fn run_order_pass(&self) -> Result<PassOutcome, RepositoryError> {
        let thresholds = ThresholdConfigRepository::new(self.db).load_tier_map().await?;
        let order_repo = TrackedOrderRepository::new(self.db);
        let alert_repo = AlertRepository::new(self.db);

        let now = Utc::now().fixed_offset();
        let mut outcome = PassOutcome::default();
        let mut warned_categories: HashSet<OrderState> = HashSet::new();

        for order in order_repo.list_non_terminal().await? {
            let state = match OrderState::parse(&order.status) {
                Ok(state) => state,
                Err(err) => {
                    warn!(external_id = %order.external_id, %err, "Tracked order has unknown state");
                    continue;
                }
            };

            outcome.evaluated += 1;

            // An order stuck in one state cannot still be stuck in a
            // previous one: clear stale stalled-alerts of other types.
            let current_type = AlertType::OrderStalled(state);
            self.resolve_other_order_alerts(
                &alert_repo,
                &order.external_id,
                &current_type,
                &format!("Status atual: {}", state.as_str()),
                &mut outcome,
            )
            .await?;

            let Some(tiers) = thresholds.get(&state) else {
                if warned_categories.insert(state) {
                    warn!(
                        category = state.as_str(),
                        "No threshold config for category; alerts impossible for these orders"
                    );
                    counter!("alert_engine_missing_config_total").increment(1);
                }
                outcome.skipped_missing_config += 1;
                continue;
            };

            let elapsed_hours = now
                .signed_duration_since(order.status_entered_at)
                .num_hours();
            let computed = order_tier(elapsed_hours, tiers);

            let open = alert_repo.find_open(&order.external_id, &current_type).await?;
            let message = format!(
                "Pedido {} parado em '{}' ha {}h",
                order.external_id,
                state.as_str(),
                elapsed_hours
            );
            let clear_note = format!(
                "Tempo em '{}' abaixo do limite ({}h)",
                state.as_str(),
                elapsed_hours
            );

            self.apply_command(
                &alert_repo,
                &current_type,
                &order.external_id,
                computed,
                open,
                message,
                clear_note,
                &mut outcome,
            )
            .await?;
        }

        // Terminal states never hold an open alert: resolve anything
        // still open for those orders, regardless of how long it was open.
        for order in order_repo.list_terminal().await? {
            let note = format!("Pedido finalizado: {}", order.status);
            for alert in alert_repo.list_open_for_entity(&order.external_id).await? {
                if alert.entity_kind != EntityKind::Order.as_str() {
                    continue;
                }
                alert_repo.resolve(alert, Some(note.clone())).await?;
                outcome.resolved += 1;
            }
        }

        info!(
            evaluated = outcome.evaluated,
            created = outcome.created,
            escalated = outcome.escalated,
            resolved = outcome.resolved,
            skipped_missing_config = outcome.skipped_missing_config,
            "Order alert pass complete"
        );

        Ok(outcome)
    }

    /// Evaluate every stock item against its quantity thresholds.
    #[instrument(skip(self))]
    pub async fn run_stock_pass(&self) -> Result<PassOutcome, RepositoryError> {
        let stock_repo = StockItemRepository::new(self.db);
        let alert_repo = AlertRepository::new(self.db);

        let mut outcome = PassOutcome::default();

        for item in stock_repo.list_all().await? {
            outcome.evaluated += 1;

            let condition = StockCondition::derive(item.quantity, item.minimum_quantity);
            let asserted = stock_assertion(condition);

            // Conditions are mutually exclusive: at most one type is
            // asserted and the other two resolve on the same pass.
            for alert_type in STOCK_ALERT_TYPES {
                let computed = match asserted {
                    Some((asserted_type, severity)) if asserted_type == alert_type => {
                        Some(severity)
                    }
                    _ => None,
                };

                let open = alert_repo.find_open(&item.sku, &alert_type).await?;
                let message = format!(
                    "{}: estoque atual {} (minimo {})",
                    item.name, item.quantity, item.minimum_quantity
                );
                let clear_note = format!("Estoque atual: {} unidades", item.quantity);

                self.apply_command(
                    &alert_repo,
                    &alert_type,
                    &item.sku,
                    computed,
                    open,
                    message,
                    clear_note,
                    &mut outcome,
                )
                .await?;
            }
        }

        info!(
            evaluated = outcome.evaluated,
            created = outcome.created,
            escalated = outcome.escalated,
            resolved = outcome.resolved,
            "Stock alert pass complete"
        );

        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_command(
        &self,
        alert_repo: &AlertRepository<'_>,
        alert_type: &AlertType,
        entity_ref: &str,
        computed: Option<Severity>,
        open: Option<AlertModel>,
        message: String,
        clear_note: String,
        outcome: &mut PassOutcome,
    ) -> Result<(), RepositoryError> {
        let open_severity = match &open {
            Some(alert) => match Severity::parse(&alert.severity) {
                Ok(severity) => Some(severity),
                Err(err) => {
                    // Treat an unreadable stored severity as a mismatch so
                    // the next write repairs it.
                    warn!(alert_id = %alert.id, %err, "Open alert has unknown severity");
                    None
                }
            },
            None => None,
        };

        match (decide(computed, open_severity), open) {
            (AlertCommand::Create(severity), _) => {
                alert_repo
                    .create(alert_type, entity_ref, severity, Some(message))
                    .await?;
                counter!("alerts_created_total").increment(1);
                outcome.created += 1;
            }
            (AlertCommand::Escalate(severity), Some(alert)) => {
                alert_repo.update_severity(alert, severity).await?;
                counter!("alerts_escalated_total").increment(1);
                outcome.escalated += 1;
            }
            (AlertCommand::Resolve, Some(alert)) => {
                alert_repo.resolve(alert, Some(clear_note)).await?;
                counter!("alerts_resolved_total").increment(1);
                outcome.resolved += 1;
            }
            (AlertCommand::Keep, _) | (AlertCommand::Nothing, _) => {}
            // decide() only emits Escalate/Resolve when an alert is open.
            (AlertCommand::Escalate(_), None) | (AlertCommand::Resolve, None) => unreachable!(),
        }

        Ok(())
    }

    async fn resolve_other_order_alerts(
        &self,
        alert_repo: &AlertRepository<'_>,
        entity_ref: &str,
        current_type: &AlertType,
        note: &str,
        outcome: &mut PassOutcome,
    ) -> Result<(), RepositoryError> {
        let current_key = current_type.key();

        for alert in alert_repo.list_open_for_entity(entity_ref).await? {
            if alert.entity_kind != EntityKind::Order.as_str() || alert.alert_type == current_key {
                continue;
            }

            debug!(
                alert_id = %alert.id,
                alert_type = %alert.alert_type,
                "Resolving stale stalled-order alert after state change"
            );
            alert_repo.resolve(alert, Some(note.to_string())).await?;
            outcome.resolved += 1;
        }

        Ok(())
    }
}
