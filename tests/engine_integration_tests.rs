//! Reconciler and alert engine integration tests on an in-memory database.

use serde_json::json;

mod test_utils;
use test_utils::{
    backdate_status_entered_at, insert_tracked_order, seed_threshold, setup_test_db,
};

use vigia::engine::state::{AlertStatus, AlertType, OrderState, Severity};
use vigia::engine::{Reconciler, ThresholdAlertEngine};
use vigia::repositories::alert::AlertFilter;
use vigia::repositories::{AlertRepository, StockItemRepository, TrackedOrderRepository};

#[tokio::test]
async fn test_reconcile_creates_and_is_idempotent() {
    let db = setup_test_db().await;
    let reconciler = Reconciler::new(&db, "default");

    let records = vec![
        json!({"id": 1, "status": "processing", "total_amount": 100.0}),
        json!({"id": 2, "status": "shipped", "total_amount": 50.0}),
    ];

    let first = reconciler.reconcile(&records).await.unwrap();
    assert_eq!(first.created, 2);
    assert_eq!(first.transitioned, 0);
    assert_eq!(first.errors, 0);

    // Identical upstream snapshot: zero transitions, zero new entities.
    let second = reconciler.reconcile(&records).await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.transitioned, 0);
    assert_eq!(second.unchanged, 2);

    let repo = TrackedOrderRepository::new(&db);
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_timer_integrity_across_repeated_observations() {
    let db = setup_test_db().await;
    let reconciler = Reconciler::new(&db, "default");
    let repo = TrackedOrderRepository::new(&db);

    let records = vec![json!({"id": 77, "status": "shipped"})];

    reconciler.reconcile(&records).await.unwrap();
    let first_seen = repo
        .find_by_external("default", "77")
        .await
        .unwrap()
        .unwrap();

    // Two more passes observing the same state must not touch the timer.
    reconciler.reconcile(&records).await.unwrap();
    reconciler.reconcile(&records).await.unwrap();

    let after = repo
        .find_by_external("default", "77")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.status_entered_at, first_seen.status_entered_at);

    // A real transition restarts it.
    let transitioned = vec![json!({"id": 77, "status": "delivered"})];
    let outcome = reconciler.reconcile(&transitioned).await.unwrap();
    assert_eq!(outcome.transitioned, 1);

    let after_transition = repo
        .find_by_external("default", "77")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_transition.status, "delivered");
    assert!(after_transition.status_entered_at >= first_seen.status_entered_at);
    assert_ne!(
        after_transition.status_entered_at,
        first_seen.status_entered_at
    );
}

#[tokio::test]
async fn test_quantity_refresh_without_transition_keeps_timer() {
    let db = setup_test_db().await;
    let reconciler = Reconciler::new(&db, "default");
    let repo = TrackedOrderRepository::new(&db);

    reconciler
        .reconcile(&[json!({"id": 5, "status": "processing", "total_amount": 10.0})])
        .await
        .unwrap();
    let before = repo
        .find_by_external("default", "5")
        .await
        .unwrap()
        .unwrap();

    // Same state, new amount: refresh the field, not the timer.
    let outcome = reconciler
        .reconcile(&[json!({"id": 5, "status": "processing", "total_amount": 25.0})])
        .await
        .unwrap();
    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.transitioned, 0);

    let after = repo
        .find_by_external("default", "5")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.total_amount, Some(25.0));
    assert_eq!(after.status_entered_at, before.status_entered_at);
}

#[tokio::test]
async fn test_record_errors_do_not_abort_batch() {
    let db = setup_test_db().await;
    let reconciler = Reconciler::new(&db, "default");

    let records = vec![
        json!({"id": 1, "status": "processing"}),
        json!({"status": "shipped"}),              // missing id
        json!({"id": 3, "status": "teleported"}),  // unknown state
        json!({"id": 4, "status": "issue"}),
    ];

    let outcome = reconciler.reconcile(&records).await.unwrap();
    assert_eq!(outcome.created, 2);
    assert_eq!(outcome.errors, 2);

    let repo = TrackedOrderRepository::new(&db);
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_escalation_monotonicity_and_auto_resolution() {
    let db = setup_test_db().await;
    seed_threshold(&db, OrderState::Issue, 24, 72, 168).await;

    let engine = ThresholdAlertEngine::new(&db);
    let alert_repo = AlertRepository::new(&db);
    let alert_type = AlertType::OrderStalled(OrderState::Issue);

    let order = insert_tracked_order(&db, "900", OrderState::Issue, 25).await;

    engine.run_order_pass().await.unwrap();
    let alert = alert_repo.find_open("900", &alert_type).await.unwrap().unwrap();
    assert_eq!(alert.severity, Severity::Yellow.as_str());

    // 100h: escalate in place, same row.
    let order = backdate_status_entered_at(&db, order, 100).await;
    engine.run_order_pass().await.unwrap();
    let escalated = alert_repo.find_open("900", &alert_type).await.unwrap().unwrap();
    assert_eq!(escalated.id, alert.id);
    assert_eq!(escalated.severity, Severity::Red.as_str());

    // 200h: critical.
    let order = backdate_status_entered_at(&db, order, 200).await;
    engine.run_order_pass().await.unwrap();
    let critical = alert_repo.find_open("900", &alert_type).await.unwrap().unwrap();
    assert_eq!(critical.id, alert.id);
    assert_eq!(critical.severity, Severity::Critical.as_str());

    // Condition clears (below tier 1): the alert resolves automatically.
    backdate_status_entered_at(&db, order, 1).await;
    engine.run_order_pass().await.unwrap();
    assert!(alert_repo.find_open("900", &alert_type).await.unwrap().is_none());

    let resolved = alert_repo
        .list(AlertFilter {
            status: Some(AlertStatus::Resolvido),
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert!(resolved[0].resolution_note.is_some());
}

#[tokio::test]
async fn test_alert_uniqueness_across_repeated_passes() {
    let db = setup_test_db().await;
    seed_threshold(&db, OrderState::Issue, 24, 72, 168).await;

    let engine = ThresholdAlertEngine::new(&db);
    insert_tracked_order(&db, "901", OrderState::Issue, 48).await;

    for _ in 0..5 {
        engine.run_order_pass().await.unwrap();
    }

    let alert_repo = AlertRepository::new(&db);
    let open = alert_repo
        .list(AlertFilter {
            entity_ref: Some("901".to_string()),
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn test_terminal_state_suppresses_open_alerts() {
    let db = setup_test_db().await;
    seed_threshold(&db, OrderState::Issue, 24, 72, 168).await;

    let engine = ThresholdAlertEngine::new(&db);
    let alert_repo = AlertRepository::new(&db);
    let alert_type = AlertType::OrderStalled(OrderState::Issue);

    insert_tracked_order(&db, "902", OrderState::Issue, 500).await;
    engine.run_order_pass().await.unwrap();
    assert!(alert_repo.find_open("902", &alert_type).await.unwrap().is_some());

    // Upstream reports the order returned; next pass resolves the alert
    // no matter how long it had been open.
    let reconciler = Reconciler::new(&db, "default");
    reconciler
        .reconcile(&[json!({"id": 902, "status": "returned"})])
        .await
        .unwrap();
    engine.run_order_pass().await.unwrap();

    assert!(alert_repo.find_open("902", &alert_type).await.unwrap().is_none());

    let resolved = alert_repo
        .list(AlertFilter {
            entity_ref: Some("902".to_string()),
            status: Some(AlertStatus::Resolvido),
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(
        resolved[0].resolution_note.as_deref(),
        Some("Pedido finalizado: returned")
    );
}

#[tokio::test]
async fn test_state_change_resolves_stale_stalled_alert() {
    let db = setup_test_db().await;
    seed_threshold(&db, OrderState::Issue, 24, 72, 168).await;
    seed_threshold(&db, OrderState::Processing, 24, 72, 168).await;

    let engine = ThresholdAlertEngine::new(&db);
    let alert_repo = AlertRepository::new(&db);

    insert_tracked_order(&db, "903", OrderState::Issue, 48).await;
    engine.run_order_pass().await.unwrap();
    assert!(
        alert_repo
            .find_open("903", &AlertType::OrderStalled(OrderState::Issue))
            .await
            .unwrap()
            .is_some()
    );

    // The order moves to a different non-terminal state: the issue alert
    // clears, and the new state's timer starts fresh (no new alert yet).
    let reconciler = Reconciler::new(&db, "default");
    reconciler
        .reconcile(&[json!({"id": 903, "status": "processing"})])
        .await
        .unwrap();
    engine.run_order_pass().await.unwrap();

    assert!(
        alert_repo
            .find_open("903", &AlertType::OrderStalled(OrderState::Issue))
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        alert_repo
            .find_open("903", &AlertType::OrderStalled(OrderState::Processing))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_missing_threshold_config_skips_category() {
    let db = setup_test_db().await;
    // No config for shipped.

    let engine = ThresholdAlertEngine::new(&db);
    insert_tracked_order(&db, "904", OrderState::Shipped, 1000).await;

    let outcome = engine.run_order_pass().await.unwrap();
    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.skipped_missing_config, 1);

    // An already-open alert for the category survives the gap: the
    // condition never cleared, the configuration is just missing.
    let alert_repo = AlertRepository::new(&db);
    let alert_type = AlertType::OrderStalled(OrderState::Shipped);
    alert_repo
        .create(&alert_type, "904", Severity::Yellow, None)
        .await
        .unwrap();

    engine.run_order_pass().await.unwrap();
    assert!(alert_repo.find_open("904", &alert_type).await.unwrap().is_some());
}

#[tokio::test]
async fn test_acknowledged_alert_still_escalates_and_resolves() {
    let db = setup_test_db().await;
    seed_threshold(&db, OrderState::Issue, 24, 72, 168).await;

    let engine = ThresholdAlertEngine::new(&db);
    let alert_repo = AlertRepository::new(&db);
    let alert_type = AlertType::OrderStalled(OrderState::Issue);

    let order = insert_tracked_order(&db, "905", OrderState::Issue, 30).await;
    engine.run_order_pass().await.unwrap();

    let alert = alert_repo.find_open("905", &alert_type).await.unwrap().unwrap();
    let alert = alert_repo.acknowledge(alert).await.unwrap();
    assert_eq!(alert.status, AlertStatus::Lido.as_str());

    // Lido is not immune: it escalates in place and resolves when the
    // condition clears.
    let order = backdate_status_entered_at(&db, order, 100).await;
    engine.run_order_pass().await.unwrap();
    let escalated = alert_repo.find_open("905", &alert_type).await.unwrap().unwrap();
    assert_eq!(escalated.severity, Severity::Red.as_str());
    assert_eq!(escalated.status, AlertStatus::Lido.as_str());

    backdate_status_entered_at(&db, order, 1).await;
    engine.run_order_pass().await.unwrap();
    assert!(alert_repo.find_open("905", &alert_type).await.unwrap().is_none());
}

#[tokio::test]
async fn test_stock_pass_creates_and_resolves_typed_alerts() {
    let db = setup_test_db().await;
    let stock_repo = StockItemRepository::new(&db);
    let alert_repo = AlertRepository::new(&db);
    let engine = ThresholdAlertEngine::new(&db);

    stock_repo.upsert("SKU-1", "Caneca", 0, 5).await.unwrap();
    stock_repo.upsert("SKU-2", "Camiseta", 3, 5).await.unwrap();
    stock_repo.upsert("SKU-3", "Adesivo", -2, 5).await.unwrap();
    stock_repo.upsert("SKU-4", "Poster", 50, 5).await.unwrap();

    engine.run_stock_pass().await.unwrap();

    let zero = alert_repo
        .find_open("SKU-1", &AlertType::EstoqueZero)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(zero.severity, Severity::Red.as_str());

    let low = alert_repo
        .find_open("SKU-2", &AlertType::EstoqueBaixo)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(low.severity, Severity::Yellow.as_str());

    let negative = alert_repo
        .find_open("SKU-3", &AlertType::EstoqueNegativo)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(negative.severity, Severity::Critical.as_str());

    assert!(
        alert_repo
            .list_open_for_entity("SKU-4")
            .await
            .unwrap()
            .is_empty()
    );

    // Replenishment resolves with the system-generated note.
    stock_repo.set_quantity("SKU-1", 12).await.unwrap();
    engine.run_stock_pass().await.unwrap();

    assert!(
        alert_repo
            .find_open("SKU-1", &AlertType::EstoqueZero)
            .await
            .unwrap()
            .is_none()
    );

    let resolved = alert_repo
        .list(AlertFilter {
            entity_ref: Some("SKU-1".to_string()),
            status: Some(AlertStatus::Resolvido),
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(
        resolved[0].resolution_note.as_deref(),
        Some("Estoque atual: 12 unidades")
    );
}

#[tokio::test]
async fn test_stock_pass_is_idempotent() {
    let db = setup_test_db().await;
    let stock_repo = StockItemRepository::new(&db);
    let engine = ThresholdAlertEngine::new(&db);

    stock_repo.upsert("SKU-9", "Caneca", 0, 5).await.unwrap();

    let first = engine.run_stock_pass().await.unwrap();
    assert_eq!(first.created, 1);

    let second = engine.run_stock_pass().await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.escalated, 0);
    assert_eq!(second.resolved, 0);

    let alert_repo = AlertRepository::new(&db);
    assert_eq!(alert_repo.count_open().await.unwrap(), 1);
}

#[tokio::test]
async fn test_stock_condition_shift_swaps_alert_type() {
    let db = setup_test_db().await;
    let stock_repo = StockItemRepository::new(&db);
    let alert_repo = AlertRepository::new(&db);
    let engine = ThresholdAlertEngine::new(&db);

    stock_repo.upsert("SKU-7", "Caneca", 3, 5).await.unwrap();
    engine.run_stock_pass().await.unwrap();
    assert!(
        alert_repo
            .find_open("SKU-7", &AlertType::EstoqueBaixo)
            .await
            .unwrap()
            .is_some()
    );

    // Quantity hits zero: the low alert resolves, a zero alert opens.
    stock_repo.set_quantity("SKU-7", 0).await.unwrap();
    engine.run_stock_pass().await.unwrap();

    assert!(
        alert_repo
            .find_open("SKU-7", &AlertType::EstoqueBaixo)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        alert_repo
            .find_open("SKU-7", &AlertType::EstoqueZero)
            .await
            .unwrap()
            .is_some()
    );
}
