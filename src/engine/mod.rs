//! # Sync & Alerting Engine
//!
//! The reconciler upserts fetched marketplace records into the local
//! mirror and detects state transitions; the threshold alert engine
//! converges the alert ledger against current entity state. Both are
//! idempotent: re-running either on unchanged input is a no-op.

pub mod alerts;
pub mod reconciler;
pub mod state;

pub use alerts::{AlertCommand, PassOutcome, ThresholdAlertEngine, decide, order_tier};
pub use reconciler::{ReconcileOutcome, Reconciler};
