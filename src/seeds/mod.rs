//! # Seed Data
//!
//! Idempotent seeding of default configuration rows.

pub mod thresholds;

pub use thresholds::seed_default_thresholds;
