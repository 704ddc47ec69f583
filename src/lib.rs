//! # Vigia Library
//!
//! Core functionality for the Vigia service: marketplace order
//! synchronization, time-in-state tracking, and threshold-based alerting.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod marketplace;
pub mod models;
pub mod orchestrator;
pub mod queue;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub use migration;
