//! Cloudlift Core: source export parsing, identity mapping, reconciliation,
//! configuration, and migration reports.

pub mod config;
pub mod directory;
pub mod error;
pub mod export;
pub mod identity;
pub mod models;
pub mod reconcile;
pub mod report;
