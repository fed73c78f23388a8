//! services/portal/src/lib.rs
//!
//! This library crate contains the storage adapters, the application services
//! and the configuration of the DocuHub portal.

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod telemetry;
