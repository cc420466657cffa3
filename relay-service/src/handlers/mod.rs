//! HTTP handlers for the relay service.

pub mod cors;
pub mod generate;
pub mod health;
pub mod metrics;
