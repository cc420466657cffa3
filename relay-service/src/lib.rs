pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use services::{OriginPolicy, TextProvider};
use std::sync::Arc;

/// Shared application state. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub origin_policy: Arc<OriginPolicy>,
    pub text_provider: Arc<dyn TextProvider>,
}

impl AppState {
    pub fn new(
        service_name: impl Into<String>,
        origin_policy: OriginPolicy,
        text_provider: Arc<dyn TextProvider>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            origin_policy: Arc::new(origin_policy),
            text_provider,
        }
    }
}
