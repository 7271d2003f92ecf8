//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::registry::AccountRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AccountRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<AccountRegistry>) -> Self {
        Self { registry }
    }
}

impl FromRef<AppState> for Arc<AccountRegistry> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}
