//! Application state shared across handlers

use std::sync::Arc;

use raidclaim_vision::Gateway;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Extraction gateway, read-only after startup
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}
