//! Provider diagnostics
//!
//! Reports which provider keys are configured without exposing them.

use axum::{extract::State, Json};
use std::sync::Arc;

use raidclaim_vision::ProviderId;

use crate::dto::{ProviderStatus, ProvidersResponse};
use crate::state::AppState;

pub async fn list_providers(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    let config = state.gateway.config();

    let providers = ProviderId::ALL
        .into_iter()
        .map(|id| ProviderStatus {
            id,
            name: id.display_name().to_string(),
            model: config
                .settings(id)
                .map(|s| s.model.clone())
                .unwrap_or_default(),
            api_key: if config.credential(id).is_some() {
                "Present"
            } else {
                "Missing"
            }
            .to_string(),
        })
        .collect();

    Json(ProvidersResponse {
        providers,
        chains: config.chains.clone(),
    })
}
