//! HTTP API gateway for forms and their questions.
//!
//! Authenticates each request, hands it to the form lifecycle service and
//! renders the outcome as a status code and JSON payload.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

use std::sync::Arc;

use forms_engine::{FormService, MemoryStore, RandomSlugProvider};

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use auth::TokenRegistry;
use config::GatewayConfig;
use routes::AppState;

/// Assemble an in-memory service stack from `config`, authenticating
/// against `registry`.
#[must_use]
pub fn build_state(config: &GatewayConfig, registry: Arc<TokenRegistry>) -> AppState {
    let forms = FormService::new(Arc::new(MemoryStore::new()), Arc::new(RandomSlugProvider::new()))
        .with_list_scope(config.list_scope);
    AppState::new(Arc::new(forms), registry)
}
