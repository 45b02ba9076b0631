use std::sync::Arc;

use crate::coaching::store::SessionStore;
use crate::config::Config;
use crate::llm_client::CompletionBackend;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Completion backend. `LlmClient` in production.
    pub llm: Arc<dyn CompletionBackend>,
    pub sessions: SessionStore,
    pub config: Config,
}
