use std::sync::Arc;

use pagemill_core::{Config, TaskStore};
use pagemill_extract::Extractor;

use crate::rate_limit::ClientRateLimiter;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: TaskStore,
    pub extractor: Arc<Extractor>,
    pub rate_limiter: ClientRateLimiter,
}
