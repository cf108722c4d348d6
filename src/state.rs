use std::sync::Arc;

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionStore>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: Pipeline) -> Self {
        let sessions = Arc::new(SessionStore::new(config.history.max_entries));
        Self {
            config: Arc::new(config),
            sessions,
            pipeline: Arc::new(pipeline),
        }
    }
}
