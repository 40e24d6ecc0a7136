use std::sync::Arc;
use crate::errors::AppError;
use crate::global_session_manager::GlobalSessionManager;
use crate::services::llm_service::ChatModel;

#[derive(Clone)]
pub struct AppState {
    /// `None` when no API key could be loaded at startup.
    pub model: Option<Arc<dyn ChatModel>>,
    pub session_manager: GlobalSessionManager,
    pub max_exchanges: usize,
}

impl AppState {
    pub fn new(model: Option<Arc<dyn ChatModel>>, max_exchanges: usize) -> Self {
        AppState {
            model,
            session_manager: GlobalSessionManager::new(),
            max_exchanges,
        }
    }

    pub fn model(&self) -> Result<Arc<dyn ChatModel>, AppError> {
        self.model.clone().ok_or(AppError::MissingApiKey)
    }
}
