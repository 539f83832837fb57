use focus_analytics::FocusService;
use focus_core::config::AppConfig;
use focus_core::store::SessionStore;
use std::sync::Arc;

/// Shared application state for the server.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub service: Arc<FocusService>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        let service = FocusService::new(store, &config.analytics)?;

        Ok(Self {
            config,
            service: Arc::new(service),
        })
    }
}
