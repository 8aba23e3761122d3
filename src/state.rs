use std::sync::Arc;

use crate::auth::{AuthError, TokenService};
use crate::config::AppConfig;
use crate::database::BattleStore;

/// Shared by every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BattleStore>,
    pub tokens: TokenService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn BattleStore>, config: AppConfig) -> Result<Self, AuthError> {
        let tokens = TokenService::from_config(&config.security)?;
        Ok(Self {
            store,
            tokens,
            config: Arc::new(config),
        })
    }
}
