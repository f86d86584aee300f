use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::Store;
use crate::mail::Mailer;

/// Everything a request handler needs, built once by the entry point and
/// cloned into each request by axum.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Store,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store, mailer: Arc<dyn Mailer>) -> Self {
        let tokens = TokenService::new(&config.security);
        Self {
            config: Arc::new(config),
            store,
            tokens,
            mailer,
        }
    }

    /// Error bodies carry internal detail only outside production.
    pub fn expose_error_detail(&self) -> bool {
        !self.config.is_production()
    }
}
