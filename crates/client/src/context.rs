//! Application wiring: config → token store → session → guard.

use std::sync::Arc;

use thiserror::Error;

use labtrack_auth::Identity;
use labtrack_core::{ClientConfig, ConfigError};
use labtrack_router::{Decision, GuardError, Resolution, RouteGuard};
use labtrack_session::{FileTokenStore, SessionState, TokenStore};

use crate::api::ApiClient;
use crate::flow::LoginFlow;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything a screen needs, built once at startup.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: ClientConfig,
    pub session: Arc<SessionState>,
    pub guard: RouteGuard,
    pub api: ApiClient,
}

impl AppContext {
    /// Build the context over the file-backed store and restore the previous session.
    pub fn bootstrap(config: ClientConfig) -> Result<Self, BootstrapError> {
        let dir = config.resolve_data_dir()?;
        let store = Arc::new(FileTokenStore::new(dir, config.token_key.clone()));
        Ok(Self::with_store(config, store))
    }

    /// Build the context over an arbitrary store and restore the previous session.
    pub fn with_store(config: ClientConfig, store: Arc<dyn TokenStore>) -> Self {
        let session = Arc::new(SessionState::new(store.clone()).with_expiry_policy(config.expiry));
        session.rehydrate();

        let api = ApiClient::new(config.api_url.clone(), store);

        Self {
            config,
            session,
            guard: RouteGuard::default(),
            api,
        }
    }

    pub fn login_flow(&self) -> LoginFlow {
        LoginFlow::new(self.api.clone(), self.session.clone())
    }

    pub fn identity(&self) -> Option<Identity> {
        self.session.identity()
    }

    /// Guard decision for `path` against the current session.
    pub fn evaluate(&self, path: &str) -> Decision {
        self.guard.evaluate(self.identity().as_ref(), path)
    }

    /// Follow redirects for `path` against the current session.
    pub fn navigate(&self, path: &str) -> Result<Resolution, GuardError> {
        self.guard.navigate(self.identity().as_ref(), path)
    }
}
