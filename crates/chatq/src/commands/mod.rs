use async_trait::async_trait;
use eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Error;
use chatq_core::api::HttpBackend;
use chatq_core::app::Conversation;
use chatq_core::config::ClientConfig;
use chatq_core::session::{AUTH_TOKEN_KEY, FileSessionStore, SessionStore};

pub mod ask;
pub mod chat;
pub mod config;
pub mod history;
pub mod render;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Everything a command needs to reach the backend.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub config: ClientConfig,
    pub session_file: Option<PathBuf>,
}

impl ClientContext {
    pub fn new(config: ClientConfig, session_file: Option<PathBuf>) -> Self {
        Self {
            config,
            session_file,
        }
    }

    pub fn session_store(&self) -> std::result::Result<Arc<FileSessionStore>, Error> {
        let store = match &self.session_file {
            Some(path) => FileSessionStore::new(path),
            None => FileSessionStore::default_location()?,
        };
        debug!(path = %store.path().display(), "Using session file");
        Ok(Arc::new(store))
    }

    /// A conversation with nothing restored yet.
    pub async fn conversation(&self) -> std::result::Result<Conversation, Error> {
        let store = self.session_store()?;

        let auth_token = match store.get(AUTH_TOKEN_KEY).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read stored auth token");
                None
            }
        };
        let backend = HttpBackend::new(&self.config)?.with_auth_token(auth_token);
        debug!(base_url = %backend.base_url(), tenant_id = %self.config.tenant_id, "Backend configured");

        Ok(Conversation::new(Arc::new(backend), store)
            .with_user_email(self.config.user_email.clone()))
    }
}
