//! Default (SSO) connection.
//!
//! The token itself comes from an external provider; this connection
//! only trades it for an API session.

use super::{require_session, session_headers, Connection, LiveSession};
use crate::error::{VmwareError, VmwareResult};
use crate::types::{ConnectionConfig, ConnectionKind, ServiceContent};
use crate::vsphere::{VimPort, VsphereClient};

use std::collections::HashMap;
use std::sync::Arc;

/// Source of SSO tokens for a given endpoint and principal.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self, config: &ConnectionConfig) -> VmwareResult<String>;
}

/// Hands out a token issued ahead of time.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn acquire_token(&self, _config: &ConnectionConfig) -> VmwareResult<String> {
        if self.token.trim().is_empty() {
            return Err(VmwareError::auth("No SSO token available"));
        }
        Ok(self.token.clone())
    }
}

/// Token-authenticated connection to a vCenter server.
pub struct SsoConnection {
    config: ConnectionConfig,
    tokens: Arc<dyn TokenProvider>,
    session: Option<LiveSession>,
}

impl SsoConnection {
    pub fn new(config: ConnectionConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { config, tokens, session: None }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Connection for SsoConnection {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::Sso
    }

    fn url(&self) -> &str {
        &self.config.url
    }

    fn username(&self) -> &str {
        &self.config.username
    }

    fn password(&self) -> &str {
        &self.config.password
    }

    async fn connect(&mut self) -> VmwareResult<()> {
        if self.session.is_some() {
            return Ok(());
        }
        let token = self.tokens.acquire_token(&self.config).await?;
        let client = VsphereClient::new(&self.config)?;
        client.login_with_token(&token).await?;
        self.session = Some(LiveSession::establish(client).await?);
        log::debug!("SSO session opened for {}@{}", self.config.username, self.config.url);
        Ok(())
    }

    async fn disconnect(&mut self) -> VmwareResult<()> {
        match self.session.take() {
            Some(session) => session.port.logout().await,
            None => Ok(()),
        }
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn headers(&self) -> HashMap<String, String> {
        session_headers(&self.session)
    }

    fn vim_port(&self) -> VmwareResult<VimPort> {
        Ok(Arc::clone(&require_session(&self.session)?.port))
    }

    fn service_content(&self) -> VmwareResult<ServiceContent> {
        Ok(require_session(&self.session)?.service_content.clone())
    }
}
