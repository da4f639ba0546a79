//! Credential-only connection (no SSO), used for direct host access.

use super::{require_session, session_headers, Connection, LiveSession};
use crate::error::VmwareResult;
use crate::types::{ConnectionConfig, ConnectionKind, ServiceContent};
use crate::vsphere::{VimPort, VsphereClient};

use std::collections::HashMap;
use std::sync::Arc;

/// Authenticates with URL, username and password only.
#[derive(Default)]
pub struct BasicConnection {
    config: ConnectionConfig,
    session: Option<LiveSession>,
}

impl BasicConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: ConnectionConfig) -> Self {
        Self { config, session: None }
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.config.url = url.into();
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.config.username = username.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.config.password = password.into();
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Connection for BasicConnection {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::Basic
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
            log::debug!("Basic connection to {} already open", self.config.url);
            return Ok(());
        }
        let client = VsphereClient::new(&self.config)?;
        client.login_basic().await?;
        self.session = Some(LiveSession::establish(client).await?);
        log::debug!("Basic session opened for {}@{}", self.config.username, self.config.url);
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
