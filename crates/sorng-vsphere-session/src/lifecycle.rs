//! Session lifecycle for connected samples.
//!
//! `SessionLifecycle` owns exactly one [`Connection`] and the handles
//! derived from it once it is live. The sample runner calls
//! [`SessionLifecycle::connect`] before the sample's action and
//! [`SessionLifecycle::disconnect`] after it.
//!
//! ```text
//! Unconfigured ──set_connection──▶ Configured ──connect──▶ Connected ──disconnect──▶ Disconnected
//!                                       │
//!                                       └──connect fails──▶ Failed
//! ```

use crate::connection::{BasicConnection, Connection, SsoConnection, StaticTokenProvider};
use crate::error::{VmwareError, VmwareResult};
use crate::helpers::{GetMoref, WaitForValues};
use crate::types::*;
use crate::vsphere::VimPort;

use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Handles derived from a live connection.
///
/// Only meaningful between a successful `connect` and the following
/// `disconnect`. A failed `disconnect` clears `wait_for_values` and
/// leaves the rest untouched.
#[derive(Clone, Default)]
pub struct SessionContext {
    pub vim_port: Option<VimPort>,
    pub service_content: Option<ServiceContent>,
    pub root_ref: Option<ManagedObjectReference>,
    pub headers: HashMap<String, String>,
    pub wait_for_values: Option<WaitForValues>,
    pub get_morefs: Option<GetMoref>,
}

impl SessionContext {
    fn from_connection(conn: &dyn Connection) -> VmwareResult<Self> {
        let vim_port = conn.vim_port()?;
        let service_content = conn.service_content()?;
        Ok(Self {
            wait_for_values: Some(WaitForValues::new(Arc::clone(&vim_port))),
            get_morefs: Some(GetMoref::new(Arc::clone(&vim_port))),
            headers: conn.headers(),
            root_ref: Some(service_content.root_folder.clone()),
            service_content: Some(service_content),
            vim_port: Some(vim_port),
        })
    }
}

/// Owns one connection and the session handles derived from it.
#[derive(Default)]
pub struct SessionLifecycle {
    connection: Option<Box<dyn Connection>>,
    // By default assume we are talking to a vCenter
    host_connection: bool,
    state: LifecycleState,
    context: SessionContext,
    connected_at: Option<String>,
}

impl SessionLifecycle {
    /// Create an unconfigured lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `config` and inject the matching connection variant.
    ///
    /// Basic mode injects a `BasicConnection` built from the full config
    /// so TLS and timeout settings survive; the host-connection flag is
    /// left off because nothing needs re-deriving.
    pub fn from_config(config: &SessionConfig) -> VmwareResult<Self> {
        config.validate()?;
        let mut lifecycle = Self::new();
        if config.basic_connection {
            lifecycle.set_connection(Box::new(BasicConnection::from_config(
                config.connection.clone(),
            )));
        } else {
            let token = config.sso_token.clone().unwrap_or_default();
            lifecycle.set_connection(Box::new(SsoConnection::new(
                config.connection.clone(),
                Arc::new(StaticTokenProvider::new(token)),
            )));
        }
        Ok(lifecycle)
    }

    /// Builder form of [`set_connection`](Self::set_connection).
    pub fn with_connection(mut self, conn: Box<dyn Connection>) -> Self {
        self.set_connection(conn);
        self
    }

    // ── Configuration ───────────────────────────────────────────────

    /// Turn off SSO; the next `connect` re-derives a basic connection.
    pub fn set_host_connection(&mut self, value: bool) {
        self.host_connection = value;
    }

    pub fn host_connection(&self) -> bool {
        self.host_connection
    }

    /// Inject the connection to use, replacing any previous one.
    pub fn set_connection(&mut self, conn: Box<dyn Connection>) {
        self.connection = Some(conn);
        self.context = SessionContext::default();
        self.connected_at = None;
        self.state = LifecycleState::Configured;
    }

    // ── Lifecycle hooks ─────────────────────────────────────────────

    /// Before-hook: open the session and populate the context.
    ///
    /// On failure the state becomes `Failed` and the error is returned;
    /// the caller decides whether that ends the process. Calling it on a
    /// live session returns that session unchanged.
    pub async fn connect(&mut self) -> VmwareResult<&dyn Connection> {
        if self.is_connected() {
            log::debug!("Already connected, keeping the current session");
            return self.connection();
        }

        let current = self.connection.take().ok_or_else(|| {
            VmwareError::not_configured("No connection injected. Call set_connection first.")
        })?;

        let mut conn: Box<dyn Connection> = if self.host_connection {
            log::debug!("Host connection requested, using basic auth for {}", current.url());
            Box::new(Self::basic_connection_from_connection(current.as_ref()))
        } else {
            current
        };

        let result = match conn.connect().await {
            Ok(()) => SessionContext::from_connection(conn.as_ref()),
            Err(e) => Err(e),
        };

        match result {
            Ok(context) => {
                log::info!(
                    "Connected to {} as {} ({:?})",
                    conn.url(),
                    conn.username(),
                    conn.kind()
                );
                self.context = context;
                self.connected_at = Some(chrono::Utc::now().to_rfc3339());
                self.state = LifecycleState::Connected;
            }
            Err(e) => {
                if conn.is_connected() {
                    if let Err(cleanup) = conn.disconnect().await {
                        log::warn!("Cleanup after failed connect also failed: {}", cleanup);
                    }
                }
                log::error!("Connecting to {} failed: {}", conn.url(), e);
                log::error!("No valid connection available.");
                self.connection = Some(conn);
                self.context = SessionContext::default();
                self.state = LifecycleState::Failed;
                return Err(e);
            }
        }

        self.connection = Some(conn);
        self.connection()
    }

    /// Build a basic connection carrying only the URL, username and
    /// password of `original`.
    pub fn basic_connection_from_connection(original: &dyn Connection) -> BasicConnection {
        let mut connection = BasicConnection::new();
        connection.set_url(original.url());
        connection.set_username(original.username());
        connection.set_password(original.password());
        connection
    }

    /// After-hook: close the session.
    ///
    /// The wait helper is dropped before the disconnect attempt. Any
    /// error or panic from the connection comes back as a
    /// `ConnectionError`; the instance is unusable afterwards.
    pub async fn disconnect(&mut self) -> VmwareResult<&dyn Connection> {
        self.context.wait_for_values = None;

        let conn = self.connection.as_mut().ok_or_else(|| {
            VmwareError::not_configured("No connection injected. Nothing to disconnect.")
        })?;

        match AssertUnwindSafe(conn.disconnect()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::error!("Disconnect failed: {}", e);
                return Err(VmwareError::wrap_connection(e));
            }
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                log::error!("Disconnect panicked: {}", msg);
                return Err(VmwareError::wrap_connection(format!("panic: {msg}")));
            }
        }

        log::info!("Disconnected from {}", conn.url());
        self.context = SessionContext::default();
        self.connected_at = None;
        self.state = LifecycleState::Disconnected;
        self.connection()
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LifecycleState::Connected
            && self.connection.as_ref().map_or(false, |c| c.is_connected())
    }

    /// The injected (or derived) connection.
    pub fn connection(&self) -> VmwareResult<&dyn Connection> {
        self.connection
            .as_deref()
            .ok_or_else(|| VmwareError::not_configured("No connection injected"))
    }

    /// Reference to the service instance, straight from the connection.
    pub fn service_instance_reference(&self) -> VmwareResult<ManagedObjectReference> {
        Ok(self.connection()?.service_instance_reference())
    }

    /// Raw context, including stale handles after a failed disconnect.
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn vim_port(&self) -> VmwareResult<&VimPort> {
        self.handle("vim port", |c| c.vim_port.as_ref())
    }

    pub fn service_content(&self) -> VmwareResult<&ServiceContent> {
        self.handle("service content", |c| c.service_content.as_ref())
    }

    pub fn root_ref(&self) -> VmwareResult<&ManagedObjectReference> {
        self.handle("root folder", |c| c.root_ref.as_ref())
    }

    pub fn headers(&self) -> VmwareResult<&HashMap<String, String>> {
        self.handle("headers", |c| Some(&c.headers))
    }

    pub fn wait_for_values(&self) -> VmwareResult<&WaitForValues> {
        self.handle("wait helper", |c| c.wait_for_values.as_ref())
    }

    pub fn get_morefs(&self) -> VmwareResult<&GetMoref> {
        self.handle("inventory helper", |c| c.get_morefs.as_ref())
    }

    /// Summary of the live session.
    pub fn session_info(&self) -> Option<SessionInfo> {
        let conn = self.connection.as_ref().filter(|_| self.state == LifecycleState::Connected)?;
        Some(SessionInfo {
            url: conn.url().to_string(),
            username: conn.username().to_string(),
            kind: conn.kind(),
            connected_at: self.connected_at.clone().unwrap_or_default(),
        })
    }

    fn handle<'a, T>(
        &'a self,
        what: &str,
        pick: impl FnOnce(&'a SessionContext) -> Option<&'a T>,
    ) -> VmwareResult<&'a T> {
        if self.state != LifecycleState::Connected {
            return Err(VmwareError::connection(format!(
                "No {what}: session is {:?}, call connect first",
                self.state
            )));
        }
        pick(&self.context)
            .ok_or_else(|| VmwareError::connection(format!("No {what} on this session")))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
