//! Connection abstraction: how to reach and authenticate to an endpoint.
//!
//! Two production variants exist. [`SsoConnection`] is the default and
//! authenticates with a token obtained from a [`TokenProvider`];
//! [`BasicConnection`] sends plain credentials and is what direct
//! ESX/ESXi host connections use. [`SimulatedConnection`] keeps
//! everything in memory for tests and offline demos.

mod basic;
mod simulated;
mod sso;

pub use basic::BasicConnection;
pub use simulated::{SimulatedConnection, SimulatedFailure, SimulatedProbe};
pub use sso::{SsoConnection, StaticTokenProvider, TokenProvider};

use crate::error::{VmwareError, VmwareResult};
use crate::types::{ConnectionKind, ManagedObjectReference, ServiceContent};
use crate::vsphere::{VimPort, VsphereClient};

use std::collections::HashMap;
use std::sync::Arc;

/// Managed object type and value of the service instance singleton.
pub const SVC_INST_NAME: &str = "ServiceInstance";

/// Capability shared by every connection variant.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    fn kind(&self) -> ConnectionKind;

    fn url(&self) -> &str;

    fn username(&self) -> &str;

    fn password(&self) -> &str;

    /// Authenticate and open a session.
    async fn connect(&mut self) -> VmwareResult<()>;

    /// Close the session. A never-connected connection returns `Ok`.
    async fn disconnect(&mut self) -> VmwareResult<()>;

    fn is_connected(&self) -> bool;

    /// Headers identifying the session; empty when disconnected.
    fn headers(&self) -> HashMap<String, String>;

    /// Transport handle for the live session.
    fn vim_port(&self) -> VmwareResult<VimPort>;

    /// Service metadata retrieved at connect time.
    fn service_content(&self) -> VmwareResult<ServiceContent>;

    /// Reference to the service instance itself.
    fn service_instance_reference(&self) -> ManagedObjectReference {
        ManagedObjectReference::new(SVC_INST_NAME, SVC_INST_NAME)
    }
}

/// Session state held by a connected variant.
pub(crate) struct LiveSession {
    pub(crate) port: VimPort,
    pub(crate) service_content: ServiceContent,
}

impl LiveSession {
    /// Finish a login by reading service metadata; logs out again if
    /// that fails so no half-open session is left behind.
    pub(crate) async fn establish(client: VsphereClient) -> VmwareResult<Self> {
        match client.retrieve_service_content().await {
            Ok(service_content) => Ok(Self {
                port: Arc::new(client),
                service_content,
            }),
            Err(e) => {
                if let Err(logout_err) = client.logout().await {
                    log::warn!("Logout after failed metadata fetch also failed: {}", logout_err);
                }
                Err(e)
            }
        }
    }
}

pub(crate) fn require_session(session: &Option<LiveSession>) -> VmwareResult<&LiveSession> {
    session
        .as_ref()
        .ok_or_else(|| VmwareError::connection("Not connected. Call connect first."))
}

pub(crate) fn session_headers(session: &Option<LiveSession>) -> HashMap<String, String> {
    session
        .as_ref()
        .map(|s| s.port.session_headers())
        .unwrap_or_default()
}
