//! In-memory connection for unit tests and offline demos.
//!
//! No request ever leaves the process. A shared [`SimulatedProbe`] counts
//! calls and can be armed to make the next connect or disconnect fail.

use super::{require_session, session_headers, Connection, LiveSession};
use crate::error::{VmwareError, VmwareResult};
use crate::types::{AboutInfo, ApiType, ConnectionConfig, ConnectionKind, ServiceContent};
use crate::vsphere::{VimPort, VsphereClient};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How an armed step fails.
#[derive(Debug, Clone)]
pub enum SimulatedFailure {
    Error(VmwareError),
    Panic(String),
}

/// Shared observation / fault-injection point.
#[derive(Debug, Default)]
pub struct SimulatedProbe {
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    connect_failure: Mutex<Option<SimulatedFailure>>,
    disconnect_failure: Mutex<Option<SimulatedFailure>>,
}

impl SimulatedProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn fail_connect(&self, failure: SimulatedFailure) {
        if let Ok(mut slot) = self.connect_failure.lock() {
            *slot = Some(failure);
        }
    }

    pub fn fail_disconnect(&self, failure: SimulatedFailure) {
        if let Ok(mut slot) = self.disconnect_failure.lock() {
            *slot = Some(failure);
        }
    }

    fn take(slot: &Mutex<Option<SimulatedFailure>>) -> Option<SimulatedFailure> {
        slot.lock().ok().and_then(|mut s| s.take())
    }
}

fn trip(failure: Option<SimulatedFailure>) -> VmwareResult<()> {
    match failure {
        None => Ok(()),
        Some(SimulatedFailure::Error(e)) => Err(e),
        Some(SimulatedFailure::Panic(msg)) => panic!("{msg}"),
    }
}

pub struct SimulatedConnection {
    config: ConnectionConfig,
    probe: Arc<SimulatedProbe>,
    api_type: ApiType,
    session: Option<LiveSession>,
}

impl SimulatedConnection {
    /// Simulate a vCenter server.
    pub fn new(config: ConnectionConfig, probe: Arc<SimulatedProbe>) -> Self {
        Self {
            config,
            probe,
            api_type: ApiType::VirtualCenter,
            session: None,
        }
    }

    /// Simulate a standalone host instead of a vCenter server.
    pub fn as_host(mut self) -> Self {
        self.api_type = ApiType::HostAgent;
        self
    }

    pub fn probe(&self) -> &Arc<SimulatedProbe> {
        &self.probe
    }

    fn service_content_for(&self) -> ServiceContent {
        match self.api_type {
            ApiType::VirtualCenter => ServiceContent::virtual_center(AboutInfo {
                api_type: ApiType::VirtualCenter,
                version: Some("8.0.2".into()),
                build: Some("22385739".into()),
                full_name: "VMware vCenter Server (simulated)".into(),
            }),
            ApiType::HostAgent => ServiceContent::host_agent(AboutInfo {
                api_type: ApiType::HostAgent,
                version: Some("8.0.2".into()),
                build: Some("22380479".into()),
                full_name: "VMware ESXi (simulated)".into(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl Connection for SimulatedConnection {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::Simulated
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
        self.probe.connect_calls.fetch_add(1, Ordering::SeqCst);
        trip(SimulatedProbe::take(&self.probe.connect_failure))?;

        let sid = uuid::Uuid::new_v4().to_string();
        let client = VsphereClient::with_session(&self.config, sid)?;
        self.session = Some(LiveSession {
            port: Arc::new(client),
            service_content: self.service_content_for(),
        });
        Ok(())
    }

    async fn disconnect(&mut self) -> VmwareResult<()> {
        self.probe.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        trip(SimulatedProbe::take(&self.probe.disconnect_failure))?;
        self.session = None;
        Ok(())
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
