//! vSphere REST API HTTP client with session-based authentication.
//!
//! Communicates with vCenter / ESXi via `https://{host}/api/...`.
//! Owns the session id and hands it out as the `vmware-api-session-id`
//! header; this is the "vim port" every session handle is built on.

use crate::error::{VmwareError, VmwareErrorKind, VmwareResult};
use crate::types::{AboutInfo, ApiType, ApplianceVersion, ConnectionConfig, ServiceContent, SystemTime};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Header carrying the session id on every authenticated request.
pub const SESSION_HEADER: &str = "vmware-api-session-id";

/// Shared handle to a logged-in client.
pub type VimPort = Arc<VsphereClient>;

/// vSphere REST API client.
pub struct VsphereClient {
    client: Client,
    base_url: String,
    session_id: RwLock<Option<String>>,
    config: ConnectionConfig,
}

impl VsphereClient {
    /// Build a new client from config (does NOT create a session yet).
    pub fn new(config: &ConnectionConfig) -> VmwareResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VmwareError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url_from(&config.url)?,
            session_id: RwLock::new(None),
            config: config.clone(),
        })
    }

    /// Build a client that already holds a session id.
    pub fn with_session(config: &ConnectionConfig, session_id: impl Into<String>) -> VmwareResult<Self> {
        let client = Self::new(config)?;
        client.set_session(Some(session_id.into()));
        Ok(client)
    }

    /// Base URL for API calls.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether we have an active session.
    pub fn is_connected(&self) -> bool {
        self.session_id().is_some()
    }

    /// Current session ID (if any).
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().ok().and_then(|sid| sid.clone())
    }

    /// Current config.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Headers to attach to requests made outside this client.
    pub fn session_headers(&self) -> HashMap<String, String> {
        self.session_id()
            .map(|sid| HashMap::from([(SESSION_HEADER.to_string(), sid)]))
            .unwrap_or_default()
    }

    fn set_session(&self, sid: Option<String>) {
        if let Ok(mut guard) = self.session_id.write() {
            *guard = sid;
        }
    }

    // ── Session management ──────────────────────────────────────────

    /// Create a session with plain credentials (POST /api/session).
    pub async fn login_basic(&self) -> VmwareResult<String> {
        let req = self
            .client
            .post(self.session_url())
            .basic_auth(&self.config.username, Some(&self.config.password));
        self.create_session(req).await
    }

    /// Create a session from an SSO bearer token (POST /api/session).
    pub async fn login_with_token(&self, token: &str) -> VmwareResult<String> {
        let req = self.client.post(self.session_url()).bearer_auth(token);
        self.create_session(req).await
    }

    async fn create_session(&self, req: RequestBuilder) -> VmwareResult<String> {
        let resp = req.send().await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(VmwareError::auth("Invalid credentials"));
        }

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VmwareError::api(status.as_u16(), format!("Login failed: {body}")));
        }

        // Session ID comes back as a quoted JSON string
        let session_id: String = resp.json().await.map_err(|e| {
            VmwareError::parse(format!("Failed to parse session response: {e}"))
        })?;

        self.set_session(Some(session_id.clone()));
        Ok(session_id)
    }

    /// Delete the current session (DELETE /api/session).
    ///
    /// The local session id is dropped even when the server call fails.
    pub async fn logout(&self) -> VmwareResult<()> {
        let Some(sid) = self.session_id() else {
            return Ok(());
        };
        self.set_session(None);

        let resp = self
            .client
            .delete(self.session_url())
            .header(SESSION_HEADER, sid)
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    /// Check if the session is still valid (GET /api/session).
    pub async fn check_session(&self) -> VmwareResult<bool> {
        let sid = self.require_session()?;
        let resp = self
            .client
            .get(self.session_url())
            .header(SESSION_HEADER, sid)
            .send()
            .await?;

        Ok(resp.status().is_success())
    }

    // ── Service metadata ────────────────────────────────────────────

    /// Discover what kind of endpoint we are talking to.
    ///
    /// Standalone hosts do not serve the appliance API, so a 404 marks
    /// the endpoint as a host agent.
    pub async fn retrieve_service_content(&self) -> VmwareResult<ServiceContent> {
        match self.get::<ApplianceVersion>("/api/appliance/system/version").await {
            Ok(v) => Ok(ServiceContent::virtual_center(AboutInfo {
                api_type: ApiType::VirtualCenter,
                full_name: v
                    .product
                    .clone()
                    .unwrap_or_else(|| "VMware vCenter Server".to_string()),
                version: v.version,
                build: v.build,
            })),
            Err(e) if e.kind == VmwareErrorKind::NotFound => {
                Ok(ServiceContent::host_agent(AboutInfo {
                    api_type: ApiType::HostAgent,
                    version: None,
                    build: None,
                    full_name: "VMware ESXi".to_string(),
                }))
            }
            Err(e) => Err(e),
        }
    }

    /// Server clock (GET /api/appliance/system/time).
    pub async fn current_time(&self) -> VmwareResult<SystemTime> {
        self.get("/api/appliance/system/time").await
    }

    // ── HTTP helpers ────────────────────────────────────────────────

    fn session_url(&self) -> String {
        format!("{}/api/session", self.base_url)
    }

    fn require_session(&self) -> VmwareResult<String> {
        self.session_id()
            .ok_or_else(|| VmwareError::auth("Not logged in — no active session"))
    }

    /// GET a JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> VmwareResult<T> {
        let sid = self.require_session()?;
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .header(SESSION_HEADER, sid)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Self::parse_response(resp).await
    }

    /// GET a JSON response with query params (borrowed).
    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> VmwareResult<T> {
        let sid = self.require_session()?;
        let url = format!("{}{}", self.base_url, path);
        let borrowed: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let resp = self
            .client
            .get(&url)
            .header(SESSION_HEADER, sid)
            .query(&borrowed)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Self::parse_response(resp).await
    }

    // ── Internal helpers ────────────────────────────────────────────

    async fn check_status(resp: Response) -> VmwareResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let code = status.as_u16();
        let body = resp.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => Err(VmwareError::auth(format!("Session expired or invalid: {body}"))),
            StatusCode::FORBIDDEN => Err(VmwareError::new(
                VmwareErrorKind::AccessDenied,
                format!("Access denied: {body}"),
            )),
            StatusCode::NOT_FOUND => Err(VmwareError::not_found(format!("Resource not found: {body}"))),
            _ => Err(VmwareError::api(code, format!("API error {code}: {body}"))),
        }
    }

    async fn parse_response<T: DeserializeOwned>(resp: Response) -> VmwareResult<T> {
        let text = resp.text().await.map_err(|e| {
            VmwareError::parse(format!("Failed to read response body: {e}"))
        })?;

        if text.is_empty() {
            // Some vSphere endpoints return empty body for success
            return serde_json::from_str("null").map_err(|e| {
                VmwareError::parse(format!("Cannot deserialise empty response: {e}"))
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            let cut = text.char_indices().nth(500).map_or(text.len(), |(i, _)| i);
            VmwareError::parse(format!("JSON parse error: {e} — body: {}", &text[..cut]))
        })
    }
}

/// `https://vc.lab/sdk` → `https://vc.lab`; explicit ports are kept.
fn base_url_from(raw: &str) -> VmwareResult<String> {
    let url = url::Url::parse(raw)?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| VmwareError::invalid_config(format!("URL '{raw}' has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> ConnectionConfig {
        ConnectionConfig::new(url, "administrator@vsphere.local", "secret")
    }

    #[test]
    fn base_url_strips_sdk_path() {
        assert_eq!(base_url_from("https://vc.lab/sdk").unwrap(), "https://vc.lab");
        assert_eq!(base_url_from("https://vc.lab:8443/sdk").unwrap(), "https://vc.lab:8443");
        assert_eq!(base_url_from("https://vc.lab:443/").unwrap(), "https://vc.lab");
    }

    #[test]
    fn base_url_rejects_garbage() {
        assert!(base_url_from("vc.lab").is_err());
    }

    #[test]
    fn new_client_has_no_session() {
        let client = VsphereClient::new(&config("https://vc.lab/sdk")).unwrap();
        assert!(!client.is_connected());
        assert!(client.session_headers().is_empty());
        assert_eq!(client.base_url(), "https://vc.lab");
    }

    #[test]
    fn primed_client_exposes_session_header() {
        let client = VsphereClient::with_session(&config("https://vc.lab"), "abc123").unwrap();
        assert!(client.is_connected());
        assert_eq!(
            client.session_headers().get(SESSION_HEADER).map(String::as_str),
            Some("abc123")
        );
    }

    #[tokio::test]
    async fn requests_without_session_fail_fast() {
        let client = VsphereClient::new(&config("https://vc.lab")).unwrap();
        let err = client.get::<serde_json::Value>("/api/vcenter/vm").await.unwrap_err();
        assert_eq!(err.kind, VmwareErrorKind::AuthenticationError);
        assert!(client.check_session().await.is_err());
    }

    #[tokio::test]
    async fn logout_without_session_is_noop() {
        let client = VsphereClient::new(&config("https://vc.lab")).unwrap();
        assert!(client.logout().await.is_ok());
    }
}
