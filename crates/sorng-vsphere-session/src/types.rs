//! Shared types for vSphere session management.

use crate::error::{VmwareError, VmwareResult};

use serde::{Deserialize, Serialize};
use std::path::Path;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Connection / Config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where and how to reach a vCenter / ESXi endpoint.
///
/// Every field may be missing from a config file; `validate` rejects
/// what is still empty once command-line overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfig {
    /// Endpoint URL (e.g. "https://vcenter.lab.local/sdk")
    pub url: String,
    /// Username (e.g. "administrator@vsphere.local")
    pub username: String,
    /// Password
    pub password: String,
    /// Skip TLS certificate verification (self-signed labs)
    pub insecure: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            insecure: false,
            timeout_secs: 30,
        }
    }
}

impl ConnectionConfig {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Reject configs that can never produce a session.
    pub fn validate(&self) -> VmwareResult<()> {
        let parsed = url::Url::parse(&self.url)?;
        match parsed.scheme() {
            "https" | "http" => {}
            other => {
                return Err(VmwareError::invalid_config(format!(
                    "Unsupported URL scheme '{other}' (expected https)"
                )))
            }
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(VmwareError::invalid_config("URL has no host"));
        }
        if self.username.trim().is_empty() {
            return Err(VmwareError::invalid_config("Username must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(VmwareError::invalid_config("Timeout must be at least one second"));
        }
        Ok(())
    }
}

/// Everything a connected sample needs before its before-hook runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    /// Turn off SSO and authenticate with plain credentials (ESX/ESXi hosts).
    #[serde(default)]
    pub basic_connection: bool,
    /// Pre-issued SSO token for the default connection.
    #[serde(default)]
    pub sso_token: Option<String>,
}

impl SessionConfig {
    /// Load a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> VmwareResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn validate(&self) -> VmwareResult<()> {
        self.connection.validate()?;
        if !self.basic_connection && self.sso_token.as_deref().map_or(true, str::is_empty) {
            return Err(VmwareError::invalid_config(
                "An SSO token is required unless basic connection is enabled",
            ));
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Connection kinds / lifecycle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// Token-based (SSO) connection, the default for vCenter.
    Sso,
    /// Username / password only, used for direct host connections.
    Basic,
    /// In-memory connection for tests and offline demos.
    Simulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Unconfigured,
    Configured,
    Connected,
    Disconnected,
    Failed,
}

impl Default for LifecycleState {
    fn default() -> Self { Self::Unconfigured }
}

/// Tracks an active vSphere API session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub url: String,
    pub username: String,
    pub kind: ConnectionKind,
    pub connected_at: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Managed objects / service content
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reference to a server-side managed object (e.g. `Folder:group-d1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedObjectReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self { kind: kind.into(), value: value.into() }
    }
}

impl std::fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiType {
    VirtualCenter,
    HostAgent,
}

/// Product information for the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    pub api_type: ApiType,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub build: Option<String>,
    pub full_name: String,
}

/// Well-known service singletons plus the inventory root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    pub about: AboutInfo,
    pub root_folder: ManagedObjectReference,
    pub property_collector: ManagedObjectReference,
    pub view_manager: ManagedObjectReference,
    pub session_manager: ManagedObjectReference,
}

impl ServiceContent {
    /// Service content of a vCenter server.
    pub fn virtual_center(about: AboutInfo) -> Self {
        Self {
            about,
            root_folder: ManagedObjectReference::new("Folder", "group-d1"),
            property_collector: ManagedObjectReference::new("PropertyCollector", "propertyCollector"),
            view_manager: ManagedObjectReference::new("ViewManager", "ViewManager"),
            session_manager: ManagedObjectReference::new("SessionManager", "SessionManager"),
        }
    }

    /// Service content of a standalone ESX/ESXi host.
    pub fn host_agent(about: AboutInfo) -> Self {
        Self {
            about,
            root_folder: ManagedObjectReference::new("Folder", "ha-folder-root"),
            property_collector: ManagedObjectReference::new("PropertyCollector", "ha-property-collector"),
            view_manager: ManagedObjectReference::new("ViewManager", "ViewManager"),
            session_manager: ManagedObjectReference::new("SessionManager", "ha-sessionmgr"),
        }
    }
}

/// `GET /api/appliance/system/version` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplianceVersion {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub build: Option<String>,
}

/// `GET /api/appliance/system/time` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemTime {
    pub date: String,
    pub time: String,
    pub seconds_since_epoch: f64,
    pub timezone: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Inventory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Inventory object types the property-fetch helper can list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryKind {
    Folder,
    Datacenter,
    ClusterComputeResource,
    HostSystem,
    VirtualMachine,
    Datastore,
    Network,
    ResourcePool,
}

impl InventoryKind {
    /// REST list endpoint for this type.
    pub fn list_path(self) -> &'static str {
        match self {
            Self::Folder => "/api/vcenter/folder",
            Self::Datacenter => "/api/vcenter/datacenter",
            Self::ClusterComputeResource => "/api/vcenter/cluster",
            Self::HostSystem => "/api/vcenter/host",
            Self::VirtualMachine => "/api/vcenter/vm",
            Self::Datastore => "/api/vcenter/datastore",
            Self::Network => "/api/vcenter/network",
            Self::ResourcePool => "/api/vcenter/resource-pool",
        }
    }

    /// JSON field carrying the object identifier in list responses.
    pub fn id_field(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Datacenter => "datacenter",
            Self::ClusterComputeResource => "cluster",
            Self::HostSystem => "host",
            Self::VirtualMachine => "vm",
            Self::Datastore => "datastore",
            Self::Network => "network",
            Self::ResourcePool => "resource_pool",
        }
    }

    /// Managed object type name.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Folder => "Folder",
            Self::Datacenter => "Datacenter",
            Self::ClusterComputeResource => "ClusterComputeResource",
            Self::HostSystem => "HostSystem",
            Self::VirtualMachine => "VirtualMachine",
            Self::Datastore => "Datastore",
            Self::Network => "Network",
            Self::ResourcePool => "ResourcePool",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VmwareErrorKind;
    use std::io::Write;

    #[test]
    fn connection_config_defaults() {
        let cfg: ConnectionConfig = serde_json::from_str(
            r#"{"url":"https://vc.lab/sdk","username":"root","password":"pw"}"#,
        )
        .unwrap();
        assert_eq!(cfg.timeout_secs, 30);
        assert!(!cfg.insecure);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_scheme_and_empty_user() {
        let cfg = ConnectionConfig::new("ftp://vc.lab", "root", "pw");
        assert_eq!(cfg.validate().unwrap_err().kind, VmwareErrorKind::InvalidConfig);

        let cfg = ConnectionConfig::new("https://vc.lab", "  ", "pw");
        assert_eq!(cfg.validate().unwrap_err().kind, VmwareErrorKind::InvalidConfig);
    }

    #[test]
    fn session_config_requires_token_without_basic() {
        let mut cfg = SessionConfig {
            connection: ConnectionConfig::new("https://vc.lab/sdk", "admin", "pw"),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        cfg.basic_connection = true;
        assert!(cfg.validate().is_ok());
        cfg.basic_connection = false;
        cfg.sso_token = Some("token".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn session_config_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"url":"https://esx01.lab","username":"root","password":"pw","basicConnection":true,"insecure":true}}"#
        )
        .unwrap();

        let cfg = SessionConfig::from_json_file(file.path()).unwrap();
        assert!(cfg.basic_connection);
        assert!(cfg.connection.insecure);
        assert_eq!(cfg.connection.url, "https://esx01.lab");
        assert_eq!(cfg.sso_token, None);
    }

    #[test]
    fn config_file_without_password_takes_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"url":"https://esx01.lab","username":"root","basicConnection":true}}"#
        )
        .unwrap();

        let mut cfg = SessionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(cfg.connection.password, "");
        assert_eq!(cfg.connection.timeout_secs, 30);

        cfg.connection.password = "from-flag".into();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.connection.password, "from-flag");
    }

    #[test]
    fn config_file_without_url_fails_validation_not_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"username":"root","basicConnection":true}}"#).unwrap();

        let cfg = SessionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(cfg.validate().unwrap_err().kind, VmwareErrorKind::InvalidConfig);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = SessionConfig::from_json_file("/nonexistent/session.json").unwrap_err();
        assert_eq!(err.kind, VmwareErrorKind::Other);
    }

    #[test]
    fn root_folder_differs_between_vcenter_and_host() {
        let about = AboutInfo {
            api_type: ApiType::HostAgent,
            version: None,
            build: None,
            full_name: "VMware ESXi".into(),
        };
        let host = ServiceContent::host_agent(about.clone());
        let vc = ServiceContent::virtual_center(about);
        assert_eq!(host.root_folder.value, "ha-folder-root");
        assert_eq!(vc.root_folder.to_string(), "Folder:group-d1");
    }
}
