//! Error types for the vSphere session crate.

use std::fmt;

/// Categorised error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmwareErrorKind {
    /// Endpoint unreachable, session missing, or teardown failed
    ConnectionError,
    /// Authentication failed (401) or SSO token unavailable
    AuthenticationError,
    /// Resource not found (404)
    NotFound,
    /// HTTP / API error with status code
    ApiError(u16),
    /// Timeout (HTTP or polling)
    Timeout,
    /// Permission denied (403)
    AccessDenied,
    /// Task failed on vCenter
    TaskError,
    /// JSON parse / deserialization error
    ParseError,
    /// No connection has been injected yet
    NotConfigured,
    /// Configuration rejected during validation
    InvalidConfig,
    /// Generic
    Other,
}

/// Crate error type carrying a kind + human-readable message.
#[derive(Debug, Clone)]
pub struct VmwareError {
    pub kind: VmwareErrorKind,
    pub message: String,
}

impl VmwareError {
    pub fn new(kind: VmwareErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::ConnectionError, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::AuthenticationError, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::NotFound, msg)
    }

    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::ApiError(status), msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::ParseError, msg)
    }

    pub fn task(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::TaskError, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::Timeout, msg)
    }

    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::NotConfigured, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::InvalidConfig, msg)
    }

    /// Wrap any teardown failure into a `ConnectionError`.
    pub fn wrap_connection(cause: impl fmt::Display) -> Self {
        Self::connection(format!("disconnect failed: {cause}"))
    }

    pub fn is_connection(&self) -> bool {
        self.kind == VmwareErrorKind::ConnectionError
    }
}

impl fmt::Display for VmwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for VmwareError {}

impl From<reqwest::Error> for VmwareError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("HTTP timeout: {e}"))
        } else if e.is_connect() {
            Self::connection(format!("Connection failed: {e}"))
        } else {
            Self::new(VmwareErrorKind::Other, format!("HTTP error: {e}"))
        }
    }
}

impl From<serde_json::Error> for VmwareError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {e}"))
    }
}

impl From<url::ParseError> for VmwareError {
    fn from(e: url::ParseError) -> Self {
        Self::invalid_config(format!("Invalid URL: {e}"))
    }
}

impl From<std::io::Error> for VmwareError {
    fn from(e: std::io::Error) -> Self {
        Self::new(VmwareErrorKind::Other, format!("I/O error: {e}"))
    }
}

/// Convenience alias.
pub type VmwareResult<T> = Result<T, VmwareError>;
