//! # SortOfRemote NG – vSphere Session Lifecycle
//!
//! Opens, exposes and tears down an authenticated session to a vCenter
//! server or ESX/ESXi host around a short unit of work ("connected
//! sample").
//!
//! ## Modules
//!
//! - **types** — Config and managed-object value types
//! - **error** — Crate-specific error types
//! - **vsphere** — vSphere REST API HTTP client with session-based auth
//! - **connection** — `Connection` trait with SSO, basic and simulated variants
//! - **helpers** — Wait / inventory-lookup utilities bound to a live session
//! - **lifecycle** — `SessionLifecycle`, the connect / disconnect state machine
//! - **sample** — Before / after hook runner for connected samples
//! - **samples** — Built-in `connect` and `current-time` samples

pub mod types;
pub mod error;
pub mod vsphere;
pub mod connection;
pub mod helpers;
pub mod lifecycle;
pub mod sample;
pub mod samples;

pub use connection::{Connection, SVC_INST_NAME};
pub use error::{VmwareError, VmwareErrorKind, VmwareResult};
pub use helpers::PROP_ME_NAME;
pub use lifecycle::{SessionContext, SessionLifecycle};
pub use sample::{ConnectedSample, ExitPolicy, SampleOutcome, SampleRunner};
