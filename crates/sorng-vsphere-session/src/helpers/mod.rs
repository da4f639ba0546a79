//! Helpers built on a live session's vim port.
//!
//! - **wait** — poll a resource until a field reaches an expected value
//! - **moref** — list inventory objects and resolve them by name

mod moref;
mod wait;

pub use moref::{GetMoref, PROP_ME_NAME};
pub use wait::WaitForValues;
