//! Core configuration and shared types for pixgate.
//!
//! This crate holds everything the gate layers agree on but that carries no
//! protocol logic of its own: the process-wide configuration (loaded once at
//! start-up and shared read-only), the dimension allowlist entry type, the
//! malformed-size policy, and the common error type.

mod config;
mod error;
mod types;

pub use config::{DEFAULT_GATEWAY_LISTEN, DEFAULT_UPLOAD_PATH, PixGateConfig, SecurityConfig};
pub use error::{PixGateError, PixGateResult};
pub use types::{AllowedSize, SizePolicy};
