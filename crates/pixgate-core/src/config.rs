//! Configuration management for PixGate.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables. Once loaded it is treated as immutable and
//! shared read-only between request tasks.

use std::fmt;
use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{PixGateError, PixGateResult};
use crate::types::{AllowedSize, SizePolicy};

/// Default bind address for the gateway.
pub const DEFAULT_GATEWAY_LISTEN: &str = "0.0.0.0:3001";
/// Default upload endpoint guarded by the signature gate.
pub const DEFAULT_UPLOAD_PATH: &str = "/upload";

/// Top-level process configuration.
///
/// # Examples
///
/// ```
/// use pixgate_core::PixGateConfig;
///
/// let config = PixGateConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:3001");
/// assert!(config.security.secret_key.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct PixGateConfig {
    /// Bind address for the gateway (e.g. `"0.0.0.0:3001"`).
    #[builder(default = String::from(DEFAULT_GATEWAY_LISTEN))]
    pub gateway_listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Settings consumed by the gate pipeline.
    #[builder(default)]
    pub security: SecurityConfig,
}

impl Default for PixGateConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from(DEFAULT_GATEWAY_LISTEN),
            log_level: String::from("info"),
            security: SecurityConfig::default(),
        }
    }
}

/// Settings for the IP, size and signature gates.
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared signing key. Absent or empty disables the signature gate.
    #[builder(default, setter(strip_option, into))]
    pub secret_key: Option<String>,

    /// Client addresses allowed through. Empty disables the IP gate.
    #[builder(default)]
    pub allowed_ips: Vec<IpAddr>,

    /// Permitted `(w, h)` pairs. Empty disables the size gate.
    #[builder(default)]
    pub allowed_sizes: Vec<AllowedSize>,

    /// Handling of present but malformed `w`/`h` parameters.
    #[builder(default)]
    pub size_policy: SizePolicy,

    /// Path treated as the upload endpoint for `POST` requests.
    #[builder(default = String::from(DEFAULT_UPLOAD_PATH), setter(into))]
    pub upload_path: String,

    /// Resolve the client address from `X-Forwarded-For`/`X-Real-IP`.
    #[builder(default = false)]
    pub trust_forwarded_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            allowed_ips: Vec::new(),
            allowed_sizes: Vec::new(),
            size_policy: SizePolicy::default(),
            upload_path: String::from(DEFAULT_UPLOAD_PATH),
            trust_forwarded_headers: false,
        }
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field(
                "secret_key",
                &self.secret_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("allowed_ips", &self.allowed_ips)
            .field("allowed_sizes", &self.allowed_sizes)
            .field("size_policy", &self.size_policy)
            .field("upload_path", &self.upload_path)
            .field("trust_forwarded_headers", &self.trust_forwarded_headers)
            .finish()
    }
}

impl SecurityConfig {
    /// Whether a non-empty signing key is configured.
    #[must_use]
    pub fn signing_enabled(&self) -> bool {
        self.secret_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl PixGateConfig {
    /// Read configuration from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> PixGateResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| PixGateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Defaults, then the optional file, then the environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:3001` |
    /// | `LOG_LEVEL` | `info` |
    /// | `SECRET_KEY` | unset (signature gate disabled) |
    /// | `ALLOWED_IPS` | empty |
    /// | `ALLOWED_SIZES` | empty |
    /// | `SIZE_POLICY` | `fail-open` |
    /// | `UPLOAD_PATH` | `/upload` |
    /// | `TRUST_FORWARDED_HEADERS` | `false` |
    pub fn load(path: Option<&Path>) -> PixGateResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup function.
    ///
    /// Unset variables leave the current value untouched. Values that fail to
    /// parse are reported as [`PixGateError::Config`].
    pub fn apply_overrides<F>(&mut self, lookup: F) -> PixGateResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GATEWAY_LISTEN") {
            self.gateway_listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }

        let security = &mut self.security;
        if let Some(v) = lookup("SECRET_KEY") {
            security.secret_key = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup("ALLOWED_IPS") {
            security.allowed_ips = parse_list(&v, |item| {
                item.parse::<IpAddr>()
                    .map_err(|e| PixGateError::Config(format!("invalid IP {item:?}: {e}")))
            })?;
        }
        if let Some(v) = lookup("ALLOWED_SIZES") {
            security.allowed_sizes = parse_list(&v, str::parse)?;
        }
        if let Some(v) = lookup("SIZE_POLICY") {
            security.size_policy = v.parse()?;
        }
        if let Some(v) = lookup("UPLOAD_PATH") {
            security.upload_path = v;
        }
        if let Some(v) = lookup("TRUST_FORWARDED_HEADERS") {
            security.trust_forwarded_headers = parse_bool(&v);
        }

        Ok(())
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Split a comma-separated list, skipping blank entries.
fn parse_list<T, F>(value: &str, parse: F) -> PixGateResult<Vec<T>>
where
    F: Fn(&str) -> PixGateResult<T>,
{
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse)
        .collect()
}
