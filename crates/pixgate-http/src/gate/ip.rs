//! Client address allowlist.

use std::collections::HashSet;
use std::net::IpAddr;

use http::StatusCode;
use tracing::debug;

use super::{Gate, GateDecision, Rejection};
use crate::context::RequestContext;

/// Rejection sent to clients outside the allowlist.
pub const ENDPOINT_RESTRICTED: Rejection =
    Rejection::new(StatusCode::FORBIDDEN, "Endpoint restricted");

/// Lets through only requests whose client address is allowlisted.
///
/// An empty allowlist disables the gate. With a non-empty allowlist a request
/// whose client address cannot be determined is rejected.
#[derive(Debug, Clone, Default)]
pub struct IpRestrictionGate {
    allowed: HashSet<IpAddr>,
}

impl IpRestrictionGate {
    /// Create a gate from the allowed addresses.
    pub fn new(allowed: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            allowed: allowed.into_iter().map(|ip| ip.to_canonical()).collect(),
        }
    }

    /// Whether the gate checks anything.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.allowed.is_empty()
    }
}

impl Gate for IpRestrictionGate {
    fn name(&self) -> &'static str {
        "ip"
    }

    fn check(&self, ctx: &RequestContext) -> GateDecision {
        if !self.is_enabled() {
            return GateDecision::Continue;
        }

        match ctx.client_ip {
            Some(ip) if self.allowed.contains(&ip.to_canonical()) => GateDecision::Continue,
            other => {
                debug!(client_ip = ?other, "client address not in allowlist");
                GateDecision::Reject(ENDPOINT_RESTRICTED)
            }
        }
    }
}
