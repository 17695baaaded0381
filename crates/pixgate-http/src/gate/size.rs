//! Requested dimension allowlist.

use std::collections::HashSet;

use http::StatusCode;
use pixgate_core::{AllowedSize, SizePolicy};
use tracing::debug;

use super::{Gate, GateDecision, Rejection};
use crate::context::RequestContext;

/// Rejection sent when the requested size is not allowlisted.
pub const SIZE_NOT_ALLOWED: Rejection =
    Rejection::new(StatusCode::FORBIDDEN, "Requested size not allowed");

/// Query parameter holding the requested width.
pub const WIDTH_PARAM: &str = "w";
/// Query parameter holding the requested height.
pub const HEIGHT_PARAM: &str = "h";

/// Lets through only allowlisted `(w, h)` pairs.
///
/// An empty allowlist disables the gate, as does a request carrying neither
/// `w` nor `h`. When only one is present, or either is not an integer, the
/// configured [`SizePolicy`] decides.
#[derive(Debug, Clone, Default)]
pub struct SizeRestrictionGate {
    allowed: HashSet<AllowedSize>,
    policy: SizePolicy,
}

impl SizeRestrictionGate {
    /// Create a gate from the allowed sizes and the malformed-input policy.
    pub fn new(allowed: impl IntoIterator<Item = AllowedSize>, policy: SizePolicy) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
            policy,
        }
    }

    /// Whether the gate checks anything.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.allowed.is_empty()
    }

    fn on_malformed(&self) -> GateDecision {
        match self.policy {
            SizePolicy::FailOpen => GateDecision::Continue,
            SizePolicy::FailClosed => GateDecision::Reject(SIZE_NOT_ALLOWED),
        }
    }
}

impl Gate for SizeRestrictionGate {
    fn name(&self) -> &'static str {
        "size"
    }

    fn check(&self, ctx: &RequestContext) -> GateDecision {
        if !self.is_enabled() {
            return GateDecision::Continue;
        }

        let width = ctx.params.first(WIDTH_PARAM);
        let height = ctx.params.first(HEIGHT_PARAM);
        if width.is_none() && height.is_none() {
            return GateDecision::Continue;
        }

        let parsed = width
            .and_then(|w| w.parse::<i64>().ok())
            .zip(height.and_then(|h| h.parse::<i64>().ok()));
        let Some((width, height)) = parsed else {
            debug!(w = ?width, h = ?height, policy = %self.policy, "malformed size parameters");
            return self.on_malformed();
        };

        if self.allowed.contains(&AllowedSize::new(width, height)) {
            GateDecision::Continue
        } else {
            GateDecision::Reject(SIZE_NOT_ALLOWED)
        }
    }
}
