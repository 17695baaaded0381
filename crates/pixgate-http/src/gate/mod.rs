//! Request gates.
//!
//! A gate inspects a [`RequestContext`] and returns a [`GateDecision`]. Gates
//! never write responses themselves; the [`GatePipeline`](crate::GatePipeline)
//! stops at the first rejection and the service turns it into a response.

mod ip;
mod signature;
mod size;

pub use ip::{ENDPOINT_RESTRICTED, IpRestrictionGate};
pub use signature::{INVALID_SIGNATURE, REMOTE_URL_PARAM, SignatureGate};
pub use size::{HEIGHT_PARAM, SIZE_NOT_ALLOWED, SizeRestrictionGate, WIDTH_PARAM};

use std::fmt;

use http::StatusCode;

use crate::context::RequestContext;

/// A rejected request: the status and fixed message sent to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Response status.
    pub status: StatusCode,
    /// Plain-text response body.
    pub message: &'static str,
}

impl Rejection {
    /// Create a new rejection.
    #[must_use]
    pub const fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

/// Outcome of a single gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Hand the request to the next gate.
    Continue,
    /// Stop and answer with this rejection.
    Reject(Rejection),
}

impl GateDecision {
    /// Whether the request may proceed.
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// A single stage of the gate pipeline.
///
/// Gates are synchronous and hold only immutable configuration, so one
/// instance is shared by every request.
pub trait Gate: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Decide whether the request may proceed.
    fn check(&self, ctx: &RequestContext) -> GateDecision;
}
