//! Ordered gate pipeline.

use std::fmt;

use pixgate_auth::SecretKey;
use pixgate_core::SecurityConfig;

use crate::context::RequestContext;
use crate::gate::{
    Gate, GateDecision, IpRestrictionGate, Rejection, SignatureGate, SizeRestrictionGate,
};

/// Final outcome of running every gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Every gate continued; the request goes to the handler.
    Accepted,
    /// A gate rejected the request; no later gate ran.
    Rejected {
        /// Name of the rejecting gate.
        gate: &'static str,
        /// What to send back.
        rejection: Rejection,
    },
}

/// Runs gates in order and stops at the first rejection.
pub struct GatePipeline {
    gates: Vec<Box<dyn Gate>>,
}

impl GatePipeline {
    /// An empty pipeline that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self { gates: Vec::new() }
    }

    /// Build the standard pipeline: IP, then size, then signature.
    #[must_use]
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new()
            .with_gate(IpRestrictionGate::new(config.allowed_ips.iter().copied()))
            .with_gate(SizeRestrictionGate::new(
                config.allowed_sizes.iter().copied(),
                config.size_policy,
            ))
            .with_gate(SignatureGate::new(
                SecretKey::from_config(config.secret_key.as_deref()),
                config.upload_path.as_str(),
            ))
    }

    /// Append a gate at the end.
    #[must_use]
    pub fn with_gate(mut self, gate: impl Gate) -> Self {
        self.gates.push(Box::new(gate));
        self
    }

    /// Gate names in execution order.
    pub fn gate_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.gates.iter().map(|g| g.name())
    }

    /// Run every gate against `ctx`.
    #[must_use]
    pub fn run(&self, ctx: &RequestContext) -> PipelineOutcome {
        for gate in &self.gates {
            if let GateDecision::Reject(rejection) = gate.check(ctx) {
                return PipelineOutcome::Rejected {
                    gate: gate.name(),
                    rejection,
                };
            }
        }
        PipelineOutcome::Accepted
    }
}

impl Default for GatePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GatePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.gate_names()).finish()
    }
}
