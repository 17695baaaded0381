//! Shared-secret request signature check.

use http::{Method, StatusCode};
use pixgate_auth::{RequestTarget, SecretKey, hash_body, verify_request};
use pixgate_core::DEFAULT_UPLOAD_PATH;
use tracing::debug;

use super::{Gate, GateDecision, Rejection};
use crate::context::RequestContext;

/// Rejection sent when a guarded request is not correctly signed.
pub const INVALID_SIGNATURE: Rejection =
    Rejection::new(StatusCode::UNAUTHORIZED, "Invalid signature");

/// Query parameter that switches a request to remote-fetch mode.
pub const REMOTE_URL_PARAM: &str = "url";

/// Requires a valid full-request signature on mutating requests.
///
/// Guarded requests are `DELETE`, `POST` to the upload path, and anything
/// carrying a `url` parameter. Without a key the gate lets everything through.
#[derive(Debug, Clone)]
pub struct SignatureGate {
    key: Option<SecretKey>,
    upload_path: String,
}

impl SignatureGate {
    /// Create a gate. `None` disables it.
    pub fn new(key: Option<SecretKey>, upload_path: impl Into<String>) -> Self {
        Self {
            key,
            upload_path: upload_path.into(),
        }
    }

    /// Whether the gate checks anything.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Whether `ctx` is a request this gate guards.
    #[must_use]
    pub fn applies_to(&self, ctx: &RequestContext) -> bool {
        ctx.method == Method::DELETE
            || (ctx.method == Method::POST && ctx.path == self.upload_path)
            || ctx.params.contains(REMOTE_URL_PARAM)
    }
}

impl Default for SignatureGate {
    fn default() -> Self {
        Self::new(None, DEFAULT_UPLOAD_PATH)
    }
}

impl Gate for SignatureGate {
    fn name(&self) -> &'static str {
        "signature"
    }

    fn check(&self, ctx: &RequestContext) -> GateDecision {
        let Some(key) = &self.key else {
            return GateDecision::Continue;
        };
        if !self.applies_to(ctx) {
            return GateDecision::Continue;
        }

        let Some(body) = &ctx.body else {
            debug!(path = %ctx.path, "request body unavailable, cannot verify signature");
            return GateDecision::Reject(INVALID_SIGNATURE);
        };

        let target = RequestTarget::new(
            ctx.method.as_str(),
            ctx.path.as_str(),
            hash_body(key, body),
        );
        match verify_request(key, &target, &ctx.params) {
            Ok(()) => GateDecision::Continue,
            Err(e) => {
                debug!(path = %ctx.path, error = %e, "signature verification failed");
                GateDecision::Reject(INVALID_SIGNATURE)
            }
        }
    }
}
